// anchorage-engine: the live editing engine.
//
// One `EditorContext` per open document view wires the document model,
// anchor resolver, thread store and stream reconciler together so that
// every text mutation and the re-resolution it triggers happen in one
// observable turn.

pub mod anchor;
pub mod config;
pub mod context;
pub mod document;
pub mod session;
pub mod stream;
pub mod threads;
