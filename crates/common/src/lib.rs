// anchorage-common: shared types and utilities for the Anchorage workspace

pub mod error;
pub mod protocol;
pub mod text;
pub mod types;
