// Wire protocol for the generation streaming transport.

pub mod events;
