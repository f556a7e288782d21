//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **pocketbase**: reqwest-backed client for the PocketBase REST API
//!
//! Adapters are thin translators between domain types and wire
//! representations. They contain no business logic.

pub mod pocketbase;
