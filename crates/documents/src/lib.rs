//! Document store implementations for textpilot.
//!
//! [`GoogleDocuments`] talks to Docs, Drive and Sheets with a service
//! account; [`InMemoryDocumentStore`] backs tests and offline runs.

pub mod auth;
pub mod directory;
pub mod extract;
pub mod google;
pub mod in_memory;

pub use auth::{ServiceAccountAuth, ServiceAccountKey};
pub use directory::parse_phone_directory;
pub use extract::extract_text;
pub use google::GoogleDocuments;
pub use in_memory::InMemoryDocumentStore;
