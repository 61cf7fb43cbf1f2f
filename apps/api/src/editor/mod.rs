//! In-place document editing engine.
//!
//! Path grammar and resolver, copy-on-write accessor, collection operations,
//! the per-resume edit session, and the debounced persistence sync behind it.

pub mod accessor;
pub mod collections;
pub mod document;
pub mod error;
pub mod handlers;
pub mod mutation;
pub mod node;
pub mod path;
pub mod registry;
pub mod session;
pub mod sync;

#[cfg(test)]
pub use document::blank_document;
pub use document::ResumeDocument;
pub use error::EditError;
pub use mutation::Mutation;
pub use node::Node;
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{SessionStatus, Snapshot};
