pub mod coordinator;
pub mod doccache;
pub mod error;
pub mod fanout;
pub mod presence;
pub mod registry;

pub use coordinator::SessionCoordinator;
pub use doccache::{DocumentCache, DocumentStore};
