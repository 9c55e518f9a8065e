pub mod access;
pub mod context;
pub mod store;

pub use access::Action;
pub use context::{Session, SessionContext};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
