pub mod client;
pub mod finding;
pub mod module;
pub mod report;
pub mod tenant;
pub mod upload;

pub use client::*;
pub use finding::*;
pub use module::*;
pub use report::*;
pub use tenant::*;
pub use upload::*;
