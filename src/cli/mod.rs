pub mod auth;
pub mod commands;
pub mod findings;
pub mod report;
pub mod runtime;
pub mod workspace;

pub use commands::{Cli, Commands};
pub use runtime::Workspace;
