pub mod backend;
pub mod client;
pub mod endpoints;
pub mod requests;

pub use backend::AuditBackend;
pub use client::ApiClient;
pub use requests::{ForgotPasswordResponse, LoginRequest, RegisterFirmRequest};
