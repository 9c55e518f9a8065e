pub mod controller;
pub mod formatter;

pub use controller::{ReportController, ReportState};
