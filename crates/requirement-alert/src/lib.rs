//! Requirement intake: persist shopper requirements and alert the suppliers registered for
//! the same category and sub-category.

pub mod config;
pub mod error;
pub mod notify;
pub mod store;
pub mod telemetry;
pub mod workflows;
