//! Requirement intake: validate a shopper's submission, persist it, and alert every
//! supplier registered for the same category and sub-category.

pub mod domain;
pub mod message;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{Requirement, RequirementSubmission, Supplier};
pub use message::{notification_for, NOTIFICATION_SUBJECT};
pub use router::requirement_router;
pub use service::{
    DispatchPolicy, IntakeError, IntakeOutcome, IntakeStage, RequirementIntakeService,
};
pub use validation::{validate_submission, ValidationError};
