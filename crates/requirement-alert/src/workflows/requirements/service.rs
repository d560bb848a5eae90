use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::domain::{Requirement, RequirementSubmission, Supplier};
use super::message::notification_for;
use super::validation::{validate_submission, ValidationError};
use crate::notify::{Notifier, NotifyError};
use crate::store::{
    to_document, DocumentId, FieldFilter, RecordStore, StoreError, REQUIREMENTS_COLLECTION,
    SHOPS_COLLECTION,
};

/// How a failed supplier notification affects the submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Log the failure, keep notifying the remaining suppliers, and report success.
    #[default]
    BestEffort,
    /// Stop at the first failure and fail the request. The requirement stays persisted.
    Strict,
}

impl DispatchPolicy {
    pub fn label(self) -> &'static str {
        match self {
            Self::BestEffort => "best-effort",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for DispatchPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" | "besteffort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            other => Err(other.to_string()),
        }
    }
}

/// Pipeline position of a submission, used to tag log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Received,
    Persisted,
    Matched,
    Notifying,
    Done,
    Rejected,
    StorageFailed,
    DispatchFailed,
}

impl IntakeStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Persisted => "persisted",
            Self::Matched => "matched",
            Self::Notifying => "notifying",
            Self::Done => "done",
            Self::Rejected => "rejected",
            Self::StorageFailed => "storage-failed",
            Self::DispatchFailed => "dispatch-failed",
        }
    }
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregate result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeOutcome {
    pub requirement_id: DocumentId,
    pub requirement: Requirement,
    pub matched: usize,
    pub notified: usize,
    pub failed: usize,
    /// Matched suppliers without a usable e-mail address.
    pub skipped: usize,
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("notifying {recipient} about requirement {requirement_id} failed: {source}")]
    Dispatch {
        requirement_id: DocumentId,
        recipient: String,
        #[source]
        source: NotifyError,
    },
}

impl IntakeError {
    /// Terminal pipeline state reached by this failure.
    pub fn stage(&self) -> IntakeStage {
        match self {
            Self::Invalid(_) => IntakeStage::Rejected,
            Self::Storage(_) => IntakeStage::StorageFailed,
            Self::Dispatch { .. } => IntakeStage::DispatchFailed,
        }
    }
}

#[derive(Debug, Default)]
struct DispatchTally {
    notified: usize,
    failed: usize,
    skipped: usize,
}

/// Service composing the record store and the supplier notifier.
pub struct RequirementIntakeService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    policy: DispatchPolicy,
}

impl<S, N> RequirementIntakeService<S, N>
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, policy: DispatchPolicy) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Validate, persist, and fan the requirement out to matching suppliers one at a time.
    pub fn submit(
        &self,
        submission: RequirementSubmission,
    ) -> Result<IntakeOutcome, IntakeError> {
        let requirement = validate_submission(submission, Utc::now()).map_err(|err| {
            warn!(stage = %IntakeStage::Rejected, error = %err, "requirement rejected");
            err
        })?;
        info!(
            stage = %IntakeStage::Received,
            category = %requirement.category,
            sub_category = %requirement.sub_category,
            "requirement received"
        );

        let requirement_id = self.persist(&requirement)?;
        info!(stage = %IntakeStage::Persisted, %requirement_id, "requirement stored");

        let suppliers = self.matching_suppliers(&requirement)?;
        info!(
            stage = %IntakeStage::Matched,
            %requirement_id,
            matched = suppliers.len(),
            "suppliers resolved"
        );

        let tally = self.dispatch(&requirement_id, &requirement, &suppliers)?;
        info!(
            stage = %IntakeStage::Done,
            %requirement_id,
            notified = tally.notified,
            failed = tally.failed,
            skipped = tally.skipped,
            "requirement processed"
        );

        Ok(IntakeOutcome {
            requirement_id,
            requirement,
            matched: suppliers.len(),
            notified: tally.notified,
            failed: tally.failed,
            skipped: tally.skipped,
        })
    }

    fn persist(&self, requirement: &Requirement) -> Result<DocumentId, IntakeError> {
        let document = to_document(requirement)?;
        self.store
            .insert(REQUIREMENTS_COLLECTION, document)
            .map_err(|err| {
                warn!(stage = %IntakeStage::StorageFailed, error = %err, "insert failed");
                IntakeError::Storage(err)
            })
    }

    /// Shops registered under exactly the requirement's category pair.
    pub fn matching_suppliers(
        &self,
        requirement: &Requirement,
    ) -> Result<Vec<Supplier>, IntakeError> {
        let filters = [
            FieldFilter::equals("category", requirement.category.as_str()),
            FieldFilter::equals("subCategory", requirement.sub_category.as_str()),
        ];
        let documents = self
            .store
            .query(SHOPS_COLLECTION, &filters)
            .map_err(|err| {
                warn!(stage = %IntakeStage::StorageFailed, error = %err, "supplier query failed");
                IntakeError::Storage(err)
            })?;

        let suppliers = documents
            .into_iter()
            .filter_map(
                |stored| match serde_json::from_value::<Supplier>(Value::Object(stored.data)) {
                    Ok(supplier) => Some(supplier),
                    Err(err) => {
                        warn!(shop_id = %stored.id, error = %err, "skipping unreadable shop");
                        None
                    }
                },
            )
            .collect();
        Ok(suppliers)
    }

    fn dispatch(
        &self,
        requirement_id: &DocumentId,
        requirement: &Requirement,
        suppliers: &[Supplier],
    ) -> Result<DispatchTally, IntakeError> {
        let mut tally = DispatchTally::default();
        info!(
            stage = %IntakeStage::Notifying,
            %requirement_id,
            suppliers = suppliers.len(),
            policy = self.policy.label(),
            "notifying suppliers"
        );

        for supplier in suppliers {
            let Some(recipient) = supplier.contact_email() else {
                tally.skipped += 1;
                continue;
            };

            let email = notification_for(requirement, recipient);
            match self.notifier.send(&email) {
                Ok(()) => tally.notified += 1,
                Err(source) => match self.policy {
                    DispatchPolicy::BestEffort => {
                        warn!(
                            stage = %IntakeStage::Notifying,
                            %requirement_id,
                            recipient,
                            error = %source,
                            "supplier notification failed"
                        );
                        tally.failed += 1;
                    }
                    DispatchPolicy::Strict => {
                        warn!(
                            stage = %IntakeStage::DispatchFailed,
                            %requirement_id,
                            recipient,
                            error = %source,
                            "supplier notification failed"
                        );
                        return Err(IntakeError::Dispatch {
                            requirement_id: requirement_id.clone(),
                            recipient: recipient.to_string(),
                            source,
                        });
                    }
                },
            }
        }

        Ok(tally)
    }
}
