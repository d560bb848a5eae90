use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::domain::{Requirement, RequirementSubmission};

const REQUIRED: &str = "Required";
const INVALID_CONTACT: &str = "Enter 10-digit number";
const INVALID_QUANTITY: &str = "Enter a whole number";
const CONTACT_DIGITS: usize = 10;

/// Field-level rejection of a submission, keyed by the wire field name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid requirement: {}", summarize(.fields))]
pub struct ValidationError {
    pub fields: BTreeMap<&'static str, &'static str>,
}

fn summarize(fields: &BTreeMap<&'static str, &'static str>) -> String {
    fields
        .iter()
        .map(|(field, reason)| format!("{field} ({reason})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a submission and stamp it with `created_at`.
///
/// Values are kept verbatim: supplier matching is exact, so nothing here trims or
/// re-cases the category pair.
pub fn validate_submission(
    submission: RequirementSubmission,
    created_at: DateTime<Utc>,
) -> Result<Requirement, ValidationError> {
    let mut fields = BTreeMap::new();

    let category = required(&mut fields, "category", submission.category);
    let sub_category = required(&mut fields, "subCategory", submission.sub_category);
    let product = required(&mut fields, "product", submission.product);
    let name = required(&mut fields, "name", submission.name);

    let quantity = match submission.quantity {
        None | Some(Value::Null) => {
            fields.insert("quantity", REQUIRED);
            None
        }
        Some(value) => {
            let parsed = value.as_u64();
            if parsed.is_none() {
                fields.insert("quantity", INVALID_QUANTITY);
            }
            parsed
        }
    };

    let contact = submission.contact.filter(|contact| is_contact_number(contact));
    if contact.is_none() {
        fields.insert("contact", INVALID_CONTACT);
    }

    match (category, sub_category, product, quantity, contact, name) {
        (
            Some(category),
            Some(sub_category),
            Some(product),
            Some(quantity),
            Some(contact),
            Some(name),
        ) if fields.is_empty() => Ok(Requirement {
            category,
            sub_category,
            product,
            quantity,
            description: submission.description.unwrap_or_default(),
            contact,
            name,
            created_at,
        }),
        _ => Err(ValidationError { fields }),
    }
}

fn required(
    fields: &mut BTreeMap<&'static str, &'static str>,
    field: &'static str,
    value: Option<String>,
) -> Option<String> {
    let value = value.filter(|value| !value.trim().is_empty());
    if value.is_none() {
        fields.insert(field, REQUIRED);
    }
    value
}

/// Exactly ten ASCII digits, nothing else.
pub fn is_contact_number(raw: &str) -> bool {
    raw.len() == CONTACT_DIGITS && raw.bytes().all(|byte| byte.is_ascii_digit())
}
