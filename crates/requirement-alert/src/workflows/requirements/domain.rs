use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw payload posted by the requirement form. Every field is optional so that missing
/// values surface as field-level validation errors instead of body parse failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSubmission {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A validated requirement as persisted in the `requirements` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub category: String,
    pub sub_category: String,
    pub product: String,
    pub quantity: u64,
    pub description: String,
    pub contact: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The part of a `shops` document the intake workflow reads. Profile fields such as
/// `shopName` or `city` are ignored whatever their type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Supplier {
    pub email: Option<String>,
    pub category: String,
    pub sub_category: String,
}

impl Supplier {
    /// Address to notify, if the shop registered a non-blank one.
    pub fn contact_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}
