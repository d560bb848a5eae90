use std::fmt::Write as _;

use super::domain::Requirement;
use crate::notify::OutboundEmail;

pub const NOTIFICATION_SUBJECT: &str = "New Product Requirement";

/// Render the supplier alert for `requirement` addressed to `to`.
pub fn notification_for(requirement: &Requirement, to: &str) -> OutboundEmail {
    let quantity = requirement.quantity.to_string();
    let rows = [
        ("Category", requirement.category.as_str()),
        ("Sub Category", requirement.sub_category.as_str()),
        ("Product", requirement.product.as_str()),
        ("Quantity", quantity.as_str()),
        ("Description", requirement.description.as_str()),
        ("Contact", requirement.contact.as_str()),
        ("Name", requirement.name.as_str()),
    ];

    let mut html_body = String::from("<h3>New Requirement Received</h3>\n");
    for (label, value) in rows {
        // Writing into a String cannot fail.
        let _ = writeln!(html_body, "<p><b>{label}:</b> {}</p>", escape_html(value));
    }

    OutboundEmail {
        to: to.to_string(),
        subject: NOTIFICATION_SUBJECT.to_string(),
        html_body,
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
