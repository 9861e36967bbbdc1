//! Request body for creating tracker items.

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::models::{ChoiceValue, FieldInput, FieldKind};
use crate::timestamp::{self, Timestamp};

/// Convert a `snake_case` name to the `camelCase` the API expects.
///
/// ```
/// assert_eq!(cbapi::to_camel_case("story_points"), "storyPoints");
/// assert_eq!(cbapi::to_camel_case("name"), "name");
/// ```
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn user_refs(ids: &[i64]) -> Value {
    Value::Array(
        ids.iter()
            .map(|id| json!({"id": id, "type": "UserReference"}))
            .collect(),
    )
}

/// A tracker item to be created with [`Tracker::create_item`](crate::Tracker::create_item).
///
/// System fields have typed setters; anything else goes through
/// [`with_system_field`](Self::with_system_field). Custom fields are added
/// as `{fieldId?, name, type, value | values}` entries.
///
/// ```
/// use cbapi::{FieldKind, NewTrackerItem};
///
/// # fn example() -> cbapi::Result<()> {
/// let item = NewTrackerItem::new("Login fails")
///     .description("Steps to reproduce ...")
///     .story_points(3)
///     .with_custom_field(None, "Root Cause", FieldKind::Text, "unknown")?;
/// assert_eq!(item.to_json()["storyPoints"], 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct NewTrackerItem {
    system_fields: Map<String, Value>,
    custom_fields: Vec<Value>,
}

impl NewTrackerItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self::default().with_system_field("name", json!(name.into()))
    }

    #[must_use]
    pub fn description(self, description: impl Into<String>) -> Self {
        self.with_system_field("description", json!(description.into()))
    }

    /// `PlainText`, `Html` or `Wiki`.
    #[must_use]
    pub fn description_format(self, format: impl Into<String>) -> Self {
        self.with_system_field("description_format", json!(format.into()))
    }

    #[must_use]
    pub fn status(self, status: ChoiceValue) -> Self {
        self.with_system_field("status", json!(status))
    }

    #[must_use]
    pub fn priority(self, priority: ChoiceValue) -> Self {
        self.with_system_field("priority", json!(priority))
    }

    #[must_use]
    pub fn parent(self, item_id: i64) -> Self {
        self.with_system_field("parent", json!({"id": item_id, "type": "TrackerItemReference"}))
    }

    #[must_use]
    pub fn assigned_to(self, user_ids: &[i64]) -> Self {
        self.with_system_field("assigned_to", user_refs(user_ids))
    }

    #[must_use]
    pub fn owners(self, user_ids: &[i64]) -> Self {
        self.with_system_field("owners", user_refs(user_ids))
    }

    #[must_use]
    pub fn story_points(self, points: i64) -> Self {
        self.with_system_field("story_points", json!(points))
    }

    #[must_use]
    pub fn start_date(self, date: Timestamp) -> Self {
        self.with_system_field("start_date", json!(timestamp::format(&date)))
    }

    #[must_use]
    pub fn end_date(self, date: Timestamp) -> Self {
        self.with_system_field("end_date", json!(timestamp::format(&date)))
    }

    /// Set any system field by its `snake_case` name.
    #[must_use]
    pub fn with_system_field(mut self, name: &str, value: Value) -> Self {
        self.system_fields.insert(to_camel_case(name), value);
        self
    }

    /// Append a custom field value.
    ///
    /// # Errors
    ///
    /// Returns [`CbError::TypeMismatch`](crate::CbError::TypeMismatch) if
    /// `value` does not fit `kind`.
    pub fn with_custom_field(
        mut self,
        field_id: Option<i64>,
        name: &str,
        kind: FieldKind,
        value: impl Into<FieldInput>,
    ) -> Result<Self> {
        let value = kind.coerce(value.into())?;
        self.custom_fields.push(value.wire_entry(field_id, name));
        Ok(self)
    }

    /// The request body.
    pub fn to_json(&self) -> Value {
        let mut body = self.system_fields.clone();
        if !self.custom_fields.is_empty() {
            body.insert("customFields".to_string(), Value::Array(self.custom_fields.clone()));
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CbError;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("description_format"), "descriptionFormat");
        assert_eq!(to_camel_case("only_workflow_can_create_new_referring_item"), "onlyWorkflowCanCreateNewReferringItem");
        assert_eq!(to_camel_case("_leading"), "leading");
        assert_eq!(to_camel_case("already"), "already");
    }

    #[test]
    fn test_body_shape() {
        let body = NewTrackerItem::new("Crash on save")
            .description_format("Wiki")
            .status(ChoiceValue::new(1, "New"))
            .parent(99)
            .assigned_to(&[3])
            .with_system_field("estimated_millis", json!(3_600_000))
            .with_custom_field(Some(1000), "Severity Score", FieldKind::Integer, 7)
            .unwrap()
            .with_custom_field(None, "Component", FieldKind::Choice, ChoiceValue::new(5, "UI"))
            .unwrap()
            .to_json();

        assert_eq!(body["name"], "Crash on save");
        assert_eq!(body["descriptionFormat"], "Wiki");
        assert_eq!(body["status"]["type"], "ChoiceOptionReference");
        assert_eq!(body["parent"], json!({"id": 99, "type": "TrackerItemReference"}));
        assert_eq!(body["assignedTo"][0]["id"], 3);
        assert_eq!(body["estimatedMillis"], 3_600_000);
        assert_eq!(
            body["customFields"][0],
            json!({"fieldId": 1000, "name": "Severity Score", "type": "IntegerFieldValue", "value": 7})
        );
        assert_eq!(body["customFields"][1]["values"][0]["id"], 5);
    }

    #[test]
    fn test_custom_field_type_checked() {
        let result = NewTrackerItem::new("x").with_custom_field(None, "Due", FieldKind::Date, "tomorrow");
        assert!(matches!(result, Err(CbError::TypeMismatch { .. })));
    }

    #[test]
    fn test_no_custom_fields_key_when_empty() {
        let body = NewTrackerItem::new("x").to_json();
        assert!(body.get("customFields").is_none());
    }
}
