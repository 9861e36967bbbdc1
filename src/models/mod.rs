//! codeBeamer API model types.

mod association;
mod choice;
mod field;
mod field_definition;
mod identity;
mod item;
mod new_item;
mod project;
mod tracker;
mod user;

pub use association::*;
pub use choice::*;
pub use field::*;
pub use field_definition::*;
pub use identity::{Identified, Lookup};
pub use item::*;
pub use new_item::*;
pub use project::*;
pub use tracker::*;
pub use user::*;

pub(crate) use identity::identified_by_id;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::client::RestClient;
use crate::error::{CbError, Result};

/// The `id` of an entity payload.
pub(crate) fn payload_id(payload: &Value, entity_type: &str) -> Result<i64> {
    payload
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| CbError::MalformedPayload(format!("{entity_type} payload without an id")))
}

/// The `name` of an entity payload; system entities sometimes omit it.
pub(crate) fn payload_name(payload: &Value) -> String {
    payload
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Whether the payload's `type` key holds a string, the marker of a
/// reference (partial) payload for trackers and items.
pub(crate) fn has_type_tag(payload: &Value) -> bool {
    matches!(payload.get("type"), Some(Value::String(_)))
}

/// Unwrap a JSON array response.
pub(crate) fn into_array(value: Value, what: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        _ => Err(CbError::MalformedPayload(format!("{what} response is not an array"))),
    }
}

/// Build a user from an optional embedded user payload.
pub(crate) fn user_ref(client: &RestClient, payload: Option<Value>) -> Result<Option<User>> {
    match payload {
        None | Some(Value::Null) => Ok(None),
        Some(payload) => User::from_payload(client, payload).map(Some),
    }
}

/// Build users from an optional embedded array of user payloads.
pub(crate) fn user_list(client: &RestClient, payload: Option<Value>) -> Result<Vec<User>> {
    match payload {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(payload) => into_array(payload, "user list")?
            .into_iter()
            .map(|user| User::from_payload(client, user))
            .collect(),
    }
}

/// Accepts a string or a number and keeps it as a string.
pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> core::result::Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Serialized shape shared by all entities: `id`, `name` and, when loaded,
/// the flattened detail attributes.
#[derive(Serialize)]
pub(crate) struct EntityView<'a, D: Serialize> {
    pub id: i64,
    pub name: &'a str,
    #[serde(flatten)]
    pub detail: Option<&'a D>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_helpers() {
        let payload = json!({"id": 5, "name": "Bugs", "type": "TrackerReference"});
        assert_eq!(payload_id(&payload, "tracker").unwrap(), 5);
        assert_eq!(payload_name(&payload), "Bugs");
        assert!(has_type_tag(&payload));
        assert!(!has_type_tag(&json!({"id": 5, "type": {"id": 1}})));

        assert!(matches!(
            payload_id(&json!({"name": "x"}), "tracker"),
            Err(CbError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_into_array() {
        assert_eq!(into_array(json!([1, 2]), "x").unwrap().len(), 2);
        assert!(into_array(json!(null), "x").unwrap().is_empty());
        assert!(into_array(json!({"a": 1}), "x").is_err());
    }

    #[test]
    fn test_lenient_string() {
        #[derive(Deserialize)]
        struct Address {
            #[serde(default, deserialize_with = "lenient_string")]
            zip: Option<String>,
        }

        let a: Address = serde_json::from_value(json!({"zip": 12345})).unwrap();
        assert_eq!(a.zip.as_deref(), Some("12345"));
        let a: Address = serde_json::from_value(json!({"zip": "SW1A"})).unwrap();
        assert_eq!(a.zip.as_deref(), Some("SW1A"));
        let a: Address = serde_json::from_value(json!({})).unwrap();
        assert!(a.zip.is_none());
    }
}
