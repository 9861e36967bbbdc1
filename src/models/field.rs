//! Item-level field values.
//!
//! The server tags each field value with a type string. [`FieldKind`] is the
//! closed set of tags this client can write; [`FieldValue`] holds the typed
//! value and keeps unknown tags readable as [`FieldValue::Unsupported`].

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::client::RestClient;
use crate::error::{CbError, Result};
use crate::lazy::Lazy;
use crate::models::{identified_by_id, payload_name, ChoiceOptionsQuery, ChoiceValue, Lookup};
use crate::pagination::{PageRequest, MAX_PAGE_SIZE};
use crate::timestamp::{self, Timestamp};
use crate::traits::List;

/// The field value type tags the server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Text,
    Color,
    WikiText,
    Date,
    Choice,
}

impl FieldKind {
    /// All kinds, in tag order.
    pub const ALL: [FieldKind; 6] = [
        FieldKind::Integer,
        FieldKind::Text,
        FieldKind::Color,
        FieldKind::WikiText,
        FieldKind::Date,
        FieldKind::Choice,
    ];

    /// The wire tag, e.g. `IntegerFieldValue`.
    pub fn tag(self) -> &'static str {
        match self {
            FieldKind::Integer => "IntegerFieldValue",
            FieldKind::Text => "TextFieldValue",
            FieldKind::Color => "ColorFieldValue",
            FieldKind::WikiText => "WikiTextFieldValue",
            FieldKind::Date => "DateFieldValue",
            FieldKind::Choice => "ChoiceFieldValue",
        }
    }

    /// Parse a wire tag.
    ///
    /// # Errors
    ///
    /// Returns [`CbError::UnknownFieldType`] for tags outside the known set.
    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| CbError::UnknownFieldType(tag.to_string()))
    }

    /// Check `input` against this kind and produce the value to store.
    ///
    /// Text and wiki text accept any scalar input and store its string
    /// form. Color accepts text only and does not check the `#RRGGBB`
    /// shape. Choice membership is checked separately against the field's
    /// available choices.
    pub fn coerce(self, input: FieldInput) -> Result<FieldValue> {
        let mismatch = |expected: &'static str, input: &FieldInput| CbError::TypeMismatch {
            expected,
            found: input.type_name(),
        };

        match (self, input) {
            (FieldKind::Integer, FieldInput::Integer(v)) => Ok(FieldValue::Integer(Some(v))),
            (FieldKind::Integer, other) => Err(mismatch("integer", &other)),

            (FieldKind::Text | FieldKind::WikiText, other @ FieldInput::Choices(_)) => {
                Err(mismatch("text", &other))
            }
            (FieldKind::Text, other) => Ok(FieldValue::Text(Some(other.to_string()))),
            (FieldKind::WikiText, other) => Ok(FieldValue::WikiText(Some(other.to_string()))),

            (FieldKind::Color, FieldInput::Text(v)) => Ok(FieldValue::Color(Some(v))),
            (FieldKind::Color, other) => Err(mismatch("color text", &other)),

            (FieldKind::Date, FieldInput::Date(v)) => Ok(FieldValue::Date(Some(v))),
            (FieldKind::Date, other) => Err(mismatch("timestamp", &other)),

            (FieldKind::Choice, FieldInput::Choices(choices)) if choices.is_empty() => {
                Err(CbError::TypeMismatch {
                    expected: "one or more choices",
                    found: "no choices",
                })
            }
            (FieldKind::Choice, FieldInput::Choices(choices)) => Ok(FieldValue::Choice(choices)),
            (FieldKind::Choice, other) => Err(mismatch("choice values", &other)),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The current value of one item field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(Option<i64>),
    Text(Option<String>),
    /// Expected to be `#RRGGBB`, not validated.
    Color(Option<String>),
    WikiText(Option<String>),
    Date(Option<Timestamp>),
    /// One or more selected options (single- and multi-select alike).
    Choice(Vec<ChoiceValue>),
    /// A value whose type tag this client does not know. Readable, never
    /// writable.
    Unsupported { tag: String, raw: Value },
}

impl FieldValue {
    /// Decode the value part of a field payload according to its tag.
    pub fn from_payload(tag: &str, payload: &Value) -> Result<Self> {
        let kind = match FieldKind::from_tag(tag) {
            Ok(kind) => kind,
            Err(_) => {
                tracing::debug!(tag, "keeping field value of unknown type as raw JSON");
                let raw = payload
                    .get("value")
                    .or_else(|| payload.get("values"))
                    .cloned()
                    .unwrap_or(Value::Null);
                return Ok(FieldValue::Unsupported {
                    tag: tag.to_string(),
                    raw,
                });
            }
        };

        let value = payload.get("value").filter(|v| !v.is_null());
        let text = |what: &str| -> Result<Option<String>> {
            match value {
                None => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) if what == "text" => Ok(Some(other.to_string())),
                Some(_) => Err(CbError::MalformedPayload(format!(
                    "{tag} value is not a string"
                ))),
            }
        };

        Ok(match kind {
            FieldKind::Integer => FieldValue::Integer(match value {
                None => None,
                Some(v) => Some(v.as_i64().ok_or_else(|| {
                    CbError::MalformedPayload(format!("{tag} value is not an integer"))
                })?),
            }),
            FieldKind::Text => FieldValue::Text(text("text")?),
            FieldKind::WikiText => FieldValue::WikiText(text("text")?),
            FieldKind::Color => FieldValue::Color(text("color")?),
            FieldKind::Date => FieldValue::Date(match value {
                None => None,
                Some(Value::String(s)) => Some(timestamp::parse(s)?),
                Some(other) => return Err(CbError::InvalidTimestamp(other.to_string())),
            }),
            FieldKind::Choice => FieldValue::Choice(match payload.get("values") {
                None | Some(Value::Null) => Vec::new(),
                Some(values) => serde_json::from_value(values.clone())?,
            }),
        })
    }

    /// The kind of this value, `None` for unsupported tags.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Integer(_) => Some(FieldKind::Integer),
            FieldValue::Text(_) => Some(FieldKind::Text),
            FieldValue::Color(_) => Some(FieldKind::Color),
            FieldValue::WikiText(_) => Some(FieldKind::WikiText),
            FieldValue::Date(_) => Some(FieldKind::Date),
            FieldValue::Choice(_) => Some(FieldKind::Choice),
            FieldValue::Unsupported { .. } => None,
        }
    }

    /// The wire type tag.
    pub fn tag(&self) -> &str {
        match self {
            FieldValue::Unsupported { tag, .. } => tag,
            other => other.kind().map(FieldKind::tag).unwrap_or_default(),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => *v,
            _ => None,
        }
    }

    /// The string value of text, wiki text and color fields.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) | FieldValue::WikiText(v) | FieldValue::Color(v) => v.as_deref(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Timestamp> {
        match self {
            FieldValue::Date(v) => *v,
            _ => None,
        }
    }

    pub fn as_choices(&self) -> &[ChoiceValue] {
        match self {
            FieldValue::Choice(v) => v,
            _ => &[],
        }
    }

    /// Whether the field currently has no value.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Integer(v) => v.is_none(),
            FieldValue::Text(v) | FieldValue::Color(v) | FieldValue::WikiText(v) => v.is_none(),
            FieldValue::Date(v) => v.is_none(),
            FieldValue::Choice(v) => v.is_empty(),
            FieldValue::Unsupported { raw, .. } => raw.is_null(),
        }
    }

    /// The wire entry `{fieldId, name, type, value | values}`.
    pub(crate) fn wire_entry(&self, field_id: Option<i64>, name: &str) -> Value {
        let mut entry = json!({
            "name": name,
            "type": self.tag(),
        });
        if let Some(id) = field_id {
            entry["fieldId"] = json!(id);
        }
        match self {
            FieldValue::Integer(v) => entry["value"] = json!(v),
            FieldValue::Text(v) | FieldValue::Color(v) | FieldValue::WikiText(v) => {
                entry["value"] = json!(v)
            }
            FieldValue::Date(v) => entry["value"] = json!(v.as_ref().map(timestamp::format)),
            FieldValue::Choice(v) => entry["values"] = json!(v),
            FieldValue::Unsupported { raw, .. } => entry["value"] = raw.clone(),
        }
        entry
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(Some(v)) => write!(f, "{v}"),
            FieldValue::Text(Some(v)) | FieldValue::Color(Some(v)) | FieldValue::WikiText(Some(v)) => {
                f.write_str(v)
            }
            FieldValue::Date(Some(v)) => f.write_str(&timestamp::format(v)),
            FieldValue::Choice(v) => {
                let names: Vec<&str> = v.iter().map(|c| c.name.as_str()).collect();
                f.write_str(&names.join(", "))
            }
            FieldValue::Unsupported { raw, .. } if !raw.is_null() => write!(f, "{raw}"),
            _ => Ok(()),
        }
    }
}

/// A value supplied by a caller for a field write.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Integer(i64),
    Text(String),
    Date(Timestamp),
    Choices(Vec<ChoiceValue>),
}

impl FieldInput {
    /// A short name of the input's kind for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldInput::Integer(_) => "integer",
            FieldInput::Text(_) => "text",
            FieldInput::Date(_) => "timestamp",
            FieldInput::Choices(_) => "choice values",
        }
    }
}

impl fmt::Display for FieldInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldInput::Integer(v) => write!(f, "{v}"),
            FieldInput::Text(v) => f.write_str(v),
            FieldInput::Date(v) => f.write_str(&timestamp::format(v)),
            FieldInput::Choices(v) => {
                let names: Vec<&str> = v.iter().map(|c| c.name.as_str()).collect();
                f.write_str(&names.join(", "))
            }
        }
    }
}

impl From<i64> for FieldInput {
    fn from(v: i64) -> Self {
        FieldInput::Integer(v)
    }
}

impl From<i32> for FieldInput {
    fn from(v: i32) -> Self {
        FieldInput::Integer(i64::from(v))
    }
}

impl From<&str> for FieldInput {
    fn from(v: &str) -> Self {
        FieldInput::Text(v.to_string())
    }
}

impl From<String> for FieldInput {
    fn from(v: String) -> Self {
        FieldInput::Text(v)
    }
}

impl From<Timestamp> for FieldInput {
    fn from(v: Timestamp) -> Self {
        FieldInput::Date(v)
    }
}

impl From<ChoiceValue> for FieldInput {
    fn from(v: ChoiceValue) -> Self {
        FieldInput::Choices(vec![v])
    }
}

impl From<Vec<ChoiceValue>> for FieldInput {
    fn from(v: Vec<ChoiceValue>) -> Self {
        FieldInput::Choices(v)
    }
}

/// One field on one tracker item, with its current value.
///
/// Fields come from the item's field listing (which knows whether each
/// field is editable) or from the item detail (which does not; those are
/// read-only until resolved against the listing).
#[derive(Debug, Clone)]
pub struct Field {
    client: RestClient,
    id: i64,
    name: String,
    item_id: i64,
    editable: bool,
    shared_field_names: Vec<String>,
    value: FieldValue,
    choices: Lazy<Vec<ChoiceValue>>,
}

identified_by_id!(Field);

impl Field {
    /// Build a field from a field value payload `{fieldId, name, type, value | values}`.
    pub fn from_payload(client: &RestClient, item_id: i64, editable: bool, payload: &Value) -> Result<Self> {
        let id = payload
            .get("fieldId")
            .and_then(Value::as_i64)
            .ok_or_else(|| CbError::MalformedPayload("field value without a fieldId".to_string()))?;
        let tag = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CbError::MalformedPayload(format!("field {id} without a type")))?;
        let shared_field_names = payload
            .get("sharedFieldNames")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            client: client.clone(),
            id,
            name: payload_name(payload),
            item_id,
            editable,
            shared_field_names,
            value: FieldValue::from_payload(tag, payload)?,
            choices: Lazy::partial(),
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The item this field value belongs to.
    pub fn item_id(&self) -> i64 {
        self.item_id
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn shared_field_names(&self) -> &[String] {
        &self.shared_field_names
    }

    /// The wire type tag.
    pub fn type_tag(&self) -> &str {
        self.value.tag()
    }

    /// The kind, `None` for unsupported tags.
    pub fn kind(&self) -> Option<FieldKind> {
        self.value.kind()
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// The options this field can take on its item, fetched on first use
    /// and cached for the lifetime of this field.
    pub async fn available_choices(&self) -> Result<&[ChoiceValue]> {
        let query = ChoiceOptionsQuery {
            item_id: self.item_id,
            field_id: self.id,
        };
        let choices = self
            .choices
            .get_or_load(|| ChoiceValue::list(&self.client, &query, PageRequest::all(MAX_PAGE_SIZE)))
            .await?;
        Ok(choices.as_slice())
    }

    /// One available choice by id or name.
    pub async fn choice(&self, lookup: impl Into<Lookup>) -> Result<Option<ChoiceValue>> {
        let lookup = lookup.into();
        Ok(lookup.find(self.available_choices().await?).cloned())
    }

    /// Drop the cached choices and fetch them again.
    pub async fn refresh_choices(&mut self) -> Result<()> {
        let query = ChoiceOptionsQuery {
            item_id: self.item_id,
            field_id: self.id,
        };
        let choices =
            ChoiceValue::list(&self.client, &query, PageRequest::all(MAX_PAGE_SIZE)).await?;
        self.choices.replace(choices);
        Ok(())
    }

    /// Write a new value to this field on the server, then keep it locally.
    ///
    /// Nothing is sent when the field is read-only, the input has the wrong
    /// kind, or a choice is not available. Other fields of the item are
    /// not refreshed.
    #[tracing::instrument(skip(self, input), fields(item = self.item_id, field = self.id))]
    pub async fn set_value(&mut self, input: impl Into<FieldInput>) -> Result<()> {
        let value = self.prepare(input.into()).await?;
        let body = json!({ "fieldValues": [self.wire_entry(&value)] });
        update_item_fields(&self.client, self.item_id, &body).await?;
        self.value = value;
        Ok(())
    }

    /// Validate a write without sending it.
    pub(crate) async fn prepare(&self, input: FieldInput) -> Result<FieldValue> {
        if !self.editable {
            return Err(CbError::NotEditable {
                field: self.name.clone(),
            });
        }

        let kind = self
            .kind()
            .ok_or_else(|| CbError::UnknownFieldType(self.type_tag().to_string()))?;
        let value = kind.coerce(input)?;

        if let FieldValue::Choice(selected) = &value {
            let available = self.available_choices().await?;
            if let Some(missing) = selected.iter().find(|c| !available.contains(c)) {
                return Err(CbError::InvalidChoice {
                    field: self.name.clone(),
                    choice: missing.name.clone(),
                });
            }
        }

        Ok(value)
    }

    pub(crate) fn wire_entry(&self, value: &FieldValue) -> Value {
        value.wire_entry(Some(self.id), &self.name)
    }

    pub(crate) fn commit(&mut self, value: FieldValue) {
        self.value = value;
    }
}

/// Send field values for one item in a single quiet-mode update.
pub(crate) async fn update_item_fields(client: &RestClient, item_id: i64, body: &Value) -> Result<()> {
    client
        .put(
            &format!("items/{item_id}/fields"),
            &[("quietMode", "true")],
            body,
        )
        .await
        .map_err(|e| e.for_entity("item", item_id))?;
    Ok(())
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let mut entry = self.wire_entry(&self.value);
        entry["editable"] = json!(self.editable);
        if !self.shared_field_names.is_empty() {
            entry["sharedFieldNames"] = json!(self.shared_field_names);
        }
        entry.serialize(serializer)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client() -> RestClient {
        RestClient::new("https://cb.example.com", "u", "p").unwrap()
    }

    fn date() -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_micro_opt(8, 30, 0, 1)
            .unwrap()
    }

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_tag(kind.tag()).unwrap(), kind);
        }
        assert!(matches!(
            FieldKind::from_tag("TableFieldValue"),
            Err(CbError::UnknownFieldType(tag)) if tag == "TableFieldValue"
        ));
    }

    #[test]
    fn test_coerce_rules() {
        assert_eq!(
            FieldKind::Integer.coerce(5.into()).unwrap(),
            FieldValue::Integer(Some(5))
        );
        assert!(matches!(
            FieldKind::Integer.coerce("5".into()),
            Err(CbError::TypeMismatch { expected: "integer", found: "text" })
        ));

        assert_eq!(
            FieldKind::Text.coerce(42.into()).unwrap(),
            FieldValue::Text(Some("42".to_string()))
        );
        assert_eq!(
            FieldKind::WikiText.coerce(date().into()).unwrap(),
            FieldValue::WikiText(Some("2024-05-01T08:30:00.000001".to_string()))
        );
        assert!(FieldKind::Text
            .coerce(ChoiceValue::new(1, "a").into())
            .is_err());

        assert_eq!(
            FieldKind::Color.coerce("#ff0000".into()).unwrap(),
            FieldValue::Color(Some("#ff0000".to_string()))
        );
        assert!(FieldKind::Color.coerce(7.into()).is_err());

        assert_eq!(
            FieldKind::Date.coerce(date().into()).unwrap(),
            FieldValue::Date(Some(date()))
        );
        assert!(FieldKind::Date.coerce("2024-05-01".into()).is_err());

        assert!(FieldKind::Choice.coerce(Vec::new().into()).is_err());
        assert!(FieldKind::Choice.coerce(3.into()).is_err());
    }

    #[test]
    fn test_value_from_payload() {
        let v = FieldValue::from_payload(
            "IntegerFieldValue",
            &json!({"fieldId": 1, "name": "Story Points", "type": "IntegerFieldValue", "value": 8}),
        )
        .unwrap();
        assert_eq!(v.as_integer(), Some(8));

        let v = FieldValue::from_payload("DateFieldValue", &json!({"value": null})).unwrap();
        assert_eq!(v, FieldValue::Date(None));
        assert!(v.is_empty());

        assert!(matches!(
            FieldValue::from_payload("DateFieldValue", &json!({"value": "2024-05-01T08:30:00"})),
            Err(CbError::InvalidTimestamp(_))
        ));

        let v = FieldValue::from_payload(
            "ChoiceFieldValue",
            &json!({"values": [{"id": 2, "name": "High", "type": "ChoiceOptionReference"}]}),
        )
        .unwrap();
        assert_eq!(v.as_choices().len(), 1);
        assert_eq!(v.to_string(), "High");
    }

    #[test]
    fn test_unknown_tag_is_readable() {
        let v = FieldValue::from_payload(
            "TableFieldValue",
            &json!({"values": [[{"a": 1}]]}),
        )
        .unwrap();
        assert_eq!(v.kind(), None);
        assert_eq!(v.tag(), "TableFieldValue");
        assert!(!v.is_empty());
    }

    #[test]
    fn test_wire_entry_shapes() {
        let v = FieldValue::Date(Some(date()));
        assert_eq!(
            v.wire_entry(Some(3), "Due"),
            json!({"fieldId": 3, "name": "Due", "type": "DateFieldValue", "value": "2024-05-01T08:30:00.000001"})
        );

        let v = FieldValue::Choice(vec![ChoiceValue::new(4, "Open")]);
        assert_eq!(
            v.wire_entry(None, "Status"),
            json!({
                "name": "Status",
                "type": "ChoiceFieldValue",
                "values": [{"id": 4, "name": "Open", "type": "ChoiceOptionReference"}]
            })
        );
    }

    #[test]
    fn test_field_from_payload() {
        let field = Field::from_payload(
            &client(),
            10,
            true,
            &json!({
                "fieldId": 3,
                "name": "Summary",
                "type": "TextFieldValue",
                "value": "Fix it",
                "sharedFieldNames": ["Title"]
            }),
        )
        .unwrap();
        assert_eq!(field.id(), 3);
        assert_eq!(field.item_id(), 10);
        assert_eq!(field.kind(), Some(FieldKind::Text));
        assert_eq!(field.value().as_text(), Some("Fix it"));
        assert_eq!(field.shared_field_names(), ["Title".to_string()]);

        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["editable"], true);
        assert_eq!(json["value"], "Fix it");

        assert!(Field::from_payload(&client(), 10, true, &json!({"name": "x"})).is_err());
    }

    #[tokio::test]
    async fn test_read_only_field_rejects_write_without_network() {
        let mut field = Field::from_payload(
            &client(),
            10,
            false,
            &json!({"fieldId": 3, "name": "Summary", "type": "TextFieldValue", "value": "a"}),
        )
        .unwrap();
        let err = field.set_value("b").await.unwrap_err();
        assert!(matches!(err, CbError::NotEditable { field } if field == "Summary"));
        assert_eq!(field.value().as_text(), Some("a"));
    }

    #[tokio::test]
    async fn test_unsupported_field_rejects_write() {
        let mut field = Field::from_payload(
            &client(),
            10,
            true,
            &json!({"fieldId": 3, "name": "Grid", "type": "TableFieldValue", "values": []}),
        )
        .unwrap();
        assert!(matches!(
            field.set_value("b").await,
            Err(CbError::UnknownFieldType(tag)) if tag == "TableFieldValue"
        ));
    }
}
