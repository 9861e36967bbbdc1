//! Tracker field schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::RestClient;
use crate::error::{CbError, Result};
use crate::lazy::Lazy;
use crate::models::{identified_by_id, payload_id, payload_name, ChoiceValue, EntityView, Lookup, Tracker};
use crate::traits::Get;

/// Type tag of a field reference (partial payload).
const FIELD_REFERENCE: &str = "FieldReference";

/// Type tag of a definition whose options are enumerated.
const OPTION_CHOICE_FIELD: &str = "OptionChoiceField";

/// The definition of a field on a tracker.
///
/// Tracker field listings return references (`type: FieldReference`);
/// the definition itself comes from `trackers/{trackerId}/fields/{id}`.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    client: RestClient,
    id: i64,
    name: String,
    tracker_id: i64,
    detail: Lazy<FieldDefinitionDetail>,
}

identified_by_id!(FieldDefinition);

/// Schema attributes of a [`FieldDefinition`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinitionDetail {
    /// Definition type, e.g. `TextField` or `OptionChoiceField`.
    #[serde(rename = "type")]
    pub field_type: String,
    pub description: Option<String>,
    pub formula: Option<String>,
    pub hidden: Option<bool>,
    pub hide_if_dependency_formula: Option<String>,
    pub legacy_rest_name: Option<String>,
    pub mandatory_if_dependency_formula: Option<String>,
    pub mandatory_in_statuses: Option<Value>,
    pub multiple_values: Option<bool>,
    pub options: Option<Vec<ChoiceValue>>,
    pub shared_fields: Vec<FieldDefinition>,
    pub title: Option<String>,
    pub tracker_item_field: Option<String>,
    pub value_model: Option<String>,
    pub reference_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldDefinitionPayload {
    #[serde(rename = "type", default)]
    field_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    formula: Option<String>,
    #[serde(default)]
    hidden: Option<bool>,
    #[serde(default)]
    hide_if_dependency_formula: Option<String>,
    #[serde(default)]
    legacy_rest_name: Option<String>,
    #[serde(default)]
    mandatory_if_dependency_formula: Option<String>,
    #[serde(default)]
    mandatory_in_statuses: Option<Value>,
    #[serde(default)]
    multiple_values: Option<bool>,
    #[serde(default)]
    options: Option<Vec<ChoiceValue>>,
    #[serde(default)]
    shared_fields: Vec<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    tracker_item_field: Option<String>,
    #[serde(default)]
    value_model: Option<String>,
    #[serde(default)]
    reference_type: Option<String>,
}

impl FieldDefinitionDetail {
    fn from_payload(client: &RestClient, tracker_id: i64, payload: Value) -> Result<Self> {
        let raw: FieldDefinitionPayload = serde_json::from_value(payload)?;
        let shared_fields = raw
            .shared_fields
            .into_iter()
            .map(|shared| FieldDefinition::from_payload(client, shared, Some(tracker_id)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            field_type: raw.field_type,
            description: raw.description,
            formula: raw.formula,
            hidden: raw.hidden,
            hide_if_dependency_formula: raw.hide_if_dependency_formula,
            legacy_rest_name: raw.legacy_rest_name,
            mandatory_if_dependency_formula: raw.mandatory_if_dependency_formula,
            mandatory_in_statuses: raw.mandatory_in_statuses,
            multiple_values: raw.multiple_values,
            options: raw.options,
            shared_fields,
            title: raw.title,
            tracker_item_field: raw.tracker_item_field,
            value_model: raw.value_model,
            reference_type: raw.reference_type,
        })
    }
}

impl FieldDefinition {
    /// Build a definition from a field payload.
    ///
    /// The owning tracker comes from the payload's `trackerId`, falling back
    /// to `tracker_id` for payloads fetched through a tracker.
    pub fn from_payload(client: &RestClient, payload: Value, tracker_id: Option<i64>) -> Result<Self> {
        let id = payload_id(&payload, "field")?;
        let name = payload_name(&payload);
        let tracker_id = payload
            .get("trackerId")
            .and_then(Value::as_i64)
            .or(tracker_id)
            .ok_or_else(|| CbError::MalformedPayload(format!("field {id} without a tracker")))?;

        let is_reference = payload.get("type").and_then(Value::as_str) == Some(FIELD_REFERENCE);
        let detail = if is_reference {
            Lazy::partial()
        } else {
            Lazy::full(FieldDefinitionDetail::from_payload(client, tracker_id, payload)?)
        };

        Ok(Self {
            client: client.clone(),
            id,
            name,
            tracker_id,
            detail,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the tracker this field belongs to.
    pub fn tracker_id(&self) -> i64 {
        self.tracker_id
    }

    pub fn is_loaded(&self) -> bool {
        self.detail.is_loaded()
    }

    /// The definition's attributes, fetched on first access.
    pub async fn detail(&self) -> Result<&FieldDefinitionDetail> {
        self.detail
            .get_or_load(|| Self::fetch_detail(&self.client, self.tracker_id, self.id))
            .await
    }

    /// Make sure the definition is loaded.
    pub async fn load(&self) -> Result<()> {
        self.detail().await.map(|_| ())
    }

    /// Re-fetch the definition even if it is already loaded.
    pub async fn refresh(&mut self) -> Result<()> {
        let detail = Self::fetch_detail(&self.client, self.tracker_id, self.id).await?;
        self.detail.replace(detail);
        Ok(())
    }

    /// A partial copy with the same id, name and tracker.
    pub fn reference(&self) -> Self {
        Self {
            client: self.client.clone(),
            id: self.id,
            name: self.name.clone(),
            tracker_id: self.tracker_id,
            detail: Lazy::partial(),
        }
    }

    /// Fetch the tracker this field belongs to.
    pub async fn tracker(&self) -> Result<Tracker> {
        Tracker::get(&self.client, self.tracker_id).await
    }

    /// One of the enumerated options, by id or name.
    ///
    /// Only `OptionChoiceField` definitions enumerate options; every other
    /// definition yields `None`.
    pub async fn get_choice(&self, lookup: impl Into<Lookup>) -> Result<Option<ChoiceValue>> {
        let lookup = lookup.into();
        let detail = self.detail().await?;
        if detail.field_type != OPTION_CHOICE_FIELD {
            return Ok(None);
        }
        let options = detail.options.as_deref().unwrap_or_default();
        Ok(lookup.find(options).cloned())
    }

    #[tracing::instrument(skip(client))]
    async fn fetch_detail(client: &RestClient, tracker_id: i64, id: i64) -> Result<FieldDefinitionDetail> {
        tracing::debug!("loading field definition");
        let payload = client
            .get_json(&format!("trackers/{tracker_id}/fields/{id}"))
            .await
            .map_err(|e| e.for_entity("field", id))?;
        FieldDefinitionDetail::from_payload(client, tracker_id, payload)
    }
}

impl Serialize for FieldDefinition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct FieldDefinitionView<'a> {
            #[serde(flatten)]
            entity: EntityView<'a, FieldDefinitionDetail>,
            #[serde(rename = "trackerId")]
            tracker_id: i64,
        }

        FieldDefinitionView {
            entity: EntityView {
                id: self.id,
                name: &self.name,
                detail: self.detail.get(),
            },
            tracker_id: self.tracker_id,
        }
        .serialize(serializer)
    }
}

#[async_trait]
impl Get for FieldDefinition {
    /// `(tracker id, field id)`
    type Id = (i64, i64);

    #[tracing::instrument(skip(client))]
    async fn get(client: &RestClient, (tracker_id, id): (i64, i64)) -> Result<Self> {
        let payload = client
            .get_json(&format!("trackers/{tracker_id}/fields/{id}"))
            .await
            .map_err(|e| e.for_entity("field", id))?;
        Self::from_payload(client, payload, Some(tracker_id))
    }
}
