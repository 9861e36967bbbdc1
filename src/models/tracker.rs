//! Tracker model and trait implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::RestClient;
use crate::error::{CbError, NotFoundExt, Result};
use crate::lazy::Lazy;
use crate::models::{
    has_type_tag, identified_by_id, into_array, payload_id, payload_name, user_ref, EntityView,
    FieldDefinition, ItemQuery, Lookup, NewTrackerItem, Project, TrackerItem, User,
};
use crate::pagination::PageRequest;
use crate::timestamp::Timestamp;
use crate::traits::{Get, List};

/// A tracker: the container of tracker items and of their field schema.
#[derive(Debug, Clone)]
pub struct Tracker {
    client: RestClient,
    id: i64,
    name: String,
    /// Set when the tracker was reached through its project.
    project: Option<Project>,
    detail: Lazy<TrackerDetail>,
}

identified_by_id!(Tracker);

/// Attributes of a [`Tracker`] beyond id and name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerDetail {
    pub description: Option<String>,
    pub description_format: Option<String>,
    pub key_name: Option<String>,
    pub version: Option<i64>,
    #[serde(with = "crate::timestamp::option")]
    pub created_at: Option<Timestamp>,
    pub created_by: Option<User>,
    #[serde(with = "crate::timestamp::option")]
    pub modified_at: Option<Timestamp>,
    pub modified_by: Option<User>,
    /// The tracker type object (`{id, name, ...}`).
    #[serde(rename = "type")]
    pub tracker_type: Option<Value>,
    pub deleted: Option<bool>,
    pub hidden: Option<bool>,
    pub color: Option<String>,
    pub using_workflow: Option<bool>,
    pub only_workflow_can_create_new_referring_item: Option<bool>,
    pub using_quick_transitions: Option<bool>,
    pub default_show_ancestor_items: Option<bool>,
    pub default_show_descendant_items: Option<bool>,
    pub project: Option<Project>,
    pub available_as_template: Option<bool>,
    pub shared_in_working_set: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackerPayload {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    description_format: Option<String>,
    #[serde(default)]
    key_name: Option<String>,
    #[serde(default)]
    version: Option<i64>,
    #[serde(default, with = "crate::timestamp::option")]
    created_at: Option<Timestamp>,
    #[serde(default)]
    created_by: Option<Value>,
    #[serde(default, with = "crate::timestamp::option")]
    modified_at: Option<Timestamp>,
    #[serde(default)]
    modified_by: Option<Value>,
    #[serde(rename = "type", default)]
    tracker_type: Option<Value>,
    #[serde(default)]
    deleted: Option<bool>,
    #[serde(default)]
    hidden: Option<bool>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    using_workflow: Option<bool>,
    #[serde(default)]
    only_workflow_can_create_new_referring_item: Option<bool>,
    #[serde(default)]
    using_quick_transitions: Option<bool>,
    #[serde(default)]
    default_show_ancestor_items: Option<bool>,
    #[serde(default)]
    default_show_descendant_items: Option<bool>,
    #[serde(default)]
    project: Option<Value>,
    #[serde(default)]
    available_as_template: Option<bool>,
    #[serde(default)]
    shared_in_working_set: Option<bool>,
}

impl TrackerDetail {
    fn from_payload(client: &RestClient, payload: Value) -> Result<Self> {
        let raw: TrackerPayload = serde_json::from_value(payload)?;
        let project = match raw.project {
            None | Some(Value::Null) => None,
            Some(project) => Some(Project::from_payload(client, project)?),
        };

        Ok(Self {
            description: raw.description,
            description_format: raw.description_format,
            key_name: raw.key_name,
            version: raw.version,
            created_at: raw.created_at,
            created_by: user_ref(client, raw.created_by)?,
            modified_at: raw.modified_at,
            modified_by: user_ref(client, raw.modified_by)?,
            tracker_type: raw.tracker_type,
            deleted: raw.deleted,
            hidden: raw.hidden,
            color: raw.color,
            using_workflow: raw.using_workflow,
            only_workflow_can_create_new_referring_item: raw.only_workflow_can_create_new_referring_item,
            using_quick_transitions: raw.using_quick_transitions,
            default_show_ancestor_items: raw.default_show_ancestor_items,
            default_show_descendant_items: raw.default_show_descendant_items,
            project,
            available_as_template: raw.available_as_template,
            shared_in_working_set: raw.shared_in_working_set,
        })
    }
}

impl Tracker {
    /// Build a tracker from any tracker payload.
    ///
    /// In references the `type` key is a string tag; in the tracker detail
    /// it is the tracker type object. Only the former yields a partial
    /// tracker.
    pub fn from_payload(client: &RestClient, payload: Value) -> Result<Self> {
        let id = payload_id(&payload, "tracker")?;
        let name = payload_name(&payload);
        let detail = if has_type_tag(&payload) {
            Lazy::partial()
        } else {
            Lazy::full(TrackerDetail::from_payload(client, payload)?)
        };

        Ok(Self {
            client: client.clone(),
            id,
            name,
            project: None,
            detail,
        })
    }

    /// Attach the project this tracker was reached through.
    #[must_use]
    pub fn with_project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.detail.is_loaded()
    }

    /// The detail if it is already loaded; never fetches.
    pub fn cached_detail(&self) -> Option<&TrackerDetail> {
        self.detail.get()
    }

    /// The tracker's attributes, fetched on first access.
    pub async fn detail(&self) -> Result<&TrackerDetail> {
        self.detail
            .get_or_load(|| Self::fetch_detail(&self.client, self.id))
            .await
    }

    /// Make sure the tracker is loaded.
    pub async fn load(&self) -> Result<()> {
        self.detail().await.map(|_| ())
    }

    /// Re-fetch the tracker even if it is already loaded.
    pub async fn refresh(&mut self) -> Result<()> {
        let detail = Self::fetch_detail(&self.client, self.id).await?;
        self.detail.replace(detail);
        Ok(())
    }

    /// A partial copy with the same id, name and project.
    pub fn reference(&self) -> Self {
        Self {
            client: self.client.clone(),
            id: self.id,
            name: self.name.clone(),
            project: self.project.clone(),
            detail: Lazy::partial(),
        }
    }

    /// The owning project.
    ///
    /// Known without I/O when the tracker was reached through its project;
    /// otherwise taken from the tracker detail.
    pub async fn project(&self) -> Result<Option<&Project>> {
        if let Some(project) = &self.project {
            return Ok(Some(project));
        }
        Ok(self.detail().await?.project.as_ref())
    }

    /// Items of this tracker. Page `0` fetches every page.
    ///
    /// Items come back partial and keep a reference to this tracker.
    #[tracing::instrument(skip(self), fields(tracker = self.id))]
    pub async fn get_items(&self, page: u32, page_size: u32) -> Result<Vec<TrackerItem>> {
        let items = TrackerItem::list(
            &self.client,
            &ItemQuery::Tracker(self.id),
            PageRequest::new(page, page_size),
        )
        .await
        .map_err(|e| e.for_entity("tracker", self.id))?;

        Ok(items
            .into_iter()
            .map(|item| item.with_tracker(self.reference()))
            .collect())
    }

    /// The field definitions of this tracker (as references).
    #[tracing::instrument(skip(self), fields(tracker = self.id))]
    pub async fn get_fields(&self) -> Result<Vec<FieldDefinition>> {
        let payload = self
            .client
            .get_json(&format!("trackers/{}/fields", self.id))
            .await
            .map_err(|e| e.for_entity("tracker", self.id))?;

        into_array(payload, "tracker fields")?
            .into_iter()
            .map(|field| FieldDefinition::from_payload(&self.client, field, Some(self.id)))
            .collect()
    }

    /// One field definition, by id (fetched in full) or by name (scanned
    /// from the field listing).
    pub async fn get_field(&self, lookup: impl Into<Lookup>) -> Result<Option<FieldDefinition>> {
        match lookup.into() {
            Lookup::Id(id) => FieldDefinition::get(&self.client, (self.id, id)).await.found(),
            lookup @ Lookup::Name(_) => Ok(self
                .get_fields()
                .await?
                .into_iter()
                .find(|field| lookup.matches(field.id(), field.name()))),
        }
    }

    /// Create an item in this tracker.
    #[tracing::instrument(skip(self, item), fields(tracker = self.id))]
    pub async fn create_item(&self, item: &NewTrackerItem) -> Result<TrackerItem> {
        let response = self
            .client
            .post(&format!("trackers/{}/items", self.id), &item.to_json())
            .await
            .map_err(|e| e.for_entity("tracker", self.id))?;
        let payload: Value = response.json().await.map_err(CbError::HttpError)?;

        let created = TrackerItem::from_payload(&self.client, payload)?.with_tracker(self.reference());
        tracing::debug!(item = created.id(), "created tracker item");
        Ok(created)
    }

    #[tracing::instrument(skip(client))]
    async fn fetch_detail(client: &RestClient, id: i64) -> Result<TrackerDetail> {
        tracing::debug!("loading tracker detail");
        let payload = client
            .get_json(&format!("trackers/{id}"))
            .await
            .map_err(|e| e.for_entity("tracker", id))?;
        TrackerDetail::from_payload(client, payload)
    }
}

impl Serialize for Tracker {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        EntityView {
            id: self.id,
            name: &self.name,
            detail: self.detail.get(),
        }
        .serialize(serializer)
    }
}

impl std::fmt::Display for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[async_trait]
impl Get for Tracker {
    type Id = i64;

    #[tracing::instrument(skip(client))]
    async fn get(client: &RestClient, id: i64) -> Result<Self> {
        let payload = client
            .get_json(&format!("trackers/{id}"))
            .await
            .map_err(|e| e.for_entity("tracker", id))?;
        Self::from_payload(client, payload)
    }
}
