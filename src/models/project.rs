//! Project model and trait implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::RestClient;
use crate::error::Result;
use crate::lazy::Lazy;
use crate::models::{
    identified_by_id, into_array, payload_id, payload_name, user_ref, EntityView, Lookup, Tracker, User,
};
use crate::timestamp::Timestamp;
use crate::traits::Get;

/// A codeBeamer project.
///
/// Projects are the top-level containers for trackers. The project listing
/// returns references only; the remaining attributes are fetched from
/// `projects/{id}` on first access to [`detail`](Self::detail).
#[derive(Debug, Clone)]
pub struct Project {
    client: RestClient,
    id: i64,
    name: String,
    detail: Lazy<ProjectDetail>,
}

identified_by_id!(Project);

/// Attributes of a [`Project`] beyond id and name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    pub description: Option<String>,
    pub description_format: Option<String>,
    pub version: Option<i64>,
    pub key_name: Option<String>,
    pub category: Option<String>,
    pub closed: Option<bool>,
    pub deleted: Option<bool>,
    pub template: Option<bool>,
    #[serde(with = "crate::timestamp::option")]
    pub created_at: Option<Timestamp>,
    pub created_by: Option<User>,
    #[serde(with = "crate::timestamp::option")]
    pub modified_at: Option<Timestamp>,
    pub modified_by: Option<User>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectPayload {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    description_format: Option<String>,
    #[serde(default)]
    version: Option<i64>,
    #[serde(default)]
    key_name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    closed: Option<bool>,
    #[serde(default)]
    deleted: Option<bool>,
    #[serde(default)]
    template: Option<bool>,
    #[serde(default, with = "crate::timestamp::option")]
    created_at: Option<Timestamp>,
    #[serde(default)]
    created_by: Option<Value>,
    #[serde(default, with = "crate::timestamp::option")]
    modified_at: Option<Timestamp>,
    #[serde(default)]
    modified_by: Option<Value>,
}

impl ProjectDetail {
    fn from_payload(client: &RestClient, payload: Value) -> Result<Self> {
        let raw: ProjectPayload = serde_json::from_value(payload)?;
        Ok(Self {
            description: raw.description,
            description_format: raw.description_format,
            version: raw.version,
            key_name: raw.key_name,
            category: raw.category,
            closed: raw.closed,
            deleted: raw.deleted,
            template: raw.template,
            created_at: raw.created_at,
            created_by: user_ref(client, raw.created_by)?,
            modified_at: raw.modified_at,
            modified_by: user_ref(client, raw.modified_by)?,
        })
    }
}

impl Project {
    /// Build a project from any project payload.
    ///
    /// Only the project listing carries a `type` key; such payloads yield a
    /// partial project.
    pub fn from_payload(client: &RestClient, payload: Value) -> Result<Self> {
        let id = payload_id(&payload, "project")?;
        let name = payload_name(&payload);
        let detail = if payload.get("type").is_some() {
            Lazy::partial()
        } else {
            Lazy::full(ProjectDetail::from_payload(client, payload)?)
        };

        Ok(Self {
            client: client.clone(),
            id,
            name,
            detail,
        })
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
    pub fn cached_detail(&self) -> Option<&ProjectDetail> {
        self.detail.get()
    }

    /// The project's attributes, fetched on first access.
    pub async fn detail(&self) -> Result<&ProjectDetail> {
        self.detail
            .get_or_load(|| Self::fetch_detail(&self.client, self.id))
            .await
    }

    /// Make sure the project is loaded.
    pub async fn load(&self) -> Result<()> {
        self.detail().await.map(|_| ())
    }

    /// Re-fetch the project even if it is already loaded.
    pub async fn refresh(&mut self) -> Result<()> {
        let detail = Self::fetch_detail(&self.client, self.id).await?;
        self.detail.replace(detail);
        Ok(())
    }

    /// A partial copy with the same id and name.
    pub fn reference(&self) -> Self {
        Self {
            client: self.client.clone(),
            id: self.id,
            name: self.name.clone(),
            detail: Lazy::partial(),
        }
    }

    /// All trackers of this project.
    ///
    /// Each tracker keeps a reference back to this project.
    #[tracing::instrument(skip(self), fields(project = self.id))]
    pub async fn get_trackers(&self) -> Result<Vec<Tracker>> {
        let payload = self
            .client
            .get_json(&format!("projects/{}/trackers", self.id))
            .await
            .map_err(|e| e.for_entity("project", self.id))?;

        into_array(payload, "project trackers")?
            .into_iter()
            .map(|tracker| {
                Tracker::from_payload(&self.client, tracker)
                    .map(|tracker| tracker.with_project(self.reference()))
            })
            .collect()
    }

    /// One tracker of this project, by id or name.
    pub async fn get_tracker(&self, lookup: impl Into<Lookup>) -> Result<Option<Tracker>> {
        let lookup = lookup.into();
        let trackers = self.get_trackers().await?;
        Ok(trackers
            .into_iter()
            .find(|tracker| lookup.matches(tracker.id(), tracker.name())))
    }

    #[tracing::instrument(skip(client))]
    async fn fetch_detail(client: &RestClient, id: i64) -> Result<ProjectDetail> {
        tracing::debug!("loading project detail");
        let payload = client
            .get_json(&format!("projects/{id}"))
            .await
            .map_err(|e| e.for_entity("project", id))?;
        ProjectDetail::from_payload(client, payload)
    }
}

impl Serialize for Project {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        EntityView {
            id: self.id,
            name: &self.name,
            detail: self.detail.get(),
        }
        .serialize(serializer)
    }
}

impl std::fmt::Display for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[async_trait]
impl Get for Project {
    type Id = i64;

    #[tracing::instrument(skip(client))]
    async fn get(client: &RestClient, id: i64) -> Result<Self> {
        let payload = client
            .get_json(&format!("projects/{id}"))
            .await
            .map_err(|e| e.for_entity("project", id))?;
        Self::from_payload(client, payload)
    }
}
