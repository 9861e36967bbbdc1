//! Tracker item model and trait implementations.
//!
//! An item has two lazily fetched parts: its detail (`items/{id}`) and its
//! field listing (`items/{id}/fields`), which is the only source telling
//! which fields are editable. Field writes go through the listing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::RestClient;
use crate::error::{CbError, Result};
use crate::lazy::Lazy;
use crate::models::field::update_item_fields;
use crate::models::{
    has_type_tag, identified_by_id, payload_id, payload_name, user_list, user_ref, Association,
    AssociationKind, EntityView, Field, FieldDefinition, FieldInput, Lookup, Tracker, User,
};
use crate::pagination::{Page, PageParams, PageRequest};
use crate::timestamp::Timestamp;
use crate::traits::{Get, List};

/// A tracker item.
#[derive(Debug, Clone)]
pub struct TrackerItem {
    client: RestClient,
    id: i64,
    name: String,
    /// Set when the item was reached through its tracker.
    tracker: Option<Tracker>,
    /// Set when the item was reached through its parent.
    parent: Option<Box<TrackerItem>>,
    detail: Lazy<ItemDetail>,
    fields: Lazy<Vec<Field>>,
}

identified_by_id!(TrackerItem);

/// Attributes of a [`TrackerItem`] beyond id and name.
///
/// System fields (status, priority, ...) are snapshots from the item
/// detail and do not know whether they are editable; use
/// [`TrackerItem::status`] and friends for the editable view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub tracker: Option<Tracker>,
    pub parent: Option<Box<TrackerItem>>,
    /// The first children embedded in the detail, extended by
    /// [`TrackerItem::get_children`].
    pub children: Vec<TrackerItem>,
    pub description: Option<String>,
    pub description_format: Option<String>,
    #[serde(with = "crate::timestamp::option")]
    pub created_at: Option<Timestamp>,
    pub created_by: Option<User>,
    #[serde(with = "crate::timestamp::option")]
    pub modified_at: Option<Timestamp>,
    pub modified_by: Option<User>,
    pub version: Option<i64>,
    pub assigned_to: Vec<User>,
    pub owners: Vec<User>,
    #[serde(with = "crate::timestamp::option")]
    pub assigned_at: Option<Timestamp>,
    #[serde(with = "crate::timestamp::option")]
    pub closed_at: Option<Timestamp>,
    #[serde(with = "crate::timestamp::option")]
    pub start_date: Option<Timestamp>,
    #[serde(with = "crate::timestamp::option")]
    pub end_date: Option<Timestamp>,
    pub accrued_millis: Option<i64>,
    pub estimated_millis: Option<i64>,
    pub spent_millis: Option<i64>,
    pub story_points: Option<i64>,
    pub ordinal: Option<i64>,
    pub type_name: Option<String>,
    pub priority: Option<Field>,
    pub status: Option<Field>,
    pub categories: Vec<Field>,
    pub subjects: Vec<Field>,
    pub resolutions: Vec<Field>,
    pub severities: Vec<Field>,
    pub teams: Vec<Field>,
    pub custom_fields: Vec<Field>,
    pub areas: Option<Value>,
    pub platforms: Option<Value>,
    pub formality: Option<Value>,
    pub release_method: Option<Value>,
    pub versions: Option<Value>,
    pub comments: Option<Value>,
    pub tags: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemPayload {
    #[serde(default)]
    tracker: Option<Value>,
    #[serde(default)]
    parent: Option<Value>,
    #[serde(default)]
    children: Vec<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    description_format: Option<String>,
    #[serde(default, with = "crate::timestamp::option")]
    created_at: Option<Timestamp>,
    #[serde(default)]
    created_by: Option<Value>,
    #[serde(default, with = "crate::timestamp::option")]
    modified_at: Option<Timestamp>,
    #[serde(default)]
    modified_by: Option<Value>,
    #[serde(default)]
    version: Option<i64>,
    #[serde(default)]
    assigned_to: Option<Value>,
    #[serde(default)]
    owners: Option<Value>,
    #[serde(default, with = "crate::timestamp::option")]
    assigned_at: Option<Timestamp>,
    #[serde(default, with = "crate::timestamp::option")]
    closed_at: Option<Timestamp>,
    #[serde(default, with = "crate::timestamp::option")]
    start_date: Option<Timestamp>,
    #[serde(default, with = "crate::timestamp::option")]
    end_date: Option<Timestamp>,
    #[serde(default)]
    accrued_millis: Option<i64>,
    #[serde(default)]
    estimated_millis: Option<i64>,
    #[serde(default)]
    spent_millis: Option<i64>,
    #[serde(default)]
    story_points: Option<i64>,
    #[serde(default)]
    ordinal: Option<i64>,
    #[serde(default)]
    type_name: Option<String>,
    #[serde(default)]
    priority: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    categories: Option<Value>,
    #[serde(default)]
    subjects: Option<Value>,
    #[serde(default)]
    resolutions: Option<Value>,
    #[serde(default)]
    severities: Option<Value>,
    #[serde(default)]
    teams: Option<Value>,
    #[serde(default)]
    custom_fields: Vec<Value>,
    #[serde(default)]
    areas: Option<Value>,
    #[serde(default)]
    platforms: Option<Value>,
    #[serde(default)]
    formality: Option<Value>,
    #[serde(default)]
    release_method: Option<Value>,
    #[serde(default)]
    versions: Option<Value>,
    #[serde(default)]
    comments: Option<Value>,
    #[serde(default)]
    tags: Option<Value>,
}

/// A system field embedded in the item detail. Absent, null and empty
/// list payloads all mean "not set".
fn system_field(client: &RestClient, item_id: i64, payload: Option<Value>) -> Result<Option<Field>> {
    match payload {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(values)) if values.is_empty() => Ok(None),
        Some(payload) => Field::from_payload(client, item_id, false, &payload).map(Some),
    }
}

/// A multi-valued system field (categories, subjects, ...): one field
/// value payload per entry. Absent and null payloads mean no entries.
fn system_fields(client: &RestClient, item_id: i64, payload: Option<Value>) -> Result<Vec<Field>> {
    match payload {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| Field::from_payload(client, item_id, false, value))
            .collect(),
        Some(payload) => Field::from_payload(client, item_id, false, &payload).map(|field| vec![field]),
    }
}

impl ItemDetail {
    fn from_payload(client: &RestClient, id: i64, name: &str, payload: Value) -> Result<Self> {
        let raw: ItemPayload = serde_json::from_value(payload)?;

        let tracker = match raw.tracker {
            None | Some(Value::Null) => None,
            Some(tracker) => Some(Tracker::from_payload(client, tracker)?),
        };
        let parent = match raw.parent {
            None | Some(Value::Null) => None,
            Some(parent) => {
                let parent = TrackerItem::from_payload(client, parent)?;
                Some(Box::new(match &tracker {
                    Some(tracker) => parent.with_tracker(tracker.reference()),
                    None => parent,
                }))
            }
        };

        let mut this = TrackerItem::partial(client, id, name);
        this.tracker = tracker.as_ref().map(Tracker::reference);
        let children = raw
            .children
            .into_iter()
            .map(|child| -> Result<TrackerItem> {
                Ok(TrackerItem::from_payload(client, child)?.adopted_by(&this))
            })
            .collect::<Result<Vec<_>>>()?;

        let custom_fields = raw
            .custom_fields
            .iter()
            .map(|field| Field::from_payload(client, id, false, field))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tracker,
            parent,
            children,
            description: raw.description,
            description_format: raw.description_format,
            created_at: raw.created_at,
            created_by: user_ref(client, raw.created_by)?,
            modified_at: raw.modified_at,
            modified_by: user_ref(client, raw.modified_by)?,
            version: raw.version,
            assigned_to: user_list(client, raw.assigned_to)?,
            owners: user_list(client, raw.owners)?,
            assigned_at: raw.assigned_at,
            closed_at: raw.closed_at,
            start_date: raw.start_date,
            end_date: raw.end_date,
            accrued_millis: raw.accrued_millis,
            estimated_millis: raw.estimated_millis,
            spent_millis: raw.spent_millis,
            story_points: raw.story_points,
            ordinal: raw.ordinal,
            type_name: raw.type_name,
            priority: system_field(client, id, raw.priority)?,
            status: system_field(client, id, raw.status)?,
            categories: system_fields(client, id, raw.categories)?,
            subjects: system_fields(client, id, raw.subjects)?,
            resolutions: system_fields(client, id, raw.resolutions)?,
            severities: system_fields(client, id, raw.severities)?,
            teams: system_fields(client, id, raw.teams)?,
            custom_fields,
            areas: raw.areas,
            platforms: raw.platforms,
            formality: raw.formality,
            release_method: raw.release_method,
            versions: raw.versions,
            comments: raw.comments,
            tags: raw.tags,
        })
    }
}

/// Add `incoming` items to `known`, skipping ids already present.
///
/// Known items keep their position; new ones are appended in the order
/// they arrive.
pub(crate) fn merge_by_id(known: &mut Vec<TrackerItem>, incoming: impl IntoIterator<Item = TrackerItem>) {
    for item in incoming {
        if !known.contains(&item) {
            known.push(item);
        }
    }
}

/// Where to list tracker items from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemQuery {
    /// Items of a tracker (`trackers/{id}/items`).
    Tracker(i64),
    /// Children of an item (`items/{id}/children`).
    Children(i64),
    /// A cbQL search (`items/query`).
    Cbql(String),
}

impl TrackerItem {
    /// Build an item from any item payload.
    ///
    /// Reference payloads (listings, children, parents) carry a string
    /// `type` tag and yield a partial item.
    pub fn from_payload(client: &RestClient, payload: Value) -> Result<Self> {
        let id = payload_id(&payload, "item")?;
        let name = payload_name(&payload);
        let mut item = Self::partial(client, id, &name);
        if !has_type_tag(&payload) {
            let detail = ItemDetail::from_payload(client, id, &name, payload)?;
            item.parent = detail.parent.clone();
            item.detail = Lazy::full(detail);
        }
        Ok(item)
    }

    fn partial(client: &RestClient, id: i64, name: &str) -> Self {
        Self {
            client: client.clone(),
            id,
            name: name.to_string(),
            tracker: None,
            parent: None,
            detail: Lazy::partial(),
            fields: Lazy::partial(),
        }
    }

    /// Attach the tracker this item was reached through.
    #[must_use]
    pub fn with_tracker(mut self, tracker: Tracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Attach `parent` and, unless already known, the parent's tracker.
    fn adopted_by(mut self, parent: &TrackerItem) -> Self {
        if self.tracker.is_none() {
            self.tracker = parent.tracker.clone();
        }
        self.parent = Some(Box::new(parent.reference()));
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
    pub fn cached_detail(&self) -> Option<&ItemDetail> {
        self.detail.get()
    }

    /// The item's attributes, fetched on first access.
    pub async fn detail(&self) -> Result<&ItemDetail> {
        self.detail
            .get_or_load(|| Self::fetch_detail(&self.client, self.id, &self.name))
            .await
    }

    /// Make sure the item is loaded.
    pub async fn load(&self) -> Result<()> {
        self.detail().await.map(|_| ())
    }

    /// Re-fetch the item even if it is already loaded.
    ///
    /// The cached field listing is dropped as well and fetched again on
    /// next use.
    pub async fn refresh(&mut self) -> Result<()> {
        let detail = Self::fetch_detail(&self.client, self.id, &self.name).await?;
        if detail.parent.is_some() {
            self.parent = detail.parent.clone();
        }
        self.detail.replace(detail);
        self.fields = Lazy::partial();
        Ok(())
    }

    /// A partial copy with the same id, name, tracker and parent.
    pub fn reference(&self) -> Self {
        Self {
            client: self.client.clone(),
            id: self.id,
            name: self.name.clone(),
            tracker: self.tracker.clone(),
            parent: self.parent.clone(),
            detail: Lazy::partial(),
            fields: Lazy::partial(),
        }
    }

    /// The tracker this item belongs to.
    pub async fn tracker(&self) -> Result<Option<&Tracker>> {
        if let Some(tracker) = &self.tracker {
            return Ok(Some(tracker));
        }
        Ok(self.detail().await?.tracker.as_ref())
    }

    /// The parent item, if this item has one.
    pub async fn parent(&self) -> Result<Option<&TrackerItem>> {
        if let Some(parent) = &self.parent {
            return Ok(Some(parent));
        }
        Ok(self.detail().await?.parent.as_deref())
    }

    /// The children known so far.
    ///
    /// Only the children embedded in the detail until
    /// [`get_children`](Self::get_children) is called.
    pub async fn children(&self) -> Result<&[TrackerItem]> {
        Ok(&self.detail().await?.children)
    }

    /// Fetch children of this item. Page `0` fetches every page.
    ///
    /// The fetched children are merged into [`children`](Self::children)
    /// by id, so repeated calls never produce duplicates. Returns the
    /// children of this call.
    #[tracing::instrument(skip(self), fields(item = self.id))]
    pub async fn get_children(&mut self, page: u32, page_size: u32) -> Result<Vec<TrackerItem>> {
        self.load().await?;
        let mut this = self.reference();
        if this.tracker.is_none() {
            this.tracker = self.tracker().await?.map(Tracker::reference);
        }

        let children: Vec<TrackerItem> = TrackerItem::list(
            &self.client,
            &ItemQuery::Children(self.id),
            PageRequest::new(page, page_size),
        )
        .await
        .map_err(|e| e.for_entity("item", self.id))?
        .into_iter()
        .map(|child| child.adopted_by(&this))
        .collect();

        if let Some(detail) = self.detail.get_mut() {
            merge_by_id(&mut detail.children, children.iter().cloned());
        }
        tracing::debug!(fetched = children.len(), "merged children");
        Ok(children)
    }

    /// Every field of this item with its value and editability, fetched on
    /// first use.
    pub async fn fields(&self) -> Result<&[Field]> {
        let fields = self
            .fields
            .get_or_load(|| Self::fetch_fields(&self.client, self.id))
            .await?;
        Ok(fields.as_slice())
    }

    /// One field by id or name.
    pub async fn field(&self, lookup: impl Into<Lookup>) -> Result<Option<&Field>> {
        let lookup = lookup.into();
        Ok(lookup.find(self.fields().await?))
    }

    /// The status field, resolved against the field listing.
    pub async fn status(&self) -> Result<Option<&Field>> {
        let listing = self.fields().await?;
        let detail = self.detail().await?;
        Ok(detail.status.as_ref().map(|field| resolve(field, listing)))
    }

    /// The priority field, resolved against the field listing.
    pub async fn priority(&self) -> Result<Option<&Field>> {
        let listing = self.fields().await?;
        let detail = self.detail().await?;
        Ok(detail.priority.as_ref().map(|field| resolve(field, listing)))
    }

    /// The custom fields, resolved against the field listing.
    pub async fn custom_fields(&self) -> Result<Vec<&Field>> {
        let listing = self.fields().await?;
        let detail = self.detail().await?;
        Ok(detail
            .custom_fields
            .iter()
            .map(|field| resolve(field, listing))
            .collect())
    }

    /// Write one field of this item.
    ///
    /// The cached field listing reflects the new value afterwards; the
    /// rest of the item is not refreshed.
    #[tracing::instrument(skip(self, lookup, input), fields(item = self.id))]
    pub async fn update_field(
        &mut self,
        lookup: impl Into<Lookup>,
        input: impl Into<FieldInput>,
    ) -> Result<()> {
        let lookup = lookup.into();
        let fields = self.fields_mut().await?;
        let field = fields
            .iter_mut()
            .find(|field| lookup.matches(field.id(), field.name()))
            .ok_or_else(|| CbError::NotFound {
                entity_type: "field",
                id: lookup.to_string(),
            })?;
        field.set_value(input).await
    }

    /// Write several fields of this item in one request.
    ///
    /// Every change is validated first; if any fails nothing is sent. Local
    /// values change only after the server accepted the update.
    #[tracing::instrument(skip(self, changes), fields(item = self.id))]
    pub async fn update<I, L, V>(&mut self, changes: I) -> Result<()>
    where
        I: IntoIterator<Item = (L, V)>,
        L: Into<Lookup>,
        V: Into<FieldInput>,
    {
        let changes: Vec<(Lookup, FieldInput)> = changes
            .into_iter()
            .map(|(lookup, input)| (lookup.into(), input.into()))
            .collect();
        if changes.is_empty() {
            return Ok(());
        }

        let client = self.client.clone();
        let item_id = self.id;
        let fields = self.fields_mut().await?;

        let mut staged = Vec::with_capacity(changes.len());
        for (lookup, input) in changes {
            let index = fields
                .iter()
                .position(|field| lookup.matches(field.id(), field.name()))
                .ok_or_else(|| CbError::NotFound {
                    entity_type: "field",
                    id: lookup.to_string(),
                })?;
            let value = fields[index].prepare(input).await?;
            staged.push((index, value));
        }

        let entries: Vec<Value> = staged
            .iter()
            .map(|(index, value)| fields[*index].wire_entry(value))
            .collect();
        update_item_fields(&client, item_id, &json!({ "fieldValues": entries })).await?;

        for (index, value) in staged {
            fields[index].commit(value);
        }
        Ok(())
    }

    /// The definition of one of this item's fields, from its tracker.
    pub async fn get_field_definition(&self, lookup: impl Into<Lookup>) -> Result<Option<FieldDefinition>> {
        match self.tracker().await? {
            Some(tracker) => tracker.get_field(lookup).await,
            None => Ok(None),
        }
    }

    /// Delete this item on the server.
    #[tracing::instrument(skip(self), fields(item = self.id))]
    pub async fn delete(&self) -> Result<()> {
        self.client
            .delete(&format!("items/{}", self.id))
            .await
            .map_err(|e| e.for_entity("item", self.id))?;
        Ok(())
    }

    /// Associate this item with `other` (e.g. "related", "depends").
    pub async fn create_association(
        &self,
        other: &TrackerItem,
        kind: AssociationKind,
        description: Option<&str>,
    ) -> Result<Association> {
        Association::create(&self.client, self.id, other.id, kind, description).await
    }

    /// Remove an association by its id.
    pub async fn remove_association(&self, association_id: i64) -> Result<()> {
        Association::remove(&self.client, association_id).await
    }

    async fn fields_mut(&mut self) -> Result<&mut Vec<Field>> {
        let id = self.id;
        if !self.fields.is_loaded() {
            let fields = Self::fetch_fields(&self.client, id).await?;
            self.fields.replace(fields);
        }
        self.fields
            .get_mut()
            .ok_or_else(|| CbError::MalformedPayload(format!("field listing of item {id} missing")))
    }

    #[tracing::instrument(skip(client, name))]
    async fn fetch_detail(client: &RestClient, id: i64, name: &str) -> Result<ItemDetail> {
        tracing::debug!("loading item detail");
        let payload = client
            .get_json(&format!("items/{id}"))
            .await
            .map_err(|e| e.for_entity("item", id))?;
        ItemDetail::from_payload(client, id, name, payload)
    }

    #[tracing::instrument(skip(client))]
    async fn fetch_fields(client: &RestClient, id: i64) -> Result<Vec<Field>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct FieldListing {
            #[serde(default)]
            editable_fields: Vec<Value>,
            #[serde(default)]
            read_only_fields: Vec<Value>,
        }

        let payload = client
            .get_json(&format!("items/{id}/fields"))
            .await
            .map_err(|e| e.for_entity("item", id))?;
        let listing: FieldListing = serde_json::from_value(payload)?;

        let editable = listing
            .editable_fields
            .iter()
            .map(|field| Field::from_payload(client, id, true, field));
        let read_only = listing
            .read_only_fields
            .iter()
            .map(|field| Field::from_payload(client, id, false, field));
        editable.chain(read_only).collect()
    }
}

/// The listing's copy of `field` when there is one.
fn resolve<'a>(field: &'a Field, listing: &'a [Field]) -> &'a Field {
    listing
        .iter()
        .find(|candidate| candidate.id() == field.id())
        .unwrap_or(field)
}

impl Serialize for TrackerItem {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        EntityView {
            id: self.id,
            name: &self.name,
            detail: self.detail.get(),
        }
        .serialize(serializer)
    }
}

impl std::fmt::Display for TrackerItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[async_trait]
impl Get for TrackerItem {
    type Id = i64;

    #[tracing::instrument(skip(client))]
    async fn get(client: &RestClient, id: i64) -> Result<Self> {
        let payload = client
            .get_json(&format!("items/{id}"))
            .await
            .map_err(|e| e.for_entity("item", id))?;
        Self::from_payload(client, payload)
    }
}

#[async_trait]
impl List for TrackerItem {
    type Query = ItemQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &RestClient,
        query: &Self::Query,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Self>> {
        let params = PageParams::new(page, page_size);
        let (response, key) = match query {
            ItemQuery::Tracker(id) => (
                client
                    .get_with_query(&format!("trackers/{id}/items"), &params)
                    .await?,
                "itemRefs",
            ),
            ItemQuery::Children(id) => (
                client
                    .get_with_query(&format!("items/{id}/children"), &params)
                    .await?,
                "itemRefs",
            ),
            ItemQuery::Cbql(cbql) => (
                client
                    .post(
                        "items/query",
                        &json!({"page": page, "pageSize": page_size, "queryString": cbql}),
                    )
                    .await?,
                "items",
            ),
        };
        let envelope: Value = response.json().await.map_err(CbError::HttpError)?;

        Page::from_envelope(envelope, key, page, page_size)?
            .try_map(|item| Self::from_payload(client, item))
    }
}
