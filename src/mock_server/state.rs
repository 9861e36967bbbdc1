//! Mock server state management.
//!
//! Provides the in-memory data store for the mock codeBeamer API server.
//! Entities are stored as the full JSON payloads the real server would
//! return from their detail endpoints; listings derive references from them.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;

/// The id of a stored payload.
pub(crate) fn id_of(payload: &Value) -> i64 {
    payload.get("id").and_then(Value::as_i64).unwrap_or_default()
}

/// The id of a reference embedded under `key` (e.g. an item's `tracker`).
pub(crate) fn ref_id(payload: &Value, key: &str) -> Option<i64> {
    payload.get(key).and_then(|r| r.get("id")).and_then(Value::as_i64)
}

/// A `{id, name, type}` reference to a stored payload.
pub(crate) fn reference(payload: &Value, kind: &str) -> Value {
    json!({
        "id": id_of(payload),
        "name": payload.get("name").cloned().unwrap_or(Value::Null),
        "type": kind,
    })
}

/// Field values of one item, split like `GET items/{id}/fields` answers.
#[derive(Debug, Clone, Default)]
pub struct ItemFields {
    pub editable: Vec<Value>,
    pub read_only: Vec<Value>,
}

/// Shared state for the mock server.
///
/// This struct holds all the mock data that the server will serve.
/// It's wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug, Default)]
pub struct MockState {
    /// Project payloads indexed by id.
    pub projects: BTreeMap<i64, Value>,

    /// Tracker payloads indexed by id; `project` holds a reference.
    pub trackers: BTreeMap<i64, Value>,

    /// Field definition payloads indexed by (tracker id, field id).
    pub fields: BTreeMap<(i64, i64), Value>,

    /// Item payloads indexed by id; `tracker` and `parent` hold references.
    pub items: BTreeMap<i64, Value>,

    /// Field values of items, indexed by item id.
    pub item_fields: BTreeMap<i64, ItemFields>,

    /// Choice options indexed by (item id, field id).
    pub choice_options: BTreeMap<(i64, i64), Vec<Value>>,

    /// User payloads indexed by id.
    pub users: BTreeMap<i64, Value>,

    /// Associations indexed by id.
    pub associations: BTreeMap<i64, Value>,

    /// Number of field update requests served, for write assertions.
    pub field_updates: usize,

    next_id: i64,
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self {
            next_id: 10_000,
            ..Self::default()
        }
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Add a project payload.
    pub fn with_project(mut self, project: Value) -> Self {
        self.projects.insert(id_of(&project), project);
        self
    }

    /// Add a tracker payload.
    pub fn with_tracker(mut self, tracker: Value) -> Self {
        self.trackers.insert(id_of(&tracker), tracker);
        self
    }

    /// Add a field definition payload to a tracker.
    pub fn with_field(mut self, tracker_id: i64, field: Value) -> Self {
        self.fields.insert((tracker_id, id_of(&field)), field);
        self
    }

    /// Add an item payload.
    pub fn with_item(mut self, item: Value) -> Self {
        self.items.insert(id_of(&item), item);
        self
    }

    /// Set the field values of an item.
    pub fn with_item_fields(mut self, item_id: i64, editable: Vec<Value>, read_only: Vec<Value>) -> Self {
        self.item_fields
            .insert(item_id, ItemFields { editable, read_only });
        self
    }

    /// Set the choice options of an item's field.
    pub fn with_choice_options(mut self, item_id: i64, field_id: i64, options: Vec<Value>) -> Self {
        self.choice_options.insert((item_id, field_id), options);
        self
    }

    /// Add a user payload.
    pub fn with_user(mut self, user: Value) -> Self {
        self.users.insert(id_of(&user), user);
        self
    }

    /// Allocate an id for a created entity.
    pub fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Trackers of a project.
    pub fn trackers_of(&self, project_id: i64) -> Vec<&Value> {
        self.trackers
            .values()
            .filter(|t| ref_id(t, "project") == Some(project_id))
            .collect()
    }

    /// Items of a tracker, children included.
    pub fn items_of(&self, tracker_id: i64) -> Vec<&Value> {
        self.items
            .values()
            .filter(|i| ref_id(i, "tracker") == Some(tracker_id))
            .collect()
    }

    /// Direct children of an item.
    pub fn children_of(&self, item_id: i64) -> Vec<&Value> {
        self.items
            .values()
            .filter(|i| ref_id(i, "parent") == Some(item_id))
            .collect()
    }

    /// Field definitions of a tracker.
    pub fn fields_of(&self, tracker_id: i64) -> Vec<&Value> {
        self.fields
            .range((tracker_id, i64::MIN)..=(tracker_id, i64::MAX))
            .map(|(_, field)| field)
            .collect()
    }

    /// An item payload as `GET items/{id}` returns it, with children
    /// references filled in.
    pub fn item_detail(&self, item_id: i64) -> Option<Value> {
        let mut item = self.items.get(&item_id)?.clone();
        let children: Vec<Value> = self
            .children_of(item_id)
            .into_iter()
            .map(|child| reference(child, "TrackerItemReference"))
            .collect();
        if let Some(object) = item.as_object_mut() {
            object.insert("children".to_string(), Value::Array(children));
        }
        Some(item)
    }

    /// Apply a field update. Returns the name of a field that may not be
    /// written, if any; nothing is changed in that case.
    pub fn update_item_fields(&mut self, item_id: i64, values: &[Value]) -> Result<(), String> {
        let fields = self.item_fields.entry(item_id).or_default();

        for entry in values {
            let field_id = entry.get("fieldId").and_then(Value::as_i64);
            let editable = fields
                .editable
                .iter()
                .any(|f| f.get("fieldId").and_then(Value::as_i64) == field_id);
            if !editable {
                let name = entry.get("name").and_then(Value::as_str).unwrap_or("?");
                return Err(name.to_string());
            }
        }

        for entry in values {
            let field_id = entry.get("fieldId").and_then(Value::as_i64);
            if let Some(current) = fields
                .editable
                .iter_mut()
                .find(|f| f.get("fieldId").and_then(Value::as_i64) == field_id)
            {
                *current = entry.clone();
            }
        }
        self.field_updates += 1;
        Ok(())
    }

    /// Find a user by name.
    pub fn find_user_by_name(&self, name: &str) -> Option<&Value> {
        self.users
            .values()
            .find(|u| u.get("name").and_then(Value::as_str) == Some(name))
    }

    /// Find a user by email, case-insensitively.
    pub fn find_user_by_email(&self, email: &str) -> Option<&Value> {
        self.users.values().find(|u| {
            u.get("email")
                .and_then(Value::as_str)
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
    }

    /// Find a project by key.
    pub fn find_project_by_key(&self, key: &str) -> Option<&Value> {
        self.projects
            .values()
            .find(|p| p.get("keyName").and_then(Value::as_str) == Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, tracker: i64, parent: Option<i64>) -> Value {
        let mut item = json!({
            "id": id,
            "name": format!("Item {id}"),
            "tracker": {"id": tracker, "name": "Bugs", "type": "TrackerReference"}
        });
        if let Some(parent) = parent {
            item["parent"] = json!({"id": parent, "name": "Parent", "type": "TrackerItemReference"});
        }
        item
    }

    #[test]
    fn test_state_relations() {
        let state = MockState::new()
            .with_item(item(1, 10, None))
            .with_item(item(2, 10, Some(1)))
            .with_item(item(3, 11, None));

        assert_eq!(state.items_of(10).len(), 2);
        assert_eq!(state.children_of(1).len(), 1);

        let detail = state.item_detail(1).unwrap();
        assert_eq!(detail["children"][0], json!({"id": 2, "name": "Item 2", "type": "TrackerItemReference"}));
    }

    #[test]
    fn test_fields_of_tracker() {
        let state = MockState::new()
            .with_field(10, json!({"id": 1, "name": "A"}))
            .with_field(10, json!({"id": 2, "name": "B"}))
            .with_field(11, json!({"id": 1, "name": "C"}));

        assert_eq!(state.fields_of(10).len(), 2);
        assert_eq!(state.fields_of(11).len(), 1);
    }

    #[test]
    fn test_update_rejects_read_only_field() {
        let mut state = MockState::new().with_item_fields(
            1,
            vec![json!({"fieldId": 1000, "name": "Root Cause", "type": "TextFieldValue", "value": "a"})],
            vec![json!({"fieldId": 0, "name": "ID", "type": "IntegerFieldValue", "value": 1})],
        );

        let rejected = state.update_item_fields(
            1,
            &[
                json!({"fieldId": 1000, "name": "Root Cause", "type": "TextFieldValue", "value": "b"}),
                json!({"fieldId": 0, "name": "ID", "type": "IntegerFieldValue", "value": 2}),
            ],
        );
        assert_eq!(rejected, Err("ID".to_string()));
        assert_eq!(state.item_fields[&1].editable[0]["value"], "a");
        assert_eq!(state.field_updates, 0);

        state
            .update_item_fields(1, &[json!({"fieldId": 1000, "name": "Root Cause", "type": "TextFieldValue", "value": "b"})])
            .unwrap();
        assert_eq!(state.item_fields[&1].editable[0]["value"], "b");
        assert_eq!(state.field_updates, 1);
    }
}
