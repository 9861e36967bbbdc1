//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic codeBeamer payloads.

use serde_json::{json, Value};

use super::state::ItemFields;

const CREATED_AT: &str = "2024-03-01T09:30:00.000000";
const MODIFIED_AT: &str = "2024-03-04T16:05:12.250000";

/// Id of the Status field in every fixture tracker.
pub const STATUS_FIELD: i64 = 7;
/// Id of the "Root Cause" text field.
pub const ROOT_CAUSE_FIELD: i64 = 1000;
/// Id of the "Component" choice field.
pub const COMPONENT_FIELD: i64 = 1001;
/// Id of the "Severity Score" integer field.
pub const SCORE_FIELD: i64 = 1002;
/// Id of the read-only "ID" field.
pub const ID_FIELD: i64 = 0;

/// Collection of fixture factories for test data.
pub struct Fixtures;

impl Fixtures {
    // =========================================================================
    // Reference Fixtures
    // =========================================================================

    /// A `{id, name, type}` reference.
    pub fn reference(id: i64, name: &str, kind: &str) -> Value {
        json!({"id": id, "name": name, "type": kind})
    }

    /// A choice option reference.
    pub fn choice(id: i64, name: &str) -> Value {
        Self::reference(id, name, "ChoiceOptionReference")
    }

    // =========================================================================
    // User Fixtures
    // =========================================================================

    /// Create a user as `GET users/{id}` returns it.
    pub fn user(id: i64, name: &str, email: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "email": email,
            "firstName": name,
            "lastName": "Tester",
            "company": "Example Ltd",
            "status": "ACTIVATED",
            "registryDate": CREATED_AT,
            "lastLoginDate": MODIFIED_AT
        })
    }

    // =========================================================================
    // Project / Tracker Fixtures
    // =========================================================================

    /// Create a project as `GET projects/{id}` returns it.
    pub fn project(id: i64, name: &str, key: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "keyName": key,
            "description": format!("{name} project"),
            "descriptionFormat": "PlainText",
            "version": 1,
            "category": "Engineering",
            "closed": false,
            "deleted": false,
            "template": false,
            "createdAt": CREATED_AT,
            "createdBy": Self::reference(3, "bond", "UserReference")
        })
    }

    /// Create a tracker of a project as `GET trackers/{id}` returns it.
    pub fn tracker(id: i64, name: &str, project_id: i64, project_name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "keyName": name.to_uppercase(),
            "description": format!("{name} tracker"),
            "descriptionFormat": "PlainText",
            "version": 2,
            "createdAt": CREATED_AT,
            "createdBy": Self::reference(3, "bond", "UserReference"),
            "modifiedAt": MODIFIED_AT,
            "type": {"id": 2, "name": "Bug", "type": "TrackerTypeReference"},
            "deleted": false,
            "hidden": false,
            "color": "#b31317",
            "usingWorkflow": true,
            "onlyWorkflowCanCreateNewReferringItem": false,
            "usingQuickTransitions": false,
            "defaultShowAncestorItems": false,
            "defaultShowDescendantItems": true,
            "project": Self::reference(project_id, project_name, "ProjectReference"),
            "availableAsTemplate": false,
            "sharedInWorkingSet": false
        })
    }

    // =========================================================================
    // Field Fixtures
    // =========================================================================

    /// A field definition as `GET trackers/{tid}/fields/{id}` returns it.
    pub fn field_definition(id: i64, name: &str, tracker_id: i64, kind: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "type": kind,
            "trackerId": tracker_id,
            "title": name,
            "description": format!("The {name} of the item"),
            "hidden": false,
            "multipleValues": false,
            "mandatoryInStatuses": [],
            "legacyRestName": name.to_lowercase().replace(' ', "_"),
            "sharedFields": []
        })
    }

    /// A choice field definition with its options.
    pub fn choice_definition(id: i64, name: &str, tracker_id: i64, options: &[Value]) -> Value {
        let mut field = Self::field_definition(id, name, tracker_id, "OptionChoiceField");
        field["options"] = Value::Array(options.to_vec());
        field
    }

    /// A text field value.
    pub fn text_value(field_id: i64, name: &str, value: &str) -> Value {
        json!({"fieldId": field_id, "name": name, "type": "TextFieldValue", "value": value})
    }

    /// An integer field value.
    pub fn integer_value(field_id: i64, name: &str, value: i64) -> Value {
        json!({"fieldId": field_id, "name": name, "type": "IntegerFieldValue", "value": value})
    }

    /// A choice field value.
    pub fn choice_value(field_id: i64, name: &str, values: &[Value]) -> Value {
        json!({"fieldId": field_id, "name": name, "type": "ChoiceFieldValue", "values": values})
    }

    pub fn status_options() -> Vec<Value> {
        vec![
            Self::choice(1, "New"),
            Self::choice(2, "In Progress"),
            Self::choice(3, "Closed"),
        ]
    }

    pub fn component_options() -> Vec<Value> {
        vec![
            Self::choice(11, "UI"),
            Self::choice(12, "Backend"),
            Self::choice(13, "Database"),
        ]
    }

    /// The field values of a bug, split into editable and read-only.
    pub fn bug_fields(item_id: i64, root_cause: &str) -> ItemFields {
        ItemFields {
            editable: vec![
                Self::choice_value(STATUS_FIELD, "Status", &[Self::choice(1, "New")]),
                Self::text_value(ROOT_CAUSE_FIELD, "Root Cause", root_cause),
                Self::choice_value(COMPONENT_FIELD, "Component", &[Self::choice(11, "UI")]),
                Self::integer_value(SCORE_FIELD, "Severity Score", 3),
            ],
            read_only: vec![Self::integer_value(ID_FIELD, "ID", item_id)],
        }
    }

    // =========================================================================
    // Item Fixtures
    // =========================================================================

    /// Create an item as `GET items/{id}` returns it (children are added
    /// by the server).
    pub fn item(id: i64, name: &str, tracker_id: i64, tracker_name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "tracker": Self::reference(tracker_id, tracker_name, "TrackerReference"),
            "description": format!("{name}, see attached log"),
            "descriptionFormat": "Wiki",
            "createdAt": CREATED_AT,
            "createdBy": Self::reference(3, "bond", "UserReference"),
            "modifiedAt": MODIFIED_AT,
            "modifiedBy": Self::reference(4, "moneypenny", "UserReference"),
            "version": 1,
            "assignedTo": [Self::reference(4, "moneypenny", "UserReference")],
            "owners": [],
            "storyPoints": 3,
            "ordinal": id,
            "typeName": "Bug",
            "status": Self::choice_value(STATUS_FIELD, "Status", &[Self::choice(1, "New")]),
            "priority": Self::choice_value(2, "Priority", &[Self::choice(2, "High")]),
            "categories": [Self::choice_value(8, "Category", &[Self::choice(21, "Security")])],
            "customFields": [
                Self::text_value(ROOT_CAUSE_FIELD, "Root Cause", "unknown"),
                Self::choice_value(COMPONENT_FIELD, "Component", &[Self::choice(11, "UI")])
            ],
            "tags": []
        })
    }

    /// Create an item below `parent`.
    pub fn child_item(id: i64, name: &str, tracker_id: i64, tracker_name: &str, parent: (i64, &str)) -> Value {
        let mut item = Self::item(id, name, tracker_id, tracker_name);
        item["parent"] = Self::reference(parent.0, parent.1, "TrackerItemReference");
        item
    }

    // =========================================================================
    // Scenario Builders
    // =========================================================================

    /// Create a default set of test data for common scenarios.
    pub fn default_scenario() -> DefaultScenario {
        DefaultScenario::new()
    }
}

/// A complete test scenario with related entities.
///
/// Two projects: "Apollo" (`APO`, trackers "Bugs" and "Tasks") and
/// "Gemini" (`GEM`, tracker "Requirements"). Bug 100 has children 101 and
/// 102. Users 3 (`bond`) and 4 (`moneypenny`).
pub struct DefaultScenario {
    pub users: Vec<Value>,
    pub projects: Vec<Value>,
    pub trackers: Vec<Value>,
    pub fields: Vec<(i64, Value)>,
    pub items: Vec<Value>,
    pub item_fields: Vec<(i64, ItemFields)>,
    pub choice_options: Vec<((i64, i64), Vec<Value>)>,
}

impl DefaultScenario {
    fn new() -> Self {
        let users = vec![
            Fixtures::user(3, "bond", "bond@example.com"),
            Fixtures::user(4, "moneypenny", "moneypenny@example.com"),
        ];

        let projects = vec![
            Fixtures::project(1, "Apollo", "APO"),
            Fixtures::project(2, "Gemini", "GEM"),
        ];

        let trackers = vec![
            Fixtures::tracker(10, "Bugs", 1, "Apollo"),
            Fixtures::tracker(11, "Tasks", 1, "Apollo"),
            Fixtures::tracker(20, "Requirements", 2, "Gemini"),
        ];

        let fields = vec![
            (10, Fixtures::choice_definition(STATUS_FIELD, "Status", 10, &Fixtures::status_options())),
            (10, Fixtures::field_definition(ROOT_CAUSE_FIELD, "Root Cause", 10, "TextField")),
            (10, Fixtures::choice_definition(COMPONENT_FIELD, "Component", 10, &Fixtures::component_options())),
            (10, Fixtures::field_definition(SCORE_FIELD, "Severity Score", 10, "IntegerField")),
            (10, Fixtures::field_definition(ID_FIELD, "ID", 10, "IntegerField")),
        ];

        let items = vec![
            Fixtures::item(100, "Login fails", 10, "Bugs"),
            Fixtures::child_item(101, "Password reset broken", 10, "Bugs", (100, "Login fails")),
            Fixtures::child_item(102, "Session expires early", 10, "Bugs", (100, "Login fails")),
            Fixtures::item(103, "Crash on save", 10, "Bugs"),
            Fixtures::item(110, "Write release notes", 11, "Tasks"),
        ];

        let bugs = [100, 101, 102, 103];
        let item_fields = bugs
            .iter()
            .map(|&id| (id, Fixtures::bug_fields(id, "unknown")))
            .collect();
        let choice_options = bugs
            .iter()
            .flat_map(|&id| {
                [
                    ((id, STATUS_FIELD), Fixtures::status_options()),
                    ((id, COMPONENT_FIELD), Fixtures::component_options()),
                ]
            })
            .collect();

        Self {
            users,
            projects,
            trackers,
            fields,
            items,
            item_fields,
            choice_options,
        }
    }
}
