//! Field writes against a mocked codeBeamer.
//!
//! Every rejected write must leave the server untouched (`expect(0)` on the
//! PUT mock) and the local value unchanged.

use cbapi::{CbError, ChoiceValue, FieldKind, RestClient, TrackerItem};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIELDS_PATH: &str = "/cb/api/v3/items/100/fields";

fn client(server: &MockServer) -> RestClient {
    RestClient::new(&server.uri(), "bond", "007").unwrap()
}

fn item(client: &RestClient) -> TrackerItem {
    TrackerItem::from_payload(
        client,
        json!({"id": 100, "name": "Login fails", "type": "TrackerItemReference"}),
    )
    .unwrap()
}

fn field_listing() -> Value {
    json!({
        "itemId": 100,
        "editableFields": [
            {"fieldId": 7, "name": "Status", "type": "ChoiceFieldValue",
             "values": [{"id": 1, "name": "New", "type": "ChoiceOptionReference"}]},
            {"fieldId": 1000, "name": "Root Cause", "type": "TextFieldValue", "value": "unknown"},
            {"fieldId": 1002, "name": "Severity Score", "type": "IntegerFieldValue", "value": 3},
            {"fieldId": 1003, "name": "Test Matrix", "type": "TableFieldValue", "values": []}
        ],
        "readOnlyFields": [
            {"fieldId": 0, "name": "ID", "type": "IntegerFieldValue", "value": 100}
        ]
    })
}

async fn mount_field_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(FIELDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(field_listing()))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_status_options(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cb/api/v3/items/100/fields/7/options"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "pageSize": 500,
            "total": 3,
            "references": [
                {"id": 1, "name": "New", "type": "ChoiceOptionReference"},
                {"id": 2, "name": "In Progress", "type": "ChoiceOptionReference"},
                {"id": 3, "name": "Closed", "type": "ChoiceOptionReference"}
            ]
        })))
        .mount(server)
        .await;
}

async fn forbid_writes(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path(FIELDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(server)
        .await;
}

async fn value_of(item: &TrackerItem, name: &str) -> Value {
    let field = item.field(name).await.unwrap().unwrap();
    serde_json::to_value(field).unwrap()
}

// =============================================================================
// Rejected writes
// =============================================================================

#[tokio::test]
async fn test_read_only_field_is_never_sent() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;
    forbid_writes(&server).await;

    let mut item = item(&client(&server));
    let err = item.update_field("ID", 5).await.unwrap_err();

    assert!(matches!(err, CbError::NotEditable { ref field } if field == "ID"));
    assert_eq!(value_of(&item, "ID").await["value"], 100);
}

#[tokio::test]
async fn test_unavailable_choice_is_never_sent() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;
    mount_status_options(&server).await;
    forbid_writes(&server).await;

    let mut item = item(&client(&server));
    let err = item
        .update_field(7_i64, ChoiceValue::new(99, "Rejected"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CbError::InvalidChoice { ref field, ref choice } if field == "Status" && choice == "Rejected"
    ));
    assert_eq!(value_of(&item, "Status").await["values"][0]["name"], "New");
}

#[tokio::test]
async fn test_wrong_kind_is_never_sent() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;
    forbid_writes(&server).await;

    let mut item = item(&client(&server));
    let err = item
        .update_field("Severity Score", "very bad")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CbError::TypeMismatch { expected: "integer", found: "text" }
    ));
}

#[tokio::test]
async fn test_unsupported_field_is_readable_but_not_writable() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;
    forbid_writes(&server).await;

    let mut item = item(&client(&server));
    let matrix = item.field("Test Matrix").await.unwrap().unwrap();
    assert_eq!(matrix.kind(), None);
    assert_eq!(matrix.type_tag(), "TableFieldValue");

    let err = item.update_field("Test Matrix", "x").await.unwrap_err();
    assert!(matches!(err, CbError::UnknownFieldType(ref tag) if tag == "TableFieldValue"));
}

#[tokio::test]
async fn test_unknown_field_name_is_not_found() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;
    forbid_writes(&server).await;

    let mut item = item(&client(&server));
    let err = item.update_field("Nope", "x").await.unwrap_err();

    assert!(matches!(err, CbError::NotFound { entity_type: "field", ref id } if id == "Nope"));
}

// =============================================================================
// Accepted writes
// =============================================================================

#[tokio::test]
async fn test_text_write_is_sent_quietly_and_kept() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;

    Mock::given(method("PUT"))
        .and(path(FIELDS_PATH))
        .and(query_param("quietMode", "true"))
        .and(body_partial_json(json!({
            "fieldValues": [
                {"fieldId": 1000, "name": "Root Cause", "type": "TextFieldValue", "value": "race condition"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 100})))
        .expect(1)
        .mount(&server)
        .await;

    let mut item = item(&client(&server));
    item.update_field("Root Cause", "race condition").await.unwrap();

    let field = item.field(1000_i64).await.unwrap().unwrap();
    assert_eq!(field.value().as_text(), Some("race condition"));
    assert_eq!(field.kind(), Some(FieldKind::Text));
}

#[tokio::test]
async fn test_available_choice_write_sends_values() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;
    mount_status_options(&server).await;

    Mock::given(method("PUT"))
        .and(path(FIELDS_PATH))
        .and(body_partial_json(json!({
            "fieldValues": [{
                "fieldId": 7,
                "type": "ChoiceFieldValue",
                "values": [{"id": 3, "name": "Closed", "type": "ChoiceOptionReference"}]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 100})))
        .expect(1)
        .mount(&server)
        .await;

    let mut item = item(&client(&server));
    let closed = item
        .field("Status")
        .await
        .unwrap()
        .unwrap()
        .choice("Closed")
        .await
        .unwrap()
        .unwrap();
    item.update_field("Status", closed).await.unwrap();

    let status = item.field("Status").await.unwrap().unwrap();
    assert_eq!(status.value().to_string(), "Closed");
}

#[tokio::test]
async fn test_batched_update_sends_one_request() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;

    Mock::given(method("PUT"))
        .and(path(FIELDS_PATH))
        .and(query_param("quietMode", "true"))
        .and(body_partial_json(json!({
            "fieldValues": [
                {"fieldId": 1000, "value": "null pointer"},
                {"fieldId": 1002, "value": 8}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 100})))
        .expect(1)
        .mount(&server)
        .await;

    let mut item = item(&client(&server));
    item.update([
        ("Root Cause", cbapi::FieldInput::from("null pointer")),
        ("Severity Score", cbapi::FieldInput::from(8)),
    ])
    .await
    .unwrap();

    assert_eq!(value_of(&item, "Root Cause").await["value"], "null pointer");
    assert_eq!(value_of(&item, "Severity Score").await["value"], 8);
}

#[tokio::test]
async fn test_batch_with_one_bad_change_sends_nothing() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;
    forbid_writes(&server).await;

    let mut item = item(&client(&server));
    let err = item
        .update([
            ("Root Cause", cbapi::FieldInput::from("null pointer")),
            ("ID", cbapi::FieldInput::from(1)),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, CbError::NotEditable { .. }));
    assert_eq!(value_of(&item, "Root Cause").await["value"], "unknown");
}

#[tokio::test]
async fn test_server_rejection_keeps_old_value() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;

    Mock::given(method("PUT"))
        .and(path(FIELDS_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "exception": "com.intland.codebeamer.api.support.BadRequestException",
            "message": "Field 'Root Cause' is locked by workflow"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut item = item(&client(&server));
    let err = item.update_field("Root Cause", "anything").await.unwrap_err();

    assert!(matches!(
        err,
        CbError::ServerError { ref message, status_code: Some(400) } if message.contains("locked")
    ));
    assert_eq!(value_of(&item, "Root Cause").await["value"], "unknown");
}

#[tokio::test]
async fn test_status_view_reports_editability_from_listing() {
    let server = MockServer::start().await;
    mount_field_listing(&server).await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/items/100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 100,
            "name": "Login fails",
            "tracker": {"id": 10, "name": "Bugs", "type": "TrackerReference"},
            "status": {
                "fieldId": 7, "name": "Status", "type": "ChoiceFieldValue",
                "values": [{"id": 1, "name": "New", "type": "ChoiceOptionReference"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = item(&client(&server));

    let snapshot = item.detail().await.unwrap().status.as_ref().unwrap();
    assert!(!snapshot.is_editable());
    assert!(item.status().await.unwrap().unwrap().is_editable());
}
