//! `Codebeamer` finders: absence is `Ok(None)`, failures are errors.

use cbapi::{CbError, Codebeamer, Project, RestClient, Tracker};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn codebeamer(server: &MockServer) -> Codebeamer {
    Codebeamer::with_client(RestClient::new(&server.uri(), "bond", "007").unwrap())
}

async fn mount_projects(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cb/api/v3/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Apollo", "type": "ProjectReference"},
            {"id": 2, "name": "Gemini", "type": "ProjectReference"}
        ])))
        .mount(server)
        .await;
}

// =============================================================================
// Projects
// =============================================================================

#[tokio::test]
async fn test_project_by_missing_id_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/projects/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not found"})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(codebeamer(&server).get_project(404_i64).await.unwrap().is_none());
}

#[tokio::test]
async fn test_project_by_name_loads_the_match() {
    let server = MockServer::start().await;
    mount_projects(&server).await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/projects/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 2, "name": "Gemini", "keyName": "GEM", "closed": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let project = codebeamer(&server).get_project("Gemini").await.unwrap().unwrap();

    assert_eq!(project.id(), 2);
    assert!(project.is_loaded());
    assert_eq!(project.cached_detail().unwrap().key_name.as_deref(), Some("GEM"));
}

#[tokio::test]
async fn test_project_by_unknown_name_loads_nothing() {
    let server = MockServer::start().await;
    mount_projects(&server).await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/projects/1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    assert!(codebeamer(&server).get_project("Mercury").await.unwrap().is_none());
}

#[tokio::test]
async fn test_project_by_key_searches_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cb/api/v3/projects/search"))
        .and(body_json(json!({"keyName": "APO"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1, "pageSize": 25, "total": 1,
            "projects": [{"id": 1, "name": "Apollo", "keyName": "APO"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cb/api/v3/projects/search"))
        .and(body_json(json!({"keyName": "NOPE"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1, "pageSize": 25, "total": 0, "projects": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cb = codebeamer(&server);

    let project = cb.get_project_by_key("APO").await.unwrap().unwrap();
    assert_eq!(project.name(), "Apollo");
    assert!(cb.get_project_by_key("NOPE").await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_failure_is_an_error_not_absence() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/projects/1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "exception": "java.lang.IllegalStateException",
            "message": "Internal error"
        })))
        .mount(&server)
        .await;

    let err = codebeamer(&server).get_project(1_i64).await.unwrap_err();

    assert!(matches!(
        err,
        CbError::ServerError { ref message, status_code: Some(500) } if message == "Internal error"
    ));
}

// =============================================================================
// Trackers and items
// =============================================================================

#[tokio::test]
async fn test_tracker_by_name_walks_projects() {
    let server = MockServer::start().await;
    mount_projects(&server).await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/projects/1/trackers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 10, "name": "Bugs", "type": "TrackerReference"},
            {"id": 11, "name": "Tasks", "type": "TrackerReference"}
        ])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cb/api/v3/projects/2/trackers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 20, "name": "Requirements", "type": "TrackerReference"}
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let cb = codebeamer(&server);

    let tracker = cb.get_tracker("Requirements").await.unwrap().unwrap();
    assert_eq!(tracker.id(), 20);
    assert_eq!(tracker.project().await.unwrap().map(Project::name), Some("Gemini"));

    assert!(cb.get_tracker("Epics").await.unwrap().is_none());
}

#[tokio::test]
async fn test_tracker_by_id_is_full() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/trackers/10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 10,
            "name": "Bugs",
            "type": {"id": 2, "name": "Bug", "type": "TrackerTypeReference"},
            "project": {"id": 1, "name": "Apollo", "type": "ProjectReference"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tracker: Tracker = codebeamer(&server).get_tracker(10_i64).await.unwrap().unwrap();

    assert!(tracker.is_loaded());
    assert_eq!(tracker.project().await.unwrap().map(Project::id), Some(1));
}

#[tokio::test]
async fn test_missing_item_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/items/999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(codebeamer(&server).get_item(999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_item_with_multi_valued_system_fields_loads() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/items/100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 100,
            "name": "Login fails",
            "tracker": {"id": 10, "name": "Bugs", "type": "TrackerReference"},
            "categories": [{
                "fieldId": 8, "name": "Category", "type": "ChoiceFieldValue",
                "values": [{"id": 1, "name": "Security", "type": "ChoiceOptionReference"}]
            }],
            "severities": [
                {"fieldId": 9, "name": "Severity", "type": "ChoiceFieldValue",
                 "values": [{"id": 5, "name": "Blocker", "type": "ChoiceOptionReference"}]}
            ],
            "teams": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = codebeamer(&server).get_item(100).await.unwrap().unwrap();
    let detail = item.cached_detail().unwrap();

    assert_eq!(detail.categories.len(), 1);
    assert_eq!(detail.categories[0].name(), "Category");
    assert_eq!(detail.categories[0].value().to_string(), "Security");
    assert_eq!(detail.severities[0].value().to_string(), "Blocker");
    assert!(detail.subjects.is_empty());
    assert!(detail.teams.is_empty());
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_user_by_name_and_email() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/users/findByName"))
        .and(query_param("name", "bond"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3, "name": "bond", "email": "bond@example.com", "firstName": "James"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cb/api/v3/users/findByEmail"))
        .and(query_param("email", "bond@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3, "name": "bond", "email": "bond@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cb/api/v3/users/findByEmail"))
        .and(query_param("email", "blofeld@example.com"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "No such user"})))
        .expect(1)
        .mount(&server)
        .await;

    let cb = codebeamer(&server);

    let by_name = cb.get_user("bond").await.unwrap().unwrap();
    assert_eq!(by_name.id(), 3);
    assert!(by_name.is_loaded());

    let by_email = cb.get_user_by_email("bond@example.com").await.unwrap().unwrap();
    assert_eq!(by_email, by_name);

    assert!(cb.get_user_by_email("blofeld@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_users_single_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cb/api/v3/users"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 2, "pageSize": 1, "total": 2,
            "users": [{"id": 4, "name": "moneypenny", "type": "UserReference"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let users = codebeamer(&server).get_users(2, 1).await.unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name(), "moneypenny");
    assert!(!users[0].is_loaded());
}
