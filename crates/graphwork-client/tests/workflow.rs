//! Copy/transform workflow against a mock Graph server.

use std::time::Duration;

use graphwork_auth::{Audience, BearerToken};
use graphwork_client::{
    CopyTransformWorkflow, GraphClient, RangeTarget, Replace, VerifyPolicy, WorkflowConfig,
    WorkflowError, WorkflowStep,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "contoso.sharepoint.com,site-1";
const DRIVE: &str = "drive-1";
const COPY_PATH_RE: &str = r"^/v1\.0/drives/drive-1/root:/out/\d+\.xlsx:$";
const RANGE_PATH: &str = "/v1.0/drives/drive-1/items/new-1/workbook/tables/Vars/range";

fn token() -> BearerToken {
    BearerToken::expiring_in("tok", 3600, Audience::graph())
}

fn workflow(server: &MockServer, verify: VerifyPolicy) -> CopyTransformWorkflow {
    let client = GraphClient::builder()
        .base_url(format!("{}/v1.0", server.uri()))
        .build()
        .unwrap();
    let config =
        WorkflowConfig::new(SITE, RangeTarget::Table("Vars".to_string())).with_verify(verify);
    CopyTransformWorkflow::new(client, config)
}

async fn mount_drive(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v1.0/sites/{}/drive", SITE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": DRIVE})))
        .mount(server)
        .await;
}

async fn mount_source(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v1.0/drives/drive-1/root:/templates:/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": items})))
        .mount(server)
        .await;
}

async fn mount_destination(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1.0/drives/drive-1/root:/out:"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "out-1"})))
        .mount(server)
        .await;
}

async fn mount_copy(server: &MockServer, status: u16, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/v1.0/drives/drive-1/items/tpl-1/copy"))
        .and(query_param("@microsoft.graph.conflictBehavior", "fail"))
        .and(body_partial_json(json!({
            "parentReference": {"driveId": DRIVE, "id": "out-1"}
        })))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_verify(server: &MockServer, status: u16) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({"id": "new-1"}))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path_regex(COPY_PATH_RE))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_read(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path(RANGE_PATH))
        .and(query_param("$select", "values"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["v1.0", 2.5], ["a.b", null]]
        })))
        .expect(expected)
        .mount(server)
        .await;
}

fn templates() -> serde_json::Value {
    json!([
        {"id": "tpl-1", "name": "Template.xlsx"},
        {"id": "tpl-2", "name": "Other.xlsx"}
    ])
}

#[tokio::test]
async fn test_copy_and_transform() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_source(&server, templates()).await;
    mount_destination(&server).await;
    mount_copy(&server, 202, 1).await;
    mount_verify(&server, 200).await;
    mount_read(&server, 1).await;
    Mock::given(method("PATCH"))
        .and(path(RANGE_PATH))
        .and(body_json(json!({
            "values": [["v1...0", "2...5"], ["a...b", ""]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = workflow(&server, VerifyPolicy::default())
        .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
        .await
        .unwrap();

    assert_eq!(outcome.item_id, "new-1");
    assert_eq!(outcome.source_item_id, "tpl-1");
    assert!(outcome.name.ends_with(".xlsx"));
    assert_eq!(outcome.values[0], vec!["v1...0", "2...5"]);

    let requests = server.received_requests().await.unwrap();
    let copy = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&copy.body).unwrap();
    assert_eq!(body["name"], outcome.name.as_str());
}

#[tokio::test]
async fn test_empty_source_issues_no_copy() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_source(&server, json!([])).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/drives/drive-1/root:/out:"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "out-1"})))
        .expect(0)
        .mount(&server)
        .await;
    mount_copy(&server, 202, 0).await;

    let failure = workflow(&server, VerifyPolicy::default())
        .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        WorkflowError::NoTemplateFound { ref path } if path == "/templates"
    ));
    assert_eq!(failure.last_completed, Some(WorkflowStep::LocateDrive));
}

#[tokio::test]
async fn test_missing_drive_stops_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1.0/sites/{}/drive", SITE)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let failure = workflow(&server, VerifyPolicy::default())
        .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, WorkflowError::DriveNotFound { .. }));
    assert_eq!(failure.last_completed, None);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_destination_folder() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_source(&server, templates()).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/drives/drive-1/root:/out:"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_copy(&server, 202, 0).await;

    let failure = workflow(&server, VerifyPolicy::default())
        .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, WorkflowError::FolderNotFound { .. }));
    assert_eq!(failure.last_completed, Some(WorkflowStep::ListSource));
    assert_eq!(failure.state.source_item_id.as_deref(), Some("tpl-1"));
}

#[tokio::test]
async fn test_copy_rejected() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_source(&server, templates()).await;
    mount_destination(&server).await;
    mount_copy(&server, 409, 1).await;
    Mock::given(method("GET"))
        .and(path_regex(COPY_PATH_RE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new-1"})))
        .expect(0)
        .mount(&server)
        .await;

    let failure = workflow(&server, VerifyPolicy::default())
        .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, WorkflowError::CopyRejected { status: 409 }));
    assert_eq!(failure.last_completed, Some(WorkflowStep::GenerateName));
}

#[tokio::test]
async fn test_copy_not_visible() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_source(&server, templates()).await;
    mount_destination(&server).await;
    mount_copy(&server, 202, 1).await;
    mount_verify(&server, 404).await;
    mount_read(&server, 0).await;

    let failure = workflow(&server, VerifyPolicy::default())
        .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, WorkflowError::CopyNotVisible { .. }));
    assert_eq!(failure.last_completed, Some(WorkflowStep::Copy));
    // The orphaned copy can still be found by name.
    assert!(failure.state.destination_name.is_some());
    assert!(failure.state.destination_item_id.is_none());
}

#[tokio::test]
async fn test_verify_polls_until_visible() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_source(&server, templates()).await;
    mount_destination(&server).await;
    mount_copy(&server, 202, 1).await;
    Mock::given(method("GET"))
        .and(path_regex(COPY_PATH_RE))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_verify(&server, 200).await;
    mount_read(&server, 1).await;
    Mock::given(method("PATCH"))
        .and(path(RANGE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let outcome = workflow(
        &server,
        VerifyPolicy::polling(3, Duration::from_millis(10)),
    )
    .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
    .await
    .unwrap();

    assert_eq!(outcome.item_id, "new-1");
}

#[tokio::test]
async fn test_unrectangular_range_is_unreadable() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_source(&server, templates()).await;
    mount_destination(&server).await;
    mount_copy(&server, 202, 1).await;
    mount_verify(&server, 200).await;
    Mock::given(method("GET"))
        .and(path(RANGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["a", "b"], ["c"]]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let failure = workflow(&server, VerifyPolicy::default())
        .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, WorkflowError::RangeUnreadable { .. }));
    assert_eq!(failure.last_completed, Some(WorkflowStep::Verify));
    assert_eq!(failure.state.destination_item_id.as_deref(), Some("new-1"));
}

#[tokio::test]
async fn test_write_rejected() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_source(&server, templates()).await;
    mount_destination(&server).await;
    mount_copy(&server, 202, 1).await;
    mount_verify(&server, 200).await;
    mount_read(&server, 1).await;
    Mock::given(method("PATCH"))
        .and(path(RANGE_PATH))
        .respond_with(ResponseTemplate::new(423).set_body_string("locked"))
        .expect(1)
        .mount(&server)
        .await;

    let failure = workflow(&server, VerifyPolicy::default())
        .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, WorkflowError::WriteRejected { status: 423 }));
    assert_eq!(failure.last_completed, Some(WorkflowStep::Transform));
    assert!(failure.to_string().contains("step 8"));
}

#[tokio::test]
async fn test_transport_failure_names_step() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/drives/drive-1/root:/templates:/children"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let failure = workflow(&server, VerifyPolicy::default())
        .run_copy_transform(&token(), "/templates", "/out", &Replace::new(".", "..."))
        .await
        .unwrap_err();

    match failure.error {
        WorkflowError::Listing(e) => assert_eq!(e.http().and_then(|h| h.status()), Some(500)),
        other => panic!("unexpected {:?}", other),
    }
}
