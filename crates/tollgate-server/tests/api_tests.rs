// HTTP API tests against the embedded backend

use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web};
use serde_json::{Value, json};

use tollgate_persistence::{EmbeddedPersistService, PersistenceService};
use tollgate_review::{ChangeReviewService, ReviewCache, ReviewOptions};
use tollgate_server::{
    api::route,
    middleware::identity::Identity,
    model::{AppState, Configuration},
};

const USER_HEADER: &str = "X-Tollgate-User";

fn app_state(configuration: Configuration) -> Arc<AppState> {
    let store: Arc<dyn PersistenceService> = Arc::new(EmbeddedPersistService::new());
    let service = Arc::new(ChangeReviewService::new(
        store.clone(),
        ReviewOptions::default(),
    ));
    let cache = Arc::new(ReviewCache::new(store));
    Arc::new(AppState::new(configuration, service, cache))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($state.clone()))
                .wrap(Identity)
                .configure(route::configure),
        )
        .await
    };
}

fn dealers_submission(old: Value, new: Value) -> Value {
    json!({
        "schemaIds": ["dealers"],
        "tableChanges": {
            "dealers": {"oldData": old, "newData": new}
        },
        "versionId": "2024.10"
    })
}

#[actix_web::test]
async fn test_submit_approve_and_read_records() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header((USER_HEADER, "alice"))
        .set_json(dealers_submission(
            json!([{"id": 1, "name": "North"}]),
            json!([{"id": 1, "name": "North East"}, {"id": 2, "name": "South"}]),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["changeCount"], 2);
    assert_eq!(body["data"]["tables"], json!(["dealers"]));
    let request_id = body["data"]["requestId"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/v1/review/requests/{}", request_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["id"], request_id.as_str());
    assert_eq!(body["data"]["status"], "IN_REVIEW");
    assert_eq!(body["data"]["createdBy"], "alice");
    assert_eq!(body["data"]["tables"][0]["schemaId"], "dealers");
    assert_eq!(body["data"]["tables"][0]["changedRowsCount"], 2);

    let req = test::TestRequest::post()
        .uri(&format!(
            "/v1/review/requests/{}/tables/dealers/approve",
            request_id
        ))
        .insert_header((USER_HEADER, "bob"))
        .set_json(json!({"comment": "looks good"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["updated"], 2);
    assert_eq!(body["data"]["finalized"], "APPROVED");

    let req = test::TestRequest::get()
        .uri("/v1/review/tables/dealers/records")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(
        records
            .iter()
            .any(|r| r["recordKey"] == "1" && r["payload"]["name"] == "North East")
    );

    let req = test::TestRequest::get().uri("/v1/review/locks").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!([]));
}

#[actix_web::test]
async fn test_submit_requires_user() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .set_json(dealers_submission(json!([]), json!([{"id": 1}])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 20002);
}

#[actix_web::test]
async fn test_locked_table_conflict() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header((USER_HEADER, "alice"))
        .set_json(dealers_submission(json!([]), json!([{"id": 1}])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header((USER_HEADER, "carol"))
        .set_json(dealers_submission(json!([]), json!([{"id": 2}])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 30001);
    assert_eq!(body["data"], json!(["dealers"]));
}

#[actix_web::test]
async fn test_identical_snapshots_report_no_changes() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let rows = json!([{"id": 1, "name": "North"}]);
    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header((USER_HEADER, "alice"))
        .set_json(dealers_submission(rows.clone(), rows))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 30002);
    assert_eq!(body["message"], "no changes detected");

    let req = test::TestRequest::get().uri("/v1/review/locks").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!([]));
}

#[actix_web::test]
async fn test_list_requests_filters() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header((USER_HEADER, "alice"))
        .set_json(dealers_submission(json!([]), json!([{"id": 1}])))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/v1/review/requests?status=in_review&createdBy=alice&pageSize=10")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["totalCount"], 1);
    assert_eq!(body["data"]["pageItems"][0]["createdBy"], "alice");

    let req = test::TestRequest::get()
        .uri("/v1/review/requests?status=APPROVED")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["totalCount"], 0);

    let req = test::TestRequest::get()
        .uri("/v1/review/requests?status=SHIPPED")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_unknown_request_is_not_found() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/v1/review/requests/missing")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 20004);
}

#[actix_web::test]
async fn test_force_release_lock() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header((USER_HEADER, "alice"))
        .set_json(dealers_submission(json!([]), json!([{"id": 1}])))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/v1/review/locks/dealers")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["schemaId"], "dealers");
    assert_eq!(body["data"]["lockedBy"], "alice");

    let req = test::TestRequest::delete()
        .uri("/v1/review/locks/dealers")
        .insert_header((USER_HEADER, "admin"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["schemaId"], "dealers");

    let req = test::TestRequest::get()
        .uri("/v1/review/locks?schemaIds=dealers,offers")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!([]));

    let req = test::TestRequest::delete()
        .uri("/v1/review/locks/dealers")
        .insert_header((USER_HEADER, "admin"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_reject_finalize_and_deployment() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header((USER_HEADER, "alice"))
        .set_json(dealers_submission(json!([{"id": 1}]), json!([])))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let request_id = body["data"]["requestId"].as_str().unwrap().to_string();

    // no body: the comment is optional
    let req = test::TestRequest::post()
        .uri(&format!(
            "/v1/review/requests/{}/tables/dealers/reject",
            request_id
        ))
        .insert_header((USER_HEADER, "bob"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["finalized"], "REJECTED");

    let req = test::TestRequest::post()
        .uri(&format!("/v1/review/requests/{}/finalize", request_id))
        .insert_header((USER_HEADER, "bob"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], "REJECTED");

    let req = test::TestRequest::put()
        .uri(&format!("/v1/review/requests/{}/deployment", request_id))
        .set_json(json!({"deploymentVersionId": "deploy-7"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_bulk_approve() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    for (table, user) in [("dealers", "alice"), ("regions", "carol")] {
        let req = test::TestRequest::post()
            .uri("/v1/review/requests")
            .insert_header((USER_HEADER, user))
            .set_json(json!({
                "schemaIds": [table],
                "tableChanges": {table: {"oldData": [], "newData": [{"id": 1}]}}
            }))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::post()
        .uri("/v1/review/bulk/approve")
        .insert_header((USER_HEADER, "bob"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let resolved = body["data"]["resolved"].as_array().unwrap();
    assert_eq!(resolved.len(), 2);
    assert!(resolved.iter().all(|r| r["status"] == "APPROVED"));
    assert_eq!(body["data"]["failures"], json!([]));

    let req = test::TestRequest::get()
        .uri("/v1/review/requests?status=IN_REVIEW")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["totalCount"], 0);
}

#[actix_web::test]
async fn test_refresh_and_pending_view() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header((USER_HEADER, "alice"))
        .set_json(dealers_submission(json!([]), json!([{"id": 1}])))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/v1/review/refresh")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!({"requests": 1, "locks": 1}));

    let req = test::TestRequest::get().uri("/v1/review/pending").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["createdBy"], "alice");

    let req = test::TestRequest::get()
        .uri("/v1/review/pending/locks")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["schemaId"], "dealers");
    assert_eq!(body["data"][0]["lockedBy"], "alice");

    let req = test::TestRequest::get()
        .uri("/v1/review/pending/locks/dealers")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!({"schemaId": "dealers", "locked": true}));

    let req = test::TestRequest::get()
        .uri("/v1/review/pending/locks/branches")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["locked"], false);
}

#[actix_web::test]
async fn test_custom_user_header() {
    let config = config::Config::builder()
        .set_override("tollgate.auth.userHeader", "X-Forwarded-User")
        .unwrap()
        .build()
        .unwrap();
    let state = app_state(Configuration::from_config(config));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header(("X-Forwarded-User", "alice"))
        .set_json(dealers_submission(json!([]), json!([{"id": 1}])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/v1/review/requests")
        .insert_header((USER_HEADER, "carol"))
        .set_json(dealers_submission(json!([]), json!([{"id": 2}])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_health_and_metrics() {
    let state = app_state(Configuration::default());
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!({"status": "UP", "storage": "embedded"}));

    // no recorder installed in tests
    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
