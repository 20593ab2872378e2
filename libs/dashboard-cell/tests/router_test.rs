use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dashboard_cell::{admin_routes, therapist_routes, AdminGateway, BackendGateway};
use shared_backend::BackendClient;
use shared_utils::test_utils::{JwtTestUtils, MockBackendResponses, TestConfig, TestUser};

struct Harness {
    config: TestConfig,
    admin: Router,
    therapist: Router,
}

fn harness(server: &MockServer) -> Harness {
    let config = TestConfig::with_backend(&server.uri());
    let client = BackendClient::new(&config.to_app_config()).unwrap();
    let gateway: Arc<dyn AdminGateway> = Arc::new(BackendGateway::new(client));

    Harness {
        admin: admin_routes(config.to_arc(), gateway.clone()),
        therapist: therapist_routes(config.to_arc(), gateway),
        config,
    }
}

fn token_for(config: &TestConfig, user: &TestUser) -> String {
    JwtTestUtils::create_test_token(user, &config.jwt_secret, Some(1))
}

fn request(http_method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(http_method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let server = MockServer::start().await;
    let h = harness(&server);

    let response = h
        .admin
        .oneshot(request("GET", "/appointments", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let server = MockServer::start().await;
    let h = harness(&server);
    let token = JwtTestUtils::create_expired_token(&TestUser::admin("ops@example.com"), &h.config.jwt_secret);

    let response = h
        .admin
        .oneshot(request("GET", "/appointments", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_therapist_cannot_use_admin_routes() {
    let server = MockServer::start().await;
    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::therapist("t@example.com"));

    let response = h
        .admin
        .oneshot(request("GET", "/appointments", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_list_is_reconciled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/appointments/all/filter"))
        .and(query_param("search", "jane"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::appointment_page(
            vec![
                MockBackendResponses::paid_appointment("a1", "t1"),
                MockBackendResponses::unpaid_appointment("a2"),
                json!("not an object"),
            ],
            1,
            10,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::admin("ops@example.com"));
    let response = h
        .admin
        .oneshot(request("GET", "/appointments?search=jane", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["skipped"], 1);
    assert_eq!(json["appointments"][0]["reconciled"]["payment"]["text"], "Paid");
    assert_eq!(json["appointments"][0]["reconciled"]["actions"]["can_complete_session"], true);
    assert_eq!(json["appointments"][1]["reconciled"]["payment"]["text"], "No Payment");
    assert_eq!(json["appointments"][1]["reconciled"]["actions"]["can_link_payment"], true);
}

#[tokio::test]
async fn test_reversed_date_range_is_bad_request() {
    let server = MockServer::start().await;
    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::admin("ops@example.com"));

    let response = h
        .admin
        .oneshot(request(
            "GET",
            "/appointments?startDate=2024-06-01&endDate=2024-05-01",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_link_payment_then_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/admin/appointments/a2/link-payment"))
        .and(body_json(json!({ "paymentId": "pi_77" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut linked = MockBackendResponses::paid_appointment("a2", "t1");
    linked["checkoutSessionId"] = json!("cs_linked");
    Mock::given(method("GET"))
        .and(path("/api/admin/appointments/all/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::appointment_page(vec![linked], 1, 10)))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::admin("ops@example.com"));
    let response = h
        .admin
        .oneshot(request(
            "PUT",
            "/appointments/a2/link-payment",
            Some(&token),
            Some(json!({ "paymentId": "pi_77" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["appointments"][0]["reconciled"]["payment"]["text"], "Paid");
}

#[tokio::test]
async fn test_backend_failure_maps_to_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/admin/appointments/a1/revoke"))
        .respond_with(ResponseTemplate::new(500).set_body_json(MockBackendResponses::error_response("db down")))
        .mount(&server)
        .await;

    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::admin("ops@example.com"));
    let response = h
        .admin
        .oneshot(request("PUT", "/appointments/a1/revoke", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = read_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("db down"));
}

#[tokio::test]
async fn test_payout_summary_route() {
    let server = MockServer::start().await;
    let mut completed = MockBackendResponses::paid_appointment("a1", "t1");
    completed["status"] = json!("completed");
    completed["price"] = json!(200);
    completed["therapist"]["level"] = json!(2);

    Mock::given(method("GET"))
        .and(path("/api/admin/appointments/all/filter"))
        .and(query_param("therapist", "t1"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::appointment_page(vec![completed], 1, 100)))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::admin("ops@example.com"));
    let response = h
        .admin
        .oneshot(request("GET", "/payouts/therapists/t1", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["therapist_level"], 2);
    assert_eq!(json["total"], 114.0);
}

#[tokio::test]
async fn test_therapist_validate_conflicts_when_unpaid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/therapist/appointments/a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::unpaid_appointment("a2")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/therapist/appointments/a2/validate"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::therapist("t@example.com"));
    let response = h
        .therapist
        .oneshot(request("PUT", "/appointments/a2/validate", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_therapist_reject_forwards_comment() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/therapist/appointments/a1/status"))
        .and(body_json(json!({ "status": "rejected", "declineComment": "not my specialty" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/therapist/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "appointments": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::therapist("t@example.com"));
    let response = h
        .therapist
        .oneshot(request(
            "PUT",
            "/appointments/a1/reject",
            Some(&token),
            Some(json!({ "comment": "not my specialty" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_therapist_validate_sends_completed_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/therapist/appointments/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::paid_appointment("a1", "t1")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/therapist/appointments/a1/validate"))
        .and(body_json(json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/therapist/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "appointments": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::therapist("t@example.com"));
    let response = h
        .therapist
        .oneshot(request("PUT", "/appointments/a1/validate", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_board_loads_once_and_keeps_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/appointments/all/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::appointment_page(
            vec![MockBackendResponses::paid_appointment("a1", "t1")],
            1,
            10,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::admin("ops@example.com"));

    let first = h
        .admin
        .clone()
        .oneshot(request("GET", "/board", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let json = read_json(first).await;
    assert_eq!(json["applied"], true);
    assert_eq!(json["page"]["appointments"][0]["reconciled"]["payment"]["text"], "Paid");

    let second = h
        .admin
        .oneshot(request("GET", "/board", Some(&token), None))
        .await
        .unwrap();
    let json = read_json(second).await;
    assert_eq!(json["applied"], false);
    assert_eq!(json["page"]["appointments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_board_search_sends_term() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/appointments/all/filter"))
        .and(query_param("search", "jane"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::appointment_page(vec![], 1, 10)))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::admin("ops@example.com"));
    let response = h
        .admin
        .oneshot(request("GET", "/board/search?term=%20jane%20", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["applied"], true);
    assert_eq!(json["filter"]["search"], "jane");
}

#[tokio::test]
async fn test_board_filter_is_validated() {
    let server = MockServer::start().await;
    let h = harness(&server);
    let token = token_for(&h.config, &TestUser::admin("ops@example.com"));

    let response = h
        .admin
        .oneshot(request(
            "PUT",
            "/board/filter",
            Some(&token),
            Some(json!({ "startDate": "2024-06-01", "endDate": "2024-05-01" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
