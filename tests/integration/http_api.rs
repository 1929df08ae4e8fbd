//! Router-level tests: status codes and JSON envelopes

use super::test_utils::{StaticClient, TestApp};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use carechat::patient::PatientRecord;
use carechat::provider::{ModelProviderClient, ProviderKind};
use carechat::server;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with_openai(answer: &str) -> (TestApp, Router) {
    let client: Arc<dyn ModelProviderClient> =
        Arc::new(StaticClient::answering(ProviderKind::OpenAI, answer));
    let app = TestApp::new(vec![client]);
    let router = server::router(app.state());
    (app, router)
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn patient_fixture() -> PatientRecord {
    let now = Utc::now();
    serde_json::from_value(json!({
        "patientId": "P100",
        "name": "Jonas Berg",
        "email": "jonas@example.org",
        "age": 63,
        "gender": "male",
        "phoneNumber": "555-0199",
        "medicalHistory": {
            "conditions": ["COPD"],
            "medications": [
                {"name": "Tiotropium", "dosage": "18mcg", "frequency": "daily", "startDate": (now - Duration::days(400)).to_rfc3339()},
                {"name": "Salbutamol", "dosage": "100mcg", "frequency": "as needed", "startDate": (now - Duration::days(30)).to_rfc3339()}
            ],
            "allergies": []
        },
        "appointments": [
            {"date": (now + Duration::days(7)).to_rfc3339(), "doctor": "Dr. Holm", "department": "Pulmonology", "status": "scheduled"},
            {"date": (now + Duration::days(9)).to_rfc3339(), "doctor": "Dr. Holm", "department": "Pulmonology", "status": "completed"}
        ],
        "testResults": [
            {"testName": "Spirometry", "date": (now - Duration::days(2)).to_rfc3339(), "results": {"fev1": 1.9}, "normalRange": "FEV1 > 2.5", "status": "abnormal"}
        ],
        "billing": {"balance": 40.0, "paymentHistory": []}
    }))
    .unwrap()
}

#[tokio::test]
async fn health_reports_environment() {
    let (_app, router) = app_with_openai("ok");
    let (status, body) = call(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["environment"], "test");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn chat_message_success_envelope() {
    let (_app, router) = app_with_openai("Take it easy.");
    let (status, body) = call(
        &router,
        "POST",
        "/api/chat/message",
        Some(json!({"message": "Back pain?", "selectedApi": "openai", "sessionId": "abc"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["sessionId"], "abc");
    assert_eq!(body["data"]["responses"]["openai"]["answer"], "Take it easy.");
    assert!(body["data"]["responses"]["openai"]["responseTime"].is_u64());
    assert_eq!(body["data"]["contextsUsed"], json!([]));
}

#[tokio::test]
async fn chat_message_validation_errors() {
    let (_app, router) = app_with_openai("ok");

    let (status, body) = call(&router, "POST", "/api/chat/message", Some(json!({"message": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("message"));

    let long = "a".repeat(1001);
    let (status, _) = call(&router, "POST", "/api/chat/message", Some(json!({"message": long}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &router,
        "POST",
        "/api/chat/message",
        Some(json!({"message": "hi", "selectedApi": "bard"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("bard"));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (_app, router) = app_with_openai("ok");
    let request = Request::builder()
        .method("POST")
        .uri("/api/chat/message")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unconfigured_provider_is_503() {
    let (_app, router) = app_with_openai("ok");
    let (status, body) = call(
        &router,
        "POST",
        "/api/chat/message",
        Some(json!({"message": "hi", "selectedApi": "gemini"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn provider_failure_still_succeeds() {
    let client: Arc<dyn ModelProviderClient> =
        Arc::new(StaticClient::failing(ProviderKind::Grok, "upstream timeout"));
    let app = TestApp::new(vec![client]);
    let router = server::router(app.state());

    let (status, body) = call(
        &router,
        "POST",
        "/api/chat/message",
        Some(json!({"message": "hi", "selectedApi": "grok"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let grok = &body["data"]["responses"]["grok"];
    assert_eq!(grok["answer"], "No response from Grok AI.");
    assert!(grok["error"].as_str().unwrap().contains("upstream timeout"));
}

#[tokio::test]
async fn history_and_contexts_endpoints() {
    let (_app, router) = app_with_openai("Drink fluids.");

    let (_, body) = call(&router, "GET", "/api/chat/history/u5", None).await;
    assert_eq!(
        body,
        json!({"success": false, "message": "No history found for this user"})
    );

    call(
        &router,
        "POST",
        "/api/chat/message",
        Some(json!({"message": "Fever?", "userId": "u5", "contexts": ["age 4", "asthma"]})),
    )
    .await;

    let (status, body) = call(&router, "GET", "/api/chat/history/u5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["question"], "Fever?");
    assert_eq!(body["data"][0]["answer"], "Drink fluids.");
    assert_eq!(body["data"][0]["provider"], "openai");

    let (_, body) = call(&router, "GET", "/api/chat/contexts/u5", None).await;
    assert_eq!(body["data"], json!(["age 4", "asthma"]));

    let (_, body) = call(&router, "DELETE", "/api/chat/contexts/u5", None).await;
    assert_eq!(body["data"]["cleared"], true);
    let (_, body) = call(&router, "GET", "/api/chat/contexts/u5", None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn recent_questions_endpoint() {
    let (_app, router) = app_with_openai("ok");
    for question in ["Dizzy?", "Nausea?", "Dizzy?", "Cough?", "Rash?"] {
        call(
            &router,
            "POST",
            "/api/chat/message",
            Some(json!({"message": question, "userId": "u7"})),
        )
        .await;
    }
    let (status, body) = call(&router, "GET", "/api/chat/questions/u7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "data": ["Rash?", "Cough?", "Dizzy?"]})
    );

    let (_, body) = call(&router, "GET", "/api/chat/questions/u8", None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn patient_endpoints() {
    let (app, router) = app_with_openai("ok");
    app.patients.import(&[patient_fixture()]).unwrap();

    let (status, body) = call(&router, "GET", "/api/patient/P100", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({
            "patientId": "P100",
            "name": "Jonas Berg",
            "age": 63,
            "upcomingAppointments": 1,
            "currentMedications": 2,
            "accountBalance": 40.0
        })
    );

    let (_, body) = call(&router, "GET", "/api/patient/P100/appointments", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (_, body) = call(&router, "GET", "/api/patient/P100/medications", None).await;
    assert_eq!(body["data"][1]["name"], "Salbutamol");
    let (_, body) = call(&router, "GET", "/api/patient/P100/test-results", None).await;
    assert_eq!(body["data"][0]["results"]["fev1"], 1.9);
    let (_, body) = call(&router, "GET", "/api/patient/P100/billing", None).await;
    assert_eq!(body["data"]["balance"], 40.0);
}

#[tokio::test]
async fn missing_patient() {
    let (_app, router) = app_with_openai("ok");
    let (status, body) = call(&router, "GET", "/api/patient/P404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "error": "Patient not found"}));

    let (status, body) = call(&router, "GET", "/api/patient/P404/appointments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (_, body) = call(&router, "GET", "/api/patient/P404/billing", None).await;
    assert_eq!(body, json!({"success": true, "data": null}));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (_app, router) = app_with_openai("ok");
    let (status, body) = call(&router, "GET", "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Route not found"}));
}
