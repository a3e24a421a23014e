use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, Drug, InventoryTransaction, Patient};
use serde_json::Value;
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn delete(uri: &str) -> Request<String> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(String::new())
        .unwrap()
}

type AppService = axum::routing::RouterIntoService<String>;

async fn call(app: &mut AppService, request: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(request).await.unwrap()
}

fn service() -> AppService {
    let router: Router = app();
    router.into_service()
}

// --- health ---

#[tokio::test]
async fn health_reports_ok() {
    let resp = app().oneshot(get("/api/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["time"].is_string());
}

// --- patients ---

#[tokio::test]
async fn list_patients_empty() {
    let resp = app().oneshot(get("/api/patients")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let patients: Vec<Patient> = body_json(resp).await;
    assert!(patients.is_empty());
}

#[tokio::test]
async fn create_patient_returns_201_with_id() {
    let resp = app()
        .oneshot(json_request("POST", "/api/patients", r#"{"name":"Ada","age":36}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    assert!(body["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn create_patient_blank_name_is_rejected_with_detail() {
    let resp = app()
        .oneshot(json_request("POST", "/api/patients", r#"{"name":"   "}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "name required");
}

// --- drugs ---

#[tokio::test]
async fn update_unknown_drug_updates_nothing() {
    let resp = app()
        .oneshot(json_request("PATCH", "/api/drugs/99", r#"{"stock":5}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["updated"], 0);
}

#[tokio::test]
async fn empty_drug_patch_updates_nothing() {
    let mut app = service();
    let resp = call(
        &mut app,
        json_request("POST", "/api/drugs", r#"{"name":"Aspirin","stock":3}"#),
    )
    .await;
    let id = body_json::<Value>(resp).await["id"].as_i64().unwrap();

    let patch = json_request("PATCH", &format!("/api/drugs/{id}"), r#"{"stock":null}"#);
    let resp = call(&mut app, patch).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json::<Value>(resp).await["updated"], 0);

    let resp = call(&mut app, get("/api/drugs")).await;
    let drugs: Vec<Drug> = body_json(resp).await;
    assert_eq!(drugs[0].stock, 3);
}

#[tokio::test]
async fn delete_drug_not_found() {
    let resp = app().oneshot(delete("/api/drugs/99")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "Not found");
}

// --- deliveries ---

#[tokio::test]
async fn create_delivery_lists_missing_fields() {
    let resp = app()
        .oneshot(json_request("POST", "/api/deliveries", r#"{"patient_id":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "missing: drug_id, scheduled_for");
}

#[tokio::test]
async fn create_delivery_for_unknown_patient_is_404() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/deliveries",
            r#"{"patient_id":7,"drug_id":8,"scheduled_for":"2024-05-01"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "patient not found");
}

#[tokio::test]
async fn update_status_rejects_unknown_status() {
    let resp = app()
        .oneshot(json_request(
            "PATCH",
            "/api/deliveries/1/status",
            r#"{"status":"lost"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "invalid status");
}

#[tokio::test]
async fn patient_history_rejects_non_positive_id() {
    let resp = app().oneshot(get("/api/deliveries/patient/0")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- inventory ---

#[tokio::test]
async fn adjust_without_delta_is_400() {
    let resp = app()
        .oneshot(json_request("POST", "/api/inventory/adjust", r#"{"drug_id":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(resp).await;
    assert_eq!(&body[..], br#"{"detail":"delta required"}"#);
}

#[tokio::test]
async fn adjust_unknown_drug_is_404() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/inventory/adjust",
            r#"{"drug_id":42,"delta":3}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "drug not found");
}

#[tokio::test]
async fn stats_start_at_zero() {
    let resp = app().oneshot(get("/api/stats")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Value = body_json(resp).await;
    assert_eq!(stats["totalPatients"], 0);
    assert_eq!(stats["pendingDeliveries"], 0);
    assert_eq!(stats["missedDeliveries"], 0);
}

#[tokio::test]
async fn stats_count_deliveries_by_calendar_day() {
    let mut app = service();
    let resp = call(
        &mut app,
        json_request("POST", "/api/patients", r#"{"name":"Ada"}"#),
    )
    .await;
    let patient_id = body_json::<Value>(resp).await["id"].as_i64().unwrap();
    let resp = call(
        &mut app,
        json_request("POST", "/api/drugs", r#"{"name":"Insulin"}"#),
    )
    .await;
    let drug_id = body_json::<Value>(resp).await["id"].as_i64().unwrap();

    let today = chrono::Utc::now().date_naive().to_string();
    for (date, status) in [("2999-12-01", "pending"), (today.as_str(), "delivered")] {
        let body = format!(
            r#"{{"patient_id":{patient_id},"drug_id":{drug_id},"scheduled_for":"{date}","status":"{status}"}}"#
        );
        let resp = call(&mut app, json_request("POST", "/api/deliveries", &body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = call(&mut app, get("/api/stats")).await;
    let stats: Value = body_json(resp).await;
    assert_eq!(stats["pendingDeliveries"], 1);
    assert_eq!(stats["upcomingDeliveries"], 1);
    assert_eq!(stats["completedToday"], 1);
}

#[tokio::test]
async fn health_time_is_rfc3339() {
    let resp = app().oneshot(get("/api/health")).await.unwrap();

    let body: Value = body_json(resp).await;
    let time = body["time"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok(), "{time}");
}

#[tokio::test]
async fn removals_filter_by_drug() {
    let mut app = service();
    let mut drug_ids = Vec::new();
    for name in ["Insulin", "Metformin"] {
        let body = format!(r#"{{"name":"{name}","stock":10}}"#);
        let resp = call(&mut app, json_request("POST", "/api/drugs", &body)).await;
        drug_ids.push(body_json::<Value>(resp).await["id"].as_i64().unwrap());
    }
    for drug_id in &drug_ids {
        let body = format!(r#"{{"drug_id":{drug_id},"quantity":1,"reason":"expired"}}"#);
        let resp = call(&mut app, json_request("POST", "/api/drug_removals", &body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let uri = format!("/api/drug_removals?drug_id={}", drug_ids[1]);
    let resp = call(&mut app, get(&uri)).await;
    let removals: Vec<Value> = body_json(resp).await;
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0]["drug_id"], drug_ids[1]);

    let resp = call(&mut app, get("/api/drug_removals")).await;
    let removals: Vec<Value> = body_json(resp).await;
    assert_eq!(removals.len(), 2);
}

#[tokio::test]
async fn removal_requires_reason() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/drug_removals",
            r#"{"drug_id":1,"quantity":2,"reason":" "}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "reason required");
}

// --- ai placeholders ---

#[tokio::test]
async fn ai_chat_answers_without_model() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/ai/chat",
            r#"{"messages":[{"role":"user","content":"hello"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["enabled"], false);
    assert!(body["reply"].as_str().unwrap().contains("hello"));
}

// --- full lifecycle ---

#[tokio::test]
async fn delivery_and_inventory_lifecycle() {
    let mut app = service();

    // create a patient and a drug
    let resp = call(
        &mut app,
        json_request("POST", "/api/patients", r#"{"name":"Ada"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let patient_id = body_json::<Value>(resp).await["id"].as_i64().unwrap();

    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/drugs",
            r#"{"name":"Metformin","dosage":"500mg","stock":10,"reorder_level":4}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let drug_id = body_json::<Value>(resp).await["id"].as_i64().unwrap();

    // schedule a delivery using the legacy field name
    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/deliveries",
            &format!(
                r#"{{"patient_id":{patient_id},"drug_id":{drug_id},"delivery_date":"2024-05-01","quantity":3}}"#
            ),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let delivery_id = body_json::<Value>(resp).await["id"].as_i64().unwrap();

    // summary counts the pending quantity
    let resp = call(&mut app, get("/api/inventory/summary")).await;
    let summary: Vec<Value> = body_json(resp).await;
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["pending_quantity"], 3);
    assert_eq!(summary[0]["stock"], 10);

    // patient history carries joined names
    let resp = call(&mut app, get(&format!("/api/deliveries/patient/{patient_id}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let history: Vec<Value> = body_json(resp).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["patient_name"], "Ada");
    assert_eq!(history[0]["drug_name"], "Metformin");
    assert_eq!(history[0]["delivery_date"], "2024-05-01");

    // mark delivered
    let resp = call(
        &mut app,
        json_request(
            "PATCH",
            &format!("/api/deliveries/{delivery_id}/status"),
            r#"{"status":"delivered"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // stock moves: adjust down past zero, then receive a batch
    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/inventory/adjust",
            &format!(r#"{{"drug_id":{drug_id},"delta":-25,"reason":"audit"}}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/drug_batches",
            &format!(r#"{{"drug_id":{drug_id},"quantity":6,"batch_no":"B-17"}}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = call(&mut app, get("/api/drugs")).await;
    let drugs: Vec<Drug> = body_json(resp).await;
    assert_eq!(drugs[0].stock, 6);

    // newest transaction first, limit honoured
    let resp = call(&mut app, get("/api/inventory/transactions?limit=1")).await;
    let transactions: Vec<InventoryTransaction> = body_json(resp).await;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].delta, 6);
    assert_eq!(transactions[0].reason.as_deref(), Some("batch:B-17"));

    // deleting the drug cascades to its deliveries
    let resp = call(&mut app, delete(&format!("/api/drugs/{drug_id}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, get("/api/deliveries")).await;
    let deliveries: Vec<Value> = body_json(resp).await;
    assert!(deliveries.is_empty());

    let resp = call(&mut app, get("/api/inventory/transactions")).await;
    let transactions: Vec<InventoryTransaction> = body_json(resp).await;
    assert!(transactions.is_empty());
}
