//! In-memory MedPal backend.
//!
//! Serves the same routes and JSON shapes as the production backend under
//! `/api`: create endpoints answer `201 {"id": ...}`, failures answer
//! `{"detail": ...}` with the matching status.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

pub const ALLOWED_STATUSES: [&str; 4] = ["pending", "delivered", "missed", "cancelled"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub age: Option<u32>,
    pub condition: Option<String>,
    pub contact: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Drug {
    pub id: i64,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub stock: i64,
    pub reorder_level: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub patient_id: i64,
    pub drug_id: i64,
    pub scheduled_for: String,
    pub status: String,
    pub notes: Option<String>,
    pub quantity: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: i64,
    pub drug_id: i64,
    pub delta: i64,
    pub reason: Option<String>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DrugBatch {
    pub id: i64,
    pub drug_id: i64,
    pub batch_no: Option<String>,
    pub isbn: Option<String>,
    pub producer: Option<String>,
    pub transporter: Option<String>,
    pub mfg_date: Option<String>,
    pub exp_date: Option<String>,
    pub quantity: u32,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DrugRemoval {
    pub id: i64,
    pub drug_id: i64,
    pub batch_no: Option<String>,
    pub reason: String,
    pub quantity: u32,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct CreatePatient {
    #[serde(default)]
    pub name: String,
    pub age: Option<u32>,
    pub condition: Option<String>,
    pub contact: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateDrug {
    #[serde(default)]
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub stock: Option<i64>,
    pub reorder_level: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateDrug {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub stock: Option<i64>,
    pub reorder_level: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateDelivery {
    pub patient_id: Option<i64>,
    pub drug_id: Option<i64>,
    #[serde(alias = "delivery_date")]
    pub scheduled_for: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub quantity: Option<u32>,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct Adjustment {
    pub drug_id: Option<i64>,
    #[serde(default)]
    pub delta: i64,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateBatch {
    pub drug_id: Option<i64>,
    #[serde(default)]
    pub quantity: i64,
    pub batch_no: Option<String>,
    pub isbn: Option<String>,
    pub producer: Option<String>,
    pub transporter: Option<String>,
    pub mfg_date: Option<String>,
    pub exp_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateRemoval {
    pub drug_id: Option<i64>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub reason: String,
    pub batch_no: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
    pub drug_id: Option<i64>,
}

/// `{"detail": ...}` error response.
#[derive(Debug)]
pub struct Detail(pub StatusCode, pub String);

impl Detail {
    fn bad_request(detail: &str) -> Self {
        Self(StatusCode::BAD_REQUEST, detail.to_string())
    }

    fn not_found(detail: &str) -> Self {
        Self(StatusCode::NOT_FOUND, detail.to_string())
    }
}

impl IntoResponse for Detail {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

type ApiResult<T> = Result<T, Detail>;

#[derive(Default)]
pub struct Store {
    next_id: i64,
    patients: BTreeMap<i64, Patient>,
    drugs: BTreeMap<i64, Drug>,
    deliveries: BTreeMap<i64, Delivery>,
    transactions: Vec<InventoryTransaction>,
    batches: Vec<DrugBatch>,
    removals: Vec<DrugRemoval>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn record_transaction(&mut self, drug_id: i64, delta: i64, reason: Option<String>) {
        let id = self.next_id();
        self.transactions.push(InventoryTransaction {
            id,
            drug_id,
            delta,
            reason,
            created_at: timestamp(),
        });
    }

    /// Apply `delta` to a drug's stock, floored at zero.
    fn adjust_stock(&mut self, drug_id: i64, delta: i64) -> ApiResult<()> {
        let drug = self
            .drugs
            .get_mut(&drug_id)
            .ok_or_else(|| Detail::not_found("drug not found"))?;
        drug.stock = (drug.stock + delta).max(0);
        Ok(())
    }

    /// Dashboard counters; the day-based ones compare against `today`.
    fn stats(&self, today: NaiveDate) -> Value {
        let today = today.to_string();
        let count = |status: &str| self.deliveries.values().filter(|d| d.status == status).count();
        let completed_today = self
            .deliveries
            .values()
            .filter(|d| d.status == "delivered" && scheduled_day(&d.scheduled_for) == today)
            .count();
        let upcoming = self
            .deliveries
            .values()
            .filter(|d| d.status == "pending" && scheduled_day(&d.scheduled_for) >= today.as_str())
            .count();
        json!({
            "totalPatients": self.patients.len(),
            "totalDrugs": self.drugs.len(),
            "pendingDeliveries": count("pending"),
            "completedToday": completed_today,
            "missedDeliveries": count("missed"),
            "upcomingDeliveries": upcoming,
        })
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients).post(create_patient))
        .route("/drugs", get(list_drugs).post(create_drug))
        .route("/drugs/{id}", patch(update_drug).delete(delete_drug))
        .route("/deliveries", get(list_deliveries).post(create_delivery))
        .route("/deliveries/{id}", axum::routing::delete(delete_delivery))
        .route("/deliveries/{id}/status", patch(update_delivery_status))
        .route("/deliveries/patient/{patient_id}", get(patient_deliveries))
        .route("/stats", get(stats))
        .route("/inventory/summary", get(inventory_summary))
        .route("/inventory/transactions", get(inventory_transactions))
        .route("/inventory/adjust", post(adjust_inventory))
        .route("/drug_batches", get(list_batches).post(create_batch))
        .route("/drug_removals", get(list_removals).post(create_removal))
        .route("/ai/status", get(ai_status))
        .route("/ai/chat", post(ai_chat))
        .route("/ai/rewrite", post(ai_rewrite))
        .route("/ai/image", post(ai_image))
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock backend listening");
    }
    axum::serve(listener, app()).await
}

/// Row creation time, formatted like SQLite's `datetime('now')`.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Calendar day of a scheduled timestamp (`2024-05-01` or `2024-05-01T09:00`).
fn scheduled_day(scheduled_for: &str) -> &str {
    scheduled_for.get(..10).unwrap_or(scheduled_for)
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "time": Utc::now().to_rfc3339() }))
}

// --- patients ---

async fn list_patients(State(db): State<Db>) -> Json<Vec<Patient>> {
    let store = db.read().await;
    Json(store.patients.values().cloned().collect())
}

async fn create_patient(
    State(db): State<Db>,
    Json(input): Json<CreatePatient>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Detail::bad_request("name required"));
    }
    let mut store = db.write().await;
    let id = store.next_id();
    store.patients.insert(
        id,
        Patient {
            id,
            name: name.to_string(),
            age: input.age,
            condition: input.condition,
            contact: input.contact,
        },
    );
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

// --- drugs ---

async fn list_drugs(State(db): State<Db>) -> Json<Vec<Drug>> {
    let store = db.read().await;
    Json(store.drugs.values().cloned().collect())
}

async fn create_drug(
    State(db): State<Db>,
    Json(input): Json<CreateDrug>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Detail::bad_request("name required"));
    }
    let mut store = db.write().await;
    let id = store.next_id();
    store.drugs.insert(
        id,
        Drug {
            id,
            name: name.to_string(),
            dosage: trimmed(&input.dosage),
            frequency: trimmed(&input.frequency),
            stock: input.stock.unwrap_or(0).max(0),
            reorder_level: input.reorder_level.unwrap_or(0).max(0),
        },
    );
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn update_drug(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateDrug>,
) -> Json<Value> {
    let has_changes = input.name.is_some()
        || input.dosage.is_some()
        || input.frequency.is_some()
        || input.stock.is_some()
        || input.reorder_level.is_some();
    let mut store = db.write().await;
    // Unknown ids and empty patches update nothing, like the SQL UPDATE.
    let Some(drug) = store.drugs.get_mut(&id).filter(|_| has_changes) else {
        return Json(json!({ "updated": 0 }));
    };
    if let Some(name) = input.name {
        drug.name = name;
    }
    if input.dosage.is_some() {
        drug.dosage = input.dosage;
    }
    if input.frequency.is_some() {
        drug.frequency = input.frequency;
    }
    if let Some(stock) = input.stock {
        drug.stock = stock;
    }
    if let Some(level) = input.reorder_level {
        drug.reorder_level = level;
    }
    Json(json!({ "updated": 1 }))
}

async fn delete_drug(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let mut store = db.write().await;
    store
        .drugs
        .remove(&id)
        .ok_or_else(|| Detail::not_found("Not found"))?;
    // Cascade like the SQLite foreign keys.
    store.deliveries.retain(|_, d| d.drug_id != id);
    store.transactions.retain(|t| t.drug_id != id);
    store.batches.retain(|b| b.drug_id != id);
    store.removals.retain(|r| r.drug_id != id);
    Ok(Json(json!({ "deleted": true })))
}

// --- deliveries ---

async fn list_deliveries(State(db): State<Db>) -> Json<Vec<Delivery>> {
    let store = db.read().await;
    Json(store.deliveries.values().rev().cloned().collect())
}

async fn create_delivery(
    State(db): State<Db>,
    Json(input): Json<CreateDelivery>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut missing = Vec::new();
    if input.patient_id.is_none() {
        missing.push("patient_id");
    }
    if input.drug_id.is_none() {
        missing.push("drug_id");
    }
    if trimmed(&input.scheduled_for).is_none() {
        missing.push("scheduled_for");
    }
    let (Some(patient_id), Some(drug_id), Some(scheduled_for)) =
        (input.patient_id, input.drug_id, trimmed(&input.scheduled_for))
    else {
        return Err(Detail::bad_request(&format!("missing: {}", missing.join(", "))));
    };
    let status = input.status.unwrap_or_else(|| "pending".to_string());
    if !ALLOWED_STATUSES.contains(&status.as_str()) {
        return Err(Detail::bad_request("invalid status"));
    }

    let mut store = db.write().await;
    if !store.patients.contains_key(&patient_id) {
        return Err(Detail::not_found("patient not found"));
    }
    if !store.drugs.contains_key(&drug_id) {
        return Err(Detail::not_found("drug not found"));
    }
    let id = store.next_id();
    store.deliveries.insert(
        id,
        Delivery {
            id,
            patient_id,
            drug_id,
            scheduled_for,
            status,
            notes: input.notes,
            quantity: input.quantity.unwrap_or(1),
        },
    );
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn update_delivery_status(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<StatusUpdate>,
) -> ApiResult<Json<Value>> {
    let status = input
        .status
        .filter(|s| ALLOWED_STATUSES.contains(&s.as_str()))
        .ok_or_else(|| Detail::bad_request("invalid status"))?;
    let mut store = db.write().await;
    let delivery = store
        .deliveries
        .get_mut(&id)
        .ok_or_else(|| Detail::not_found("not found"))?;
    delivery.status = status;
    Ok(Json(json!({ "ok": true })))
}

async fn delete_delivery(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let mut store = db.write().await;
    store
        .deliveries
        .remove(&id)
        .ok_or_else(|| Detail::not_found("Not found"))?;
    Ok(Json(json!({ "deleted": true })))
}

/// Patient history, most recent first, joined with patient and drug names.
async fn patient_deliveries(
    State(db): State<Db>,
    Path(patient_id): Path<i64>,
) -> ApiResult<Json<Vec<Value>>> {
    if patient_id < 1 {
        return Err(Detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            "patient_id must be >= 1".to_string(),
        ));
    }
    let store = db.read().await;
    let mut rows: Vec<&Delivery> = store
        .deliveries
        .values()
        .filter(|d| d.patient_id == patient_id)
        .collect();
    rows.sort_by(|a, b| b.scheduled_for.cmp(&a.scheduled_for).then(b.id.cmp(&a.id)));

    let history = rows
        .into_iter()
        .map(|d| {
            let patient = store.patients.get(&d.patient_id);
            let drug = store.drugs.get(&d.drug_id);
            json!({
                "id": d.id,
                "patient_id": d.patient_id,
                "patient_name": patient.map(|p| p.name.clone()),
                "drug_id": d.drug_id,
                "drug_name": drug.map(|x| x.name.clone()),
                "dosage": drug.and_then(|x| x.dosage.clone()),
                "frequency": drug.and_then(|x| x.frequency.clone()),
                "delivery_date": d.scheduled_for,
                "status": d.status,
            })
        })
        .collect();
    Ok(Json(history))
}

async fn stats(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    Json(store.stats(Utc::now().date_naive()))
}

// --- inventory ---

async fn inventory_summary(State(db): State<Db>) -> Json<Vec<Value>> {
    let store = db.read().await;
    let mut drugs: Vec<&Drug> = store.drugs.values().collect();
    drugs.sort_by(|a, b| a.name.cmp(&b.name));
    let summary = drugs
        .into_iter()
        .map(|d| {
            let pending: u32 = store
                .deliveries
                .values()
                .filter(|x| x.drug_id == d.id && x.status == "pending")
                .map(|x| x.quantity)
                .sum();
            json!({
                "id": d.id,
                "name": d.name,
                "dosage": d.dosage,
                "frequency": d.frequency,
                "stock": d.stock,
                "reorder_level": d.reorder_level,
                "pending_quantity": pending,
                "daily_avg": null,
                "days_supply": null,
            })
        })
        .collect();
    Json(summary)
}

async fn inventory_transactions(
    State(db): State<Db>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<InventoryTransaction>> {
    let store = db.read().await;
    let limit = params.limit.unwrap_or(300);
    Json(store.transactions.iter().rev().take(limit).cloned().collect())
}

async fn adjust_inventory(
    State(db): State<Db>,
    Json(input): Json<Adjustment>,
) -> ApiResult<Json<Value>> {
    if input.delta == 0 {
        return Err(Detail::bad_request("delta required"));
    }
    let drug_id = input
        .drug_id
        .ok_or_else(|| Detail::not_found("drug not found"))?;
    let mut store = db.write().await;
    store.adjust_stock(drug_id, input.delta)?;
    let reason = input.reason.or_else(|| Some("manual".to_string()));
    store.record_transaction(drug_id, input.delta, reason);
    Ok(Json(json!({ "ok": true })))
}

async fn list_batches(
    State(db): State<Db>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<DrugBatch>> {
    let store = db.read().await;
    let limit = params.limit.unwrap_or(200);
    Json(
        store
            .batches
            .iter()
            .rev()
            .filter(|b| params.drug_id.map_or(true, |id| b.drug_id == id))
            .take(limit)
            .cloned()
            .collect(),
    )
}

async fn create_batch(
    State(db): State<Db>,
    Json(input): Json<CreateBatch>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let quantity = u32::try_from(input.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| Detail::bad_request("quantity must be positive"))?;
    let drug_id = input
        .drug_id
        .ok_or_else(|| Detail::not_found("drug not found"))?;
    let mut store = db.write().await;
    store.adjust_stock(drug_id, i64::from(quantity))?;
    let id = store.next_id();
    let reason = format!("batch:{}", input.batch_no.as_deref().unwrap_or_default());
    store.batches.push(DrugBatch {
        id,
        drug_id,
        batch_no: input.batch_no,
        isbn: input.isbn,
        producer: input.producer,
        transporter: input.transporter,
        mfg_date: input.mfg_date,
        exp_date: input.exp_date,
        quantity,
        notes: input.notes,
        created_at: timestamp(),
    });
    store.record_transaction(drug_id, i64::from(quantity), Some(reason));
    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))))
}

async fn list_removals(
    State(db): State<Db>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<DrugRemoval>> {
    let store = db.read().await;
    let limit = params.limit.unwrap_or(200);
    Json(
        store
            .removals
            .iter()
            .rev()
            .filter(|r| params.drug_id.map_or(true, |id| r.drug_id == id))
            .take(limit)
            .cloned()
            .collect(),
    )
}

async fn create_removal(
    State(db): State<Db>,
    Json(input): Json<CreateRemoval>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let quantity = u32::try_from(input.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| Detail::bad_request("quantity must be positive"))?;
    let reason = input.reason.trim().to_string();
    if reason.is_empty() {
        return Err(Detail::bad_request("reason required"));
    }
    let drug_id = input
        .drug_id
        .ok_or_else(|| Detail::not_found("drug not found"))?;
    let mut store = db.write().await;
    store.adjust_stock(drug_id, -i64::from(quantity))?;
    let id = store.next_id();
    store.removals.push(DrugRemoval {
        id,
        drug_id,
        batch_no: input.batch_no,
        reason: reason.clone(),
        quantity,
        notes: input.notes,
        created_at: timestamp(),
    });
    store.record_transaction(drug_id, -i64::from(quantity), Some(format!("removal:{reason}")));
    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))))
}

// --- AI assist: deterministic placeholders, no model configured ---

async fn ai_status() -> Json<Value> {
    Json(json!({ "enabled": false, "model": null, "last_error": null }))
}

async fn ai_chat(Json(input): Json<Value>) -> Json<Value> {
    let last = input["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default();
    Json(json!({
        "reply": format!("AI assistant is offline. You asked: {last}"),
        "enabled": false,
    }))
}

async fn ai_rewrite(Json(input): Json<Value>) -> ApiResult<Json<Value>> {
    let text = input["text"]
        .as_str()
        .ok_or_else(|| Detail::bad_request("text required"))?;
    Ok(Json(json!({ "text": text.trim(), "enabled": false })))
}

async fn ai_image(Json(input): Json<Value>) -> ApiResult<Json<Value>> {
    if input["prompt"].as_str().map_or(true, str::is_empty) {
        return Err(Detail::bad_request("prompt required"));
    }
    Ok(Json(json!({ "image": null, "enabled": false })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_serializes_to_json() {
        let patient = Patient {
            id: 1,
            name: "Ada".to_string(),
            age: Some(36),
            condition: None,
            contact: Some("555-0100".to_string()),
        };
        let json = serde_json::to_value(&patient).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Ada");
        assert_eq!(json["condition"], Value::Null);
    }

    #[test]
    fn create_patient_defaults_missing_name_to_empty() {
        let input: CreatePatient = serde_json::from_str(r#"{"age":40}"#).unwrap();
        assert!(input.name.is_empty());
        assert_eq!(input.age, Some(40));
    }

    #[test]
    fn create_delivery_accepts_delivery_date() {
        let input: CreateDelivery = serde_json::from_str(
            r#"{"patient_id":1,"drug_id":2,"delivery_date":"2024-05-01"}"#,
        )
        .unwrap();
        assert_eq!(input.scheduled_for.as_deref(), Some("2024-05-01"));
        assert!(input.status.is_none());
    }

    #[test]
    fn update_drug_all_fields_optional() {
        let input: UpdateDrug = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.stock.is_none());
    }

    #[test]
    fn adjust_stock_floors_at_zero() {
        let mut store = Store::default();
        store.drugs.insert(
            1,
            Drug {
                id: 1,
                name: "Insulin".to_string(),
                dosage: None,
                frequency: None,
                stock: 2,
                reorder_level: 0,
            },
        );
        store.adjust_stock(1, -5).unwrap();
        assert_eq!(store.drugs[&1].stock, 0);
        assert!(store.adjust_stock(9, 1).is_err());
    }

    fn delivery(id: i64, scheduled_for: &str, status: &str) -> Delivery {
        Delivery {
            id,
            patient_id: 1,
            drug_id: 2,
            scheduled_for: scheduled_for.to_string(),
            status: status.to_string(),
            notes: None,
            quantity: 1,
        }
    }

    #[test]
    fn day_counters_use_calendar_dates() {
        let mut store = Store::default();
        for d in [
            delivery(1, "2026-10-18", "delivered"),
            delivery(2, "2026-10-18T15:30", "delivered"),
            delivery(3, "2026-10-17", "delivered"),
            delivery(4, "2026-12-01", "pending"),
            delivery(5, "2026-10-18T08:00", "pending"),
            delivery(6, "2026-09-01", "pending"),
            delivery(7, "2026-09-02", "missed"),
        ] {
            store.deliveries.insert(d.id, d);
        }
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        let stats = store.stats(today);

        assert_eq!(stats["completedToday"], 2);
        assert_eq!(stats["upcomingDeliveries"], 2);
        assert_eq!(stats["pendingDeliveries"], 3);
        assert_eq!(stats["missedDeliveries"], 1);
    }

    #[test]
    fn timestamps_are_sqlite_style() {
        let created = timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&created, "%Y-%m-%d %H:%M:%S").is_ok());
        assert_eq!(scheduled_day("2024-05-01T09:00"), "2024-05-01");
        assert_eq!(scheduled_day("soon"), "soon");
    }

    #[test]
    fn trimmed_drops_blank_values() {
        assert_eq!(trimmed(&Some("  ".to_string())), None);
        assert_eq!(trimmed(&Some(" 5mg ".to_string())), Some("5mg".to_string()));
        assert_eq!(trimmed(&None), None);
    }
}
