//! Stateless HTTP request builder and response parser for the MedPal API.
//!
//! # Design
//! `MedPalClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint has a `build_*` method producing an `HttpRequest`;
//! every response goes through `parse_response`, which normalizes failures
//! into `ApiError` and decodes the body by status and content type. The
//! caller executes the round-trip, so the rules here stay deterministic.

use serde::Serialize;
use serde_json::Value;
use ureq::http::StatusCode;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Payload};
use crate::types::{
    DeliveryId, DrugId, DrugUpdate, InventoryAdjustment, NewDelivery, NewDrug, NewDrugBatch,
    NewDrugRemoval, NewPatient, PatientId, StatusUpdate,
};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Caller-supplied parts of a request. Headers override the defaults by
/// name, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn method(method: HttpMethod) -> Self {
        Self {
            method: Some(method),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.body = Some(body);
        Ok(self)
    }
}

/// Synchronous, stateless request builder for the MedPal API.
#[derive(Debug, Clone)]
pub struct MedPalClient {
    base_url: String,
}

impl MedPalClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is appended to the base.
    pub fn resolve(&self, path: &str) -> String {
        if has_scheme(path) {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Build a request with the default JSON content type merged under the
    /// caller's headers. The method defaults to GET.
    pub fn build(&self, path: &str, options: RequestOptions) -> HttpRequest {
        let mut headers = vec![("content-type".to_string(), JSON_CONTENT_TYPE.to_string())];
        for (name, value) in options.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }
        HttpRequest {
            method: options.method.unwrap_or(HttpMethod::Get),
            path: self.resolve(path),
            headers,
            body: options.body,
        }
    }

    fn get(&self, path: &str) -> HttpRequest {
        self.build(path, RequestOptions::default())
    }

    fn send_json<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &T,
    ) -> Result<HttpRequest, ApiError> {
        Ok(self.build(path, RequestOptions::method(method).json(body)?))
    }

    // --- reads ---

    pub fn build_list_patients(&self) -> HttpRequest {
        self.get("/patients")
    }

    pub fn build_list_drugs(&self) -> HttpRequest {
        self.get("/drugs")
    }

    pub fn build_list_deliveries(&self) -> HttpRequest {
        self.get("/deliveries")
    }

    pub fn build_patient_deliveries(&self, patient_id: PatientId) -> HttpRequest {
        self.get(&format!("/deliveries/patient/{patient_id}"))
    }

    pub fn build_stats(&self) -> HttpRequest {
        self.get("/stats")
    }

    pub fn build_inventory_summary(&self) -> HttpRequest {
        self.get("/inventory/summary")
    }

    pub fn build_inventory_transactions(&self, limit: Option<u32>) -> HttpRequest {
        match limit {
            Some(limit) => self.get(&format!("/inventory/transactions?limit={limit}")),
            None => self.get("/inventory/transactions"),
        }
    }

    pub fn build_list_drug_batches(&self, drug_id: Option<DrugId>, limit: Option<u32>) -> HttpRequest {
        self.get(&with_drug_filter("/drug_batches", drug_id, limit))
    }

    pub fn build_list_drug_removals(&self, drug_id: Option<DrugId>, limit: Option<u32>) -> HttpRequest {
        self.get(&with_drug_filter("/drug_removals", drug_id, limit))
    }

    pub fn build_health(&self) -> HttpRequest {
        self.get("/health")
    }

    pub fn build_ai_status(&self) -> HttpRequest {
        self.get("/ai/status")
    }

    // --- writes ---

    pub fn build_create_patient(&self, input: &NewPatient) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Post, "/patients", input)
    }

    pub fn build_create_drug(&self, input: &NewDrug) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Post, "/drugs", input)
    }

    pub fn build_update_drug(&self, id: DrugId, input: &DrugUpdate) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Patch, &format!("/drugs/{id}"), input)
    }

    pub fn build_delete_drug(&self, id: DrugId) -> HttpRequest {
        self.build(&format!("/drugs/{id}"), RequestOptions::method(HttpMethod::Delete))
    }

    pub fn build_create_delivery(&self, input: &NewDelivery) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Post, "/deliveries", input)
    }

    pub fn build_update_delivery_status(
        &self,
        id: DeliveryId,
        input: &StatusUpdate,
    ) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Patch, &format!("/deliveries/{id}/status"), input)
    }

    pub fn build_delete_delivery(&self, id: DeliveryId) -> HttpRequest {
        self.build(
            &format!("/deliveries/{id}"),
            RequestOptions::method(HttpMethod::Delete),
        )
    }

    pub fn build_adjust_inventory(&self, input: &InventoryAdjustment) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Post, "/inventory/adjust", input)
    }

    pub fn build_create_drug_batch(&self, input: &NewDrugBatch) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Post, "/drug_batches", input)
    }

    pub fn build_create_drug_removal(&self, input: &NewDrugRemoval) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Post, "/drug_removals", input)
    }

    pub fn build_ai_chat(&self, input: &Value) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Post, "/ai/chat", input)
    }

    pub fn build_ai_image(&self, input: &Value) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Post, "/ai/image", input)
    }

    pub fn build_ai_rewrite(&self, input: &Value) -> Result<HttpRequest, ApiError> {
        self.send_json(HttpMethod::Post, "/ai/rewrite", input)
    }
}

/// `path` with the optional `drug_id` and `limit` query parameters.
fn with_drug_filter(path: &str, drug_id: Option<DrugId>, limit: Option<u32>) -> String {
    let mut query = Vec::new();
    if let Some(drug_id) = drug_id {
        query.push(format!("drug_id={drug_id}"));
    }
    if let Some(limit) = limit {
        query.push(format!("limit={limit}"));
    }
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", query.join("&"))
    }
}

fn has_scheme(path: &str) -> bool {
    match path.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Decode a response, or normalize it into `ApiError::Http`.
///
/// - non-2xx → error with the server's message and the status;
/// - 204 → `Payload::Empty`, whatever the content type says;
/// - `application/json` content → parsed JSON;
/// - anything else → raw text.
pub fn parse_response(response: HttpResponse) -> Result<Payload, ApiError> {
    if !response.is_success() {
        return Err(http_error(&response));
    }
    if response.status == 204 {
        return Ok(Payload::Empty);
    }
    let is_json = response
        .content_type()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains(JSON_CONTENT_TYPE));
    if is_json {
        let value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        Ok(Payload::Json(value))
    } else {
        Ok(Payload::Text(response.body))
    }
}

/// Map a non-success response to `ApiError::Http`.
///
/// A JSON body yields its `detail` string, a non-string `detail` rendered as
/// JSON, or the whole document when there is no `detail`. A bare JSON string
/// is used as is. A body that does not parse yields the status reason phrase.
fn http_error(response: &HttpResponse) -> ApiError {
    let message = match serde_json::from_str::<Value>(&response.body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(detail) => detail.to_string(),
            None => Value::Object(map).to_string(),
        },
        Ok(Value::String(message)) => message,
        Ok(other) => other.to_string(),
        Err(_) => reason_phrase(response.status),
    };
    ApiError::Http {
        status: response.status,
        message,
    }
}

fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
