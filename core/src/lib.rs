//! Async API access layer for the MedPal patient/drug/delivery service.
//!
//! # Overview
//! Builds requests, executes them under a timeout, normalizes failures and
//! decodes bodies; reads are cached and writes invalidate the cached reads
//! they affect.
//!
//! # Design
//! - `MedPalClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_response` turns an `HttpResponse` into a `Payload` or `ApiError`.
//! - `RequestExecutor` runs requests through a `Transport` with a
//!   cancellation timer; `UreqTransport` is the network implementation.
//! - `retry_with_backoff` masks transient read failures with linear backoff.
//! - `MedPal` binds resources to `QueryKey`s in a shared `QueryCache`; each
//!   `Mutation` lists the keys it invalidates.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod global;
pub mod http;
pub mod inventory;
pub mod resources;
pub mod retry;
pub mod transport;
pub mod types;

pub use cache::{QueryCache, QueryKey};
pub use client::{parse_response, MedPalClient, RequestOptions};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError};
pub use executor::RequestExecutor;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Payload};
pub use inventory::{merge_inventory, InventoryDrug};
pub use resources::{MedPal, Mutation};
pub use retry::{retry_with_backoff, RetryConfig};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Created, Delivery, DeliveryId, DeliveryStatus, Drug, DrugBatch, DrugId, DrugRemoval,
    DrugUpdate, Health, InventoryAdjustment, InventorySummary, InventoryTransaction, NewDelivery,
    NewDrug, NewDrugBatch, NewDrugRemoval, NewPatient, Patient, PatientId, StatusUpdate,
};
