//! Resource-scoped reads and writes over the query cache.
//!
//! # Design
//! `MedPal` owns the stateless `MedPalClient`, a `RequestExecutor` and the
//! shared `QueryCache`. Reads are cached under their `QueryKey`; the core
//! lists (patients, drugs, deliveries, inventory drugs) also go through the
//! retry wrapper, the aggregate and scoped reads do not. Writes are sent
//! exactly once and, only after the server accepted them, invalidate every
//! key listed by their `Mutation`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cache::{QueryCache, QueryKey};
use crate::client::MedPalClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::executor::RequestExecutor;
use crate::http::HttpRequest;
use crate::inventory::{merge_inventory, InventoryDrug};
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Created, Delivery, DeliveryId, DeliveryStatus, Drug, DrugBatch, DrugId, DrugRemoval,
    DrugUpdate, Health, InventoryAdjustment, InventorySummary, InventoryTransaction, NewDelivery,
    NewDrug, NewDrugBatch, NewDrugRemoval, NewPatient, Patient, PatientId, StatusUpdate,
};

/// Every write the API exposes, with the reads it can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    AddPatient,
    AddDrug,
    UpdateDrug,
    DeleteDrug,
    AddDelivery,
    UpdateDeliveryStatus,
    DeleteDelivery,
    AdjustInventory,
    AddDrugBatch,
    RemoveDrugStock,
}

impl Mutation {
    /// Cache keys (prefixes) to invalidate once the write succeeded.
    pub fn invalidates(&self) -> Vec<QueryKey> {
        match self {
            Mutation::AddPatient => vec![QueryKey::patients(), QueryKey::stats()],
            Mutation::AddDrug => vec![QueryKey::drugs(), QueryKey::inventory(), QueryKey::stats()],
            Mutation::UpdateDrug => vec![QueryKey::drugs(), QueryKey::inventory()],
            Mutation::DeleteDrug => vec![
                QueryKey::drugs(),
                QueryKey::inventory(),
                QueryKey::deliveries(),
                QueryKey::stats(),
            ],
            Mutation::AddDelivery
            | Mutation::UpdateDeliveryStatus
            | Mutation::DeleteDelivery => vec![QueryKey::deliveries(), QueryKey::stats()],
            Mutation::AdjustInventory => vec![
                QueryKey::inventory_drugs(),
                QueryKey::inventory_summary(),
                QueryKey::new(["inventory", "transactions"]),
                QueryKey::drugs(),
            ],
            Mutation::AddDrugBatch => vec![
                QueryKey::drug_batches_root(),
                QueryKey::inventory(),
                QueryKey::drugs(),
            ],
            Mutation::RemoveDrugStock => vec![
                QueryKey::drug_removals_root(),
                QueryKey::inventory(),
                QueryKey::drugs(),
            ],
        }
    }
}

/// Cache-aware handle on the MedPal API.
#[derive(Clone)]
pub struct MedPal {
    client: MedPalClient,
    executor: RequestExecutor,
    cache: Arc<QueryCache>,
    retry: RetryConfig,
}

impl std::fmt::Debug for MedPal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MedPal")
            .field("client", &self.client)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl MedPal {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            client: MedPalClient::new(&config.base_url),
            executor: RequestExecutor::new(transport, config.timeout),
            cache: Arc::new(QueryCache::new(config.stale_time)),
            retry: config.retry,
        }
    }

    /// Handle backed by a `ureq` transport.
    pub fn connect(config: &ClientConfig) -> Self {
        Self::new(config, Arc::new(UreqTransport::new(config.timeout)))
    }

    pub fn client(&self) -> &MedPalClient {
        &self.client
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    async fn send<V: DeserializeOwned>(&self, request: HttpRequest) -> Result<V, ApiError> {
        self.executor.execute(request).await?.into_json()
    }

    async fn read<V>(&self, key: QueryKey, request: HttpRequest) -> Result<V, ApiError>
    where
        V: Serialize + DeserializeOwned,
    {
        self.cache.fetch(key, move || self.send(request)).await
    }

    async fn read_with_retry<V>(&self, key: QueryKey, request: HttpRequest) -> Result<V, ApiError>
    where
        V: Serialize + DeserializeOwned,
    {
        let retry = &self.retry;
        let request = &request;
        self.cache
            .fetch(key, move || {
                retry_with_backoff(retry, move || self.send(request.clone()))
            })
            .await
    }

    async fn write<V: DeserializeOwned>(
        &self,
        mutation: Mutation,
        request: HttpRequest,
    ) -> Result<V, ApiError> {
        let payload = self.executor.execute(request).await?;
        for key in mutation.invalidates() {
            self.cache.invalidate(&key).await;
        }
        info!(?mutation, "write applied");
        payload.into_json()
    }

    // --- reads ---

    pub async fn patients(&self) -> Result<Vec<Patient>, ApiError> {
        self.read_with_retry(QueryKey::patients(), self.client.build_list_patients())
            .await
    }

    pub async fn drugs(&self) -> Result<Vec<Drug>, ApiError> {
        self.read_with_retry(QueryKey::drugs(), self.client.build_list_drugs())
            .await
    }

    pub async fn deliveries(&self) -> Result<Vec<Delivery>, ApiError> {
        self.read_with_retry(QueryKey::deliveries(), self.client.build_list_deliveries())
            .await
    }

    /// Drug list as seen by the inventory screens.
    pub async fn inventory_drugs(&self) -> Result<Vec<Drug>, ApiError> {
        self.read_with_retry(QueryKey::inventory_drugs(), self.client.build_list_drugs())
            .await
    }

    /// Aggregate counters. No stable schema, returned as JSON.
    pub async fn stats(&self) -> Result<Value, ApiError> {
        self.read(QueryKey::stats(), self.client.build_stats()).await
    }

    pub async fn inventory_summary(&self) -> Result<Vec<InventorySummary>, ApiError> {
        self.read(
            QueryKey::inventory_summary(),
            self.client.build_inventory_summary(),
        )
        .await
    }

    pub async fn inventory_transactions(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<InventoryTransaction>, ApiError> {
        self.read(
            QueryKey::inventory_transactions(limit),
            self.client.build_inventory_transactions(limit),
        )
        .await
    }

    /// Inventory drugs overlaid with their summary figures.
    pub async fn inventory_view(&self) -> Result<Vec<InventoryDrug>, ApiError> {
        let drugs = self.inventory_drugs().await?;
        let summary = self.inventory_summary().await?;
        Ok(merge_inventory(Some(drugs.as_slice()), &summary))
    }

    /// Delivery history of one patient. Without a patient the result is
    /// empty and no request is made.
    pub async fn patient_deliveries(
        &self,
        patient_id: Option<PatientId>,
    ) -> Result<Vec<Delivery>, ApiError> {
        let Some(patient_id) = patient_id else {
            return Ok(Vec::new());
        };
        self.read(
            QueryKey::patient_deliveries(patient_id),
            self.client.build_patient_deliveries(patient_id),
        )
        .await
    }

    pub async fn drug_batches(
        &self,
        drug_id: Option<DrugId>,
        limit: Option<u32>,
    ) -> Result<Vec<DrugBatch>, ApiError> {
        self.read(
            QueryKey::drug_batches(drug_id, limit),
            self.client.build_list_drug_batches(drug_id, limit),
        )
        .await
    }

    pub async fn drug_removals(
        &self,
        drug_id: Option<DrugId>,
        limit: Option<u32>,
    ) -> Result<Vec<DrugRemoval>, ApiError> {
        self.read(
            QueryKey::drug_removals(drug_id, limit),
            self.client.build_list_drug_removals(drug_id, limit),
        )
        .await
    }

    /// Liveness probe, never cached.
    pub async fn health(&self) -> Result<Health, ApiError> {
        self.send(self.client.build_health()).await
    }

    pub async fn ai_status(&self) -> Result<Value, ApiError> {
        self.send(self.client.build_ai_status()).await
    }

    // --- writes ---

    pub async fn add_patient(&self, input: &NewPatient) -> Result<Created<PatientId>, ApiError> {
        self.write(Mutation::AddPatient, self.client.build_create_patient(input)?)
            .await
    }

    pub async fn add_drug(&self, input: &NewDrug) -> Result<Created<DrugId>, ApiError> {
        self.write(Mutation::AddDrug, self.client.build_create_drug(input)?)
            .await
    }

    pub async fn update_drug(&self, id: DrugId, input: &DrugUpdate) -> Result<(), ApiError> {
        self.write::<Value>(Mutation::UpdateDrug, self.client.build_update_drug(id, input)?)
            .await
            .map(drop)
    }

    pub async fn delete_drug(&self, id: DrugId) -> Result<(), ApiError> {
        self.write::<Value>(Mutation::DeleteDrug, self.client.build_delete_drug(id))
            .await
            .map(drop)
    }

    pub async fn add_delivery(&self, input: &NewDelivery) -> Result<Created<DeliveryId>, ApiError> {
        self.write(Mutation::AddDelivery, self.client.build_create_delivery(input)?)
            .await
    }

    pub async fn update_delivery_status(
        &self,
        id: DeliveryId,
        status: DeliveryStatus,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .build_update_delivery_status(id, &StatusUpdate { status })?;
        self.write::<Value>(Mutation::UpdateDeliveryStatus, request)
            .await
            .map(drop)
    }

    pub async fn delete_delivery(&self, id: DeliveryId) -> Result<(), ApiError> {
        self.write::<Value>(Mutation::DeleteDelivery, self.client.build_delete_delivery(id))
            .await
            .map(drop)
    }

    pub async fn adjust_inventory(&self, input: &InventoryAdjustment) -> Result<(), ApiError> {
        self.write::<Value>(
            Mutation::AdjustInventory,
            self.client.build_adjust_inventory(input)?,
        )
        .await
        .map(drop)
    }

    pub async fn add_drug_batch(&self, input: &NewDrugBatch) -> Result<(), ApiError> {
        self.write::<Value>(
            Mutation::AddDrugBatch,
            self.client.build_create_drug_batch(input)?,
        )
        .await
        .map(drop)
    }

    pub async fn remove_drug_stock(&self, input: &NewDrugRemoval) -> Result<(), ApiError> {
        self.write::<Value>(
            Mutation::RemoveDrugStock,
            self.client.build_create_drug_removal(input)?,
        )
        .await
        .map(drop)
    }

    // --- AI assist: opaque JSON, no cache interaction ---

    pub async fn ai_chat(&self, input: &Value) -> Result<Value, ApiError> {
        self.send(self.client.build_ai_chat(input)?).await
    }

    pub async fn ai_image(&self, input: &Value) -> Result<Value, ApiError> {
        self.send(self.client.build_ai_image(input)?).await
    }

    pub async fn ai_rewrite(&self, input: &Value) -> Result<Value, ApiError> {
        self.send(self.client.build_ai_rewrite(input)?).await
    }
}
