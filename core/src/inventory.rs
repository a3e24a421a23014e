//! Client-side inventory view: drugs overlaid with their stock summary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Drug, DrugId, InventorySummary};

/// A drug record combined with the summary figures reported for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryDrug {
    #[serde(flatten)]
    pub drug: Drug,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_supply: Option<f64>,
}

impl From<Drug> for InventoryDrug {
    fn from(drug: Drug) -> Self {
        Self {
            drug,
            pending_quantity: None,
            daily_avg: None,
            days_supply: None,
        }
    }
}

impl InventoryDrug {
    /// Below or at the reorder threshold.
    pub fn needs_reorder(&self) -> bool {
        match (self.drug.stock, self.drug.reorder_level) {
            (Some(stock), Some(level)) => stock <= level,
            _ => false,
        }
    }
}

/// Overlay each drug with the summary of the same id.
///
/// Summary fields win wherever the summary reports a value. Drugs without a
/// summary pass through unchanged, in their original order. `None` drugs
/// yield an empty list whatever the summary holds. Inputs are only read; every
/// call builds a fresh view.
pub fn merge_inventory(drugs: Option<&[Drug]>, summary: &[InventorySummary]) -> Vec<InventoryDrug> {
    let Some(drugs) = drugs else {
        return Vec::new();
    };
    let by_id: HashMap<DrugId, &InventorySummary> = summary.iter().map(|s| (s.id, s)).collect();

    drugs
        .iter()
        .map(|drug| {
            let mut merged = InventoryDrug::from(drug.clone());
            if let Some(s) = by_id.get(&drug.id) {
                overlay(&mut merged, s);
            }
            merged
        })
        .collect()
}

fn overlay(merged: &mut InventoryDrug, summary: &InventorySummary) {
    let drug = &mut merged.drug;
    if let Some(name) = &summary.name {
        drug.name = name.clone();
    }
    if summary.dosage.is_some() {
        drug.dosage = summary.dosage.clone();
    }
    if summary.frequency.is_some() {
        drug.frequency = summary.frequency.clone();
    }
    if summary.stock.is_some() {
        drug.stock = summary.stock;
    }
    if summary.reorder_level.is_some() {
        drug.reorder_level = summary.reorder_level;
    }
    if summary.pending_quantity.is_some() {
        merged.pending_quantity = summary.pending_quantity;
    }
    if summary.daily_avg.is_some() {
        merged.daily_avg = summary.daily_avg;
    }
    if summary.days_supply.is_some() {
        merged.days_supply = summary.days_supply;
    }
}
