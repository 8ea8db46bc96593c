//! Inventory model

use serde::{Deserialize, Serialize};

use super::AssetRecord;

/// Derived statistics; never stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventorySummary {
    pub total_assets: usize,
    pub unique_vendor_count: usize,
    pub unique_protocol_count: usize,
}

/// Merged result for one capture
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub assets: Vec<AssetRecord>,
    pub summary: InventorySummary,
}

/// `POST /upload` response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    pub total_assets: usize,
    pub total_vendors: usize,
    pub total_protocols: usize,
    pub assets: Vec<AssetRecord>,
}

impl From<Inventory> for InventoryResponse {
    fn from(inventory: Inventory) -> Self {
        Self {
            total_assets: inventory.summary.total_assets,
            total_vendors: inventory.summary.unique_vendor_count,
            total_protocols: inventory.summary.unique_protocol_count,
            assets: inventory.assets,
        }
    }
}
