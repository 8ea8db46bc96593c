//! Asset aggregation

use std::collections::BTreeSet;

use super::coordinator::{ExtractionOutcome, ExtractionResult};
use crate::models::{Inventory, InventorySummary};

/// Merge settled extraction results into one inventory.
///
/// Records keep extractor order, then per-extractor order. No deduplication by
/// address: one device speaking two protocols is two records. Failed
/// extractors contribute nothing.
pub fn aggregate(results: Vec<ExtractionResult>) -> Inventory {
    let mut assets = Vec::new();
    let mut protocols = BTreeSet::new();

    for result in results {
        if let ExtractionOutcome::Succeeded {
            assets: found,
            protocols: seen,
            ..
        } = result.outcome
        {
            assets.extend(found);
            protocols.extend(seen);
        }
    }

    // Absent vendors share one "unknown" group
    let unique_vendor_count = assets
        .iter()
        .map(|a| a.vendor.as_deref())
        .collect::<BTreeSet<_>>()
        .len();

    let summary = InventorySummary {
        total_assets: assets.len(),
        unique_vendor_count,
        unique_protocol_count: protocols.len(),
    };

    Inventory { assets, summary }
}
