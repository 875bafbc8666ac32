//! Grouping of batches and stock lines by product variant.
//!
//! The grouping key is built from the parameter entries of an ordered
//! map, so two parameter sets with the same contents are one key no
//! matter what order a client inserted them in.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Batch, Parameters, StockLine};

/// Canonical identity of a product variant: product type, brand, and
/// the full parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub product_type_name: String,
    pub brand_name: String,
    pub parameters: Parameters,
}

impl VariantKey {
    pub fn new(
        product_type_name: impl Into<String>,
        brand_name: impl Into<String>,
        parameters: Parameters,
    ) -> Self {
        Self {
            product_type_name: product_type_name.into(),
            brand_name: brand_name.into(),
            parameters,
        }
    }

    pub fn of_batch(batch: &Batch) -> Self {
        Self::new(
            batch.product_type_name.clone(),
            batch.brand_name.clone(),
            batch.parameters.clone(),
        )
    }

    pub fn of_line(line: &StockLine) -> Self {
        Self::new(
            line.product_type_name.clone(),
            line.brand_name.clone(),
            line.parameters.clone(),
        )
    }
}

/// One variant's stock lines, in the order their batches appeared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantGroup {
    pub product_type_name: String,
    pub brand_name: String,
    pub parameters: Parameters,
    pub lines: Vec<StockLine>,
}

/// Groups batches by variant, flattening each batch's entries into its
/// group as lines tagged with the originating batch. Group order is
/// first-seen order of variant keys. Empty input yields an empty
/// vector; every input entry lands in exactly one group.
pub fn group_by_variant(batches: &[Batch]) -> Vec<VariantGroup> {
    let mut index: HashMap<VariantKey, usize> = HashMap::new();
    let mut groups: Vec<VariantGroup> = Vec::new();

    for batch in batches {
        let key = VariantKey::of_batch(batch);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push(VariantGroup {
                    product_type_name: batch.product_type_name.clone(),
                    brand_name: batch.brand_name.clone(),
                    parameters: batch.parameters.clone(),
                    lines: Vec::new(),
                });
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };

        for entry in &batch.stock_entries {
            groups[slot].lines.push(StockLine {
                batch_code: batch.batch_code.clone(),
                batch_no: batch.batch_no,
                product_type_name: batch.product_type_name.clone(),
                brand_name: batch.brand_name.clone(),
                parameters: batch.parameters.clone(),
                entry: entry.clone(),
            });
        }
    }

    groups
}

/// Re-groups already-flattened lines by variant, preserving first-seen
/// order. Used when a user-filtered selection needs to be grouped
/// again for display or reporting.
pub fn regroup_lines<I>(lines: I) -> Vec<VariantGroup>
where
    I: IntoIterator<Item = StockLine>,
{
    let mut index: HashMap<VariantKey, usize> = HashMap::new();
    let mut groups: Vec<VariantGroup> = Vec::new();

    for line in lines {
        let key = VariantKey::of_line(&line);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push(VariantGroup {
                    product_type_name: line.product_type_name.clone(),
                    brand_name: line.brand_name.clone(),
                    parameters: line.parameters.clone(),
                    lines: Vec::new(),
                });
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].lines.push(line);
    }

    groups
}
