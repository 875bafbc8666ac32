//! Per-stock-type roll-ups over the lines of one variant group or any
//! user-filtered subset.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{StockEntry, StockType};

/// Unit of a variant's reportable grand total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TotalUnit {
    Meters,
    Pieces,
}

/// Full rolls sharing one roll length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FullRollGroup {
    pub length_each: Decimal,
    pub count: i64,
    pub total_meters: Decimal,
}

/// Cut pieces sharing one cut length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CutRollGroup {
    pub length: Decimal,
    pub count: i64,
    pub total_meters: Decimal,
}

/// Bundles sharing piece length and pieces-per-bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BundleGroup {
    pub piece_length_meters: Decimal,
    pub pieces_per_bundle: i64,
    pub bundle_count: i64,
    pub total_pieces: i64,
}

/// Spare pieces sharing one piece length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SpareGroup {
    pub piece_length_meters: Decimal,
    pub total_pieces: i64,
}

/// Aggregated view of a set of stock entries, grouped per stock type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StockRollUp {
    /// First-seen order.
    pub full_rolls: Vec<FullRollGroup>,
    /// Sorted by length descending.
    pub cut_rolls: Vec<CutRollGroup>,
    /// Sorted by piece length descending, then pieces-per-bundle descending.
    pub bundles: Vec<BundleGroup>,
    /// Sorted by piece length descending.
    pub spares: Vec<SpareGroup>,
    pub total_meters: Decimal,
    pub total_pieces: i64,
}

/// Rolls up entries by stock type. Total over a single pass; missing or
/// malformed numerics count as zero so one bad entry degrades a total
/// instead of failing the computation.
pub fn aggregate_by_stock_type<'a, I>(entries: I) -> StockRollUp
where
    I: IntoIterator<Item = &'a StockEntry>,
{
    let mut full_index: HashMap<Decimal, usize> = HashMap::new();
    let mut full_rolls: Vec<FullRollGroup> = Vec::new();
    let mut cut_rolls: BTreeMap<Decimal, (i64, Decimal)> = BTreeMap::new();
    let mut bundles: BTreeMap<(Decimal, i64), (i64, i64)> = BTreeMap::new();
    let mut spares: BTreeMap<Decimal, i64> = BTreeMap::new();

    for entry in entries {
        match entry.stock_type {
            StockType::FullRoll => {
                let length = dec_or_zero(entry.length_per_unit);
                let count = qty(entry);
                let meters = entry
                    .total_available
                    .map(|d| d.normalize())
                    .unwrap_or_else(|| length * Decimal::from(count));
                match full_index.get(&length) {
                    Some(&slot) => {
                        full_rolls[slot].count += count;
                        full_rolls[slot].total_meters += meters;
                    }
                    None => {
                        full_index.insert(length, full_rolls.len());
                        full_rolls.push(FullRollGroup {
                            length_each: length,
                            count,
                            total_meters: meters,
                        });
                    }
                }
            }
            StockType::CutRoll => {
                // One entry is one physical cut piece; its length is the
                // available total.
                let length = dec_or_zero(entry.total_available);
                let slot = cut_rolls.entry(length).or_insert((0, Decimal::ZERO));
                slot.0 += 1;
                slot.1 += length;
            }
            StockType::Bundle => {
                let piece_length = dec_or_zero(entry.piece_length_meters);
                let per_bundle = entry.pieces_per_bundle.map(i64::from).unwrap_or(0);
                let count = qty(entry);
                let pieces = entry
                    .piece_count
                    .map(i64::from)
                    .unwrap_or(count * per_bundle);
                let slot = bundles.entry((piece_length, per_bundle)).or_insert((0, 0));
                slot.0 += count;
                slot.1 += pieces;
            }
            StockType::Spare => {
                let length = dec_or_zero(entry.piece_length_meters);
                *spares.entry(length).or_insert(0) += spare_pieces(entry);
            }
        }
    }

    let cut_rolls: Vec<CutRollGroup> = cut_rolls
        .into_iter()
        .rev()
        .map(|(length, (count, total_meters))| CutRollGroup {
            length,
            count,
            total_meters,
        })
        .collect();
    let bundles: Vec<BundleGroup> = bundles
        .into_iter()
        .rev()
        .map(
            |((piece_length_meters, pieces_per_bundle), (bundle_count, total_pieces))| {
                BundleGroup {
                    piece_length_meters,
                    pieces_per_bundle,
                    bundle_count,
                    total_pieces,
                }
            },
        )
        .collect();
    let spares: Vec<SpareGroup> = spares
        .into_iter()
        .rev()
        .map(|(piece_length_meters, total_pieces)| SpareGroup {
            piece_length_meters,
            total_pieces,
        })
        .collect();

    let total_meters = full_rolls
        .iter()
        .map(|g| g.total_meters)
        .chain(cut_rolls.iter().map(|g| g.total_meters))
        .sum();
    let total_pieces = bundles
        .iter()
        .map(|g| g.total_pieces)
        .chain(spares.iter().map(|g| g.total_pieces))
        .sum();

    StockRollUp {
        full_rolls,
        cut_rolls,
        bundles,
        spares,
        total_meters,
        total_pieces,
    }
}

/// Pieces represented by one spare entry: the explicit `piece_count`,
/// else the available total, else the entry quantity, else zero.
pub fn spare_pieces(entry: &StockEntry) -> i64 {
    if let Some(count) = entry.piece_count {
        return i64::from(count);
    }
    if let Some(total) = entry.total_available {
        return total.trunc().to_i64().unwrap_or(0);
    }
    entry.quantity.map(i64::from).unwrap_or(0)
}

/// Product types reporting their grand total in pieces rather than
/// meters. Fixed business rule: sprinkler pipe moves by the piece.
pub fn counts_in_pieces(product_type_name: &str) -> bool {
    product_type_name.to_lowercase().contains("sprinkler")
}

/// The reportable grand total for a variant: pieces for sprinkler
/// product types, meters for everything else.
pub fn reportable_total(product_type_name: &str, rollup: &StockRollUp) -> (Decimal, TotalUnit) {
    if counts_in_pieces(product_type_name) {
        (Decimal::from(rollup.total_pieces), TotalUnit::Pieces)
    } else {
        (rollup.total_meters, TotalUnit::Meters)
    }
}

fn qty(entry: &StockEntry) -> i64 {
    entry.quantity.map(i64::from).unwrap_or(0)
}

fn dec_or_zero(value: Option<Decimal>) -> Decimal {
    value.map(|d| d.normalize()).unwrap_or(Decimal::ZERO)
}
