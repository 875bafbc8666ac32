//! Unit tests for variant grouping and per-stock-type roll-ups.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use pipestock_api::models::{Batch, StockEntry, StockStatus, StockType};
use pipestock_api::stock::{
    aggregate_by_stock_type, counts_in_pieces, group_by_variant, reportable_total, TotalUnit,
};

fn entry(stock_type: StockType) -> StockEntry {
    StockEntry {
        id: Uuid::new_v4(),
        stock_type,
        status: StockStatus::Available,
        quantity: None,
        length_per_unit: None,
        pieces_per_bundle: None,
        piece_length_meters: None,
        piece_count: None,
        total_available: None,
    }
}

fn full_roll(quantity: i32, length: Decimal) -> StockEntry {
    StockEntry {
        quantity: Some(quantity),
        length_per_unit: Some(length),
        ..entry(StockType::FullRoll)
    }
}

fn cut_roll(length: Decimal) -> StockEntry {
    StockEntry {
        total_available: Some(length),
        ..entry(StockType::CutRoll)
    }
}

fn bundle(quantity: i32, pieces_per_bundle: i32, piece_length: Decimal) -> StockEntry {
    StockEntry {
        quantity: Some(quantity),
        pieces_per_bundle: Some(pieces_per_bundle),
        piece_length_meters: Some(piece_length),
        ..entry(StockType::Bundle)
    }
}

fn spare(piece_length: Decimal, piece_count: Option<i32>) -> StockEntry {
    StockEntry {
        piece_length_meters: Some(piece_length),
        piece_count,
        ..entry(StockType::Spare)
    }
}

fn batch(
    code: &str,
    product_type: &str,
    brand: &str,
    params: &[(&str, &str)],
    stock_entries: Vec<StockEntry>,
) -> Batch {
    Batch {
        id: Uuid::new_v4(),
        batch_code: code.to_string(),
        batch_no: 1,
        production_date: NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date"),
        product_type_name: product_type.to_string(),
        brand_name: brand.to_string(),
        parameters: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        stock_entries,
    }
}

#[test]
fn parameter_insertion_order_does_not_split_groups() {
    // Same parameter contents inserted in opposite orders.
    let first = batch(
        "B-001",
        "HDPE Coil Pipe",
        "Acme",
        &[("OD", "32"), ("PN", "6")],
        vec![full_roll(2, dec!(100))],
    );
    let second = batch(
        "B-002",
        "HDPE Coil Pipe",
        "Acme",
        &[("PN", "6"), ("OD", "32")],
        vec![full_roll(1, dec!(100))],
    );

    let groups = group_by_variant(&[first, second]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].lines.len(), 3);
}

#[test]
fn grouping_is_partition_complete() {
    let batches = vec![
        batch(
            "B-001",
            "HDPE Coil Pipe",
            "Acme",
            &[("OD", "32")],
            vec![full_roll(2, dec!(100)), cut_roll(dec!(10))],
        ),
        batch(
            "B-002",
            "HDPE Coil Pipe",
            "Acme",
            &[("OD", "63")],
            vec![cut_roll(dec!(5))],
        ),
        batch(
            "B-003",
            "Sprinkler Pipe",
            "Rainflow",
            &[("OD", "32")],
            vec![bundle(3, 10, dec!(6)), spare(dec!(6), Some(4))],
        ),
    ];

    let input_ids: HashSet<Uuid> = batches
        .iter()
        .flat_map(|b| b.stock_entries.iter().map(|e| e.id))
        .collect();

    let groups = group_by_variant(&batches);
    let grouped_ids: HashSet<Uuid> = groups
        .iter()
        .flat_map(|g| g.lines.iter().map(|l| l.entry.id))
        .collect();
    let grouped_count: usize = groups.iter().map(|g| g.lines.len()).sum();

    assert_eq!(grouped_ids, input_ids);
    assert_eq!(grouped_count, input_ids.len());
}

#[test]
fn groups_appear_in_first_seen_order_with_batch_tags() {
    let batches = vec![
        batch(
            "B-010",
            "HDPE Coil Pipe",
            "Acme",
            &[("OD", "32")],
            vec![cut_roll(dec!(10))],
        ),
        batch(
            "B-011",
            "Sprinkler Pipe",
            "Rainflow",
            &[("OD", "25")],
            vec![spare(dec!(6), Some(2))],
        ),
        batch(
            "B-012",
            "HDPE Coil Pipe",
            "Acme",
            &[("OD", "32")],
            vec![cut_roll(dec!(5))],
        ),
    ];

    let groups = group_by_variant(&batches);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].product_type_name, "HDPE Coil Pipe");
    assert_eq!(groups[1].product_type_name, "Sprinkler Pipe");

    let codes: Vec<&str> = groups[0]
        .lines
        .iter()
        .map(|l| l.batch_code.as_str())
        .collect();
    assert_eq!(codes, vec!["B-010", "B-012"]);
}

#[test]
fn grouping_is_deterministic_across_calls() {
    let batches = vec![
        batch(
            "B-020",
            "HDPE Coil Pipe",
            "Acme",
            &[("OD", "32"), ("PN", "6"), ("PE", "10")],
            vec![full_roll(2, dec!(100)), cut_roll(dec!(10))],
        ),
        batch(
            "B-021",
            "Sprinkler Pipe",
            "Rainflow",
            &[("OD", "25")],
            vec![bundle(2, 25, dec!(6))],
        ),
    ];

    assert_eq!(group_by_variant(&batches), group_by_variant(&batches));
}

#[test]
fn empty_input_yields_empty_groups() {
    assert!(group_by_variant(&[]).is_empty());
}

#[test]
fn cut_rolls_group_by_length_sorted_descending() {
    let entries = vec![cut_roll(dec!(10)), cut_roll(dec!(10)), cut_roll(dec!(5))];
    let rollup = aggregate_by_stock_type(entries.iter());

    assert_eq!(rollup.cut_rolls.len(), 2);
    assert_eq!(rollup.cut_rolls[0].length, dec!(10));
    assert_eq!(rollup.cut_rolls[0].count, 2);
    assert_eq!(rollup.cut_rolls[0].total_meters, dec!(20));
    assert_eq!(rollup.cut_rolls[1].length, dec!(5));
    assert_eq!(rollup.cut_rolls[1].count, 1);
    assert_eq!(rollup.cut_rolls[1].total_meters, dec!(5));
    assert_eq!(rollup.total_meters, dec!(25));
}

#[test]
fn full_rolls_merge_on_length_and_derive_meters() {
    let entries = vec![
        full_roll(2, dec!(100)),
        full_roll(1, dec!(100)),
        full_roll(1, dec!(50)),
    ];
    let rollup = aggregate_by_stock_type(entries.iter());

    assert_eq!(rollup.full_rolls.len(), 2);
    // First-seen order, not sorted.
    assert_eq!(rollup.full_rolls[0].length_each, dec!(100));
    assert_eq!(rollup.full_rolls[0].count, 3);
    assert_eq!(rollup.full_rolls[0].total_meters, dec!(300));
    assert_eq!(rollup.full_rolls[1].length_each, dec!(50));
    assert_eq!(rollup.total_meters, dec!(350));
}

#[test]
fn full_roll_explicit_total_takes_precedence() {
    let mut short_delivery = full_roll(2, dec!(100));
    short_delivery.total_available = Some(dec!(180));

    let rollup = aggregate_by_stock_type([&short_delivery]);
    assert_eq!(rollup.full_rolls[0].total_meters, dec!(180));
}

#[test]
fn bundle_pieces_derive_from_quantity_when_count_missing() {
    let entries = vec![bundle(3, 10, dec!(6))];
    let rollup = aggregate_by_stock_type(entries.iter());

    assert_eq!(rollup.bundles.len(), 1);
    assert_eq!(rollup.bundles[0].bundle_count, 3);
    assert_eq!(rollup.bundles[0].total_pieces, 30);
    assert_eq!(rollup.total_pieces, 30);
}

#[test]
fn bundles_sort_by_length_then_pieces_per_bundle_descending() {
    let entries = vec![
        bundle(1, 10, dec!(3)),
        bundle(1, 25, dec!(6)),
        bundle(1, 10, dec!(6)),
    ];
    let rollup = aggregate_by_stock_type(entries.iter());

    let order: Vec<(Decimal, i64)> = rollup
        .bundles
        .iter()
        .map(|g| (g.piece_length_meters, g.pieces_per_bundle))
        .collect();
    assert_eq!(
        order,
        vec![(dec!(6), 25), (dec!(6), 10), (dec!(3), 10)]
    );
}

#[test]
fn spare_pieces_follow_fallback_chain() {
    // Explicit piece count wins.
    let explicit = spare(dec!(5), Some(7));

    // Without a count the available total stands in.
    let mut from_total = spare(dec!(4), None);
    from_total.total_available = Some(dec!(9));

    // Quantity is the last resort.
    let mut from_quantity = spare(dec!(3), None);
    from_quantity.quantity = Some(2);

    let rollup = aggregate_by_stock_type([&explicit, &from_total, &from_quantity]);
    let pieces: Vec<(Decimal, i64)> = rollup
        .spares
        .iter()
        .map(|g| (g.piece_length_meters, g.total_pieces))
        .collect();
    assert_eq!(pieces, vec![(dec!(5), 7), (dec!(4), 9), (dec!(3), 2)]);
    assert_eq!(rollup.total_pieces, 18);
}

#[test]
fn equal_lengths_with_different_scales_share_one_group() {
    let entries = vec![spare(dec!(6), Some(1)), spare(dec!(6.0), Some(2))];
    let rollup = aggregate_by_stock_type(entries.iter());

    assert_eq!(rollup.spares.len(), 1);
    assert_eq!(rollup.spares[0].total_pieces, 3);
}

#[test]
fn missing_numerics_degrade_to_zero_rather_than_failing() {
    let mut broken = entry(StockType::Spare);
    broken.piece_length_meters = None;

    let rollup = aggregate_by_stock_type([&broken]);
    assert_eq!(rollup.spares.len(), 1);
    assert_eq!(rollup.spares[0].piece_length_meters, Decimal::ZERO);
    assert_eq!(rollup.spares[0].total_pieces, 0);
}

#[test]
fn sprinkler_products_total_in_pieces_everything_else_in_meters() {
    assert!(counts_in_pieces("Sprinkler Pipe"));
    assert!(counts_in_pieces("MINI SPRINKLER"));
    assert!(!counts_in_pieces("HDPE Coil Pipe"));

    // Both meter and piece data on the same roll-up; the product type
    // decides which total is reportable.
    let entries = vec![full_roll(2, dec!(100)), bundle(3, 25, dec!(6))];
    let rollup = aggregate_by_stock_type(entries.iter());

    let (meters, meters_unit) = reportable_total("HDPE Coil Pipe", &rollup);
    assert_eq!((meters, meters_unit), (dec!(200), TotalUnit::Meters));

    let (pieces, pieces_unit) = reportable_total("Sprinkler Pipe", &rollup);
    assert_eq!((pieces, pieces_unit), (Decimal::from(75), TotalUnit::Pieces));
}
