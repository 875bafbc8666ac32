//! Plain-text stock summary for pasting into a messaging deep-link.
//!
//! The formatter is pure: the report date is a parameter, no I/O
//! happens here, and URL-encoding for transport is the caller's
//! concern. Callers must reject an empty selection before invoking it.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{Parameters, StockLine};

use super::rollup::{aggregate_by_stock_type, reportable_total, StockRollUp, TotalUnit};
use super::variant::{regroup_lines, VariantGroup};

/// Parameter keys promoted to the front of variant labels, in order.
pub const PARAM_PRIORITY: [&str; 3] = ["OD", "PN", "PE"];

/// Parameters in display order: the priority keys first (when present),
/// then the remaining keys lexicographically.
pub fn ordered_parameters(params: &Parameters) -> Vec<(&str, &str)> {
    let mut ordered = Vec::with_capacity(params.len());
    for key in PARAM_PRIORITY {
        if let Some(value) = params.get(key) {
            ordered.push((key, value.as_str()));
        }
    }
    for (key, value) in params {
        if !PARAM_PRIORITY.contains(&key.as_str()) {
            ordered.push((key.as_str(), value.as_str()));
        }
    }
    ordered
}

/// Formats the selected stock lines into a line-oriented text block:
/// a dated header, one section per product type, one sub-block per
/// variant with its roll-up lines and a meters-or-pieces total.
pub fn format_share_message(lines: &[StockLine], date: NaiveDate) -> String {
    let mut out = String::new();
    out.push_str(&format!("Stock Summary - {}\n\n", date.format("%d/%m/%Y")));

    for (product_type_name, groups) in sections(lines) {
        out.push_str(&format!("*{}*\n", product_type_name));
        for group in &groups {
            out.push_str(&variant_label(group));
            out.push('\n');

            let rollup = aggregate_by_stock_type(group.lines.iter().map(|line| &line.entry));
            push_rollup_lines(&mut out, &rollup);

            let (total, unit) = reportable_total(&group.product_type_name, &rollup);
            match unit {
                TotalUnit::Meters => out.push_str(&format!("Total: {} m\n", total)),
                TotalUnit::Pieces => out.push_str(&format!("Total: {} pcs\n", total)),
            }
            out.push('\n');
        }
    }

    while out.ends_with('\n') {
        out.pop();
    }
    out.push('\n');
    out
}

/// Splits lines into per-product-type sections in first-seen order,
/// each section grouped by variant in first-seen order.
fn sections(lines: &[StockLine]) -> Vec<(String, Vec<VariantGroup>)> {
    let mut order: Vec<String> = Vec::new();
    let mut by_type: HashMap<String, Vec<StockLine>> = HashMap::new();

    for line in lines {
        if !by_type.contains_key(&line.product_type_name) {
            order.push(line.product_type_name.clone());
        }
        by_type
            .entry(line.product_type_name.clone())
            .or_default()
            .push(line.clone());
    }

    order
        .into_iter()
        .map(|product_type_name| {
            let section_lines = by_type.remove(&product_type_name).unwrap_or_default();
            (product_type_name, regroup_lines(section_lines))
        })
        .collect()
}

fn variant_label(group: &VariantGroup) -> String {
    let mut label = group.brand_name.clone();
    for (key, value) in ordered_parameters(&group.parameters) {
        label.push_str(&format!(" | {} {}", key, value));
    }
    label
}

fn push_rollup_lines(out: &mut String, rollup: &StockRollUp) {
    for group in &rollup.full_rolls {
        out.push_str(&format!(
            "Full Roll: {} x {} m = {} m\n",
            group.count, group.length_each, group.total_meters
        ));
    }
    for group in &rollup.cut_rolls {
        out.push_str(&format!(
            "Cut Roll: {} x {} m = {} m\n",
            group.count, group.length, group.total_meters
        ));
    }
    for group in &rollup.bundles {
        out.push_str(&format!(
            "Bundle: {} bdl x {} pcs @ {} m = {} pcs\n",
            group.bundle_count, group.pieces_per_bundle, group.piece_length_meters, group.total_pieces
        ));
    }
    for group in &rollup.spares {
        out.push_str(&format!(
            "Spare: {} pcs @ {} m\n",
            group.total_pieces, group.piece_length_meters
        ));
    }
}
