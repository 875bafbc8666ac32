//! Domain model for production batches and their stock entries.
//!
//! All numeric fields cross into this module through a single
//! normalization boundary (`normalize_decimal` / `lenient_decimal`), so
//! `"6"`, `"6.0"`, and `6.00` are one value and one grouping key
//! everywhere downstream.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{batch, stock_entry};
use crate::errors::ServiceError;

/// Open key-value parameter set of a product variant, e.g.
/// `{OD: "32", PN: "6", PE: "10"}`. Stored as an ordered map so the
/// serialized form never depends on client key insertion order.
pub type Parameters = BTreeMap<String, String>;

/// Physical form of a stock entry. Fixed at creation; no update path
/// changes it afterwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockType {
    FullRoll,
    CutRoll,
    Bundle,
    Spare,
}

/// Lifecycle status of a stock entry in the warehouse.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Available,
    Dispatched,
    Scrapped,
}

/// One unit of physical inventory within a batch.
///
/// Exactly the fields relevant to `stock_type` are populated; the rest
/// stay `None`. `BatchService` enforces this at entry time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: Uuid,
    pub stock_type: StockType,
    pub status: StockStatus,
    pub quantity: Option<i32>,
    pub length_per_unit: Option<Decimal>,
    pub pieces_per_bundle: Option<i32>,
    pub piece_length_meters: Option<Decimal>,
    pub piece_count: Option<i32>,
    /// Derived available quantity: meters for rolls, pieces for spares.
    pub total_available: Option<Decimal>,
}

/// A production run and the stock entries it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub batch_code: String,
    pub batch_no: i32,
    pub production_date: NaiveDate,
    pub product_type_name: String,
    pub brand_name: String,
    pub parameters: Parameters,
    pub stock_entries: Vec<StockEntry>,
}

/// A stock entry tagged with its originating batch and variant, as
/// produced by flattening batches during grouping. Carries everything
/// the report formatter needs to re-group a filtered selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockLine {
    pub batch_code: String,
    pub batch_no: i32,
    pub product_type_name: String,
    pub brand_name: String,
    pub parameters: Parameters,
    pub entry: StockEntry,
}

/// Input for creating a stock entry alongside its batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewStockEntry {
    pub stock_type: StockType,
    pub quantity: Option<i32>,
    pub length_per_unit: Option<Decimal>,
    pub pieces_per_bundle: Option<i32>,
    pub piece_length_meters: Option<Decimal>,
    pub piece_count: Option<i32>,
    pub total_available: Option<Decimal>,
}

impl NewStockEntry {
    /// Applies the shared numeric normalization to every decimal field.
    pub fn normalized(self) -> Self {
        Self {
            length_per_unit: normalize_decimal(self.length_per_unit),
            piece_length_meters: normalize_decimal(self.piece_length_meters),
            total_available: normalize_decimal(self.total_available),
            ..self
        }
    }
}

/// Input for creating a batch with its stock entries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBatch {
    pub batch_code: String,
    pub batch_no: i32,
    pub production_date: NaiveDate,
    pub product_type_name: String,
    pub brand_name: String,
    pub parameters: Parameters,
    pub stock_entries: Vec<NewStockEntry>,
}

/// Partial update of batch header fields. Stock entries are not
/// updatable through this path.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BatchPatch {
    pub batch_code: Option<String>,
    pub batch_no: Option<i32>,
    pub production_date: Option<NaiveDate>,
    pub product_type_name: Option<String>,
    pub brand_name: Option<String>,
    pub parameters: Option<Parameters>,
}

impl BatchPatch {
    pub fn is_empty(&self) -> bool {
        self.batch_code.is_none()
            && self.batch_no.is_none()
            && self.production_date.is_none()
            && self.product_type_name.is_none()
            && self.brand_name.is_none()
            && self.parameters.is_none()
    }
}

/// Filters for listing batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchFilter {
    pub product_type_name: Option<String>,
    pub brand_name: Option<String>,
    pub produced_from: Option<NaiveDate>,
    pub produced_to: Option<NaiveDate>,
}

/// Normalizes an optional decimal at the ingestion boundary: trailing
/// zeros are stripped so equal values always compare and hash equal.
pub fn normalize_decimal(value: Option<Decimal>) -> Option<Decimal> {
    value.map(|d| d.normalize())
}

/// Deserializes a decimal that may arrive as a JSON number, a numeric
/// string, or be missing entirely. Malformed values degrade to `None`
/// instead of failing the request.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(decimal_from_value))
}

fn decimal_from_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        serde_json::Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
    .map(|d| d.normalize())
}

/// Converts a stored JSON parameter object into the canonical ordered
/// map. Scalar values are coerced to strings; nulls are skipped.
pub fn parameters_from_json(value: &serde_json::Value) -> Parameters {
    let mut params = Parameters::new();
    if let serde_json::Value::Object(map) = value {
        for (key, val) in map {
            let text = match val {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            params.insert(key.clone(), text);
        }
    }
    params
}

pub fn parameters_to_json(params: &Parameters) -> serde_json::Value {
    serde_json::to_value(params).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
}

impl TryFrom<stock_entry::Model> for StockEntry {
    type Error = ServiceError;

    fn try_from(model: stock_entry::Model) -> Result<Self, Self::Error> {
        let stock_type = model.stock_type.parse::<StockType>().map_err(|_| {
            ServiceError::InternalError(format!(
                "unknown stock type '{}' on entry {}",
                model.stock_type, model.id
            ))
        })?;
        let status = model.status.parse::<StockStatus>().map_err(|_| {
            ServiceError::InternalError(format!(
                "unknown stock status '{}' on entry {}",
                model.status, model.id
            ))
        })?;

        Ok(Self {
            id: model.id,
            stock_type,
            status,
            quantity: model.quantity,
            length_per_unit: normalize_decimal(model.length_per_unit),
            pieces_per_bundle: model.pieces_per_bundle,
            piece_length_meters: normalize_decimal(model.piece_length_meters),
            piece_count: model.piece_count,
            total_available: normalize_decimal(model.total_available),
        })
    }
}

impl Batch {
    /// Assembles a domain batch from its database rows.
    pub fn from_models(
        batch: batch::Model,
        entries: Vec<stock_entry::Model>,
    ) -> Result<Self, ServiceError> {
        let stock_entries = entries
            .into_iter()
            .map(StockEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: batch.id,
            batch_code: batch.batch_code,
            batch_no: batch.batch_no,
            production_date: batch.production_date,
            product_type_name: batch.product_type_name,
            brand_name: batch.brand_name,
            parameters: parameters_from_json(&batch.parameters),
            stock_entries,
        })
    }
}
