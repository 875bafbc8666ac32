use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{batch, stock_entry};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{
    parameters_from_json, Batch, Parameters, StockEntry, StockLine, StockStatus,
};
use crate::stock::{
    aggregate_by_stock_type, format_share_message, group_by_variant, reportable_total,
    StockRollUp, TotalUnit,
};

/// One variant group enriched with its roll-up and reportable total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockGroupView {
    pub product_type_name: String,
    pub brand_name: String,
    pub parameters: Parameters,
    pub lines: Vec<StockLine>,
    pub rollup: StockRollUp,
    pub total: Decimal,
    pub total_unit: TotalUnit,
}

/// Filters for the grouped inventory view.
#[derive(Debug, Clone, Default)]
pub struct StockFilter {
    pub product_type_name: Option<String>,
    pub brand_name: Option<String>,
    /// Defaults to available stock when unset.
    pub status: Option<StockStatus>,
}

/// Service for inventory views, stock movements, and the shareable
/// stock summary.
#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    debug_aggregation: bool,
}

impl StockService {
    /// Creates a new stock service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, debug_aggregation: bool) -> Self {
        Self {
            db_pool,
            event_sender,
            debug_aggregation,
        }
    }

    /// Builds the variant-grouped inventory view with per-group
    /// roll-ups. Grouping itself is pure; this method only loads the
    /// snapshot and applies the status filter.
    #[instrument(skip(self))]
    pub async fn grouped_stock(
        &self,
        filter: StockFilter,
    ) -> Result<Vec<StockGroupView>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = batch::Entity::find();
        if let Some(product_type) = &filter.product_type_name {
            query = query.filter(batch::Column::ProductTypeName.eq(product_type.clone()));
        }
        if let Some(brand) = &filter.brand_name {
            query = query.filter(batch::Column::BrandName.eq(brand.clone()));
        }
        let batch_models = query
            .order_by_asc(batch::Column::CreatedAt)
            .order_by_asc(batch::Column::BatchCode)
            .all(db)
            .await?;

        let status = filter.status.unwrap_or(StockStatus::Available);
        let batch_ids: Vec<Uuid> = batch_models.iter().map(|model| model.id).collect();
        let mut entries_by_batch: HashMap<Uuid, Vec<stock_entry::Model>> = HashMap::new();
        if !batch_ids.is_empty() {
            let entry_models = stock_entry::Entity::find()
                .filter(stock_entry::Column::BatchId.is_in(batch_ids))
                .filter(stock_entry::Column::Status.eq(status.to_string()))
                .all(db)
                .await?;
            for entry in entry_models {
                entries_by_batch
                    .entry(entry.batch_id)
                    .or_default()
                    .push(entry);
            }
        }

        let batches = batch_models
            .into_iter()
            .map(|model| {
                let entries = entries_by_batch.remove(&model.id).unwrap_or_default();
                Batch::from_models(model, entries)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let groups: Vec<StockGroupView> = group_by_variant(&batches)
            .into_iter()
            .map(|group| {
                let rollup = aggregate_by_stock_type(group.lines.iter().map(|line| &line.entry));
                let (total, total_unit) = reportable_total(&group.product_type_name, &rollup);
                StockGroupView {
                    product_type_name: group.product_type_name,
                    brand_name: group.brand_name,
                    parameters: group.parameters,
                    lines: group.lines,
                    rollup,
                    total,
                    total_unit,
                }
            })
            .collect();

        if self.debug_aggregation {
            let lines: usize = groups.iter().map(|group| group.lines.len()).sum();
            debug!(groups = groups.len(), lines, status = %status, "aggregated stock view");
        }

        Ok(groups)
    }

    /// Formats the shareable stock summary for the selected entries.
    /// An empty or dangling selection is rejected before any
    /// formatting happens.
    #[instrument(skip(self))]
    pub async fn share_message(&self, selected_ids: &[Uuid]) -> Result<String, ServiceError> {
        if selected_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "no stock entries selected".to_string(),
            ));
        }

        let lines = self.lines_for_entries(selected_ids).await?;
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "selected stock entries do not exist".to_string(),
            ));
        }

        Ok(format_share_message(&lines, Utc::now().date_naive()))
    }

    /// Marks available entries as dispatched.
    #[instrument(skip(self))]
    pub async fn dispatch(
        &self,
        entry_ids: &[Uuid],
        note: Option<String>,
    ) -> Result<u64, ServiceError> {
        let count = self
            .transition(entry_ids, StockStatus::Available, StockStatus::Dispatched)
            .await?;

        self.event_sender
            .send(Event::StockDispatched {
                entry_ids: entry_ids.to_vec(),
                note,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(count, "dispatched stock entries");
        Ok(count)
    }

    /// Returns dispatched entries to available stock.
    #[instrument(skip(self))]
    pub async fn return_stock(&self, entry_ids: &[Uuid]) -> Result<u64, ServiceError> {
        let count = self
            .transition(entry_ids, StockStatus::Dispatched, StockStatus::Available)
            .await?;

        self.event_sender
            .send(Event::StockReturned {
                entry_ids: entry_ids.to_vec(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(count, "returned stock entries");
        Ok(count)
    }

    /// Scraps available entries, removing them from sellable stock.
    #[instrument(skip(self))]
    pub async fn scrap(&self, entry_ids: &[Uuid], reason: String) -> Result<u64, ServiceError> {
        if reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "a scrap reason is required".to_string(),
            ));
        }

        let count = self
            .transition(entry_ids, StockStatus::Available, StockStatus::Scrapped)
            .await?;

        self.event_sender
            .send(Event::StockScrapped {
                entry_ids: entry_ids.to_vec(),
                reason,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(count, "scrapped stock entries");
        Ok(count)
    }

    /// Loads the selected entries as batch-tagged lines, in the order
    /// the client selected them. Unknown ids are skipped; duplicates
    /// collapse to one line.
    async fn lines_for_entries(&self, ids: &[Uuid]) -> Result<Vec<StockLine>, ServiceError> {
        let db = &*self.db_pool;

        let entry_models = stock_entry::Entity::find()
            .filter(stock_entry::Column::Id.is_in(ids.iter().copied()))
            .all(db)
            .await?;
        let batch_ids: HashSet<Uuid> = entry_models.iter().map(|model| model.batch_id).collect();
        let batch_models = batch::Entity::find()
            .filter(batch::Column::Id.is_in(batch_ids.iter().copied()))
            .all(db)
            .await?;
        let batches: HashMap<Uuid, batch::Model> = batch_models
            .into_iter()
            .map(|model| (model.id, model))
            .collect();
        let mut entries: HashMap<Uuid, stock_entry::Model> = entry_models
            .into_iter()
            .map(|model| (model.id, model))
            .collect();

        let mut lines = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(model) = entries.remove(id) else {
                continue;
            };
            let Some(owner) = batches.get(&model.batch_id) else {
                continue;
            };
            lines.push(StockLine {
                batch_code: owner.batch_code.clone(),
                batch_no: owner.batch_no,
                product_type_name: owner.product_type_name.clone(),
                brand_name: owner.brand_name.clone(),
                parameters: parameters_from_json(&owner.parameters),
                entry: StockEntry::try_from(model)?,
            });
        }

        Ok(lines)
    }

    /// Moves every entry from one status to another, refusing the whole
    /// request when any entry is missing or not in the expected state.
    async fn transition(
        &self,
        ids: &[Uuid],
        from: StockStatus,
        to: StockStatus,
    ) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "no stock entries selected".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let models = stock_entry::Entity::find()
            .filter(stock_entry::Column::Id.is_in(ids.iter().copied()))
            .all(db)
            .await?;

        let found: HashSet<Uuid> = models.iter().map(|model| model.id).collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Stock entries not found: {}",
                missing.join(", ")
            )));
        }

        let expected = from.to_string();
        let blocked: Vec<String> = models
            .iter()
            .filter(|model| model.status != expected)
            .map(|model| format!("{} is {}", model.id, model.status))
            .collect();
        if !blocked.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Entries not in status {}: {}",
                expected,
                blocked.join(", ")
            )));
        }

        let result = stock_entry::Entity::update_many()
            .col_expr(stock_entry::Column::Status, Expr::value(to.to_string()))
            .col_expr(
                stock_entry::Column::UpdatedAt,
                Expr::value(Utc::now().naive_utc()),
            )
            .filter(stock_entry::Column::Id.is_in(ids.iter().copied()))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }
}
