use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{batch, stock_entry};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{
    parameters_to_json, Batch, BatchFilter, BatchPatch, NewBatch, NewStockEntry, StockStatus,
    StockType,
};

/// Service for managing production batches and their stock entries.
#[derive(Clone)]
pub struct BatchService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl BatchService {
    /// Creates a new batch service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a batch with its stock entries in one transaction.
    ///
    /// Each entry must populate exactly the fields its stock type uses;
    /// the available total is derived when the client omits it.
    #[instrument(skip(self, input), fields(batch_code = %input.batch_code))]
    pub async fn create_batch(&self, input: NewBatch) -> Result<Batch, ServiceError> {
        validate_new_batch(&input)?;

        let db = &*self.db_pool;
        let existing = batch::Entity::find()
            .filter(batch::Column::BatchCode.eq(input.batch_code.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidOperation(format!(
                "Batch code '{}' already exists",
                input.batch_code
            )));
        }

        let now = Utc::now().naive_utc();
        let batch_id = Uuid::new_v4();

        let entries: Vec<stock_entry::ActiveModel> = input
            .stock_entries
            .into_iter()
            .map(|entry| entry_active_model(batch_id, entry.normalized(), now))
            .collect();

        let batch_model = batch::ActiveModel {
            id: Set(batch_id),
            batch_code: Set(input.batch_code),
            batch_no: Set(input.batch_no),
            production_date: Set(input.production_date),
            product_type_name: Set(input.product_type_name),
            brand_name: Set(input.brand_name),
            parameters: Set(parameters_to_json(&input.parameters)),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let txn = db.begin().await?;
        batch_model.insert(&txn).await?;
        if !entries.is_empty() {
            stock_entry::Entity::insert_many(entries).exec(&txn).await?;
        }
        txn.commit().await?;

        self.event_sender
            .send(Event::BatchCreated(batch_id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(batch_id = %batch_id, "created production batch");
        self.get_batch(&batch_id).await
    }

    /// Lists batches with their entries, newest production runs first.
    #[instrument(skip(self))]
    pub async fn list_batches(
        &self,
        page: u64,
        limit: u64,
        filter: BatchFilter,
    ) -> Result<(Vec<Batch>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = batch::Entity::find();
        if let Some(product_type) = &filter.product_type_name {
            query = query.filter(batch::Column::ProductTypeName.eq(product_type.clone()));
        }
        if let Some(brand) = &filter.brand_name {
            query = query.filter(batch::Column::BrandName.eq(brand.clone()));
        }
        if let Some(from) = filter.produced_from {
            query = query.filter(batch::Column::ProductionDate.gte(from));
        }
        if let Some(to) = filter.produced_to {
            query = query.filter(batch::Column::ProductionDate.lte(to));
        }

        let paginator = query
            .order_by_desc(batch::Column::ProductionDate)
            .order_by_desc(batch::Column::BatchNo)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let batch_models = paginator.fetch_page(page.saturating_sub(1)).await?;

        let batches = self.attach_entries(batch_models).await?;
        Ok((batches, total))
    }

    /// Gets a batch with its stock entries.
    #[instrument(skip(self))]
    pub async fn get_batch(&self, batch_id: &Uuid) -> Result<Batch, ServiceError> {
        let db = &*self.db_pool;

        let model = batch::Entity::find_by_id(*batch_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;
        let entries = stock_entry::Entity::find()
            .filter(stock_entry::Column::BatchId.eq(*batch_id))
            .all(db)
            .await?;

        Batch::from_models(model, entries)
    }

    /// Applies a partial update to batch header fields. Stock entries
    /// are not touched through this path.
    #[instrument(skip(self, patch))]
    pub async fn update_batch(
        &self,
        batch_id: &Uuid,
        patch: BatchPatch,
    ) -> Result<Batch, ServiceError> {
        if patch.is_empty() {
            return Err(ServiceError::ValidationError(
                "no fields to update".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let model = batch::Entity::find_by_id(*batch_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;

        if let Some(code) = &patch.batch_code {
            if code != &model.batch_code {
                let clash = batch::Entity::find()
                    .filter(batch::Column::BatchCode.eq(code.clone()))
                    .one(db)
                    .await?;
                if clash.is_some() {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Batch code '{}' already exists",
                        code
                    )));
                }
            }
        }

        let mut active: batch::ActiveModel = model.into();
        if let Some(code) = patch.batch_code {
            active.batch_code = Set(code);
        }
        if let Some(no) = patch.batch_no {
            active.batch_no = Set(no);
        }
        if let Some(date) = patch.production_date {
            active.production_date = Set(date);
        }
        if let Some(product_type) = patch.product_type_name {
            active.product_type_name = Set(product_type);
        }
        if let Some(brand) = patch.brand_name {
            active.brand_name = Set(brand);
        }
        if let Some(parameters) = patch.parameters {
            active.parameters = Set(parameters_to_json(&parameters));
        }
        active.updated_at = Set(Some(Utc::now().naive_utc()));

        let updated = active.update(db).await?;

        self.event_sender
            .send(Event::BatchUpdated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        self.get_batch(&updated.id).await
    }

    /// Deletes a batch and every stock entry it owns.
    #[instrument(skip(self))]
    pub async fn delete_batch(&self, batch_id: &Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        batch::Entity::find_by_id(*batch_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;

        let txn = db.begin().await?;
        stock_entry::Entity::delete_many()
            .filter(stock_entry::Column::BatchId.eq(*batch_id))
            .exec(&txn)
            .await?;
        batch::Entity::delete_by_id(*batch_id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send(Event::BatchDeleted(*batch_id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(batch_id = %batch_id, "deleted production batch");
        Ok(())
    }

    async fn attach_entries(
        &self,
        batch_models: Vec<batch::Model>,
    ) -> Result<Vec<Batch>, ServiceError> {
        let db = &*self.db_pool;

        let ids: Vec<Uuid> = batch_models.iter().map(|model| model.id).collect();
        let mut entries_by_batch: HashMap<Uuid, Vec<stock_entry::Model>> = HashMap::new();
        if !ids.is_empty() {
            let entry_models = stock_entry::Entity::find()
                .filter(stock_entry::Column::BatchId.is_in(ids))
                .all(db)
                .await?;
            for entry in entry_models {
                entries_by_batch
                    .entry(entry.batch_id)
                    .or_default()
                    .push(entry);
            }
        }

        batch_models
            .into_iter()
            .map(|model| {
                let entries = entries_by_batch.remove(&model.id).unwrap_or_default();
                Batch::from_models(model, entries)
            })
            .collect()
    }
}

fn validate_new_batch(input: &NewBatch) -> Result<(), ServiceError> {
    if input.stock_entries.is_empty() {
        return Err(ServiceError::ValidationError(
            "at least one stock entry is required".to_string(),
        ));
    }

    let mut problems = Vec::new();
    for (idx, entry) in input.stock_entries.iter().enumerate() {
        for problem in entry_problems(entry) {
            problems.push(format!("stock_entries[{}]: {}", idx, problem));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(problems.join("; ")))
    }
}

/// Checks that exactly the fields relevant to the entry's stock type
/// are populated, and that required ones are positive.
fn entry_problems(entry: &NewStockEntry) -> Vec<String> {
    let mut problems = Vec::new();
    let positive = |value: Option<Decimal>| value.map(|d| d > Decimal::ZERO).unwrap_or(false);

    match entry.stock_type {
        StockType::FullRoll => {
            if entry.quantity.unwrap_or(0) <= 0 {
                problems.push("quantity must be a positive roll count".to_string());
            }
            if !positive(entry.length_per_unit) {
                problems.push("length_per_unit is required and must be positive".to_string());
            }
            forbid(&mut problems, "pieces_per_bundle", entry.pieces_per_bundle.is_some());
            forbid(
                &mut problems,
                "piece_length_meters",
                entry.piece_length_meters.is_some(),
            );
            forbid(&mut problems, "piece_count", entry.piece_count.is_some());
        }
        StockType::CutRoll => {
            if !positive(entry.total_available) {
                problems.push("total_available must carry the positive cut length".to_string());
            }
            forbid(&mut problems, "quantity", entry.quantity.is_some());
            forbid(&mut problems, "length_per_unit", entry.length_per_unit.is_some());
            forbid(&mut problems, "pieces_per_bundle", entry.pieces_per_bundle.is_some());
            forbid(
                &mut problems,
                "piece_length_meters",
                entry.piece_length_meters.is_some(),
            );
            forbid(&mut problems, "piece_count", entry.piece_count.is_some());
        }
        StockType::Bundle => {
            if entry.quantity.unwrap_or(0) <= 0 {
                problems.push("quantity must be a positive bundle count".to_string());
            }
            if entry.pieces_per_bundle.unwrap_or(0) <= 0 {
                problems.push("pieces_per_bundle is required and must be positive".to_string());
            }
            if !positive(entry.piece_length_meters) {
                problems.push("piece_length_meters is required and must be positive".to_string());
            }
            if entry.piece_count.map(|count| count < 0).unwrap_or(false) {
                problems.push("piece_count cannot be negative".to_string());
            }
            forbid(&mut problems, "length_per_unit", entry.length_per_unit.is_some());
        }
        StockType::Spare => {
            if !positive(entry.piece_length_meters) {
                problems.push("piece_length_meters is required and must be positive".to_string());
            }
            if entry.piece_count.map(|count| count < 0).unwrap_or(false) {
                problems.push("piece_count cannot be negative".to_string());
            }
            forbid(&mut problems, "length_per_unit", entry.length_per_unit.is_some());
            forbid(&mut problems, "pieces_per_bundle", entry.pieces_per_bundle.is_some());
        }
    }

    problems
}

fn forbid(problems: &mut Vec<String>, field: &str, present: bool) {
    if present {
        problems.push(format!("{} does not apply to this stock type", field));
    }
}

fn entry_active_model(
    batch_id: Uuid,
    entry: NewStockEntry,
    now: NaiveDateTime,
) -> stock_entry::ActiveModel {
    let total_available = derived_total_available(&entry);

    stock_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        batch_id: Set(batch_id),
        stock_type: Set(entry.stock_type.to_string()),
        status: Set(StockStatus::Available.to_string()),
        quantity: Set(entry.quantity),
        length_per_unit: Set(entry.length_per_unit),
        pieces_per_bundle: Set(entry.pieces_per_bundle),
        piece_length_meters: Set(entry.piece_length_meters),
        piece_count: Set(entry.piece_count),
        total_available: Set(total_available),
        created_at: Set(now),
        updated_at: Set(None),
    }
}

/// Derives the available total when the client omits it: meters for
/// full rolls, pieces for bundles and spares.
fn derived_total_available(entry: &NewStockEntry) -> Option<Decimal> {
    if entry.total_available.is_some() {
        return entry.total_available;
    }

    match entry.stock_type {
        StockType::FullRoll => {
            let quantity = entry.quantity.unwrap_or(0);
            entry
                .length_per_unit
                .map(|length| (length * Decimal::from(quantity)).normalize())
        }
        StockType::Bundle => {
            let pieces = entry.piece_count.map(i64::from).unwrap_or_else(|| {
                i64::from(entry.quantity.unwrap_or(0))
                    * i64::from(entry.pieces_per_bundle.unwrap_or(0))
            });
            Some(Decimal::from(pieces))
        }
        StockType::Spare => entry.piece_count.map(Decimal::from),
        // Validation requires the cut length to arrive explicitly.
        StockType::CutRoll => None,
    }
}
