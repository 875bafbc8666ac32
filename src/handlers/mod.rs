pub mod batches;
pub mod stock;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{BatchService, StockService};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub batches: Arc<BatchService>,
    pub stock: Arc<StockService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, debug_aggregation: bool) -> Self {
        let batches = Arc::new(BatchService::new(db_pool.clone(), event_sender.clone()));
        let stock = Arc::new(StockService::new(db_pool, event_sender, debug_aggregation));
        Self { batches, stock }
    }
}
