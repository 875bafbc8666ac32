pub mod batches;
pub mod stock;

pub use batches::BatchService;
pub use stock::{StockFilter, StockGroupView, StockService};
