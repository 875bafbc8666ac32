//! Pure stock aggregation: variant grouping, per-type roll-ups, the
//! shareable plain-text summary, and selection state.
//!
//! Everything in this module is synchronous and side-effect free over
//! in-memory domain values; the service layer owns I/O and status
//! filtering.

pub mod report;
pub mod rollup;
pub mod selection;
pub mod variant;

pub use report::{format_share_message, ordered_parameters, PARAM_PRIORITY};
pub use rollup::{
    aggregate_by_stock_type, counts_in_pieces, reportable_total, BundleGroup, CutRollGroup,
    FullRollGroup, SpareGroup, StockRollUp, TotalUnit,
};
pub use selection::{SelectionSet, SelectionState};
pub use variant::{group_by_variant, regroup_lines, VariantGroup, VariantKey};
