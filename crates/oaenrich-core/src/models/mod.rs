pub mod row;

pub use row::{EnrichmentFields, LinkCell, RowKind, RowRecord, non_blank};
