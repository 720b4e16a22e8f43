pub mod pipeline;

pub use pipeline::{EnrichmentEngine, EnrichmentSummary, RowOutcome, SkipReason};
