//! oaenrich science — Zenodo lookups, DOI extraction, IEEE author emails, row enrichment.

pub mod enrichment;
pub mod error;
pub mod http;
pub mod identifiers;
pub mod sources;

pub use enrichment::{EnrichmentEngine, EnrichmentSummary};
pub use error::{Result, ScienceError};
pub use sources::{EmailResolver, IeeeEmailResolver, RecordHit, RecordLookup, ZenodoSource};
