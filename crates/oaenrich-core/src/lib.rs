//! oaenrich core — configuration, workbook access, pending-paper report.

pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod workbook;

pub use config::EnrichConfig;
pub use error::{CoreError, Result};
pub use models::*;

pub use report::{AuthorGroup, PendingDigest, PendingPaper};
pub use workbook::{HeaderMap, SheetLayout, Workbook};
