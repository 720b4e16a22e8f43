pub mod doi;

pub use doi::{doi_url, extract_doi_from_bibliographic};
