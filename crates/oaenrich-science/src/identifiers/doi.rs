use once_cell::sync::Lazy;
use regex::Regex;

/// `DOI`, optional whitespace, a colon, optional whitespace, then the token itself.
static BIBLIOGRAPHIC_DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"DOI\s*:\s*(\S+)").expect("valid regex"));

const DOI_RESOLVER: &str = "https://doi.org/";

/// Pulls the DOI out of a free-text citation such as
/// `"IEEE TAC, vol. 65, DOI: 10.1109/TAC.2020.1234"`.
///
/// Only the first case-sensitive `DOI:` marker is considered.
pub fn extract_doi_from_bibliographic(text: &str) -> Option<String> {
    let token = BIBLIOGRAPHIC_DOI_RE.captures(text)?.get(1)?.as_str();
    let doi: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    if doi.is_empty() { None } else { Some(doi) }
}

/// Resolver link for a DOI, or for any identifier standing in for one.
pub fn doi_url(doi: &str) -> String {
    format!("{DOI_RESOLVER}{doi}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_doi_after_marker() {
        let text = "M. Louca et al., IEEE Trans. Autom. Control, 2020, DOI: 10.1109/TAC.2020.1234 (early access)";
        assert_eq!(
            extract_doi_from_bibliographic(text).as_deref(),
            Some("10.1109/TAC.2020.1234")
        );
    }

    #[test]
    fn marker_without_spaces() {
        assert_eq!(
            extract_doi_from_bibliographic("DOI:10.5281/zenodo.999").as_deref(),
            Some("10.5281/zenodo.999")
        );
    }

    #[test]
    fn no_marker_yields_nothing() {
        assert_eq!(extract_doi_from_bibliographic("IEEE CDC 2023, pp. 1-6"), None);
        assert_eq!(extract_doi_from_bibliographic(""), None);
    }

    #[test]
    fn marker_is_case_sensitive() {
        assert_eq!(extract_doi_from_bibliographic("doi: 10.1000/xyz"), None);
    }

    #[test]
    fn separating_space_is_not_kept() {
        let doi = extract_doi_from_bibliographic("DOI : 10.1234/ x").unwrap();
        assert!(doi.starts_with("10.1234/"));
        assert!(!doi.contains(char::is_whitespace));
    }

    #[test]
    fn first_marker_wins() {
        let text = "DOI: 10.1/first; preprint DOI: 10.2/second";
        assert_eq!(
            extract_doi_from_bibliographic(text).as_deref(),
            Some("10.1/first;")
        );
    }

    #[test]
    fn resolver_url() {
        assert_eq!(doi_url("10.5281/zenodo.999"), "https://doi.org/10.5281/zenodo.999");
        assert_eq!(doi_url("555"), "https://doi.org/555");
    }
}
