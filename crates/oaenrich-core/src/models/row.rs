use serde::{Deserialize, Serialize};

/// How a row is treated, judged from its `NO.` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Numbered publication entry.
    Entry,
    /// A repeated header line inside the data area.
    HeaderEcho,
    /// Section separators, blank rows and anything else.
    Other,
}

impl RowKind {
    pub fn classify(no: &str) -> Self {
        let no = no.trim();
        if no == crate::workbook::columns::NO {
            Self::HeaderEcho
        } else if !no.is_empty() && no.chars().all(|c| c.is_ascii_digit()) {
            Self::Entry
        } else {
            Self::Other
        }
    }
}

/// The four columns the enrichment pass owns. `None` stands for a blank cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_access_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_as_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

impl EnrichmentFields {
    pub fn is_empty(&self) -> bool {
        self.open_access_link.is_none()
            && self.doi.is_none()
            && self.link_as_text.is_none()
            && self.author_email.is_none()
    }

    /// Link, DOI and link text all present: nothing left for the lookup services to fill.
    pub fn lookups_complete(&self) -> bool {
        self.open_access_link.is_some() && self.doi.is_some() && self.link_as_text.is_some()
    }
}

/// The `LINK` cell as the publisher listed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCell {
    pub hyperlink: Option<String>,
    pub value: String,
}

impl LinkCell {
    /// Hyperlink target when the cell has one, otherwise its display text.
    pub fn target(&self) -> String {
        self.hyperlink
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.value)
            .trim()
            .to_string()
    }
}

/// One data row as read from a sheet.
#[derive(Debug, Clone, Default)]
pub struct RowRecord {
    pub row: u32,
    pub no: String,
    pub title: String,
    pub bibliographic_data: String,
    pub fields: EnrichmentFields,
    /// `None` when the sheet has no `LINK` column.
    pub link: Option<LinkCell>,
    pub year: String,
    pub month: String,
    pub authors: String,
}

impl RowRecord {
    pub fn kind(&self) -> RowKind {
        RowKind::classify(&self.no)
    }
}

/// Treats whitespace-only cells as blank.
pub fn non_blank(value: impl AsRef<str>) -> Option<String> {
    let value = value.as_ref().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
