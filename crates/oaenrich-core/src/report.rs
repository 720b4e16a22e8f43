//! Per-author digest of papers that still lack an open-access record.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::models::{RowKind, RowRecord};
use crate::workbook::{FIRST_DATA_ROW, Workbook};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPaper {
    pub sheet: String,
    pub title: String,
    pub doi: Option<String>,
    pub year: String,
    pub month: String,
    pub authors: String,
    pub link: Option<String>,
}

impl PendingPaper {
    fn from_row(sheet: &str, row: &RowRecord) -> Self {
        let link = row
            .fields
            .link_as_text
            .clone()
            .or_else(|| row.link.as_ref().map(|cell| cell.value.trim().to_string()))
            .filter(|link| !link.is_empty());
        Self {
            sheet: sheet.to_string(),
            title: row.title.trim().to_string(),
            doi: row.fields.doi.clone(),
            year: row.year.trim().to_string(),
            month: row.month.trim().to_string(),
            authors: row.authors.trim().to_string(),
            link,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorGroup {
    pub email: String,
    pub papers: Vec<PendingPaper>,
}

/// Groups keep the order in which their email was first seen.
#[derive(Debug, Clone, Default)]
pub struct PendingDigest {
    groups: Vec<AuthorGroup>,
    index: HashMap<String, usize>,
}

impl PendingDigest {
    /// Scans the data rows of `sheets` for a known author email but no open-access link.
    pub fn collect(workbook: &Workbook, sheets: &[String]) -> Self {
        let mut digest = Self::default();
        for sheet in sheets {
            if let Err(err) = digest.collect_sheet(workbook, sheet) {
                warn!(sheet = %sheet, "skipping sheet in report: {err}");
            }
        }
        digest
    }

    fn collect_sheet(&mut self, workbook: &Workbook, sheet: &str) -> Result<()> {
        let layout = workbook.layout(sheet)?;
        for row in FIRST_DATA_ROW..=workbook.last_row(sheet)? {
            let record = workbook.read_row(sheet, &layout, row)?;
            if record.kind() != RowKind::Entry
                || record.title.trim().is_empty()
                || record.fields.open_access_link.is_some()
            {
                continue;
            }
            if let Some(email) = record.fields.author_email.clone() {
                self.push(email, PendingPaper::from_row(sheet, &record));
            }
        }
        Ok(())
    }

    pub fn push(&mut self, email: String, paper: PendingPaper) {
        match self.index.get(&email) {
            Some(&i) => self.groups[i].papers.push(paper),
            None => {
                self.index.insert(email.clone(), self.groups.len());
                self.groups.push(AuthorGroup {
                    email,
                    papers: vec![paper],
                });
            }
        }
    }

    pub fn groups(&self) -> &[AuthorGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn paper_count(&self) -> usize {
        self.groups.iter().map(|g| g.papers.len()).sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Papers without an open-access record: {}, {}",
            counted(self.paper_count(), "paper"),
            counted(self.groups.len(), "author")
        );

        for group in &self.groups {
            let _ = writeln!(out);
            let _ = writeln!(out, "{} ({})", group.email, group.papers.len());
            for (n, paper) in group.papers.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", n + 1, paper.title);
                let date = [paper.month.as_str(), paper.year.as_str()]
                    .iter()
                    .filter(|part| !part.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ");
                if !date.is_empty() {
                    let _ = writeln!(out, "     Date: {date}");
                }
                if let Some(doi) = &paper.doi {
                    let _ = writeln!(out, "     DOI: {doi}");
                }
                if !paper.authors.is_empty() {
                    let _ = writeln!(out, "     Authors: {}", paper.authors);
                }
                if let Some(link) = &paper.link {
                    let _ = writeln!(out, "     Link: {link}");
                }
                let _ = writeln!(out, "     Sheet: {}", paper.sheet);
            }
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        info!(
            path = %path.display(),
            papers = self.paper_count(),
            authors = self.groups.len(),
            "pending open-access report written"
        );
        Ok(())
    }
}

fn counted(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}
