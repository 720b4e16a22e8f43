use std::sync::Arc;

use oaenrich_core::config::EnrichmentConfig;
use oaenrich_core::workbook::FIRST_DATA_ROW;
use oaenrich_core::{EnrichConfig, EnrichmentFields, RowKind, RowRecord, SheetLayout, Workbook};
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use crate::error::Result;
use crate::identifiers::{doi_url, extract_doi_from_bibliographic};
use crate::sources::{EmailResolver, IeeeEmailResolver, RecordLookup, ZenodoSource};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub sheets_processed: usize,
    pub sheets_skipped: usize,
    pub rows_processed: usize,
    pub rows_skipped: usize,
    pub links_found: usize,
    pub dois_written: usize,
    pub link_texts_written: usize,
    pub emails_found: usize,
    pub failed_saves: usize,
}

impl EnrichmentSummary {
    fn record(&mut self, outcome: &RowOutcome) {
        if outcome.skipped.is_some() {
            self.rows_skipped += 1;
            return;
        }
        self.rows_processed += 1;
        let changes = &outcome.changes;
        self.links_found += usize::from(changes.open_access_link.is_some());
        self.dois_written += usize::from(changes.doi.is_some());
        self.link_texts_written += usize::from(changes.link_as_text.is_some());
        self.emails_found += usize::from(changes.author_email.is_some());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAnEntry,
    RepeatedHeader,
    MissingTitle,
}

/// What enriching one row decided. `changes` holds only values that differ from the sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowOutcome {
    pub changes: EnrichmentFields,
    pub skipped: Option<SkipReason>,
}

impl RowOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            changes: EnrichmentFields::default(),
            skipped: Some(reason),
        }
    }
}

/// Current row state plus the writes accumulated so far.
struct RowDraft {
    state: EnrichmentFields,
    changes: EnrichmentFields,
}

impl RowDraft {
    fn set_open_access_link(&mut self, value: String) {
        assign(&mut self.state.open_access_link, &mut self.changes.open_access_link, value);
    }

    fn set_doi(&mut self, value: String) {
        assign(&mut self.state.doi, &mut self.changes.doi, value);
    }

    fn set_link_as_text(&mut self, value: String) {
        assign(&mut self.state.link_as_text, &mut self.changes.link_as_text, value);
    }

    fn set_author_email(&mut self, value: String) {
        assign(&mut self.state.author_email, &mut self.changes.author_email, value);
    }
}

fn assign(current: &mut Option<String>, change: &mut Option<String>, value: String) {
    if current.as_deref() != Some(value.as_str()) {
        *change = Some(value.clone());
    }
    *current = Some(value);
}

pub struct EnrichmentEngine {
    lookup: Arc<dyn RecordLookup>,
    resolver: Arc<dyn EmailResolver>,
    options: EnrichmentConfig,
}

impl EnrichmentEngine {
    pub fn new(
        lookup: Arc<dyn RecordLookup>,
        resolver: Arc<dyn EmailResolver>,
        options: EnrichmentConfig,
    ) -> Self {
        Self {
            lookup,
            resolver,
            options,
        }
    }

    /// Production engine: Zenodo for records, IEEE Xplore for author emails.
    pub fn from_config(config: &EnrichConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(ZenodoSource::from_config(&config.http)?),
            Arc::new(IeeeEmailResolver::from_config(config)?),
            config.enrichment.clone(),
        ))
    }

    /// Blocking helper for the CLI: drives `run` on a current-thread runtime.
    pub fn run_blocking(
        &self,
        workbook: &mut Workbook,
        sheets: &[String],
    ) -> Result<EnrichmentSummary> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run(workbook, sheets)))
    }

    /// Enriches every sheet in order, saving after each processed row and once at the end.
    pub async fn run(&self, workbook: &mut Workbook, sheets: &[String]) -> EnrichmentSummary {
        let mut summary = EnrichmentSummary::default();

        for sheet in sheets {
            if !workbook.has_sheet(sheet) {
                error!(sheet = %sheet, depth = 0, "Sheet not found in the workbook, skipping");
                summary.sheets_skipped += 1;
                continue;
            }
            let layout = match workbook.prepare_layout(sheet) {
                Ok(layout) => layout,
                Err(err) => {
                    error!(sheet = %sheet, depth = 0, "{err}, skipping sheet");
                    summary.sheets_skipped += 1;
                    continue;
                }
            };
            self.process_sheet(workbook, sheet, &layout, &mut summary)
                .await;
            summary.sheets_processed += 1;
        }

        match workbook.save() {
            Ok(()) => info!(
                path = %workbook.path().display(),
                depth = 0,
                "Workbook saved successfully"
            ),
            Err(err) => {
                error!(depth = 0, "{err}");
                summary.failed_saves += 1;
            }
        }
        summary
    }

    async fn process_sheet(
        &self,
        workbook: &mut Workbook,
        sheet: &str,
        layout: &SheetLayout,
        summary: &mut EnrichmentSummary,
    ) {
        let last_row = match workbook.last_row(sheet) {
            Ok(row) => row,
            Err(err) => {
                error!(sheet, depth = 0, "{err}");
                return;
            }
        };
        info!(sheet, depth = 0, rows = last_row.saturating_sub(FIRST_DATA_ROW - 1), "Processing sheet");

        for row in FIRST_DATA_ROW..=last_row {
            let record = match workbook.read_row(sheet, layout, row) {
                Ok(record) => record,
                Err(err) => {
                    warn!(sheet, row, depth = 0, "cannot read row: {err}");
                    continue;
                }
            };

            let span = info_span!("row", sheet, no = %record.no.trim());
            let outcome = self.enrich_row(&record).instrument(span.clone()).await;
            summary.record(&outcome);
            if outcome.skipped.is_some() {
                continue;
            }

            span.in_scope(|| {
                if let Err(err) = workbook.write_fields(sheet, layout, row, &outcome.changes) {
                    error!(depth = 1, "cannot write row: {err}");
                }
                match workbook.save() {
                    Ok(()) => debug!(depth = 1, "Workbook saved after processing row"),
                    Err(err) => {
                        error!(depth = 1, "Error saving workbook after processing row: {err}");
                        summary.failed_saves += 1;
                    }
                }
            });
        }
    }

    /// Decides which lookups a row needs and what to write back. Never clears a field.
    pub async fn enrich_row(&self, record: &RowRecord) -> RowOutcome {
        match record.kind() {
            RowKind::Entry => {}
            RowKind::HeaderEcho => {
                debug!(depth = 0, row = record.row, "Repeated header row, skipping");
                return RowOutcome::skipped(SkipReason::RepeatedHeader);
            }
            RowKind::Other => {
                trace!(depth = 0, "not a numbered entry");
                return RowOutcome::skipped(SkipReason::NotAnEntry);
            }
        }
        let title = record.title.trim();
        if title.is_empty() {
            warn!(depth = 0, row = record.row, "Skipping row with missing title");
            return RowOutcome::skipped(SkipReason::MissingTitle);
        }
        info!(depth = 0, title, "Processing entry");

        let overwrite = self.options.overwrite_open_access_link;
        let bibliographic = record.bibliographic_data.trim();
        let mut draft = RowDraft {
            state: record.fields.clone(),
            changes: EnrichmentFields::default(),
        };

        if draft.state.lookups_complete() && !overwrite {
            info!(
                depth = 1,
                "Open Access link, DOI and link_as_text already populated, skipping lookups"
            );
        } else {
            if draft.state.link_as_text.is_none()
                && let Some(cell) = &record.link
            {
                let target = cell.target();
                if !target.is_empty() {
                    debug!(depth = 1, link = %target, "link_as_text taken from LINK column");
                    draft.set_link_as_text(target);
                }
            }

            if draft.state.open_access_link.is_none() || overwrite {
                self.resolve_open_access(title, bibliographic, &mut draft)
                    .await;
            } else {
                info!(depth = 1, "Open Access link already populated, skipping update");
                if draft.state.doi.is_none() {
                    match extract_doi_from_bibliographic(bibliographic) {
                        Some(doi) => {
                            info!(depth = 2, doi = %doi, "Extracted DOI from bibliographic data");
                            self.write_doi(&mut draft, doi_url(&doi));
                        }
                        None => info!(depth = 2, "No DOI found in bibliographic data"),
                    }
                } else {
                    debug!(depth = 2, "DOI already populated, skipping update");
                }
            }
        }

        if draft.state.author_email.is_none()
            && let Some(link) = draft.state.link_as_text.clone()
        {
            match self.resolver.resolve_email(&link).await {
                Ok(email) => {
                    info!(depth = 1, email = %email, "Author email found");
                    draft.set_author_email(email);
                }
                Err(err) => debug!(depth = 1, resolver = self.resolver.name(), "No author email: {err}"),
            }
        }

        RowOutcome {
            changes: draft.changes,
            skipped: None,
        }
    }

    async fn resolve_open_access(&self, title: &str, bibliographic: &str, draft: &mut RowDraft) {
        info!(depth = 1, source = self.lookup.name(), "Searching for title");
        match self.lookup.search_by_title(title).await {
            Ok(hit) => {
                info!(depth = 2, link = %hit.url, "Found record for title");
                draft.set_open_access_link(hit.url.clone());
                match extract_doi_from_bibliographic(bibliographic) {
                    Some(doi) => {
                        info!(depth = 2, doi = %doi, "DOI extracted from bibliographic data");
                        self.write_doi(draft, doi_url(&doi));
                    }
                    None => {
                        // The record id is not a DOI; kept as the column's fallback value.
                        info!(depth = 2, recid = %hit.id, "No DOI found in bibliographic data, using record id as fallback");
                        self.write_doi(draft, doi_url(&hit.id));
                    }
                }
            }
            Err(err) => {
                info!(depth = 2, "Search by title failed: {err}");
                if bibliographic.is_empty() {
                    info!(depth = 2, "No bibliographic data available");
                    return;
                }
                let Some(doi) = extract_doi_from_bibliographic(bibliographic) else {
                    info!(depth = 2, "No DOI found in bibliographic data");
                    return;
                };
                info!(depth = 2, doi = %doi, "Extracted DOI from bibliographic data");
                match self.lookup.search_by_doi(&doi).await {
                    Some(hit) => {
                        info!(depth = 2, link = %hit.url, "Found record for DOI");
                        draft.set_open_access_link(hit.url);
                    }
                    None => info!(
                        depth = 2,
                        doi = %doi,
                        "No record found for DOI: not indexed or malformed DOI"
                    ),
                }
                self.write_doi(draft, doi_url(&doi));
            }
        }
    }

    fn write_doi(&self, draft: &mut RowDraft, value: String) {
        if self.options.populate_doi {
            draft.set_doi(value);
        } else {
            debug!(depth = 2, "DOI column disabled, not writing");
        }
    }
}
