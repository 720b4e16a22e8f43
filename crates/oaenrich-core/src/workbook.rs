//! Spreadsheet access: named sheets as grids addressed by header name.
//!
//! Headers live on row 3 and data starts on row 4. Header strings are matched
//! exactly, trailing whitespace included.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{CoreError, Result};
use crate::models::{EnrichmentFields, LinkCell, RowRecord};

pub const HEADER_ROW: u32 = 3;
pub const FIRST_DATA_ROW: u32 = 4;

pub mod columns {
    pub const NO: &str = "NO.";
    pub const TITLE: &str = "TITLE ";
    pub const BIBLIOGRAPHIC_DATA: &str = "BIBLIOGRAPHIC DATA";
    pub const LINK: &str = "LINK";
    pub const YEAR: &str = "YEAR";
    pub const MONTH: &str = "MONTH";
    pub const AUTHORS: &str = "AUTHORS";

    pub const OPEN_ACCESS_LINK: &str = "Open Access link";
    pub const DOI: &str = "DOI";
    pub const LINK_AS_TEXT: &str = "link_as_text";
    pub const AUTHOR_EMAIL: &str = "author_email";

    pub const REQUIRED: [&str; 3] = [NO, TITLE, BIBLIOGRAPHIC_DATA];

    /// Columns T, U and V.
    pub const DOI_INDEX: u32 = 20;
    pub const LINK_AS_TEXT_INDEX: u32 = 21;
    pub const AUTHOR_EMAIL_INDEX: u32 = 22;
}

// ─── HeaderMap ────────────────────────────────────────────────────────────────

/// Header name → 1-based column index for one sheet.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    columns: HashMap<String, u32>,
}

impl HeaderMap {
    pub fn get(&self, name: &str) -> Option<u32> {
        self.columns.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<u32> {
        self.get(name)
            .ok_or_else(|| CoreError::UnknownHeader(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn last_column(&self) -> u32 {
        self.columns.values().copied().max().unwrap_or(0)
    }

    fn is_occupied(&self, column: u32) -> bool {
        self.columns.values().any(|&c| c == column)
    }

    fn insert(&mut self, name: &str, column: u32) {
        self.columns.insert(name.to_string(), column);
    }

    fn missing_required(&self) -> Vec<String> {
        columns::REQUIRED
            .iter()
            .filter(|name| !self.contains(name))
            .map(|name| name.to_string())
            .collect()
    }
}

// ─── SheetLayout ──────────────────────────────────────────────────────────────

/// Resolved column positions for every column the pipeline reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub no: u32,
    pub title: u32,
    pub bibliographic_data: u32,
    pub open_access_link: u32,
    pub doi: u32,
    pub link_as_text: u32,
    pub author_email: u32,
    pub link: Option<u32>,
    pub year: Option<u32>,
    pub month: Option<u32>,
    pub authors: Option<u32>,
}

impl SheetLayout {
    fn from_headers(headers: &HeaderMap) -> Result<Self> {
        Ok(Self {
            no: headers.require(columns::NO)?,
            title: headers.require(columns::TITLE)?,
            bibliographic_data: headers.require(columns::BIBLIOGRAPHIC_DATA)?,
            open_access_link: headers.require(columns::OPEN_ACCESS_LINK)?,
            doi: headers.require(columns::DOI)?,
            link_as_text: headers.require(columns::LINK_AS_TEXT)?,
            author_email: headers.require(columns::AUTHOR_EMAIL)?,
            link: headers.get(columns::LINK),
            year: headers.get(columns::YEAR),
            month: headers.get(columns::MONTH),
            authors: headers.get(columns::AUTHORS),
        })
    }
}

// ─── Workbook ─────────────────────────────────────────────────────────────────

pub struct Workbook {
    book: Spreadsheet,
    path: PathBuf,
}

impl Workbook {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|e| {
            CoreError::WorkbookLoad {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            book,
            path: path.to_path_buf(),
        })
    }

    /// A workbook with no sheets, saved to `path` on the first `save`.
    pub fn create(path: impl AsRef<Path>) -> Self {
        Self {
            book: umya_spreadsheet::new_file_empty_worksheet(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        umya_spreadsheet::writer::xlsx::write(&self.book, &self.path).map_err(|e| {
            CoreError::WorkbookSave {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }
        })
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.book.get_sheet_by_name(name).is_some()
    }

    pub fn add_sheet(&mut self, name: &str) -> Result<()> {
        self.book
            .new_sheet(name)
            .map(|_| ())
            .map_err(|e| CoreError::SheetCreate {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    fn worksheet(&self, name: &str) -> Result<&Worksheet> {
        self.book
            .get_sheet_by_name(name)
            .ok_or_else(|| CoreError::SheetNotFound(name.to_string()))
    }

    fn worksheet_mut(&mut self, name: &str) -> Result<&mut Worksheet> {
        self.book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| CoreError::SheetNotFound(name.to_string()))
    }

    /// Reads the header row. Blank header cells are ignored; on duplicates the right-most wins.
    pub fn headers(&self, sheet: &str) -> Result<HeaderMap> {
        let ws = self.worksheet(sheet)?;
        let mut headers = HeaderMap::default();
        for column in 1..=ws.get_highest_column() {
            let name = cell_text(ws, column, HEADER_ROW);
            if !name.is_empty() {
                headers.insert(&name, column);
            }
        }
        Ok(headers)
    }

    /// Validates the required headers and creates any missing managed column.
    pub fn prepare_layout(&mut self, sheet: &str) -> Result<SheetLayout> {
        let mut headers = self.headers(sheet)?;
        let missing = headers.missing_required();
        if !missing.is_empty() {
            return Err(CoreError::MissingRequiredHeaders {
                sheet: sheet.to_string(),
                missing,
            });
        }

        if !headers.contains(columns::OPEN_ACCESS_LINK) {
            let column = headers.last_column() + 1;
            self.create_column(sheet, &mut headers, columns::OPEN_ACCESS_LINK, column)?;
        }
        for (name, preferred) in [
            (columns::DOI, columns::DOI_INDEX),
            (columns::LINK_AS_TEXT, columns::LINK_AS_TEXT_INDEX),
            (columns::AUTHOR_EMAIL, columns::AUTHOR_EMAIL_INDEX),
        ] {
            if headers.contains(name) {
                continue;
            }
            let column = if headers.is_occupied(preferred) {
                headers.last_column() + 1
            } else {
                preferred
            };
            self.create_column(sheet, &mut headers, name, column)?;
        }

        SheetLayout::from_headers(&headers)
    }

    /// Layout of a sheet whose managed columns already exist.
    pub fn layout(&self, sheet: &str) -> Result<SheetLayout> {
        let headers = self.headers(sheet)?;
        let missing = headers.missing_required();
        if !missing.is_empty() {
            return Err(CoreError::MissingRequiredHeaders {
                sheet: sheet.to_string(),
                missing,
            });
        }
        SheetLayout::from_headers(&headers)
    }

    fn create_column(
        &mut self,
        sheet: &str,
        headers: &mut HeaderMap,
        name: &str,
        column: u32,
    ) -> Result<()> {
        tracing::debug!(sheet, header = name, column, "creating missing column");
        self.set_text(sheet, column, HEADER_ROW, name)?;
        headers.insert(name, column);
        Ok(())
    }

    pub fn last_row(&self, sheet: &str) -> Result<u32> {
        Ok(self.worksheet(sheet)?.get_highest_row())
    }

    pub fn text(&self, sheet: &str, column: u32, row: u32) -> Result<String> {
        Ok(cell_text(self.worksheet(sheet)?, column, row))
    }

    pub fn set_text(&mut self, sheet: &str, column: u32, row: u32, value: &str) -> Result<()> {
        self.worksheet_mut(sheet)?
            .get_cell_mut((column, row))
            .set_value_string(value);
        Ok(())
    }

    pub fn set_hyperlink(&mut self, sheet: &str, column: u32, row: u32, url: &str) -> Result<()> {
        let mut link = umya_spreadsheet::Hyperlink::default();
        link.set_url(url);
        self.worksheet_mut(sheet)?
            .get_cell_mut((column, row))
            .set_hyperlink(link);
        Ok(())
    }

    pub fn read_row(&self, sheet: &str, layout: &SheetLayout, row: u32) -> Result<RowRecord> {
        let ws = self.worksheet(sheet)?;
        let text = |column: u32| cell_text(ws, column, row);
        let optional = |column: Option<u32>| column.map(text).unwrap_or_default();

        let link = layout.link.map(|column| LinkCell {
            hyperlink: cell_hyperlink(ws, column, row),
            value: text(column),
        });

        Ok(RowRecord {
            row,
            no: text(layout.no),
            title: text(layout.title),
            bibliographic_data: text(layout.bibliographic_data),
            fields: EnrichmentFields {
                open_access_link: crate::models::non_blank(text(layout.open_access_link)),
                doi: crate::models::non_blank(text(layout.doi)),
                link_as_text: crate::models::non_blank(text(layout.link_as_text)),
                author_email: crate::models::non_blank(text(layout.author_email)),
            },
            link,
            year: optional(layout.year),
            month: optional(layout.month),
            authors: optional(layout.authors),
        })
    }

    /// Writes every `Some` field; `None` leaves the cell untouched.
    pub fn write_fields(
        &mut self,
        sheet: &str,
        layout: &SheetLayout,
        row: u32,
        changes: &EnrichmentFields,
    ) -> Result<()> {
        let targets = [
            (layout.open_access_link, &changes.open_access_link),
            (layout.doi, &changes.doi),
            (layout.link_as_text, &changes.link_as_text),
            (layout.author_email, &changes.author_email),
        ];
        for (column, value) in targets {
            if let Some(value) = value {
                self.set_text(sheet, column, row, value)?;
            }
        }
        Ok(())
    }
}

fn cell_text(ws: &Worksheet, column: u32, row: u32) -> String {
    ws.get_cell((column, row))
        .map(|cell| cell.get_value().to_string())
        .unwrap_or_default()
}

fn cell_hyperlink(ws: &Worksheet, column: u32, row: u32) -> Option<String> {
    ws.get_cell((column, row))
        .and_then(|cell| cell.get_hyperlink())
        .map(|link| link.get_url().to_string())
        .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_workbook(dir: &TempDir) -> Workbook {
        let mut wb = Workbook::create(dir.path().join("pubs.xlsx"));
        wb.add_sheet("YEAR 2024").unwrap();
        for (col, name) in [(1, "NO."), (2, "TITLE "), (3, "BIBLIOGRAPHIC DATA"), (4, "LINK")] {
            wb.set_text("YEAR 2024", col, HEADER_ROW, name).unwrap();
        }
        wb.set_text("YEAR 2024", 1, 4, "1").unwrap();
        wb.set_text("YEAR 2024", 2, 4, "Distributed Control").unwrap();
        wb.set_text("YEAR 2024", 3, 4, "IEEE TAC, DOI: 10.1109/TAC.2020.1234").unwrap();
        wb.set_text("YEAR 2024", 4, 4, "IEEE Xplore").unwrap();
        wb.set_hyperlink("YEAR 2024", 4, 4, "https://ieeexplore.ieee.org/document/123")
            .unwrap();
        wb
    }

    #[test]
    fn prepare_layout_creates_managed_columns() {
        let dir = TempDir::new().unwrap();
        let mut wb = sample_workbook(&dir);

        let layout = wb.prepare_layout("YEAR 2024").unwrap();
        assert_eq!(layout.open_access_link, 5);
        assert_eq!(layout.doi, columns::DOI_INDEX);
        assert_eq!(layout.link_as_text, columns::LINK_AS_TEXT_INDEX);
        assert_eq!(layout.author_email, columns::AUTHOR_EMAIL_INDEX);
        assert_eq!(layout.link, Some(4));
        assert_eq!(wb.text("YEAR 2024", 5, HEADER_ROW).unwrap(), "Open Access link");
        assert_eq!(wb.text("YEAR 2024", 22, HEADER_ROW).unwrap(), "author_email");

        // A second pass finds the columns it created.
        assert_eq!(wb.prepare_layout("YEAR 2024").unwrap(), layout);
    }

    #[test]
    fn occupied_fixed_index_appends_instead() {
        let dir = TempDir::new().unwrap();
        let mut wb = sample_workbook(&dir);
        wb.set_text("YEAR 2024", 20, HEADER_ROW, "NOTES").unwrap();

        let layout = wb.prepare_layout("YEAR 2024").unwrap();
        assert_eq!(layout.open_access_link, 21);
        assert_eq!(layout.doi, 22);
        assert_eq!(layout.link_as_text, 23);
        assert_eq!(layout.author_email, 24);
    }

    #[test]
    fn trailing_space_in_title_header_is_required() {
        let dir = TempDir::new().unwrap();
        let mut wb = Workbook::create(dir.path().join("pubs.xlsx"));
        wb.add_sheet("S").unwrap();
        wb.set_text("S", 1, HEADER_ROW, "NO.").unwrap();
        wb.set_text("S", 2, HEADER_ROW, "TITLE").unwrap();
        wb.set_text("S", 3, HEADER_ROW, "BIBLIOGRAPHIC DATA").unwrap();

        match wb.prepare_layout("S") {
            Err(CoreError::MissingRequiredHeaders { missing, .. }) => {
                assert_eq!(missing, vec!["TITLE ".to_string()]);
            }
            other => panic!("expected missing headers, got {other:?}"),
        }
    }

    #[test]
    fn unknown_sheet_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut wb = sample_workbook(&dir);
        assert!(matches!(
            wb.prepare_layout("YEAR 1999"),
            Err(CoreError::SheetNotFound(name)) if name == "YEAR 1999"
        ));
    }

    #[test]
    fn read_and_write_row_fields() {
        let dir = TempDir::new().unwrap();
        let mut wb = sample_workbook(&dir);
        let layout = wb.prepare_layout("YEAR 2024").unwrap();

        let row = wb.read_row("YEAR 2024", &layout, 4).unwrap();
        assert_eq!(row.no, "1");
        assert_eq!(row.title, "Distributed Control");
        assert!(row.fields.is_empty());
        assert_eq!(
            row.link.as_ref().map(LinkCell::target).as_deref(),
            Some("https://ieeexplore.ieee.org/document/123")
        );

        let changes = EnrichmentFields {
            open_access_link: Some("https://zenodo.org/records/9".into()),
            author_email: Some("louca.maria@ucy.ac.cy".into()),
            ..Default::default()
        };
        wb.write_fields("YEAR 2024", &layout, 4, &changes).unwrap();

        let row = wb.read_row("YEAR 2024", &layout, 4).unwrap();
        assert_eq!(row.fields.open_access_link.as_deref(), Some("https://zenodo.org/records/9"));
        assert_eq!(row.fields.author_email.as_deref(), Some("louca.maria@ucy.ac.cy"));
        assert_eq!(row.fields.doi, None);
    }

    #[test]
    fn save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let mut wb = sample_workbook(&dir);
        let layout = wb.prepare_layout("YEAR 2024").unwrap();
        wb.write_fields(
            "YEAR 2024",
            &layout,
            4,
            &EnrichmentFields {
                doi: Some("https://doi.org/10.1109/TAC.2020.1234".into()),
                ..Default::default()
            },
        )
        .unwrap();
        wb.save().unwrap();

        let reopened = Workbook::open(dir.path().join("pubs.xlsx")).unwrap();
        assert_eq!(reopened.layout("YEAR 2024").unwrap(), layout);
        assert_eq!(
            reopened.text("YEAR 2024", layout.doi, 4).unwrap(),
            "https://doi.org/10.1109/TAC.2020.1234"
        );
    }

    #[test]
    fn duplicate_sheet_is_a_workbook_error() {
        let dir = TempDir::new().unwrap();
        let mut wb = sample_workbook(&dir);
        assert!(matches!(
            wb.add_sheet("YEAR 2024"),
            Err(CoreError::SheetCreate { name, .. }) if name == "YEAR 2024"
        ));
    }

    #[test]
    fn open_missing_file_fails_to_load() {
        let err = Workbook::open("/tmp/definitely-not-here-oaenrich.xlsx").err().unwrap();
        assert!(matches!(err, CoreError::WorkbookLoad { .. }));
    }
}
