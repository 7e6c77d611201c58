// 📥 Spreadsheet Importer - merge spreadsheet rows into the record file
//
// Runs once at startup, before the store loads. Best effort: a missing
// spreadsheet is a no-op, an unreadable one is skipped by the caller, and a
// bad row only skips that row.

use crate::error::{ImportError, ImportSourceError, MalformedRow, StorageError};
use crate::person::Person;
use crate::store::{read_records, write_records};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// SOURCE FORMATS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// xlsx / xlsm / xlsb / xls / ods
    Workbook,
    Csv,
}

/// A single cell, reduced to what the merge cares about
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Empty,
    /// Numbers, dates, booleans, error cells
    Other,
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::String(s) => Cell::Text(s.clone()),
            Data::Empty => Cell::Empty,
            _ => Cell::Other,
        }
    }
}

/// Reads the first sheet of a tabular file into rows of cells
pub trait SheetReader: Send + Sync {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<Cell>>, ImportSourceError>;

    fn format(&self) -> SourceFormat;
}

/// Detect format from the file extension
pub fn detect_format(path: &Path) -> Result<SourceFormat, ImportSourceError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceFormat::Workbook),
        "csv" => Ok(SourceFormat::Csv),
        _ => Err(ImportSourceError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

pub fn get_reader(format: SourceFormat) -> Box<dyn SheetReader> {
    match format {
        SourceFormat::Workbook => Box::new(WorkbookReader),
        SourceFormat::Csv => Box::new(CsvReader),
    }
}

pub struct WorkbookReader;

impl SheetReader for WorkbookReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<Cell>>, ImportSourceError> {
        let spreadsheet_err = |source| ImportSourceError::Spreadsheet {
            path: path.to_path_buf(),
            source,
        };

        let mut workbook = open_workbook_auto(path).map_err(spreadsheet_err)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportSourceError::NoSheet {
                path: path.to_path_buf(),
            })?
            .map_err(spreadsheet_err)?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();
        Ok(anchor_rows(range.start(), rows))
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Workbook
    }
}

/// A workbook range starts at its first non-empty cell, not at A1. Pad it
/// back so row and column indexes are absolute sheet positions.
pub fn anchor_rows(start: Option<(u32, u32)>, rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    let Some((first_row, first_col)) = start else {
        return Vec::new();
    };

    let leading_rows = (0..first_row).map(|_| Vec::new());
    let shifted = rows.into_iter().map(|row| {
        let mut padded = vec![Cell::Empty; first_col as usize];
        padded.extend(row);
        padded
    });
    leading_rows.chain(shifted).collect()
}

pub struct CsvReader;

impl SheetReader for CsvReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<Cell>>, ImportSourceError> {
        let csv_err = |source| ImportSourceError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;

        let mut rows = Vec::new();
        // Byte records: an undecodable field becomes Cell::Other and only
        // its row is skipped. I/O errors still abort.
        for record in reader.byte_records() {
            let record = record.map_err(csv_err)?;
            rows.push(
                record
                    .iter()
                    .map(|field| match std::str::from_utf8(field) {
                        Ok("") => Cell::Empty,
                        Ok(text) => Cell::Text(text.to_string()),
                        Err(_) => Cell::Other,
                    })
                    .collect(),
            );
        }

        Ok(rows)
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Csv
    }
}

// ============================================================================
// ROW NORMALIZATION
// ============================================================================

/// Zero-based column positions of the fields we extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub first_name: usize,
    pub last_name: usize,
    pub bank: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout {
            first_name: 2,
            last_name: 3,
            bank: 5,
        }
    }
}

/// What happened to one spreadsheet row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Added(Person),
    Duplicate,
    Skipped(MalformedRow),
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: PathBuf,
    pub rows_read: usize,
    pub added: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub total_records: usize,
    pub finished_at: DateTime<Utc>,
}

fn text_at(
    cells: &[Cell],
    row: usize,
    column: usize,
    field: &'static str,
) -> Result<String, MalformedRow> {
    match cells.get(column) {
        None => Err(MalformedRow::MissingColumn { row, column }),
        Some(Cell::Other) => Err(MalformedRow::NotText { row, column }),
        Some(Cell::Empty) => Err(MalformedRow::BlankField { row, field }),
        Some(Cell::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(MalformedRow::BlankField { row, field })
            } else {
                Ok(trimmed.to_string())
            }
        }
    }
}

// ============================================================================
// IMPORTER
// ============================================================================

pub struct SpreadsheetImporter {
    /// Title/header rows at the top of the sheet
    pub skip_rows: usize,
    pub layout: ColumnLayout,
}

impl Default for SpreadsheetImporter {
    fn default() -> Self {
        SpreadsheetImporter {
            skip_rows: 3,
            layout: ColumnLayout::default(),
        }
    }
}

impl SpreadsheetImporter {
    pub fn new(skip_rows: usize, layout: ColumnLayout) -> Self {
        SpreadsheetImporter { skip_rows, layout }
    }

    /// Turn one row into a person, trimming every field.
    /// `row` is the 1-based row number in the sheet, for diagnostics.
    pub fn normalize_row(&self, row: usize, cells: &[Cell]) -> Result<Person, MalformedRow> {
        let first_name = text_at(cells, row, self.layout.first_name, "first_name")?;
        let last_name = text_at(cells, row, self.layout.last_name, "last_name")?;
        let bank = text_at(cells, row, self.layout.bank, "bank")?;

        Ok(Person::new(&first_name, &last_name, &bank))
    }

    /// Fold rows into `people`, appending only unseen (first, last, bank) triples
    pub fn merge_rows(&self, people: &mut Vec<Person>, rows: &[Vec<Cell>]) -> Vec<RowOutcome> {
        rows.iter()
            .enumerate()
            .skip(self.skip_rows)
            .map(|(i, cells)| match self.normalize_row(i + 1, cells) {
                Err(malformed) => {
                    debug!(%malformed, "spreadsheet row skipped");
                    RowOutcome::Skipped(malformed)
                }
                Ok(person) if people.iter().any(|p| p.same_entry(&person)) => {
                    RowOutcome::Duplicate
                }
                Ok(person) => {
                    people.push(person.clone());
                    RowOutcome::Added(person)
                }
            })
            .collect()
    }

    /// Merge `source` into the record file.
    ///
    /// Returns `Ok(None)` when the spreadsheet does not exist. A missing record
    /// file starts from an empty collection; a malformed one aborts the merge
    /// without touching it.
    pub fn import(
        &self,
        source: &Path,
        record_file: &Path,
    ) -> Result<Option<ImportReport>, ImportError> {
        if !source.exists() {
            debug!(source = %source.display(), "no spreadsheet, import skipped");
            return Ok(None);
        }

        let reader = get_reader(detect_format(source)?);
        let rows = reader.read_rows(source)?;

        let mut people = match read_records(record_file) {
            Ok(people) => people,
            Err(StorageError::Missing { .. }) => {
                info!(path = %record_file.display(), "record file missing, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let outcomes = self.merge_rows(&mut people, &rows);
        write_records(record_file, &people)?;

        let report = ImportReport {
            source: source.to_path_buf(),
            rows_read: rows.len().saturating_sub(self.skip_rows),
            added: count(&outcomes, |o| matches!(o, RowOutcome::Added(_))),
            duplicates: count(&outcomes, |o| matches!(o, RowOutcome::Duplicate)),
            skipped: count(&outcomes, |o| matches!(o, RowOutcome::Skipped(_))),
            total_records: people.len(),
            finished_at: Utc::now(),
        };

        info!(
            source = %source.display(),
            added = report.added,
            duplicates = report.duplicates,
            skipped = report.skipped,
            total = report.total_records,
            "spreadsheet merged"
        );
        Ok(Some(report))
    }
}

fn count(outcomes: &[RowOutcome], pred: impl Fn(&RowOutcome) -> bool) -> usize {
    outcomes.iter().filter(|o| pred(o)).count()
}

// ============================================================================
// TESTS
// ============================================================================
