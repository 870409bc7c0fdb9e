//! CSV import pipeline: validates an uploaded file, parses rows into
//! [`NewTalk`] records, and accumulates per-row skip warnings.
//!
//! Whole-file problems (bad extension, oversize, missing column, zero valid
//! rows) fail the import as [`ImportError`]. Row-level problems never abort
//! the batch: the row is skipped and a warning recorded, in file order.

use chrono::NaiveDate;
use thiserror::Error;

use crate::NewTalk;

/// Hard cap on uploaded CSV content, 10 MiB.
pub const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

/// Header names every import file must carry; order and extras are irrelevant.
pub const REQUIRED_COLUMNS: [&str; 6] = ["title", "author", "date", "views", "likes", "link"];

/// Date cells must read "<full month name> <4-digit year>", e.g. "January 2023".
const DATE_PATTERN: &str = "MMMM yyyy";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Whole-file import failures. Nothing is persisted when any of these occur.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid file format: expected a .csv file, got '{0}'")]
    InvalidFileFormat(String),
    #[error("file size {size} bytes exceeds maximum limit of {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },
    #[error("required CSV column '{0}' is missing")]
    MissingColumn(&'static str),
    #[error("no valid records found in CSV file")]
    NoValidRecords,
    #[error("CSV header could not be read: {0}")]
    Malformed(#[from] csv::Error),
}

/// The parsed batch from one CSV file: valid records plus skip bookkeeping.
///
/// Returned by value so concurrent imports each carry their own warning list
/// and counter; there is no shared accumulator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvBatch {
    pub talks: Vec<NewTalk>,
    pub skipped: u64,
    pub warnings: Vec<String>,
}

/// Outcome of a committed import. Total failures are the `Err` side of the
/// surrounding `Result`, so matching on this enum plus `?` covers the full
/// success / partial / failure triad exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Every data row was imported.
    Success { imported: u64 },
    /// Some rows were skipped; the rest were imported.
    Partial {
        imported: u64,
        skipped: u64,
        warnings: Vec<String>,
    },
}

impl ImportOutcome {
    #[must_use]
    pub fn new(imported: u64, skipped: u64, warnings: Vec<String>) -> Self {
        if skipped == 0 {
            ImportOutcome::Success { imported }
        } else {
            ImportOutcome::Partial {
                imported,
                skipped,
                warnings,
            }
        }
    }

    #[must_use]
    pub fn imported(&self) -> u64 {
        match self {
            ImportOutcome::Success { imported } | ImportOutcome::Partial { imported, .. } => {
                *imported
            }
        }
    }

    #[must_use]
    pub fn skipped(&self) -> u64 {
        match self {
            ImportOutcome::Success { .. } => 0,
            ImportOutcome::Partial { skipped, .. } => *skipped,
        }
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        match self {
            ImportOutcome::Success { .. } => &[],
            ImportOutcome::Partial { warnings, .. } => warnings,
        }
    }
}

/// Returns true when the filename carries the literal `.csv` or `.CSV` suffix.
///
/// Mixed-case suffixes like `.Csv` are rejected on purpose; so is anything
/// with a trailing extension such as `report.csv.txt`.
#[must_use]
pub fn is_csv_filename(filename: &str) -> bool {
    filename.ends_with(".csv") || filename.ends_with(".CSV")
}

/// Validate and parse one uploaded CSV file into a [`CsvBatch`].
///
/// Row numbers in warnings are 1-based counting the header row, so the first
/// data row reports as row 2.
///
/// # Errors
///
/// Returns [`ImportError`] for whole-file failures; individual bad rows are
/// skipped, not errors.
pub fn parse_csv(filename: &str, content: &[u8], max_bytes: usize) -> Result<CsvBatch, ImportError> {
    if !is_csv_filename(filename) {
        return Err(ImportError::InvalidFileFormat(filename.to_string()));
    }
    if content.len() > max_bytes {
        return Err(ImportError::FileTooLarge {
            size: content.len(),
            limit: max_bytes,
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let columns = resolve_columns(reader.headers()?)?;

    let mut talks = Vec::new();
    let mut skipped: u64 = 0;
    let mut warnings = Vec::new();

    for (index, record) in reader.records().enumerate() {
        // Header is row 1, so the first data row is row 2.
        let row = index as u64 + 2;
        let outcome = match record {
            Ok(record) => parse_row(&record, &columns),
            // Reader-level row failures (ragged quoting and the like) are
            // recoverable too; they must never abort the whole import.
            Err(e) => Err(format!("unreadable row: {e}")),
        };
        match outcome {
            Ok(talk) => talks.push(talk),
            Err(reason) => {
                warnings.push(format!("row {row}: {reason}"));
                skipped += 1;
            }
        }
    }

    if talks.is_empty() {
        return Err(ImportError::NoValidRecords);
    }

    Ok(CsvBatch {
        talks,
        skipped,
        warnings,
    })
}

struct ColumnIndex {
    title: usize,
    author: usize,
    date: usize,
    views: usize,
    likes: usize,
    link: usize,
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnIndex, ImportError> {
    let find = |name: &'static str| -> Result<usize, ImportError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(ImportError::MissingColumn(name))
    };
    // Probed in REQUIRED_COLUMNS order so the first missing column is the one
    // reported.
    Ok(ColumnIndex {
        title: find("title")?,
        author: find("author")?,
        date: find("date")?,
        views: find("views")?,
        likes: find("likes")?,
        link: find("link")?,
    })
}

fn parse_row(record: &csv::StringRecord, columns: &ColumnIndex) -> Result<NewTalk, String> {
    let title = required_text(record.get(columns.title), "title")?;
    let author = required_text(record.get(columns.author), "author")?;
    let date = parse_month_year(record.get(columns.date).unwrap_or(""))?;
    let views = required_count(record.get(columns.views), "views")?;
    let likes = required_count(record.get(columns.likes), "likes")?;
    let link = required_text(record.get(columns.link), "link")?;

    Ok(NewTalk {
        title,
        author,
        date,
        views,
        likes,
        link,
    })
}

fn required_text(value: Option<&str>, field: &str) -> Result<String, String> {
    let trimmed = value.unwrap_or("").trim();
    if trimmed.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn required_count(value: Option<&str>, field: &str) -> Result<i64, String> {
    let raw = value.unwrap_or("");
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| format!("{field} must be a valid number, got: {raw}"))
}

/// Parse a "January 2023"-style cell into the first day of that month.
///
/// Month names are matched case-sensitively against the English full names;
/// "january 2023" is rejected, "January 2023" is not.
fn parse_month_year(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("date cannot be empty".to_string());
    }

    let invalid = || format!("Invalid date format '{raw}', expected {DATE_PATTERN}");

    // Exactly one ASCII space between month and year; tabs, doubled spaces,
    // and unicode whitespace are all malformed.
    let Some((month_name, year_text)) = trimmed.split_once(' ') else {
        return Err(invalid());
    };

    let month = MONTH_NAMES
        .iter()
        .position(|m| *m == month_name)
        .ok_or_else(invalid)? as u32
        + 1;

    if year_text.len() != 4 || !year_text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: i32 = year_text.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "title,author,date,views,likes,link";

    fn csv_with_rows(rows: &[&str]) -> Vec<u8> {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out.into_bytes()
    }

    fn parse(rows: &[&str]) -> Result<CsvBatch, ImportError> {
        parse_csv("talks.csv", &csv_with_rows(rows), MAX_IMPORT_BYTES)
    }

    #[test]
    fn accepts_lowercase_and_uppercase_csv_extension() {
        assert!(is_csv_filename("report.csv"));
        assert!(is_csv_filename("report.CSV"));
    }

    #[test]
    fn rejects_other_extensions() {
        assert!(!is_csv_filename("report.csv.txt"));
        assert!(!is_csv_filename("report.Csv"));
        assert!(!is_csv_filename("report.txt"));
        assert!(!is_csv_filename(""));
    }

    #[test]
    fn bad_extension_fails_before_parsing() {
        let err = parse_csv("talks.txt", b"not even csv", MAX_IMPORT_BYTES).unwrap_err();
        assert!(matches!(err, ImportError::InvalidFileFormat(ref f) if f == "talks.txt"));
    }

    #[test]
    fn oversized_content_is_rejected() {
        let content = csv_with_rows(&["A talk,Jane Doe,January 2023,10,1,http://x"]);
        let err = parse_csv("talks.csv", &content, 8).unwrap_err();
        assert!(matches!(
            err,
            ImportError::FileTooLarge { limit: 8, size } if size == content.len()
        ));
    }

    #[test]
    fn missing_required_column_fails_whole_import() {
        let content = b"title,author,date,views,likes\nA,Jane,January 2023,10,1".to_vec();
        let err = parse_csv("talks.csv", &content, MAX_IMPORT_BYTES).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn("link")));
    }

    #[test]
    fn extra_and_reordered_columns_are_tolerated() {
        let content =
            b"link,extra,views,title,likes,author,date\nhttp://x,zzz,100,A talk,10,Jane,March 2021"
                .to_vec();
        let batch = parse_csv("talks.csv", &content, MAX_IMPORT_BYTES).unwrap();
        assert_eq!(batch.talks.len(), 1);
        let talk = &batch.talks[0];
        assert_eq!(talk.title, "A talk");
        assert_eq!(talk.author, "Jane");
        assert_eq!(talk.date, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
        assert_eq!(talk.views, 100);
        assert_eq!(talk.likes, 10);
        assert_eq!(talk.link, "http://x");
    }

    #[test]
    fn header_only_file_is_a_total_failure() {
        let err = parse(&[]).unwrap_err();
        assert!(matches!(err, ImportError::NoValidRecords));
    }

    #[test]
    fn all_rows_invalid_is_a_total_failure() {
        let err = parse(&[
            ",Jane,January 2023,10,1,http://x",
            "A talk,Jane,not-a-date,10,1,http://x",
        ])
        .unwrap_err();
        assert!(matches!(err, ImportError::NoValidRecords));
    }

    #[test]
    fn empty_content_reports_missing_column() {
        let err = parse_csv("talks.csv", b"", MAX_IMPORT_BYTES).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn("title")));
    }

    #[test]
    fn valid_rows_parse_with_trimming_and_date_normalization() {
        let batch = parse(&["  A talk  , Jane Doe ,January 2023, 1000 , 100 , http://x "]).unwrap();
        assert_eq!(batch.skipped, 0);
        assert!(batch.warnings.is_empty());
        let talk = &batch.talks[0];
        assert_eq!(talk.title, "A talk");
        assert_eq!(talk.author, "Jane Doe");
        assert_eq!(talk.date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(talk.views, 1000);
        assert_eq!(talk.likes, 100);
        assert_eq!(talk.link, "http://x");
    }

    #[test]
    fn empty_required_field_skips_row_with_reason() {
        let batch = parse(&[
            ",Jane,January 2023,10,1,http://x",
            "A talk,Jane,January 2023,10,1,http://x",
        ])
        .unwrap();
        assert_eq!(batch.talks.len(), 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.warnings.len(), 1);
        assert_eq!(batch.warnings[0], "row 2: title cannot be empty");
    }

    #[test]
    fn non_numeric_views_skips_row_and_names_the_raw_value() {
        let batch = parse(&[
            "Talk,Author,January 2023,abcd,10,http://x",
            "Talk,Author,January 2023,100,10,http://x",
        ])
        .unwrap();
        assert_eq!(batch.talks.len(), 1);
        assert_eq!(batch.skipped, 1);
        let warning = &batch.warnings[0];
        assert!(warning.contains("must be a valid number"), "{warning}");
        assert!(warning.contains("abcd"), "{warning}");
        assert!(warning.starts_with("row 2:"), "{warning}");
    }

    #[test]
    fn decimal_and_scientific_counts_are_rejected() {
        let batch = parse(&[
            "Talk,Author,January 2023,1.5,10,http://x",
            "Talk,Author,January 2023,1e3,10,http://x",
            "Talk,Author,January 2023,100,10,http://x",
        ])
        .unwrap();
        assert_eq!(batch.talks.len(), 1);
        assert_eq!(batch.skipped, 2);
    }

    #[test]
    fn negative_counts_are_preserved_as_is() {
        // Negative views/likes are never rejected at parse time; the source
        // behaved the same way.
        let batch = parse(&["Talk,Author,January 2023,-5,-1,http://x"]).unwrap();
        assert_eq!(batch.talks[0].views, -5);
        assert_eq!(batch.talks[0].likes, -1);
    }

    #[test]
    fn full_i64_range_is_accepted() {
        let row = format!("Talk,Author,January 2023,{},{},http://x", i64::MAX, i64::MIN);
        let batch = parse(&[&row]).unwrap();
        assert_eq!(batch.talks[0].views, i64::MAX);
        assert_eq!(batch.talks[0].likes, i64::MIN);
    }

    #[test]
    fn bad_date_format_skips_with_pattern_in_reason() {
        let batch = parse(&[
            "Talk,Author,abcd,100,10,http://x",
            "Talk,Author,January 2023,100,10,http://x",
        ])
        .unwrap();
        assert_eq!(batch.skipped, 1);
        assert_eq!(
            batch.warnings[0],
            "row 2: Invalid date format 'abcd', expected MMMM yyyy"
        );
    }

    #[test]
    fn month_name_match_is_case_sensitive() {
        let batch = parse(&[
            "Talk,Author,january 2023,100,10,http://x",
            "Talk,Author,JANUARY 2023,100,10,http://x",
            "Talk,Author,January 2023,100,10,http://x",
        ])
        .unwrap();
        assert_eq!(batch.talks.len(), 1);
        assert_eq!(batch.skipped, 2);
    }

    #[test]
    fn month_year_separator_must_be_a_single_space() {
        let batch = parse(&[
            "Talk,Author,January  2023,100,10,http://x",
            "Talk,Author,January\t2023,100,10,http://x",
            "Talk,Author,January\u{a0}2023,100,10,http://x",
            "Talk,Author,January 2023,100,10,http://x",
        ])
        .unwrap();
        assert_eq!(batch.talks.len(), 1);
        assert_eq!(batch.skipped, 3);
        assert!(batch.warnings[0].contains("Invalid date format 'January  2023'"));
    }

    #[test]
    fn two_digit_year_is_rejected() {
        let batch = parse(&[
            "Talk,Author,January 23,100,10,http://x",
            "Talk,Author,January 2023,100,10,http://x",
        ])
        .unwrap();
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn every_month_name_parses() {
        for (i, month) in MONTH_NAMES.iter().enumerate() {
            let row = format!("Talk,Author,{month} 2020,1,1,http://x");
            let batch = parse(&[&row]).unwrap();
            assert_eq!(
                batch.talks[0].date,
                NaiveDate::from_ymd_opt(2020, i as u32 + 1, 1).unwrap(),
                "month {month}"
            );
        }
    }

    #[test]
    fn short_row_counts_as_empty_fields() {
        let batch = parse(&[
            "Talk,Author,January 2023",
            "Talk,Author,January 2023,100,10,http://x",
        ])
        .unwrap();
        assert_eq!(batch.skipped, 1);
        assert!(batch.warnings[0].contains("cannot be empty"));
    }

    #[test]
    fn skipped_count_always_matches_warning_count() {
        let batch = parse(&[
            "Talk,Author,January 2023,100,10,http://x",
            ",,,,,",
            "Talk,Author,bad date,100,10,http://x",
            "Talk,,January 2023,100,10,http://x",
            "Talk,Author,February 2023,200,20,http://x",
        ])
        .unwrap();
        assert_eq!(batch.talks.len(), 2);
        assert_eq!(batch.skipped, 3);
        assert_eq!(batch.warnings.len() as u64, batch.skipped);
    }

    #[test]
    fn warnings_preserve_file_order() {
        let batch = parse(&[
            "Talk,Author,January 2023,100,10,http://x",
            ",Jane,January 2023,10,1,http://x",
            "Talk,Author,nope,100,10,http://x",
        ])
        .unwrap();
        assert!(batch.warnings[0].starts_with("row 3:"));
        assert!(batch.warnings[1].starts_with("row 4:"));
    }

    #[test]
    fn outcome_collapses_to_success_when_nothing_skipped() {
        let outcome = ImportOutcome::new(4, 0, Vec::new());
        assert_eq!(outcome, ImportOutcome::Success { imported: 4 });
        assert_eq!(outcome.imported(), 4);
        assert_eq!(outcome.skipped(), 0);
        assert!(outcome.warnings().is_empty());
    }

    #[test]
    fn outcome_is_partial_when_rows_were_skipped() {
        let outcome = ImportOutcome::new(3, 2, vec!["row 2: x".into(), "row 5: y".into()]);
        assert_eq!(outcome.imported(), 3);
        assert_eq!(outcome.skipped(), 2);
        assert_eq!(outcome.warnings().len(), 2);
    }
}
