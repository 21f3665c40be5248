//! Tolerant CSV table reader: BOM and lossy UTF-8, sniffed delimiter,
//! normalized headers, alias-based column lookup.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::errors::PipelineError;

const CANDIDATE_DELIMITERS: &[u8] = b",;\t|";

/// A CSV file read fully into memory with normalized headers.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub file: String,
    pub headers: Vec<String>,
    /// Data records paired with their 1-based line number in the file.
    pub rows: Vec<(u64, StringRecord)>,
}

impl RawTable {
    /// A file with no header line at all. Treated as a valid, empty source.
    pub fn is_blank(&self) -> bool {
        self.headers.is_empty()
    }

    /// Index of the first header matching one of `aliases`.
    pub fn column(&self, aliases: &[&'static str]) -> Result<usize, PipelineError> {
        self.optional_column(aliases)
            .ok_or_else(|| PipelineError::MissingColumn {
                file: self.file.clone(),
                aliases: aliases.to_vec(),
                found: self.headers.clone(),
            })
    }

    pub fn optional_column(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }
}

/// Reads `path` into a [`RawTable`].
pub fn read_table(path: &Path) -> Result<RawTable, PipelineError> {
    let bytes = std::fs::read(path).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string();

    parse_table(file, &String::from_utf8_lossy(&bytes))
}

pub fn parse_table(file: String, content: &str) -> Result<RawTable, PipelineError> {
    let content = content.trim_start_matches('\u{feff}');
    let Some(header_line) = content.lines().find(|l| !l.trim().is_empty()) else {
        return Ok(RawTable {
            file,
            headers: Vec::new(),
            rows: Vec::new(),
        });
    };
    let delimiter = sniff_delimiter(header_line);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| PipelineError::Csv {
            file: file.clone(),
            source,
        })?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| PipelineError::Csv {
            file: file.clone(),
            source,
        })?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows.push((line, record));
    }

    Ok(RawTable {
        file,
        headers,
        rows,
    })
}

/// Picks the most frequent candidate delimiter in the header line, `,` if none occur.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    CANDIDATE_DELIMITERS
        .iter()
        .map(|&d| (d, header_line.bytes().filter(|&b| b == d).count()))
        .filter(|&(_, n)| n > 0)
        // max_by_key keeps the last maximum; reverse so ',' wins ties
        .rev()
        .max_by_key(|&(_, n)| n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// `" Client Code "` → `"client_code"`, `"amount-kzt"` → `"amount_kzt"`.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace([' ', '-'], "_")
}
