//! Data Loader: resolves the three input files, parses them into typed records,
//! and accumulates data-quality warnings for every excluded row.

pub mod parse;
pub mod quality;
pub mod reader;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::ingest::parse::{non_blank, parse_amount, parse_count, parse_date, MalformedRow};
use crate::ingest::quality::{DataQualityReport, DateCoverage, Source, WarningKind};
use crate::ingest::reader::{read_table, RawTable};
use crate::models::activity::{Direction, Transaction, Transfer};
use crate::models::client::{Client, ClientId, ClientStatus};

pub const CLIENT_FILES: &[&str] = &["clients.csv"];
/// Singular spelling is accepted as a fallback.
pub const TRANSACTION_FILES: &[&str] = &["transactions.csv", "transaction.csv"];
pub const TRANSFER_FILES: &[&str] = &["transfers.csv"];

const CLIENT_ID: &[&str] = &["client_code", "client_id", "clientid", "id"];
const DATE: &[&str] = &["date", "дата", "timestamp"];
const AMOUNT: &[&str] = &["amount", "sum", "amount_kzt", "amt", "value", "сумма"];
const CATEGORY: &[&str] = &["category", "категория", "cat"];
const KIND: &[&str] = &["type", "тип"];
const DIRECTION: &[&str] = &["direction", "dir", "направление"];
const CURRENCY: &[&str] = &["currency", "валюта", "curr"];
const NAME: &[&str] = &["name", "имя"];
const SEGMENT: &[&str] = &["status", "segment", "статус"];
const AGE: &[&str] = &["age", "возраст"];
const CITY: &[&str] = &["city", "город"];
const BALANCE: &[&str] = &["avg_monthly_balance_kzt", "avg_monthly_balance", "balance"];

const DEFAULT_CURRENCY: &str = "KZT";

/// Everything the downstream stages need, loaded once.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub clients: Vec<Client>,
    pub transactions: Vec<Transaction>,
    pub transfers: Vec<Transfer>,
    pub quality: DataQualityReport,
}

/// Returns the first candidate that exists in `dir`.
pub fn resolve_input(
    dir: &Path,
    source_name: &'static str,
    candidates: &[&str],
) -> Result<PathBuf, PipelineError> {
    let tried: Vec<PathBuf> = candidates.iter().map(|c| dir.join(c)).collect();
    tried
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or(PipelineError::MissingInput { source_name, tried })
}

/// Loads clients, transactions and transfers from `dir`.
///
/// All three paths are resolved before any file is parsed so a missing input
/// aborts the run before any processing.
pub fn load_dataset(dir: &Path) -> Result<Dataset, PipelineError> {
    let clients_path = resolve_input(dir, "clients", CLIENT_FILES)?;
    let transactions_path = resolve_input(dir, "transactions", TRANSACTION_FILES)?;
    let transfers_path = resolve_input(dir, "transfers", TRANSFER_FILES)?;

    let mut quality = DataQualityReport::default();

    let clients = load_clients(&read_table(&clients_path)?, &mut quality)?;
    let transactions = load_transactions(&read_table(&transactions_path)?, &mut quality)?;
    let transfers = load_transfers(&read_table(&transfers_path)?, &mut quality)?;

    info!(
        "Loaded {} clients, {} transactions ({}), {} transfers",
        clients.len(),
        transactions.len(),
        transactions_path.display(),
        transfers.len()
    );

    Ok(Dataset {
        clients,
        transactions,
        transfers,
        quality,
    })
}

fn cell<'a>(record: &'a StringRecord, idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| record.get(i))
}

fn require_client_id(record: &StringRecord, idx: usize) -> Result<ClientId, MalformedRow> {
    record
        .get(idx)
        .and_then(ClientId::parse)
        .ok_or_else(|| MalformedRow::new(WarningKind::MissingClientId, "client id is blank"))
}

fn require_text(
    record: &StringRecord,
    idx: usize,
    field: &str,
) -> Result<String, MalformedRow> {
    non_blank(record.get(idx))
        .ok_or_else(|| MalformedRow::new(WarningKind::MissingField, format!("{field} is blank")))
}

pub fn load_clients(
    table: &RawTable,
    quality: &mut DataQualityReport,
) -> Result<Vec<Client>, PipelineError> {
    if table.is_blank() {
        warn!("{} is empty, no clients to process", table.file);
        return Ok(Vec::new());
    }

    let id_col = table.column(CLIENT_ID)?;
    let name_col = table.optional_column(NAME);
    let segment_col = table.optional_column(SEGMENT);
    let age_col = table.optional_column(AGE);
    let city_col = table.optional_column(CITY);
    let balance_col = table.optional_column(BALANCE);

    let mut seen = HashSet::new();
    let mut clients = Vec::with_capacity(table.rows.len());

    for (line, record) in &table.rows {
        let id = match require_client_id(record, id_col) {
            Ok(id) => id,
            Err(row) => {
                quality.record(Source::Clients, *line, &row);
                continue;
            }
        };
        if !seen.insert(id.clone()) {
            let row = MalformedRow::new(
                WarningKind::DuplicateClient,
                format!("client {id} already loaded, keeping first row"),
            );
            quality.record(Source::Clients, *line, &row);
            continue;
        }

        let avg_monthly_balance = match non_blank(cell(record, balance_col)) {
            None => 0.0,
            Some(raw) => match parse_amount(&raw) {
                Ok(v) => v.max(0.0),
                Err(row) => {
                    // balance is optional: keep the client with a zero balance
                    quality.record(Source::Clients, *line, &row);
                    0.0
                }
            },
        };

        let segment = non_blank(cell(record, segment_col));
        clients.push(Client {
            status: ClientStatus::from_raw(segment.as_deref()),
            segment,
            name: non_blank(cell(record, name_col)),
            age: cell(record, age_col).and_then(parse_count),
            city: non_blank(cell(record, city_col)),
            avg_monthly_balance,
            id,
        });
    }

    Ok(clients)
}

pub fn load_transactions(
    table: &RawTable,
    quality: &mut DataQualityReport,
) -> Result<Vec<Transaction>, PipelineError> {
    if table.is_blank() {
        quality.record_date_coverage(Source::Transactions, DateCoverage::default());
        return Ok(Vec::new());
    }

    let id_col = table.column(CLIENT_ID)?;
    let date_col = table.column(DATE)?;
    let amount_col = table.column(AMOUNT)?;
    let category_col = table.column(CATEGORY)?;
    let currency_col = table.optional_column(CURRENCY);

    let mut coverage = DateCoverage::default();
    let mut out = Vec::with_capacity(table.rows.len());

    for (line, record) in &table.rows {
        coverage.total += 1;
        let date = record.get(date_col).map(parse_date);
        if matches!(date, Some(Ok(_))) {
            coverage.ok += 1;
        }

        let parsed = (|| -> Result<Transaction, MalformedRow> {
            let client_id = require_client_id(record, id_col)?;
            let amount = parse_amount(record.get(amount_col).unwrap_or(""))?;
            let date = date.unwrap_or_else(|| parse_date(""))?;
            let category = require_text(record, category_col, "category")?;
            Ok(Transaction {
                client_id,
                date,
                category,
                amount,
                currency: non_blank(cell(record, currency_col))
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            })
        })();

        match parsed {
            Ok(tx) => out.push(tx),
            Err(row) => quality.record(Source::Transactions, *line, &row),
        }
    }

    quality.record_date_coverage(Source::Transactions, coverage);
    Ok(out)
}

pub fn load_transfers(
    table: &RawTable,
    quality: &mut DataQualityReport,
) -> Result<Vec<Transfer>, PipelineError> {
    if table.is_blank() {
        quality.record_date_coverage(Source::Transfers, DateCoverage::default());
        return Ok(Vec::new());
    }

    let id_col = table.column(CLIENT_ID)?;
    let date_col = table.column(DATE)?;
    let amount_col = table.column(AMOUNT)?;
    let kind_col = table.column(KIND)?;
    let direction_col = table.column(DIRECTION)?;
    let currency_col = table.optional_column(CURRENCY);

    let mut coverage = DateCoverage::default();
    let mut out = Vec::with_capacity(table.rows.len());

    for (line, record) in &table.rows {
        coverage.total += 1;
        let date = record.get(date_col).map(parse_date);
        if matches!(date, Some(Ok(_))) {
            coverage.ok += 1;
        }

        let parsed = (|| -> Result<Transfer, MalformedRow> {
            let client_id = require_client_id(record, id_col)?;
            let amount = parse_amount(record.get(amount_col).unwrap_or(""))?;
            let date = date.unwrap_or_else(|| parse_date(""))?;
            let kind = require_text(record, kind_col, "type")?.to_lowercase();
            let raw_direction = record.get(direction_col).unwrap_or("");
            let direction = Direction::parse(raw_direction).ok_or_else(|| {
                MalformedRow::new(
                    WarningKind::InvalidDirection,
                    format!("'{raw_direction}' is neither in nor out"),
                )
            })?;
            Ok(Transfer {
                client_id,
                date,
                kind,
                direction,
                amount,
                currency: non_blank(cell(record, currency_col))
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            })
        })();

        match parsed {
            Ok(tr) => out.push(tr),
            Err(row) => quality.record(Source::Transfers, *line, &row),
        }
    }

    quality.record_date_coverage(Source::Transfers, coverage);
    Ok(out)
}
