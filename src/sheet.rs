//! Retrieval and parsing of the published plan spreadsheet.

use crate::normalize::{ExerciseRecord, normalize_rows};

/// One parsed CSV line as `(header, value)` pairs in column order.
pub type RawRow = Vec<(String, String)>;

#[derive(Debug)]
pub enum SheetError {
    Http(u16, String),
    Network(Box<dyn std::error::Error + Send + Sync>),
    Parse(csv::Error),
    Url(url::ParseError),
    DataEmpty,
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::Http(status, _) => write!(f, "HTTP {status}"),
            SheetError::Network(e) => write!(f, "Falha de rede: {e}"),
            SheetError::Parse(e) => write!(f, "Planilha inválida: {e}"),
            SheetError::Url(e) => write!(f, "URL da planilha inválida: {e}"),
            SheetError::DataEmpty => write!(f, "Planilha vazia"),
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetError::Http(..) | SheetError::DataEmpty => None,
            SheetError::Network(e) => Some(&**e),
            SheetError::Parse(e) => Some(e),
            SheetError::Url(e) => Some(e),
        }
    }
}

impl From<csv::Error> for SheetError {
    fn from(e: csv::Error) -> Self {
        SheetError::Parse(e)
    }
}

/// Download the raw CSV text behind `url`.
pub fn fetch_sheet(url: &str) -> Result<String, SheetError> {
    log::info!("Fetching sheet from {url}");
    match ureq::get(url).set("Accept", "text/csv").call() {
        Ok(r) => r
            .into_string()
            .map_err(|e| SheetError::Network(Box::new(e))),
        Err(ureq::Error::Status(code, r)) => {
            let body = r.into_string().unwrap_or_default();
            Err(SheetError::Http(code, body))
        }
        Err(e) => Err(SheetError::Network(Box::new(e))),
    }
}

/// Parse CSV text with a header row into header/value pairs.
///
/// Blank lines are skipped. Short records are accepted; missing trailing
/// cells simply do not appear in the row.
pub fn parse_rows(text: &str) -> Result<Vec<RawRow>, SheetError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    log::info!("Parsed {} rows from sheet", rows.len());
    Ok(rows)
}

/// Fetch, parse and normalize the sheet in one go.
///
/// Any failure leaves the caller without a dataset; rows that would have
/// parsed are not salvaged.
pub fn load_dataset(url: &str) -> Result<Vec<ExerciseRecord>, SheetError> {
    let text = fetch_sheet(url)?;
    let rows = parse_rows(&text)?;
    normalize_rows(&rows)
}
