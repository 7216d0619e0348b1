//! Spreadsheet row normalization for the personnel import
//!
//! Columns are matched case-insensitively: `matricula`, `nome`,
//! `funcao` (or `cargo`), `setor`, `email`. Rows without a registration
//! number or a name are dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ImportError;

/// One normalized import row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub matricula: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "funcao", default)]
    pub function: String,
    #[serde(rename = "setor", default)]
    pub sector_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Matricula,
    Name,
    Function,
    Sector,
    Email,
}

/// Column a header maps to, with its alias rank (lower wins)
fn column_for(header: &str) -> Option<(Column, u8)> {
    match header.trim().to_lowercase().as_str() {
        "matricula" => Some((Column::Matricula, 0)),
        "matrícula" => Some((Column::Matricula, 1)),
        "nome" => Some((Column::Name, 0)),
        "funcao" => Some((Column::Function, 0)),
        "função" => Some((Column::Function, 1)),
        "cargo" => Some((Column::Function, 2)),
        "setor" => Some((Column::Sector, 0)),
        "email" => Some((Column::Email, 0)),
        "e-mail" => Some((Column::Email, 1)),
        _ => None,
    }
}

#[derive(Default)]
struct Cell {
    rank: u8,
    value: String,
}

#[derive(Default)]
struct RowBuilder {
    matricula: Cell,
    name: Cell,
    function: Cell,
    sector_name: Cell,
    email: Cell,
}

impl RowBuilder {
    /// Non-empty values only; a better-ranked alias replaces a worse one
    /// regardless of the order the columns arrive in.
    fn set(&mut self, (column, rank): (Column, u8), value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let cell = match column {
            Column::Matricula => &mut self.matricula,
            Column::Name => &mut self.name,
            Column::Function => &mut self.function,
            Column::Sector => &mut self.sector_name,
            Column::Email => &mut self.email,
        };
        if cell.value.is_empty() || rank < cell.rank {
            *cell = Cell {
                rank,
                value: value.to_string(),
            };
        }
    }

    fn build(self) -> Option<ImportRow> {
        if self.matricula.value.is_empty() || self.name.value.is_empty() {
            return None;
        }
        Some(ImportRow {
            matricula: self.matricula.value,
            name: self.name.value,
            function: self.function.value,
            sector_name: self.sector_name.value,
            email: Some(self.email.value).filter(|e| !e.is_empty()),
        })
    }
}

/// Spreadsheet exports from Brazilian locales use `;`
fn sniff_delimiter(input: &str) -> u8 {
    let header = input.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Parse CSV text into normalized rows
pub fn read_csv(input: &str) -> Result<Vec<ImportRow>, ImportError> {
    let input = input.trim_start_matches('\u{feff}');
    if input.trim().is_empty() {
        return Err(ImportError::MissingHeader);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(input))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let headers = reader.headers()?.clone();
    let columns: Vec<Option<(Column, u8)>> = headers.iter().map(column_for).collect();
    if columns.iter().all(Option::is_none) {
        return Err(ImportError::MissingHeader);
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let mut builder = RowBuilder::default();
        for (column, value) in columns.iter().zip(record.iter()) {
            if let Some(column) = column {
                builder.set(*column, value);
            }
        }
        match builder.build() {
            Some(row) => rows.push(row),
            None => debug!("Skipping import row {}: no matricula or name", idx + 2),
        }
    }
    Ok(rows)
}

/// Normalize rows already decoded elsewhere (e.g. from a binary workbook)
pub fn from_json_rows(raw: &[Map<String, Value>]) -> Vec<ImportRow> {
    raw.iter()
        .filter_map(|object| {
            let mut builder = RowBuilder::default();
            for (key, value) in object {
                if let Some(column) = column_for(key) {
                    builder.set(column, &cell_text(value));
                }
            }
            builder.build()
        })
        .collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
