//! CSV format with row and cell splitters.

use super::{FormatDefinition, FormatSettings, Subvalue, SubvalueDefinition};
use crate::errors::PromptflowError;
use ::csv::{ReaderBuilder, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// CSV dialect.
///
/// Blank lines are never records; a row holding one empty field is
/// written as `""` so it survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvSettings {
    /// Field delimiter.
    pub delimiter: char,
    /// Quote character.
    pub quote_char: char,
    /// Record separator used when writing: `\n`, `\r\n` or one ASCII character.
    pub newline: String,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote_char: '"',
            newline: "\n".to_string(),
        }
    }
}

/// A parsed CSV document; the first record is always the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    /// Column names.
    pub header: Vec<String>,
    /// Data records, each as long as the header.
    pub rows: Vec<Vec<String>>,
}

fn csv_error(message: impl Into<String>) -> PromptflowError {
    PromptflowError::execution(message)
}

fn ascii_byte(c: char, what: &str) -> Result<u8, PromptflowError> {
    if c.is_ascii() {
        u8::try_from(u32::from(c)).map_err(|_| csv_error(format!("CSV {what} must be ASCII")))
    } else {
        Err(csv_error(format!("CSV {what} `{c}` must be ASCII")))
    }
}

fn terminator(newline: &str) -> Result<Terminator, PromptflowError> {
    match newline {
        "\r\n" => Ok(Terminator::CRLF),
        _ => {
            let mut chars = newline.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Terminator::Any(ascii_byte(c, "newline")?)),
                _ => Err(csv_error(format!(
                    "CSV newline {newline:?} must be one character or \\r\\n"
                ))),
            }
        }
    }
}

fn read_error(error: &::csv::Error) -> PromptflowError {
    match error.kind() {
        ::csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => csv_error(format!(
            "CSV row {} has {len} fields but the header has {expected_len}",
            pos.as_ref().map_or(0, ::csv::Position::record)
        )),
        _ => csv_error(format!("Invalid CSV: {error}")),
    }
}

/// Parses a CSV document with a header record.
///
/// # Errors
///
/// Returns an error for a record whose field count differs from the header,
/// invalid UTF-8 or a dialect that is not ASCII.
pub fn parse_csv(value: &str, settings: &CsvSettings) -> Result<CsvTable, PromptflowError> {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(false)
        .delimiter(ascii_byte(settings.delimiter, "delimiter")?)
        .quote(ascii_byte(settings.quote_char, "quote")?);
    if settings.newline != "\n" {
        builder.terminator(terminator(&settings.newline)?);
    }

    let mut reader = builder.from_reader(value.as_bytes());
    let mut records = reader.records();

    let Some(header) = records.next() else {
        return Ok(CsvTable::default());
    };
    let header: Vec<String> = header
        .map_err(|e| read_error(&e))?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = records
        .map(|record| {
            record
                .map(|record| record.iter().map(str::to_string).collect())
                .map_err(|e| read_error(&e))
        })
        .collect::<Result<Vec<Vec<String>>, _>>()?;

    Ok(CsvTable { header, rows })
}

/// Serializes a table, header first, without a trailing newline.
///
/// # Errors
///
/// Returns an error for a dialect that is not ASCII or records of unequal
/// length.
pub fn unparse_csv(table: &CsvTable, settings: &CsvSettings) -> Result<String, PromptflowError> {
    let mut writer = WriterBuilder::new()
        .flexible(false)
        .delimiter(ascii_byte(settings.delimiter, "delimiter")?)
        .quote(ascii_byte(settings.quote_char, "quote")?)
        .terminator(terminator(&settings.newline)?)
        .from_writer(Vec::new());

    for record in std::iter::once(&table.header).chain(table.rows.iter()) {
        writer
            .write_record(record)
            .map_err(|e| csv_error(format!("Can not write CSV: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv_error(format!("Can not write CSV: {}", e.error())))?;
    let written =
        String::from_utf8(bytes).map_err(|e| PromptflowError::unexpected(e.to_string()))?;

    Ok(written
        .strip_suffix(settings.newline.as_str())
        .unwrap_or(&written)
        .to_string())
}

/// CSV documents with a header record.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    subvalues: Vec<Arc<dyn SubvalueDefinition>>,
}

impl CsvFormat {
    /// Creates the format with its `ROW` and `CELL` splitters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subvalues: vec![Arc::new(CsvRows), Arc::new(CsvCells)],
        }
    }
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatDefinition for CsvFormat {
    fn format_name(&self) -> &str {
        "CSV"
    }

    fn mime_type(&self) -> &str {
        "text/csv"
    }

    fn is_valid(&self, value: &str, settings: &FormatSettings) -> bool {
        parse_csv(value, &settings.csv).is_ok()
    }

    fn subvalue_definitions(&self) -> &[Arc<dyn SubvalueDefinition>] {
        &self.subvalues
    }
}

/// Iterates records; each result becomes a new column.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRows;

impl SubvalueDefinition for CsvRows {
    fn subvalue_name(&self) -> &str {
        "ROW"
    }

    fn aliases(&self) -> &[&str] {
        &["ROWS"]
    }

    fn split(&self, value: &str, settings: &FormatSettings) -> Result<Vec<Subvalue>, PromptflowError> {
        let table = parse_csv(value, &settings.csv)?;

        Ok(table
            .rows
            .iter()
            .map(|row| table.header.iter().cloned().zip(row.iter().cloned()).collect())
            .collect())
    }

    fn join(
        &self,
        value: &str,
        results: Vec<String>,
        output_parameter_name: &str,
        settings: &FormatSettings,
    ) -> Result<String, PromptflowError> {
        let mut table = parse_csv(value, &settings.csv)?;

        if table.header.iter().any(|column| column == output_parameter_name) {
            return Err(csv_error(format!(
                "Can not overwrite existing column \"{output_parameter_name}\" in CSV row"
            )));
        }
        if results.len() != table.rows.len() {
            return Err(PromptflowError::unexpected(format!(
                "Got {} results for {} CSV rows",
                results.len(),
                table.rows.len()
            )));
        }

        table.header.push(output_parameter_name.to_string());
        for (row, result) in table.rows.iter_mut().zip(results) {
            row.push(result);
        }

        unparse_csv(&table, &settings.csv)
    }
}

/// Iterates every cell in row-major order; each result replaces its cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCells;

impl SubvalueDefinition for CsvCells {
    fn subvalue_name(&self) -> &str {
        "CELL"
    }

    fn aliases(&self) -> &[&str] {
        &["CELLS"]
    }

    fn split(&self, value: &str, settings: &FormatSettings) -> Result<Vec<Subvalue>, PromptflowError> {
        let table = parse_csv(value, &settings.csv)?;

        Ok(table
            .rows
            .iter()
            .flat_map(|row| {
                table.header.iter().zip(row.iter()).map(|(column, cell)| {
                    let mut subvalue = Subvalue::new();
                    subvalue.insert(column.clone(), cell.clone());
                    subvalue
                })
            })
            .collect())
    }

    fn join(
        &self,
        value: &str,
        results: Vec<String>,
        _output_parameter_name: &str,
        settings: &FormatSettings,
    ) -> Result<String, PromptflowError> {
        let mut table = parse_csv(value, &settings.csv)?;
        let cell_count = table.rows.len() * table.header.len();

        if results.len() != cell_count {
            return Err(PromptflowError::unexpected(format!(
                "Got {} results for {cell_count} CSV cells",
                results.len()
            )));
        }

        let mut results = results.into_iter();
        for cell in table.rows.iter_mut().flatten() {
            if let Some(result) = results.next() {
                *cell = result;
            }
        }

        unparse_csv(&table, &settings.csv)
    }
}
