//! Minimal reader for the comma-separated reports krkn-ai writes.
//!
//! Handles quoted fields (embedded commas, doubled quotes, line breaks) and
//! CRLF line endings. Columns are looked up by header name so reordered or
//! extra columns are tolerated.

use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// A parsed report: one header row plus data rows.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

/// A data row and the line it started on.
#[derive(Debug, Clone)]
pub struct Row {
    pub line: usize,
    fields: Vec<String>,
}

impl Table {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut records = parse_records(text)?.into_iter();
        let headers = match records.next() {
            Some((_, h)) => h.into_iter().map(|s| s.trim().to_string()).collect(),
            None => Vec::new(),
        };
        let rows = records
            .filter(|(_, fields)| !(fields.len() == 1 && fields[0].trim().is_empty()))
            .map(|(line, fields)| Row { line, fields })
            .collect();
        Ok(Self { headers, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

impl Row {
    /// Raw field at `idx`, trimmed; empty when the row is short.
    pub fn get(&self, idx: usize) -> &str {
        self.fields.get(idx).map(|s| s.trim()).unwrap_or("")
    }

    /// Parse the field at `idx`. Absent column or empty cell yields `default`.
    pub fn parse_or<T: FromStr>(&self, idx: Option<usize>, default: T) -> Result<T, String> {
        let Some(idx) = idx else { return Ok(default) };
        let raw = self.get(idx);
        if raw.is_empty() {
            return Ok(default);
        }
        raw.parse()
            .map_err(|_| format!("invalid value '{raw}' in column {}", idx + 1))
    }
}

fn parse_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, ParseError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut fields)));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ParseError {
            line: record_line,
            message: "unterminated quoted field".into(),
        });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }

    Ok(records)
}
