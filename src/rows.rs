//! CSV rows as field lists.
//!
//! Column headers name the question. A `(choice)` suffix makes the column a
//! radio choice, `(multi)` a checkbox list with `;`-separated values;
//! everything else is typed text. Blank cells are skipped.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::Result;
use crate::field::{FieldKind, FieldSpec, FieldValue};

/// How a column is filled, parsed from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub label: String,
    pub kind: FieldKind,
}

impl Column {
    pub fn parse(header: &str) -> Self {
        let header = header.trim();
        for (suffix, kind) in [("(choice)", FieldKind::Choice), ("(multi)", FieldKind::Checkbox)] {
            if let Some(label) = strip_suffix_ignore_case(header, suffix) {
                return Self { label: label.trim().to_string(), kind };
            }
        }
        Self { label: header.to_string(), kind: FieldKind::Text }
    }

    fn value(&self, cell: &str) -> Option<FieldValue> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        match self.kind {
            FieldKind::Checkbox => {
                let items: Vec<String> = cell
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                (!items.is_empty()).then_some(FieldValue::List(items))
            }
            _ => Some(FieldValue::Text(cell.to_string())),
        }
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = s.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Turn one record into fields, in column order.
pub fn row_fields(columns: &[Column], record: &StringRecord) -> Vec<FieldSpec> {
    columns
        .iter()
        .zip(record.iter())
        .filter(|(column, _)| !column.label.is_empty())
        .filter_map(|(column, cell)| {
            column
                .value(cell)
                .map(|value| FieldSpec::new(column.label.clone(), column.kind.clone(), value))
        })
        .collect()
}

/// Read rows from any reader. `limit` of 0 means all rows.
pub fn read_rows_from<R: Read>(reader: R, limit: usize) -> Result<Vec<Vec<FieldSpec>>> {
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).flexible(true).from_reader(reader);
    let columns: Vec<Column> = reader.headers()?.iter().map(Column::parse).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        if limit > 0 && rows.len() >= limit {
            break;
        }
        rows.push(row_fields(&columns, &record?));
    }
    Ok(rows)
}

/// Read rows from a CSV file.
pub fn read_rows(path: impl AsRef<Path>, limit: usize) -> Result<Vec<Vec<FieldSpec>>> {
    let file = std::fs::File::open(path)?;
    read_rows_from(file, limit)
}
