//! Excel workbook reading for imports.
//!
//! Behavior:
//! - picks the named sheet if provided, otherwise the first sheet
//! - detects the first non-empty row as the header row
//! - infers column types from the cells (int/float/bool/string), with empty
//!   cells mapping to null

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;

use crate::error::{Result, TabverError};

/// Read one sheet of a workbook (`.xlsx`, `.xls`, `.ods`, ...) into a
/// [`DataFrame`].
pub fn read_workbook(path: impl AsRef<Path>, sheet: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| TabverError::invalid("workbook has no sheets"))?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    sheet_to_frame(&range)
}

/// Convert a worksheet cell range into a [`DataFrame`].
///
/// Columns whose header cell is empty are skipped; everything after the
/// header row becomes data.
fn sheet_to_frame(range: &calamine::Range<Data>) -> Result<DataFrame> {
    let (header_row_idx, headers) = find_header_row(range)?;

    let mut cells: Vec<Vec<AnyValue<'static>>> = vec![Vec::new(); headers.len()];
    for (idx0, row) in range.rows().enumerate() {
        if idx0 <= header_row_idx {
            continue;
        }
        for (col_idx, _) in headers.iter().enumerate() {
            let cell = row.get(col_idx).unwrap_or(&Data::Empty);
            cells[col_idx].push(cell_to_any_value(cell));
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, values)| {
            Series::from_any_values(name.as_str().into(), &values, false)
                .map(|s| s.into_column())
        })
        .collect::<PolarsResult<Vec<Column>>>()?;

    if columns.is_empty() {
        return Err(TabverError::invalid("sheet has no named header columns"));
    }

    Ok(DataFrame::new(columns)?)
}

fn find_header_row(range: &calamine::Range<Data>) -> Result<(usize, Vec<String>)> {
    for (idx0, row) in range.rows().enumerate() {
        if row.iter().any(|c| !matches!(c, Data::Empty)) {
            let headers = row.iter().map(cell_to_header_string).collect();
            return Ok((idx0, headers));
        }
    }
    Err(TabverError::invalid(
        "sheet has no non-empty rows (no header row found)",
    ))
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

fn cell_to_any_value(c: &Data) -> AnyValue<'static> {
    match c {
        Data::Empty => AnyValue::Null,
        Data::String(s) => AnyValue::StringOwned(s.as_str().into()),
        Data::Int(i) => AnyValue::Int64(*i),
        Data::Float(f) => AnyValue::Float64(*f),
        Data::Bool(b) => AnyValue::Boolean(*b),
        // Serial date number; importing as the raw float keeps it lossless.
        Data::DateTime(dt) => AnyValue::Float64(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => AnyValue::StringOwned(s.as_str().into()),
        // Cell-level errors (#DIV/0! and friends) import as missing values.
        Data::Error(_) => AnyValue::Null,
    }
}
