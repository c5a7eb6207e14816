//! Raw tabular file reading.
//!
//! Both readers produce the same shape: a header row plus string cells.
//! All typing decisions (integer geozips, float percentiles) happen later in
//! the normalizer, so CSV text and spreadsheet cells go through one path.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::IngestError;

/// One source file as read: headers verbatim, every cell as text.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "csv" => Self::from_csv(path),
            "xlsx" | "xls" | "xlsb" | "ods" => Self::from_workbook(path),
            other => Err(IngestError::Read {
                file: display_name(path),
                message: format!("unsupported file extension '{other}'"),
            }),
        }
    }

    fn from_csv(path: &Path) -> Result<Self, IngestError> {
        let read_error = |message: String| IngestError::Read {
            file: display_name(path),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|error| read_error(error.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|error| read_error(error.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|error| read_error(error.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    fn from_workbook(path: &Path) -> Result<Self, IngestError> {
        let read_error = |message: String| IngestError::Read {
            file: display_name(path),
            message,
        };

        let mut workbook =
            open_workbook_auto(path).map_err(|error| read_error(error.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| read_error(String::from("workbook has no sheets")))?
            .map_err(|error| read_error(error.to_string()))?;

        let mut row_iter = range.rows();
        let headers = match row_iter.next() {
            Some(row) => row.iter().map(cell_to_string).collect(),
            None => Vec::new(),
        };
        let rows = row_iter
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        Ok(Self { headers, rows })
    }
}

/// Text rendering of a spreadsheet cell. Float display already drops a
/// whole-number's fractional part, so `99213.0` in a numeric cell reads as
/// `"99213"`; text cells keep whatever artifact they carry for the
/// normalizer to strip.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(value) => value.clone(),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        other => other.to_string(),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
