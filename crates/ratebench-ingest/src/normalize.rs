//! Column and row normalization.
//!
//! Header names are matched case/whitespace/`%`-insensitively: `" 95% "`,
//! `"95%"`, and `"95th"` all resolve to the `95th` percentile column. Rows
//! whose geozip cannot be coerced to an integer are dropped and counted; that
//! is a data-quality policy, not an error path.

use ratebench_core::{Percentiles, RateRow};

use crate::table::RawTable;
use crate::IngestError;

pub const REQUIRED_COLUMNS: [&str; 3] = ["geozip", "code", "product"];

/// Accepted description headers, in priority order. A file with none of them
/// still loads; the column is synthesized empty.
const DESCRIPTION_ALIASES: [&str; 3] = ["description", "full_description", "procedure_description"];

/// Literal cell values that mean "no modifier". The casings are exactly the
/// junk the source spreadsheets produce.
const MODIFIER_ABSENT_LITERALS: [&str; 4] = ["", "nan", "NaN", "None"];

const PERCENTILE_COLUMNS: [&str; 8] = ["50th", "60th", "70th", "75th", "80th", "85th", "90th", "95th"];

/// Canonical header form: trimmed, lowercased, spaces to underscores, `%` to
/// `th` (so a column literally named `95%` becomes `95th`).
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_").replace('%', "th")
}

#[derive(Debug, Clone)]
pub struct NormalizedFile {
    pub rows: Vec<RateRow>,
    pub dropped: usize,
}

pub fn normalize_table(table: &RawTable, source_file: &str) -> Result<NormalizedFile, IngestError> {
    let headers: Vec<String> = table
        .headers
        .iter()
        .map(|header| normalize_header(header))
        .collect();
    let column = |name: &str| headers.iter().position(|header| header == name);

    let (geozip_idx, code_idx, product_idx) =
        match (column("geozip"), column("code"), column("product")) {
            (Some(geozip), Some(code), Some(product)) => (geozip, code, product),
            (geozip, code, product) => {
                let mut columns = Vec::new();
                if geozip.is_none() {
                    columns.push(String::from("geozip"));
                }
                if code.is_none() {
                    columns.push(String::from("code"));
                }
                if product.is_none() {
                    columns.push(String::from("product"));
                }
                columns.sort();
                return Err(IngestError::Schema {
                    file: source_file.to_string(),
                    columns,
                });
            }
        };

    let description_idx = DESCRIPTION_ALIASES.iter().find_map(|alias| column(alias));
    let modifier_idx = column("modifier");
    let percentile_idx: Vec<Option<usize>> =
        PERCENTILE_COLUMNS.iter().map(|name| column(name)).collect();

    let mut rows = Vec::new();
    let mut dropped = 0;
    for raw_row in &table.rows {
        let cell = |index: usize| raw_row.get(index).map(String::as_str).unwrap_or_default();

        let Some(geozip) = parse_geozip(cell(geozip_idx)) else {
            dropped += 1;
            continue;
        };

        let amount = |slot: usize| percentile_idx[slot].and_then(|index| parse_amount(cell(index)));

        rows.push(RateRow {
            geozip,
            code: normalize_code(cell(code_idx)),
            modifier: modifier_idx.and_then(|index| clean_modifier(cell(index))),
            product: cell(product_idx).trim().to_string(),
            description: description_idx
                .map(|index| cell(index).to_string())
                .unwrap_or_default(),
            percentiles: Percentiles {
                p50: amount(0),
                p60: amount(1),
                p70: amount(2),
                p75: amount(3),
                p80: amount(4),
                p85: amount(5),
                p90: amount(6),
                p95: amount(7),
            },
            source_file: source_file.to_string(),
        });
    }

    Ok(NormalizedFile { rows, dropped })
}

/// Trim and strip the trailing `.0` artifact numeric spreadsheet cells leave
/// on code text.
fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

/// Integer coercion matching the loose typing of the source files: plain
/// integers and whole floats (`"75001.0"`) both pass.
fn parse_geozip(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value as i64)
}

fn clean_modifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if MODIFIER_ABSENT_LITERALS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse().ok()
}
