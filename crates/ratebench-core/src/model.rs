use std::fmt;

use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::ValidationError;

/// Benchmark price points published per rate row.
///
/// Amounts are stored as provided by the source file; the service performs no
/// arithmetic on them. An absent amount serializes as an empty string so the
/// wire shape matches what existing callers parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Percentiles {
    #[serde(rename = "50th", serialize_with = "serialize_amount")]
    pub p50: Option<f64>,
    #[serde(rename = "60th", serialize_with = "serialize_amount")]
    pub p60: Option<f64>,
    #[serde(rename = "70th", serialize_with = "serialize_amount")]
    pub p70: Option<f64>,
    #[serde(rename = "75th", serialize_with = "serialize_amount")]
    pub p75: Option<f64>,
    #[serde(rename = "80th", serialize_with = "serialize_amount")]
    pub p80: Option<f64>,
    #[serde(rename = "85th", serialize_with = "serialize_amount")]
    pub p85: Option<f64>,
    #[serde(rename = "90th", serialize_with = "serialize_amount")]
    pub p90: Option<f64>,
    #[serde(rename = "95th", serialize_with = "serialize_amount")]
    pub p95: Option<f64>,
}

fn serialize_amount<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(amount) => serializer.serialize_f64(*amount),
        None => serializer.serialize_str(""),
    }
}

/// One canonical stored rate row.
///
/// Invariant guaranteed by ingestion: `code` never carries a trailing `.0`
/// artifact, `modifier` is either a genuine value or `None` (never an empty or
/// junk literal), and `product` is always present (possibly empty).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRow {
    pub geozip: i64,
    pub code: String,
    pub modifier: Option<String>,
    pub product: String,
    pub description: String,
    #[serde(flatten)]
    pub percentiles: Percentiles,
    pub source_file: String,
}

/// Closed set of resolution outcomes.
///
/// The wire strings are load-bearing: existing callers branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchType {
    #[serde(rename = "Modifier-specific rate")]
    ModifierSpecific,
    #[serde(rename = "Base rate (no modifier)")]
    BaseNoModifier,
    #[serde(rename = "Base rate (modifier not on file)")]
    BaseModifierNotOnFile,
    #[serde(rename = "No match found")]
    NoMatch,
}

impl MatchType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModifierSpecific => "Modifier-specific rate",
            Self::BaseNoModifier => "Base rate (no modifier)",
            Self::BaseModifierNotOnFile => "Base rate (modifier not on file)",
            Self::NoMatch => "No match found",
        }
    }

    pub const fn is_match(self) -> bool {
        !matches!(self, Self::NoMatch)
    }

    /// Parse the wire string back into the enum, e.g. when reading audit
    /// rows.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "Modifier-specific rate" => Some(Self::ModifierSpecific),
            "Base rate (no modifier)" => Some(Self::BaseNoModifier),
            "Base rate (modifier not on file)" => Some(Self::BaseModifierNotOnFile),
            "No match found" => Some(Self::NoMatch),
            _ => None,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-request lookup key: one geozip, one or more codes, optional
/// modifier and product filter.
///
/// Codes keep their request order and may repeat; each occurrence is resolved
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupKey {
    pub geozip: i64,
    pub codes: Vec<String>,
    pub modifier: Option<String>,
    pub product: Option<String>,
}

impl LookupKey {
    /// Build a key from raw request values, trimming text fields and
    /// normalizing empty modifier/product to absent.
    pub fn new(
        geozip: i64,
        codes: Vec<String>,
        modifier: Option<String>,
        product: Option<String>,
    ) -> Result<Self, ValidationError> {
        let codes: Vec<String> = codes
            .into_iter()
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect();
        if codes.is_empty() {
            return Err(ValidationError::EmptyCodeList);
        }

        Ok(Self {
            geozip,
            codes,
            modifier: clean_optional(modifier),
            product: clean_optional(product),
        })
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// One resolved entry in a lookup response: either a stored row with its
/// match classification, or a no-match placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMatch {
    #[serde(flatten)]
    pub row: RateRow,
    pub match_type: MatchType,
}

impl ResolvedMatch {
    pub fn matched(row: RateRow, match_type: MatchType) -> Self {
        Self { row, match_type }
    }

    /// Placeholder guaranteeing one response entry per requested code even
    /// when nothing is on file. Percentiles stay absent and serialize as
    /// empty strings.
    pub fn placeholder(geozip: i64, code: &str, product_filter: Option<&str>) -> Self {
        Self {
            row: RateRow {
                geozip,
                code: code.to_string(),
                modifier: None,
                product: product_filter.unwrap_or_default().to_string(),
                description: String::new(),
                percentiles: Percentiles::default(),
                source_file: String::new(),
            },
            match_type: MatchType::NoMatch,
        }
    }
}

/// Append-only audit record, one per resolution attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupLogEntry {
    pub ts: String,
    pub geozip: i64,
    pub code: String,
    pub modifier: Option<String>,
    pub product: String,
    pub match_type: MatchType,
    pub success: bool,
}

impl LookupLogEntry {
    pub fn record(key: &LookupKey, code: &str, product: &str, match_type: MatchType) -> Self {
        Self {
            ts: now_rfc3339(),
            geozip: key.geozip,
            code: code.to_string(),
            modifier: key.modifier.clone(),
            product: product.to_string(),
            match_type,
            success: match_type.is_match(),
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
