//! Rate resolution: match precedence and fallback.
//!
//! For each requested code the resolver queries modifier-specific and base
//! rows, unions the product lines seen in either, and selects one row per
//! product by precedence:
//!
//! 1. modifier supplied and a modifier row exists for the product
//! 2. a base row exists for the product (fallback when the modifier is not
//!    on file)
//! 3. a modifier row without a base row (inconsistent data, served anyway)
//!
//! A code with nothing on file yields a single no-match placeholder, so the
//! response always carries at least one entry per requested code. No-match is
//! never a request-level failure; only store errors abort a lookup.

use std::collections::BTreeMap;

use crate::model::{LookupKey, LookupLogEntry, MatchType, RateRow, ResolvedMatch};
use crate::store::{RateStore, StoreError};

/// Everything one lookup produces: the ordered response entries plus one
/// audit record per resolution attempt. Writing the audit records is the
/// caller's concern so a slow sink never blocks resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOutcome {
    pub matches: Vec<ResolvedMatch>,
    pub log: Vec<LookupLogEntry>,
}

/// Resolve every code in the key, in request order, each independently.
pub fn resolve_lookup<S: RateStore + ?Sized>(
    store: &S,
    key: &LookupKey,
) -> Result<LookupOutcome, StoreError> {
    let mut outcome = LookupOutcome {
        matches: Vec::new(),
        log: Vec::new(),
    };

    for code in &key.codes {
        resolve_code(store, key, code, &mut outcome)?;
    }

    Ok(outcome)
}

fn resolve_code<S: RateStore + ?Sized>(
    store: &S,
    key: &LookupKey,
    code: &str,
    outcome: &mut LookupOutcome,
) -> Result<(), StoreError> {
    let product_filter = key.product.as_deref();

    let modifier_rows = match key.modifier.as_deref() {
        Some(modifier) => keyed_by_product(store.modifier_rates(
            key.geozip,
            code,
            modifier,
            product_filter,
        )?),
        None => BTreeMap::new(),
    };
    let base_rows = keyed_by_product(store.base_rates(key.geozip, code, product_filter)?);

    // Union of product lines seen in either query, iterated in sorted order
    // (BTreeMap keys; the empty product sorts first).
    let mut products: Vec<&String> = modifier_rows.keys().collect();
    for product in base_rows.keys() {
        if !modifier_rows.contains_key(product) {
            products.push(product);
        }
    }
    products.sort();

    if products.is_empty() {
        outcome
            .matches
            .push(ResolvedMatch::placeholder(key.geozip, code, product_filter));
        outcome.log.push(LookupLogEntry::record(
            key,
            code,
            product_filter.unwrap_or_default(),
            MatchType::NoMatch,
        ));
        return Ok(());
    }

    for product in products {
        let modifier_requested = key.modifier.is_some();
        let (row, match_type) = match (
            modifier_requested,
            modifier_rows.get(product),
            base_rows.get(product),
        ) {
            (true, Some(row), _) => (row, MatchType::ModifierSpecific),
            (false, _, Some(row)) => (row, MatchType::BaseNoModifier),
            (true, None, Some(row)) => (row, MatchType::BaseModifierNotOnFile),
            // A modifier row with no base row on file: serve it rather than
            // report no match.
            (_, Some(row), None) => (row, MatchType::ModifierSpecific),
            // Unreachable: every product came from one of the two maps.
            (_, None, None) => continue,
        };

        outcome.log.push(LookupLogEntry::record(key, code, product, match_type));
        outcome
            .matches
            .push(ResolvedMatch::matched(row.clone(), match_type));
    }

    Ok(())
}

fn keyed_by_product(rows: Vec<RateRow>) -> BTreeMap<String, RateRow> {
    rows.into_iter()
        .map(|row| (row.product.clone(), row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Percentiles;

    /// In-memory store backed by a plain row list, for exercising the
    /// resolution algorithm without a database.
    struct MemoryStore {
        rows: Vec<RateRow>,
    }

    impl RateStore for MemoryStore {
        fn modifier_rates(
            &self,
            geozip: i64,
            code: &str,
            modifier: &str,
            product_filter: Option<&str>,
        ) -> Result<Vec<RateRow>, StoreError> {
            Ok(self
                .rows
                .iter()
                .filter(|row| {
                    row.geozip == geozip
                        && row.code == code
                        && row.modifier.as_deref() == Some(modifier)
                        && product_filter.is_none_or(|product| row.product == product)
                })
                .cloned()
                .collect())
        }

        fn base_rates(
            &self,
            geozip: i64,
            code: &str,
            product_filter: Option<&str>,
        ) -> Result<Vec<RateRow>, StoreError> {
            Ok(self
                .rows
                .iter()
                .filter(|row| {
                    row.geozip == geozip
                        && row.code == code
                        && row.modifier.as_deref().unwrap_or_default().is_empty()
                        && product_filter.is_none_or(|product| row.product == product)
                })
                .cloned()
                .collect())
        }
    }

    fn row(code: &str, modifier: Option<&str>, product: &str, p80: f64) -> RateRow {
        RateRow {
            geozip: 75001,
            code: code.to_string(),
            modifier: modifier.map(String::from),
            product: product.to_string(),
            description: format!("row {code}"),
            percentiles: Percentiles {
                p80: Some(p80),
                ..Percentiles::default()
            },
            source_file: "test.csv".to_string(),
        }
    }

    fn key(codes: &[&str], modifier: Option<&str>, product: Option<&str>) -> LookupKey {
        LookupKey::new(
            75001,
            codes.iter().map(|code| code.to_string()).collect(),
            modifier.map(String::from),
            product.map(String::from),
        )
        .expect("valid key")
    }

    #[test]
    fn base_rate_serves_as_fallback_when_modifier_not_on_file() {
        let store = MemoryStore {
            rows: vec![row("99213", None, "PPO", 120.0)],
        };

        let outcome =
            resolve_lookup(&store, &key(&["99213"], Some("25"), None)).expect("resolve");

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(
            outcome.matches[0].match_type,
            MatchType::BaseModifierNotOnFile
        );
        assert_eq!(outcome.matches[0].row.percentiles.p80, Some(120.0));
    }

    #[test]
    fn modifier_row_beats_base_row_when_modifier_supplied() {
        let store = MemoryStore {
            rows: vec![
                row("99213", None, "PPO", 120.0),
                row("99213", Some("25"), "PPO", 150.0),
            ],
        };

        let outcome =
            resolve_lookup(&store, &key(&["99213"], Some("25"), None)).expect("resolve");

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].match_type, MatchType::ModifierSpecific);
        assert_eq!(outcome.matches[0].row.percentiles.p80, Some(150.0));
    }

    #[test]
    fn no_modifier_request_gets_base_rate() {
        let store = MemoryStore {
            rows: vec![
                row("99213", None, "PPO", 120.0),
                row("99213", Some("25"), "PPO", 150.0),
            ],
        };

        let outcome = resolve_lookup(&store, &key(&["99213"], None, None)).expect("resolve");

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].match_type, MatchType::BaseNoModifier);
        assert_eq!(outcome.matches[0].row.percentiles.p80, Some(120.0));
    }

    #[test]
    fn unknown_code_yields_placeholder_not_error() {
        let store = MemoryStore {
            rows: vec![row("99213", None, "PPO", 120.0)],
        };

        let outcome = resolve_lookup(&store, &key(&["99214"], None, None)).expect("resolve");

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].match_type, MatchType::NoMatch);
        assert_eq!(outcome.matches[0].row.code, "99214");
        assert!(!outcome.log[0].success);
    }

    #[test]
    fn all_products_resolved_in_sorted_order_without_filter() {
        let store = MemoryStore {
            rows: vec![
                row("99213", None, "PPO", 120.0),
                row("99213", None, "HMO", 110.0),
            ],
        };

        let outcome = resolve_lookup(&store, &key(&["99213"], None, None)).expect("resolve");

        let products: Vec<&str> = outcome
            .matches
            .iter()
            .map(|entry| entry.row.product.as_str())
            .collect();
        assert_eq!(products, vec!["HMO", "PPO"]);
    }

    #[test]
    fn empty_product_sorts_before_named_products() {
        let store = MemoryStore {
            rows: vec![
                row("99213", None, "HMO", 110.0),
                row("99213", None, "", 100.0),
            ],
        };

        let outcome = resolve_lookup(&store, &key(&["99213"], None, None)).expect("resolve");

        let products: Vec<&str> = outcome
            .matches
            .iter()
            .map(|entry| entry.row.product.as_str())
            .collect();
        assert_eq!(products, vec!["", "HMO"]);
    }

    #[test]
    fn product_filter_scopes_resolution_to_one_product() {
        let store = MemoryStore {
            rows: vec![
                row("99213", None, "PPO", 120.0),
                row("99213", None, "HMO", 110.0),
            ],
        };

        let outcome =
            resolve_lookup(&store, &key(&["99213"], None, Some("HMO"))).expect("resolve");

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].row.product, "HMO");
    }

    #[test]
    fn modifier_row_without_base_row_still_resolves() {
        let store = MemoryStore {
            rows: vec![row("99213", Some("25"), "PPO", 150.0)],
        };

        let outcome =
            resolve_lookup(&store, &key(&["99213"], Some("25"), None)).expect("resolve");

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].match_type, MatchType::ModifierSpecific);
    }

    #[test]
    fn codes_resolve_independently_and_preserve_request_order() {
        let store = MemoryStore {
            rows: vec![row("99213", None, "PPO", 120.0)],
        };

        let outcome = resolve_lookup(&store, &key(&["99499", "99213", "99499"], None, None))
            .expect("resolve");

        let codes: Vec<&str> = outcome
            .matches
            .iter()
            .map(|entry| entry.row.code.as_str())
            .collect();
        assert_eq!(codes, vec!["99499", "99213", "99499"]);
        assert_eq!(outcome.matches[0].match_type, MatchType::NoMatch);
        assert_eq!(outcome.matches[1].match_type, MatchType::BaseNoModifier);
        assert_eq!(outcome.matches[2].match_type, MatchType::NoMatch);
    }

    #[test]
    fn every_resolution_attempt_produces_one_log_entry() {
        let store = MemoryStore {
            rows: vec![
                row("99213", None, "PPO", 120.0),
                row("99213", None, "HMO", 110.0),
            ],
        };

        let outcome =
            resolve_lookup(&store, &key(&["99213", "99499"], None, None)).expect("resolve");

        // Two products for 99213 plus one no-match for 99499.
        assert_eq!(outcome.log.len(), 3);
        assert_eq!(outcome.matches.len(), outcome.log.len());
        assert!(outcome.log[0].success);
        assert!(outcome.log[1].success);
        assert!(!outcome.log[2].success);
        assert_eq!(outcome.log[2].match_type, MatchType::NoMatch);
    }
}
