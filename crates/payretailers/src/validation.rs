//! Personal-ID format checks per country.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PayRetailersError, Result};
use crate::models::Country;

/// Raw patterns. Matching is anchored at the start of the id; a pattern may
/// or may not anchor the end.
const PERSONAL_ID_PATTERNS: &[(Country, &str)] = &[
    (Country::Br, r"^[0-9]{3}\.?[0-9]{3}\.?[0-9]{3}\-?[0-9]{2}$"),
    (Country::Ar, r"^[0-9]{2}\.?[0-9]{3}\.?[0-9]{3}$"),
    (Country::Cr, r"^[1-9]-?[0-9]{4}-?[0-9]{4}$"),
    (
        Country::Mx,
        r"^([A-Z][AEIOUX][A-Z]{2}\d{2}(?:0[1-9]|1[0-2])(?:0[1-9]|[12]\d|3[01])[HM](?:AS|B[CS]|C[CLMSH]|D[FG]|G[TR]|HG|JC|M[CNS]|N[ETL]|OC|PL|Q[TR]|S[PLR]|T[CSL]|VZ|YN|ZS)[B-DF-HJ-NP-TV-Z]{3}[A-Z\d])(\d)$",
    ),
    (Country::Cl, r"^\d{2}\.\d{3}\.\d{3}-[0-9kK]$"),
    (Country::Pe, r"(^\d{8}-\d{1}$)|(^\d{9}$)"),
    (
        Country::Co,
        r"^[0-9]{1}\.?[0-9]{3}\.?[0-9]{3}.?[0-9]{3}|[0-9]{3}\.?[0-9]{3}$",
    ),
    (Country::Ec, r"^[0-9]{10}$"),
    (Country::Pa, r"^(?:\d{1,2}-\d{2,3}-\d{4}|\d{7,9})$"),
    (Country::Gt, r"(^\d{4}\s?\d{5}\s?\d{4}$)|(^\d{4}-?\d{5}-?\d{4}$)"),
];

static COMPILED: LazyLock<HashMap<Country, Regex>> = LazyLock::new(|| {
    PERSONAL_ID_PATTERNS
        .iter()
        .filter_map(|(country, pattern)| {
            Regex::new(&format!("^(?:{pattern})"))
                .map(|re| (*country, re))
                .map_err(|e| tracing::error!(%country, error = %e, "invalid personal id pattern"))
                .ok()
        })
        .collect()
});

/// The raw pattern for `country`, if one is defined.
pub fn personal_id_pattern(country: Country) -> Option<&'static str> {
    PERSONAL_ID_PATTERNS
        .iter()
        .find(|(c, _)| *c == country)
        .map(|(_, p)| *p)
}

/// Check `personal_id` against the country's pattern. Countries without a
/// pattern accept anything.
pub fn validate_personal_id(country: Country, personal_id: &str) -> Result<()> {
    let Some(re) = COMPILED.get(&country) else {
        return Ok(());
    };

    if re.is_match(personal_id) {
        Ok(())
    } else {
        Err(PayRetailersError::validation(format!(
            "Invalid Personal ID '{personal_id}' for country '{country}'. Expected format regex: {}",
            personal_id_pattern(country).unwrap_or_default()
        )))
    }
}
