// Unit label formatting for tables, charts and CSV exports.
use crate::types::ValueType;

const TOTAL_QUALIFIER: &str = " total";

/// Area normalisations removed from a unit when values are scaled to totals.
const AREA_SUFFIXES: [&str; 2] = ["/m²", "/m2"];

/// Build the unit label for `base_unit` under `value_type`.
///
/// Total mode drops the per-square-metre normalisation and appends a
/// ` total` qualifier (`kWh/m²/year` → `kWh/year total`). Export mode
/// additionally rewrites CO₂/m² style glyphs to plain ASCII.
///
/// Applying the function to its own output returns the same string.
pub fn format_unit(base_unit: &str, value_type: ValueType, for_export: bool) -> String {
    let mut unit = base_unit.trim().to_string();
    if value_type == ValueType::Total && !unit.is_empty() {
        for suffix in AREA_SUFFIXES {
            unit = unit.replace(suffix, "");
        }
        if !unit.ends_with(TOTAL_QUALIFIER) {
            unit.push_str(TOTAL_QUALIFIER);
        }
    }
    if for_export {
        ascii_safe(&unit)
    } else {
        unit
    }
}

/// Replace sub/superscript digits (CO₂, m², m³) with ASCII digits.
pub fn ascii_safe(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '₀' | '⁰' => '0',
            '₁' | '¹' => '1',
            '₂' | '²' => '2',
            '₃' | '³' => '3',
            '₄' | '⁴' => '4',
            '−' => '-',
            other => other,
        })
        .collect()
}
