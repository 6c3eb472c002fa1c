// Static embodied-carbon benchmark table.
//
// Entries are per-area targets keyed by sector, sub-sector and the year an
// edition of a benchmark scheme takes effect. Sector-wide entries use the
// sub-sector `ALL_SUB_SECTORS`.

use crate::taxonomy::{TOTAL_EMBODIED_CARBON, UPFRONT_CARBON};
use crate::types::{Sector, ValueType};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ALL_SUB_SECTORS: &str = "All";

pub static STANDARD_BENCHMARKS: Lazy<BenchmarkTable> = Lazy::new(BenchmarkTable::default);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BenchmarkCategory {
    TotalEmbodiedCarbon,
    UpfrontCarbon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub sector: Sector,
    pub sub_sector: String,
    /// First year the edition applies.
    pub year: i32,
    pub category: BenchmarkCategory,
    pub scheme: String,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkKey {
    pub sector: Sector,
    pub sub_sector: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTable {
    entries: Vec<BenchmarkEntry>,
}

impl BenchmarkTable {
    pub fn new(entries: Vec<BenchmarkEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BenchmarkEntry] {
        &self.entries
    }

    /// Benchmarks are published per m², so only per-area views of the two
    /// embodied-carbon headline KPIs have a category.
    pub fn category_for(kpi: &str, value_type: ValueType) -> Option<BenchmarkCategory> {
        if value_type != ValueType::PerArea {
            return None;
        }
        if kpi.eq_ignore_ascii_case(TOTAL_EMBODIED_CARBON) {
            Some(BenchmarkCategory::TotalEmbodiedCarbon)
        } else if kpi.eq_ignore_ascii_case(UPFRONT_CARBON) {
            Some(BenchmarkCategory::UpfrontCarbon)
        } else {
            None
        }
    }

    /// Resolve the sub-sector against the table, falling back to the
    /// sector-wide entries when the specific sub-sector has none. A missing
    /// year means "latest edition".
    pub fn resolve_key(&self, sector: Sector, sub_sector: &str, year: Option<i32>) -> BenchmarkKey {
        let has_specific = self
            .entries
            .iter()
            .any(|e| e.sector == sector && e.sub_sector.eq_ignore_ascii_case(sub_sector.trim()));
        let sub_sector = if has_specific {
            sub_sector.trim().to_string()
        } else {
            ALL_SUB_SECTORS.to_string()
        };
        BenchmarkKey {
            sector,
            sub_sector,
            year: year.unwrap_or(i32::MAX),
        }
    }

    /// For each scheme, the entries of its newest edition in effect at
    /// `key.year`. Empty when nothing matches.
    pub fn lookup(&self, key: &BenchmarkKey, category: BenchmarkCategory) -> Vec<&BenchmarkEntry> {
        let candidates: Vec<&BenchmarkEntry> = self
            .entries
            .iter()
            .filter(|e| {
                e.category == category
                    && e.sector == key.sector
                    && e.sub_sector.eq_ignore_ascii_case(&key.sub_sector)
                    && e.year <= key.year
            })
            .collect();

        let mut schemes: Vec<&str> = Vec::new();
        for e in &candidates {
            if !schemes.contains(&e.scheme.as_str()) {
                schemes.push(e.scheme.as_str());
            }
        }

        let mut out = Vec::new();
        for scheme in schemes {
            let newest = candidates
                .iter()
                .filter(|e| e.scheme == scheme)
                .map(|e| e.year)
                .max();
            if let Some(year) = newest {
                out.extend(
                    candidates
                        .iter()
                        .copied()
                        .filter(|e| e.scheme == scheme && e.year == year),
                );
            }
        }
        if out.is_empty() {
            debug!(
                sector = %key.sector,
                sub_sector = %key.sub_sector,
                year = key.year,
                ?category,
                "no benchmark entry"
            );
        }
        out
    }
}

impl Default for BenchmarkTable {
    fn default() -> Self {
        use BenchmarkCategory::*;
        let entry = |sector, sub_sector: &str, year, category, scheme: &str, label: &str, value| {
            BenchmarkEntry {
                sector,
                sub_sector: sub_sector.to_string(),
                year,
                category,
                scheme: scheme.to_string(),
                label: label.to_string(),
                value,
            }
        };
        let all = ALL_SUB_SECTORS;

        Self::new(vec![
            // Whole-life embodied targets (A1-A5, B1-B5, C1-C4).
            entry(Sector::Residential, all, 2021, TotalEmbodiedCarbon, "RIBA 2030", "Business as usual", 1200.0),
            entry(Sector::Residential, all, 2021, TotalEmbodiedCarbon, "RIBA 2030", "2025 target", 800.0),
            entry(Sector::Residential, all, 2021, TotalEmbodiedCarbon, "RIBA 2030", "2030 target", 625.0),
            entry(Sector::Workplace, all, 2021, TotalEmbodiedCarbon, "RIBA 2030", "Business as usual", 1400.0),
            entry(Sector::Workplace, all, 2021, TotalEmbodiedCarbon, "RIBA 2030", "2025 target", 970.0),
            entry(Sector::Workplace, all, 2021, TotalEmbodiedCarbon, "RIBA 2030", "2030 target", 750.0),
            entry(Sector::Education, all, 2021, TotalEmbodiedCarbon, "RIBA 2030", "Business as usual", 1000.0),
            entry(Sector::Education, all, 2021, TotalEmbodiedCarbon, "RIBA 2030", "2025 target", 675.0),
            entry(Sector::Education, all, 2021, TotalEmbodiedCarbon, "RIBA 2030", "2030 target", 540.0),
            // Upfront (A1-A5) bands by scheme.
            entry(Sector::Residential, all, 2020, UpfrontCarbon, "LETI", "2020 design target", 500.0),
            entry(Sector::Residential, all, 2020, UpfrontCarbon, "LETI", "2030 design target", 300.0),
            entry(Sector::Residential, all, 2022, UpfrontCarbon, "GLA", "Benchmark", 850.0),
            entry(Sector::Residential, all, 2022, UpfrontCarbon, "GLA", "Aspirational", 500.0),
            entry(Sector::Workplace, all, 2020, UpfrontCarbon, "LETI", "2020 design target", 600.0),
            entry(Sector::Workplace, all, 2020, UpfrontCarbon, "LETI", "2030 design target", 350.0),
            entry(Sector::Workplace, all, 2022, UpfrontCarbon, "GLA", "Benchmark", 950.0),
            entry(Sector::Workplace, all, 2022, UpfrontCarbon, "GLA", "Aspirational", 600.0),
            entry(Sector::Education, all, 2020, UpfrontCarbon, "LETI", "2020 design target", 600.0),
            entry(Sector::Education, all, 2020, UpfrontCarbon, "LETI", "2030 design target", 350.0),
            entry(Sector::Education, "Secondary School", 2022, UpfrontCarbon, "GLA", "Benchmark", 950.0),
            entry(Sector::Education, "Secondary School", 2022, UpfrontCarbon, "GLA", "Aspirational", 600.0),
        ])
    }
}
