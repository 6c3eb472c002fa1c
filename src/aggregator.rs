// Per-sector statistics for one KPI.
use crate::taxonomy::Taxonomy;
use crate::transform::{to_display_value, AreaLookup};
use crate::types::{Project, Sector, ValueType};
use std::borrow::Borrow;
use tracing::debug;

/// Running statistics for one sector. `min_value`/`max_value` hold the
/// ±infinity seeds until a value is recorded; read them through
/// [`SectorStats::min`] and [`SectorStats::max`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorStats {
    pub count: usize,
    pub total_value: f64,
    pub total_area: f64,
    pub min_value: f64,
    pub max_value: f64,
}

impl Default for SectorStats {
    fn default() -> Self {
        Self {
            count: 0,
            total_value: 0.0,
            total_area: 0.0,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
        }
    }
}

impl SectorStats {
    pub fn record(&mut self, value: f64, area: f64) {
        self.count += 1;
        self.total_value += value;
        self.total_area += area;
        self.min_value = self.min_value.min(value);
        self.max_value = self.max_value.max(value);
    }

    pub fn merge(&mut self, other: &SectorStats) {
        self.count += other.count;
        self.total_value += other.total_value;
        self.total_area += other.total_area;
        self.min_value = self.min_value.min(other.min_value);
        self.max_value = self.max_value.max(other.max_value);
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Rounded mean, 0 for an empty sector.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.total_value / self.count as f64).round()
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min_value
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max_value
        }
    }

    pub fn range(&self) -> f64 {
        self.max() - self.min()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorSummary {
    pub kpi: String,
    pub value_type: ValueType,
    entries: Vec<(Sector, SectorStats)>,
}

impl SectorSummary {
    /// Entries in the taxonomy's canonical sector order; every sector is
    /// present, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = &(Sector, SectorStats)> {
        self.entries.iter()
    }

    pub fn get(&self, sector: Sector) -> Option<&SectorStats> {
        self.entries
            .iter()
            .find(|(s, _)| *s == sector)
            .map(|(_, stats)| stats)
    }

    /// All sectors folded together.
    pub fn totals(&self) -> SectorStats {
        let mut acc = SectorStats::default();
        for (_, stats) in &self.entries {
            acc.merge(stats);
        }
        acc
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Aggregate `kpi_key` per sector.
///
/// Projects without a finite value for the KPI are left out of every
/// statistic, including `count`. Unknown sector strings fall back to the
/// taxonomy's default sector.
pub fn aggregate_by_sector<P: Borrow<Project>>(
    projects: &[P],
    kpi_key: &str,
    value_type: ValueType,
    taxonomy: &Taxonomy,
    areas: &AreaLookup,
) -> SectorSummary {
    let effective = taxonomy.effective_value_type(kpi_key, value_type);
    let mut entries: Vec<(Sector, SectorStats)> = taxonomy
        .sectors()
        .map(|s| (s, SectorStats::default()))
        .collect();

    let mut excluded = 0usize;
    for p in projects {
        let p: &Project = p.borrow();
        let Some(raw) = p.kpi(kpi_key) else {
            excluded += 1;
            continue;
        };
        let sector = taxonomy.resolve_sector(&p.sector);
        let Some((_, stats)) = entries.iter_mut().find(|(s, _)| *s == sector) else {
            excluded += 1;
            continue;
        };
        let value = to_display_value(raw, &p.id, effective, areas);
        stats.record(value, areas.area(&p.id));
    }
    debug!(
        kpi = kpi_key,
        value_type = value_type.as_str(),
        excluded,
        "aggregated projects by sector"
    );

    SectorSummary {
        kpi: kpi_key.to_string(),
        value_type,
        entries,
    }
}
