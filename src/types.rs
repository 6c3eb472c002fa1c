use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// Suffix inserted between a base project id and a stage number when a
/// project is split into per-stage snapshots for self-comparison views.
pub const STAGE_SUFFIX: &str = "-stage";

/// Lowest and highest RIBA Plan of Work stages.
pub const RIBA_STAGE_MIN: u8 = 1;
pub const RIBA_STAGE_MAX: u8 = 7;

/// KPI name → value, at one point in a project's lifecycle.
pub type KpiSnapshot = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sector {
    Residential,
    Education,
    Healthcare,
    Infrastructure,
    #[serde(rename = "CCC")]
    Ccc,
    Workplace,
}

impl Sector {
    pub const ALL: [Sector; 6] = [
        Sector::Residential,
        Sector::Education,
        Sector::Healthcare,
        Sector::Infrastructure,
        Sector::Ccc,
        Sector::Workplace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Residential => "Residential",
            Sector::Education => "Education",
            Sector::Healthcare => "Healthcare",
            Sector::Infrastructure => "Infrastructure",
            Sector::Ccc => "CCC",
            Sector::Workplace => "Workplace",
        }
    }

    /// Case-insensitive match against the fixed sector names.
    pub fn parse(raw: &str) -> Option<Sector> {
        let raw = raw.trim();
        Sector::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether KPI values are shown per square metre of floor area or scaled
/// up to whole-building totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueType {
    #[default]
    #[serde(rename = "per-area")]
    PerArea,
    #[serde(rename = "total")]
    Total,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::PerArea => "per-area",
            ValueType::Total => "total",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValueType::PerArea => "Per m²",
            ValueType::Total => "Total",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    #[serde(rename = "New Build")]
    NewBuild,
    Retrofit,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::NewBuild => "New Build",
            ProjectType::Retrofit => "Retrofit",
        }
    }

    pub fn parse(raw: &str) -> Option<ProjectType> {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "newbuild" | "new" => Some(ProjectType::NewBuild),
            "retrofit" | "refurbishment" => Some(ProjectType::Retrofit),
            _ => None,
        }
    }
}

/// One building project at one point in its design lifecycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub location: String,
    /// Raw sector string as supplied; resolved against a taxonomy when
    /// aggregating so unknown sectors never fail.
    pub sector: String,
    pub sub_sector: String,
    pub project_type: Option<ProjectType>,
    pub completion_date: Option<NaiveDate>,
    /// Gross internal area in m².
    pub gia: Option<f64>,
    pub riba_stage: Option<u8>,
    pub kpis: KpiSnapshot,
    /// Certification field → rating string, e.g. `BREEAM` → `Excellent`.
    pub certifications: BTreeMap<String, String>,
    pub stage_history: BTreeMap<u8, KpiSnapshot>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sector: sector.into(),
            ..Self::default()
        }
    }

    /// A KPI value usable in arithmetic. Non-finite values count as missing.
    pub fn kpi(&self, key: &str) -> Option<f64> {
        self.kpis.get(key).copied().filter(|v| v.is_finite())
    }

    pub fn certification(&self, field: &str) -> Option<&str> {
        self.certifications
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }

    /// Floor area if present and positive.
    pub fn positive_gia(&self) -> Option<f64> {
        self.gia.filter(|a| a.is_finite() && *a > 0.0)
    }

    pub fn completion_year(&self) -> Option<i32> {
        self.completion_date.map(|d| d.year())
    }

    /// One derived project per recorded stage, ids suffixed with the stage.
    ///
    /// The base project is left untouched; snapshots carry the stage KPIs as
    /// their current values and an empty history.
    pub fn stage_snapshots(&self) -> Vec<Project> {
        self.stage_history
            .iter()
            .map(|(stage, kpis)| Project {
                id: format!("{}{}{}", self.id, STAGE_SUFFIX, stage),
                riba_stage: Some(*stage),
                kpis: kpis.clone(),
                stage_history: BTreeMap::new(),
                ..self.clone()
            })
            .collect()
    }
}

/// Lower-cases an id and strips any `-stage<N>` suffix so stage snapshots
/// share lookups with their base project.
pub fn normalize_project_id(id: &str) -> String {
    let lowered = id.trim().to_lowercase();
    if let Some(pos) = lowered.rfind(STAGE_SUFFIX) {
        let digits = &lowered[pos + STAGE_SUFFIX.len()..];
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return lowered[..pos].to_string();
        }
    }
    lowered
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct SectorSummaryRow {
    #[serde(rename = "Sector")]
    #[tabled(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Projects")]
    #[tabled(rename = "Projects")]
    pub projects: usize,
    #[serde(rename = "Average")]
    #[tabled(rename = "Average")]
    pub average: String,
    #[serde(rename = "Min")]
    #[tabled(rename = "Min")]
    pub min: String,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max")]
    pub max: String,
    #[serde(rename = "Range")]
    #[tabled(rename = "Range")]
    pub range: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
    #[serde(rename = "TotalAreaM2")]
    #[tabled(rename = "TotalAreaM2")]
    pub total_area: String,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct RatingBucketRow {
    #[serde(rename = "Rating")]
    #[tabled(rename = "Rating")]
    pub rating: String,
    #[serde(rename = "Projects")]
    #[tabled(rename = "Projects")]
    pub projects: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct")]
    pub share_pct: String,
    #[serde(rename = "BarWidthPct")]
    #[tabled(rename = "BarWidthPct")]
    pub bar_width_pct: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_projects: usize,
    pub sectors_represented: usize,
    pub certified_projects: usize,
    pub certified_share_pct: f64,
    pub kpi: String,
    pub value_type: ValueType,
    pub projects_with_kpi: usize,
    pub mean_kpi: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_parse_is_case_insensitive() {
        assert_eq!(Sector::parse(" education "), Some(Sector::Education));
        assert_eq!(Sector::parse("ccc"), Some(Sector::Ccc));
        assert_eq!(Sector::parse("Retail"), None);
    }

    #[test]
    fn project_type_accepts_loose_spellings() {
        assert_eq!(ProjectType::parse("New-Build"), Some(ProjectType::NewBuild));
        assert_eq!(ProjectType::parse("retrofit"), Some(ProjectType::Retrofit));
        assert_eq!(ProjectType::parse("demolition"), None);
    }

    #[test]
    fn normalized_id_strips_stage_suffix() {
        assert_eq!(normalize_project_id("PRJ-001-stage4"), "prj-001");
        assert_eq!(normalize_project_id("PRJ-001"), "prj-001");
        assert_eq!(normalize_project_id("x-stagey"), "x-stagey");
    }

    #[test]
    fn stage_snapshots_use_history_values() {
        let mut p = Project::new("P1", "Library", "Education");
        p.kpis.insert("Upfront Carbon".into(), 400.0);
        p.stage_history
            .insert(2, KpiSnapshot::from([("Upfront Carbon".to_string(), 520.0)]));
        p.stage_history
            .insert(4, KpiSnapshot::from([("Upfront Carbon".to_string(), 450.0)]));

        let snaps = p.stage_snapshots();
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].id, "P1-stage2");
        assert_eq!(snaps[0].riba_stage, Some(2));
        assert_eq!(snaps[0].kpi("Upfront Carbon"), Some(520.0));
        assert!(snaps[1].stage_history.is_empty());
        // source untouched
        assert_eq!(p.kpi("Upfront Carbon"), Some(400.0));
    }

    #[test]
    fn non_finite_kpi_counts_as_missing() {
        let mut p = Project::new("P1", "Depot", "Infrastructure");
        p.kpis.insert("Operational Energy".into(), f64::NAN);
        assert_eq!(p.kpi("Operational Energy"), None);
    }
}
