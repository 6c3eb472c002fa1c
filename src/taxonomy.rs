// Read-only lookup tables shared by the aggregation pipeline.
//
// A `Taxonomy` bundles the sector styles (in canonical display order),
// the certification schemes with their ordered rating scales, and the KPI
// catalog that owns every unit string. Call sites receive it by reference,
// so tests can swap in a reduced taxonomy.

use crate::types::{Project, Sector, ValueType};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const TOTAL_EMBODIED_CARBON: &str = "Total Embodied Carbon";
pub const UPFRONT_CARBON: &str = "Upfront Carbon";
pub const BIOGENIC_CARBON: &str = "Biogenic Carbon";
pub const EMBODIED_CARBON_A1_A3: &str = "Embodied Carbon A1-A3";
pub const EMBODIED_CARBON_A4_A5: &str = "Embodied Carbon A4-A5";
pub const EMBODIED_CARBON_B_C: &str = "Embodied Carbon B-C";
pub const OPERATIONAL_ENERGY: &str = "Operational Energy";
pub const SPACE_HEATING_DEMAND: &str = "Space Heating Demand";
pub const RENEWABLE_GENERATION: &str = "Renewable Energy Generation";
pub const BIODIVERSITY_NET_GAIN: &str = "Biodiversity Net Gain";
pub const URBAN_GREENING_FACTOR: &str = "Urban Greening Factor";
pub const POTABLE_WATER_USE: &str = "Potable Water Use";

/// Sector used for projects whose sector string is not recognised.
pub const DEFAULT_SECTOR: Sector = Sector::Workplace;

pub static STANDARD_TAXONOMY: Lazy<Taxonomy> = Lazy::new(Taxonomy::default);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerShape {
    Circle,
    Square,
    Triangle,
    Diamond,
    Cross,
    Star,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorStyle {
    pub sector: Sector,
    pub color: String,
    pub shape: MarkerShape,
}

/// Where a scheme's rating lives on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingSource {
    /// The certification field holds exactly one rating string.
    Field(String),
    /// The certification field is free text; ratings are found by substring.
    Tag(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationScheme {
    pub name: String,
    /// Best to worst.
    pub ratings: Vec<String>,
    pub source: RatingSource,
}

impl CertificationScheme {
    pub fn new(name: &str, ratings: &[&str], source: RatingSource) -> Self {
        Self {
            name: name.to_string(),
            ratings: ratings.iter().map(|r| r.to_string()).collect(),
            source,
        }
    }

    /// Index into `ratings` for this project, or `None` when the project is
    /// unrated, rated "N/A", or carries a rating outside the scale.
    pub fn resolve_rating(&self, project: &Project) -> Option<usize> {
        match &self.source {
            RatingSource::Field(field) => {
                let raw = project.certification(field)?.trim();
                self.ratings.iter().position(|r| r.eq_ignore_ascii_case(raw))
            }
            RatingSource::Tag(field) => {
                let tag = project.certification(field)?.to_lowercase();
                self.ratings
                    .iter()
                    .position(|r| tag.contains(&r.to_lowercase()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KpiCategory {
    EmbodiedCarbon,
    OperationalEnergy,
    Biodiversity,
    Water,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiDef {
    pub name: String,
    pub unit: String,
    pub category: KpiCategory,
    pub decimals: usize,
    /// Stored per m² of GIA, so total mode multiplies by area.
    pub area_normalised: bool,
}

impl KpiDef {
    pub fn new(
        name: &str,
        unit: &str,
        category: KpiCategory,
        decimals: usize,
        area_normalised: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            category,
            decimals,
            area_normalised,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    sectors: Vec<SectorStyle>,
    schemes: Vec<CertificationScheme>,
    kpis: Vec<KpiDef>,
    default_sector: Sector,
}

impl Taxonomy {
    pub fn new(
        sectors: Vec<SectorStyle>,
        schemes: Vec<CertificationScheme>,
        kpis: Vec<KpiDef>,
        default_sector: Sector,
    ) -> Self {
        Self {
            sectors,
            schemes,
            kpis,
            default_sector,
        }
    }

    /// Sectors in canonical display order.
    pub fn sectors(&self) -> impl Iterator<Item = Sector> + '_ {
        self.sectors.iter().map(|s| s.sector)
    }

    pub fn sector_style(&self, sector: Sector) -> Option<&SectorStyle> {
        self.sectors.iter().find(|s| s.sector == sector)
    }

    pub fn default_sector(&self) -> Sector {
        self.default_sector
    }

    /// Never fails: anything outside this taxonomy's sector list maps to the
    /// default sector.
    pub fn resolve_sector(&self, raw: &str) -> Sector {
        Sector::parse(raw)
            .filter(|s| self.sector_style(*s).is_some())
            .unwrap_or(self.default_sector)
    }

    pub fn schemes(&self) -> &[CertificationScheme] {
        &self.schemes
    }

    pub fn scheme(&self, name: &str) -> Option<&CertificationScheme> {
        self.schemes
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn kpis(&self) -> &[KpiDef] {
        &self.kpis
    }

    pub fn kpi(&self, name: &str) -> Option<&KpiDef> {
        self.kpis
            .iter()
            .find(|k| k.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Value type actually applied to `kpi`: KPIs that are not stored per m²
    /// (percentages, scores) are never scaled by area.
    pub fn effective_value_type(&self, kpi: &str, requested: ValueType) -> ValueType {
        match self.kpi(kpi) {
            Some(def) if !def.area_normalised => ValueType::PerArea,
            _ => requested,
        }
    }

    /// Catalog unit for `kpi`, empty when the KPI is not catalogued.
    pub fn unit(&self, kpi: &str) -> &str {
        self.kpi(kpi).map(|k| k.unit.as_str()).unwrap_or("")
    }

    pub fn decimals(&self, kpi: &str) -> usize {
        self.kpi(kpi).map(|k| k.decimals).unwrap_or(0)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        use KpiCategory::*;
        use MarkerShape::*;

        let style = |sector, color: &str, shape| SectorStyle {
            sector,
            color: color.to_string(),
            shape,
        };
        let sectors = vec![
            style(Sector::Residential, "#E69F00", Circle),
            style(Sector::Education, "#56B4E9", Square),
            style(Sector::Healthcare, "#009E73", Triangle),
            style(Sector::Infrastructure, "#F0E442", Diamond),
            style(Sector::Ccc, "#0072B2", Cross),
            style(Sector::Workplace, "#D55E00", Star),
        ];

        let field = |f: &str| RatingSource::Field(f.to_string());
        let schemes = vec![
            CertificationScheme::new(
                "BREEAM",
                &["Outstanding", "Excellent", "Very Good", "Good", "Pass"],
                field("BREEAM"),
            ),
            CertificationScheme::new("LEED", &["Platinum", "Gold", "Silver", "Certified"], field("LEED")),
            CertificationScheme::new("WELL", &["Platinum", "Gold", "Silver", "Bronze"], field("WELL")),
            CertificationScheme::new("Passivhaus", &["Premium", "Plus", "Classic"], field("Passivhaus")),
            CertificationScheme::new(
                "NABERS",
                &["6 Star", "5 Star", "4 Star", "3 Star", "2 Star", "1 Star"],
                field("NABERS"),
            ),
            CertificationScheme::new(
                "Net Zero Carbon",
                &["Net Zero", "Near Zero", "Low Carbon"],
                RatingSource::Tag("Tags".to_string()),
            ),
        ];

        let kpis = vec![
            KpiDef::new(TOTAL_EMBODIED_CARBON, "kgCO₂e/m²", EmbodiedCarbon, 0, true),
            KpiDef::new(UPFRONT_CARBON, "kgCO₂e/m²", EmbodiedCarbon, 0, true),
            KpiDef::new(EMBODIED_CARBON_A1_A3, "kgCO₂e/m²", EmbodiedCarbon, 0, true),
            KpiDef::new(EMBODIED_CARBON_A4_A5, "kgCO₂e/m²", EmbodiedCarbon, 0, true),
            KpiDef::new(EMBODIED_CARBON_B_C, "kgCO₂e/m²", EmbodiedCarbon, 0, true),
            KpiDef::new(BIOGENIC_CARBON, "kgCO₂e/m²", EmbodiedCarbon, 0, true),
            KpiDef::new(OPERATIONAL_ENERGY, "kWh/m²/year", OperationalEnergy, 1, true),
            KpiDef::new(SPACE_HEATING_DEMAND, "kWh/m²/year", OperationalEnergy, 1, true),
            KpiDef::new(RENEWABLE_GENERATION, "kWh/m²/year", OperationalEnergy, 1, true),
            KpiDef::new(BIODIVERSITY_NET_GAIN, "%", Biodiversity, 1, false),
            KpiDef::new(URBAN_GREENING_FACTOR, "UGF", Biodiversity, 2, false),
            KpiDef::new(POTABLE_WATER_USE, "litres/person/day", Water, 0, false),
        ];

        Self::new(sectors, schemes, kpis, DEFAULT_SECTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_cert(field: &str, rating: &str) -> Project {
        let mut p = Project::new("P", "P", "Education");
        p.certifications.insert(field.to_string(), rating.to_string());
        p
    }

    #[test]
    fn unknown_sector_falls_back_to_default() {
        let t = Taxonomy::default();
        assert_eq!(t.resolve_sector("Retail"), DEFAULT_SECTOR);
        assert_eq!(t.resolve_sector(""), DEFAULT_SECTOR);
        assert_eq!(t.resolve_sector("healthcare"), Sector::Healthcare);
    }

    #[test]
    fn sector_outside_reduced_taxonomy_uses_its_default() {
        let t = Taxonomy::new(
            vec![SectorStyle {
                sector: Sector::Education,
                color: "#000".into(),
                shape: MarkerShape::Circle,
            }],
            vec![],
            vec![],
            Sector::Education,
        );
        assert_eq!(t.resolve_sector("Healthcare"), Sector::Education);
        assert_eq!(t.sectors().collect::<Vec<_>>(), vec![Sector::Education]);
    }

    #[test]
    fn field_ratings_match_exactly() {
        let t = Taxonomy::default();
        let breeam = t.scheme("breeam").expect("scheme");
        assert_eq!(breeam.resolve_rating(&with_cert("BREEAM", "Very Good")), Some(2));
        assert_eq!(breeam.resolve_rating(&with_cert("BREEAM", "good")), Some(3));
        assert_eq!(breeam.resolve_rating(&with_cert("BREEAM", "N/A")), None);
        assert_eq!(breeam.resolve_rating(&with_cert("BREEAM", "")), None);
        assert_eq!(breeam.resolve_rating(&with_cert("LEED", "Gold")), None);
    }

    #[test]
    fn tag_ratings_distinguish_similar_phrases() {
        let t = Taxonomy::default();
        let nz = t.scheme("Net Zero Carbon").expect("scheme");
        assert_eq!(nz.resolve_rating(&with_cert("Tags", "BREEAM Excellent; Net Zero Carbon")), Some(0));
        assert_eq!(nz.resolve_rating(&with_cert("Tags", "near zero carbon in operation")), Some(1));
        assert_eq!(nz.resolve_rating(&with_cert("Tags", "Low Carbon Design")), Some(2));
        assert_eq!(nz.resolve_rating(&with_cert("Tags", "N/A")), None);
    }

    #[test]
    fn percentage_kpis_are_not_scaled() {
        let t = Taxonomy::default();
        assert_eq!(
            t.effective_value_type(BIODIVERSITY_NET_GAIN, ValueType::Total),
            ValueType::PerArea
        );
        assert_eq!(t.effective_value_type(UPFRONT_CARBON, ValueType::Total), ValueType::Total);
        assert_eq!(t.unit(OPERATIONAL_ENERGY), "kWh/m²/year");
        assert_eq!(t.unit("Unknown KPI"), "");
    }
}
