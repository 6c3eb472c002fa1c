// Per-area → total value conversion.
use crate::types::{normalize_project_id, Project, ValueType};
use std::borrow::Borrow;
use std::collections::HashMap;

/// Floor area assumed for a project with no usable GIA and no fallback entry.
pub const DEFAULT_GIA_M2: f64 = 5_000.0;

/// Resolves the floor area used to scale a project's per-area KPIs.
///
/// Resolution order: the project's own positive GIA, then the fallback table
/// keyed by normalised id, then the default area.
#[derive(Debug, Clone)]
pub struct AreaLookup {
    own: HashMap<String, f64>,
    fallback: HashMap<String, f64>,
    default_area: f64,
}

impl Default for AreaLookup {
    fn default() -> Self {
        Self {
            own: HashMap::new(),
            fallback: HashMap::new(),
            default_area: DEFAULT_GIA_M2,
        }
    }
}

impl AreaLookup {
    pub fn from_projects<P: Borrow<Project>>(projects: &[P]) -> Self {
        let own = projects
            .iter()
            .filter_map(|p| {
                let p: &Project = p.borrow();
                p.positive_gia().map(|a| (p.id.clone(), a))
            })
            .collect();
        Self {
            own,
            ..Self::default()
        }
    }

    pub fn with_fallback(mut self, project_id: &str, area: f64) -> Self {
        self.insert_fallback(project_id, area);
        self
    }

    pub fn with_fallbacks<'a, I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a f64)>,
    {
        for (id, area) in entries {
            self.insert_fallback(id, *area);
        }
        self
    }

    pub fn with_default_area(mut self, area: f64) -> Self {
        if area.is_finite() && area > 0.0 {
            self.default_area = area;
        }
        self
    }

    fn insert_fallback(&mut self, project_id: &str, area: f64) {
        if area.is_finite() && area > 0.0 {
            self.fallback.insert(normalize_project_id(project_id), area);
        }
    }

    pub fn area(&self, project_id: &str) -> f64 {
        if let Some(a) = self.own.get(project_id) {
            return *a;
        }
        self.fallback
            .get(&normalize_project_id(project_id))
            .copied()
            .unwrap_or(self.default_area)
    }
}

/// Convert a stored per-area KPI value into the requested value type.
///
/// Signs are preserved: negative values such as biogenic carbon stay negative
/// after scaling.
pub fn to_display_value(
    raw_value: f64,
    project_id: &str,
    value_type: ValueType,
    areas: &AreaLookup,
) -> f64 {
    match value_type {
        ValueType::PerArea => raw_value,
        ValueType::Total => raw_value * areas.area(project_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, gia: Option<f64>) -> Project {
        let mut p = Project::new(id, id, "Residential");
        p.gia = gia;
        p
    }

    #[test]
    fn area_prefers_own_gia_then_fallback_then_default() {
        let projects = vec![
            project("A", Some(9_800.0)),
            project("B", None),
            project("C", Some(0.0)),
        ];
        let areas = AreaLookup::from_projects(&projects).with_fallback("b", 1_200.0);
        assert_eq!(areas.area("A"), 9_800.0);
        assert_eq!(areas.area("B"), 1_200.0);
        assert_eq!(areas.area("C"), DEFAULT_GIA_M2);
        assert_eq!(areas.area("B-stage3"), 1_200.0);
    }

    #[test]
    fn per_area_is_identity() {
        let areas = AreaLookup::default();
        assert_eq!(to_display_value(-60.0, "X", ValueType::PerArea, &areas), -60.0);
    }

    #[test]
    fn total_multiplies_and_keeps_sign() {
        let areas = AreaLookup::default().with_fallback("X", 2_000.0);
        assert_eq!(to_display_value(-60.0, "X", ValueType::Total, &areas), -120_000.0);
        assert_eq!(to_display_value(450.0, "X", ValueType::Total, &areas), 900_000.0);
    }

    #[test]
    fn invalid_fallback_and_default_are_ignored() {
        let areas = AreaLookup::default()
            .with_fallback("X", -5.0)
            .with_default_area(0.0);
        assert_eq!(areas.area("X"), DEFAULT_GIA_M2);
    }
}
