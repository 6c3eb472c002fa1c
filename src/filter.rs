// Dashboard filters applied before aggregation.
use crate::taxonomy::Taxonomy;
use crate::types::{Project, ProjectType, Sector};
use serde::{Deserialize, Serialize};

/// Empty lists and `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFilter {
    pub sectors: Vec<Sector>,
    pub project_types: Vec<ProjectType>,
    pub min_stage: Option<u8>,
    /// Case-insensitive substring of name or location.
    pub search: Option<String>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project, taxonomy: &Taxonomy) -> bool {
        if !self.sectors.is_empty()
            && !self.sectors.contains(&taxonomy.resolve_sector(&project.sector))
        {
            return false;
        }
        if !self.project_types.is_empty() {
            match project.project_type {
                Some(t) if self.project_types.contains(&t) => {}
                _ => return false,
            }
        }
        if let Some(min) = self.min_stage {
            if project.riba_stage.map_or(true, |s| s < min) {
                return false;
            }
        }
        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = project.name.to_lowercase().contains(&needle)
                || project.location.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }

    /// Matching projects, borrowed, in input order.
    pub fn apply<'a>(&self, projects: &'a [Project], taxonomy: &Taxonomy) -> Vec<&'a Project> {
        projects
            .iter()
            .filter(|p| self.matches(p, taxonomy))
            .collect()
    }
}
