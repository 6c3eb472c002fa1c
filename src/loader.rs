use crate::error::LoadError;
use crate::taxonomy::Taxonomy;
use crate::types::{Project, ProjectType, RIBA_STAGE_MAX, RIBA_STAGE_MIN};
use crate::util::{parse_date_safe, parse_f64_safe, parse_i32_safe};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Prefix marking a certification column, e.g. `Certification:BREEAM`.
pub const CERTIFICATION_PREFIX: &str = "Certification:";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub projects: usize,
    /// Rows merged into an earlier project as stage snapshots.
    pub stage_rows: usize,
    pub skipped_rows: usize,
    /// Non-empty cells that could not be parsed and were treated as missing.
    pub invalid_cells: usize,
    pub ignored_columns: Vec<String>,
}

/// Header positions resolved once per file.
#[derive(Debug, Default)]
struct Columns {
    id: usize,
    name: Option<usize>,
    location: Option<usize>,
    sector: Option<usize>,
    sub_sector: Option<usize>,
    project_type: Option<usize>,
    completion_date: Option<usize>,
    gia: Option<usize>,
    riba_stage: Option<usize>,
    certifications: Vec<(usize, String)>,
    kpis: Vec<(usize, String)>,
}

impl Columns {
    fn resolve(headers: &StringRecord, taxonomy: &Taxonomy) -> Result<(Self, Vec<String>), LoadError> {
        let mut id = None;
        let mut cols = Columns::default();
        let mut ignored = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            let header = header.trim();
            match header.to_ascii_lowercase().as_str() {
                "id" => id = Some(idx),
                "name" => cols.name = Some(idx),
                "location" => cols.location = Some(idx),
                "sector" => cols.sector = Some(idx),
                "subsector" | "sub-sector" | "sub sector" => cols.sub_sector = Some(idx),
                "projecttype" | "project type" => cols.project_type = Some(idx),
                "completiondate" | "completion date" => cols.completion_date = Some(idx),
                "gia" => cols.gia = Some(idx),
                "ribastage" | "riba stage" | "stage" => cols.riba_stage = Some(idx),
                _ => {
                    if let Some(field) = header.strip_prefix(CERTIFICATION_PREFIX) {
                        cols.certifications.push((idx, field.trim().to_string()));
                    } else if let Some(def) = taxonomy.kpi(header) {
                        cols.kpis.push((idx, def.name.clone()));
                    } else {
                        warn!(column = header, "column is not in the KPI catalog; ignoring");
                        ignored.push(header.to_string());
                    }
                }
            }
        }
        cols.id = id.ok_or(LoadError::MissingColumn("Id"))?;
        Ok((cols, ignored))
    }
}

fn cell(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn text(record: &StringRecord, idx: Option<usize>) -> String {
    cell(record, idx).unwrap_or_default().to_string()
}

/// Load projects from a CSV file on disk.
pub fn load_projects(
    path: impl AsRef<Path>,
    taxonomy: &Taxonomy,
) -> Result<(Vec<Project>, LoadReport), LoadError> {
    let file = std::fs::File::open(path.as_ref())?;
    read_projects(file, taxonomy)
}

/// Parse projects from CSV.
///
/// Rows that share an `Id` are snapshots of the same project at different
/// RIBA stages: every row feeds the stage history, and the row with the
/// highest stage supplies the current values.
pub fn read_projects<R: io::Read>(
    reader: R,
    taxonomy: &Taxonomy,
) -> Result<(Vec<Project>, LoadReport), LoadError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let (cols, ignored_columns) = Columns::resolve(&headers, taxonomy)?;

    let mut report = LoadReport {
        ignored_columns,
        ..LoadReport::default()
    };
    let mut projects: Vec<Project> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for result in rdr.records() {
        report.total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "skipping unreadable row");
                report.skipped_rows += 1;
                continue;
            }
        };
        let Some(id) = cell(&record, Some(cols.id)) else {
            report.skipped_rows += 1;
            continue;
        };

        let row = parse_row(id, &record, &cols, &mut report.invalid_cells);
        match index.get(id) {
            Some(&pos) => {
                report.stage_rows += 1;
                merge_snapshot(&mut projects[pos], row);
            }
            None => {
                index.insert(id.to_string(), projects.len());
                projects.push(row);
            }
        }
    }

    report.projects = projects.len();
    Ok((projects, report))
}

fn parse_row(id: &str, record: &StringRecord, cols: &Columns, invalid: &mut usize) -> Project {
    let mut number = |idx: Option<usize>| -> Option<f64> {
        let raw = cell(record, idx)?;
        let parsed = parse_f64_safe(Some(raw));
        if parsed.is_none() {
            *invalid += 1;
        }
        parsed
    };

    let gia = number(cols.gia);
    let mut kpis = crate::types::KpiSnapshot::new();
    for (idx, name) in &cols.kpis {
        if let Some(v) = number(Some(*idx)) {
            kpis.insert(name.clone(), v);
        }
    }

    let riba_stage = parse_i32_safe(cell(record, cols.riba_stage))
        .filter(|s| (RIBA_STAGE_MIN as i32..=RIBA_STAGE_MAX as i32).contains(s))
        .map(|s| s as u8);

    let certifications = cols
        .certifications
        .iter()
        .filter_map(|(idx, field)| cell(record, Some(*idx)).map(|v| (field.clone(), v.to_string())))
        .collect();

    let mut project = Project {
        id: id.to_string(),
        name: text(record, cols.name),
        location: text(record, cols.location),
        sector: text(record, cols.sector),
        sub_sector: text(record, cols.sub_sector),
        project_type: cell(record, cols.project_type).and_then(ProjectType::parse),
        completion_date: parse_date_safe(cell(record, cols.completion_date)),
        gia,
        riba_stage,
        kpis,
        certifications,
        ..Project::default()
    };
    if project.name.is_empty() {
        project.name = project.id.clone();
    }
    if let Some(stage) = riba_stage {
        project.stage_history.insert(stage, project.kpis.clone());
    }
    project
}

/// Fold a later row for the same id into `base`.
fn merge_snapshot(base: &mut Project, row: Project) {
    if let Some(stage) = row.riba_stage {
        base.stage_history.insert(stage, row.kpis.clone());
    }
    let newer = match (base.riba_stage, row.riba_stage) {
        (Some(current), Some(incoming)) => incoming > current,
        (None, Some(_)) => true,
        _ => false,
    };
    if newer {
        let history = std::mem::take(&mut base.stage_history);
        *base = Project {
            stage_history: history,
            ..row
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{TOTAL_EMBODIED_CARBON, UPFRONT_CARBON};
    use std::io::Write;

    const SAMPLE: &str = "\
Id,Name,Sector,SubSector,ProjectType,CompletionDate,GIA,RibaStage,Certification:BREEAM,Upfront Carbon,Total Embodied Carbon,Facade Colour
P1,Civic Library,Education,Library,New Build,2024-03-31,9800,2,Excellent,520,700,Red
P1,Civic Library,Education,Library,New Build,2024-03-31,9800,4,Excellent,450,640,Red
P2,Ward Block,Healthcare,,Retrofit,,n/a,3,N/A,,580,Blue
,Orphan,Workplace,,,,,,,,,
";

    #[test]
    fn rows_with_shared_id_become_stage_history() {
        let t = Taxonomy::default();
        let (projects, report) = read_projects(SAMPLE.as_bytes(), &t).expect("load");
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.projects, 2);
        assert_eq!(report.stage_rows, 1);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.ignored_columns, vec!["Facade Colour".to_string()]);

        let p1 = &projects[0];
        assert_eq!(p1.riba_stage, Some(4));
        assert_eq!(p1.kpi(UPFRONT_CARBON), Some(450.0));
        assert_eq!(p1.stage_history.len(), 2);
        assert_eq!(p1.stage_history[&2][UPFRONT_CARBON], 520.0);
        assert_eq!(p1.certification("BREEAM"), Some("Excellent"));
        assert_eq!(p1.project_type, Some(ProjectType::NewBuild));
        assert_eq!(p1.completion_year(), Some(2024));
    }

    #[test]
    fn unparseable_numbers_are_missing() {
        let t = Taxonomy::default();
        let (projects, report) = read_projects(SAMPLE.as_bytes(), &t).expect("load");
        let p2 = &projects[1];
        assert_eq!(p2.gia, None);
        assert_eq!(p2.kpi(UPFRONT_CARBON), None);
        assert_eq!(p2.kpi(TOTAL_EMBODIED_CARBON), Some(580.0));
        assert_eq!(report.invalid_cells, 1);
    }

    #[test]
    fn missing_id_column_is_an_error() {
        let t = Taxonomy::default();
        let err = read_projects("Name,Sector\nA,Education\n".as_bytes(), &t).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("Id")));
    }

    #[test]
    fn loads_from_disk() {
        let t = Taxonomy::default();
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(SAMPLE.as_bytes()).expect("write");
        let (projects, _) = load_projects(file.path(), &t).expect("load");
        assert_eq!(projects.len(), 2);
    }
}
