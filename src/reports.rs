// Chart and export data builder.
//
// Everything shown in a table, fed to a chart renderer or written to CSV is
// formatted here, once. Screen previews and exports read the same strings,
// so the two cannot drift apart.

use crate::aggregator::{SectorStats, SectorSummary};
use crate::benchmarks::{BenchmarkCategory, BenchmarkTable};
use crate::bucketer::RatingBuckets;
use crate::taxonomy::{Taxonomy, BIOGENIC_CARBON, TOTAL_EMBODIED_CARBON};
use crate::transform::{to_display_value, AreaLookup};
use crate::types::{
    normalize_project_id, Project, RatingBucketRow, SectorSummaryRow, SummaryStats, ValueType,
};
use crate::units::format_unit;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// `key: value` lines written above a table.
pub type TitleBlock = Vec<(String, String)>;

const PERCENT_DECIMALS: usize = 1;
const AREA_DECIMALS: usize = 0;

/// Round half away from zero to `decimals` places; never yields `-0`.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// The one number formatter used by every table and export.
pub fn format_value(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, round_to(value, decimals))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    /// Numeric value exactly as rendered in `text`.
    pub value: Option<f64>,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: None,
        }
    }

    pub fn number(value: f64, decimals: usize) -> Self {
        let rounded = round_to(value, decimals);
        Self {
            text: format!("{:.*}", decimals, rounded),
            value: Some(rounded),
        }
    }

    pub fn empty() -> Self {
        Self::text("")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ExportTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartMode {
    /// One point per project, primary KPI against a second KPI.
    CompareKpis { secondary_kpi: String },
    /// One bar per project for the primary KPI.
    SingleProjectBar,
    /// One project's primary KPI across RIBA stages.
    SingleProjectTimeline { project_id: String },
}

impl ChartMode {
    pub fn label(&self) -> &'static str {
        match self {
            ChartMode::CompareKpis { .. } => "KPI comparison",
            ChartMode::SingleProjectBar => "Project bar chart",
            ChartMode::SingleProjectTimeline { .. } => "Project timeline",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub mode: ChartMode,
    pub primary_kpi: String,
    pub value_type: ValueType,
    pub include_benchmarks: bool,
}

/// Read-only collaborators shared by every build call.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub taxonomy: &'a Taxonomy,
    pub areas: &'a AreaLookup,
    pub benchmarks: &'a BenchmarkTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub title: TitleBlock,
    pub table: ExportTable,
    /// Present when benchmarks were requested and apply to the KPI; may have
    /// no rows when the table has no entry for the resolved key.
    pub benchmarks: Option<ExportTable>,
}

impl ChartData {
    /// Numeric columns as series for a renderer, labelled by the first
    /// column. Values are the rounded numbers shown in the table.
    pub fn series(&self) -> Vec<ChartSeries> {
        let mut out = Vec::new();
        for (col, name) in self.table.headers.iter().enumerate().skip(1) {
            let points: Vec<ChartPoint> = self
                .table
                .rows
                .iter()
                .filter_map(|row| {
                    let cell = row.get(col)?;
                    let value = cell.value?;
                    Some(ChartPoint {
                        label: row.first().map(|c| c.text.clone()).unwrap_or_default(),
                        value,
                        text: cell.text.clone(),
                    })
                })
                .collect();
            if !points.is_empty() {
                out.push(ChartSeries {
                    name: name.clone(),
                    points,
                });
            }
        }
        out
    }
}

/// A KPI as it appears in one table column.
struct KpiColumn {
    name: String,
    unit: String,
    decimals: usize,
    value_type: ValueType,
}

impl KpiColumn {
    fn new(name: &str, requested: ValueType, taxonomy: &Taxonomy) -> Self {
        let value_type = taxonomy.effective_value_type(name, requested);
        Self {
            name: name.to_string(),
            unit: format_unit(taxonomy.unit(name), value_type, false),
            decimals: taxonomy.decimals(name),
            value_type,
        }
    }

    fn header(&self) -> String {
        if self.unit.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.unit)
        }
    }

    fn value(&self, project: &Project, areas: &AreaLookup) -> Option<f64> {
        project
            .kpi(&self.name)
            .map(|raw| to_display_value(raw, &project.id, self.value_type, areas))
    }
}

fn entry(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

pub fn build_chart<P: Borrow<Project>>(
    projects: &[P],
    request: &ChartRequest,
    ctx: &BuildContext<'_>,
) -> ChartData {
    let primary = KpiColumn::new(&request.primary_kpi, request.value_type, ctx.taxonomy);
    let mut title = vec![
        entry("Chart", request.mode.label()),
        entry("KPI", primary.name.clone()),
        entry("Value Type", request.value_type.label()),
        entry("Unit", primary.unit.clone()),
    ];

    let (table, anchor) = match &request.mode {
        ChartMode::CompareKpis { secondary_kpi } => {
            let secondary = KpiColumn::new(secondary_kpi, request.value_type, ctx.taxonomy);
            title.push(entry("Secondary KPI", secondary.name.clone()));
            title.push(entry("Secondary Unit", secondary.unit.clone()));
            compare_table(projects, &primary, &secondary, ctx)
        }
        ChartMode::SingleProjectBar => bar_table(projects, &primary, ctx),
        ChartMode::SingleProjectTimeline { project_id } => {
            title.push(entry("Project", project_id.clone()));
            timeline_table(projects, project_id, &primary, ctx)
        }
    };
    title.push(entry("Rows", table.rows.len().to_string()));

    let benchmarks = if request.include_benchmarks {
        BenchmarkTable::category_for(&primary.name, primary.value_type)
            .map(|category| benchmark_block(anchor, category, &primary, ctx))
    } else {
        None
    };

    debug!(
        mode = request.mode.label(),
        kpi = %primary.name,
        rows = table.rows.len(),
        benchmarks = benchmarks.as_ref().map(|b| b.rows.len()),
        "built chart data"
    );
    ChartData {
        title,
        table,
        benchmarks,
    }
}

fn sector_label(project: &Project, taxonomy: &Taxonomy) -> String {
    taxonomy.resolve_sector(&project.sector).to_string()
}

fn compare_table<'p, P: Borrow<Project>>(
    projects: &'p [P],
    x: &KpiColumn,
    y: &KpiColumn,
    ctx: &BuildContext<'_>,
) -> (ExportTable, Option<&'p Project>) {
    let mut table = ExportTable::new(vec![
        "Project".to_string(),
        "Sector".to_string(),
        x.header(),
        y.header(),
    ]);
    let mut anchor = None;
    for p in projects {
        let p: &Project = p.borrow();
        let (Some(xv), Some(yv)) = (x.value(p, ctx.areas), y.value(p, ctx.areas)) else {
            continue;
        };
        anchor.get_or_insert(p);
        table.rows.push(vec![
            Cell::text(p.name.clone()),
            Cell::text(sector_label(p, ctx.taxonomy)),
            Cell::number(xv, x.decimals),
            Cell::number(yv, y.decimals),
        ]);
    }
    (table, anchor)
}

fn bar_table<'p, P: Borrow<Project>>(
    projects: &'p [P],
    kpi: &KpiColumn,
    ctx: &BuildContext<'_>,
) -> (ExportTable, Option<&'p Project>) {
    // Total embodied carbon is charted with its biogenic credit alongside.
    let biogenic = kpi
        .name
        .eq_ignore_ascii_case(TOTAL_EMBODIED_CARBON)
        .then(|| KpiColumn::new(BIOGENIC_CARBON, kpi.value_type, ctx.taxonomy));

    let mut headers = vec!["Project".to_string(), "Sector".to_string(), kpi.header()];
    if let Some(col) = &biogenic {
        headers.push(col.header());
    }
    let mut table = ExportTable::new(headers);
    let mut anchor = None;
    for p in projects {
        let p: &Project = p.borrow();
        let Some(value) = kpi.value(p, ctx.areas) else {
            continue;
        };
        anchor.get_or_insert(p);
        let mut row = vec![
            Cell::text(p.name.clone()),
            Cell::text(sector_label(p, ctx.taxonomy)),
            Cell::number(value, kpi.decimals),
        ];
        if let Some(col) = &biogenic {
            row.push(match col.value(p, ctx.areas) {
                Some(v) => Cell::number(-v.abs(), col.decimals),
                None => Cell::empty(),
            });
        }
        table.rows.push(row);
    }
    (table, anchor)
}

fn timeline_table<'p, P: Borrow<Project>>(
    projects: &'p [P],
    project_id: &str,
    kpi: &KpiColumn,
    ctx: &BuildContext<'_>,
) -> (ExportTable, Option<&'p Project>) {
    let mut table = ExportTable::new(vec!["Stage".to_string(), kpi.header()]);
    let wanted = normalize_project_id(project_id);
    let found = projects
        .iter()
        .map(|p| -> &'p Project { p.borrow() })
        .find(|p| p.id == project_id)
        .or_else(|| {
            projects
                .iter()
                .map(|p| -> &'p Project { p.borrow() })
                .find(|p| normalize_project_id(&p.id) == wanted)
        });
    let Some(project) = found else {
        debug!(project_id, "timeline project not in working set");
        return (table, None);
    };

    let mut by_stage: BTreeMap<u8, f64> = project
        .stage_history
        .iter()
        .filter_map(|(stage, kpis)| {
            let raw = kpis.get(&kpi.name).copied().filter(|v| v.is_finite())?;
            Some((*stage, raw))
        })
        .collect();
    match (project.riba_stage, project.kpi(&kpi.name)) {
        (Some(stage), Some(current)) => {
            by_stage.entry(stage).or_insert(current);
        }
        (None, Some(current)) if by_stage.is_empty() => {
            let value = to_display_value(current, &project.id, kpi.value_type, ctx.areas);
            table
                .rows
                .push(vec![Cell::text("Current"), Cell::number(value, kpi.decimals)]);
            return (table, Some(project));
        }
        _ => {}
    }

    for (stage, raw) in by_stage {
        let value = to_display_value(raw, &project.id, kpi.value_type, ctx.areas);
        table.rows.push(vec![
            Cell::text(format!("RIBA Stage {}", stage)),
            Cell::number(value, kpi.decimals),
        ]);
    }
    (table, Some(project))
}

fn benchmark_block(
    anchor: Option<&Project>,
    category: BenchmarkCategory,
    kpi: &KpiColumn,
    ctx: &BuildContext<'_>,
) -> ExportTable {
    let mut table = ExportTable::new(vec![
        "Benchmark".to_string(),
        "Scheme".to_string(),
        "Value".to_string(),
        "Unit".to_string(),
    ]);
    let Some(project) = anchor else {
        return table;
    };
    let sector = ctx.taxonomy.resolve_sector(&project.sector);
    let key = ctx
        .benchmarks
        .resolve_key(sector, &project.sub_sector, project.completion_year());
    for b in ctx.benchmarks.lookup(&key, category) {
        table.rows.push(vec![
            Cell::text(b.label.clone()),
            Cell::text(b.scheme.clone()),
            Cell::number(b.value, kpi.decimals),
            Cell::text(kpi.unit.clone()),
        ]);
    }
    table
}

pub fn sector_summary_title(summary: &SectorSummary, taxonomy: &Taxonomy) -> TitleBlock {
    let value_type = taxonomy.effective_value_type(&summary.kpi, summary.value_type);
    vec![
        entry("Report", "Sector summary"),
        entry("KPI", summary.kpi.clone()),
        entry("Value Type", summary.value_type.label()),
        entry("Unit", format_unit(taxonomy.unit(&summary.kpi), value_type, false)),
    ]
}

/// One row per sector in canonical order, then a cumulative `Total` row.
/// Empty sectors report zeros.
pub fn sector_summary_rows(summary: &SectorSummary, taxonomy: &Taxonomy) -> Vec<SectorSummaryRow> {
    let decimals = taxonomy.decimals(&summary.kpi);
    let row = |label: String, stats: &SectorStats| SectorSummaryRow {
        sector: label,
        projects: stats.count,
        average: format_value(stats.average(), decimals),
        min: format_value(stats.min(), decimals),
        max: format_value(stats.max(), decimals),
        range: format_value(stats.range(), decimals),
        total: format_value(stats.total_value, decimals),
        total_area: format_value(stats.total_area, AREA_DECIMALS),
    };
    let mut rows: Vec<SectorSummaryRow> = summary
        .iter()
        .map(|(sector, stats)| row(sector.to_string(), stats))
        .collect();
    rows.push(row("Total".to_string(), &summary.totals()));
    rows
}

pub fn rating_distribution_title(buckets: &RatingBuckets<'_>, considered: usize) -> TitleBlock {
    vec![
        entry("Report", "Rating distribution"),
        entry("Scheme", buckets.scheme.name.clone()),
        entry("Projects", considered.to_string()),
        entry("Rated", buckets.rated_total().to_string()),
    ]
}

/// One row per declared rating, best first, including empty buckets.
pub fn rating_distribution_rows(buckets: &RatingBuckets<'_>) -> Vec<RatingBucketRow> {
    let rated = buckets.rated_total();
    buckets
        .iter()
        .zip(buckets.bar_widths())
        .map(|(bucket, width)| {
            let share = if rated == 0 {
                0.0
            } else {
                bucket.count() as f64 / rated as f64 * 100.0
            };
            RatingBucketRow {
                rating: bucket.rating.to_string(),
                projects: bucket.count(),
                share_pct: format_value(share, PERCENT_DECIMALS),
                bar_width_pct: format_value(width, PERCENT_DECIMALS),
            }
        })
        .collect()
}

pub fn generate_summary<P: Borrow<Project>>(
    projects: &[P],
    kpi: &str,
    value_type: ValueType,
    taxonomy: &Taxonomy,
    areas: &AreaLookup,
) -> SummaryStats {
    let effective = taxonomy.effective_value_type(kpi, value_type);
    let mut sectors = HashSet::new();
    let mut certified = 0usize;
    let mut values = Vec::new();
    for p in projects {
        let p: &Project = p.borrow();
        sectors.insert(taxonomy.resolve_sector(&p.sector));
        if taxonomy
            .schemes()
            .iter()
            .any(|s| s.resolve_rating(p).is_some())
        {
            certified += 1;
        }
        if let Some(raw) = p.kpi(kpi) {
            values.push(to_display_value(raw, &p.id, effective, areas));
        }
    }
    let total = projects.len();
    let certified_share_pct = if total == 0 {
        0.0
    } else {
        round_to(certified as f64 / total as f64 * 100.0, PERCENT_DECIMALS)
    };
    let mean_kpi = if values.is_empty() {
        0.0
    } else {
        round_to(
            values.iter().sum::<f64>() / values.len() as f64,
            taxonomy.decimals(kpi),
        )
    };
    SummaryStats {
        total_projects: total,
        sectors_represented: sectors.len(),
        certified_projects: certified,
        certified_share_pct,
        kpi: kpi.to_string(),
        value_type,
        projects_with_kpi: values.len(),
        mean_kpi,
    }
}
