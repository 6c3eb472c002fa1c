// Entry point and interactive menu.
//
// - Option [1] loads the project dataset, printing diagnostics.
// - Option [2] writes the sector summary, rating distribution, chart exports
//   and a JSON summary, previewing each on the console.
// - After generating reports, the user can go back to the menu or exit.
use kpi_dashboard::benchmarks::STANDARD_BENCHMARKS;
use kpi_dashboard::config::DashboardConfig;
use kpi_dashboard::confirm::{ConfirmFlow, ConfirmState};
use kpi_dashboard::output::{self, ExportSink, FileSink};
use kpi_dashboard::reports::{
    generate_summary, rating_distribution_rows, rating_distribution_title, sector_summary_rows,
    sector_summary_title,
};
use kpi_dashboard::taxonomy::STANDARD_TAXONOMY;
use kpi_dashboard::{
    aggregate_by_sector, bucket_by_rating, build_chart, loader, util, BuildContext, ChartMode,
    ChartRequest, Project,
};
use std::io::{self, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct App {
    config: DashboardConfig,
    data: Option<Vec<Project>>,
}

/// Read one trimmed line; `None` once stdin is closed.
fn read_line() -> Option<String> {
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    read_line()
}

/// Returns `true` if the user chose to go back to the menu.
fn prompt_back_to_menu() -> bool {
    let mut flow = ConfirmFlow::new("Back to Report Selection (Y/N): ");
    loop {
        print!("{}", flow.request());
        let Some(input) = read_line() else {
            return false;
        };
        match flow.answer(&input) {
            ConfirmState::Committed => return true,
            ConfirmState::Cancelled => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(app: &mut App) {
    let path = &app.config.dataset_path;
    match loader::load_projects(path, &STANDARD_TAXONOMY) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} rows read, {} projects)",
                util::format_int(report.total_rows),
                util::format_int(report.projects)
            );
            if report.stage_rows > 0 {
                println!(
                    "Info: {} rows merged as RIBA stage snapshots.",
                    util::format_int(report.stage_rows)
                );
            }
            if report.skipped_rows > 0 {
                println!(
                    "Note: {} rows skipped (no project id or unreadable).",
                    util::format_int(report.skipped_rows)
                );
            }
            if !report.ignored_columns.is_empty() {
                println!("Note: ignored columns: {}", report.ignored_columns.join(", "));
            }
            println!();
            info!(projects = report.projects, path = %path.display(), "dataset loaded");
            app.data = Some(data);
        }
        Err(e) => {
            error!(error = %e, path = %path.display(), "dataset load failed");
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn write_or_report<S: ExportSink>(
    sink: &mut S,
    name: &str,
    build: impl FnOnce() -> Result<String, kpi_dashboard::ExportError>,
) {
    if let Err(e) = output::export(sink, name, build) {
        eprintln!("Write error: {}", e);
    }
}

fn handle_generate_reports(app: &App) {
    let Some(data) = app.data.as_deref() else {
        println!("Error: No data loaded. Please load the dataset first (option 1).\n");
        return;
    };
    let cfg = &app.config;
    let taxonomy = &*STANDARD_TAXONOMY;
    let projects = cfg.filter.apply(data, taxonomy);
    let areas = cfg.area_lookup(data);

    let mut sink = match FileSink::new(cfg.output_dir.clone()) {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "export directory unavailable");
            eprintln!("Export unavailable: {}\n", e);
            return;
        }
    };

    println!("Generating reports...");
    println!("Outputs saved to {}\n", sink.dir().display());

    let summary = aggregate_by_sector(&projects, &cfg.primary_kpi, cfg.value_type, taxonomy, &areas);
    let title1 = sector_summary_title(&summary, taxonomy);
    let r1 = sector_summary_rows(&summary, taxonomy);
    let file1 = "report1_sector_summary.csv";
    write_or_report(&mut sink, file1, || output::csv_payload(&title1, &r1));
    println!("Report 1: Sector Summary");
    println!("{} ({})\n", cfg.primary_kpi, cfg.value_type.label());
    output::preview_table_rows(&r1, r1.len());
    println!("(Full table exported to {})\n", file1);

    match taxonomy.scheme(&cfg.scheme) {
        Some(scheme) => {
            let buckets = bucket_by_rating(&projects, scheme);
            let title2 = rating_distribution_title(&buckets, projects.len());
            let r2 = rating_distribution_rows(&buckets);
            let file2 = "report2_rating_distribution.csv";
            write_or_report(&mut sink, file2, || output::csv_payload(&title2, &r2));
            println!("Report 2: {} Rating Distribution\n", scheme.name);
            output::preview_table_rows(&r2, r2.len());
            println!("(Full table exported to {})\n", file2);
        }
        None => println!("Report 2 skipped: unknown certification scheme `{}`.\n", cfg.scheme),
    }

    let ctx = BuildContext {
        taxonomy,
        areas: &areas,
        benchmarks: &STANDARD_BENCHMARKS,
    };
    let mut modes = vec![
        (
            "report3_kpi_comparison.csv",
            ChartMode::CompareKpis {
                secondary_kpi: cfg.secondary_kpi.clone(),
            },
        ),
        ("report4_project_bars.csv", ChartMode::SingleProjectBar),
    ];
    if let Some(p) = projects.iter().find(|p| !p.stage_history.is_empty()) {
        modes.push((
            "report5_project_timeline.csv",
            ChartMode::SingleProjectTimeline {
                project_id: p.id.clone(),
            },
        ));
    }
    for (idx, (file, mode)) in modes.into_iter().enumerate() {
        let request = ChartRequest {
            mode,
            primary_kpi: cfg.primary_kpi.clone(),
            value_type: cfg.value_type,
            include_benchmarks: cfg.benchmarks_enabled,
        };
        let chart = build_chart(&projects, &request, &ctx);
        write_or_report(&mut sink, file, || output::chart_payload(&chart));
        println!("Report {}: {}\n", idx + 3, request.mode.label());
        output::preview_export_table(&chart.table, 5);
        if let Some(benchmarks) = &chart.benchmarks {
            println!("Benchmarks");
            output::preview_export_table(benchmarks, benchmarks.rows.len());
        }
        println!("(Full table exported to {})\n", file);
    }

    let stats = generate_summary(&projects, &cfg.primary_kpi, cfg.value_type, taxonomy, &areas);
    write_or_report(&mut sink, "summary.json", || output::json_payload(&stats));
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"projects\": {}, \"certified_share_pct\": {}, \"mean_kpi\": {}}}\n",
        util::format_int(stats.total_projects),
        util::format_number(stats.certified_share_pct, 1),
        util::format_number(stats.mean_kpi, 2)
    );
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = DashboardConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Config error: {} (using defaults)\n", e);
        DashboardConfig::default()
    });
    let mut app = App { config, data: None };

    loop {
        println!("Sustainability KPI Dashboard:");
        println!("[1] Load the dataset");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut app),
            "2" => {
                println!();
                handle_generate_reports(&app);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}
