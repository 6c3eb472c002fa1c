use crate::error::ExportError;
use crate::reports::{Cell, ChartData, ExportTable, TitleBlock};
use crate::units::ascii_safe;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::{error, info};

/// Destination for finished export payloads. A payload is handed over only
/// once it is fully built, so a failing sink never sees a partial file.
pub trait ExportSink {
    fn write_payload(&mut self, name: &str, payload: &str) -> Result<(), ExportError>;
}

/// Writes payloads as files inside one directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| ExportError::SinkUnavailable {
            target: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for FileSink {
    fn write_payload(&mut self, name: &str, payload: &str) -> Result<(), ExportError> {
        let path = self.dir.join(name);
        replace_file(&self.dir, &path, |file| file.write_all(payload.as_bytes())).map_err(
            |source| ExportError::SinkUnavailable {
                target: path.clone(),
                source,
            },
        )?;
        info!(path = %path.display(), bytes = payload.len(), "export written");
        Ok(())
    }
}

/// Fill a temporary file in `dir`, then rename it over `target`. On any
/// failure the temporary file is removed and `target` keeps its old contents.
fn replace_file<F>(dir: &Path, target: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut tmp = NamedTempFile::new_in(dir)?;
    fill(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Keeps payloads in memory, in write order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub payloads: Vec<(String, String)>,
}

impl ExportSink for MemorySink {
    fn write_payload(&mut self, name: &str, payload: &str) -> Result<(), ExportError> {
        self.payloads.push((name.to_string(), payload.to_string()));
        Ok(())
    }
}

/// Build the payload, then hand it to the sink in one step. Failures are
/// logged and returned; nothing reaches the sink when building fails.
pub fn export<S, F>(sink: &mut S, name: &str, build: F) -> Result<(), ExportError>
where
    S: ExportSink + ?Sized,
    F: FnOnce() -> Result<String, ExportError>,
{
    let result = build().and_then(|payload| sink.write_payload(name, &payload));
    if let Err(e) = &result {
        error!(export = name, error = %e, "export failed");
    }
    result
}

fn csv_writer(quote_style: QuoteStyle) -> csv::Writer<Vec<u8>> {
    WriterBuilder::new()
        .quote_style(quote_style)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new())
}

/// A text field wrapped in double quotes, embedded quotes doubled.
fn quoted(text: &str) -> String {
    format!("\"{}\"", ascii_safe(text).replace('"', "\"\""))
}

/// Numeric cells go out bare; every text cell is quoted, including names
/// that happen to parse as numbers (`2024`, `NaN`, `1e5`).
fn cell_field(cell: &Cell) -> String {
    match cell.value {
        Some(_) => cell.text.clone(),
        None => quoted(&cell.text),
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn title_block(title: &TitleBlock) -> String {
    let mut out = String::new();
    for (key, value) in title {
        let value = ascii_safe(value).replace(['\r', '\n'], " ");
        out.push_str(&format!("{}: {}\n", key, value));
    }
    if !title.is_empty() {
        out.push('\n');
    }
    out
}

fn table_csv(table: &ExportTable) -> Result<String, ExportError> {
    // Fields arrive already quoted; the writer only joins them.
    let mut wtr = csv_writer(QuoteStyle::Never);
    wtr.write_record(table.headers.iter().map(|h| quoted(h)))?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(cell_field))?;
    }
    finish(wtr)
}

/// Title block followed by serialized rows. Headers come from the row type.
pub fn csv_payload<T: Serialize>(title: &TitleBlock, rows: &[T]) -> Result<String, ExportError> {
    let mut wtr = csv_writer(QuoteStyle::NonNumeric);
    for r in rows {
        wtr.serialize(r)?;
    }
    let mut out = title_block(title);
    out.push_str(&finish(wtr)?);
    Ok(out)
}

/// Title block, the chart table, then the benchmark block when present.
pub fn chart_payload(chart: &ChartData) -> Result<String, ExportError> {
    let mut out = title_block(&chart.title);
    out.push_str(&table_csv(&chart.table)?);
    if let Some(benchmarks) = &chart.benchmarks {
        out.push('\n');
        out.push_str("Benchmarks\n");
        out.push_str(&table_csv(benchmarks)?);
    }
    Ok(out)
}

pub fn json_payload<T: Serialize>(value: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Markdown preview of serialized report rows, truncated to `max_rows`.
pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let shown = &rows[..rows.len().min(max_rows)];
    let table = Table::new(shown.to_vec()).with(Style::markdown()).to_string();
    println!("{}", table);
    print_truncation(shown.len(), rows.len());
}

fn print_truncation(shown: usize, total: usize) {
    if shown < total {
        println!("... {} of {} rows shown\n", shown, total);
    } else {
        println!();
    }
}

pub fn preview_export_table(table: &ExportTable, max_rows: usize) {
    if table.rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(table.headers.iter().cloned());
    for row in table.rows.iter().take(max_rows) {
        builder.push_record(row.iter().map(|c| c.text.clone()));
    }
    let mut rendered = builder.build();
    rendered.with(Style::markdown());
    println!("{}", rendered);
    print_truncation(table.rows.len().min(max_rows), table.rows.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RatingBucketRow;

    fn title() -> TitleBlock {
        vec![
            ("KPI".to_string(), "Upfront Carbon".to_string()),
            ("Unit".to_string(), "kgCO₂e/m²".to_string()),
        ]
    }

    #[test]
    fn payload_has_title_block_then_table() {
        let mut table = ExportTable::new(vec!["Project".into(), "Value (kgCO₂e/m²)".into()]);
        table.rows.push(vec![Cell::text("Depot"), Cell::number(450.0, 0)]);
        let chart = ChartData {
            title: title(),
            table,
            benchmarks: None,
        };
        let payload = chart_payload(&chart).expect("payload");
        assert_eq!(
            payload,
            "KPI: Upfront Carbon\nUnit: kgCO2e/m2\n\n\"Project\",\"Value (kgCO2e/m2)\"\n\"Depot\",450\n"
        );
    }

    #[test]
    fn names_are_escaped_per_rfc4180() {
        let mut table = ExportTable::new(vec!["Project".into()]);
        table.rows.push(vec![Cell::text("The \"Hub\", Leeds")]);
        let chart = ChartData {
            title: Vec::new(),
            table,
            benchmarks: None,
        };
        let payload = chart_payload(&chart).expect("payload");
        assert_eq!(payload, "\"Project\"\n\"The \"\"Hub\"\", Leeds\"\n");
    }

    #[test]
    fn numeric_looking_names_are_still_quoted() {
        let mut table = ExportTable::new(vec!["Project".into(), "Value".into()]);
        for name in ["2024", "NaN", "inf", "1e5", "Hub"] {
            table.rows.push(vec![Cell::text(name), Cell::number(450.0, 0)]);
        }
        let chart = ChartData {
            title: Vec::new(),
            table,
            benchmarks: None,
        };
        let payload = chart_payload(&chart).expect("payload");
        assert_eq!(
            payload,
            "\"Project\",\"Value\"\n\"2024\",450\n\"NaN\",450\n\"inf\",450\n\"1e5\",450\n\"Hub\",450\n"
        );
    }

    #[test]
    fn missing_number_is_an_empty_quoted_field() {
        let mut table = ExportTable::new(vec!["Project".into(), "Value".into()]);
        table.rows.push(vec![Cell::text("Depot"), Cell::empty()]);
        let chart = ChartData {
            title: Vec::new(),
            table,
            benchmarks: None,
        };
        let payload = chart_payload(&chart).expect("payload");
        assert!(payload.ends_with("\"Depot\",\"\"\n"));
    }

    #[test]
    fn empty_benchmark_block_keeps_header() {
        let chart = ChartData {
            title: Vec::new(),
            table: ExportTable::new(vec!["Project".into()]),
            benchmarks: Some(ExportTable::new(vec!["Benchmark".into(), "Value".into()])),
        };
        let payload = chart_payload(&chart).expect("payload");
        assert_eq!(payload, "\"Project\"\n\nBenchmarks\n\"Benchmark\",\"Value\"\n");
    }

    #[test]
    fn typed_rows_serialize_with_headers() {
        let rows = vec![RatingBucketRow {
            rating: "Very Good".into(),
            projects: 2,
            share_pct: "50.0".into(),
            bar_width_pct: "50.0".into(),
        }];
        let payload = csv_payload(&Vec::new(), &rows).expect("payload");
        assert_eq!(
            payload,
            "\"Rating\",\"Projects\",\"SharePct\",\"BarWidthPct\"\n\"Very Good\",2,50.0,50.0\n"
        );
    }

    struct BrokenSink;

    impl ExportSink for BrokenSink {
        fn write_payload(&mut self, name: &str, _payload: &str) -> Result<(), ExportError> {
            Err(ExportError::SinkUnavailable {
                target: PathBuf::from(name),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[test]
    fn failing_sink_is_reported() {
        let result = export(&mut BrokenSink, "chart.csv", || Ok("x".to_string()));
        assert!(matches!(result, Err(ExportError::SinkUnavailable { .. })));
    }

    #[test]
    fn failed_build_never_reaches_sink() {
        let mut sink = MemorySink::default();
        let result = export(&mut sink, "chart.csv", || {
            Err(ExportError::Io(std::io::Error::other("boom")))
        });
        assert!(result.is_err());
        assert!(sink.payloads.is_empty());
    }

    #[test]
    fn file_sink_writes_into_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = FileSink::new(dir.path().join("reports")).expect("sink");
        export(&mut sink, "a.csv", || Ok("\"x\"\n".to_string())).expect("export");
        let written = fs::read_to_string(sink.dir().join("a.csv")).expect("read back");
        assert_eq!(written, "\"x\"\n");
    }

    #[test]
    fn file_sink_overwrites_previous_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = FileSink::new(dir.path()).expect("sink");
        export(&mut sink, "a.csv", || Ok("old\n".to_string())).expect("first export");
        export(&mut sink, "a.csv", || Ok("new\n".to_string())).expect("second export");
        let written = fs::read_to_string(dir.path().join("a.csv")).expect("read back");
        assert_eq!(written, "new\n");
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
    }

    #[test]
    fn interrupted_write_leaves_existing_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("report.csv");
        fs::write(&target, "\"Project\"\n\"Depot\"\n").expect("seed");

        let result = replace_file(dir.path(), &target, |file| {
            file.write_all(b"\"Proj")?;
            Err(io::Error::other("disk full"))
        });
        assert!(result.is_err());

        let kept = fs::read_to_string(&target).expect("read back");
        assert_eq!(kept, "\"Project\"\n\"Depot\"\n");
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
    }

    #[test]
    fn file_sink_unavailable_when_directory_cannot_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("taken");
        fs::write(&blocker, "file, not dir").expect("write");
        let result = FileSink::new(blocker.join("reports"));
        assert!(matches!(result, Err(ExportError::SinkUnavailable { .. })));
    }
}
