//! Export functionality for usage analysis results.
//!
//! This module provides exporters for outputting project results in
//! various formats: JSON, CSV, and Markdown.

pub mod csv;
pub mod json;
pub mod markdown;

use std::io::{self, Write};
use std::time::Duration;

use crate::graph::ReferenceKind;
use crate::metrics::{MetricName, MetricResult, MetricSet};
use crate::report::{HasMetricsFilter, NoopFilter, ProjectResult, ProjectState, ResultFilter};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// JSON format - machine-readable, full data
    Json,
    /// CSV format - spreadsheet-friendly
    Csv,
    /// Markdown format - documentation/reporting
    #[default]
    Markdown,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(format!(
                "Unknown export format: '{}'. Valid formats: json, csv, markdown",
                s
            )),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// One package line of a project report.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRow {
    pub depth: usize,
    pub name: String,
    pub version: String,
    pub kind: ReferenceKind,
    pub metrics: MetricSet,
}

impl PackageRow {
    pub fn metric(&self, name: MetricName) -> Option<&MetricResult> {
        self.metrics.get(name)
    }
}

/// A project as it appears in a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectExport {
    pub name: String,
    pub state: ProjectState,
    pub elapsed: Duration,
    pub message: Option<String>,
    pub packages: Vec<PackageRow>,
    /// Package identities (`name@version`) of each dependency cycle.
    pub cycles: Vec<Vec<String>>,
}

/// Data container for export operations.
///
/// Holds every project result of a run, already filtered and laid out in
/// report order.
#[derive(Debug, Clone)]
pub struct ExportData {
    /// Solution name
    pub solution_name: String,
    /// Metric columns, in order
    pub metrics: Vec<MetricName>,
    /// Whether packages without metric values are listed
    pub show_all: bool,
    /// Project reports in the order they were added
    pub projects: Vec<ProjectExport>,
}

impl ExportData {
    pub fn new(solution_name: impl Into<String>, metrics: Vec<MetricName>, show_all: bool) -> Self {
        Self {
            solution_name: solution_name.into(),
            metrics,
            show_all,
            projects: Vec::new(),
        }
    }

    /// Adds a project result, applying the report filter.
    pub fn add_project(&mut self, result: &ProjectResult) {
        let filter: Box<dyn ResultFilter> = if self.show_all {
            Box::new(NoopFilter)
        } else {
            Box::new(HasMetricsFilter::new(result))
        };

        let packages = result
            .rows(filter.as_ref())
            .into_iter()
            .map(|row| PackageRow {
                depth: row.depth,
                name: row.key.name.clone(),
                version: row.key.version.to_string(),
                kind: row.kind,
                metrics: row.metrics.cloned().unwrap_or_default(),
            })
            .collect();

        let cycles = result
            .graph
            .detect_cycles()
            .into_iter()
            .map(|cycle| cycle.iter().map(|k| k.to_string()).collect())
            .collect();

        self.projects.push(ProjectExport {
            name: result.name.clone(),
            state: result.state,
            elapsed: result.elapsed,
            message: result.message.clone(),
            packages,
            cycles,
        });
    }

    /// Orders projects by name (case-insensitive).
    pub fn sort_projects(&mut self) {
        self.projects.sort_by_key(|p| p.name.to_lowercase());
    }

    fn count_state(&self, state: ProjectState) -> usize {
        self.projects.iter().filter(|p| p.state == state).count()
    }

    /// Get count of successfully analyzed projects
    pub fn analyzed_count(&self) -> usize {
        self.count_state(ProjectState::Ok)
    }

    /// Get count of ignored projects
    pub fn ignored_count(&self) -> usize {
        self.count_state(ProjectState::Ignored)
    }

    /// Get count of projects that failed to load or compile
    pub fn failed_count(&self) -> usize {
        self.count_state(ProjectState::LoadFailed) + self.count_state(ProjectState::CompilationFailed)
    }
}

/// Renders a metric value without its unit, as used in tables.
pub(crate) fn metric_value(result: Option<&MetricResult>) -> String {
    match result {
        Some(MetricResult::Usage(p)) | Some(MetricResult::Scattering(p)) => format!("{:.1}", p),
        Some(MetricResult::TransitiveCount(n)) => n.to_string(),
        None => String::new(),
    }
}

/// Trait for exporters.
pub trait Exporter {
    /// Export the data to the given writer.
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()>;
}

/// Export data in the specified format.
pub fn export<W: Write>(format: ExportFormat, data: &ExportData, writer: &mut W) -> io::Result<()> {
    match format {
        ExportFormat::Json => json::JsonExporter.export(data, writer),
        ExportFormat::Csv => csv::CsvExporter.export(data, writer),
        ExportFormat::Markdown => markdown::MarkdownExporter.export(data, writer),
    }
}

/// Export data to a string.
pub fn export_to_string(format: ExportFormat, data: &ExportData) -> io::Result<String> {
    let mut buffer = Vec::new();
    export(format, data, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
