//! JSON export implementation.
//!
//! Exports project results in JSON format for machine-readable output.

use super::{ExportData, Exporter, PackageRow, ProjectExport};
use crate::graph::ReferenceKind;
use crate::metrics::{MetricName, MetricResult};
use crate::report::ProjectState;
use serde::Serialize;
use std::io::{self, Write};

/// JSON exporter implementation.
pub struct JsonExporter;

/// Metric values of a package; absent metrics are omitted.
#[derive(Serialize, Default)]
struct JsonMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scattering: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transitive_count: Option<usize>,
}

/// Serializable package for JSON output.
#[derive(Serialize)]
struct JsonPackage {
    name: String,
    version: String,
    kind: ReferenceKind,
    depth: usize,
    metrics: JsonMetrics,
}

/// Serializable project for JSON output.
#[derive(Serialize)]
struct JsonProject {
    name: String,
    state: ProjectState,
    elapsed_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    packages: Vec<JsonPackage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependency_cycles: Vec<Vec<String>>,
}

/// Summary statistics for JSON output.
#[derive(Serialize)]
struct JsonSummary {
    projects: usize,
    analyzed: usize,
    failed: usize,
    ignored: usize,
}

/// Root JSON export structure.
#[derive(Serialize)]
struct JsonExport {
    solution: String,
    metrics: Vec<MetricName>,
    summary: JsonSummary,
    projects: Vec<JsonProject>,
}

fn json_metrics(row: &PackageRow) -> JsonMetrics {
    let mut metrics = JsonMetrics::default();
    for (_, result) in row.metrics.iter() {
        match *result {
            MetricResult::Usage(p) => metrics.usage = Some(p),
            MetricResult::Scattering(p) => metrics.scattering = Some(p),
            MetricResult::TransitiveCount(n) => metrics.transitive_count = Some(n),
        }
    }
    metrics
}

fn json_project(project: &ProjectExport) -> JsonProject {
    JsonProject {
        name: project.name.clone(),
        state: project.state,
        elapsed_ms: project.elapsed.as_millis(),
        message: project.message.clone(),
        packages: project
            .packages
            .iter()
            .map(|row| JsonPackage {
                name: row.name.clone(),
                version: row.version.clone(),
                kind: row.kind,
                depth: row.depth,
                metrics: json_metrics(row),
            })
            .collect(),
        dependency_cycles: project.cycles.clone(),
    }
}

impl Exporter for JsonExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let export = JsonExport {
            solution: data.solution_name.clone(),
            metrics: data.metrics.clone(),
            summary: JsonSummary {
                projects: data.projects.len(),
                analyzed: data.analyzed_count(),
                failed: data.failed_count(),
                ignored: data.ignored_count(),
            },
            projects: data.projects.iter().map(json_project).collect(),
        };

        let json = serde_json::to_string_pretty(&export)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(writer, "{}", json)
    }
}
