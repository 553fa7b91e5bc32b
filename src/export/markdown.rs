//! Markdown export implementation.
//!
//! Exports project results in Markdown format for documentation and reporting.

use super::{metric_value, ExportData, Exporter, ProjectExport};
use crate::metrics::MetricName;
use crate::report::ProjectState;
use std::io::{self, Write};

/// Markdown exporter implementation.
pub struct MarkdownExporter;

impl MarkdownExporter {
    /// Indents nested packages; table cells drop leading whitespace.
    fn indent(depth: usize) -> String {
        if depth == 0 {
            String::new()
        } else {
            format!("{}└ ", "&nbsp;&nbsp;".repeat(depth - 1))
        }
    }

    fn escape_cell(value: &str) -> String {
        value.replace('|', "\\|")
    }

    fn write_project<W: Write>(
        writer: &mut W,
        project: &ProjectExport,
        metrics: &[MetricName],
    ) -> io::Result<()> {
        writeln!(writer, "## {}", project.name)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "**State:** {} ({} ms)",
            project.state,
            project.elapsed.as_millis()
        )?;
        writeln!(writer)?;

        if let Some(message) = &project.message {
            writeln!(writer, "> {}", message)?;
            writeln!(writer)?;
        }

        if project.state != ProjectState::Ok {
            return Ok(());
        }

        if project.packages.is_empty() {
            writeln!(writer, "_No packages to report._")?;
            writeln!(writer)?;
            return Ok(());
        }

        let mut header = String::from("| Package | Version | Kind |");
        let mut divider = String::from("|---------|---------|------|");
        for metric in metrics {
            header.push_str(&format!(" {} |", metric.title()));
            divider.push_str(&format!("{}|", "-".repeat(metric.title().len() + 2)));
        }
        writeln!(writer, "{}", header)?;
        writeln!(writer, "{}", divider)?;

        for row in &project.packages {
            write!(
                writer,
                "| {}{} | {} | {} |",
                Self::indent(row.depth),
                Self::escape_cell(&row.name),
                row.version,
                row.kind
            )?;
            for metric in metrics {
                let value = metric_value(row.metric(*metric));
                match metric {
                    MetricName::TransitiveCount => write!(writer, " {} |", value)?,
                    _ if value.is_empty() => write!(writer, "  |")?,
                    _ => write!(writer, " {}% |", value)?,
                }
            }
            writeln!(writer)?;
        }
        writeln!(writer)?;

        if !project.cycles.is_empty() {
            writeln!(writer, "### Dependency Cycles")?;
            writeln!(writer)?;
            for cycle in &project.cycles {
                writeln!(writer, "- {}", cycle.join(" → "))?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}

impl Exporter for MarkdownExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        // Title
        writeln!(writer, "# Package Usage Report")?;
        writeln!(writer)?;
        writeln!(writer, "**Solution:** {}", data.solution_name)?;
        writeln!(writer)?;

        // Summary section
        writeln!(writer, "## Summary")?;
        writeln!(writer)?;
        writeln!(writer, "| Projects | Count |")?;
        writeln!(writer, "|----------|-------|")?;
        writeln!(writer, "| Total | {} |", data.projects.len())?;
        writeln!(writer, "| Analyzed | {} |", data.analyzed_count())?;
        writeln!(writer, "| Failed | {} |", data.failed_count())?;
        writeln!(writer, "| Ignored | {} |", data.ignored_count())?;
        writeln!(writer)?;

        for project in &data.projects {
            Self::write_project(writer, project, &data.metrics)?;
        }

        // Footer
        writeln!(writer, "---")?;
        writeln!(writer)?;
        writeln!(
            writer,
            "*Generated by [usagescope](https://github.com/zach-fau/usagescope)*"
        )?;

        Ok(())
    }
}
