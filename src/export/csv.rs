//! CSV export implementation.
//!
//! Exports project results in CSV format for spreadsheet use. Each package
//! is one row; projects without packages get a single row carrying their
//! state.

use super::{metric_value, ExportData, Exporter};
use std::io::{self, Write};

/// CSV exporter implementation.
pub struct CsvExporter;

impl CsvExporter {
    /// Escape a field value for CSV format.
    ///
    /// Wraps the value in quotes if it contains commas, quotes, or newlines.
    fn escape_field(value: &str) -> String {
        if value.contains(',') || value.contains('"') || value.contains('\n') {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
}

impl Exporter for CsvExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let mut header = vec!["project", "state", "package", "version", "kind", "depth"];
        header.extend(data.metrics.iter().map(|m| m.as_str()));
        writeln!(writer, "{}", header.join(","))?;

        let empty_metrics = ",".repeat(data.metrics.len());
        for project in &data.projects {
            let project_name = Self::escape_field(&project.name);

            if project.packages.is_empty() {
                writeln!(
                    writer,
                    "{},{},,,,{}",
                    project_name,
                    Self::escape_field(&project.state.to_string()),
                    empty_metrics
                )?;
                continue;
            }

            for row in &project.packages {
                let values: Vec<String> = data
                    .metrics
                    .iter()
                    .map(|m| metric_value(row.metric(*m)))
                    .collect();

                writeln!(
                    writer,
                    "{},{},{},{},{},{},{}",
                    project_name,
                    Self::escape_field(&project.state.to_string()),
                    Self::escape_field(&row.name),
                    Self::escape_field(&row.version),
                    row.kind,
                    row.depth,
                    values.join(",")
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_data;

    fn export_lines(show_all: bool) -> Vec<String> {
        let data = sample_data(show_all);
        let mut output = Vec::new();
        CsvExporter.export(&data, &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_csv_export_basic() {
        let lines = export_lines(false);

        // Header + App/A + App.Tests + Legacy
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "project,state,package,version,kind,depth,usage,scattering,transitive-count"
        );
        assert_eq!(lines[1], "App,ok,A,1.2.3,explicit,0,30.0,20.0,1");
        assert_eq!(lines[2], "App.Tests,ignored,,,,,,,");
        assert_eq!(lines[3], "Legacy,compilation failed,,,,,,,");
    }

    #[test]
    fn test_csv_export_show_all() {
        let lines = export_lines(true);
        assert_eq!(lines[2], "App,ok,B,4.5.6,transient,1,,,");
    }

    #[test]
    fn test_csv_escape_field() {
        assert_eq!(CsvExporter::escape_field("simple"), "simple");
        assert_eq!(CsvExporter::escape_field("with,comma"), "\"with,comma\"");
        assert_eq!(
            CsvExporter::escape_field("with\"quote"),
            "\"with\"\"quote\""
        );
    }
}
