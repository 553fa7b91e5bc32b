//! Package usage metrics.
//!
//! Each metric implements [`Metric`] and computes an optional
//! [`MetricResult`] for one bound package. `None` means the metric has no
//! signal for that package, which is distinct from a zero value.
//!
//! The set of metrics to run is a plain list built by the caller:
//!
//! ```rust
//! use usagescope::metrics::{create_metrics, MetricName};
//!
//! let metrics = create_metrics(&[MetricName::Usage, MetricName::Scattering]);
//! assert_eq!(metrics.len(), 2);
//!
//! let all = create_metrics(&[]);
//! assert_eq!(all.len(), 3);
//! ```

mod scattering;
mod transitive;
mod usage;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::analysis::{BoundPackage, UsageRegistry};
use crate::graph::PackageGraph;
use crate::oracle::ProjectMetadata;

pub use scattering::{scattering_percentage, ScatteringMetric};
pub use transitive::TransitiveCountMetric;
pub use usage::{usage_percentage, UsageMetric};

/// Identifies a metric on the command line and in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricName {
    Usage,
    Scattering,
    TransitiveCount,
}

impl MetricName {
    pub const ALL: [MetricName; 3] = [
        MetricName::Usage,
        MetricName::Scattering,
        MetricName::TransitiveCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Usage => "usage",
            MetricName::Scattering => "scattering",
            MetricName::TransitiveCount => "transitive-count",
        }
    }

    /// Column heading used by report exporters.
    pub fn title(&self) -> &'static str {
        match self {
            MetricName::Usage => "Usage",
            MetricName::Scattering => "Scattering",
            MetricName::TransitiveCount => "Transitive Count",
        }
    }

    /// Comma separated list of every valid name.
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(MetricName::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown metric name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown metric '{name}'. Available metrics: {available}")]
pub struct UnknownMetric {
    pub name: String,
    pub available: String,
}

impl FromStr for MetricName {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownMetric {
                name: wanted.to_string(),
                available: Self::available(),
            })
    }
}

/// A computed metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "metric", content = "value", rename_all = "kebab-case")]
pub enum MetricResult {
    /// Percentage of the package's exported symbols the project references.
    Usage(f64),
    /// Percentage of the project's documents referencing the package.
    Scattering(f64),
    /// Distinct packages reachable below the package.
    TransitiveCount(usize),
}

impl MetricResult {
    pub fn name(&self) -> MetricName {
        match self {
            MetricResult::Usage(_) => MetricName::Usage,
            MetricResult::Scattering(_) => MetricName::Scattering,
            MetricResult::TransitiveCount(_) => MetricName::TransitiveCount,
        }
    }
}

impl fmt::Display for MetricResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricResult::Usage(p) | MetricResult::Scattering(p) => write!(f, "{:.1}%", p),
            MetricResult::TransitiveCount(n) => write!(f, "{}", n),
        }
    }
}

/// Everything a metric may look at for one package.
pub struct MetricContext<'a> {
    pub project: &'a ProjectMetadata,
    pub package: &'a BoundPackage,
    pub registry: &'a UsageRegistry,
    pub graph: &'a PackageGraph,
}

/// A metric computed per bound package.
pub trait Metric: Send + Sync {
    fn name(&self) -> MetricName;

    fn compute(&self, ctx: &MetricContext<'_>) -> Option<MetricResult>;
}

/// Creates the metrics named in `names`, in order and without duplicates.
/// An empty list selects every metric.
pub fn create_metrics(names: &[MetricName]) -> Vec<Box<dyn Metric>> {
    let mut selected: Vec<MetricName> = Vec::new();
    for name in if names.is_empty() { &MetricName::ALL[..] } else { names } {
        if !selected.contains(name) {
            selected.push(*name);
        }
    }

    selected
        .into_iter()
        .map(|name| -> Box<dyn Metric> {
            match name {
                MetricName::Usage => Box::new(UsageMetric),
                MetricName::Scattering => Box::new(ScatteringMetric),
                MetricName::TransitiveCount => Box::new(TransitiveCountMetric),
            }
        })
        .collect()
}

/// Metric values of one package, keyed by metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSet {
    values: Vec<(MetricName, MetricResult)>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every metric against `ctx`, keeping the ones with a value.
    pub fn compute(metrics: &[Box<dyn Metric>], ctx: &MetricContext<'_>) -> Self {
        let mut set = Self::new();
        for metric in metrics {
            if let Some(result) = metric.compute(ctx) {
                set.insert(metric.name(), result);
            }
        }
        set
    }

    pub fn insert(&mut self, name: MetricName, result: MetricResult) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = result,
            None => self.values.push((name, result)),
        }
    }

    pub fn get(&self, name: MetricName) -> Option<&MetricResult> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(MetricName, MetricResult)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
