//! Analysis parameters.
//!
//! [`AnalysisParameters`] gathers the user's choices (excluded projects and
//! namespaces, metrics, concurrency bound, report completeness) and
//! validates them before any project is opened.

use std::num::NonZeroUsize;

use crate::metrics::{MetricName, UnknownMetric};

/// Errors in user-supplied analysis parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Maximum concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    #[error(transparent)]
    UnknownMetric(#[from] UnknownMetric),
}

/// Splits a comma separated list, dropping blank entries.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Number of logical CPUs, or 1 when unknown.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Returns true if a debugger or tracer is attached to this process.
#[cfg(target_os = "linux")]
pub fn is_debugger_attached() -> bool {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status
                .lines()
                .find_map(|line| line.strip_prefix("TracerPid:"))
                .map(|pid| pid.trim() != "0")
        })
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
pub fn is_debugger_attached() -> bool {
    false
}

/// Validated parameters of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisParameters {
    excluded_projects: Vec<String>,
    excluded_namespaces: Vec<String>,
    metrics: Vec<MetricName>,
    max_concurrency: usize,
    show_all: bool,
}

impl Default for AnalysisParameters {
    fn default() -> Self {
        Self {
            excluded_projects: Vec::new(),
            excluded_namespaces: Vec::new(),
            metrics: MetricName::ALL.to_vec(),
            max_concurrency: default_concurrency(),
            show_all: false,
        }
    }
}

impl AnalysisParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from raw comma separated command line values.
    ///
    /// # Errors
    ///
    /// Fails on an unknown metric name (the error lists the valid ones) or a
    /// concurrency bound below 1.
    ///
    /// # Example
    ///
    /// ```rust
    /// use usagescope::config::AnalysisParameters;
    ///
    /// let params = AnalysisParameters::from_lists(
    ///     Some("Tests, Benchmarks"),
    ///     None,
    ///     Some("usage,Scattering"),
    ///     Some(4),
    ///     false,
    /// )
    /// .unwrap();
    /// assert!(params.is_project_excluded("tests"));
    /// assert_eq!(params.metrics().len(), 2);
    /// ```
    pub fn from_lists(
        excluded_projects: Option<&str>,
        excluded_namespaces: Option<&str>,
        metrics: Option<&str>,
        max_concurrency: Option<usize>,
        show_all: bool,
    ) -> Result<Self, ConfigError> {
        let metric_names = match metrics {
            Some(list) => split_list(list)
                .iter()
                .map(|name| name.parse::<MetricName>())
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Self::new()
            .with_excluded_projects(excluded_projects.map(split_list).unwrap_or_default())
            .with_excluded_namespaces(excluded_namespaces.map(split_list).unwrap_or_default())
            .with_metrics(metric_names)
            .with_show_all(show_all)
            .with_max_concurrency(max_concurrency.unwrap_or_else(default_concurrency))
    }

    pub fn with_excluded_projects(mut self, projects: Vec<String>) -> Self {
        self.excluded_projects = projects;
        self
    }

    pub fn with_excluded_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.excluded_namespaces = namespaces;
        self
    }

    /// Selects metrics; an empty list selects every metric.
    pub fn with_metrics(mut self, metrics: Vec<MetricName>) -> Self {
        self.metrics = if metrics.is_empty() {
            MetricName::ALL.to_vec()
        } else {
            metrics
        };
        self
    }

    pub fn with_show_all(mut self, show_all: bool) -> Self {
        self.show_all = show_all;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Result<Self, ConfigError> {
        if max_concurrency < 1 {
            return Err(ConfigError::InvalidConcurrency(max_concurrency));
        }
        self.max_concurrency = max_concurrency;
        Ok(self)
    }

    pub fn excluded_namespaces(&self) -> &[String] {
        &self.excluded_namespaces
    }

    pub fn excluded_projects(&self) -> &[String] {
        &self.excluded_projects
    }

    pub fn metrics(&self) -> &[MetricName] {
        &self.metrics
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    /// The configured concurrency bound.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// The bound actually used: 1 while a debugger is attached.
    pub fn effective_concurrency(&self) -> usize {
        if is_debugger_attached() {
            1
        } else {
            self.max_concurrency
        }
    }

    /// Case-insensitive match against the excluded project names.
    pub fn is_project_excluded(&self, name: &str) -> bool {
        self.excluded_projects
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }
}
