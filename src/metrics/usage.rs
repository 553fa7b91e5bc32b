//! Usage percentage: share of a package's exported symbols the project uses.

use super::{Metric, MetricContext, MetricName, MetricResult};

/// Computes `100 * used / exported`, clamped to 100.
///
/// Returns `None` when nothing is used or nothing is exported.
///
/// # Example
///
/// ```rust
/// use usagescope::metrics::usage_percentage;
///
/// assert_eq!(usage_percentage(3, 10), Some(30.0));
/// assert_eq!(usage_percentage(0, 20), None);
/// ```
pub fn usage_percentage(used: usize, exported: usize) -> Option<f64> {
    if used == 0 || exported == 0 {
        return None;
    }
    Some((100.0 * used as f64 / exported as f64).min(100.0))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UsageMetric;

impl Metric for UsageMetric {
    fn name(&self) -> MetricName {
        MetricName::Usage
    }

    fn compute(&self, ctx: &MetricContext<'_>) -> Option<MetricResult> {
        let used = ctx.registry.used_symbol_count(ctx.package.key());
        let exported = ctx.package.module.exported_symbol_count();
        usage_percentage(used, exported).map(MetricResult::Usage)
    }
}
