//! Transitive dependency count.

use super::{Metric, MetricContext, MetricName, MetricResult};

/// Number of distinct packages reachable below a package; absent when zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitiveCountMetric;

impl Metric for TransitiveCountMetric {
    fn name(&self) -> MetricName {
        MetricName::TransitiveCount
    }

    fn compute(&self, ctx: &MetricContext<'_>) -> Option<MetricResult> {
        match ctx.graph.descendant_count(ctx.package.key()) {
            0 => None,
            n => Some(MetricResult::TransitiveCount(n)),
        }
    }
}
