//! Scattering percentage: share of the project's documents that reference
//! a package.

use std::collections::HashSet;

use super::{Metric, MetricContext, MetricName, MetricResult};
use crate::oracle::FileId;

/// Computes `100 * |referencing ∩ documents| / |documents|`.
///
/// Returns `None` when the intersection is empty.
pub fn scattering_percentage(referencing: &HashSet<&FileId>, documents: &[FileId]) -> Option<f64> {
    let project_files: HashSet<&FileId> = documents.iter().collect();
    if project_files.is_empty() {
        return None;
    }

    let shared = referencing.intersection(&project_files).count();
    if shared == 0 {
        return None;
    }
    Some(100.0 * shared as f64 / project_files.len() as f64)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScatteringMetric;

impl Metric for ScatteringMetric {
    fn name(&self) -> MetricName {
        MetricName::Scattering
    }

    fn compute(&self, ctx: &MetricContext<'_>) -> Option<MetricResult> {
        let referencing = ctx.registry.distinct_referencing_files(ctx.package.key());
        scattering_percentage(&referencing, &ctx.project.documents).map(MetricResult::Scattering)
    }
}
