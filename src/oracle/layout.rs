//! Package cache path layout conventions.
//!
//! Module artifacts restored from a package cache live at
//! `<cache>/<package>/<version>/lib/<platform>/<module>.<ext>`. The version
//! of the package a module belongs to is therefore the fourth path segment
//! from the end. Paths that do not follow the convention are reported as
//! [`LayoutError`]s so callers can skip the module.

use std::path::Path;

use crate::parser::types::Version;

/// Number of trailing segments from the version directory to the file.
const VERSION_SEGMENT_FROM_END: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Module path does not follow the package cache layout: {0}")]
    TooShallow(String),

    #[error("Module path {path} has no valid version segment (found '{segment}')")]
    InvalidVersion { path: String, segment: String },

    #[error("Module path has no file name: {0}")]
    MissingFileName(String),
}

fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extracts the package version from a module path.
///
/// # Example
///
/// ```
/// use usagescope::oracle::layout::version_from_path;
///
/// let v = version_from_path("/home/u/.nuget/packages/serilog/3.1.1/lib/net8.0/Serilog.dll").unwrap();
/// assert_eq!(v.to_string(), "3.1.1");
/// ```
pub fn version_from_path(path: &str) -> Result<Version, LayoutError> {
    let segments = segments(path);
    if segments.len() < VERSION_SEGMENT_FROM_END {
        return Err(LayoutError::TooShallow(path.to_string()));
    }

    let segment = segments[segments.len() - VERSION_SEGMENT_FROM_END];
    segment
        .parse()
        .map_err(|_| LayoutError::InvalidVersion {
            path: path.to_string(),
            segment: segment.to_string(),
        })
}

/// Extracts the module name (file name without extension) from a path.
pub fn name_from_path(path: &str) -> Result<String, LayoutError> {
    let file = segments(path)
        .last()
        .copied()
        .ok_or_else(|| LayoutError::MissingFileName(path.to_string()))?;

    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| LayoutError::MissingFileName(path.to_string()))
}
