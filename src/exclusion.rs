//! Namespace exclusion policy.
//!
//! Decides whether a namespace or package name is out of scope for
//! analysis: the platform's own runtime namespaces, user-supplied prefixes,
//! and the project's own code (its root namespace and those of the
//! same-solution projects it references).

use crate::oracle::ProjectMetadata;

/// Runtime namespaces that are never analyzed.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "System.",
    "mscorlib",
    "netstandard",
    "Microsoft.CSharp",
    "Microsoft.VisualBasic",
    "Microsoft.Win32",
];

/// The platform's root namespace, excluded on exact match only.
const PLATFORM_ROOT_NAMESPACE: &str = "System";

/// Case-insensitive prefix exclusion list.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    prefixes: Vec<String>,
}

impl ExclusionPolicy {
    /// Creates a policy from the default list plus `extra` prefixes.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::default();
        for prefix in DEFAULT_EXCLUSIONS {
            policy.push(prefix);
        }
        for prefix in extra {
            policy.push(prefix.as_ref());
        }
        policy
    }

    /// Creates the policy for analyzing `project`.
    ///
    /// Adds the project's default namespace, its first dot-segment, and the
    /// namespaces of referenced sibling projects to the defaults and `extra`.
    pub fn for_project<I, S>(extra: I, project: &ProjectMetadata) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::new(extra);

        if let Some(ns) = project.default_namespace.as_deref() {
            policy.push(ns);
            if let Some((stem, _)) = ns.split_once('.') {
                policy.push(stem);
            }
        }
        for ns in &project.referenced_namespaces {
            policy.push(ns);
        }

        policy
    }

    fn push(&mut self, prefix: &str) {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return;
        }
        let lowered = prefix.to_lowercase();
        if !self.prefixes.contains(&lowered) {
            self.prefixes.push(lowered);
        }
    }

    /// Returns true if `name` is out of scope.
    pub fn is_excluded(&self, name: &str) -> bool {
        if name.eq_ignore_ascii_case(PLATFORM_ROOT_NAMESPACE) {
            return true;
        }
        let lowered = name.to_lowercase();
        self.prefixes.iter().any(|p| lowered.starts_with(p.as_str()))
    }

    /// The normalized (lowercase) prefixes.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}
