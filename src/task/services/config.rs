//! Tunable limits for task services.

use serde::Deserialize;

/// Read-side limits applied by [`super::TaskQueryService`].
///
/// # Examples
///
/// ```
/// use tasklane::task::services::LifecycleConfig;
///
/// let config = LifecycleConfig::default();
/// assert_eq!(config.page_size(None), 20);
/// assert_eq!(config.page_size(Some(500)), 50);
/// assert_eq!(config.audit_feed_size(None), 50);
/// assert_eq!(config.audit_feed_size(Some(500)), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Number of most recent events returned with a task.
    pub timeline_limit: usize,
    /// Page size used when a list request does not ask for one.
    pub default_page_size: usize,
    /// Upper bound on any list page.
    pub max_page_size: usize,
    /// Audit feed length used when a request does not ask for one.
    pub default_audit_feed_size: usize,
    /// Upper bound on the cross-task audit feed.
    pub max_audit_feed_size: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            timeline_limit: 20,
            default_page_size: 20,
            max_page_size: 50,
            default_audit_feed_size: 50,
            max_audit_feed_size: 100,
        }
    }
}

impl LifecycleConfig {
    /// Sets the timeline length.
    #[must_use]
    pub const fn with_timeline_limit(mut self, limit: usize) -> Self {
        self.timeline_limit = limit;
        self
    }

    /// Sets the maximum list page size.
    #[must_use]
    pub const fn with_max_page_size(mut self, limit: usize) -> Self {
        self.max_page_size = limit;
        self
    }

    /// Sets the maximum audit feed length.
    #[must_use]
    pub const fn with_max_audit_feed_size(mut self, limit: usize) -> Self {
        self.max_audit_feed_size = limit;
        self
    }

    /// Resolves the effective page size: `min(requested, max)`, at least 1.
    #[must_use]
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
            .max(1)
    }

    /// Resolves the effective audit feed length.
    #[must_use]
    pub fn audit_feed_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_audit_feed_size)
            .min(self.max_audit_feed_size)
            .max(1)
    }
}
