pub(crate) const DEFAULT_BOT_NAME: &str = "ci-robot";
pub(crate) const DEFAULT_PATCH_URL: &str = "https://patch-diff.githubusercontent.com";
pub(crate) const DEFAULT_GIT_URL: &str = "https://github.com";
pub(crate) const REPORT_MARKER: &str = "<!-- DO NOT REMOVE: cherrypicker report marker -->";

/// Pushes are retried once before the workflow gives up.
pub(crate) const PUSH_ATTEMPTS: usize = 2;
