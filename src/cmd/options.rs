//! Immutable option set for one invocation.
//!
//! Built once from the parsed CLI in `main` and handed by reference to the
//! selection / dispatch code.

/// Whether object listings include coordinates.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DisplayMode {
    pub coordinates: bool,
}

impl Default for DisplayMode {
    fn default() -> Self {
        Self { coordinates: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub id: Option<String>,
    pub key: Option<String>,
    pub radius: Option<String>,

    // operation selectors
    pub scan: bool,
    pub search: bool,
    pub stats: bool,
    pub delete: bool,
    pub nearby: Option<String>,
    pub setpoint: Option<String>,

    pub mode: DisplayMode,
    /// Print the raw JSON payload instead of the human rendering.
    pub json: bool,
}

/// `Some(trimmed)` unless absent or blank.
pub(crate) fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
