/// Convenience result type used across Mocksmith.
pub type MocksmithResult<T> = Result<T, MocksmithError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Propagation policy:
/// - `Config` errors are fatal to load; nothing proceeds on a bad document.
/// - `Asset` and `Geometry` errors fail a single composition; batch callers
///   decide whether to continue.
/// - `Retention` errors are recorded and retried on the next cleanup pass.
/// - `CacheOverflow` is surfaced as an alert, never silently ignored.
#[derive(thiserror::Error, Debug)]
pub enum MocksmithError {
    /// Malformed or missing template/policy configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Unreadable, corrupt, or missing design/template image.
    #[error("asset error: {0}")]
    Asset(String),

    /// Degenerate placement geometry (collinear or self-intersecting quad).
    #[error("geometry error: {0}")]
    Geometry(String),

    /// File-system operation failed during a cleanup pass.
    #[error("retention error: {0}")]
    Retention(String),

    /// Cache exceeds its hard cap and forced cleanup cannot reduce usage.
    #[error("cache overflow: {0}")]
    CacheOverflow(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MocksmithError {
    /// Build a [`MocksmithError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`MocksmithError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`MocksmithError::Geometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Build a [`MocksmithError::Retention`] value.
    pub fn retention(msg: impl Into<String>) -> Self {
        Self::Retention(msg.into())
    }

    /// Build a [`MocksmithError::CacheOverflow`] value.
    pub fn cache_overflow(msg: impl Into<String>) -> Self {
        Self::CacheOverflow(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
