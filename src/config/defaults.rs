//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> PathBuf {
        ".".into()
    }

    pub fn output() -> PathBuf {
        "public".into()
    }

    pub fn templates() -> PathBuf {
        ".templates".into()
    }

    pub fn page_extension() -> String {
        "html".into()
    }

    pub fn data_suffix() -> String {
        "_meta.json".into()
    }
}

// ============================================================================
// [build.feed] Section Defaults
// ============================================================================

pub mod feed {
    use std::path::PathBuf;

    pub fn path() -> PathBuf {
        "feed.xml".into()
    }

    pub fn content_dir() -> String {
        ".data".into()
    }
}

// ============================================================================
// [watch] Section Defaults
// ============================================================================

pub mod watch {
    pub fn poll_interval_ms() -> u64 {
        200
    }

    pub fn debounce_ms() -> u64 {
        100
    }
}
