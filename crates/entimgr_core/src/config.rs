//! Entity manager configuration.

use entimgr_query::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};

/// Configuration for an [`crate::EntityManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page used when a paged query does not name one.
    pub default_page: usize,

    /// Page size used when a paged query does not name one.
    pub default_page_size: usize,

    /// Whether to emit a trace event each time an optional operation is
    /// emulated in-process.
    pub trace_fallbacks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_page: DEFAULT_PAGE,
            default_page_size: DEFAULT_PAGE_SIZE,
            trace_fallbacks: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default page.
    #[must_use]
    pub const fn default_page(mut self, page: usize) -> Self {
        self.default_page = page;
        self
    }

    /// Sets the default page size.
    #[must_use]
    pub const fn default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Sets whether fallbacks are traced.
    #[must_use]
    pub const fn trace_fallbacks(mut self, value: bool) -> Self {
        self.trace_fallbacks = value;
        self
    }
}
