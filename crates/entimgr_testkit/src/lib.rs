//! # Entimgr Testkit
//!
//! Test utilities for entimgr.
//!
//! This crate provides:
//! - A sample entity and managers bound to every in-tree backend
//! - Property-based test generators using proptest
//! - A reference model and cross-backend parity assertions
//!
//! ## Usage
//!
//! ```rust
//! use entimgr_testkit::prelude::*;
//! use entimgr_core::QueryOptions;
//!
//! let reference = manager_for(Backend::Reference, sample_entities(12));
//! for backend in Backend::EXACT_PAGING {
//!     let other = manager_for(backend, sample_entities(12));
//!     let options = QueryOptions::new().with_page(3).with_page_size(5);
//!     block_on(assert_page_parity(&reference, &other, &options));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod parity;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::parity::*;
}

pub use fixtures::*;
pub use generators::*;
pub use parity::*;
