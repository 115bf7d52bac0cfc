//! # Entimgr Query
//!
//! Backend-independent query primitives for entimgr.
//!
//! This crate provides the two pure building blocks every storage strategy
//! and the entity manager share:
//!
//! - [`select`] / [`select_owned`] - the filter engine: primary predicate,
//!   conjunctive auxiliary filters and an optional stable sort
//! - [`paginate`] / [`PageInfo::compute`] - the paginator: 1-based pages,
//!   clamped out-of-range requests and page metadata
//!
//! Nothing here knows about storage. A strategy that answers a query natively
//! must produce exactly what these functions produce over the same data.
//!
//! ## Example
//!
//! ```rust
//! use entimgr_query::{paginate, select_owned, QueryOptions};
//!
//! let numbers: Vec<u32> = (1..=12).collect();
//! let options = QueryOptions::new()
//!     .with_predicate(|n: &u32| n % 2 == 0)
//!     .with_sort_by(|a: &u32, b: &u32| b.cmp(a));
//!
//! let evens = select_owned(numbers, &options);
//! assert_eq!(evens, vec![12, 10, 8, 6, 4, 2]);
//!
//! let page = paginate(evens, 2, 4);
//! assert_eq!(page.items, vec![4, 2]);
//! assert_eq!(page.total_pages, 2);
//! assert!(page.has_prev);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod filter;
mod options;
mod page;

pub use filter::{select, select_owned};
pub use options::{Comparator, Predicate, QueryOptions};
pub use page::{paginate, paginate_slice, PageInfo, PageResult, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
