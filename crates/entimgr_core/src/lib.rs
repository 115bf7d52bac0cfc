//! # Entimgr Core
//!
//! Storage-agnostic entity management.
//!
//! This crate provides:
//! - [`Strategy`] - the contract every persistence backend implements, with
//!   optional native capabilities for filtered find, paginated find and clear
//! - [`InMemoryStrategy`] - the reference backend
//! - [`EntityManager`] - the façade callers use; it delegates to the bound
//!   strategy and emulates missing capabilities in-process
//! - [`EqualityPolicy`] - how remove and update find their target
//!
//! ## Design Principles
//!
//! - Call sites never depend on which backend is bound
//! - Native and fallback paths return identical items and page totals
//! - Not-found is a value (`false`, `None`, empty), never an error
//! - Backend faults reach the caller untranslated
//!
//! ## Example
//!
//! ```rust
//! use entimgr_core::{EntityManager, InMemoryStrategy, Masked, QueryOptions};
//!
//! # let runtime = tokio::runtime::Runtime::new().unwrap();
//! # runtime.block_on(async {
//! let native = EntityManager::new(InMemoryStrategy::with_entities((1..=12).collect()));
//! let emulated = EntityManager::new(Masked::mandatory_only(
//!     InMemoryStrategy::with_entities((1..=12).collect()),
//! ));
//!
//! let options = QueryOptions::new().with_page(3).with_page_size(5);
//! let a = native.find_page(&options).await.unwrap();
//! let b = emulated.find_page(&options).await.unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.items, vec![11u32, 12]);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod equality;
mod error;
mod manager;
mod memory;
mod strategy;

pub use config::Config;
pub use equality::{by_key, position_of, EqualityPolicy, KeyEquality, ValueEquality};
pub use error::{StrategyError, StrategyResult};
pub use manager::EntityManager;
pub use memory::InMemoryStrategy;
pub use strategy::{
    Capabilities, ClearCapability, Masked, PagedQueryCapability, QueryCapability, Strategy,
};

pub use entimgr_query::{PageInfo, PageResult, Predicate, QueryOptions};
