//! # Entimgr Adapters
//!
//! Contracts for plugging concrete persistence integrations into the
//! entity manager.
//!
//! - [`RelationalAdapter`] / [`RelationalStrategy`] - table-style backends
//!   with equality-driven update and delete
//! - [`RepositoryAdapter`] / [`RepositoryStrategy`] - key-addressed
//!   repositories with their own query type
//! - [`MemoryTable`] / [`MemoryRepository`] - in-memory adapters with fault
//!   injection
//!
//! Adapter faults surface as [`entimgr_core::StrategyError::Adapter`] with
//! the [`AdapterError`] as source.
//!
//! ## Example
//!
//! ```rust
//! use entimgr_adapters::{MemoryRepository, RepositoryStrategy};
//! use entimgr_core::{by_key, EntityManager};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Account { id: Option<u64>, email: String }
//!
//! # let runtime = tokio::runtime::Runtime::new().unwrap();
//! # runtime.block_on(async {
//! let repository = MemoryRepository::new(|a: &Account| a.id);
//! let accounts = EntityManager::with_equality(
//!     RepositoryStrategy::new(repository),
//!     by_key(|a: &Account| a.email.clone()),
//! );
//!
//! accounts.add(Account { id: Some(7), email: "a@example.com".into() }).await.unwrap();
//!
//! // No key given: the stored row is found by email instead
//! let unsaved = Account { id: None, email: "a@example.com".into() };
//! assert!(accounts.remove(&unsaved).await.unwrap());
//! assert_eq!(accounts.count().await.unwrap(), 0);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod mock;
mod relational;
mod repository;

pub use error::{AdapterError, AdapterResult};
pub use mock::{MemoryQuery, MemoryRepository, MemoryTable};
pub use relational::{FilteredSelect, PagedSelect, RelationalAdapter, RelationalStrategy};
pub use repository::{
    KeyedOutcome, NativeQuery, RepositoryAdapter, RepositoryClear, RepositoryStrategy,
};
