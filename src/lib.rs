//! Terminology - layered vocabulary resolution for multi-tenant products
//!
//! This crate resolves the effective product vocabulary (a flat dot-path
//! key/value map) for an entity by walking its inheritance chain
//! (system -> partner -> organization -> company -> team -> user) and folding
//! each level's stored overrides according to a per-entry override behavior.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use terminology::resolver::{ResolveOptions, TerminologyResolver};
//! use terminology::store::memory::{InMemoryAffiliations, InMemoryTerminologyStore};
//! use terminology::types::EntityLevel;
//!
//! # async fn demo() {
//! let store = Arc::new(InMemoryTerminologyStore::new());
//! let affiliations = Arc::new(InMemoryAffiliations::new());
//! let resolver = TerminologyResolver::new(store, affiliations);
//!
//! let resolved = resolver
//!     .resolve_terminology(EntityLevel::Company, "acme", &ResolveOptions::default())
//!     .await;
//! println!("{} keys resolved", resolved.values.len());
//! # }
//! ```

// Core error handling
pub mod error;

// Terminology value model, entity levels, override behaviors
pub mod types;

// Pure helpers: nested <-> flat conversion and override-aware merging
pub mod flatten;
pub mod merge;

// Inheritance chain computation over affiliation lookups
pub mod chain;

// Storage backends (in-memory always; Postgres behind the `database` feature)
pub mod store;

// Process-local resolution cache
pub mod cache;

// Built-in predefined terminology templates
pub mod templates;

// The resolution engine itself
pub mod resolver;

// Re-export the primary surface for convenience
pub use error::{Result, TerminologyError};
pub use resolver::{ResolveOptions, TerminologyResolver};
pub use types::{
    EntityLevel, OverrideBehavior, ResolvedTerminology, TerminologyEntry, TerminologySettings,
    TerminologyValue,
};
