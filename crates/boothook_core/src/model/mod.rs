//! Contribution data model.
//!
//! # Responsibility
//! - Define the validated shape of one package's declared contributions.
//! - Turn raw, untyped package declarations into that shape or fail loudly.
//!
//! # Invariants
//! - A parsed manifest is never mutated after construction.
//! - Registry keys always use the resolved package name.

pub mod manifest;
