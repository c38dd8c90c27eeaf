//! The ports consumed by the reconciliation engine.
//!
//! The engine talks to the outside world exclusively through the [`ReconBackend`] trait. Concrete
//! backends are selected explicitly by the caller (e.g. the bundled SQLite implementation behind the
//! `sqlite` feature, or the in-memory backend in [`crate::test_utils`]); the engine never inspects a
//! collaborator's runtime type.
mod recon_backend;

pub use recon_backend::{ReconBackend, ReconBackendError};
