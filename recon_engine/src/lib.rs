//! Order Reconciliation Engine
//!
//! This library reconciles the three legs of a split-payment transaction — payment, merchant split
//! and downstream notification — into a single per-order verdict, and reconciles refunds against the
//! original order. It is storage- and transport-agnostic: everything the engine needs from the
//! outside world goes through the narrow ports in [`mod@traits`].
//!
//! The library is divided into three main sections:
//! 1. The reconciliation flow API ([`ReconFlowApi`]). This is the public entry point: order
//!    ingestion, the notification-tracking family, the refund family, verdict re-evaluation and the
//!    batch sweep, plus a read-only query surface.
//! 2. The ports ([`mod@traits`]) and the bundled SQLite implementation ([`SqliteBackend`], behind the
//!    `sqlite` feature). Any backend that honours the port's guarded-transition and atomicity
//!    contract can stand in.
//! 3. The alarm channel ([`mod@events`]). Every rejection and every sweep summary is published as an
//!    [`events::AlarmEvent`]; register a hook to deliver them wherever they need to go.
//!
//! ## Example
//!
//! ```no_run
//! use recon_common::Money;
//! use recon_engine::{
//!     config::ReconConfig,
//!     db_types::{BusinessStatus, NewOrder, SplitDetail},
//!     events::{EventHandlers, EventHooks},
//!     ReconFlowApi,
//!     SqliteBackend,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReconConfig::from_env_or_default();
//! let db = SqliteBackend::new_with_url(&config.database_url, 5).await?;
//! db.run_migrations().await?;
//!
//! let mut hooks = EventHooks::default();
//! hooks.on_alarm(|alarm| Box::pin(async move { eprintln!("{alarm}") }));
//! let handlers = EventHandlers::new(16, hooks);
//! let api = ReconFlowApi::new(db, handlers.producers())
//!     .with_tolerance(config.amount_tolerance)
//!     .with_batch_size(config.batch_size);
//! handlers.start_handlers().await;
//!
//! let order = NewOrder::new("ORDER_001".into(), Money::from_major(300)).with_statuses(
//!     BusinessStatus::Success,
//!     BusinessStatus::Success,
//!     BusinessStatus::Success,
//! );
//! let splits = vec![
//!     SplitDetail::new("ORDER_001-S1", "MERCHANT_A", Money::from_major(200)),
//!     SplitDetail::new("ORDER_001-S2", "MERCHANT_B", Money::from_major(100)),
//! ];
//! let result = api.recon_order(order, splits).await;
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
mod recon_api;
pub mod test_utils;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
pub use recon_api::{flow_api::ReconFlowApi, objects::ReconResult};
pub use traits::{ReconBackend, ReconBackendError};
