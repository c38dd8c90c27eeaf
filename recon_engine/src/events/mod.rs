//! Alarm delivery for the reconciliation engine.
//!
//! Alarms are fire-and-forget: the engine publishes an [`AlarmEvent`] for every rejection, exception
//! record and sweep summary, and registered handlers deliver them wherever they need to go (a log, a
//! chat webhook, a pager). A failed or missing handler never affects the reconciliation outcome.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::AlarmEvent;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
