//! Helpers shared by the integration test binaries.
#![allow(dead_code)]

pub mod prepare_env;

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

use recon_common::Money;
use recon_engine::{
    db_types::{BusinessStatus, NewOrder, SplitDetail},
    events::{AlarmEvent, EventHandler, EventProducers, Handler},
    test_utils::MemoryBackend,
    ReconFlowApi,
};
use tokio::task::JoinHandle;

pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// A flow API over a fresh in-memory backend, with no alarm subscribers.
pub fn memory_api() -> ReconFlowApi<MemoryBackend> {
    init_logging();
    ReconFlowApi::new(MemoryBackend::new(), EventProducers::default())
}

/// Wires an alarm subscriber that collects every event into the returned store. The handler task
/// completes once the api (and with it, the producer) is dropped; await the join handle before
/// asserting on the store.
pub fn alarm_capture() -> (EventProducers, JoinHandle<()>, Arc<Mutex<Vec<AlarmEvent>>>) {
    let store = Arc::new(Mutex::new(Vec::new()));
    let sink = store.clone();
    let handler: Handler<AlarmEvent> = Arc::new(move |event| {
        let sink = sink.clone();
        Box::pin(async move {
            sink.lock().unwrap().push(event);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let event_handler = EventHandler::new(16, handler);
    let mut producers = EventProducers::default();
    producers.alarm_producer.push(event_handler.subscribe());
    let join_handle = tokio::spawn(event_handler.start_handler());
    (producers, join_handle, store)
}

/// An order whose three legs all report success.
pub fn settled_order(order_no: &str, pay_amount: Money) -> NewOrder {
    NewOrder::new(order_no.into(), pay_amount).with_statuses(
        BusinessStatus::Success,
        BusinessStatus::Success,
        BusinessStatus::Success,
    )
}

pub fn split(sub_order_no: &str, merchant_id: &str, amount: Money) -> SplitDetail {
    SplitDetail::new(sub_order_no, merchant_id, amount)
}
