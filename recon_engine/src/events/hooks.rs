use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{AlarmEvent, EventHandler, EventProducer, Handler};

/// The set of producers handed to the flow API. Every alarm the engine raises is published to each
/// producer in turn.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub alarm_producer: Vec<EventProducer<AlarmEvent>>,
}

pub struct EventHandlers {
    pub on_alarm: Option<EventHandler<AlarmEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_alarm = hooks.on_alarm.map(|f| EventHandler::new(buffer_size, f));
        Self { on_alarm }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_alarm {
            result.alarm_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_alarm {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_alarm: Option<Handler<AlarmEvent>>,
}

impl EventHooks {
    pub fn on_alarm<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(AlarmEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_alarm = Some(Arc::new(f));
        self
    }
}
