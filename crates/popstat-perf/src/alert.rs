use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, warn};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[display("warning")]
    Warning,
    #[display("error")]
    Error,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    #[display("lowFps")]
    LowFps,
    #[display("highMemory")]
    HighMemory,
    #[display("slowLoad")]
    SlowLoad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp: i64,
    pub severity: Severity,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
}

type Callback = Box<dyn Fn(&AlertEvent)>;

/// Per-aggregator subscriber list.
///
/// Delivery never fails the caller: closed channels are dropped from the
/// list and an event without subscribers goes nowhere.
#[derive(Default)]
pub struct AlertDispatcher {
    callbacks: Vec<Callback>,
    channels: Vec<mpsc::UnboundedSender<AlertEvent>>,
    emitted: u64,
}

impl fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("callbacks", &self.callbacks.len())
            .field("channels", &self.channels.len())
            .field("emitted", &self.emitted)
            .finish()
    }
}

impl AlertDispatcher {
    /// Registers a callback. It runs synchronously while a sample is recorded
    /// and must not call back into the aggregator.
    pub fn on_alert<F>(&mut self, callback: F)
    where
        F: Fn(&AlertEvent) + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<AlertEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.push(tx);
        rx
    }

    pub fn emit(&mut self, event: &AlertEvent) {
        match event.severity {
            Severity::Warning => warn!(kind = %event.kind, "{}", event.message),
            Severity::Error => error!(kind = %event.kind, "{}", event.message),
        }
        self.emitted += 1;
        for callback in &self.callbacks {
            callback(event);
        }
        self.channels.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    fn event() -> AlertEvent {
        AlertEvent {
            timestamp: 7,
            severity: Severity::Warning,
            message: "Low FPS detected: 20.0".to_owned(),
            kind: AlertKind::LowFps,
        }
    }

    #[test]
    fn test_callbacks_and_channels_receive_events() {
        let mut dispatcher = AlertDispatcher::default();
        let seen = Rc::new(RefCell::new(vec![]));
        let sink = Rc::clone(&seen);
        dispatcher.on_alert(move |e| sink.borrow_mut().push(e.timestamp));
        let mut rx = dispatcher.subscribe();

        dispatcher.emit(&event());
        dispatcher.emit(&event());

        assert_eq!(*seen.borrow(), [7, 7]);
        assert_eq!(rx.try_recv().unwrap(), event());
        assert_eq!(rx.try_recv().unwrap(), event());
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.emitted(), 2);
    }

    #[test]
    fn test_closed_channels_are_pruned() {
        let mut dispatcher = AlertDispatcher::default();
        drop(dispatcher.subscribe());
        let mut open = dispatcher.subscribe();

        dispatcher.emit(&event());
        assert_eq!(dispatcher.channels.len(), 1);
        assert!(open.try_recv().is_ok());
    }

    #[test]
    fn test_emit_without_subscribers_is_fine() {
        let mut dispatcher = AlertDispatcher::default();
        dispatcher.emit(&event());
        assert_eq!(dispatcher.emitted(), 1);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["type"], "lowFps");
        assert_eq!(json["timestamp"], 7);
    }
}
