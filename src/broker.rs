use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, PoisonError, RwLock},
};

use crate::event::Event;

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("event type must not be empty")]
    EmptyEventType,
}

/// In-memory publish/subscribe registry.
///
/// Listeners are invoked on their own Tokio task per publish, so `publish`
/// must be called from within a runtime. A listener that panics is logged
/// and otherwise ignored.
#[derive(Default)]
pub struct Broker {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, event_type: &str, listener: F) -> Result<(), BrokerError>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        if event_type.is_empty() {
            return Err(BrokerError::EmptyEventType);
        }
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type.to_string())
            .or_default()
            .push(Arc::new(listener));
        tracing::debug!(event_type, "listener subscribed");
        Ok(())
    }

    /// Dispatches `event` to every listener registered for its type and
    /// returns without waiting for any of them.
    pub fn publish(&self, event: Event) {
        let listeners = match self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type)
        {
            Some(listeners) => listeners.clone(),
            None => return,
        };

        let event = Arc::new(event);
        for listener in listeners {
            let event = event.clone();
            tokio::spawn(async move {
                if catch_unwind(AssertUnwindSafe(|| listener(event.as_ref()))).is_err() {
                    tracing::error!(event_type = %event.event_type, "event listener panicked");
                }
            });
        }
    }

    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(event_type, l)| (event_type.as_str(), l.len()))
            .collect();
        f.debug_struct("Broker").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use tokio::sync::mpsc;

    use super::{Broker, BrokerError};
    use crate::event::{Event, OTP_EXPIRED, OTP_REQUESTED, OTP_VERIFIED};

    async fn recv(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed")
    }

    #[test]
    fn empty_event_type_rejected() {
        let broker = Broker::new();
        assert_eq!(
            broker.subscribe("", |_| {}),
            Err(BrokerError::EmptyEventType)
        );
        assert_eq!(broker.subscriber_count(""), 0);
    }

    #[tokio::test]
    async fn publish_without_listeners_is_noop() {
        let broker = Broker::new();
        broker.publish(Event::otp_expired("nobody"));
    }

    #[tokio::test]
    async fn every_listener_receives_matching_events() {
        let broker = Broker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        for _ in 0..3 {
            let tx = tx.clone();
            broker
                .subscribe(OTP_VERIFIED, move |e| {
                    let _ = tx.send(e.clone());
                })
                .unwrap();
        }
        let other = Arc::new(AtomicUsize::new(0));
        let counter = other.clone();
        broker
            .subscribe(OTP_REQUESTED, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        broker.publish(Event::otp_verified("alice"));
        for _ in 0..3 {
            let event = recv(&mut rx).await;
            assert_eq!(event, Event::otp_verified("alice"));
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(other.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn publish_does_not_wait_for_listeners() {
        // Current-thread runtime: spawned listeners cannot run until we yield.
        let broker = Broker::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        broker
            .subscribe(OTP_EXPIRED, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        broker.publish(Event::otp_expired("carol"));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::timeout(Duration::from_secs(1), async {
            while count.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_listener_is_isolated() {
        let broker = Broker::new();
        broker
            .subscribe(OTP_EXPIRED, |_| panic!("listener failure"))
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broker
            .subscribe(OTP_EXPIRED, move |e| {
                let _ = tx.send(e.clone());
            })
            .unwrap();

        broker.publish(Event::otp_expired("dave"));
        broker.publish(Event::otp_expired("erin"));

        let mut users = vec![
            recv(&mut rx).await.user().unwrap().to_string(),
            recv(&mut rx).await.user().unwrap().to_string(),
        ];
        users.sort();
        assert_eq!(users, ["dave", "erin"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn subscribe_while_publishing() {
        let broker = Arc::new(Broker::new());
        let publisher = {
            let broker = broker.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    broker.publish(Event::otp_requested("frank", "000000"));
                    tokio::task::yield_now().await;
                }
            })
        };
        for _ in 0..50 {
            broker.subscribe(OTP_REQUESTED, |_| {}).unwrap();
            tokio::task::yield_now().await;
        }
        publisher.await.unwrap();
        assert_eq!(broker.subscriber_count(OTP_REQUESTED), 50);
    }
}
