//! Failure bus.
//!
//! Every terminal failure of a run is published once on a [`FailureBus`].
//! Subscribers (logging, status persistence, notification, cleanup) react to
//! it without the runner knowing they exist. Subscribers run one after the
//! other in registration order and cannot fail: each one handles its own
//! errors.

mod event;
mod notifier;
mod subscribers;

pub use event::{FailureEvent, FailureKind};
pub use notifier::{FailureNotice, LogNotifier, Notifier};
pub use subscribers::{
    ArtifactCleanupSubscriber, FailureResponder, LoggingSubscriber, NotifierSubscriber,
};

use crate::core::RetentionPolicy;
use crate::status::RunStatusStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

/// Reacts to terminal failures.
#[async_trait]
pub trait FailureSubscriber: Send + Sync {
    /// Handles a failure. May set `event.response`.
    async fn on_failure(&self, event: &mut FailureEvent<'_>);
}

struct FnSubscriber<F>(F);

#[async_trait]
impl<F> FailureSubscriber for FnSubscriber<F>
where
    F: Fn(&mut FailureEvent<'_>) + Send + Sync,
{
    async fn on_failure(&self, event: &mut FailureEvent<'_>) {
        (self.0)(event);
    }
}

/// In-process publish/subscribe channel for terminal failures.
#[derive(Default)]
pub struct FailureBus {
    subscribers: RwLock<Vec<Arc<dyn FailureSubscriber>>>,
}

impl FailureBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the standard bus: logging, response and status, notification, cleanup.
    #[must_use]
    pub fn standard(
        status_store: Option<Arc<dyn RunStatusStore>>,
        notifier: Option<Arc<dyn Notifier>>,
        retention: Arc<dyn RetentionPolicy>,
    ) -> Self {
        let bus = Self::new();
        bus.subscribe(Arc::new(LoggingSubscriber));

        let mut responder = FailureResponder::new();
        if let Some(store) = status_store {
            responder = responder.with_status_store(store);
        }
        bus.subscribe(Arc::new(responder));

        if let Some(notifier) = notifier {
            bus.subscribe(Arc::new(NotifierSubscriber::new(notifier)));
        }
        bus.subscribe(Arc::new(ArtifactCleanupSubscriber::new(retention)));
        bus
    }

    /// Registers a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn FailureSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Registers a synchronous closure as a subscriber.
    pub fn subscribe_fn<F>(&self, func: F)
    where
        F: Fn(&mut FailureEvent<'_>) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnSubscriber(func)));
    }

    /// Returns the number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns true if nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Runs every subscriber over `event`, in order, and returns it.
    pub async fn notify<'a>(&self, mut event: FailureEvent<'a>) -> FailureEvent<'a> {
        let subscribers: Vec<_> = self.subscribers.read().clone();
        for subscriber in subscribers {
            subscriber.on_failure(&mut event).await;
        }
        event
    }
}

impl std::fmt::Debug for FailureBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureBus")
            .field("subscribers", &self.len())
            .finish()
    }
}
