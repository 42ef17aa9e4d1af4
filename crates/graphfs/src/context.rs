//! Shared collaborators handed to every component.

use crate::config::Config;
use crate::event::{Event, EventSink, NullSink};
use crate::graph::QueryBackend;
use log::warn;
use std::sync::Arc;

/// The configuration, backend and event sink one engine instance works with.
///
/// Built once at startup and cloned cheaply into each component.
#[derive(Clone)]
pub struct FsContext {
    /// Immutable configuration
    pub config: Arc<Config>,
    /// Graph backend
    pub backend: Arc<dyn QueryBackend>,
    /// Change notification sink
    pub events: Arc<dyn EventSink>,
}

impl FsContext {
    /// A context that discards events.
    pub fn new(config: Config, backend: Arc<dyn QueryBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            events: Arc::new(NullSink),
        }
    }

    /// Builder: publish events to `sink`.
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Publish an event. Failures are logged and dropped.
    pub fn emit(&self, event: Event) {
        if let Err(e) = self.events.publish(&event) {
            warn!("Failed to publish {} event: {e}", event.event);
        }
    }
}

impl std::fmt::Debug for FsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsContext").field("config", &self.config).finish_non_exhaustive()
    }
}
