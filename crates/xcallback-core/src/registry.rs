use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dispatch::Responder;
use crate::types::Parameters;

/// Handles an action invoked by another application.
///
/// The handler receives the request parameters (protocol keys removed) and a
/// [`Responder`]. Answering consumes the responder, so a handler can reply at
/// most once; a handler that drops it without answering leaves the requester
/// waiting.
pub trait ActionHandler: Send + Sync {
    fn handle(&self, params: Parameters, responder: Responder);
}

impl<F> ActionHandler for F
where
    F: Fn(Parameters, Responder) + Send + Sync,
{
    fn handle(&self, params: Parameters, responder: Responder) {
        self(params, responder)
    }
}

/// Action name → handler. Last registration for an action wins.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: Mutex<HashMap<String, Arc<dyn ActionHandler>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn ActionHandler>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `handler` for `action`, returning the handler it replaced.
    pub fn register<H>(&self, action: impl Into<String>, handler: H) -> Option<Arc<dyn ActionHandler>>
    where
        H: ActionHandler + 'static,
    {
        self.register_arc(action, Arc::new(handler))
    }

    pub fn register_arc(
        &self,
        action: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Option<Arc<dyn ActionHandler>> {
        let action = action.into();
        tracing::debug!(action = %action, "registering action handler");
        self.handlers().insert(action, handler)
    }

    /// Remove the handler for `action`. Returns whether one was registered.
    pub fn unregister(&self, action: &str) -> bool {
        self.handlers().remove(action).is_some()
    }

    /// The handler is cloned out so it can run without the lock held.
    pub fn lookup(&self, action: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers().get(action).cloned()
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers().contains_key(action)
    }

    /// Registered action names, sorted.
    pub fn actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers().is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions())
            .finish()
    }
}
