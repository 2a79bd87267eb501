use chrono::Utc;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::config::Config;
use crate::dispatch::{self, Dispatch};
use crate::error::{Result, XCallbackError};
use crate::launcher::{scheme_of, LaunchError, Launcher};
use crate::pending::{Callbacks, Completion, Outcome, PendingRequest, PendingTable};
use crate::registry::{ActionHandler, ActionRegistry};
use crate::request::{validate_action, validate_scheme, RequestSpec, RequestUrl};
use crate::types::Parameters;

struct Inner {
    config: Config,
    registry: ActionRegistry,
    pending: PendingTable,
    launcher: Arc<dyn Launcher>,
}

/// Composition root: owns the action registry, the pending request table and
/// the launcher.
///
/// Cloning is cheap and every clone shares the same state, so a `Manager` can
/// be handed to whichever thread the host delivers opened URLs on.
///
/// ```rust,ignore
/// let manager = Manager::new(Config::new().with_callback_scheme("me"), SystemLauncher);
///
/// manager.register_action("ping", |_params, responder: Responder| responder.succeed(None));
///
/// manager.perform_action(
///     "auth",
///     "target",
///     Parameters::new(),
///     Callbacks::new().on_success(|params| println!("authorized: {params:?}")),
/// )?;
///
/// // Later, when the host reports that this process was opened with a URL:
/// manager.handle_open_url(&url);
/// ```
#[derive(Clone)]
pub struct Manager {
    inner: Arc<Inner>,
}

impl Manager {
    pub fn new<L>(config: Config, launcher: L) -> Self
    where
        L: Launcher + 'static,
    {
        Self::with_launcher(config, Arc::new(launcher))
    }

    pub fn with_launcher(config: Config, launcher: Arc<dyn Launcher>) -> Self {
        let pending = PendingTable::with_ttl(config.request_ttl());
        Self {
            inner: Arc::new(Inner {
                config,
                registry: ActionRegistry::new(),
                pending,
                launcher,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Scheme other applications use to call back into this process.
    pub fn callback_scheme(&self) -> Option<&str> {
        self.inner.config.callback_scheme.as_deref()
    }

    /// Sent as `x-source` with every request.
    pub fn app_name(&self) -> Option<&str> {
        self.inner.config.app_name.as_deref()
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.inner.registry
    }

    pub fn pending(&self) -> &PendingTable {
        &self.inner.pending
    }

    pub fn launcher(&self) -> &Arc<dyn Launcher> {
        &self.inner.launcher
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    pub fn register_action<H>(&self, action: impl Into<String>, handler: H)
    where
        H: ActionHandler + 'static,
    {
        self.inner.registry.register(action, handler);
    }

    pub fn unregister_action(&self, action: &str) -> bool {
        self.inner.registry.unregister(action)
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Ask the application behind `scheme` to perform `action`.
    ///
    /// With no callbacks the request is fire-and-forget and leaves nothing in
    /// the pending table. With callbacks, exactly one entry exists for the
    /// returned [`RequestUrl::request_id`] until a response arrives.
    pub fn perform_action(
        &self,
        action: &str,
        scheme: &str,
        params: Parameters,
        callbacks: Callbacks,
    ) -> Result<RequestUrl> {
        let completion = if callbacks.is_empty() {
            None
        } else {
            Some(Completion::Callbacks(callbacks))
        };
        self.issue(action, scheme, &params, completion)
    }

    /// Like [`Manager::perform_action`] with all three outcomes requested,
    /// delivered through the returned future instead of callbacks.
    pub fn request(&self, action: &str, scheme: &str, params: Parameters) -> Result<PendingResponse> {
        let (tx, rx) = oneshot::channel();
        let url = self.issue(action, scheme, &params, Some(Completion::Channel(tx)))?;
        Ok(PendingResponse {
            request_id: url.request_id().to_string(),
            url,
            rx,
        })
    }

    fn issue(
        &self,
        action: &str,
        scheme: &str,
        params: &Parameters,
        completion: Option<Completion>,
    ) -> Result<RequestUrl> {
        validate_action(action)?;
        validate_scheme(scheme)?;
        self.purge_expired();

        if completion.is_some() && self.callback_scheme().is_none() {
            return Err(XCallbackError::CallbackSchemeNotDefined);
        }
        if !self.is_loopback(scheme) && !self.inner.launcher.can_open(scheme) {
            return Err(XCallbackError::TargetNotInstalled {
                scheme: scheme.to_string(),
            });
        }

        let request_id = self.fresh_request_id();
        let response_types = completion
            .as_ref()
            .map(Completion::response_types)
            .unwrap_or_default();
        let url = RequestSpec {
            action,
            target_scheme: scheme,
            params,
            request_id: &request_id,
            response_types: &response_types,
            callback_scheme: self.callback_scheme(),
            source: self.app_name(),
        }
        .build()?;

        // Registered before launch so a fast response always finds its entry.
        if let Some(completion) = completion {
            self.inner.pending.insert(PendingRequest::new(
                request_id.clone(),
                action.to_string(),
                completion,
            ));
        }

        tracing::info!(request_id = %request_id, action = %action, scheme = %scheme, "performing action");
        if let Err(e) = self.open_url(url.as_str()) {
            self.inner.pending.take(&request_id);
            tracing::warn!(request_id = %request_id, error = %e, "request not delivered");
            return Err(e.into());
        }
        Ok(url)
    }

    fn fresh_request_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.inner.pending.contains(&id) {
                return id;
            }
        }
    }

    fn is_loopback(&self, scheme: &str) -> bool {
        self.inner.config.loopback
            && self
                .callback_scheme()
                .is_some_and(|own| own.eq_ignore_ascii_case(scheme))
    }

    /// Open `url`, routing it straight to [`Manager::handle_open_url`] when it
    /// targets this process and loopback is enabled.
    pub fn open_url(&self, url: &str) -> std::result::Result<(), LaunchError> {
        if self.is_loopback(&scheme_of(url)) {
            tracing::debug!(url = %url, "loopback delivery");
            self.handle_open_url(url);
            return Ok(());
        }
        self.inner.launcher.open(url)
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Entry point for "this process was opened with `url`".
    pub fn handle_open_url(&self, url: &str) -> Dispatch {
        dispatch::dispatch(self, url)
    }

    /// Drop requests older than the configured TTL. Returns their ids.
    pub fn purge_expired(&self) -> Vec<String> {
        let purged = self.inner.pending.purge_expired(Utc::now());
        for id in &purged {
            tracing::info!(request_id = %id, "pending request expired");
        }
        purged
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .field("pending", &self.inner.pending.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PendingResponse
// ---------------------------------------------------------------------------

/// Future resolving to the [`Outcome`] of a request issued with
/// [`Manager::request`].
///
/// Resolves to [`XCallbackError::ResponseDropped`] if the pending entry is
/// purged before a response arrives.
#[derive(Debug)]
pub struct PendingResponse {
    request_id: String,
    url: RequestUrl,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingResponse {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn url(&self) -> &RequestUrl {
        &self.url
    }
}

impl Future for PendingResponse {
    type Output = Result<Outcome>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx).poll(cx).map(|res| {
            res.map_err(|_| XCallbackError::ResponseDropped {
                request_id: this.request_id.clone(),
            })
        })
    }
}
