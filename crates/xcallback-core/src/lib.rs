//! `xcallback-core`: the x-callback-url protocol layer.
//!
//! One application asks another to perform an action by opening
//! `<scheme>://<action>?<params>` and may embed `x-success`, `x-error` and
//! `x-cancel` URLs through which the answer comes back. This crate builds
//! those URLs, keeps track of requests awaiting an answer, and routes URLs the
//! process is opened with either to a registered action handler or to the
//! callbacks of the request they answer.
//!
//! # Architecture
//!
//! ```text
//! Manager::perform_action
//!     │  RequestSpec::build   ← fresh request id, callback URLs, x-source
//!     │  PendingTable::insert ← only when callbacks were supplied
//!     ▼
//! Launcher::open          ← host platform (or loopback)
//!     ┆
//! Manager::handle_open_url
//!     │  dispatch::classify   ← response (host x-callback-url) or request
//!     ├─▶ PendingTable::take → Callbacks / PendingResponse (at most once)
//!     └─▶ ActionRegistry::lookup → ActionHandler(params, Responder)
//! ```
//!
//! Launching URLs and learning that the process was opened with one are the
//! host's business; the core only sees the [`Launcher`] trait and calls to
//! [`Manager::handle_open_url`].

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod failure;
pub mod io;
pub mod launcher;
pub mod manager;
pub mod pending;
pub mod query;
pub mod registry;
pub mod request;
pub mod types;

pub use client::Client;
pub use config::Config;
pub use dispatch::{Dispatch, IgnoreReason, Inbound, Responder};
pub use error::{Result, XCallbackError};
pub use failure::{Failure, FailureInfo, FailureKind};
pub use launcher::{LaunchError, Launcher, RecordingLauncher, SystemLauncher};
pub use manager::{Manager, PendingResponse};
pub use pending::{Callbacks, Outcome};
pub use registry::{ActionHandler, ActionRegistry};
pub use request::RequestUrl;
pub use types::{Parameters, ResponseType};
