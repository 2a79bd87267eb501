//! End-to-end exchanges between two managers, with the host's URL delivery
//! played by draining each side's `RecordingLauncher` into the other.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use xcallback_core::{
    query, Callbacks, Config, Dispatch, Failure, FailureKind, Manager, Outcome, Parameters,
    RecordingLauncher, Responder, XCallbackError,
};

struct App {
    manager: Manager,
    launcher: Arc<RecordingLauncher>,
}

impl App {
    fn new(scheme: &str, name: &str) -> Self {
        let launcher = Arc::new(RecordingLauncher::new());
        let config = Config::new()
            .with_callback_scheme(scheme)
            .with_app_name(name);
        let manager = Manager::with_launcher(config, launcher.clone());
        Self { manager, launcher }
    }

    /// Deliver everything this app opened to `other`.
    fn deliver_to(&self, other: &App) -> Vec<Dispatch> {
        self.launcher
            .take()
            .iter()
            .map(|url| other.manager.handle_open_url(url))
            .collect()
    }
}

fn params(pairs: &[(&str, &str)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn request_and_success_round_trip() {
    let client = App::new("client", "Client");
    let server = App::new("server", "Server");

    server
        .manager
        .register_action("auth", |p: Parameters, r: Responder| {
            let user = p.get("user").cloned().unwrap_or_default();
            r.succeed(Some(params(&[("token", format!("tok-{user}").as_str())])));
        });

    let got = Arc::new(Mutex::new(None));
    let g = got.clone();
    client
        .manager
        .perform_action(
            "auth",
            "server",
            params(&[("user", "a b")]),
            Callbacks::new().on_success(move |p| *g.lock().unwrap() = p),
        )
        .unwrap();
    assert_eq!(client.manager.pending().len(), 1);

    assert_eq!(client.deliver_to(&server), vec![Dispatch::Handled]);
    assert_eq!(server.deliver_to(&client), vec![Dispatch::Handled]);

    assert_eq!(
        got.lock().unwrap().clone(),
        Some(params(&[("token", "tok-a b")]))
    );
    assert!(client.manager.pending().is_empty());
}

#[test]
fn handler_failure_reaches_requester() {
    let client = App::new("client", "Client");
    let server = App::new("server", "Server");

    server
        .manager
        .register_action("auth", |p: Parameters, r: Responder| {
            if !p.contains_key("user") {
                r.fail(&Failure::with_kind(
                    FailureKind::MissingParameter,
                    "missing 'user'",
                ));
            }
        });

    let got = Arc::new(Mutex::new(None));
    let g = got.clone();
    client
        .manager
        .perform_action(
            "auth",
            "server",
            Parameters::new(),
            Callbacks::new()
                .on_success(|_| panic!("unexpected success"))
                .on_failure(move |f| *g.lock().unwrap() = Some(f)),
        )
        .unwrap();

    client.deliver_to(&server);
    server.deliver_to(&client);

    assert_eq!(
        got.lock().unwrap().clone(),
        Some(Failure::with_kind(FailureKind::MissingParameter, "missing 'user'"))
    );
}

#[test]
fn unsupported_action_reports_code_one() {
    let client = App::new("client", "Client");
    let server = App::new("server", "Server");

    let got = Arc::new(Mutex::new(None));
    let g = got.clone();
    client
        .manager
        .perform_action(
            "teleport",
            "server",
            Parameters::new(),
            Callbacks::new().on_failure(move |f| *g.lock().unwrap() = Some(f)),
        )
        .unwrap();

    client.deliver_to(&server);
    let opened = server.launcher.opened();
    assert_eq!(opened.len(), 1);
    assert!(opened[0].contains("error-Code=1"));

    server.deliver_to(&client);
    let failure = got.lock().unwrap().clone().unwrap();
    assert_eq!(failure.kind(), Some(FailureKind::NotSupportedAction));
    assert_eq!(failure.message, "teleport not supported by Server");
}

#[test]
fn ping_handler_sees_empty_params() {
    let client = App::new("client", "Client");
    let server = App::new("server", "Server");

    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    server
        .manager
        .register_action("ping", move |p: Parameters, r: Responder| {
            *s.lock().unwrap() = Some(p);
            r.succeed(None);
        });

    client
        .manager
        .perform_action(
            "ping",
            "server",
            Parameters::new(),
            Callbacks::new().on_success(|_| {}).on_cancel(|| {}),
        )
        .unwrap();
    client.deliver_to(&server);

    assert_eq!(seen.lock().unwrap().clone(), Some(Parameters::new()));
}

#[test]
fn duplicate_response_is_delivered_once() {
    let client = App::new("client", "Client");
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let url = client
        .manager
        .perform_action(
            "auth",
            "server",
            Parameters::new(),
            Callbacks::new().on_cancel(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
    let cancel_url = url.params()["x-cancel"].clone();

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let manager = client.manager.clone();
            let url = cancel_url.clone();
            std::thread::spawn(move || manager.handle_open_url(&url))
        })
        .collect();
    let handled = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(Dispatch::is_handled)
        .count();

    assert_eq!(handled, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(client.manager.pending().is_empty());
}

#[test]
fn wire_format_matches_documented_example() {
    let client = App::new("me", "Me");
    let url = client
        .manager
        .perform_action(
            "auth",
            "target",
            params(&[("user", "a b")]),
            Callbacks::new().on_success(|_| {}),
        )
        .unwrap();
    let id = url.request_id();

    assert!(url.as_str().starts_with(&format!(
        "target://auth?user=a%20b&x-success=me%3A%2F%2Fx-callback-url%2Fauth%2Fsuccess%3Fx-requestID%3D{id}"
    )));
    assert!(url.as_str().ends_with("&x-source=Me"));
    assert!(client.manager.pending().contains(id));

    let embedded = query::decode(url.url().query().unwrap());
    assert!(embedded["x-success"].ends_with(&format!("x-requestID={id}")));
}

#[test]
fn no_callbacks_no_scheme_still_sends() {
    let launcher = Arc::new(RecordingLauncher::new());
    let manager = Manager::with_launcher(Config::new(), launcher.clone());
    manager
        .perform_action("open", "notes", params(&[("id", "7")]), Callbacks::new())
        .unwrap();
    assert!(manager.pending().is_empty());
    assert_eq!(launcher.opened(), vec!["notes://open?id=7"]);

    let err = manager
        .perform_action("open", "notes", Parameters::new(), Callbacks::new().on_success(|_| {}))
        .unwrap_err();
    assert!(matches!(err, XCallbackError::CallbackSchemeNotDefined));
    assert!(manager.pending().is_empty());
}

#[tokio::test]
async fn request_future_across_apps() {
    let client = App::new("client", "Client");
    let server = App::new("server", "Server");
    server
        .manager
        .register_action("sum", |p: Parameters, r: Responder| {
            let total: i64 = p.values().filter_map(|v| v.parse::<i64>().ok()).sum();
            r.succeed(Some(params(&[("total", total.to_string().as_str())])));
        });

    let pending = client
        .manager
        .request("sum", "server", params(&[("a", "2"), ("b", "3")]))
        .unwrap();
    client.deliver_to(&server);
    server.deliver_to(&client);

    assert_eq!(
        pending.await.unwrap(),
        Outcome::Success(Some(params(&[("total", "5")])))
    );
}

#[test]
fn reply_cannot_redirect_requester_callback() {
    let client = App::new("client", "Client");
    let server = App::new("server", "Server");
    server
        .manager
        .register_action("echo", |_: Parameters, r: Responder| {
            r.succeed(Some(params(&[("responseType", "cancel"), ("text", "hi")])));
        });

    let ran = Arc::new(Mutex::new(Vec::new()));
    let (s, c) = (ran.clone(), ran.clone());
    client
        .manager
        .perform_action(
            "echo",
            "server",
            Parameters::new(),
            Callbacks::new()
                .on_success(move |p| s.lock().unwrap().push(format!("success {p:?}")))
                .on_cancel(move || c.lock().unwrap().push("cancel".to_string())),
        )
        .unwrap();

    client.deliver_to(&server);
    assert_eq!(server.deliver_to(&client), vec![Dispatch::Handled]);

    let expected = format!("success {:?}", Some(params(&[("text", "hi")])));
    assert_eq!(*ran.lock().unwrap(), vec![expected]);
}
