//! One-shot loopback listener that captures the authorization redirect.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    axum::{
        Router,
        extract::{Query, State},
        http::StatusCode,
        routing::get,
    },
    subtle::ConstantTimeEq,
    tokio::{net::TcpListener, sync::oneshot, task::JoinHandle},
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

pub const CALLBACK_PATH: &str = "/callback";

const SUCCESS_BODY: &str = "gchatctl login complete. You can close this tab.";
/// How long in-flight responses get to finish before the server is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type Delivery = oneshot::Sender<Result<String>>;

#[derive(Debug, Default)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    /// Pick the first value of each known key; repeats and unknown keys are ignored.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    delivery: Arc<Mutex<Option<Delivery>>>,
}

impl CallbackState {
    /// Hand the result to the waiting flow. Only the first callback is delivered.
    fn deliver(&self, outcome: Result<String>) {
        let sender = match self.delivery.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                let _ = tx.send(outcome);
            },
            None => debug!("ignoring repeated oauth callback"),
        }
    }
}

fn states_match(received: &str, expected: &str) -> bool {
    received.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Validate one redirect: state first, then the presence of a code.
fn validate(params: CallbackParams, expected_state: &str) -> Result<String> {
    let state = params.state.unwrap_or_default();
    if !states_match(&state, expected_state) {
        return Err(Error::StateMismatch);
    }
    match params.code.filter(|c| !c.is_empty()) {
        Some(code) => Ok(code),
        None => Err(Error::MissingCode {
            provider_error: params.error.filter(|e| !e.is_empty()),
        }),
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> (StatusCode, &'static str) {
    let outcome = validate(CallbackParams::from_pairs(pairs), &state.expected_state);
    let response = match &outcome {
        Ok(_) => (StatusCode::OK, SUCCESS_BODY),
        Err(Error::StateMismatch) => (StatusCode::BAD_REQUEST, "state mismatch"),
        Err(_) => (StatusCode::BAD_REQUEST, "missing code"),
    };
    if let Err(e) = &outcome {
        warn!(error = %e, "rejected oauth callback");
    }
    state.deliver(outcome);
    response
}

/// A loopback HTTP server bound to an OS-assigned port on 127.0.0.1.
///
/// The server is stopped by [`CallbackServer::shutdown`]; dropping it without
/// calling `shutdown` aborts the serving task instead.
pub struct CallbackServer {
    addr: SocketAddr,
    result: Option<oneshot::Receiver<Result<String>>>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind the listener and start serving `/callback` for `expected_state`.
    pub async fn bind(expected_state: &str) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(Error::Bind)?;
        let addr = listener.local_addr().map_err(Error::Bind)?;

        let (result_tx, result_rx) = oneshot::channel();
        let state = CallbackState {
            expected_state: Arc::from(expected_state),
            delivery: Arc::new(Mutex::new(Some(result_tx))),
        };
        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .with_state(state);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            });
            if let Err(e) = serve.await {
                warn!(error = %e, "oauth callback server failed");
            }
        });
        debug!(%addr, "oauth callback server listening");

        Ok(Self {
            addr,
            result: Some(result_rx),
            stop: Some(stop_tx),
            task: Some(task),
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}{CALLBACK_PATH}", self.addr)
    }

    /// Wait for the authorization code, a rejected callback, or `timeout`.
    pub async fn wait(&mut self, timeout: Duration) -> Result<String> {
        let result = self.result.take().ok_or(Error::CallbackAborted)?;
        match tokio::time::timeout(timeout, result).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::CallbackAborted),
            Err(_) => Err(Error::CallbackTimeout(timeout)),
        }
    }

    /// Stop accepting connections and release the port.
    ///
    /// Responses already being written get a short grace period; anything
    /// still running after that is aborted.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                task.abort();
                let _ = task.await;
            }
        }
        debug!(addr = %self.addr, "oauth callback server stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
