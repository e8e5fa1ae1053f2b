//! Shared helpers for unit tests.

use std::sync::Mutex;

use {axum::Router, tokio::sync::mpsc};

use crate::{
    device_flow::DeviceCode,
    ui::{LoginUi, LoginWarning},
};

/// Start a mock HTTP server and return its base URL.
pub(crate) async fn start_mock(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Captures everything a flow reports and forwards the authorization URL so a
/// test can drive the callback.
pub(crate) struct RecordingUi {
    urls: mpsc::UnboundedSender<String>,
    pub(crate) device_codes: Mutex<Vec<DeviceCode>>,
    pub(crate) warnings: Mutex<Vec<LoginWarning>>,
}

impl RecordingUi {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                urls: tx,
                device_codes: Mutex::new(Vec::new()),
                warnings: Mutex::new(Vec::new()),
            },
            rx,
        )
    }

    pub(crate) fn warnings(&self) -> Vec<LoginWarning> {
        self.warnings.lock().unwrap().clone()
    }
}

impl LoginUi for RecordingUi {
    fn authorization_url(&self, url: &str) {
        let _ = self.urls.send(url.to_string());
    }

    fn device_code(&self, code: &DeviceCode) {
        self.device_codes.lock().unwrap().push(code.clone());
    }

    fn warn(&self, warning: &LoginWarning) {
        self.warnings.lock().unwrap().push(warning.clone());
    }
}
