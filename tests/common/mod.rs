// In-process stand-in for the DICOM server's REST API, recording every
// request it sees.
//
// Upload bodies follow a tiny convention so tests can steer the answers:
// "DICM:<study>:<anything>" is accepted and filed under <study>, anything
// else is refused with 400.

#![allow(dead_code)]

use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use dicom_upload::RunConfig;
use tiny_http::{Header, Method, Response, Server, StatusCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Study ids returned by `GET /studies`.
    pub studies: Vec<String>,
    /// Answer `GET /studies` with a 500.
    pub fail_study_list: bool,
    /// Answer tag lookups with a 500.
    pub fail_tags: bool,
    /// Wrap upload receipts in an array, as the server does for buffers
    /// holding several instances.
    pub receipts_as_array: bool,
}

pub struct MockServer {
    pub base: String,
    log: Arc<Mutex<Vec<Recorded>>>,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    pub fn start(opts: MockOptions) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("http server"));
        let base = format!("http://{}", server.server_addr());
        let log = Arc::new(Mutex::new(Vec::new()));

        let srv = Arc::clone(&server);
        let log_clone = Arc::clone(&log);
        let handle = thread::spawn(move || {
            let counter = AtomicUsize::new(0);
            for mut req in srv.incoming_requests() {
                let method = req.method().clone();
                let url = req.url().to_string();
                log_clone.lock().expect("log lock").push(Recorded {
                    method: method.to_string(),
                    url: url.clone(),
                });

                let mut body = Vec::new();
                let _ = req.as_reader().read_to_end(&mut body);
                let (status, json) = answer(&opts, &counter, &method, &url, &body);
                let response = Response::from_string(json)
                    .with_status_code(StatusCode(status))
                    .with_header(
                        Header::from_bytes("Content-Type", "application/json")
                            .expect("content type"),
                    );
                let _ = req.respond(response);
            }
        });

        MockServer {
            base,
            log,
            server,
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().expect("log lock").clone()
    }

    pub fn count(&self, method: &str, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.url.starts_with(prefix))
            .count()
    }

    pub fn config(&self) -> RunConfig {
        config_for(&self.base)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn answer(
    opts: &MockOptions,
    counter: &AtomicUsize,
    method: &Method,
    url: &str,
    body: &[u8],
) -> (u16, String) {
    match (method, url) {
        (Method::Get, "/studies") if opts.fail_study_list => (500, r#"{"error":"boom"}"#.into()),
        (Method::Get, "/studies") => (
            200,
            serde_json::to_string(&opts.studies).expect("studies json"),
        ),
        (Method::Delete, u) if u.starts_with("/studies/") => (200, "{}".into()),
        (Method::Post, "/instances") => {
            let text = String::from_utf8_lossy(body);
            let mut parts = text.splitn(3, ':');
            match (parts.next(), parts.next()) {
                (Some("DICM"), Some(study)) => {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let receipt = serde_json::json!({
                        "ID": format!("inst-{}", n),
                        "ParentPatient": format!("patient-{}", study),
                        "ParentSeries": "series",
                        "ParentStudy": study,
                        "Path": format!("/instances/inst-{}", n),
                        "Status": "Success",
                    });
                    if opts.receipts_as_array {
                        (200, serde_json::json!([receipt]).to_string())
                    } else {
                        (200, receipt.to_string())
                    }
                }
                _ => (400, r#"{"Message":"Bad file format"}"#.into()),
            }
        }
        (Method::Get, u) if u.starts_with("/instances/") && opts.fail_tags => {
            (500, r#"{"error":"tags unavailable"}"#.into())
        }
        (Method::Get, u) if u.starts_with("/instances/") && u.ends_with("/tags?short") => (
            200,
            serde_json::json!({ "0010,0020": "PID-1", "0020,000d": "1.2.840.1" }).to_string(),
        ),
        _ => (404, "{}".into()),
    }
}

pub fn config_for(base: &str) -> RunConfig {
    RunConfig {
        url: base.to_string(),
        clear: false,
        force: true,
        verbose: false,
        ignore_errors: false,
        timeout: Some(std::time::Duration::from_secs(5)),
        paths: Vec::new(),
    }
}

pub fn write(dir: &Path, rel: &str, data: &[u8]) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(path, data).expect("write");
}

/// Base URL on which nothing listens.
pub fn dead_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}", addr)
}
