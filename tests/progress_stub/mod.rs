//! In-process stub of the backend progress API, for exercising the HTTP
//! store without a live server.

use std::io::Read as _;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

#[derive(Default)]
struct StubState {
    records: Vec<Value>,
    saved_bodies: Vec<Value>,
    fail_saves: bool,
}

pub struct ProgressStub {
    pub base_url: String,
    state: Arc<Mutex<StubState>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start progress stub");
        let base_url = format!("http://{}", server.server_addr());
        let state = Arc::new(Mutex::new(StubState::default()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_state = Arc::clone(&state);
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }
                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(request)) => request,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let method = request.method().clone();
                let url = request.url().to_string();
                let segments: Vec<&str> = url.trim_matches('/').split('/').collect();

                match (&method, segments.as_slice()) {
                    (tiny_http::Method::Get, ["users", _, "progress"]) => {
                        let body = {
                            let state = thread_state.lock().unwrap();
                            Value::Array(state.records.clone()).to_string()
                        };
                        respond_json(request, 200, body);
                    }
                    (tiny_http::Method::Get, ["users", _, "progress", grimoire_id]) => {
                        let found = {
                            let state = thread_state.lock().unwrap();
                            state
                                .records
                                .iter()
                                .find(|record| record["grimoireId"] == *grimoire_id)
                                .cloned()
                        };
                        match found {
                            Some(record) => respond_json(request, 200, record.to_string()),
                            None => respond(request, 404, "not found"),
                        }
                    }
                    (tiny_http::Method::Post, ["users", _, "progress"]) => {
                        let mut body = String::new();
                        if request.as_reader().read_to_string(&mut body).is_err() {
                            respond(request, 400, "unreadable body");
                            continue;
                        }
                        let parsed: Value = match serde_json::from_str(&body) {
                            Ok(value) => value,
                            Err(_) => {
                                respond(request, 400, "invalid json");
                                continue;
                            }
                        };
                        let fail = {
                            let mut state = thread_state.lock().unwrap();
                            state.saved_bodies.push(parsed);
                            state.fail_saves
                        };
                        if fail {
                            respond(request, 500, "store unavailable");
                        } else {
                            respond(request, 204, "");
                        }
                    }
                    _ => respond(request, 404, "not found"),
                }
            }
        });

        Self {
            base_url,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn push_record(&self, record: Value) {
        self.state.lock().unwrap().records.push(record);
    }

    pub fn saved_bodies(&self) -> Vec<Value> {
        self.state.lock().unwrap().saved_bodies.clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.state.lock().unwrap().fail_saves = fail;
    }
}

impl Drop for ProgressStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn respond(request: tiny_http::Request, status: u16, body: &str) {
    let _ = request.respond(tiny_http::Response::from_string(body).with_status_code(status));
}

fn respond_json(request: tiny_http::Request, status: u16, body: String) {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("content type header");
    let _ = request.respond(
        tiny_http::Response::from_string(body)
            .with_status_code(status)
            .with_header(header),
    );
}
