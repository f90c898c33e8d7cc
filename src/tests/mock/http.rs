//! A mock HTTP server driven by a list of expectations.

use {
    std::{
        fmt::{self, Debug, Formatter},
        net::SocketAddr,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
            Mutex,
        },
    },
    tokio::task::JoinHandle,
};

#[derive(Clone, Debug)]
pub enum Expectation {
    Get {
        path: String,
        res: serde_json::Value,
    },
    Post {
        path: String,
        req: RequestBody,
        res: serde_json::Value,
    },
}

#[derive(Clone)]
pub enum RequestBody {
    /// The received body has to match the provided value exactly.
    Exact(serde_json::Value),
    /// Any body will be accepted.
    Any,
}

impl Debug for RequestBody {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Exact(value) => f.debug_tuple("Exact").field(value).finish(),
            Self::Any => f.debug_tuple("Any").finish(),
        }
    }
}

/// Drop handle that verifies the server task didn't panic throughout the
/// test and that all the expectations have been met.
pub struct ServerHandle {
    /// The address that handles requests to this server.
    pub address: SocketAddr,
    handle: JoinHandle<()>,
    expectations: Arc<Mutex<Vec<Expectation>>>,
    assert_failed: Arc<AtomicBool>,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        // Don't cause mass hysteria!
        if std::thread::panicking() {
            return;
        }

        assert!(
            !self.assert_failed.load(Ordering::SeqCst),
            "mock http server assertion failed"
        );
        assert!(
            !self.handle.is_finished(),
            "mock http server terminated before test ended"
        );
        assert_eq!(
            self.expectations.lock().unwrap().len(),
            0,
            "mock server did not receive enough requests"
        );
        self.handle.abort();
    }
}

/// Set up a mock external HTTP API.
pub async fn setup(mut expectations: Vec<Expectation>) -> ServerHandle {
    // Reverse expectations so tests can specify them in natural order while
    // allowing us to simply `.pop()` the last element.
    expectations.reverse();

    let expectations = Arc::new(Mutex::new(expectations));
    let assert_failed = Arc::new(AtomicBool::new(false));
    let state = State {
        expectations: expectations.clone(),
        assert_failed: assert_failed.clone(),
    };

    let app = axum::Router::new()
        .route(
            "/*path",
            axum::routing::get(
                |axum::extract::State(state),
                 axum::extract::Path(path),
                 axum::extract::RawQuery(query)| async move {
                    axum::response::Json(get(state, path, query))
                },
            )
            .post(
                |axum::extract::State(state),
                 axum::extract::Path(path),
                 axum::extract::RawQuery(query),
                 axum::extract::Json(req)| async move {
                    axum::response::Json(post(state, path, query, req))
                },
            ),
        )
        .with_state(state);

    let server = axum::Server::bind(&"0.0.0.0:0".parse().unwrap()).serve(app.into_make_service());
    let address = server.local_addr();
    let handle = tokio::spawn(async move { server.await.unwrap() });

    ServerHandle {
        handle,
        expectations,
        address,
        assert_failed,
    }
}

#[derive(Clone)]
struct State {
    expectations: Arc<Mutex<Vec<Expectation>>>,
    assert_failed: Arc<AtomicBool>,
}

/// Runs the given closure and records a failed assert if it panics, so the
/// failure surfaces in the main test task.
fn assert_and_propagate_panics<F, R>(assertions: F, flag: &AtomicBool) -> R
where
    F: FnOnce() -> R + std::panic::UnwindSafe + 'static,
{
    std::panic::catch_unwind(assertions)
        .map_err(|_| flag.store(true, Ordering::SeqCst))
        .expect("ignore this panic; it was caused by the previous panic")
}

fn get(state: State, path: String, query: Option<String>) -> serde_json::Value {
    let expectation = state.expectations.lock().unwrap().pop();
    let assertions = move || {
        let (expected_path, res) = match expectation {
            Some(Expectation::Get { path, res }) => (path, res),
            Some(other) => panic!("expected GET request but got {other:?}"),
            None => panic!("got another GET request, but didn't expect any more"),
        };
        assert_eq!(
            full_path(path, query),
            expected_path,
            "GET request has unexpected path"
        );
        res
    };
    assert_and_propagate_panics(assertions, &state.assert_failed)
}

fn post(
    state: State,
    path: String,
    query: Option<String>,
    req: serde_json::Value,
) -> serde_json::Value {
    let expectation = state.expectations.lock().unwrap().pop();
    let assertions = move || {
        let (expected_path, expected_req, res) = match expectation {
            Some(Expectation::Post { path, req, res }) => (path, req, res),
            Some(other) => panic!("expected POST request but got {other:?}"),
            None => panic!("got another POST request, but didn't expect any more"),
        };
        assert_eq!(
            full_path(path, query),
            expected_path,
            "POST request has unexpected path"
        );
        match expected_req {
            RequestBody::Exact(value) => {
                assert_eq!(req, value, "POST request has unexpected body")
            }
            RequestBody::Any => (),
        }
        res
    };
    assert_and_propagate_panics(assertions, &state.assert_failed)
}

fn full_path(path: String, query: Option<String>) -> String {
    match query {
        Some(query) => format!("{path}?{query}"),
        None => path,
    }
}
