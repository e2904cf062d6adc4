#![forbid(unsafe_code)]

//! Background fetch executor.
//!
//! Fetches run on worker threads; responses come back over a channel so all
//! controller state stays on the thread that owns the form. A typical loop:
//!
//! ```ignore
//! let mut exec = FetchExecutor::new(fetcher);
//! for request in form.open("group") { exec.spawn(request); }
//! loop {
//!     for response in exec.drain() {
//!         form.complete_fetch(response)?;
//!     }
//!     // handle input, render...
//! }
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use rozklad_select::{FetchError, FetchRequest, FetchResponse, OptionFetcher};

/// Runs [`FetchRequest`]s on worker threads.
pub struct FetchExecutor {
    fetcher: Arc<dyn OptionFetcher>,
    sender: Sender<FetchResponse>,
    receiver: Receiver<FetchResponse>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for FetchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchExecutor")
            .field("running", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl FetchExecutor {
    /// Create an executor around a blocking fetch implementation.
    pub fn new(fetcher: impl OptionFetcher + 'static) -> Self {
        Self::with_shared(Arc::new(fetcher))
    }

    /// Create an executor around a shared fetcher.
    #[must_use]
    pub fn with_shared(fetcher: Arc<dyn OptionFetcher>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            fetcher,
            sender,
            receiver,
            handles: Vec::new(),
        }
    }

    /// Start a fetch on a new thread.
    ///
    /// A panicking fetcher is reported as a [`FetchError::Network`] response
    /// so the field leaves its loading state.
    pub fn spawn(&mut self, request: FetchRequest) {
        self.reap_finished();
        let fetcher = Arc::clone(&self.fetcher);
        let sender = self.sender.clone();
        tracing::debug!(field = %request.field, request = request.id.0, "spawning option fetch");
        let handle = std::thread::spawn(move || {
            let result = match catch_unwind(AssertUnwindSafe(|| fetcher.fetch(&request))) {
                Ok(result) => result,
                Err(payload) => {
                    let msg = panic_message(payload.as_ref());
                    tracing::error!(field = %request.field, "option fetch panicked: {msg}");
                    Err(FetchError::Network(format!("fetch panicked: {msg}")))
                }
            };
            // The receiver is gone only when the executor was dropped.
            let _ = sender.send(request.respond(result));
        });
        self.handles.push(handle);
    }

    /// Start every request in `requests`.
    pub fn spawn_all(&mut self, requests: impl IntoIterator<Item = FetchRequest>) {
        for request in requests {
            self.spawn(request);
        }
    }

    /// Next finished response, if any.
    pub fn try_recv(&mut self) -> Option<FetchResponse> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for a response.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<FetchResponse> {
        match self.receiver.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// All responses that have arrived so far.
    pub fn drain(&mut self) -> Vec<FetchResponse> {
        let responses: Vec<_> = self.receiver.try_iter().collect();
        self.reap_finished();
        responses
    }

    /// Number of worker threads not yet joined.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    fn reap_finished(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        let mut remaining = Vec::with_capacity(self.handles.len());
        for handle in self.handles.drain(..) {
            if handle.is_finished() {
                if let Err(payload) = handle.join() {
                    let msg = panic_message(payload.as_ref());
                    tracing::error!("fetch worker panicked: {msg}");
                }
            } else {
                remaining.push(handle);
            }
        }
        self.handles = remaining;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rozklad_select::{CacheKey, RequestId};
    use serde_json::{Map, Value, json};

    const WAIT: Duration = Duration::from_secs(5);

    fn request(id: u64, field: &str, key: Option<&str>) -> FetchRequest {
        FetchRequest {
            id: RequestId(id),
            field: field.to_string(),
            dependency: key.map(CacheKey::new),
            params: Map::new(),
        }
    }

    #[test]
    fn response_echoes_request() {
        let mut exec = FetchExecutor::new(|req: &FetchRequest| -> Result<Value, FetchError> {
            Ok(json!([{ "id": 1, "name": req.field.clone() }]))
        });
        exec.spawn(request(7, "group", Some("3")));
        let response = exec.recv_timeout(WAIT).expect("response");
        assert_eq!(response.request, RequestId(7));
        assert_eq!(response.field, "group");
        assert_eq!(response.dependency, Some(CacheKey::new("3")));
        assert_eq!(response.result, Ok(json!([{ "id": 1, "name": "group" }])));
    }

    #[test]
    fn errors_pass_through() {
        let mut exec = FetchExecutor::new(|_: &FetchRequest| -> Result<Value, FetchError> {
            Err(FetchError::Status {
                code: 500,
                message: "boom".into(),
            })
        });
        exec.spawn(request(1, "room", None));
        let response = exec.recv_timeout(WAIT).expect("response");
        assert!(matches!(
            response.result,
            Err(FetchError::Status { code: 500, .. })
        ));
    }

    #[test]
    fn panicking_fetcher_becomes_network_error() {
        let mut exec = FetchExecutor::new(|_: &FetchRequest| -> Result<Value, FetchError> {
            panic!("socket closed")
        });
        exec.spawn(request(2, "teacher", None));
        let response = exec.recv_timeout(WAIT).expect("response");
        match response.result {
            Err(FetchError::Network(msg)) => assert!(msg.contains("socket closed")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn many_requests_all_arrive() {
        let mut exec = FetchExecutor::new(|req: &FetchRequest| -> Result<Value, FetchError> {
            Ok(json!([req.id.0]))
        });
        exec.spawn_all((0..8).map(|i| request(i, "subject", None)));
        let mut seen = Vec::new();
        while seen.len() < 8 {
            let response = exec.recv_timeout(WAIT).expect("response");
            seen.push(response.request.0);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
        assert!(exec.try_recv().is_none());
    }

    #[test]
    fn empty_executor_has_nothing() {
        let mut exec = FetchExecutor::new(|_: &FetchRequest| -> Result<Value, FetchError> { Ok(json!([])) });
        assert!(exec.drain().is_empty());
        assert_eq!(exec.pending(), 0);
        assert!(exec.recv_timeout(Duration::from_millis(1)).is_none());
    }
}
