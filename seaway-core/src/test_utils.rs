//! Scripted in-memory transport for unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::operation::{Method, Operation};
use crate::transport::{Response, Transport, TransportError};

/// A [`Transport`] that records every operation and answers from stubbed
/// results keyed by (method, path)
///
/// Unstubbed operations get an empty 200, which matches how most write
/// endpoints respond and keeps the happy path short to script.
pub(crate) struct MockTransport {
    requests: Mutex<Vec<Operation>>,
    stubs: Mutex<HashMap<(Method, String), VecDeque<Result<Response, TransportError>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            stubs: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a result for the next matching operation
    pub fn stub(&self, method: Method, path: &str, result: Result<Response, TransportError>) {
        self.stubs
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(result);
    }

    /// Every operation executed so far, in order
    pub fn requests(&self) -> Vec<Operation> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, operation: &Operation) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(operation.clone());
        let mut stubs = self.stubs.lock().unwrap();
        if let Some(queue) = stubs.get_mut(&(operation.method, operation.path.clone())) {
            if let Some(result) = queue.pop_front() {
                return result;
            }
        }
        Ok(Response::new(200, "{}"))
    }
}
