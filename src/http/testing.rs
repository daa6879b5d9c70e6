//! Scripted transport for unit tests

use super::transport::{Outcome, Transport};
use crate::types::StringMap;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// One recorded `execute` call
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub at: Instant,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Replays a fixed list of outcomes and records every call
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        url: &str,
        _headers: &StringMap,
        params: &[(String, String)],
    ) -> Outcome {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            params: params.to_vec(),
            at: Instant::now(),
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Outcome::UnknownError("script exhausted".to_string()))
    }
}
