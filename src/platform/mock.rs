// ABOUTME: Scripted PlatformClient for unit tests.
// ABOUTME: Replies with queued responses in call order and records every request.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::client::{PlatformClient, PlatformRequest, PlatformResponse};
use super::error::PlatformError;

#[derive(Default)]
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Result<PlatformResponse, String>>>,
    requests: Mutex<Vec<PlatformRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, status: u16, body: &str) -> Self {
        self.replies
            .lock()
            .push_back(Ok(PlatformResponse::new(status, body)));
        self
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        self.replies.lock().push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn requests(&self) -> Vec<PlatformRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl PlatformClient for ScriptedClient {
    async fn execute(&self, request: PlatformRequest) -> Result<PlatformResponse, PlatformError> {
        let url = request.url.clone();
        self.requests.lock().push(request);
        match self.replies.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(PlatformError::Transport { url, message }),
            None => Err(PlatformError::Transport {
                url,
                message: "no scripted reply left".to_string(),
            }),
        }
    }
}
