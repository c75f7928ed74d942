//! In-process `Transport` that replays canned responses.
//!
//! Each call to `execute` records the request and pops the next scripted
//! outcome. Running out of script is reported as a network error so a test
//! that issues an unexpected extra request fails loudly.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};

enum Step {
    Respond(HttpResponse),
    Delay(Duration, HttpResponse),
    Fail(ApiError),
}

#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: &str) -> &Self {
        self.push(Step::Respond(response(status, body)))
    }

    pub fn respond_after(&self, delay: Duration, status: u16, body: &str) -> &Self {
        self.push(Step::Delay(delay, response(status, body)))
    }

    pub fn fail(&self, error: ApiError) -> &Self {
        self.push(Step::Fail(error))
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn push(&self, step: Step) -> &Self {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
        self
    }
}

fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.clone();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let step = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Delay(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Step::Fail(error)) => Err(error),
            None => Err(ApiError::Network(format!("no scripted response for {url}"))),
        }
    }
}
