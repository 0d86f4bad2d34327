//! Named backend operations.

use reqwest::Method;
use serde_json::Value;

use crate::client::types::{TestCustomRequest, TestGithubRequest};

/// One logical call against the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Health,
    TestCustomCode(TestCustomRequest),
    TestGithubRepo(TestGithubRequest),
    RunDemo,
    GetResults(String),
}

impl Operation {
    /// Stable name for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Health => "health",
            Operation::TestCustomCode(_) => "testCustomCode",
            Operation::TestGithubRepo(_) => "testGithubRepo",
            Operation::RunDemo => "runDemoTest",
            Operation::GetResults(_) => "getResults",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Operation::Health | Operation::GetResults(_) => Method::GET,
            Operation::TestCustomCode(_) | Operation::TestGithubRepo(_) | Operation::RunDemo => {
                Method::POST
            }
        }
    }

    /// Path below the `/api` prefix.
    pub fn path(&self) -> String {
        match self {
            Operation::Health => "/health".to_string(),
            Operation::TestCustomCode(_) => "/test-custom".to_string(),
            Operation::TestGithubRepo(_) => "/test-github".to_string(),
            Operation::RunDemo => "/run-tests".to_string(),
            Operation::GetResults(session_id) => {
                format!("/results/{}", urlencoding::encode(session_id))
            }
        }
    }

    /// JSON body, if the operation sends one.
    pub fn body(&self) -> Option<Value> {
        match self {
            Operation::TestCustomCode(req) => serde_json::to_value(req).ok(),
            Operation::TestGithubRepo(req) => serde_json::to_value(req).ok(),
            Operation::Health | Operation::RunDemo | Operation::GetResults(_) => None,
        }
    }
}
