//! Request and response shapes of the mutation-testing backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Health body together with the endpoint that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(flatten)]
    pub health: HealthStatus,
    pub endpoint: String,
}

/// Body of `POST /api/test-custom`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCustomRequest {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_tests: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_ai_tests: Option<bool>,
}

/// Body of `POST /api/test-github`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestGithubRequest {
    pub repo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_tests: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_ai_tests: Option<bool>,
}

/// Result of a mutation-testing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationTestResult {
    pub total_mutations: u32,
    pub tests_passed_original: u32,
    pub tests_detected_mutations: u32,
    pub mutation_detection_rate: f64,
    #[serde(default)]
    pub mutation_results: Vec<MutationResult>,
    #[serde(default)]
    pub test_details: Vec<TestDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a single mutant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationResult {
    pub mutation_id: Value,
    pub mutation_description: String,
    pub original_code: String,
    pub mutated_code: String,
    pub was_detected: bool,
    pub detected_by_tests: Vec<Value>,
}

/// How a single test fared across all mutants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestDetail {
    pub name: String,
    pub passes_original: bool,
    pub detection_count: u32,
    pub detected_mutations: Vec<Value>,
}
