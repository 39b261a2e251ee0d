use serde::{Deserialize, Serialize};

/// Time limit applied when a request does not carry one, in milliseconds.
pub const DEFAULT_TIME_LIMIT_MS: u64 = 4000;

fn default_time_limit_ms() -> u64 {
    DEFAULT_TIME_LIMIT_MS
}

/// A single test case: stdin to feed and the output the program must print.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

/// Request for one ad-hoc execution of user code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub language_id: String,
    pub source_code: String,
    #[serde(default)]
    pub stdin: String,
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: u64,
}

/// Request to judge user code against an ordered list of test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub language_id: String,
    pub source_code: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: u64,
}

/// Raw outcome of one sandboxed execution.
///
/// `exit_code` is `None` exclusively when the process was killed for
/// exceeding the time limit; every other completion carries the real code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub elapsed_time_ms: u64,
}

impl ExecutionResult {
    /// True iff the process ran to completion with exit code 0.
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Outcome of one test case within a submission.
///
/// The raw execution data is kept alongside the pass/fail flag so callers
/// can show diagnostics (stderr, timing) for failing tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestVerdict {
    pub index: usize,
    pub passed: bool,
    /// Expected output after normalization, for display next to the actual.
    pub expected_output: String,
    #[serde(flatten)]
    pub execution: ExecutionResult,
}

/// Aggregate verdict over a whole submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregate {
    Accepted,
    Rejected,
}

/// Per-test results plus the aggregate for one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub aggregate: Aggregate,
    pub per_test: Vec<TestVerdict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_result_wire_names_are_camel_case() {
        let result = ExecutionResult {
            stdout: "7\n".to_string(),
            stderr: String::new(),
            exit_code: Some(0),
            timed_out: false,
            elapsed_time_ms: 12,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["exitCode"], 0);
        assert_eq!(json["timedOut"], false);
        assert_eq!(json["elapsedTimeMs"], 12);
    }

    #[test]
    fn timeout_serializes_exit_code_as_null() {
        let result = ExecutionResult {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            timed_out: true,
            elapsed_time_ms: 4000,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["exitCode"].is_null());
        assert_eq!(json["timedOut"], true);
    }

    #[test]
    fn test_verdict_flattens_execution_fields() {
        let verdict = TestVerdict {
            index: 0,
            passed: true,
            expected_output: "2".to_string(),
            execution: ExecutionResult {
                stdout: "2\n".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
                timed_out: false,
                elapsed_time_ms: 8,
            },
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["index"], 0);
        assert_eq!(json["stdout"], "2\n");
        assert_eq!(json["exitCode"], 0);
    }

    #[test]
    fn aggregate_uses_uppercase_wire_names() {
        assert_eq!(
            serde_json::to_string(&Aggregate::Accepted).unwrap(),
            "\"ACCEPTED\""
        );
        assert_eq!(
            serde_json::to_string(&Aggregate::Rejected).unwrap(),
            "\"REJECTED\""
        );
    }

    #[test]
    fn requests_default_the_time_limit() {
        let req: ExecutionRequest =
            serde_json::from_str(r#"{"languageId":"python","sourceCode":"print(1)"}"#).unwrap();
        assert_eq!(req.time_limit_ms, DEFAULT_TIME_LIMIT_MS);
        assert_eq!(req.stdin, "");
    }
}
