use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::language::{LanguageProfile, LanguageTable};
use crate::launcher::{DockerBackend, InvocationSpec, ResourceLimits, SandboxBackend};
use crate::supervisor;
use crate::types::{
    Aggregate, ExecutionRequest, ExecutionResult, SubmissionRequest, TestVerdict, Verdict,
};
use crate::workspace::Workspace;

/// Normalize output for comparison: canonicalize line endings to `\n`, then
/// trim leading/trailing whitespace. Interior content is left untouched, and
/// applying it twice changes nothing.
pub fn normalize_output(output: &str) -> String {
    output
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

/// The engine entry point: resolves profiles, drives executions, and for
/// submissions compares normalized output per test and aggregates a verdict.
pub struct Judge {
    table: LanguageTable,
    backend: Box<dyn SandboxBackend>,
    limits: ResourceLimits,
}

impl Judge {
    /// Engine with the built-in language table and the Docker backend.
    pub fn new() -> Self {
        Self::with_backend(LanguageTable::default(), Box::new(DockerBackend))
    }

    /// Engine over an explicit table and isolation backend.
    pub fn with_backend(table: LanguageTable, backend: Box<dyn SandboxBackend>) -> Self {
        Self {
            table,
            backend,
            limits: ResourceLimits::default(),
        }
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.table
    }

    /// One ad-hoc execution. The result is returned raw: no normalization,
    /// no comparison.
    pub async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let profile = self.table.resolve(&request.language_id)?;
        self.execute_once(
            profile,
            &request.source_code,
            &request.stdin,
            request.time_limit_ms,
        )
        .await
    }

    /// Judge a submission: execute every test case sequentially, in order,
    /// each in its own workspace, and aggregate the verdict.
    ///
    /// Serial execution is deliberate: the tests share the host's finite
    /// resource envelope, and running them one at a time keeps failure
    /// attribution unambiguous.
    pub async fn submit(&self, request: &SubmissionRequest) -> Result<Verdict> {
        let profile = self.table.resolve(&request.language_id)?;

        let mut per_test = Vec::with_capacity(request.test_cases.len());
        for (index, test) in request.test_cases.iter().enumerate() {
            debug!(index, "running test case");
            let execution = self
                .execute_once(
                    profile,
                    &request.source_code,
                    &test.input,
                    request.time_limit_ms,
                )
                .await?;

            let expected_output = normalize_output(&test.expected_output);
            let passed =
                execution.succeeded() && normalize_output(&execution.stdout) == expected_output;
            per_test.push(TestVerdict {
                index,
                passed,
                expected_output,
                execution,
            });
        }

        let aggregate = if per_test.iter().all(|t| t.passed) {
            Aggregate::Accepted
        } else {
            Aggregate::Rejected
        };
        Ok(Verdict {
            aggregate,
            per_test,
        })
    }

    /// One fully independent execution: fresh workspace, one invocation,
    /// workspace released on every exit path before the result is returned.
    async fn execute_once(
        &self,
        profile: &LanguageProfile,
        source_code: &str,
        stdin: &str,
        time_limit_ms: u64,
    ) -> Result<ExecutionResult> {
        let workspace = Workspace::acquire(profile.source_file, source_code, stdin)?;
        let spec: InvocationSpec = self.backend.build(profile, &workspace, &self.limits);
        let result = supervisor::run(&spec, Duration::from_millis(time_limit_ms)).await;
        workspace.release();
        result
    }
}

impl Default for Judge {
    fn default() -> Self {
        Self::new()
    }
}
