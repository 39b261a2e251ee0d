use code_judge::{ExecutionRequest, Judge, SubmissionRequest, TestCase};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Code Judge Engine v0.1.0");
    println!("========================");

    if let Err(e) = check_environment() {
        eprintln!("Environment check failed: {e}");
        eprintln!("Please ensure Docker is installed and available in PATH");
        return Ok(());
    }
    println!("Environment check passed ✓");

    let judge = Judge::new();
    println!("Supported languages: {:?}", judge.languages().supported_ids());

    let source = "a, b = map(int, input().split())\nprint(a + b)\n";

    // One ad-hoc run
    let run = judge
        .run(&ExecutionRequest {
            language_id: "python".to_string(),
            source_code: source.to_string(),
            stdin: "3 4\n".to_string(),
            time_limit_ms: 4000,
        })
        .await?;
    println!("\nRun Result:");
    println!("===========");
    println!("{}", serde_json::to_string_pretty(&run)?);

    // A full submission
    let verdict = judge
        .submit(&SubmissionRequest {
            language_id: "python".to_string(),
            source_code: source.to_string(),
            test_cases: vec![
                TestCase {
                    input: "1 1\n".to_string(),
                    expected_output: "2\n".to_string(),
                },
                TestCase {
                    input: "10 32\n".to_string(),
                    expected_output: "42\n".to_string(),
                },
            ],
            time_limit_ms: 4000,
        })
        .await?;
    println!("\nVerdict:");
    println!("========");
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    Ok(())
}

/// Check that the container runtime is available before accepting work.
fn check_environment() -> anyhow::Result<()> {
    which::which("docker").map_err(|_| anyhow::anyhow!("docker not found in PATH"))?;
    Ok(())
}
