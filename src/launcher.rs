use std::path::PathBuf;

use crate::language::LanguageProfile;
use crate::workspace::Workspace;

/// Path the workspace is mounted at inside the sandbox; also the working
/// directory of the run command.
pub const SANDBOX_WORKDIR: &str = "/work";

/// The fixed resource envelope applied to every sandboxed process.
///
/// Policy, not request-configurable: network disabled, a CPU share cap, a
/// memory ceiling, and a process-count cap.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    pub cpus: &'static str,
    pub memory: &'static str,
    pub pids_limit: &'static str,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpus: "0.5",
            memory: "256m",
            pids_limit: "128",
        }
    }
}

/// The exact process invocation the supervisor will execute. Pure data;
/// building one performs no I/O and spawns nothing.
#[derive(Debug, Clone)]
pub struct InvocationSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// Command the supervisor runs on the deadline path to tear down the
    /// sandbox itself. Killing the client process is not enough for
    /// backends where the workload lives elsewhere (a container under the
    /// runtime daemon survives its `docker run` client).
    pub teardown: Option<TeardownSpec>,
}

/// Out-of-band sandbox teardown command. Pure data, like the invocation.
#[derive(Debug, Clone)]
pub struct TeardownSpec {
    pub program: String,
    pub args: Vec<String>,
}

/// Port for isolation backends: turn a profile plus a workspace into a
/// concrete invocation. The supervisor depends only on the spec this
/// produces, so tests can substitute a backend that skips isolation.
pub trait SandboxBackend: Send + Sync {
    fn build(
        &self,
        profile: &LanguageProfile,
        workspace: &Workspace,
        limits: &ResourceLimits,
    ) -> InvocationSpec;
}

/// Backend that shells out to the Docker CLI.
///
/// Produces `docker run --rm` with the resource envelope applied, the
/// workspace bind-mounted read-write at [`SANDBOX_WORKDIR`], and the
/// profile's run command wrapped in a single `sh -lc` invocation.
#[derive(Debug, Clone, Default)]
pub struct DockerBackend;

impl SandboxBackend for DockerBackend {
    fn build(
        &self,
        profile: &LanguageProfile,
        workspace: &Workspace,
        limits: &ResourceLimits,
    ) -> InvocationSpec {
        let mount = format!("{}:{}", workspace.path().display(), SANDBOX_WORKDIR);
        // The workspace directory name is already unique per execution, so
        // it doubles as the container name the teardown command targets.
        let container_name = workspace
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "judge-run".to_string());
        let args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            container_name.clone(),
            "--network".to_string(),
            "none".to_string(),
            format!("--cpus={}", limits.cpus),
            "-m".to_string(),
            limits.memory.to_string(),
            "--pids-limit".to_string(),
            limits.pids_limit.to_string(),
            "-v".to_string(),
            mount,
            "-w".to_string(),
            SANDBOX_WORKDIR.to_string(),
            profile.image.clone(),
            "sh".to_string(),
            "-lc".to_string(),
            profile.run_command.to_string(),
        ];
        InvocationSpec {
            program: "docker".to_string(),
            args,
            current_dir: None,
            teardown: Some(TeardownSpec {
                program: "docker".to_string(),
                args: vec!["rm".to_string(), "-f".to_string(), container_name],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{ImageOverrides, LanguageTable};

    fn build_for(language: &str) -> (InvocationSpec, Workspace) {
        let table = LanguageTable::new(ImageOverrides::default());
        let profile = table.resolve(language).unwrap();
        let ws = Workspace::acquire(profile.source_file, "", "").unwrap();
        let spec = DockerBackend.build(profile, &ws, &ResourceLimits::default());
        (spec, ws)
    }

    #[test]
    fn docker_invocation_carries_the_full_envelope() {
        let (spec, ws) = build_for("python");
        assert_eq!(spec.program, "docker");
        let args = &spec.args;
        assert_eq!(args[0], "run");
        assert_eq!(args[1], "--rm");

        let net = args.iter().position(|a| a == "--network").unwrap();
        assert_eq!(args[net + 1], "none");
        assert!(args.iter().any(|a| a == "--cpus=0.5"));
        let mem = args.iter().position(|a| a == "-m").unwrap();
        assert_eq!(args[mem + 1], "256m");
        let pids = args.iter().position(|a| a == "--pids-limit").unwrap();
        assert_eq!(args[pids + 1], "128");
        ws.release();
    }

    #[test]
    fn workspace_is_mounted_at_the_fixed_workdir() {
        let (spec, ws) = build_for("python");
        let mount = format!("{}:{}", ws.path().display(), SANDBOX_WORKDIR);
        assert!(spec.args.contains(&mount));
        let w = spec.args.iter().position(|a| a == "-w").unwrap();
        assert_eq!(spec.args[w + 1], SANDBOX_WORKDIR);
        ws.release();
    }

    #[test]
    fn run_command_is_a_single_shell_invocation() {
        let (spec, ws) = build_for("cpp");
        let n = spec.args.len();
        assert_eq!(spec.args[n - 3], "sh");
        assert_eq!(spec.args[n - 2], "-lc");
        assert!(spec.args[n - 1].contains("g++"));
        assert!(spec.args[n - 1].contains("< input.txt"));
        ws.release();
    }

    #[test]
    fn container_is_named_and_teardown_targets_it() {
        let (spec, ws) = build_for("python");
        let name_pos = spec.args.iter().position(|a| a == "--name").unwrap();
        let container_name = &spec.args[name_pos + 1];
        assert!(container_name.starts_with("judge-"));

        let teardown = spec.teardown.as_ref().unwrap();
        assert_eq!(teardown.program, "docker");
        assert_eq!(
            teardown.args,
            vec!["rm".to_string(), "-f".to_string(), container_name.clone()]
        );
        ws.release();
    }

    #[test]
    fn build_is_pure_construction() {
        // Building a spec must not touch the workspace contents.
        let (_, ws) = build_for("python");
        let entries: Vec<_> = std::fs::read_dir(ws.path()).unwrap().collect();
        assert_eq!(entries.len(), 2); // source + stdin only
        ws.release();
    }
}
