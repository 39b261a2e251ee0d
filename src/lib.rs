pub mod error;
pub mod judge;
pub mod language;
pub mod launcher;
pub mod supervisor;
pub mod types;
pub mod workspace;

pub use error::EngineError;
pub use judge::{normalize_output, Judge};
pub use language::{ImageOverrides, LanguageProfile, LanguageTable};
pub use launcher::{DockerBackend, InvocationSpec, ResourceLimits, SandboxBackend, TeardownSpec};
pub use types::*;
pub use workspace::Workspace;
