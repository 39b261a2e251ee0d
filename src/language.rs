use std::collections::HashMap;

use crate::error::EngineError;

/// How a language's source is materialized and run inside the sandbox.
///
/// The run command is a single shell line executed in the workspace mount;
/// for compiled languages it compiles and runs in one invocation, so a
/// compile failure surfaces as a nonzero exit with diagnostics on stderr
/// rather than as a distinct engine phase.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub id: &'static str,
    pub image: String,
    pub source_file: &'static str,
    pub run_command: &'static str,
}

/// Per-language container image overrides, read from the environment once
/// at startup. The table never consults the environment after construction.
#[derive(Debug, Clone, Default)]
pub struct ImageOverrides {
    images: HashMap<&'static str, String>,
}

impl ImageOverrides {
    pub fn from_env() -> Self {
        let mut images = HashMap::new();
        for (id, var) in [("python", "JUDGE_PY_IMAGE"), ("cpp", "JUDGE_CPP_IMAGE")] {
            if let Ok(image) = std::env::var(var) {
                if !image.is_empty() {
                    images.insert(id, image);
                }
            }
        }
        Self { images }
    }

    #[cfg(test)]
    pub fn with(mut self, id: &'static str, image: &str) -> Self {
        self.images.insert(id, image.to_string());
        self
    }

    fn resolve(&self, id: &'static str, default: &str) -> String {
        self.images
            .get(id)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Immutable mapping from language id to its profile.
///
/// Adding a language is purely adding an entry here; the launcher and
/// supervisor are language-agnostic.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    profiles: Vec<LanguageProfile>,
}

impl LanguageTable {
    pub fn new(overrides: ImageOverrides) -> Self {
        Self::from_profiles(vec![
            LanguageProfile {
                id: "python",
                image: overrides.resolve("python", "python:3.10-alpine"),
                source_file: "main.py",
                run_command: "python3 main.py < input.txt",
            },
            LanguageProfile {
                id: "cpp",
                image: overrides.resolve("cpp", "gcc:latest"),
                source_file: "main.cpp",
                run_command: "g++ -O2 -std=c++17 -o main main.cpp && ./main < input.txt",
            },
        ])
    }

    /// Build a table from explicit entries.
    pub fn from_profiles(profiles: Vec<LanguageProfile>) -> Self {
        Self { profiles }
    }

    /// Look up a profile; unknown ids fail before any sandbox is launched.
    pub fn resolve(&self, language_id: &str) -> Result<&LanguageProfile, EngineError> {
        self.profiles
            .iter()
            .find(|p| p.id == language_id)
            .ok_or_else(|| EngineError::UnsupportedLanguage(language_id.to_string()))
    }

    pub fn supported_ids(&self) -> Vec<&'static str> {
        self.profiles.iter().map(|p| p.id).collect()
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::new(ImageOverrides::from_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_languages() {
        let table = LanguageTable::new(ImageOverrides::default());
        let python = table.resolve("python").unwrap();
        assert_eq!(python.source_file, "main.py");
        assert_eq!(python.image, "python:3.10-alpine");

        let cpp = table.resolve("cpp").unwrap();
        assert!(cpp.run_command.starts_with("g++"));
    }

    #[test]
    fn rejects_unknown_language() {
        let table = LanguageTable::new(ImageOverrides::default());
        match table.resolve("ruby") {
            Err(EngineError::UnsupportedLanguage(id)) => assert_eq!(id, "ruby"),
            other => panic!("expected UnsupportedLanguage, got {other:?}"),
        }
    }

    #[test]
    fn image_override_applies_to_one_language_only() {
        let overrides = ImageOverrides::default().with("python", "python:3.12-slim");
        let table = LanguageTable::new(overrides);
        assert_eq!(table.resolve("python").unwrap().image, "python:3.12-slim");
        assert_eq!(table.resolve("cpp").unwrap().image, "gcc:latest");
    }

    #[test]
    fn lists_supported_ids() {
        let table = LanguageTable::new(ImageOverrides::default());
        assert_eq!(table.supported_ids(), vec!["python", "cpp"]);
    }
}
