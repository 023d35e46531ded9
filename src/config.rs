// Configuration consumed (not owned) by the Brain — spec §6.
//
// The Brain does not parse environment variables or CLI flags, and it does
// not construct its own `Orchestrator`/providers either — both are an
// external-collaborator concern (spec §1 Out of scope). The caller builds
// the real `Orchestrator` (picking providers, API keys, base URLs) and
// passes it into `BrainController::new` directly; this config only carries
// the state the Brain itself owns: where its graph persists, and the
// default per-path verification timeout.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level Brain construction config.
#[derive(Debug, Clone)]
pub struct BrainConfig {
    /// Default `data/brain/navigation.json` per spec §6.
    pub graph_path: PathBuf,
    /// Path.validation.timeout_ms default (spec §5: 30,000).
    pub default_timeout: Duration,
}

impl BrainConfig {
    pub fn new() -> Self {
        Self {
            graph_path: PathBuf::from("data/brain/navigation.json"),
            default_timeout: Duration::from_millis(30_000),
        }
    }

    pub fn with_graph_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.graph_path = path.into();
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_graph_path_matches_spec() {
        let config = BrainConfig::new();
        assert_eq!(config.graph_path, PathBuf::from("data/brain/navigation.json"));
        assert_eq!(config.default_timeout, Duration::from_millis(30_000));
    }

    #[test]
    fn with_graph_path_overrides_default() {
        let config = BrainConfig::new().with_graph_path("/tmp/custom.json");
        assert_eq!(config.graph_path, PathBuf::from("/tmp/custom.json"));
    }
}
