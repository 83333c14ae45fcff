//! Provider hot reload.
//!
//! Watches the config file and hands the freshly parsed provider map to a
//! callback after a debounce window.

use agentmesh_core::{MeshError, MeshResult};
use agentmesh_orchestrator::ProviderConfigMap;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};

/// The part of the config that can change at runtime.
///
/// Other sections of the file are ignored here.
#[derive(Debug, Deserialize)]
pub struct ReloadableConfig {
    #[serde(default)]
    pub providers: ProviderConfigMap,
}

/// Keeps the file watch alive; dropping it stops watching.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Starts watching `config_path`.
    ///
    /// `on_reload` runs on a background thread at most once per
    /// `debounce_ms` burst of writes. Parse errors are logged and skipped.
    pub fn start<F>(config_path: PathBuf, debounce_ms: u64, on_reload: F) -> MeshResult<Self>
    where
        F: Fn(ProviderConfigMap) + Send + 'static,
    {
        let (tx, rx) = std_mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    let _ = tx.send(());
                }
            }
        })
        .map_err(|e| MeshError::Config(format!("Failed to create file watcher: {e}")))?;

        watcher
            .watch(&config_path, RecursiveMode::NonRecursive)
            .map_err(|e| MeshError::Config(format!("Failed to watch config file: {e}")))?;

        let path = config_path.clone();
        std::thread::spawn(move || {
            let debounce = Duration::from_millis(debounce_ms);
            while rx.recv().is_ok() {
                // Let the writer finish, then collapse the burst into one reload.
                std::thread::sleep(debounce);
                while rx.try_recv().is_ok() {}

                let started = Instant::now();
                match parse_providers(&path) {
                    Ok(providers) => {
                        tracing::info!(providers = providers.len(), "Config changed; reloading providers");
                        on_reload(providers);
                        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Reload dispatched");
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to reload config"),
                }
            }
            tracing::debug!("Config watcher thread exiting");
        });

        tracing::info!(path = %config_path.display(), "Config hot-reload watcher started");
        Ok(Self { _watcher: watcher })
    }
}

/// Reads the provider map from a config file.
pub fn parse_providers(path: &Path) -> MeshResult<ProviderConfigMap> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MeshError::Config(format!("Failed to read config '{}': {e}", path.display()))
    })?;
    let config: ReloadableConfig = toml::from_str(&content).map_err(|e| {
        MeshError::Config(format!("Failed to parse config '{}': {e}", path.display()))
    })?;
    Ok(config.providers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_providers_parsed_other_sections_ignored() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp.as_file_mut(),
            r#"
[model]
provider = "claude"

[providers.fs]
command = "mcp-fs"
args = ["/tmp"]
"#
        )
        .unwrap();

        let providers = parse_providers(tmp.path()).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers["fs"].args, vec!["/tmp"]);
    }

    #[test]
    fn test_no_providers_section_is_empty_map() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp.as_file_mut(), "[server]\nport = 8000").unwrap();
        assert!(parse_providers(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp.as_file_mut(), "{{{{invalid toml!!!!").unwrap();
        let err = parse_providers(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = parse_providers(Path::new("/nonexistent/agentmesh.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
