//! Configuration and path resolution for the CLI.
//!
//! Handles finding model files and data directories across different environments:
//! - Custom: `--model-dir` / `--data-dir` flags or their environment variables
//! - Development: workspace `models/` directory
//! - Distribution: relative to executable

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use scholar_core::config::EMBEDDING_DIM;
use scholar_core::embedding::{Embedder, HashingEmbedder, MiniLmConfig, MiniLmEmbedder, ModelFiles};
use scholar_core::EngineConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Directory name of the bundled model, relative to a models root.
const MODEL_DIRNAME: &str = "all-MiniLM-L6-v2";

/// Resolved global options.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub model_dir: Option<PathBuf>,
    pub hashing_embedder: bool,
}

impl Settings {
    pub fn resolve(
        data_dir: Option<PathBuf>,
        model_dir: Option<PathBuf>,
        hashing_embedder: bool,
    ) -> Result<Self> {
        Ok(Self {
            data_dir: get_data_dir(data_dir.as_ref())?,
            model_dir,
            hashing_embedder,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(&self.data_dir)
    }

    /// Loads the embedder selected by the flags.
    pub fn load_embedder(&self) -> Result<Arc<dyn Embedder>> {
        if self.hashing_embedder {
            info!("Using hashing embedder ({} dims)", EMBEDDING_DIM);
            return Ok(Arc::new(HashingEmbedder::new(EMBEDDING_DIM)));
        }

        let dir = find_model_dir(self.model_dir.as_deref())?;
        info!("Loading embedding model from {}", dir.display());
        let embedder = MiniLmEmbedder::from_dir(&dir, MiniLmConfig::default())
            .with_context(|| format!("Failed to load embedding model from {}", dir.display()))?;
        Ok(Arc::new(embedder))
    }
}

fn has_model_files(dir: &Path) -> bool {
    ModelFiles::in_dir(dir).missing().is_empty()
}

/// Finds the directory holding `model.safetensors`, `config.json` and
/// `tokenizer.json`.
///
/// Search order:
/// 1. `custom` (from `--model-dir` or `$SCHOLAR_MODEL_DIR`)
/// 2. Workspace `models/all-MiniLM-L6-v2/` directory (development)
/// 3. Executable-relative `../models/all-MiniLM-L6-v2/` and `models/all-MiniLM-L6-v2/`
pub fn find_model_dir(custom: Option<&Path>) -> Result<PathBuf> {
    // 1. Flag or environment variable
    if let Some(dir) = custom {
        if has_model_files(dir) {
            return Ok(dir.to_path_buf());
        }
        let missing = ModelFiles::in_dir(dir)
            .missing()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(anyhow!(
            "Model directory {} is incomplete, missing: {}",
            dir.display(),
            missing
        ));
    }

    // 2. Workspace models (development)
    // CARGO_MANIFEST_DIR points to crates/scholar-cli
    let workspace_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .map(|p| p.join("models").join(MODEL_DIRNAME));

    if let Some(ref path) = workspace_path {
        if has_model_files(path) {
            return Ok(path.clone());
        }
    }

    // 3. Relative to executable (distribution)
    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            for candidate in [
                exe_dir.join("../models").join(MODEL_DIRNAME),
                exe_dir.join("models").join(MODEL_DIRNAME),
            ] {
                if has_model_files(&candidate) {
                    return Ok(candidate);
                }
            }
        }
    }

    Err(anyhow!(
        "Model files not found. Pass --model-dir, set $SCHOLAR_MODEL_DIR, \
         or use --hashing-embedder to run without a model.\n\
         Searched locations:\n\
         - {}\n\
         - Relative to executable",
        workspace_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("<workspace>/models/{}", MODEL_DIRNAME))
    ))
}

/// Returns the data directory.
///
/// - macOS: `~/Library/Application Support/dev.scholar.Scholar/`
/// - Linux: `~/.local/share/scholar/`
/// - Windows: `%APPDATA%\scholar\Scholar\data\`
pub fn get_data_dir(custom_dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = custom_dir {
        return Ok(dir.clone());
    }

    ProjectDirs::from("dev", "scholar", "Scholar")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_data_dir() {
        let custom = PathBuf::from("/tmp/custom-data");
        let dir = get_data_dir(Some(&custom)).unwrap();
        assert_eq!(dir, custom);
    }

    #[test]
    fn test_default_data_dir() {
        // Not every CI user has a home directory
        if let Ok(dir) = get_data_dir(None) {
            let dir_str = dir.to_string_lossy().to_lowercase();
            assert!(dir_str.contains("scholar"), "unexpected data dir: {}", dir_str);
        }
    }

    #[test]
    fn test_incomplete_model_dir_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();

        let err = find_model_dir(Some(dir.path())).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("model.safetensors"));
        assert!(message.contains("tokenizer.json"));
    }

    #[test]
    fn test_hashing_embedder_needs_no_model() {
        let settings = Settings {
            data_dir: PathBuf::from("/tmp/data"),
            model_dir: Some(PathBuf::from("/nonexistent")),
            hashing_embedder: true,
        };
        let embedder = settings.load_embedder().unwrap();
        assert_eq!(embedder.embedding_dim(), EMBEDDING_DIM);
    }

    #[test]
    fn test_engine_config_rooted_at_data_dir() {
        let settings = Settings::resolve(Some(PathBuf::from("/tmp/data")), None, true).unwrap();
        let config = settings.engine_config();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/data"));
        assert_eq!(config.index_dir, PathBuf::from("/tmp/data/index"));
    }
}
