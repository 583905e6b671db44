use crate::error::StagingResult;
use std::path::{Path, PathBuf};

/// Default directory the platform collects final model files from.
const DEFAULT_EXPORT_ROOT: &str = "/opt/ml/model";

/// Well-known output directories of a training run.
///
/// Training containers write checkpoints, full model trees, and adapter
/// files under fixed subdirectories of a run root; the platform collects
/// whatever lands in the export root when the job ends.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
    export_root: PathBuf,
}

impl RunLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root, export_root: PathBuf::from(DEFAULT_EXPORT_ROOT) }
    }

    /// Overrides the export root (useful outside the training container).
    #[must_use]
    pub fn with_export_root(mut self, export_root: PathBuf) -> Self {
        self.export_root = export_root;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a model's checkpoint and config files.
    #[must_use]
    pub fn weights_dir(&self, model_name: &str) -> PathBuf {
        self.root.join("checkpoints").join(model_name)
    }

    /// Directory holding a model's full on-disk tree.
    #[must_use]
    pub fn model_dir(&self, model_name: &str) -> PathBuf {
        self.root.join("models").join(model_name)
    }

    /// Directory holding adapter files for all models of the run.
    #[must_use]
    pub fn adapter_dir(&self) -> PathBuf {
        self.root.join("adapters")
    }

    /// Directory the platform collects final model files from.
    #[must_use]
    pub fn export_root(&self) -> &Path {
        &self.export_root
    }

    /// Glob pattern for a model's config files.
    #[must_use]
    pub fn config_pattern(&self, model_name: &str) -> String {
        format!("{}/{}_*.yaml", self.weights_dir(model_name).display(), model_name)
    }

    /// Glob pattern for a model's weight files.
    #[must_use]
    pub fn weights_pattern(&self, model_name: &str, use_safetensors: bool) -> String {
        let ext = if use_safetensors { "safetensors" } else { "ckpt" };
        format!("{}/{}_*.{}", self.weights_dir(model_name).display(), model_name, ext)
    }

    /// Glob pattern for a model's adapter files.
    #[must_use]
    pub fn adapter_pattern(&self, model_name: &str) -> String {
        format!("{}/{}_*.pt", self.adapter_dir().display(), model_name)
    }

    pub fn ensure_export_root(&self) -> StagingResult<()> {
        std::fs::create_dir_all(&self.export_root)?;
        Ok(())
    }
}
