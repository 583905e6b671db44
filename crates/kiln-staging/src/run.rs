//! End-of-training staging: push a run's outputs to object storage and
//! drop the final model files where the platform collects them.

use crate::error::StagingResult;
use crate::layout::RunLayout;
use crate::location::StorageLocation;
use crate::mirror::{upload_directory, upload_matching_files};
use kiln_abstraction::ObjectStore;
use std::path::PathBuf;
use tracing::{info, warn};

/// What to stage after a training run. A `None` destination skips that step.
#[derive(Debug, Clone)]
pub struct StageRunOptions {
    /// Model name; file patterns and the model tree are derived from it.
    pub model_name: String,
    /// Training revision (step count) identifying the final checkpoint.
    pub revision: u64,
    /// Whether weights were saved as safetensors rather than ckpt.
    pub use_safetensors: bool,
    /// Destination for checkpoint/config files (glob upload).
    pub weights_dest: Option<StorageLocation>,
    /// Destination prefix for the full model tree (directory upload).
    pub model_dest: Option<StorageLocation>,
    /// Destination for adapter files; `Some` also marks the run as an
    /// adapter run, which changes the exported file names.
    pub adapter_dest: Option<StorageLocation>,
}

/// Outcome of a staging pass. `None` means the step was skipped.
///
/// The model-tree step has no flag: the directory mirror does not report
/// failures.
#[derive(Debug, Clone, Default)]
pub struct StageRunReport {
    pub config_uploaded: Option<bool>,
    pub weights_uploaded: Option<bool>,
    pub adapters_uploaded: Option<bool>,
    /// Final model files copied into the export root.
    pub exported: Vec<PathBuf>,
}

/// Runs the staging sequence for a finished training run.
///
/// Upload steps follow the mirror semantics (glob steps report a flag,
/// the tree step reports nothing); a failed upload step does not stop the
/// sequence. Filesystem errors while exporting final files do.
pub async fn stage_run(
    store: &dyn ObjectStore,
    layout: &RunLayout,
    options: &StageRunOptions,
) -> StagingResult<StageRunReport> {
    let mut report = StageRunReport::default();
    let name = &options.model_name;

    if let Some(dest) = &options.weights_dest {
        info!(model_name = %name, dest = %dest, "Uploading checkpoint files");
        let config_ok = upload_matching_files(store, dest, &layout.config_pattern(name)).await;
        let weights_ok = upload_matching_files(
            store,
            dest,
            &layout.weights_pattern(name, options.use_safetensors),
        )
        .await;
        if !(config_ok && weights_ok) {
            warn!(model_name = %name, "Checkpoint upload incomplete");
        }
        report.config_uploaded = Some(config_ok);
        report.weights_uploaded = Some(weights_ok);
    }

    if let Some(dest) = &options.model_dest {
        let model_dest = StorageLocation::new(dest.bucket.clone(), dest.join_key(name));
        info!(model_name = %name, dest = %model_dest, "Uploading model tree");
        upload_directory(store, &model_dest, &layout.model_dir(name)).await;
    }

    if let Some(dest) = &options.adapter_dest {
        info!(model_name = %name, dest = %dest, "Uploading adapter files");
        let ok = upload_matching_files(store, dest, &layout.adapter_pattern(name)).await;
        if !ok {
            warn!(model_name = %name, "Adapter upload incomplete");
        }
        report.adapters_uploaded = Some(ok);
    }

    report.exported = export_final_files(layout, options)?;
    Ok(report)
}

/// Copies the final revision's files into the export root.
///
/// Adapter runs use a `_lora`-suffixed base name, matching what the
/// training container writes.
fn export_final_files(
    layout: &RunLayout,
    options: &StageRunOptions,
) -> StagingResult<Vec<PathBuf>> {
    layout.ensure_export_root()?;

    let name = &options.model_name;
    let base = if options.adapter_dest.is_some() {
        format!("{}_{}_lora", name, options.revision)
    } else {
        format!("{}_{}", name, options.revision)
    };
    let ext = if options.use_safetensors { "safetensors" } else { "ckpt" };

    let mut exported = Vec::new();
    for file_name in [format!("{base}.yaml"), format!("{base}.{ext}")] {
        let source = layout.weights_dir(name).join(&file_name);
        if !source.exists() {
            continue;
        }
        let target = layout.export_root().join(&file_name);
        std::fs::copy(&source, &target)?;
        info!(source = %source.display(), target = %target.display(), "Exported final model file");
        exported.push(target);
    }

    Ok(exported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_platform::MemoryObjectStore;
    use tempfile::TempDir;

    fn write(path: PathBuf, content: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn layout_with_outputs(temp: &TempDir) -> RunLayout {
        let layout = RunLayout::new(temp.path().to_path_buf())
            .with_export_root(temp.path().join("export"));
        write(layout.weights_dir("sd").join("sd_100.yaml"), b"cfg");
        write(layout.weights_dir("sd").join("sd_100.ckpt"), b"w");
        write(layout.model_dir("sd").join("unet/config.json"), b"{}");
        write(layout.adapter_dir().join("sd_100.pt"), b"lora");
        layout
    }

    #[tokio::test]
    async fn test_stage_run_uploads_all_destinations() {
        let temp = TempDir::new().unwrap();
        let layout = layout_with_outputs(&temp);
        let store = MemoryObjectStore::new();

        let options = StageRunOptions {
            model_name: "sd".to_string(),
            revision: 100,
            use_safetensors: false,
            weights_dest: Some("s3://bucket/sd-models/".parse().unwrap()),
            model_dest: Some("s3://bucket/db-models/".parse().unwrap()),
            adapter_dest: Some("s3://bucket/lora-models/".parse().unwrap()),
        };

        let report = stage_run(&store, &layout, &options).await.unwrap();

        assert_eq!(report.config_uploaded, Some(true));
        assert_eq!(report.weights_uploaded, Some(true));
        assert_eq!(report.adapters_uploaded, Some(true));
        assert!(store.object("bucket", "sd-models/sd_100.yaml").is_some());
        assert!(store.object("bucket", "sd-models/sd_100.ckpt").is_some());
        assert!(store.object("bucket", "db-models/sd/unet/config.json").is_some());
        assert!(store.object("bucket", "lora-models/sd_100.pt").is_some());
    }

    #[tokio::test]
    async fn test_stage_run_exports_final_files_for_plain_run() {
        let temp = TempDir::new().unwrap();
        let layout = layout_with_outputs(&temp);
        let store = MemoryObjectStore::new();

        let options = StageRunOptions {
            model_name: "sd".to_string(),
            revision: 100,
            use_safetensors: false,
            weights_dest: None,
            model_dest: None,
            adapter_dest: None,
        };

        let report = stage_run(&store, &layout, &options).await.unwrap();

        assert_eq!(report.config_uploaded, None);
        assert_eq!(store.object_count(), 0);
        let exported: Vec<_> =
            report.exported.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(exported, vec!["sd_100.yaml", "sd_100.ckpt"]);
        assert!(temp.path().join("export/sd_100.ckpt").is_file());
    }

    #[tokio::test]
    async fn test_stage_run_adapter_run_exports_lora_names_only() {
        let temp = TempDir::new().unwrap();
        let layout = layout_with_outputs(&temp);
        let store = MemoryObjectStore::new();

        let options = StageRunOptions {
            model_name: "sd".to_string(),
            revision: 100,
            use_safetensors: false,
            weights_dest: None,
            model_dest: None,
            adapter_dest: Some("s3://bucket/lora-models/".parse().unwrap()),
        };

        let report = stage_run(&store, &layout, &options).await.unwrap();

        // No sd_100_lora.* files exist in this run, so nothing is exported.
        assert!(report.exported.is_empty());
        assert_eq!(report.adapters_uploaded, Some(true));
    }

    #[tokio::test]
    async fn test_stage_run_reports_failed_weights_upload() {
        let temp = TempDir::new().unwrap();
        let layout = layout_with_outputs(&temp);
        let store = MemoryObjectStore::new();
        store.fail_on_key("sd-models/sd_100.ckpt");

        let options = StageRunOptions {
            model_name: "sd".to_string(),
            revision: 100,
            use_safetensors: false,
            weights_dest: Some("s3://bucket/sd-models/".parse().unwrap()),
            model_dest: None,
            adapter_dest: None,
        };

        let report = stage_run(&store, &layout, &options).await.unwrap();

        assert_eq!(report.config_uploaded, Some(true));
        assert_eq!(report.weights_uploaded, Some(false));
    }
}
