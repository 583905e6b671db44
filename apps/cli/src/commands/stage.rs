//! Staging command implementation.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use kiln_platform::HttpObjectStore;
use kiln_staging::{
    stage_run, upload_directory, upload_matching_files, RunLayout, StageRunOptions,
    StorageLocation,
};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum StageCommand {
    /// Upload every file matching a glob pattern
    ///
    /// Files land at the destination's key prefix plus their base name.
    /// Stops at the first failed upload and exits non-zero.
    Files {
        /// Destination location reference (e.g., s3://bucket/models/)
        #[arg(long)]
        dest: String,

        /// Local glob pattern (e.g., "out/*.safetensors")
        pattern: String,
    },

    /// Upload a whole directory tree
    ///
    /// Relative paths under the root are preserved below the destination
    /// key prefix. Uploads are best-effort: failures are logged and
    /// skipped.
    Tree {
        /// Destination location reference (e.g., s3://bucket/models/sd15)
        #[arg(long)]
        dest: String,

        /// Local directory root
        root: PathBuf,
    },

    /// Stage a finished training run
    ///
    /// Uploads checkpoint files, the model tree, and adapter files to
    /// their destinations, then copies the final model files into the
    /// platform's export directory.
    Run {
        /// Model name the run produced
        #[arg(long)]
        model_name: String,

        /// Training revision (step count) of the final checkpoint
        #[arg(long)]
        revision: u64,

        /// Weights were saved as safetensors rather than ckpt
        #[arg(long)]
        safetensors: bool,

        /// Root directory of the run's outputs
        #[arg(long)]
        root: PathBuf,

        /// Override the platform export directory
        #[arg(long)]
        export_root: Option<PathBuf>,

        /// Destination for checkpoint/config files
        #[arg(long)]
        weights_uri: Option<String>,

        /// Destination prefix for the full model tree
        #[arg(long)]
        model_uri: Option<String>,

        /// Destination for adapter files (marks the run as an adapter run)
        #[arg(long)]
        adapter_uri: Option<String>,
    },
}

pub async fn execute(store: &HttpObjectStore, command: StageCommand) -> Result<()> {
    match command {
        StageCommand::Files { dest, pattern } => stage_files(store, &dest, &pattern).await,
        StageCommand::Tree { dest, root } => stage_tree(store, &dest, &root).await,
        StageCommand::Run {
            model_name,
            revision,
            safetensors,
            root,
            export_root,
            weights_uri,
            model_uri,
            adapter_uri,
        } => {
            let mut layout = RunLayout::new(root);
            if let Some(export) = export_root {
                layout = layout.with_export_root(export);
            }
            let options = StageRunOptions {
                model_name,
                revision,
                use_safetensors: safetensors,
                weights_dest: parse_dest(weights_uri.as_deref())?,
                model_dest: parse_dest(model_uri.as_deref())?,
                adapter_dest: parse_dest(adapter_uri.as_deref())?,
            };
            run_staging(store, &layout, &options).await
        }
    }
}

fn parse_dest(uri: Option<&str>) -> Result<Option<StorageLocation>> {
    uri.map(|u| u.parse().with_context(|| format!("invalid destination: {u}"))).transpose()
}

async fn stage_files(store: &HttpObjectStore, dest: &str, pattern: &str) -> Result<()> {
    let location: StorageLocation =
        dest.parse().with_context(|| format!("invalid destination: {dest}"))?;

    println!("{} {} {} {}", "Uploading".cyan(), pattern, "to".dimmed(), location);
    if !upload_matching_files(store, &location, pattern).await {
        anyhow::bail!("upload failed for pattern {pattern}");
    }
    println!("{}", "Done.".green());
    Ok(())
}

async fn stage_tree(store: &HttpObjectStore, dest: &str, root: &PathBuf) -> Result<()> {
    let location: StorageLocation =
        dest.parse().with_context(|| format!("invalid destination: {dest}"))?;

    println!("{} {} {} {}", "Uploading".cyan(), root.display(), "to".dimmed(), location);
    upload_directory(store, &location, root).await;
    println!("{}", "Done (best-effort).".green());
    Ok(())
}

async fn run_staging(
    store: &HttpObjectStore,
    layout: &RunLayout,
    options: &StageRunOptions,
) -> Result<()> {
    println!(
        "{} {} {}",
        "Staging run for".cyan(),
        options.model_name.bold(),
        format!("(revision {})", options.revision).dimmed()
    );

    let report = stage_run(store, layout, options)
        .await
        .context("staging sequence failed")?;

    for (step, outcome) in [
        ("config", report.config_uploaded),
        ("weights", report.weights_uploaded),
        ("adapters", report.adapters_uploaded),
    ] {
        match outcome {
            Some(true) => println!("  {step}: {}", "uploaded".green()),
            Some(false) => println!("  {step}: {}", "failed".red()),
            None => println!("  {step}: {}", "skipped".dimmed()),
        }
    }
    for path in &report.exported {
        println!("  exported {}", path.display().to_string().dimmed());
    }

    let failed = [report.config_uploaded, report.weights_uploaded, report.adapters_uploaded]
        .iter()
        .any(|step| *step == Some(false));
    if failed {
        anyhow::bail!("one or more staging steps failed");
    }
    Ok(())
}
