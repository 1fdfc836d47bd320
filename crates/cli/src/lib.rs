//! `meshgen` -- resumable image-to-mesh batch driver for ComfyUI Trellis2.
//!
//! Turns every image in an input folder into GLB meshes by driving a
//! ComfyUI workflow one image at a time. Progress is checkpointed under
//! `{output}/tracking/` so an interrupted run picks up where it stopped.
//!
//! # Environment variables
//!
//! | Variable                     | Default                  | Description                          |
//! |------------------------------|--------------------------|--------------------------------------|
//! | `COMFYUI_BASE_URL`           | `http://127.0.0.1:8188/` | ComfyUI REST endpoint                |
//! | `COMFYUI_DIR`                | --                       | Installation used when `../ComfyUI` is absent |
//! | `MESHGEN_MAX_WAIT_SECS`      | `3600`                   | Per-job wait before harvesting anyway |
//! | `MESHGEN_POLL_INTERVAL_SECS` | `2`                      | Seconds between history polls        |
//! | `MESHGEN_MAX_IMAGE_SIZE`     | `1024`                   | Longest image side sent to ComfyUI   |

pub mod args;

use std::path::{Path, PathBuf};

use anyhow::Context;
use meshgen_comfyui::api::ComfyUIApi;
use meshgen_comfyui::install::{resolve_comfyui_dir, ComfyUIDirs};
use meshgen_comfyui::workflow::{TemplateBindings, WorkflowTemplate};
use meshgen_core::checkpoint::CheckpointStore;
use meshgen_core::config::{CHECKPOINT_NAME, TRACKING_DIR_NAME};
use meshgen_core::item::discover_items;
use meshgen_pipeline::backend::JobBackend;
use meshgen_pipeline::coordinator::{pending_items, BatchCoordinator, RunReport};
use meshgen_pipeline::harvest::Harvester;
use meshgen_pipeline::item::ItemPipeline;
use meshgen_pipeline::poll::PollConfig;
use meshgen_pipeline::staging::ImageStager;

pub use args::Cli;

/// Run against the ComfyUI server named on the command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let base_dir = std::env::current_dir().context("Failed to determine working directory")?;
    let backend = ComfyUIApi::new(cli.comfyui_url.clone());
    tracing::info!(
        api_url = %backend.api_url(),
        client_id = %backend.client_id(),
        "Using ComfyUI backend",
    );
    run_with_backend(&cli, &base_dir, backend).await
}

/// Run the batch with relative paths resolved against `base_dir`.
///
/// Only setup problems are errors: an output or tracking directory that
/// cannot be created, or a missing or invalid workflow template. The
/// template is only loaded when at least one item needs processing. Item
/// failures are logged and leave the exit status untouched.
pub async fn run_with_backend<B: JobBackend>(
    cli: &Cli,
    base_dir: &Path,
    backend: B,
) -> anyhow::Result<()> {
    let config = cli.batch_config();
    let output_dir = Cli::absolute(base_dir, &cli.output_dir);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut store = if cli.no_resume {
        None
    } else {
        Some(open_store(&output_dir, cli.force_start)?)
    };

    if cli.list_completed {
        println!("{}", completed_listing(store.as_ref()));
        return Ok(());
    }

    let input_dir = Cli::absolute(base_dir, &cli.input_dir);
    let items = discover_items(&input_dir)
        .with_context(|| format!("Failed to list input directory {}", input_dir.display()))?;
    if items.is_empty() {
        tracing::warn!(input_dir = %input_dir.display(), "No images found");
    } else {
        tracing::info!(count = items.len(), input_dir = %input_dir.display(), "Found images");
    }

    let report = if pending_items(&items, store.as_ref(), cli.force).is_empty() {
        tracing::info!("Nothing to process");
        let mut report = RunReport::default();
        if let Some(store) = store.as_mut() {
            store.reconcile(&output_dir);
            report.add_reused(&items, store);
        }
        report
    } else {
        let workflow_path = Cli::absolute(base_dir, &cli.workflow);
        let template = WorkflowTemplate::load(&workflow_path, TemplateBindings::default())
            .with_context(|| format!("Failed to load workflow {}", workflow_path.display()))?;

        let comfy = comfyui_dirs(cli, base_dir);
        tracing::info!(
            input = %comfy.input.display(),
            output = %comfy.output.display(),
            "ComfyUI folders",
        );

        let pipeline = ItemPipeline::new(
            backend,
            template,
            ImageStager::new(comfy.input, config.max_image_dimension),
            Harvester::new(comfy.output, &output_dir),
            PollConfig::from(&config),
        );
        let coordinator = BatchCoordinator::new(pipeline, &output_dir);
        coordinator.run(&items, store.as_mut(), cli.force).await
    };

    for line in report_lines(&report) {
        println!("{line}");
    }
    if !report.is_empty() {
        if let Some(store) = &store {
            println!("Final progress: {}", store.summary());
            store.finalize(config.keep_checkpoint);
        }
    }
    Ok(())
}

fn open_store(output_dir: &Path, fresh_start: bool) -> anyhow::Result<CheckpointStore> {
    let tracking_dir = output_dir.join(TRACKING_DIR_NAME);
    let store = CheckpointStore::open(&tracking_dir, CHECKPOINT_NAME, fresh_start)
        .with_context(|| format!("Failed to create tracking directory {}", tracking_dir.display()))?;

    tracing::info!(checkpoint_dir = %tracking_dir.display(), "Resumable mode enabled");
    if store.exists_on_disk() {
        tracing::info!(path = %store.path().display(), "Found checkpoint");
        tracing::info!("{}", store.summary());
    } else {
        tracing::info!("No checkpoint found, starting fresh");
    }
    Ok(store)
}

/// ComfyUI input and output folders, honouring explicit overrides.
pub fn comfyui_dirs(cli: &Cli, base_dir: &Path) -> ComfyUIDirs {
    let root = resolve_comfyui_dir(base_dir, cli.comfyui_dir.as_deref());
    let defaults = ComfyUIDirs::under(&root);
    let pick = |explicit: &Option<PathBuf>, fallback: PathBuf| {
        explicit
            .as_deref()
            .map(|p| Cli::absolute(base_dir, p))
            .unwrap_or(fallback)
    };
    ComfyUIDirs {
        input: pick(&cli.comfyui_input_dir, defaults.input),
        output: pick(&cli.comfyui_output_dir, defaults.output),
    }
}

/// Output of `--list-completed`.
pub fn completed_listing(store: Option<&CheckpointStore>) -> String {
    let mut ids: Vec<&str> = store
        .map(|s| s.completed().iter().map(String::as_str).collect())
        .unwrap_or_default();
    if ids.is_empty() {
        return "No completed meshes in checkpoint.".to_string();
    }
    ids.sort_unstable();
    format!("Completed: {}", ids.join(", "))
}

/// Final summary printed after a run.
pub fn report_lines(report: &RunReport) -> Vec<String> {
    if report.is_empty() {
        return vec!["No meshes generated.".to_string()];
    }
    let mut lines = vec![String::new(), report.summary()];
    lines.extend(
        report
            .results
            .iter()
            .map(|(id, path)| format!("  {id}: {}", path.display())),
    );
    lines
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use clap::Parser;

    use super::*;

    #[test]
    fn listing_without_store() {
        assert_eq!(completed_listing(None), "No completed meshes in checkpoint.");
    }

    #[test]
    fn listing_is_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = CheckpointStore::open(tmp.path(), CHECKPOINT_NAME, false).unwrap();
        for id in ["zebra", "apple", "mango"] {
            let path = tmp.path().join(format!("{id}.glb"));
            std::fs::write(&path, b"glb").unwrap();
            store.record_success(id, &path);
        }
        assert_eq!(completed_listing(Some(&store)), "Completed: apple, mango, zebra");
    }

    #[test]
    fn empty_report() {
        assert_eq!(report_lines(&RunReport::default()), vec!["No meshes generated."]);
    }

    #[test]
    fn report_lists_results() {
        let report = RunReport {
            results: BTreeMap::from([
                ("a".to_string(), PathBuf::from("/out/a.glb")),
                ("b".to_string(), PathBuf::from("/out/b.glb")),
            ]),
            generated: vec!["a".to_string()],
            reused: vec!["b".to_string()],
            failed: vec![],
        };
        let lines = report_lines(&report);
        assert_eq!(lines[1], "2 meshes ready (1 generated, 1 already completed, 0 failed)");
        assert_eq!(lines[2], "  a: /out/a.glb");
        assert_eq!(lines[3], "  b: /out/b.glb");
    }

    #[test]
    fn explicit_comfyui_dirs_win() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "meshgen",
            "--comfyui-input-dir",
            "stage",
            "--comfyui-output-dir",
            "/abs/out",
        ])
        .unwrap();
        let dirs = comfyui_dirs(&cli, tmp.path());
        assert_eq!(dirs.input, tmp.path().join("stage"));
        assert_eq!(dirs.output, PathBuf::from("/abs/out"));
    }
}
