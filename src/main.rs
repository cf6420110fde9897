use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use photoedit::catalog::{FilterId, chain_for};
use photoedit::config::AppConfig;
use photoedit::controller::{Dispatch, EditController, Operation, notice_for};
use photoedit::crop::RectCrop;
use photoedit::export::JpegSink;
use photoedit::picker::{FilePicker, ImagePicker};
use photoedit::previews::render_previews;
use photoedit::processing::CpuEngine;
use photoedit::script::{ScriptCommand, parse_script};

#[derive(Parser)]
#[command(name = "photoedit")]
#[command(version, about = "Filter-based photo editor", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the preset filters and their stage chains
    Filters {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a thumbnail of an image with every filter
    Previews {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Longest edge of each preview in pixels
        #[arg(short, long, value_name = "N")]
        size: Option<u32>,
    },

    /// Apply an edit script to an image
    Edit {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Script file; read from stdin when omitted
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,

        /// Output directory for saved images
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = AppConfig::load();

    match cli.command {
        Commands::Filters { json } => list_filters(json),
        Commands::Previews { image, out, size } => {
            let out_dir = config.resolve_output_dir(out.as_deref());
            let size = size.unwrap_or_else(|| config.thumbnail_size());
            write_previews(&image, &out_dir, size)
        }
        Commands::Edit { image, script, out } => {
            let text = read_script(script.as_deref())?;
            run_edit(&config, &image, &text, out.as_deref())
        }
    }
}

fn list_filters(json: bool) -> Result<()> {
    if json {
        let catalog: Vec<_> = FilterId::ALL
            .into_iter()
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "label": id.label(),
                    "stages": chain_for(id),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    for id in FilterId::ALL {
        let stages: Vec<&str> = chain_for(id).iter().map(|s| s.name()).collect();
        println!("{:<12} {:<10} {}", id.key(), id.label(), stages.join(" -> "));
    }
    Ok(())
}

fn write_previews(image: &Path, out_dir: &Path, size: u32) -> Result<()> {
    let source = FilePicker::new(image)
        .pick_image()?
        .context("no image selected")?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create_dir_all {}", out_dir.display()))?;

    let stem = image.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let mut failed = 0usize;
    for (id, result) in render_previews(&source, size, &CpuEngine) {
        match result {
            Ok(preview) => {
                let path = out_dir.join(format!("{stem}-{}.png", id.key()));
                preview
                    .save(&path)
                    .with_context(|| format!("write preview {}", path.display()))?;
                println!("{}", path.display());
            }
            Err(err) => {
                failed += 1;
                eprintln!("photoedit: {} preview failed: {err}", id.label());
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} preview(s) failed");
    }
    Ok(())
}

fn read_script(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read script {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("read script from stdin")?;
            Ok(text)
        }
    }
}

fn run_edit(config: &AppConfig, image: &Path, text: &str, out: Option<&Path>) -> Result<()> {
    let commands = parse_script(text).context("invalid edit script")?;
    let source = FilePicker::new(image)
        .pick_image()?
        .context("no image selected")?;

    let sink = JpegSink::new(config.resolve_output_dir(out), config.jpeg_quality());
    tracing::debug!(output_dir = %sink.output_dir().display(), "edit session starting");
    let mut controller = EditController::new(
        Arc::new(CpuEngine),
        Arc::new(sink),
        config.history_limit(),
    );

    let dispatch = controller.load_image(source);
    settle(&mut controller, Operation::Load, dispatch);

    for (line, command) in commands {
        tracing::debug!(line, ?command, "running script command");
        let (operation, dispatch) = match command {
            ScriptCommand::Filter(id) => {
                (Operation::SelectFilter(id), controller.select_filter(id))
            }
            ScriptCommand::Brightness(p) => (Operation::Brightness, controller.set_brightness(p)),
            ScriptCommand::Contrast(p) => (Operation::Contrast, controller.set_contrast(p)),
            ScriptCommand::Saturation(p) => (Operation::Saturation, controller.set_saturation(p)),
            ScriptCommand::Rotate(degrees) => (Operation::Rotate, controller.rotate(degrees)),
            ScriptCommand::Flip(axis) => (Operation::Flip(axis), controller.flip(axis)),
            ScriptCommand::Crop(rect) => (
                Operation::Crop,
                controller.crop_with(&mut RectCrop::new(rect)),
            ),
            ScriptCommand::Save => (Operation::Save, controller.save()),
            ScriptCommand::Undo => {
                if controller.undo().is_none() {
                    tracing::debug!(line, "nothing to undo");
                }
                continue;
            }
            ScriptCommand::Redo => {
                if controller.redo().is_none() {
                    tracing::debug!(line, "nothing to redo");
                }
                continue;
            }
        };
        settle(&mut controller, operation, dispatch);
    }

    let history = controller.history();
    tracing::info!(
        snapshots = history.len(),
        position = ?history.position(),
        filter = %controller.session().selected_filter(),
        "edit session finished"
    );
    Ok(())
}

/// Waits for a dispatched operation and prints its notice, if any.
fn settle(controller: &mut EditController, operation: Operation, dispatch: Dispatch) {
    match dispatch {
        Ok(Some(_)) => {
            if let Some(notice) = controller.wait().and_then(|done| done.notice()) {
                println!("{notice}");
            }
        }
        Ok(None) => {}
        Err(err) => {
            tracing::debug!(error = %err, "operation rejected");
            println!("{}", notice_for(operation, &err));
        }
    }
}
