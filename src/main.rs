//! # Vitrine CLI
//!
//! Command-line front-end for the composition engine.
//!
//! ## Usage
//!
//! ```bash
//! # List templates
//! vitrine templates
//!
//! # Run the HTTP server
//! vitrine serve --listen 0.0.0.0:8080 --data ./data
//!
//! # Render a saved snapshot to an image
//! vitrine render --template product-showcase --snapshot doc.json --output out.jpg
//!
//! # Build a workbook from a JSON description
//! vitrine export-sheet --spec catalog.json --output catalog.xlsx
//! ```
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vitrine::{
    VitrineError,
    config::{EngineConfig, ImageFormat},
    export::{CancelToken, ExportOutcome, raster, sheet::{SheetExporter, WorkbookSpec}},
    render::{Composer, RenderMode},
    server::{self, ServerConfig},
    snapshot::load_document,
    store::HttpImageStore,
    template::{BuiltinTemplates, TemplateDefinition, TemplateRegistry},
};

/// Vitrine - template composition and export
#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Data directory for uploads and snapshots
        #[arg(long, default_value = "data")]
        data: PathBuf,

        /// Public origin used in uploaded image URLs
        #[arg(long)]
        public_base: Option<String>,
    },

    /// Render a document to an image file
    Render {
        /// Template id
        #[arg(long, default_value = "product-showcase")]
        template: String,

        /// Snapshot JSON to load (omit for template defaults)
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,

        /// Output file; the extension picks JPEG or PNG
        #[arg(long, short, value_name = "FILE")]
        output: PathBuf,

        /// Directory holding uploaded images
        #[arg(long, default_value = "data/images")]
        images: PathBuf,
    },

    /// Build an XLSX workbook from a JSON description
    ExportSheet {
        /// Workbook description (JSON)
        #[arg(long, value_name = "FILE")]
        spec: PathBuf,

        /// Output file
        #[arg(long, short, value_name = "FILE")]
        output: PathBuf,
    },

    /// List available templates
    Templates,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), VitrineError> {
    let cli = Cli::parse();
    let engine = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Templates => {
            let templates = BuiltinTemplates::new();
            println!("Available templates:");
            for id in templates.ids() {
                if let Some(t) = templates.get(id) {
                    println!("  {:<20} {}", t.id, t.name);
                }
            }
            Ok(())
        }

        Commands::Serve {
            listen,
            data,
            public_base,
        } => {
            let public_base = public_base.unwrap_or_else(|| format!("http://{}", listen));
            let config = ServerConfig {
                listen_addr: listen,
                upload_dir: data.join("images"),
                snapshot_dir: data.join("documents"),
                public_base,
                engine,
            };
            runtime()?.block_on(server::serve(config))
        }

        Commands::Render {
            template,
            snapshot,
            output,
            images,
        } => runtime()?.block_on(render(engine, &template, snapshot.as_deref(), &output, images)),

        Commands::ExportSheet { spec, output } => {
            let text = std::fs::read_to_string(&spec)?;
            let spec: WorkbookSpec = serde_json::from_str(&text)?;
            let store = HttpImageStore::new(&engine.fetch, "data/images", "")?;
            let exporter = SheetExporter::new(engine.sheet);
            let outcome = runtime()?.block_on(exporter.export(&spec, &store, &CancelToken::new()))?;
            write_outcome(outcome, &output)
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, VitrineError> {
    Ok(tokio::runtime::Runtime::new()?)
}

async fn render(
    mut engine: EngineConfig,
    template_id: &str,
    snapshot: Option<&Path>,
    output: &Path,
    images: PathBuf,
) -> Result<(), VitrineError> {
    let templates = BuiltinTemplates::new();
    if snapshot.is_none() && templates.get(template_id).is_none() {
        return Err(VitrineError::UnknownTemplate(template_id.to_string()));
    }
    let text = match snapshot {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => None,
    };
    let doc = load_document(text.as_deref(), template_id, &templates);
    let template = templates
        .get(&doc.template_id)
        .cloned()
        .unwrap_or_else(|| TemplateDefinition::empty(&doc.template_id));

    match output.extension().and_then(|e| e.to_str()) {
        Some("png") => engine.raster.format = ImageFormat::Png,
        Some("jpg" | "jpeg") => engine.raster.format = ImageFormat::Jpeg,
        _ => {}
    }

    let store = HttpImageStore::new(&engine.fetch, images, "")?;
    let tree = Composer::new(&template).render(&doc, &RenderMode::Frozen);
    let exporter = std::sync::Arc::new(raster::RasterExporter::new(engine.raster));
    let outcome =
        raster::export_tree(exporter, tree, &store, &CancelToken::new(), &doc.template_id).await?;
    write_outcome(outcome, output)
}

fn write_outcome(outcome: ExportOutcome, output: &Path) -> Result<(), VitrineError> {
    match outcome {
        ExportOutcome::Completed(artifact) => {
            std::fs::write(output, &artifact.bytes)?;
            info!(
                output = %output.display(),
                bytes = artifact.bytes.len(),
                "Wrote {}",
                artifact.filename
            );
            Ok(())
        }
        ExportOutcome::Cancelled => Ok(()),
    }
}
