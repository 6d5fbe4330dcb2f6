use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use docjson::document::io::read_json;
use docjson::document::generate_outline;
use docjson::{
    ArtifactLayout, Config, DocumentDocJson, InspectFormat, SanitizedDocument, Stage,
    convert_document, convert_document_as, parse_and_sanitize, run_layout,
};

#[derive(Parser)]
#[command(name = "docjson")]
#[command(version)]
#[command(about = "Rebuild the structure of .docx files as DocJSON", long_about = None)]
struct Cli {
    /// Configuration file (default: <config_dir>/docjson/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one document
    Convert {
        /// Input .docx file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output base directory
        #[arg(short, long, value_name = "DIR", default_value = "output")]
        output: PathBuf,

        /// Stop after sanitizing, or run every stage
        #[arg(long, value_enum, default_value = "full")]
        stage: Stage,
    },

    /// Re-run analysis and assembly from a sanitized record
    Layout {
        /// A `<name>_sanitized.json` file
        #[arg(value_name = "FILE")]
        sanitized: PathBuf,

        /// Output base directory (default: next to the record)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Convert many documents in parallel; failures do not stop the batch
    Batch {
        /// Input .docx files or directories containing them
        #[arg(value_name = "PATH", required = true)]
        inputs: Vec<PathBuf>,

        /// Output base directory
        #[arg(short, long, value_name = "DIR", default_value = "output")]
        output: PathBuf,
    },

    /// Summarize any artifact, or print it as JSON
    Inspect {
        /// A .docjson file or any JSON artifact
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, value_enum, default_value = "summary")]
        format: InspectFormat,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let load_config = || Config::load(cli.config.as_deref());

    match cli.command {
        Commands::Convert {
            input,
            output,
            stage,
        } => match stage {
            Stage::Sanitize => {
                let (layout, sanitized) = parse_and_sanitize(&input, &output)?;
                println!(
                    "Sanitized {} paragraphs, {} tables, {} drawings -> {}",
                    sanitized.paragraphs.len(),
                    sanitized.tables.len(),
                    sanitized.drawings.len(),
                    layout.sanitized().display()
                );
            }
            Stage::Full => {
                let document = convert_document(&input, &output, &load_config()?)?;
                let layout = ArtifactLayout::for_input(&input, &output);
                print_converted(&document, &layout.docjson());
            }
        },
        Commands::Layout { sanitized, output } => {
            let document = run_layout(&sanitized, output.as_deref(), &load_config()?)?;
            let layout = ArtifactLayout::from_sanitized_path(&sanitized, output.as_deref())?;
            print_converted(&document, &layout.docjson());
        }
        Commands::Batch { inputs, output } => batch(inputs, output, load_config()?).await?,
        Commands::Inspect { file, format } => inspect(&file, format)?,
        Commands::InitConfig { force } => init_config(force)?,
    }

    Ok(())
}

fn init_config(force: bool) -> Result<()> {
    if let Some(path) = Config::get_config_path() {
        if path.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
    }
    let path = Config::init_default()?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn print_converted(document: &DocumentDocJson, path: &Path) {
    println!(
        "Wrote {} ({} blocks, {} top-level sections)",
        path.display(),
        document.blocks.len(),
        document.sections.len()
    );
}

/// Expand directories into the .docx files they contain, sorted.
fn collect_inputs(inputs: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(&input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input);
        }
    }
    Ok(files)
}

async fn batch(inputs: Vec<PathBuf>, output: PathBuf, config: Config) -> Result<()> {
    let files = collect_inputs(inputs)?;
    if files.is_empty() {
        bail!("no .docx files to convert");
    }
    info!("converting {} documents", files.len());

    // Same-named inputs would otherwise share artifact paths.
    let layouts = ArtifactLayout::for_batch(&files, &output);
    let handles: Vec<_> = files
        .into_iter()
        .zip(layouts)
        .map(|(path, layout)| {
            let config = config.clone();
            let handle = tokio::task::spawn_blocking({
                let path = path.clone();
                move || convert_document_as(&path, &layout, &config)
            });
            (path, handle)
        })
        .collect();

    let total = handles.len();
    let mut failed = 0;
    for (path, handle) in handles {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join_error) => Err(anyhow::anyhow!("worker panicked: {join_error}")),
        };
        match outcome {
            Ok(document) => println!("ok     {} ({} blocks)", path.display(), document.blocks.len()),
            Err(e) => {
                failed += 1;
                error!("{}: {e:#}", path.display());
                println!("failed {}: {e:#}", path.display());
            }
        }
    }

    println!("Converted {} of {} documents", total - failed, total);
    if failed > 0 {
        bail!("{failed} of {total} documents failed");
    }
    Ok(())
}

fn inspect(path: &Path, format: InspectFormat) -> Result<()> {
    if path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
    {
        bail!(
            "{} is a source document; convert it first and inspect the .docjson",
            path.display()
        );
    }

    let value: serde_json::Value = read_json(path)?;
    match format {
        InspectFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        InspectFormat::Summary => {
            if let Ok(document) = serde_json::from_value::<DocumentDocJson>(value.clone()) {
                print_document_summary(&document);
            } else if let Ok(sanitized) = serde_json::from_value::<SanitizedDocument>(value.clone()) {
                print_sanitized_summary(&sanitized);
            } else {
                print_generic_summary(&value);
            }
        }
    }
    Ok(())
}

fn print_document_summary(document: &DocumentDocJson) {
    println!("DocJSON version {}", document.version);

    let metadata = &document.metadata;
    let fields = [
        ("document_type", &metadata.document_type),
        ("category", &metadata.category),
        ("title", &metadata.title),
        ("doc_number", &metadata.doc_number),
        ("revision", &metadata.revision),
        ("effective_date", &metadata.effective_date),
        ("author", &metadata.author),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            println!("  {name}: {value}");
        }
    }
    if let Some(pages) = metadata.page_count {
        println!("  pages: {pages}");
    }

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for block in &document.blocks {
        *kinds.entry(block.kind()).or_default() += 1;
    }
    println!("Blocks: {}", document.blocks.len());
    for (kind, count) in kinds {
        println!("  {kind}: {count}");
    }

    println!("Outline:");
    for item in generate_outline(document) {
        let indent = "  ".repeat(item.level as usize);
        println!(
            "{indent}{} [{}] ({} blocks)",
            item.title, item.doc_index, item.block_count
        );
    }
}

fn print_sanitized_summary(sanitized: &SanitizedDocument) {
    println!("Sanitized record");
    println!("  paragraphs: {}", sanitized.paragraphs.len());
    println!("  tables: {}", sanitized.tables.len());
    println!("  drawings: {}", sanitized.drawings.len());
    println!("  headers: {}", sanitized.headers.len());
    println!("  footers: {}", sanitized.footers.len());
    println!("  inline images: {}", sanitized.inline_images.len());
    if let Some(pages) = sanitized.page_count {
        println!("  pages: {pages}");
    }
}

fn print_generic_summary(value: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                match value {
                    serde_json::Value::Array(items) => println!("{key}: {} entries", items.len()),
                    serde_json::Value::Object(inner) => println!("{key}: {} fields", inner.len()),
                    other => println!("{key}: {other}"),
                }
            }
        }
        serde_json::Value::Array(items) => println!("{} entries", items.len()),
        other => println!("{other}"),
    }
}
