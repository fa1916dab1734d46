use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use mediashift::{
    Backend, Engine, EngineConfig, MetadataDocument, ParamChange, ParameterSet, apply_all,
    compression_ratio, ensure_parent_dir, format_bytes, mime_from_extension,
};

#[derive(Parser, Debug)]
#[command(name = "mediashift", version, about = "Resize, trim, and re-encode media files")]
struct Cli {
    /// Engine config JSON (binary paths, streaming pacing).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the initial parameters and metadata of a source as JSON.
    Probe(SourceArgs),
    /// Print the estimated output size.
    Estimate(EditArgs),
    /// Print the compiled job as JSON.
    Plan(PlanArgs),
    /// Transform a source and write the result.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Input media file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Declared MIME type; guessed from the extension when absent.
    #[arg(long)]
    mime: Option<String>,
}

#[derive(Args, Debug)]
struct EditArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// JSON array of `{"field": ..., "value": ...}` changes, applied in order.
    #[arg(long)]
    changes: Option<PathBuf>,

    /// `field=value` change, applied after `--changes`. Repeatable.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    sets: Vec<String>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    edit: EditArgs,

    /// Compile for the real-time re-encoding backend (video only).
    #[arg(long, default_value_t = false)]
    streaming: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    plan: PlanArgs,

    /// Output path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediashift=debug".to_string()
        } else {
            "mediashift=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let mut engine = Engine::with_ffmpeg(&cfg);

    match cli.cmd {
        Command::Probe(args) => cmd_probe(&engine, &args),
        Command::Estimate(args) => cmd_estimate(&engine, &args),
        Command::Plan(args) => cmd_plan(&engine, &args),
        Command::Run(args) => cmd_run(&mut engine, &cfg, &args),
    }
}

fn load(engine: &Engine, args: &SourceArgs) -> anyhow::Result<(ParameterSet, String)> {
    let mime = match &args.mime {
        Some(m) => m.clone(),
        None => mime_from_extension(&args.in_path)
            .with_context(|| {
                format!(
                    "cannot guess the MIME type of '{}'; pass --mime",
                    args.in_path.display()
                )
            })?
            .to_string(),
    };
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read input '{}'", args.in_path.display()))?;
    let set = engine.load_source(bytes, &mime)?;
    Ok((set, mime))
}

fn edited(engine: &Engine, args: &EditArgs) -> anyhow::Result<ParameterSet> {
    let (set, _) = load(engine, &args.source)?;

    let mut changes: Vec<ParamChange> = match &args.changes {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read changes '{}'", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parse changes '{}'", path.display()))?
        }
        None => Vec::new(),
    };
    for s in &args.sets {
        changes.push(ParamChange::parse_assignment(s)?);
    }

    Ok(apply_all(&set, &changes)?)
}

fn backend(streaming: bool) -> Backend {
    if streaming {
        Backend::Streaming
    } else {
        Backend::Batch
    }
}

fn cmd_probe(engine: &Engine, args: &SourceArgs) -> anyhow::Result<()> {
    let (set, mime) = load(engine, args)?;
    let doc = MetadataDocument::for_file(&args.in_path, mime)?;
    let out = serde_json::json!({
        "parameters": set,
        "metadata": doc,
        "estimated_bytes": engine.estimate_size(&set),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_estimate(engine: &Engine, args: &EditArgs) -> anyhow::Result<()> {
    let set = edited(engine, args)?;
    let bytes = engine.estimate_size(&set);
    println!("{} ({bytes} bytes)", format_bytes(bytes));
    Ok(())
}

fn cmd_plan(engine: &Engine, args: &PlanArgs) -> anyhow::Result<()> {
    let set = edited(engine, &args.edit)?;
    let job = engine.confirm(&set, backend(args.streaming))?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}

fn cmd_run(engine: &mut Engine, cfg: &EngineConfig, args: &RunArgs) -> anyhow::Result<()> {
    if !cfg.overwrite && args.out.exists() {
        anyhow::bail!("output file '{}' already exists", args.out.display());
    }

    let set = edited(engine, &args.plan.edit)?;
    let estimate = engine.estimate_size(&set);
    let job = engine.confirm(&set, backend(args.plan.streaming))?;
    let artifact = engine.execute(&job)?;

    ensure_parent_dir(&args.out)?;
    std::fs::write(&args.out, artifact.bytes())
        .with_context(|| format!("write output '{}'", args.out.display()))?;

    let original = set.source_stats().byte_size;
    eprintln!(
        "wrote {} ({}, {}; estimated {}, {:.1}% smaller than {})",
        args.out.display(),
        format_bytes(artifact.byte_size()),
        artifact.mime(),
        format_bytes(estimate),
        compression_ratio(original, artifact.byte_size()),
        format_bytes(original),
    );
    Ok(())
}
