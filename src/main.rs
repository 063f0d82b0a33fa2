use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use asozd_parser::pipeline::audit::{audit_output_dir, DEFAULT_MAX_LIST_ITEMS};
use asozd_parser::pipeline::{collect_inputs, init_default_config, run_batch, BatchOptions, ParserConfig};

#[derive(Parser, Debug)]
#[command(name = "asozd-parser")]
#[command(about = "Convert structured profile .docx files into json", long_about = None)]
struct Args {
    /// File (*.docx) or directory to parse; only *.docx files are parsed
    #[arg(value_name = "PATH")]
    input: Option<PathBuf>,

    /// Destination directory
    #[arg(short = 'd', long = "destination", value_name = "DIR", default_value = "out")]
    destination: PathBuf,

    /// Destination file name (without extension) when PATH is a file
    #[arg(short = 'j', long = "json-name", value_name = "NAME")]
    json_name: Option<String>,

    /// Increase output verbosity
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (default: search for asozd-parser.toml upwards)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Documents parsed in parallel (default: one per CPU)
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,

    /// Write the default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file to (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Check saved profiles in the destination directory instead of parsing
    #[arg(long)]
    audit: bool,

    /// List field inspected by --audit
    #[arg(long, value_name = "FIELD", default_value = "lobby")]
    audit_field: String,

    /// Largest acceptable number of items in the audited list field
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_LIST_ITEMS)]
    audit_max_items: usize,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.init_config {
        let dir = match args.init_config_dir {
            Some(d) => d,
            None => std::env::current_dir().context("current dir")?,
        };
        let cfg_path = init_default_config(&dir, args.force)?;
        println!("{}", cfg_path.display());
        return Ok(());
    }

    let config = ParserConfig::load(args.config).context("load parser config")?;

    if args.audit {
        let findings = audit_output_dir(
            &args.destination,
            &config.images_dir,
            &args.audit_field,
            args.audit_max_items,
        )?;
        for finding in &findings {
            println!("{finding}");
        }
        return Ok(());
    }

    let input = match args.input {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            return Ok(());
        }
    };

    let json_name = if input.is_file() { args.json_name } else { None };
    let inputs = collect_inputs(&input)?;
    let opts = BatchOptions {
        out_dir: args.destination,
        json_name,
        jobs: args.jobs,
    };
    let summary = run_batch(&inputs, &config, &opts)?;
    tracing::info!(
        "done: {} parsed, {} failed, {} skipped, {} superseded",
        summary.succeeded,
        summary.failed,
        summary.skipped,
        summary.superseded
    );
    Ok(())
}
