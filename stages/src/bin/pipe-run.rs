//! CLI tool to run text pipelines from a `.pipe` file or an inline expression.

use clap::Parser;
use lazypipe_stages::logging::init_logger;
use lazypipe_stages::run_pipeline;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;

/// Run a text pipeline and write its output lines.
#[derive(Parser)]
#[command(name = "pipe-run")]
struct Cli {
    /// Pipeline definition file (.pipe)
    #[arg(required_unless_present = "expr", conflicts_with = "expr")]
    pipeline: Option<String>,

    /// Inline pipeline, e.g. `ECHO "hi" | SED /i/ /o/`
    #[arg(short, long)]
    expr: Option<String>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Show the pipeline, stage activity and line counts on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let (origin, pipeline_text) = match (&cli.pipeline, &cli.expr) {
        (_, Some(expr)) => ("(inline)".to_string(), expr.clone()),
        (Some(path), None) => match fs::read_to_string(path) {
            Ok(content) => (path.clone(), content),
            Err(e) => {
                eprintln!("Error reading pipeline file '{path}': {e}");
                process::exit(1);
            }
        },
        (None, None) => {
            eprintln!("No pipeline given");
            process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!("Pipeline: {origin}");
        eprintln!("Output:   {}", cli.output.as_deref().unwrap_or("(stdout)"));
    }

    let mut out: Box<dyn Write> = match &cli.output {
        Some(out_path) => {
            if let Some(parent) = Path::new(out_path.as_str()).parent()
                && !parent.as_os_str().is_empty()
                && fs::create_dir_all(parent).is_err()
            {
                eprintln!("Error creating output directory for '{out_path}'");
                process::exit(1);
            }
            match File::create(out_path) {
                Ok(file) => Box::new(BufWriter::new(file)),
                Err(e) => {
                    eprintln!("Error writing output file '{out_path}': {e}");
                    process::exit(1);
                }
            }
        }
        None => Box::new(io::stdout().lock()),
    };

    match run_pipeline(&pipeline_text, &mut out) {
        Ok((count, name)) => {
            if cli.verbose {
                eprintln!("Stages:   {name}");
                eprintln!("Lines:    {count} out");
            }
        }
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
    }
}
