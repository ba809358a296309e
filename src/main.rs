use std::io::{Read, Write};
use std::path::PathBuf;

use clap::Parser;
use dot_selector_query::node::Node;
use dot_selector_query::{Evaluator, FormatOptions, JsonFormat, Reader, Writer};
use tracing::level_filters::LevelFilter;

/// Query or modify a JSON document with a dot-separated selector.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Selector, e.g. `users.filter(equal(age,30)).name`
    selector: String,
    /// Input file; stdin when omitted
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Write this value (JSON, or a plain string) at every match and print the document
    #[arg(long, conflicts_with = "delete")]
    put: Option<String>,
    /// Delete every match and print the document
    #[arg(long)]
    delete: bool,
    /// Single-line output
    #[arg(long)]
    compact: bool,
    /// Spaces per indent level in pretty output
    #[arg(long, default_value_t = 2)]
    indent: usize,
    /// More logging on stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    // Read input.
    let input = match &args.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).map(|_| buf)
        }
    };
    let input = match input {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Cannot read input: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&args, &input) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args, input: &[u8]) -> dot_selector_query::errors::Result<()> {
    let format = JsonFormat::new(FormatOptions {
        pretty: !args.compact,
        indent: args.indent,
    });
    let root = format.read(input)?;
    let evaluator = Evaluator::default();

    let outputs = if let Some(raw) = &args.put {
        let new = serde_json::from_str::<Node>(raw).unwrap_or_else(|_| Node::from(raw.as_str()));
        let count = evaluator.modify(&root, &args.selector, new)?;
        tracing::info!(count, "updated");
        vec![root]
    } else if args.delete {
        evaluator.delete(&root, &args.selector)?;
        vec![root]
    } else {
        let (values, count) = evaluator.select(&root, &args.selector)?;
        tracing::info!(count, "matched");
        values
    };

    let mut stdout = std::io::stdout().lock();
    for value in &outputs {
        let bytes = format.write(value)?;
        if let Err(e) = stdout.write_all(&bytes) {
            tracing::error!(error = %e, "cannot write output");
            break;
        }
    }
    Ok(())
}
