//! Command-line front end.
//!
//! Fetches the given pages, filters every stylesheet they use, writes
//! each linked sheet's minimized and original text side by side into
//! the output directory, and prints inline-block diffs to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;

use cullcss::{Processor, ProcessorOptions, Renderer, Report, UrlMode};

#[derive(Parser, Debug)]
#[command(name = "cullcss", version, about = "Remove CSS rules the given pages never use")]
struct Cli {
    /// Page URLs to process (http://, https://, or file://).
    #[arg(required = true)]
    urls: Vec<String>,

    /// Directory where filtered stylesheets are written.
    #[arg(short, long)]
    output: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a headless renderer executable; when set, page HTML is
    /// taken from its stdout instead of a plain fetch.
    #[arg(long)]
    renderer: Option<PathBuf>,

    /// Extra argument passed through to the renderer (repeatable),
    /// e.g. --renderer-arg=--cookies-file=jar.txt
    #[arg(long = "renderer-arg")]
    renderer_args: Vec<String>,

    /// Rewrite every url(...) reference to absolute form, including
    /// references to other hosts.
    #[arg(long)]
    all_absolute_urls: bool,

    /// Overall processing budget in seconds.
    #[arg(long)]
    timeout: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let renderer = match &cli.renderer {
        Some(path) => Some(Renderer::new(path, cli.renderer_args.clone())?),
        None => None,
    };
    let options = ProcessorOptions {
        url_mode: if cli.all_absolute_urls {
            UrlMode::AbsoluteAll
        } else {
            UrlMode::PreserveRemote
        },
        renderer,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let processor = Processor::new(options);
    let started = Instant::now();
    let report = runtime.block_on(async {
        let work = processor.process(&cli.urls);
        match cli.timeout {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), work)
                .await
                .map_err(|_| format!("processing exceeded {secs}s budget")),
            None => Ok(work.await),
        }
    })?;
    eprintln!("TOTAL TIME {:.3}s", started.elapsed().as_secs_f64());

    emit(&report, &cli.output)?;

    if report.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        for failure in &report.failures {
            eprintln!("failed: {} ({})", failure.url, failure.error);
        }
        Ok(ExitCode::FAILURE)
    }
}

fn emit(report: &Report, output: &PathBuf) -> std::io::Result<()> {
    for inline in &report.inlines {
        eprintln!("ON {} line {}", inline.page_url, inline.line);
        eprintln!("{:-<79}", "BEFORE ");
        eprintln!("{}", inline.before);
        eprintln!("{:-<79}", "AFTER ");
        eprintln!("{}", inline.after);
        eprintln!();
    }

    if !report.links.is_empty() {
        std::fs::create_dir_all(output)?;
    }
    for link in &report.links {
        let name = sheet_file_name(&link.href);
        std::fs::write(output.join(&name), &link.after)?;
        std::fs::write(output.join(format!("before_{name}")), &link.before)?;
        eprintln!(
            "{}: {} -> {} bytes (saved {})",
            link.href,
            link.before.len(),
            link.after.len(),
            link.before.len() as i64 - link.after.len() as i64
        );
    }

    Ok(())
}

/// Output file name for a link result: the href's last path segment,
/// query and fragment stripped.
fn sheet_file_name(href: &str) -> String {
    let trimmed = href
        .split(['?', '#'])
        .next()
        .unwrap_or(href)
        .trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if name.is_empty() {
        "stylesheet.css".to_string()
    } else {
        name.to_string()
    }
}
