//! Streamcrawl - Binary Entry Point
//!
//! `streamcrawl <CONFIG> <OUTPUT>` crawls the configured stream into OUTPUT
//! while reading operator commands from stdin.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::Parser;
use log::{error, info, warn};

use streamcrawl::{
    control, CommandInterpreter, CrawlConfig, GzipSinkFactory, SinkError, SinkFactory,
    StreamWriter, TcpSource,
};

#[derive(Parser, Debug)]
#[command(name = "streamcrawl")]
#[command(version)]
#[command(about = "Crawl a tag-filtered event stream into a gzip-compressed JSON lines file", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Output file; must not exist yet
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
}

fn main() -> ExitCode {
    // Usage errors exit with status 2
    let args = Args::parse();
    init_logging();

    // A path collision is reported ahead of any config problem
    if args.output.exists() {
        eprintln!("Error: output file {} already exists", args.output.display());
        return ExitCode::from(1);
    }

    let config = match CrawlConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let mut sinks = GzipSinkFactory::new(config.output.compression_level);
    let sink = match sinks.create_new(&args.output) {
        Ok(sink) => sink,
        Err(SinkError::AlreadyExists(path)) => {
            eprintln!("Error: output file {} already exists", path.display());
            return ExitCode::from(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let (handle, inbox) = control::channel(config.tag_set(), args.output.clone());
    let source = TcpSource::new(&config.source, config.credentials());
    info!(
        "{} {} streaming from {} into {}",
        streamcrawl::NAME,
        streamcrawl::VERSION,
        source.address(),
        args.output.display()
    );

    let writer = StreamWriter::new(Box::new(source), Box::new(sinks), sink, inbox)
        .with_retry(config.retry.clone());
    let stats = writer.stats();
    let status = writer.status();
    let writer = match writer.spawn() {
        Ok(writer) => writer,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let stopper = handle.stopper();
    let interrupt = stopper.clone();
    if let Err(e) = ctrlc::set_handler(move || interrupt.request_stop()) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    // The command thread is left blocked on stdin once the writer ends
    let console = thread::Builder::new()
        .name("command".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            let mut interpreter =
                CommandInterpreter::new(stdin.lock(), io::stdout(), handle, stats, status);
            if let Err(e) = interpreter.run() {
                warn!("Operator console failed: {}", e);
            }
        });
    if let Err(e) = console {
        // The signal handler keeps the channel open, so dropping the handle is not a stop
        error!("Failed to start operator console: {}", e);
        stopper.request_stop();
    }

    match writer.join() {
        Ok(summary) => {
            println!(
                "Wrote {} events to {} ({} rotations)",
                summary.events,
                summary.output.display(),
                summary.rotations
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Fatal: {}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .format_module_path(false)
        .init();
}
