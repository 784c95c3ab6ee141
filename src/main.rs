use clap::Parser;

mod config;
mod datasink;
mod error;
mod interrupt;
mod listener;
#[cfg(test)]
mod mocklistener;
mod receiver;
mod time;

use config::{Config, Rotation, DEFAULT_RECEIVE_TIMEOUT_MS};
use datasink::OutputSink;
use error::AggregatorError;
use interrupt::ShutdownController;
use listener::ZmqSubscriber;
use receiver::ReceiveLoop;

/// Receive logs from multiple sources on a ZeroMQ socket and write them into a common, optionally
/// rotated file
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// ZeroMQ endpoint to listen on (example: tcp://*:4000)
    #[arg(long)]
    listen: String,

    /// Full path to the file where the output should be written, `-` for stdout
    #[arg(long, default_value = config::STDOUT_SENTINEL)]
    output_file: String,

    /// Rotate the output file at the top of the day or hour [default: do not rotate]
    #[arg(long, value_enum)]
    rotate: Option<Rotation>,

    /// How long a receive may wait before the shutdown flag is checked again, in milliseconds
    #[arg(long, default_value_t = DEFAULT_RECEIVE_TIMEOUT_MS)]
    receive_timeout_ms: u64,

    /// Log debug information
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .env()
        .init()
    {
        eprintln!("Could not install logger: {e}");
    }

    // Everything aggregate() owns has been dropped, and the output closed, by the time we get here.
    if let Err(e) = aggregate(&cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn aggregate(cli: &Cli) -> Result<(), AggregatorError> {
    let config = Config::new(
        &cli.listen,
        &cli.output_file,
        cli.rotate,
        cli.receive_timeout_ms,
    )?;
    log::debug!("{config:?}");

    let sink = OutputSink::new(&config, time::now_local())?;
    let subscriber = ZmqSubscriber::bind(&config.listen)?;

    let shutdown = ShutdownController::new();
    let signals = shutdown.install()?;

    let result = ReceiveLoop::new(
        subscriber,
        sink,
        shutdown,
        time::Clock::System,
        config.receive_timeout,
    )
    .run();
    signals.close();
    result
}
