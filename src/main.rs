use clap::Parser;
use findmy_scanner::app::{Options, RealScanner, SystemClock, run_with_io};
use log::{LevelFilter, error};
use std::panic::{self, PanicHookInfo};

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

/// Diagnostics go to stderr at info level (debug with `--verbose`);
/// `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();
    init_logging(options.verbose);

    let mut stdout = std::io::stdout().lock();

    match run_with_io(options, &RealScanner, &SystemClock, &mut stdout).await {
        Ok(_) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            error!("{}", why);
            std::process::exit(EXIT_ERROR);
        }
    }
}
