use clap::Parser;
use log::warn;
use snafu::ErrorCompat;

mod args;
mod survey;

fn main() {
    let parsed = args::Args::parse();

    let filter = if parsed.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let res = survey::run_study(&parsed);
    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
