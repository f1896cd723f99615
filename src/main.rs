use anyhow::Result;
use bender::cli;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        // logging may not be initialized yet, so report directly
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
