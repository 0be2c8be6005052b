use anyhow::Result;
use clap::Parser;
use asesim::args::Args;
use asesim::runner::Runner;

fn main() -> Result<()> {
    let args = Args::parse();
    let mut runner = Runner::new(args)?;
    runner.start()
}
