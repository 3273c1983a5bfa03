use clap::Parser;
use training::util::{run_classify, ClassifyArgs};

fn main() -> anyhow::Result<()> {
    cli_support::init_logging();
    let args = ClassifyArgs::parse();
    let output = run_classify(args)?;
    println!("Saved class map to {}", output.display());
    Ok(())
}
