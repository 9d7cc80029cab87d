use std::path::PathBuf;

use clap::Parser as ClapParser;

use klox::driver::Driver;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to execute; starts the REPL when omitted
    scripts: Vec<PathBuf>,

    /// Parse only and print the syntax tree instead of evaluating
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    if args.scripts.len() > 1 {
        println!("Usage: klox [script]");
        std::process::exit(64);
    }

    let mut driver = Driver::new(args.debug, false);

    match args.scripts.first() {
        Some(path) => {
            let code = driver.run_file(path)?;

            if code != 0 {
                std::process::exit(code);
            }
        }

        None => driver.run_prompt()?,
    }

    Ok(())
}
