use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ristretto::{DecodeOptions, PoolSlotPolicy, Program, TextPolicy};

#[derive(Parser)]
#[command(name = "ristretto")]
#[command(about = "Decode a JVM class file and run its main method")]
#[command(version)]
struct Cli {
    /// Input .class file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Print the decoded class file before running it
    #[arg(long)]
    dump: bool,

    /// Exit with an error if the run raised any diagnostic
    #[arg(long)]
    strict: bool,

    /// Give Long and Double constants a single pool slot
    #[arg(long)]
    single_slot_wide_constants: bool,

    /// Replace invalid text in Utf8 constants instead of failing
    #[arg(long)]
    lossy_text: bool,

    /// Log decoding (-v) or every instruction (-vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn decode_options(&self) -> DecodeOptions {
        let mut options = DecodeOptions::default();
        if self.single_slot_wide_constants {
            options = options.with_pool_slots(PoolSlotPolicy::Single);
        }
        if self.lossy_text {
            options = options.with_text(TextPolicy::Lossy);
        }
        options
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // 1. Read and decode the class file, locating `main`.
    let program = Program::load_with(&cli.input, &cli.decode_options())
        .with_context(|| format!("failed to load {}", cli.input.display()))?;
    if cli.dump {
        print!("{}", program.class_file());
    }

    // 2. Interpret `main`, output to stdout and diagnostics to stderr.
    let stdout = io::stdout();
    let stderr = io::stderr();
    let execution = program.run(&mut stdout.lock(), &mut stderr.lock())?;
    io::stdout().flush()?;

    if cli.strict && !execution.diagnostics.is_empty() {
        bail!(
            "{} diagnostics raised while running {}",
            execution.diagnostics.len(),
            cli.input.display()
        );
    }
    Ok(())
}
