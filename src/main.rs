//Enable more cargo lint tests
#![warn(rust_2018_idioms)]
#![warn(clippy::disallowed_types)]

use huffarc::{
    compression::{
        compress::{compress, CompressOptions, Outcome},
        decompress::decompress,
    },
    error::Result,
    tools::{
        cli::{arcopts_init, ArcOpts, Mode, Verbosity},
        progress::{ConsoleProgress, Progress},
        prompt::{ConsolePrompt, Interaction, Unattended},
    },
};

use log::{error, info, LevelFilter};
use simplelog::{Config, TermLogger, TerminalMode};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() {
    // Available log levels are Error, Warn, Info, Debug, Trace
    if TermLogger::init(
        LevelFilter::Trace,
        Config::default(),
        TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("Could not start the terminal logger, continuing without it.");
    }

    let options = arcopts_init();

    //----- Figure how what we need to do and go do it
    let result = match options.op_mode {
        Mode::Zip => zip(&options),
        Mode::Unzip => unzip(&options),
    };

    if let Err(err) = result {
        error!("{}", err);
        if options.verbose == Verbosity::Quiet {
            eprintln!("{}", err);
        }
        std::process::exit(err.exit_code());
    }
    info!("Done.");
}

fn zip(opts: &ArcOpts) -> Result<()> {
    let output = opts.archive_path();
    let settings = CompressOptions {
        layout: opts.layout,
        strategy: opts.strategy,
        force: opts.force_overwrite,
    };
    let mut interaction: Box<dyn Interaction> = if opts.unattended {
        Box::new(Unattended {
            password: opts.password.clone(),
        })
    } else {
        Box::new(ConsolePrompt::stdio().with_password(opts.password.clone()))
    };
    let progress = if opts.verbose == Verbosity::Quiet {
        ConsoleProgress::hidden()
    } else {
        ConsoleProgress::new()
    };

    match compress(
        &opts.paths,
        &output,
        &settings,
        interaction.as_mut(),
        &progress as &dyn Progress,
    )? {
        Outcome::Written(summary) => {
            if opts.verbose != Verbosity::Quiet {
                println!(
                    "Created compressed file: {} ({} -> {} bytes, {} symbols, {} files)",
                    summary.output.display(),
                    summary.original_size,
                    summary.compressed_size,
                    summary.letter_count,
                    summary.files
                );
            }
        }
        Outcome::Aborted => {
            if opts.verbose != Verbosity::Quiet {
                println!("Aborted, no archive written.");
            }
        }
    }
    Ok(())
}

fn unzip(opts: &ArcOpts) -> Result<()> {
    for input in &opts.paths {
        let target = decompress(
            input,
            opts.output.as_deref(),
            opts.layout,
            opts.force_overwrite,
        )?;
        if opts.verbose != Verbosity::Quiet {
            println!("Decompressed {} into {}", input.display(), target.display());
        }
    }
    Ok(())
}
