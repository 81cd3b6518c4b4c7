use clap::Parser;
use log::{debug, info};
use std::{
    fmt::{Display, Formatter},
    fs,
    path::PathBuf,
};

use crate::compression::{compress::Strategy, decompress::EXTENSION, Layout};

/// Verbosity of user information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Warnings,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    pub fn level(self) -> log::LevelFilter {
        match self {
            Verbosity::Quiet => log::LevelFilter::Off,
            Verbosity::Warnings => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
            Verbosity::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Zip, Unzip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Zip,
    Unzip,
}
impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Command Line Interpretation - uses external CLAP crate.
#[derive(Parser, Debug)]
#[clap(
    name = "archive",
    version,
    about = "Huffman file and directory archiver",
    long_about = "
    Compresses any mix of files and directories into one archive with a single Huffman code
    table shared by all names and contents. Counting and encoding run in parallel, one task
    per path given on the command line; the output does not depend on the number of workers."
)]
pub struct Args {
    /// Files and directories to compress, or the archive to decompress
    #[clap(required = true)]
    paths: Vec<PathBuf>,

    /// Perform decompression on the input file
    #[clap(short = 'd', long = "decompress")]
    decompress: bool,

    /// Output file (compression) or destination directory (decompression)
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Worker threads, 0 uses one per CPU
    #[clap(short = 'j', long = "jobs", default_value_t = 0)]
    jobs: usize,

    /// Run without a worker pool
    #[clap(long = "sequential")]
    sequential: bool,

    /// Single coded stream for exactly one regular file, no names or directories
    #[clap(long = "raw")]
    raw: bool,

    /// Don't ask questions: no password unless --password, always continue
    #[clap(short = 'y', long = "yes")]
    yes: bool,

    /// Password to store in the archive header
    #[clap(long = "password")]
    password: Option<String>,

    ///Force overwriting output files
    #[clap(short = 'f', long = "force")]
    force: bool,

    /// Be verbose (a 2nd -v gives more)
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress everything but errors on the terminal
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,
}

/// Define all user settable options to control program behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcOpts {
    /// Paths named on the command line, in order
    pub paths: Vec<PathBuf>,
    /// Compress/Decompress
    pub op_mode: Mode,
    /// Explicit output location
    pub output: Option<PathBuf>,
    pub layout: Layout,
    pub strategy: Strategy,
    /// Skip the interactive prompts
    pub unattended: bool,
    pub password: Option<Vec<u8>>,
    /// Silently overwrite existing files with the same name
    pub force_overwrite: bool,
    /// Verbosity of user information
    pub verbose: Verbosity,
}

impl ArcOpts {
    /// Where compression writes: the explicit output, or the first path plus the extension.
    pub fn archive_path(&self) -> PathBuf {
        let fallback = || PathBuf::from(format!("archive.{}", EXTENSION));
        match (&self.output, self.paths.first()) {
            (Some(out), _) => out.clone(),
            (None, Some(first)) => {
                // components() drops a trailing separator: "notes/" becomes "notes"
                let mut stem = first.components().as_path().to_path_buf();
                if stem.file_name().is_none() {
                    // "." or "dir/..": name the archive after the directory, next to it
                    match fs::canonicalize(first) {
                        Ok(dir) if dir.file_name().is_some() => stem = dir,
                        _ => return fallback(),
                    }
                }
                let mut name = stem.into_os_string();
                name.push(".");
                name.push(EXTENSION);
                PathBuf::from(name)
            }
            (None, None) => fallback(),
        }
    }
}

impl From<Args> for ArcOpts {
    fn from(args: Args) -> Self {
        let verbose = match (args.quiet, args.verbose) {
            (true, _) => Verbosity::Quiet,
            (false, 0) => Verbosity::Warnings,
            (false, 1) => Verbosity::Info,
            (false, 2) => Verbosity::Debug,
            _ => Verbosity::Trace,
        };
        Self {
            paths: args.paths,
            op_mode: if args.decompress { Mode::Unzip } else { Mode::Zip },
            output: args.output,
            layout: if args.raw { Layout::Stream } else { Layout::Archive },
            strategy: if args.sequential {
                Strategy::Sequential
            } else {
                Strategy::Parallel { workers: args.jobs }
            },
            unattended: args.yes,
            password: args.password.map(String::into_bytes),
            force_overwrite: args.force,
            verbose,
        }
    }
}

/// Parse the command line and set the log level from it.
pub fn arcopts_init() -> ArcOpts {
    let opts = ArcOpts::from(Args::parse());
    log::set_max_level(opts.verbose.level());

    // Below we report initialization status to the user
    info!("Operational mode set to {}", opts.op_mode);
    info!("Layout set to {:?}", opts.layout);
    debug!("Strategy set to {:?}", opts.strategy);
    if opts.force_overwrite {
        info!("Forcing file overwriting")
    };
    opts
}
