use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use rayon::{prelude::*, ThreadPool};

use super::archive::{check_entry_count, encode_root, write_coded, ROOT_COUNT_BITS};
use super::header::{table_bits, write_code_table, Header};
use super::tally::{tally_root, InputTally, ScanNode};
use super::Layout;
use crate::bitstream::bitwriter::BitWriter;
use crate::error::{ArchiveError, Result, Section};
use crate::huffman_coding::{code_table::CodeTable, huffman::build_tree};
use crate::tools::dir_walk::Excluded;
use crate::tools::freq_count::{freqs, ByteFrequencyTable};
use crate::tools::progress::{Progress, ProgressTracker};
use crate::tools::prompt::Interaction;

/*
    Compression runs in two parallel phases around one sequential step:

    - Counting: every root input is tallied on its own (names, contents, fixed entry bits).
      The tallies are summed once all of them are in. Addition does not care about order,
      so the table is the same for any number of workers.
    - Midpoint: tree and code table. This needs the whole table and stays single threaded.
    - Encoding: every root input is encoded into its own buffer starting at bit 0. The
      buffers are written out in argument order, never in the order workers finish.

    The sequential strategy runs the same steps without a pool and writes the body straight
    into the output file. Both produce the same bytes.
*/

/// How the two parallel phases are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// No worker pool; the body goes directly to the output file.
    Sequential,
    /// A pool of `workers` threads (0 = one per CPU); each root input goes to a private buffer.
    Parallel { workers: usize },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Parallel { workers: 0 }
    }
}

/// Everything that controls one compression run.
#[derive(Debug, Clone, Default)]
pub struct CompressOptions {
    pub layout: Layout,
    pub strategy: Strategy,
    /// Overwrite an existing output file.
    pub force: bool,
}

/// Sizes shown to the user before the body is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    pub original_size: u64,
    pub compressed_size: u64,
}

impl Estimate {
    /// Compressed size as a fraction of the original.
    pub fn ratio(&self) -> f64 {
        self.compressed_size as f64 / self.original_size.max(1) as f64
    }
}

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub output: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
    pub letter_count: usize,
    pub files: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written(Summary),
    /// The user declined at the confirmation prompt; nothing was left on disk.
    Aborted,
}

/// Deletes a partially written output unless the run completes.
struct OutputGuard {
    path: PathBuf,
    committed: bool,
}

impl OutputGuard {
    fn create(path: &Path) -> Result<(Self, BufWriter<File>)> {
        let file = File::create(path)?;
        debug!("Created {}", path.display());
        Ok((
            Self {
                path: path.to_path_buf(),
                committed: false,
            },
            BufWriter::new(file),
        ))
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.committed {
            warn!("Removing incomplete output {}", self.path.display());
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("Could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Check everything that can be checked before an output file exists.
fn validate(inputs: &[PathBuf], output: &Path, opts: &CompressOptions) -> Result<()> {
    if inputs.is_empty() {
        return Err(ArchiveError::Layout("nothing to compress".to_string()));
    }
    for input in inputs {
        if fs::metadata(input).is_err() {
            return Err(ArchiveError::InputNotFound(input.clone()));
        }
    }
    match opts.layout {
        Layout::Stream => {
            if inputs.len() != 1 || fs::metadata(&inputs[0])?.is_dir() {
                return Err(ArchiveError::Layout(
                    "the raw layout takes exactly one regular file".to_string(),
                ));
            }
        }
        Layout::Archive => check_entry_count(output, inputs.len())?,
    }
    if !opts.force && output.exists() {
        return Err(ArchiveError::OutputExists(output.to_path_buf()));
    }
    if output.exists() {
        let target = fs::canonicalize(output)?;
        for input in inputs {
            if fs::canonicalize(input)? == target {
                return Err(ArchiveError::Layout(format!(
                    "{} is both an input and the output",
                    input.display()
                )));
            }
        }
    }
    Ok(())
}

/// Compress `inputs` into `output`.
///
/// The interaction is asked for a password once the output exists and for confirmation
/// once the exact compressed size is known. Any error, or a declined confirmation, removes
/// the output again.
pub fn compress(
    inputs: &[PathBuf],
    output: &Path,
    opts: &CompressOptions,
    interaction: &mut dyn Interaction,
    progress: &dyn Progress,
) -> Result<Outcome> {
    validate(inputs, output, opts)?;
    match opts.strategy {
        Strategy::Sequential => {
            info!("Compressing sequentially.");
            run(inputs, output, opts.layout, None, interaction, progress)
        }
        Strategy::Parallel { workers } => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()?;
            info!("Compressing with {} workers.", pool.current_num_threads());
            run(inputs, output, opts.layout, Some(&pool), interaction, progress)
        }
    }
}

/// Phase A: one private tally per root input. The output never appears in a listing, even
/// when it lives inside one of the input directories.
fn count_inputs(
    inputs: &[PathBuf],
    output: &Path,
    layout: Layout,
    pool: Option<&ThreadPool>,
) -> Result<Vec<InputTally>> {
    let exclude = Excluded::new(output);
    let exclude = exclude.as_ref();
    match pool {
        Some(pool) => pool.install(|| {
            inputs
                .par_iter()
                .map(|input| tally_root(input, layout, true, exclude))
                .collect()
        }),
        None => inputs
            .iter()
            .map(|input| tally_root(input, layout, false, exclude))
            .collect(),
    }
}

/// The listing each root was counted with. Phase B encodes these and nothing else.
fn scans(tallies: &[InputTally]) -> Result<Vec<&ScanNode>> {
    tallies
        .iter()
        .map(|tally| {
            tally
                .scan
                .as_ref()
                .ok_or_else(|| ArchiveError::Layout("root input was not scanned".to_string()))
        })
        .collect()
}

/// Bits needed to code every counted byte with `table`.
fn coded_bits(freqs: &ByteFrequencyTable, table: &CodeTable) -> u64 {
    freqs
        .present()
        .map(|(byte, weight)| weight * table.code_len(byte) as u64)
        .sum()
}

fn bytes_for(bits: u64) -> u64 {
    (bits + 7) / 8
}

/// Exact size of the archive, from the tallies alone.
fn estimate(
    header: &Header,
    table: &CodeTable,
    tallies: &[InputTally],
    total: &InputTally,
    layout: Layout,
) -> Estimate {
    let body = match layout {
        Layout::Stream => bytes_for(table_bits(table) + coded_bits(&total.freqs, table)),
        Layout::Archive => {
            bytes_for(table_bits(table) + ROOT_COUNT_BITS)
                + tallies
                    .iter()
                    .map(|t| bytes_for(t.overhead_bits + coded_bits(&t.freqs, table)))
                    .sum::<u64>()
        }
    };
    Estimate {
        original_size: total.content_bytes,
        compressed_size: header.byte_len() + body,
    }
}

/// Header bytes plus the bit-packed code table (and root count for archives). The writer is
/// left open: an archive closes it before the first root, a stream keeps coding into it.
fn prelude(
    header: &Header,
    table: &CodeTable,
    root_count: Option<usize>,
) -> Result<BitWriter<Vec<u8>>> {
    let mut head = Vec::with_capacity(header.byte_len() as usize);
    header.write(&mut head)?;
    let mut bw = BitWriter::new(head);
    write_code_table(&mut bw, table)?;
    if let Some(count) = root_count {
        bw.append_le(count as u64, 2)?;
    }
    Ok(bw)
}

fn run(
    inputs: &[PathBuf],
    output: &Path,
    layout: Layout,
    pool: Option<&ThreadPool>,
    interaction: &mut dyn Interaction,
    progress: &dyn Progress,
) -> Result<Outcome> {
    // Phase A
    let tallies = count_inputs(inputs, output, layout, pool)?;
    let total = tallies
        .iter()
        .fold(InputTally::default(), |sum, tally| sum + tally);
    info!(
        "Counted {} files, {} bytes of content, {} symbols.",
        total.files,
        total.content_bytes,
        total.freqs.letter_count()
    );

    // Midpoint
    let table = build_tree(&total.freqs)
        .map(|tree| CodeTable::from_tree(&tree))
        .unwrap_or_default();

    let (guard, mut out) = OutputGuard::create(output)?;
    let header = Header::new(
        total.content_bytes,
        table.letter_count(),
        interaction.password()?,
    )?;
    let root_count = match layout {
        Layout::Archive => Some(inputs.len()),
        Layout::Stream => None,
    };
    let prelude = prelude(&header, &table, root_count)?;

    let estimate = estimate(&header, &table, &tallies, &total, layout);
    info!(
        "{} bytes will compress to {} bytes.",
        estimate.original_size, estimate.compressed_size
    );
    if !interaction.confirm(&estimate)? {
        info!("Aborted.");
        return Ok(Outcome::Aborted);
    }

    // Phase B
    let tracker = ProgressTracker::new(progress, total.content_bytes);
    match layout {
        Layout::Stream => {
            let (head, cursor) = prelude.into_parts();
            out.write_all(&head)?;
            let content = fs::read(&inputs[0])?;
            if content.len() as u64 != total.content_bytes {
                return Err(ArchiveError::corrupt(
                    Section::Body,
                    format!("{} changed size while compressing", inputs[0].display()),
                ));
            }
            let mut body = BitWriter::with_cursor(&mut out, cursor);
            write_coded(&mut body, &table, &content)?;
            body.close()?;
            tracker.advance(content.len() as u64);
        }
        Layout::Archive => {
            let roots = scans(&tallies)?;
            out.write_all(&prelude.close()?)?;
            match pool {
                None => {
                    for root in &roots {
                        encode_root(&mut out, root, &table, &tracker)?;
                    }
                }
                Some(pool) => {
                    let buffers = pool.install(|| {
                        roots
                            .par_iter()
                            .map(|root| encode_root(Vec::new(), root, &table, &tracker))
                            .collect::<Result<Vec<Vec<u8>>>>()
                    })?;
                    // Argument order, whatever order the workers finished in
                    for buffer in &buffers {
                        out.write_all(buffer)?;
                    }
                }
            }
        }
    }
    tracker.finish();
    out.flush()?;
    drop(out);

    let compressed_size = fs::metadata(output)?.len();
    if compressed_size != estimate.compressed_size {
        warn!(
            "Estimated {} bytes but wrote {}.",
            estimate.compressed_size, compressed_size
        );
    }
    guard.commit();
    info!("Created compressed file: {}", output.display());

    Ok(Outcome::Written(Summary {
        output: output.to_path_buf(),
        original_size: total.content_bytes,
        compressed_size,
        letter_count: table.letter_count(),
        files: total.files,
    }))
}

/// Encode a byte buffer with the stream layout, entirely in memory.
pub fn encode_bytes(data: &[u8], password: Option<Vec<u8>>) -> Result<Vec<u8>> {
    let counts = freqs(data, true);
    let table = build_tree(&counts)
        .map(|tree| CodeTable::from_tree(&tree))
        .unwrap_or_default();
    let header = Header::new(data.len() as u64, table.letter_count(), password)?;
    let mut bw = prelude(&header, &table, None)?;
    write_coded(&mut bw, &table, data)?;
    bw.close()
}
