#![forbid(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pars::{
    FileHeader, ParityFileInfo, ParsError, SizingTarget, ValidationResult, create_parity,
    get_parity_header, validate_parity,
};
use serde::Serialize;
use std::path::PathBuf;

// ── CLI definition ──────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pars", about = "pars — parity sidecars with single-byte repair")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create (or overwrite) a parity file for a data file.
    Create {
        /// Path to the data file to protect.
        data: PathBuf,
        /// Parity destination (defaults to the data path with `.pars` appended).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Target number of blocks.
        #[arg(long, group = "sizing")]
        blocks: Option<u64>,
        /// Parity bytes as a fraction of data bytes, in (0, 1].
        #[arg(long, group = "sizing")]
        usage: Option<f64>,
        /// Coverage guarantee, in (0, 1].
        #[arg(long, group = "sizing")]
        coverage: Option<f64>,
        /// Explicit block edge length.
        #[arg(long, group = "sizing")]
        dim: Option<u32>,
        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },
    /// Validate a data file against its parity file.
    Verify {
        /// Path to the parity file.
        parity: PathBuf,
        /// Repair recoverable single-byte errors in place.
        #[arg(long)]
        fix: bool,
        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },
    /// Show a parity file's header.
    Info {
        /// Path to the parity file.
        parity: PathBuf,
        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },
}

// ── Serializable outputs ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreateOutput {
    parity_path: String,
    data_file_len: u64,
    block_dim: u32,
    full_block_count: u64,
    last_block_dim: u32,
    parity_file_len: u64,
}

impl From<&ParityFileInfo> for CreateOutput {
    fn from(info: &ParityFileInfo) -> Self {
        Self {
            parity_path: info.parity_path.display().to_string(),
            data_file_len: info.data_file_len,
            block_dim: info.block_dim,
            full_block_count: info.full_block_count,
            last_block_dim: info.last_block_dim,
            parity_file_len: info.parity_file_len,
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    file_name: String,
    file_size: u64,
    whole_hash: String,
    block_dim: u32,
    full_block_count: u64,
    last_block_dim: u32,
}

impl From<&FileHeader> for InfoOutput {
    fn from(header: &FileHeader) -> Self {
        Self {
            file_name: header.file_name.clone(),
            file_size: header.file_size,
            whole_hash: hex_string(&header.whole_hash),
            block_dim: header.block_dim,
            full_block_count: header.full_block_count,
            last_block_dim: header.last_block_dim,
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Create {
            data,
            out,
            blocks,
            usage,
            coverage,
            dim,
            json,
        } => {
            let target = sizing_target(blocks, usage, coverage, dim)?;
            create(target, &data, out.as_deref(), json)
        }
        Command::Verify { parity, fix, json } => verify(&parity, fix, json),
        Command::Info { parity, json } => info(&parity, json),
    }
}

/// Default sizing when no flag is given: a 1% coverage guarantee.
const DEFAULT_COVERAGE: f64 = 0.01;

fn sizing_target(
    blocks: Option<u64>,
    usage: Option<f64>,
    coverage: Option<f64>,
    dim: Option<u32>,
) -> Result<SizingTarget> {
    // clap's `sizing` group enforces mutual exclusivity.
    Ok(match (blocks, usage, coverage, dim) {
        (Some(count), None, None, None) => SizingTarget::BlockCount(count),
        (None, Some(ratio), None, None) => SizingTarget::DataUsage(ratio),
        (None, None, Some(cov), None) => SizingTarget::Coverage(cov),
        (None, None, None, Some(edge)) => SizingTarget::Dimension(edge),
        (None, None, None, None) => SizingTarget::Coverage(DEFAULT_COVERAGE),
        _ => bail!("at most one of --blocks, --usage, --coverage, --dim may be given"),
    })
}

fn create(
    target: SizingTarget,
    data: &std::path::Path,
    out: Option<&std::path::Path>,
    json: bool,
) -> Result<()> {
    let result = create_parity(target, data, out)
        .with_context(|| format!("failed to create parity for {}", data.display()))?;

    let output = CreateOutput::from(&result);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("serialize output")?
        );
    } else {
        println!("parity written: {}", output.parity_path);
        println!("data_file_len: {}", output.data_file_len);
        println!("block_dim: {}", output.block_dim);
        println!("full_block_count: {}", output.full_block_count);
        println!("last_block_dim: {}", output.last_block_dim);
        println!("parity_file_len: {}", output.parity_file_len);
    }
    Ok(())
}

fn verify(parity: &std::path::Path, fix: bool, json: bool) -> Result<()> {
    let result = match validate_parity(parity, fix) {
        Ok(result) => result,
        Err(
            err @ (ParsError::MagicMissing { .. }
            | ParsError::HeaderTruncated { .. }
            | ParsError::SizeInconsistent { .. }
            | ParsError::Format(_)),
        ) => {
            // The parity file itself is bad; report it in the same shape
            // as a completed validation.
            if !json {
                eprintln!("parity file invalid: {err}");
            }
            print_verify_result(&ValidationResult::framing_failure(), json)?;
            std::process::exit(2);
        }
        Err(other) => {
            return Err(other)
                .with_context(|| format!("failed to validate {}", parity.display()));
        }
    };

    print_verify_result(&result, json)?;
    if !result.ok {
        std::process::exit(2);
    }
    Ok(())
}

fn print_verify_result(result: &ValidationResult, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(result).context("serialize result")?
        );
        return Ok(());
    }

    println!("ok: {}", result.ok);
    println!("parity_file_ok: {}", result.parity_file_ok);
    println!("size_ok: {}", result.size_ok);
    println!("hash_ok: {}", result.hash_ok);
    if result.analyzed_blocks {
        println!(
            "blocks: {} ok, {} fixable, {} fixed, {} unfixable",
            result.ok_blocks, result.fixable_blocks, result.fixed_blocks, result.unfixable_blocks
        );
    }
    Ok(())
}

fn info(parity: &std::path::Path, json: bool) -> Result<()> {
    let header = get_parity_header(parity)
        .with_context(|| format!("failed to read parity header from {}", parity.display()))?;

    let output = InfoOutput::from(&header);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("serialize header")?
        );
    } else {
        println!("file_name: {}", output.file_name);
        println!("file_size: {}", output.file_size);
        println!("whole_hash: {}", output.whole_hash);
        println!("block_dim: {}", output.block_dim);
        println!("full_block_count: {}", output.full_block_count);
        println!("last_block_dim: {}", output.last_block_dim);
    }
    Ok(())
}
