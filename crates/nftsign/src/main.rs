#![forbid(unsafe_code)]

//! nftsign CLI — sign, verify, and inspect NFTS tax-document batches.

use clap::{Parser, Subcommand};
use nftsign_core::Error;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "nftsign",
    about = "NFTS batch signing for the São Paulo municipal services tax",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign every NFTS element in a batch document
    Sign {
        /// Input batch XML file (PedidoEnvioLoteNFTS)
        input: PathBuf,

        /// Credential file (PEM, DER, or PKCS#12, auto-detected)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Password for encrypted PEM or PKCS#12 credentials
        #[arg(short = 'p', long)]
        password: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the signed batch wrapped in the test-submission SOAP envelope
        #[arg(long)]
        soap: Option<PathBuf>,

        /// Dump per-document canonical bytes, digests, and signatures into DIR
        #[arg(long = "dump-dir")]
        dump_dir: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Verify the signature of every NFTS element in a batch
    Verify {
        /// Input signed batch XML file
        input: PathBuf,

        /// Credential file (PEM, DER, or PKCS#12, auto-detected)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Password for encrypted PEM or PKCS#12 credentials
        #[arg(short = 'p', long)]
        password: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Emit the canonical signing bytes of one NFTS element
    Canonical {
        /// Input XML file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Which NFTS element to canonicalize (1-based)
        #[arg(long, default_value_t = 1)]
        index: usize,
    },

    /// Byte-compare two dump files
    Compare {
        /// First file
        a: PathBuf,

        /// Second file
        b: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sign {
            input,
            key,
            password,
            output,
            soap,
            dump_dir,
            verbose,
        } => cmd_sign(input, key, password, output, soap, dump_dir, verbose),

        Commands::Verify {
            input,
            key,
            password,
            verbose,
        } => cmd_verify(input, key, password, verbose),

        Commands::Canonical {
            input,
            output,
            index,
        } => cmd_canonical(input, output, index),

        Commands::Compare { a, b } => cmd_compare(a, b),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn cmd_sign(
    input: PathBuf,
    key: PathBuf,
    password: Option<String>,
    output: Option<PathBuf>,
    soap: Option<PathBuf>,
    dump_dir: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Error> {
    let xml = read_file(&input)?;
    let credential = nftsign_keys::load_credential_file(&key, password.as_deref())?;

    if verbose {
        eprintln!("Signing: {}", input.display());
        eprintln!("Credential: {credential:?}");
    }

    let signed = nftsign_signer::sign_batch(&xml, &credential, dump_dir.as_deref())?;

    if let Some(path) = soap {
        let envelope = nftsign::soap::build_soap_envelope(&signed);
        std::fs::write(&path, envelope.as_bytes()).map_err(|e| path_error(&path, e))?;
        if verbose {
            eprintln!("SOAP envelope written: {}", path.display());
        }
    }

    write_output(output, signed.as_bytes())
}

fn cmd_verify(
    input: PathBuf,
    key: PathBuf,
    password: Option<String>,
    verbose: bool,
) -> Result<(), Error> {
    let xml = read_file(&input)?;
    let credential = nftsign_keys::load_credential_file(&key, password.as_deref())?;

    if verbose {
        eprintln!("Verifying: {}", input.display());
        eprintln!("Credential: {credential:?}");
    }

    let outcomes = nftsign_signer::verify_batch(&xml, &credential)?;
    let mut failures = 0usize;
    for (i, outcome) in outcomes.iter().enumerate() {
        println!("NFTS #{}: {outcome}", i + 1);
        if !outcome.is_valid() {
            failures += 1;
        }
    }

    if failures > 0 {
        eprintln!("{failures} of {} document(s) failed verification", outcomes.len());
        process::exit(1);
    }
    Ok(())
}

fn cmd_canonical(input: PathBuf, output: Option<PathBuf>, index: usize) -> Result<(), Error> {
    let xml = read_file(&input)?;
    let documents = nftsign_model::parse_documents(&xml)?;

    let doc = index
        .checked_sub(1)
        .and_then(|i| documents.get(i))
        .ok_or_else(|| {
            Error::XmlStructure(format!(
                "requested NFTS #{index}, input has {}",
                documents.len()
            ))
        })?;

    let canonical = nftsign_canonical::canonical_bytes(doc)?;
    write_output(output, &canonical)
}

fn cmd_compare(a: PathBuf, b: PathBuf) -> Result<(), Error> {
    let data_a = read_bytes(&a)?;
    let data_b = read_bytes(&b)?;

    if data_a == data_b {
        println!("identical ({} bytes)", data_a.len());
        return Ok(());
    }

    println!("files differ");
    println!("  {}: {} bytes", a.display(), data_a.len());
    println!("  {}: {} bytes", b.display(), data_b.len());

    let min_len = data_a.len().min(data_b.len());
    if let Some(i) = (0..min_len).find(|&i| data_a[i] != data_b[i]) {
        let start = i.saturating_sub(5);
        let end = (i + 6).min(min_len);
        println!("first difference at byte {i}:");
        println!("  {} [{start}..{end}]: {}", a.display(), hex(&data_a[start..end]));
        println!("  {} [{start}..{end}]: {}", b.display(), hex(&data_b[start..end]));
    }
    process::exit(1);
}

// ── Utility functions ────────────────────────────────────────────────

fn read_file(path: &PathBuf) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| path_error(path, e))
}

fn read_bytes(path: &PathBuf) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| path_error(path, e))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(|e| path_error(&p, e)),
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(data)
                .map_err(|e| std::io::Error::new(e.kind(), format!("stdout: {e}")).into())
        }
    }
}

fn path_error(path: &std::path::Path, e: std::io::Error) -> Error {
    std::io::Error::new(e.kind(), format!("{}: {e}", path.display())).into()
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}
