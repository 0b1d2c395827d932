#![deny(missing_docs)]
//! Command-line clients for the OTP cipher service, and a key generator.

use clap::{Parser, Subcommand};
use log::{debug, error};
use otp_core::{CipherClient, ClientConfig, InputError, OtpError, PayloadSource, Role, keygen};
use std::io::Write;
use std::path::{Path, PathBuf};

mod input;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(
    after_help = "EXAMPLES:\n  \n# Generate a 1024-symbol key\notp-cli keygen 1024 > mykey\n\n# Encrypt through the encoding daemon on port 57171\notp-cli encrypt plaintext mykey 57171 > ciphertext\n\n# Decrypt through the decoding daemon on port 57172\notp-cli decrypt ciphertext mykey 57172"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a plaintext file through an encoding daemon
    Encrypt(Transfer),
    /// Decrypt a ciphertext file through a decoding daemon
    Decrypt(Transfer),
    /// Print a random key of A-Z and space, followed by a newline
    Keygen {
        /// Number of key symbols to generate
        #[arg()]
        length: usize,
    },
}

#[derive(clap::Args)]
struct Transfer {
    /// File whose first line is the text to transform
    #[arg()]
    text: PathBuf,

    /// File whose first line is the key; must be at least as long as the text
    #[arg()]
    key: PathBuf,

    /// Port of the daemon
    #[arg()]
    port: u16,

    /// Host running the daemon
    #[arg(long, default_value = "localhost")]
    host: String,
}

/// Parses the command line, exiting with 1 on usage errors and 0 for help or version.
fn parse_cli() -> Cli {
    Cli::try_parse().unwrap_or_else(|e| {
        let code = if e.use_stderr() { 1 } else { 0 };
        // Nothing sensible is left to do if the terminal is gone.
        let _ = e.print();
        std::process::exit(code);
    })
}

/// Turns a validation failure into the message shown to the user.
fn describe_input_error(error: &InputError, role: Role, args: &Transfer) -> String {
    match error {
        InputError::KeyTooShort { .. } => {
            format!("key \"{}\" is too short", args.key.display())
        }
        InputError::InvalidCharacter {
            payload: PayloadSource::Text,
            ..
        } => format!(
            "{} \"{}\" has invalid characters",
            role.text_label(),
            args.text.display()
        ),
        InputError::InvalidCharacter {
            payload: PayloadSource::Key,
            ..
        } => format!("key \"{}\" has invalid characters", args.key.display()),
        other => other.to_string(),
    }
}

fn read_or_exit(path: &Path, what: &str) -> Vec<u8> {
    input::read_payload(path).unwrap_or_else(|e| {
        error!("Failed to read {what} file '{}': {e}", path.display());
        std::process::exit(1);
    })
}

async fn transfer(role: Role, args: Transfer) {
    let text = read_or_exit(&args.text, role.text_label());
    let key = read_or_exit(&args.key, "key");

    let config = ClientConfig::new(role, args.port).with_host(args.host.clone());
    let client = CipherClient::new(config);
    debug!("Sending {} symbols to {}:{}", text.len(), args.host, args.port);

    let output = match client.run(&text, &key).await {
        Ok(output) => output,
        Err(e) => {
            match &e {
                OtpError::InvalidInput(inner) => {
                    error!("{}", describe_input_error(inner, role, &args));
                }
                OtpError::RoleMismatch { expected, .. } => error!(
                    "Could not contact {} on port {}",
                    expected.service_name(),
                    args.port
                ),
                _ => error!("Request to port {} failed: {e}", args.port),
            }
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = write_result(&output) {
        error!("Failed to write result: {e}");
        std::process::exit(1);
    }
}

fn write_result(output: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = parse_cli();

    match cli.command {
        Commands::Encrypt(args) => transfer(Role::Enc, args).await,
        Commands::Decrypt(args) => transfer(Role::Dec, args).await,
        Commands::Keygen { length } => {
            if let Err(e) = keygen::write_key(std::io::stdout().lock(), length) {
                error!("Failed to generate key: {e}");
                std::process::exit(1);
            }
        }
    }
}
