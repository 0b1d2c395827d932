#![deny(missing_docs)]
//! A TCP daemon for the OTP cipher service, serving either the encode or the decode role.

use clap::Parser;
use log::{error, info};
use otp_core::config::{DEFAULT_BACKLOG, DEFAULT_MAX_PAYLOAD_LEN, DEFAULT_MAX_WORKERS};
use otp_core::frame::DEFAULT_CHUNK_SIZE;
use otp_core::{Dispatcher, Role, ServerConfig};
use std::net::{IpAddr, Ipv4Addr};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(
    after_help = "EXAMPLES:\n  \n# Run the encoding daemon on port 57171\notp-daemon --role enc 57171\n\n# Run the decoding daemon with room for 10 concurrent sessions\notp-daemon --role dec --max-workers 10 57172"
)]
struct Cli {
    /// The port to listen on
    #[arg()]
    port: u16,

    /// The role to serve: 'enc' encodes, 'dec' decodes
    #[arg(long, env = "OTP_ROLE")]
    role: Role,

    /// The address to listen on
    #[arg(long, env = "OTP_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Maximum number of sessions served at the same time
    #[arg(long, env = "OTP_MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Largest payload length (in bytes) a client may announce
    #[arg(long = "max-payload", env = "OTP_MAX_PAYLOAD", default_value_t = DEFAULT_MAX_PAYLOAD_LEN)]
    max_payload_len: u64,

    /// Upper bound on bytes moved per socket read or write
    #[arg(long, env = "OTP_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Listen backlog; connections beyond the worker limit wait here
    #[arg(long, env = "OTP_BACKLOG", default_value_t = DEFAULT_BACKLOG)]
    backlog: u32,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            max_workers: self.max_workers,
            max_payload_len: self.max_payload_len,
            chunk_size: self.chunk_size,
            backlog: self.backlog,
            ..ServerConfig::new(self.role, self.port)
        }
    }
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

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = parse_cli().into_config();
    let service = config.role.service_name();

    let dispatcher = Dispatcher::bind(config).unwrap_or_else(|e| {
        error!("Failed to start {service}: {e}");
        std::process::exit(1);
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C, running until killed: {e}");
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = dispatcher.run_until(shutdown).await {
        error!("{service} stopped: {e}");
        std::process::exit(1);
    }
    info!("{service} exited cleanly.");
}
