//! Line-oriented front end for the synchronized surface.
//!
//! Reads one request per line from stdin, for example
//!   POST /reorder {"oldIndex":0,"newIndex":2}
//! and writes one `STATUS content-type body` line per request to stdout.
//!
//! Usage:
//!   serve [--config FILE]

use std::env;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use initiative::config::TrackerConfig;
use initiative::protocol::http::{HttpRequest, HttpResponse};
use initiative::protocol::server::Server;
use initiative::roster::Seed;
use initiative::store::EncounterStore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match TrackerConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("serve: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_filter);

    let seed = match &config.seed_path {
        Some(path) => match Seed::load(path) {
            Ok(seed) => seed,
            Err(e) => {
                error!(error = %e, "seed_load_failed");
                return ExitCode::FAILURE;
            }
        },
        None => Seed::demo(),
    };
    let mut server = Server::new(EncounterStore::from_seed(seed), config.search_limit);
    info!("server_started");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match HttpRequest::parse_line(&line) {
            Ok(req) => server.handle(&req),
            Err(e) => {
                warn!(error = %e, "request_unparsed");
                HttpResponse::error(400, e.to_string())
            }
        };

        let written = writeln!(out, "{}", response.to_line()).and_then(|()| out.flush());
        if let Err(e) = written {
            error!(error = %e, "stdout_write_failed");
            break;
        }
    }

    ExitCode::SUCCESS
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
