//! Offline initiative tracker.
//!
//! Reads line commands from stdin and writes responses to stdout. Logs go
//! to stderr so stdout carries only protocol output.

use std::env;
use std::io::{self, BufRead};
use std::process::ExitCode;

use initiative::config::TrackerConfig;
use initiative::protocol::parser::{parse_command, Command};
use initiative::tracker::Tracker;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match TrackerConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("initiative-tracker: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_filter);

    let mut tracker = match Tracker::from_config(config) {
        Ok(tracker) => tracker,
        Err(e) => {
            error!(error = %e, "seed_load_failed");
            return ExitCode::FAILURE;
        }
    };
    info!(encounter = %tracker.store().current(), "tracker_started");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let cmd = match parse_command(&line) {
            Some(c) => c,
            None => continue,
        };

        let written = match cmd {
            Command::IsReady => tracker.handle_isready(&mut out),
            Command::SetOption { name, value } => {
                tracker.set_option(&name, value.as_deref());
                Ok(())
            }
            Command::Encounters => tracker.handle_encounters(&mut out),
            Command::Encounter { id } => tracker.handle_encounter(id, &mut out),
            Command::Show => tracker.handle_show(&mut out),
            Command::Roster => tracker.handle_roster(&mut out),
            Command::Add => tracker.handle_add(&mut out),
            Command::Enemies => tracker.handle_enemies(&mut out),
            Command::Enemy { template } => tracker.handle_enemy(template, &mut out),
            Command::Select { id, force } => tracker.handle_select(id, force, &mut out),
            Command::Next => tracker.handle_next(&mut out),
            Command::Key { key } => tracker.handle_key(&key, &mut out),
            Command::Edit { id, field } => tracker.handle_edit(id, field, &mut out),
            Command::Type { id, text } => tracker.handle_type(id, &text, &mut out),
            Command::Commit { id } => tracker.handle_commit(id, &mut out),
            Command::Cancel { id } => tracker.handle_cancel(id, &mut out),
            Command::Set { id, field, value } => tracker.handle_set(id, field, &value, &mut out),
            Command::Move { from, to } => tracker.handle_move(from, to, &mut out),
            Command::Sort => tracker.handle_sort(&mut out),
            Command::Search { query } => tracker.handle_search(&query, &mut out),
            Command::Json => tracker.handle_json(&mut out),
            Command::Quit => break,
        };

        if let Err(e) = written {
            error!(error = %e, "stdout_write_failed");
            break;
        }
    }

    tracker.shutdown();
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
