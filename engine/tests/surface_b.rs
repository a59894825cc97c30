//! Integration tests for the synchronized surface.
//!
//! Drives the `serve` binary over its line protocol, and a `RemoteRoster`
//! against an in-process server through the loopback transport.

use std::io::{BufRead, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use initiative::protocol::{LoopbackTransport, RemoteRoster, SaveError, Server};
use initiative::roster::{CombatantId, EncounterId, Field, Seed};
use initiative::store::{EncounterStore, SelectOutcome};
use parking_lot::Mutex;

/// Sends request lines to the server binary and collects response lines.
fn run_server(requests: &[&str]) -> Vec<String> {
    let exe = env!("CARGO_BIN_EXE_serve");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start serve");

    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let reader = std::io::BufReader::new(stdout);

    for req in requests {
        writeln!(stdin, "{}", req).unwrap();
    }
    stdin.flush().unwrap();
    drop(stdin);

    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    let status = child.wait().expect("failed to wait on child");
    assert!(status.success());
    lines
}

#[test]
fn one_response_line_per_request() {
    let lines = run_server(&[
        "GET /characters",
        r#"POST /reorder {"oldIndex":0,"newIndex":2}"#,
        "GET /characters.json",
    ]);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with(r#"200 text/html <div class="character-list">"#));
    assert_eq!(lines[1], r#"200 application/json {"status":"success"}"#);

    let body = lines[2].strip_prefix("200 application/json ").unwrap();
    let roster: Vec<serde_json::Value> = serde_json::from_str(body).unwrap();
    let names: Vec<&str> = roster.iter().map(|c| c["Name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Legolas", "Gimli", "Aragorn"]);
}

#[test]
fn status_codes_follow_contract() {
    let lines = run_server(&[
        "GET /select-character",
        "GET /nowhere",
        "POST /select-character {not json",
        r#"POST /reorder {"oldIndex":0,"newIndex":7}"#,
        r#"POST /save-character {"id":1,"name":"","armorClass":1,"maxHP":1,"currentHP":1,"initiative":1}"#,
        r#"POST /save-character {"id":77,"name":"X","armorClass":1,"maxHP":1,"currentHP":1,"initiative":1}"#,
        "garbage",
    ]);
    let statuses: Vec<&str> = lines.iter().map(|l| &l[..3]).collect();
    assert_eq!(statuses, ["405", "404", "400", "400", "400", "404", "400"]);
    assert_eq!(lines[4], "400 text/plain Name is required");
}

#[test]
fn select_and_next_render_active_row() {
    let lines = run_server(&[
        r#"POST /select-character {"id":2}"#,
        "POST /next",
    ]);
    assert!(lines[0].contains(r#"<div class="character active" data-id="2""#));
    assert!(lines[1].contains(r#"<div class="character active" data-id="1""#));
}

#[test]
fn save_returns_row_fragment() {
    let lines = run_server(&[
        r#"POST /save-character {"id":3,"name":"Gimli","armorClass":18,"maxHP":50,"currentHP":44,"initiative":10}"#,
    ]);
    assert_eq!(
        lines[0],
        r#"200 text/html <div class="character" data-id="3" data-owner="user3"><span class="name">Gimli</span><span class="ac">18</span><span class="hp">44/50</span><span class="init">10</span></div>"#
    );
}

#[test]
fn encounters_and_search_fragments() {
    let lines = run_server(&[
        r#"POST /select-encounter {"id":2}"#,
        "GET /encounters",
        "GET /search-characters?q=or",
    ]);
    assert!(lines[0].contains("Legolas"));
    assert!(!lines[0].contains("Gimli"));
    assert!(lines[1].contains(r#"<li class="encounter selected" data-id="2">Dragon&#39;s Lair</li>"#));
    assert!(lines[2].contains(r#"data-template-id="102">Orc<"#));
}

fn loopback() -> (RemoteRoster, Arc<Mutex<Server>>) {
    let server = Arc::new(Mutex::new(Server::new(
        EncounterStore::from_seed(Seed::demo()),
        10,
    )));
    let transport = Arc::new(LoopbackTransport::new(Arc::clone(&server)));
    let mut client = RemoteRoster::new(transport, EncounterId(1), 2).unwrap();
    client.refresh().unwrap();
    (client, server)
}

#[test]
fn client_edit_round_trip() {
    let (mut client, server) = loopback();
    assert!(client.begin_edit(CombatantId(2)));
    client.edit_field(CombatantId(2), Field::Name, "");
    assert_eq!(client.save(CombatantId(2)), Err(SaveError::EmptyName));

    client.edit_field(CombatantId(2), Field::Name, "Greenleaf");
    client.edit_field(CombatantId(2), Field::CurrentHp, "33");
    let row = client.save(CombatantId(2)).unwrap();
    assert!(row.contains("Greenleaf"));

    let roster = server.lock().store().current_roster();
    let saved = roster.find(CombatantId(2)).unwrap();
    assert_eq!((saved.name.as_str(), saved.current_hp), ("Greenleaf", 33));
}

#[test]
fn client_reorders_reach_server() {
    let (mut client, server) = loopback();
    assert!(client.reorder(2, 0));
    assert!(client.sync().wait_settled(Duration::from_secs(5)));
    assert!(client.sync().failures().is_empty());
    let names: Vec<String> = server
        .lock()
        .store()
        .current_roster()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(names, ["Gimli", "Aragorn", "Legolas"]);
}

#[test]
fn client_selection_gated_by_edit() {
    let (mut client, _server) = loopback();
    client.begin_edit(CombatantId(1));
    assert!(matches!(
        client.select(CombatantId(2), false).unwrap(),
        SelectOutcome::BlockedByEdit(_)
    ));
    assert!(client.cancel_edit(CombatantId(1)));
    match client.select(CombatantId(2), false).unwrap() {
        SelectOutcome::Selected(roster) => {
            assert_eq!(roster.active().map(|c| c.id), Some(CombatantId(2)))
        }
        other => panic!("unexpected {other:?}"),
    }
}
