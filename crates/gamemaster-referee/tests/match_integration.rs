#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Integration tests use unwrap for brevity

//! End-to-end matches between small `sh` players.
//!
//! Each player is a script in a temp directory; scripts record what they read
//! on stdin into files next to them so the test can inspect delivery.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gamemaster_referee::referee::EndReason;
use gamemaster_referee::{MatchOutcome, RecordingSink, Referee, RefereeError};
use tempfile::TempDir;

const MATCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Write `body` as a script and return the command line that runs it.
fn player(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(format!("{name}.sh"));
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    format!("sh {}", path.display())
}

fn out(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{name}.out"))
}

fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

async fn play(programs: Vec<String>, sink: &RecordingSink) -> Result<MatchOutcome, RefereeError> {
    let referee = Referee::new(programs, Arc::new(sink.clone()))
        .with_kill_timeout(Duration::from_secs(5));
    tokio::time::timeout(MATCH_TIMEOUT, referee.run())
        .await
        .expect("match should finish")
}

#[tokio::test]
async fn getname_returns_name_set_by_another_player() {
    let dir = TempDir::new().unwrap();
    let master_out = out(&dir, "master");
    let master = player(
        &dir,
        "master",
        &format!(
            r##"while :; do
  echo "#players"
  read reply
  [ "$reply" = "#players 1" ] && break
  sleep 0.05
done
echo "#getname 1"
read reply
echo "$reply" > {out}
echo "#quit"
while read line; do :; done"##,
            out = master_out.display()
        ),
    );
    let p1 = player(&dir, "p1", "echo \"#name Alice\"\nwhile read line; do :; done");
    let p2 = player(&dir, "p2", "while read line; do :; done");

    let sink = RecordingSink::new();
    let outcome = play(vec![master, p1, p2], &sink).await.unwrap();

    assert_eq!(lines(&master_out), vec!["#getname 1 Alice"]);
    assert_eq!(outcome.reason, EndReason::Quit { by: 0 });
    assert_eq!(outcome.names, vec![(1, "Alice".to_string())]);
    assert!(sink.is_empty(), "unexpected diagnostics: {:?}", sink.lines());
}

#[tokio::test]
async fn broadcast_reaches_everyone_and_unicast_only_the_master() {
    let dir = TempDir::new().unwrap();
    let (master_out, p1_out, p2_out) = (out(&dir, "master"), out(&dir, "p1"), out(&dir, "p2"));
    let master = player(
        &dir,
        "master",
        &format!(
            r##"echo "BEGIN"
while read line; do
  echo "$line" >> {out}
  [ "$line" = "1 bar" ] && break
done
while :; do
  echo "#players"
  read reply
  [ "$reply" = "#players 2" ] && break
  sleep 0.05
done
echo "#quit"
while read line; do :; done"##,
            out = master_out.display()
        ),
    );
    let p1 = player(
        &dir,
        "p1",
        &format!(
            r##"read line
echo "$line" >> {out}
echo "#name one"
echo "bar"
while read line; do echo "$line" >> {out}; done"##,
            out = p1_out.display()
        ),
    );
    let p2 = player(
        &dir,
        "p2",
        &format!(
            r##"read line
echo "$line" >> {out}
echo "#name two"
while read line; do echo "$line" >> {out}; done"##,
            out = p2_out.display()
        ),
    );

    let sink = RecordingSink::new();
    let outcome = play(vec![master, p1, p2], &sink).await.unwrap();
    assert_eq!(outcome.reason, EndReason::Quit { by: 0 });

    assert_eq!(lines(&master_out), vec!["BEGIN", "1 bar"]);
    for path in [&p1_out, &p2_out] {
        let seen = lines(path);
        assert_eq!(seen.first().map(String::as_str), Some("BEGIN"));
        assert!(!seen.iter().any(|l| l.contains("bar")), "leaked: {seen:?}");
    }
    assert_eq!(outcome.stats.broadcasts, 1);
    assert_eq!(outcome.stats.forwarded, 1);
}

#[tokio::test]
async fn first_exit_ends_match_and_kills_the_rest() {
    let dir = TempDir::new().unwrap();
    let master = player(&dir, "master", "while read line; do :; done");
    let quitter = player(&dir, "quitter", "exit 3");
    let waiter = player(&dir, "waiter", "while read line; do :; done");

    let sink = RecordingSink::new();
    let started = Instant::now();
    let outcome = play(vec![master, quitter, waiter], &sink).await.unwrap();

    match outcome.reason {
        EndReason::PlayerExited { id, status } => {
            assert_eq!(id, 1);
            assert_eq!(status.and_then(|s| s.code()), Some(3));
        }
        other => panic!("unexpected end: {other:?}"),
    }
    assert_eq!(outcome.killed, vec![0, 2]);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn stderr_is_not_routed() {
    let dir = TempDir::new().unwrap();
    let p1_out = out(&dir, "p1");
    let master = player(
        &dir,
        "master",
        "echo \"SECRET\" >&2\necho \"#quit\"\nwhile read line; do :; done",
    );
    let p1 = player(
        &dir,
        "p1",
        &format!(
            "while read line; do echo \"$line\" >> {}; done",
            p1_out.display()
        ),
    );

    let sink = RecordingSink::new();
    let outcome = play(vec![master, p1], &sink).await.unwrap();

    assert_eq!(outcome.reason, EndReason::Quit { by: 0 });
    assert!(!lines(&p1_out).iter().any(|l| l.contains("SECRET")));
    assert_eq!(outcome.stats.broadcasts, 0);
}

#[tokio::test]
async fn malformed_commands_are_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let master = player(
        &dir,
        "master",
        "echo \"#name server\"\necho \"#getname\"\necho \"#getname zz\"\necho \"#name\"\necho \"#quit\"\nwhile read line; do :; done",
    );

    let sink = RecordingSink::new();
    let outcome = play(vec![master], &sink).await.unwrap();

    assert_eq!(outcome.reason, EndReason::Quit { by: 0 });
    assert_eq!(outcome.stats.malformed, 3);
    let diagnostics = sink.lines();
    assert_eq!(diagnostics.len(), 3);
    assert!(diagnostics.iter().all(|d| d.starts_with("'server' (id 0): ")));
    assert_eq!(outcome.names, vec![(0, "server".to_string())]);
}

#[tokio::test]
async fn missing_player_binary_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let master = player(&dir, "master", "echo \"#quit\"\nwhile read line; do :; done");

    let sink = RecordingSink::new();
    let outcome = play(
        vec![master, "/nonexistent/gamemaster-player".to_string()],
        &sink,
    )
    .await
    .unwrap();

    assert_eq!(outcome.reason, EndReason::Quit { by: 0 });
    assert_eq!(sink.len(), 1);
    assert!(sink.lines()[0].contains("player 1 (regular)"));
}

#[tokio::test]
async fn commands_written_after_quit_are_drained() {
    let dir = TempDir::new().unwrap();
    let master = player(
        &dir,
        "master",
        "printf '#quit\\n#name late\\n'\nwhile read line; do :; done",
    );
    let p1 = player(&dir, "p1", "while read line; do :; done");

    let sink = RecordingSink::new();
    let outcome = play(vec![master, p1], &sink).await.unwrap();

    assert_eq!(outcome.reason, EndReason::Quit { by: 0 });
    assert!(outcome.names.contains(&(0, "late".to_string())));
}

#[tokio::test]
async fn master_last_words_reach_players() {
    let dir = TempDir::new().unwrap();
    let p1_out = out(&dir, "p1");
    // Closing stdout before exiting leaves the reader time to queue the line.
    let master = player(
        &dir,
        "master",
        "echo \"GAME OVER\"\nexec >&-\nsleep 0.3\nexit 0",
    );
    let p1 = player(
        &dir,
        "p1",
        &format!(
            "while read line; do echo \"$line\" >> {}; done",
            p1_out.display()
        ),
    );

    let sink = RecordingSink::new();
    let outcome = play(vec![master, p1], &sink).await.unwrap();

    match outcome.reason {
        EndReason::PlayerExited { id, status } => {
            assert_eq!(id, 0);
            assert!(status.is_some_and(|s| s.success()));
        }
        other => panic!("unexpected end: {other:?}"),
    }
    assert_eq!(outcome.stats.broadcasts, 1);
    assert_eq!(lines(&p1_out), vec!["GAME OVER"]);
    assert_eq!(outcome.killed, vec![1]);
}
