//! Manual trigger commands read from stdin.
//!
//! Typing `pocketnews` (or `check`) runs a check right away, outside the
//! timer schedule. Each command is handled on its own task so the reader
//! keeps accepting input while a check is in flight; a second command during
//! a pass is answered with "already in progress".

use crate::dispatch::Dispatcher;
use crate::scheduler::{Responder, Scheduler};
use crate::scrapers::PageFetcher;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

pub const COMMAND_NAME: &str = "pocketnews";

const HELP: &str = "Commands: pocketnews (check for new articles now), help";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Check,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `None`. A leading `/` is
    /// accepted so slash-command muscle memory works.
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.trim().trim_start_matches('/');
        if word.is_empty() {
            return None;
        }
        Some(match word.to_ascii_lowercase().as_str() {
            COMMAND_NAME | "check" => Command::Check,
            "help" | "?" => Command::Help,
            _ => Command::Unknown(word.to_string()),
        })
    }
}

/// Writes trigger replies to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleResponder;

impl Responder for ConsoleResponder {
    async fn ack(&self, message: &str) {
        println!("{message}");
    }

    async fn follow_up(&self, message: &str) {
        println!("{message}");
    }
}

/// Read commands from stdin until EOF.
pub fn spawn_stdin<F, D>(scheduler: Scheduler<F, D>) -> JoinHandle<()>
where
    F: PageFetcher + 'static,
    D: Dispatcher + 'static,
{
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        read_commands(stdin, scheduler, ConsoleResponder).await;
    })
}

/// Dispatch each command line from `input` until it is exhausted, then wait
/// for the checks it started.
pub async fn read_commands<I, F, D, R>(input: I, scheduler: Scheduler<F, D>, responder: R)
where
    I: AsyncBufRead + Unpin,
    F: PageFetcher + 'static,
    D: Dispatcher + 'static,
    R: Responder + Clone + 'static,
{
    let mut lines = input.lines();
    let mut checks = JoinSet::new();
    info!("Console ready; type `{COMMAND_NAME}` to check now");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Console input failed; manual trigger disabled");
                break;
            }
        };

        match Command::parse(&line) {
            None => {}
            Some(Command::Check) => {
                debug!("Manual trigger received");
                reap(&mut checks);
                let scheduler = scheduler.clone();
                let responder = responder.clone();
                checks.spawn(async move {
                    scheduler.trigger(&responder).await;
                });
            }
            Some(Command::Help) => responder.follow_up(HELP).await,
            Some(Command::Unknown(word)) => {
                responder
                    .follow_up(&format!("Unknown command `{word}`. {HELP}"))
                    .await
            }
        }
    }

    debug!(in_flight = checks.len(), "Console input closed");
    while let Some(res) = checks.join_next().await {
        log_join(res);
    }
}

/// Drop finished checks from `checks`. Returns how many were removed.
fn reap(checks: &mut JoinSet<()>) -> usize {
    let mut reaped = 0;
    while let Some(res) = checks.try_join_next() {
        log_join(res);
        reaped += 1;
    }
    reaped
}

fn log_join(res: Result<(), JoinError>) {
    if let Err(e) = res {
        if e.is_panic() {
            error!(error = %e, "Manual check panicked");
        }
    }
}
