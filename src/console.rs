//! # Operator console: line grammar and command dispatch.
//!
//! One command per line, whitespace separated, case-insensitive.
//!
//! ```text
//! Command | Arguments    | Description
//! --------+--------------+--------------------------------------------
//!   h     |              | print help
//!   li    |              | list running things
//!   nt    | [type qty]   | new thing(s); no args = one, rotating type
//!   st    | type         | stop things by type
//!   si    | id           | stop thing by id
//!   sa    |              | stop all things, keep running
//!   q     |              | stop all things and exit (alias: stop)
//! ```
//!
//! [`parse_command`] is pure; [`Console::dispatch`] runs a line against a
//! [`Supervisor`] and turns every outcome into operator-facing text.

use std::fmt::Write as _;

use tracing::{info, warn};

use crate::core::Supervisor;
use crate::error::{CommandError, SupervisorError};
use crate::things::{ThingId, ThingInfo, ThingKind};

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `h`
    Help,
    /// `li`
    List,
    /// `nt` without arguments.
    NewDefault,
    /// `nt <type> <qty>`
    New {
        /// Kind to create.
        kind: ThingKind,
        /// How many.
        qty: usize,
    },
    /// `st <type>`
    StopKind(ThingKind),
    /// `si <id>`
    StopId(ThingId),
    /// `sa`
    StopAll,
    /// `q` / `stop`
    Quit,
}

/// Parses one console line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let lower = line.to_ascii_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Err(CommandError::Empty);
    };

    match (head, args) {
        ("h", _) => Ok(Command::Help),
        ("li", _) => Ok(Command::List),
        ("nt", []) => Ok(Command::NewDefault),
        ("nt", [kind, qty]) => {
            let qty = qty
                .parse::<usize>()
                .map_err(|_| CommandError::NotANumber(qty.to_string()))?;
            Ok(Command::New {
                kind: parse_kind(kind)?,
                qty,
            })
        }
        ("nt", _) => Err(CommandError::Arity("nt")),
        ("st", [kind]) => Ok(Command::StopKind(parse_kind(kind)?)),
        ("st", _) => Err(CommandError::Arity("st")),
        ("si", [id]) => id
            .parse::<ThingId>()
            .map(Command::StopId)
            .map_err(|_| CommandError::NotANumber(id.to_string())),
        ("si", _) => Err(CommandError::Arity("si")),
        ("sa", _) => Ok(Command::StopAll),
        ("q" | "stop", _) => Ok(Command::Quit),
        (other, _) => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_kind(word: &str) -> Result<ThingKind, CommandError> {
    word.parse().map_err(|_| CommandError::InvalidKind(word.to_string()))
}

/// Help menu text.
pub fn help_text() -> &'static str {
    "\
Command | Arguments       | Description
--------+-----------------+---------------------------------------------
   h    |                 | print this help menu
   li   |                 | list all things running/publishing
   nt   | <type> <qty>    | new thing(s) by <type>, qty 0-100
   nt   |                 | one new thing, type rotates on every call
   st   | <type>          | stop things by type
   si   | <id>            | stop thing by id number
   sa   |                 | stop all things, do NOT exit program
   q    |                 | stop all things, exit program (alias: stop)
--------+-----------------+---------------------------------------------
valid thing <type> -> [b=battery, i=inverter, l=light]
"
}

/// Renders the roster as a fixed-width table followed by a total line.
pub fn render_roster(rows: &[ThingInfo]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        " {:<7}| {:<13}| {:<26}| {:<10}",
        "ID", "ThingType", "CreatedOn", "Events"
    );
    let _ = writeln!(out, "{}", "-".repeat(64));
    for row in rows {
        let _ = writeln!(
            out,
            " {:<7}| {:<13}| {:<26}| {:<10}",
            row.id,
            row.kind.as_str(),
            row.created_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            row.events
        );
    }
    let _ = writeln!(out, "({} total thing(s) running)", rows.len());
    out
}

/// Result of dispatching one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Text for the operator.
    pub text: String,
    /// The host should exit after printing `text`.
    pub exit: bool,
}

impl Outcome {
    fn say(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit: false,
        }
    }
}

/// Console session state.
///
/// Holds the kind used by the next argument-less `nt`.
#[derive(Debug, Clone)]
pub struct Console {
    next_default: ThingKind,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            next_default: ThingKind::BatteryPack,
        }
    }
}

impl Console {
    /// Creates a session whose first default `nt` creates a battery pack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and executes one line; errors become operator-facing text.
    pub async fn dispatch(&mut self, sup: &Supervisor, line: &str) -> Outcome {
        let cmd = match parse_command(line) {
            Ok(cmd) => cmd,
            Err(err) => {
                warn!(label = err.as_label(), "rejected console input");
                return Outcome::say(err.to_string());
            }
        };
        match self.execute(sup, cmd).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_lookup_miss() => {
                info!(label = err.as_label(), error = %err, "nothing to stop");
                Outcome::say(format!("error: {err}"))
            }
            Err(err) => {
                warn!(label = err.as_label(), error = %err, "console command failed");
                Outcome::say(format!("error: {err}"))
            }
        }
    }

    /// Executes a parsed command.
    pub async fn execute(
        &mut self,
        sup: &Supervisor,
        cmd: Command,
    ) -> Result<Outcome, SupervisorError> {
        match cmd {
            Command::Help => Ok(Outcome::say(help_text())),
            Command::List => Ok(Outcome::say(render_roster(&sup.roster().await))),
            Command::NewDefault => {
                let kind = self.next_default;
                let ids = sup.create(kind, 1).await?;
                self.next_default = kind.next();
                Ok(Outcome::say(format!("created 1 {kind} (id {})", join_ids(&ids))))
            }
            Command::New { kind, qty } => {
                let ids = sup.create(kind, qty).await?;
                if ids.is_empty() {
                    return Ok(Outcome::say("nothing to create"));
                }
                Ok(Outcome::say(format!(
                    "created {} {kind} (ids {})",
                    ids.len(),
                    join_ids(&ids)
                )))
            }
            Command::StopKind(kind) => {
                let stopped = sup.stop_by_kind(kind).await?;
                Ok(Outcome::say(format!("stopped {} {kind}", stopped.len())))
            }
            Command::StopId(id) => {
                let info = sup.stop_by_id(id).await?;
                Ok(Outcome::say(format!(
                    "stopped {} {} after {} event(s)",
                    info.kind, info.id, info.events
                )))
            }
            Command::StopAll => {
                let report = sup.stop_all(false).await?;
                Ok(Outcome::say(format!("stopped {} thing(s)", report.stopped.len())))
            }
            Command::Quit => {
                let report = sup.stop_all(true).await?;
                let written = report.drain.map(|d| d.written).unwrap_or(0);
                Ok(Outcome {
                    text: format!(
                        "stopped {} thing(s), {written} event(s) written, exiting",
                        report.stopped.len()
                    ),
                    exit: true,
                })
            }
        }
    }
}

/// Comma-separated ids; concurrent creates may interleave, so no ranges.
fn join_ids(ids: &[ThingId]) -> String {
    ids.iter()
        .map(ThingId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, Phase};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    #[test]
    fn parses_every_command() {
        assert_eq!(parse_command("h"), Ok(Command::Help));
        assert_eq!(parse_command("  LI  "), Ok(Command::List));
        assert_eq!(parse_command("nt"), Ok(Command::NewDefault));
        assert_eq!(
            parse_command("nt b 5"),
            Ok(Command::New {
                kind: ThingKind::BatteryPack,
                qty: 5
            })
        );
        assert_eq!(parse_command("st l"), Ok(Command::StopKind(ThingKind::Light)));
        assert_eq!(parse_command("si 42"), Ok(Command::StopId(42)));
        assert_eq!(parse_command("sa"), Ok(Command::StopAll));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert_eq!(parse_command("stop"), Ok(Command::Quit));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(parse_command("xyz"), Err(CommandError::Unknown("xyz".into())));
        assert_eq!(parse_command("nt b"), Err(CommandError::Arity("nt")));
        assert_eq!(parse_command("si"), Err(CommandError::Arity("si")));
        assert_eq!(parse_command("st"), Err(CommandError::Arity("st")));
        assert_eq!(parse_command("nt b many"), Err(CommandError::NotANumber("many".into())));
        assert_eq!(parse_command("nt b -1"), Err(CommandError::NotANumber("-1".into())));
        assert_eq!(parse_command("si x"), Err(CommandError::NotANumber("x".into())));
        assert_eq!(parse_command("nt toaster 1"), Err(CommandError::InvalidKind("toaster".into())));
    }

    #[test]
    fn roster_table() {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let rows = vec![
            ThingInfo {
                id: 1,
                kind: ThingKind::BatteryPack,
                created_at,
                events: 12,
            },
            ThingInfo {
                id: 2,
                kind: ThingKind::Light,
                created_at,
                events: 0,
            },
        ];
        let text = render_roster(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].contains("BatteryPack"));
        assert!(lines[2].contains("2024-05-01T12:00:00Z"));
        assert!(lines[2].contains("12"));
        assert_eq!(lines[4], "(2 total thing(s) running)");
    }

    #[test]
    fn help_lists_every_command() {
        for cmd in ["h ", "li", "nt", "st", "si", "sa", "q "] {
            assert!(help_text().contains(cmd), "missing {cmd}");
        }
    }

    async fn supervisor() -> Supervisor {
        let cfg =
            Config::default().with_delays(Duration::from_millis(1), Duration::from_millis(10));
        let sup = Supervisor::new(cfg);
        sup.configure(tokio::io::sink()).await.unwrap();
        sup
    }

    #[tokio::test]
    async fn default_new_rotates_kinds() {
        let sup = supervisor().await;
        let mut console = Console::new();
        for _ in 0..4 {
            let out = console.dispatch(&sup, "nt").await;
            assert!(!out.exit);
        }
        let kinds: Vec<_> = sup.roster().await.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ThingKind::BatteryPack,
                ThingKind::Inverter,
                ThingKind::Light,
                ThingKind::BatteryPack
            ]
        );
        sup.stop_all(true).await.unwrap();
    }

    #[tokio::test]
    async fn errors_become_text() {
        let sup = supervisor().await;
        let mut console = Console::new();

        let out = console.dispatch(&sup, "si 999").await;
        assert_eq!(out.text, "error: no thing with id 999");
        assert!(!out.exit);

        let out = console.dispatch(&sup, "nt b 101").await;
        assert!(out.text.contains("maximum quantity"));
        assert!(sup.roster().await.is_empty());

        let out = console.dispatch(&sup, "bogus").await;
        assert!(out.text.contains("unrecognized"));
        sup.stop_all(true).await.unwrap();
    }

    #[tokio::test]
    async fn session_flow() {
        let sup = supervisor().await;
        let mut console = Console::new();

        let out = console.dispatch(&sup, "nt l 3").await;
        assert_eq!(out.text, "created 3 Light (ids 1, 2, 3)");
        console.dispatch(&sup, "nt i 1").await;

        let out = console.dispatch(&sup, "li").await;
        assert!(out.text.contains("(4 total thing(s) running)"));

        let out = console.dispatch(&sup, "st l").await;
        assert_eq!(out.text, "stopped 3 Light");

        let out = console.dispatch(&sup, "sa").await;
        assert_eq!(out.text, "stopped 1 thing(s)");
        assert_eq!(sup.phase().await, Phase::Configured);

        let out = console.dispatch(&sup, "q").await;
        assert!(out.exit);
        assert_eq!(sup.phase().await, Phase::Terminated);

        let out = console.dispatch(&sup, "q").await;
        assert!(!out.exit);
        assert_eq!(out.text, "error: supervisor is shutting down");
    }

    #[test]
    fn ids_are_listed_not_ranged() {
        assert_eq!(join_ids(&[]), "");
        assert_eq!(join_ids(&[7]), "7");
        assert_eq!(join_ids(&[1, 4, 9]), "1, 4, 9");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_report_their_own_ids() {
        let sup = std::sync::Arc::new(supervisor().await);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let sup = sup.clone();
            handles.push(tokio::spawn(async move {
                Console::new().dispatch(&sup, "nt b 5").await.text
            }));
        }

        let mut reported = Vec::new();
        for h in handles {
            let text = h.await.unwrap();
            let list = text
                .strip_prefix("created 5 BatteryPack (ids ")
                .and_then(|t| t.strip_suffix(')'))
                .unwrap();
            reported.extend(list.split(", ").map(|id| id.parse::<ThingId>().unwrap()));
        }
        reported.sort_unstable();
        let roster: Vec<_> = sup.roster().await.iter().map(|r| r.id).collect();
        assert_eq!(reported, roster);
        sup.stop_all(true).await.unwrap();
    }

    #[tokio::test]
    async fn lookup_misses_are_reported_without_state_change() {
        let sup = supervisor().await;
        let mut console = Console::new();
        console.dispatch(&sup, "nt i 1").await;

        let out = console.dispatch(&sup, "st l").await;
        assert_eq!(out.text, "error: no thing(s) of type Light running");
        assert_eq!(sup.roster().await.len(), 1);
        sup.stop_all(true).await.unwrap();
    }
}
