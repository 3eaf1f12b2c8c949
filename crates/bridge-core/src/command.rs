//! Command surface
//!
//! Parses the line-oriented commands understood by the interactive front end
//! and renders orchestration results as status text.

use std::fmt::Write;
use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};
use crate::orchestrator::{BridgeOrchestrator, BridgeOutcome, MIN_DIAL_PARTICIPANTS, is_bridge_id};

/// Help text printed by `help`
pub const USAGE: &str = "\
Commands:
  dial <ext> <ext> [<ext>...]    bridge two extensions as a call, three or more as a conference
  join <bridge-id> <ext> [...]   add extensions to an existing bridge
  list                           show active bridges, pruning empty ones
  help                           show this text
  exit                           quit";

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dial(Vec<String>),
    Join {
        bridge_id: String,
        addresses: Vec<String>,
    },
    List,
    Help,
    Exit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> BridgeResult<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<String> = words.map(str::to_string).collect();

        let command = match verb.to_ascii_lowercase().as_str() {
            "dial" => {
                if args.len() < MIN_DIAL_PARTICIPANTS {
                    return Err(BridgeError::malformed(
                        "dial needs at least two extensions: dial <ext> <ext> [<ext>...]",
                    ));
                }
                Self::Dial(args)
            }
            "join" => {
                let mut args = args.into_iter();
                let bridge_id = args.next().ok_or_else(|| {
                    BridgeError::malformed("join needs a bridge id: join <bridge-id> <ext> [...]")
                })?;
                if !is_bridge_id(&bridge_id) {
                    return Err(BridgeError::malformed(format!(
                        "'{}' is not a bridge id; bridge ids contain letters",
                        bridge_id
                    )));
                }
                let addresses: Vec<String> = args.collect();
                if addresses.is_empty() {
                    return Err(BridgeError::malformed(
                        "join needs at least one extension: join <bridge-id> <ext> [...]",
                    ));
                }
                Self::Join {
                    bridge_id,
                    addresses,
                }
            }
            "list" | "ls" => Self::List,
            "help" | "?" => Self::Help,
            "exit" | "quit" => Self::Exit,
            other => {
                return Err(BridgeError::malformed(format!(
                    "unknown command '{}', type 'help' for the list of commands",
                    other
                )));
            }
        };
        Ok(Some(command))
    }
}

/// Maps commands onto the orchestrator
pub struct CommandSurface {
    orchestrator: Arc<BridgeOrchestrator>,
}

impl CommandSurface {
    pub fn new(orchestrator: Arc<BridgeOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &BridgeOrchestrator {
        &self.orchestrator
    }

    /// Run a command and describe the result. `Exit` is left to the caller.
    pub async fn execute(&self, command: Command) -> BridgeResult<String> {
        match command {
            Command::Dial(addresses) => {
                let outcome = self.orchestrator.dial(&addresses).await?;
                Ok(describe_dial(&outcome))
            }
            Command::Join {
                bridge_id,
                addresses,
            } => {
                let outcome = self.orchestrator.join(&bridge_id, &addresses).await?;
                Ok(describe_join(&outcome))
            }
            Command::List => {
                let bridges = self.orchestrator.list().await?;
                if bridges.is_empty() {
                    return Ok("No active bridges".to_string());
                }
                let mut out = format!("{} active bridge(s):", bridges.len());
                for bridge in bridges {
                    let _ = write!(out, "\n  {}", bridge);
                }
                Ok(out)
            }
            Command::Help => Ok(USAGE.to_string()),
            Command::Exit => Ok("Bye".to_string()),
        }
    }

    /// Parse and execute one line. Blank lines produce no output.
    pub async fn handle_line(&self, line: &str) -> BridgeResult<Option<String>> {
        match Command::parse(line)? {
            Some(command) => self.execute(command).await.map(Some),
            None => Ok(None),
        }
    }
}

fn describe_dial(outcome: &BridgeOutcome) -> String {
    let kind = outcome
        .kind
        .map(|k| k.to_string())
        .unwrap_or_else(|| "bridge".to_string());
    let mut out = if outcome.attached.is_empty() {
        format!("No extension answered; {} bridge {} is empty", kind, outcome.bridge_id)
    } else {
        format!(
            "Extensions {} bridged in {} {}",
            outcome.attached_addresses().join(", "),
            kind,
            outcome.bridge_id
        )
    };
    append_failures(&mut out, outcome);
    out
}

fn describe_join(outcome: &BridgeOutcome) -> String {
    let mut out = if outcome.attached.is_empty() {
        format!("No extension added to bridge {}", outcome.bridge_id)
    } else {
        format!(
            "Extensions {} added to bridge {}",
            outcome.attached_addresses().join(", "),
            outcome.bridge_id
        )
    };
    append_failures(&mut out, outcome);
    out
}

fn append_failures(out: &mut String, outcome: &BridgeOutcome) {
    for failure in &outcome.failed {
        let _ = write!(out, "\n  {} failed: {}", failure.address, failure.error);
    }
}
