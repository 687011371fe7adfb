//! Operator console: text commands read from stdin and handed to the tick
//! loop over a channel.

use crossbeam_channel::{Receiver, Sender};
use pregen_common::ActorId;
use std::io::BufRead;
use tracing::{debug, info, warn};

/// A console command definition, listed by `help`.
#[derive(Debug, Clone, Copy)]
pub struct CommandDef {
    /// Command name
    pub name: &'static str,
    /// Usage string
    pub usage: &'static str,
    /// What it does
    pub description: &'static str,
}

/// Commands the console understands.
pub const COMMANDS: &[CommandDef] = &[
    CommandDef {
        name: "fill",
        usage: "fill [freq] [pad] [step]",
        description: "Start pre-generating every chunk inside the border",
    },
    CommandDef {
        name: "status",
        usage: "status",
        description: "Show the progress of the fill job",
    },
    CommandDef {
        name: "save",
        usage: "save",
        description: "Write all loaded chunks to disk",
    },
    CommandDef {
        name: "teleport",
        usage: "teleport <actor> <x> <z>",
        description: "Move an actor, applying the world border",
    },
    CommandDef {
        name: "stop",
        usage: "stop",
        description: "Save the world and stop the server",
    },
    CommandDef {
        name: "help",
        usage: "help [command]",
        description: "List commands or show the usage of one",
    },
];

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Start a fill job with raw positional arguments
    Fill(Vec<String>),
    /// Print job progress
    Status,
    /// Flush the world
    Save,
    /// Move an actor
    Teleport {
        /// Actor to move
        actor: ActorId,
        /// Target X in blocks
        x: f64,
        /// Target Z in blocks
        z: f64,
    },
    /// Shut down
    Stop,
    /// Show help, optionally for one command
    Help(Option<String>),
}

impl ConsoleCommand {
    /// Parses one console line. Blank lines give `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = parts.split_first() else {
            return Ok(None);
        };

        let parsed = match command.to_ascii_lowercase().as_str() {
            "fill" => Self::Fill(args.iter().map(|a| (*a).to_string()).collect()),
            "status" => Self::Status,
            "save" | "save-all" => Self::Save,
            "stop" => Self::Stop,
            "help" | "?" => Self::Help(args.first().map(|a| (*a).to_string())),
            "teleport" | "tp" => {
                let [actor, x, z] = args else {
                    return Err(usage_of("teleport"));
                };
                let actor = actor
                    .parse::<u64>()
                    .map_err(|_| format!("Not an actor id: {actor}"))?;
                let x = parse_coordinate(x)?;
                let z = parse_coordinate(z)?;
                Self::Teleport {
                    actor: ActorId::from_raw(actor),
                    x,
                    z,
                }
            },
            other => return Err(format!("Unknown command: {other}. Type 'help' for a list.")),
        };
        Ok(Some(parsed))
    }
}

fn parse_coordinate(text: &str) -> Result<f64, String> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Not a coordinate: {text}"))
}

fn usage_of(name: &str) -> String {
    COMMANDS
        .iter()
        .find(|c| c.name == name)
        .map_or_else(|| format!("Unknown command: {name}"), |c| format!("Usage: {}", c.usage))
}

/// Output of a console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Lines to show the operator
    pub output: Vec<String>,
    /// Whether the command was successful
    pub success: bool,
}

impl CommandResult {
    /// Creates a successful result with output.
    #[must_use]
    pub fn ok(output: Vec<String>) -> Self {
        Self {
            output,
            success: true,
        }
    }

    /// Creates a successful result with a single message.
    #[must_use]
    pub fn ok_msg(msg: impl Into<String>) -> Self {
        Self::ok(vec![msg.into()])
    }

    /// Creates an error result.
    #[must_use]
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            output: vec![msg.into()],
            success: false,
        }
    }

    /// Writes the output to the log.
    pub fn report(&self) {
        for line in &self.output {
            if self.success {
                info!("{line}");
            } else {
                warn!("{line}");
            }
        }
    }
}

/// Help command implementation.
#[must_use]
pub fn help(command: Option<&str>) -> CommandResult {
    if let Some(name) = command {
        return match COMMANDS.iter().find(|c| c.name == name) {
            Some(cmd) => CommandResult::ok(vec![
                format!("{}: {}", cmd.name, cmd.description),
                format!("Usage: {}", cmd.usage),
            ]),
            None => CommandResult::err(format!("Unknown command: {name}")),
        };
    }

    let mut lines = vec!["Available commands:".to_string()];
    for cmd in COMMANDS {
        lines.push(format!("  {} - {}", cmd.usage, cmd.description));
    }
    CommandResult::ok(lines)
}

/// Reads console lines from stdin on a background thread.
///
/// The channel disconnects when stdin closes.
pub fn spawn_stdin_reader() -> std::io::Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || read_lines(std::io::stdin().lock(), &tx))?;
    Ok(rx)
}

fn read_lines<R: BufRead>(input: R, tx: &Sender<String>) {
    for line in input.lines() {
        match line {
            Ok(line) => {
                if tx.send(line).is_err() {
                    break;
                }
            },
            Err(e) => {
                warn!("Console input failed: {e}");
                break;
            },
        }
    }
    debug!("Console input closed");
}
