//! The host tick loop.
//!
//! Each tick drains console commands, counts down the border ignore window
//! and gives the fill job its batch. All world work happens on this thread.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use pregen_common::{ActorId, DurableFlush};
use pregen_job::{CheckpointStore, FillCommand, JobPhase, JobSupervisor, SupervisorEvent};
use pregen_world::{ChunkManager, GeneratorConfig, StreamingConfig, WorldGenerator};
use tracing::{debug, info, warn};

use crate::border::{BorderGuard, Position, WorldBorder};
use crate::config::EngineConfig;
use crate::console::{self, CommandResult, ConsoleCommand};
use crate::restart::HostRestart;
use crate::timing::TickClock;

/// Why the tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerExit {
    /// An operator stopped the server
    Stopped,
    /// The fill job asked for a process restart
    Restart {
        /// Exit code to leave with
        code: i32,
    },
}

/// The host: world, border and fill job driven from one tick loop.
pub struct Server {
    config: EngineConfig,
    world: Arc<ChunkManager>,
    border: BorderGuard,
    supervisor: JobSupervisor<Arc<ChunkManager>, HostRestart>,
    positions: HashMap<ActorId, Position>,
    commands: Option<Receiver<String>>,
    stopping: bool,
}

impl Server {
    /// Opens the world under `data_dir` and resumes a checkpointed job.
    pub fn new(config: EngineConfig, data_dir: &Path) -> Self {
        let world = Arc::new(ChunkManager::new(
            StreamingConfig {
                save_dir: data_dir.join(&config.world.save_dir),
                max_loaded_chunks: config.world.max_loaded_chunks,
                chunk_size: config.world.chunk_size,
            },
            WorldGenerator::new(GeneratorConfig {
                seed: config.world.seed,
                chunk_size: config.world.chunk_size,
                ..GeneratorConfig::default()
            }),
        ));

        let border = WorldBorder::new(&config.border);
        info!("{}", border.describe());

        let store = CheckpointStore::in_dir(data_dir, &config.job.checkpoint_file);
        let policy = HostRestart::new(config.server.restart_mode, Arc::clone(&world));
        let mut supervisor = JobSupervisor::new(Arc::clone(&world), store, config.job.clone(), policy);
        supervisor.bootstrap();

        Self {
            config,
            world,
            border: BorderGuard::new(border),
            supervisor,
            positions: HashMap::new(),
            commands: None,
            stopping: false,
        }
    }

    /// Feeds console lines from `commands` into the loop.
    pub fn with_commands(mut self, commands: Receiver<String>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Runs ticks at the configured rate until stopped or restarted.
    pub fn run(&mut self) -> ServerExit {
        let mut clock = TickClock::new(self.config.server.tick_rate);
        info!(
            "Server running at {} ticks per second, step restarts wait {:?}",
            clock.tick_rate(),
            clock.ticks_to_duration(self.config.job.restart_delay_ticks)
        );
        loop {
            clock.wait_for_next_tick();
            if let Some(exit) = self.tick() {
                info!("Server loop ended after {} ticks", clock.ticks());
                return exit;
            }
        }
    }

    /// Runs one tick. Returns why the loop must end, if it must.
    pub fn tick(&mut self) -> Option<ServerExit> {
        for line in self.pending_commands() {
            match ConsoleCommand::parse(&line) {
                Ok(Some(command)) => self.execute(command).report(),
                Ok(None) => {},
                Err(message) => CommandResult::err(message).report(),
            }
        }

        if self.stopping {
            self.save_world();
            return Some(ServerExit::Stopped);
        }

        self.border.tick();

        match self.supervisor.tick() {
            SupervisorEvent::Restarted(outcome) => debug!("Restart policy finished: {outcome:?}"),
            SupervisorEvent::Completed(_) => info!("Fill job finished, chunks are on disk after the next save"),
            _ => {},
        }

        if self.supervisor.phase() == JobPhase::Terminated {
            return Some(ServerExit::Restart {
                code: self.config.server.exit_code,
            });
        }
        None
    }

    /// Runs a console command.
    pub fn execute(&mut self, command: ConsoleCommand) -> CommandResult {
        match command {
            ConsoleCommand::Fill(args) => self.start_fill(&args),
            ConsoleCommand::Status => self.status(),
            ConsoleCommand::Save => match self.world.flush_all() {
                Ok(saved) => CommandResult::ok_msg(format!("Saved {saved} chunks")),
                Err(e) => CommandResult::err(format!("Save failed: {e}")),
            },
            ConsoleCommand::Teleport { actor, x, z } => self.teleport(actor, (x, z)),
            ConsoleCommand::Stop => {
                self.stopping = true;
                CommandResult::ok_msg("Stopping the server")
            },
            ConsoleCommand::Help(name) => console::help(name.as_deref()),
        }
    }

    /// The fill job supervisor.
    #[cfg(test)]
    pub fn supervisor(&self) -> &JobSupervisor<Arc<ChunkManager>, HostRestart> {
        &self.supervisor
    }

    /// The world.
    #[cfg(test)]
    pub fn world(&self) -> &Arc<ChunkManager> {
        &self.world
    }

    fn pending_commands(&self) -> Vec<String> {
        self.commands
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }

    fn start_fill(&mut self, args: &[String]) -> CommandResult {
        let command = FillCommand::parse(args, &self.config.job);
        let bounds = self.border.border().chunk_bounds();
        match self.supervisor.start(command, bounds) {
            Ok(ack) => CommandResult::ok_msg(ack.to_string()),
            Err(e) => CommandResult::err(e.to_string()),
        }
    }

    fn status(&self) -> CommandResult {
        let mut lines = match self.supervisor.state() {
            Some(state) => vec![
                format!("Fill job {:?}", self.supervisor.phase()),
                state.summary(),
            ],
            None => vec!["No fill job is running".to_string()],
        };
        lines.push(format!("{} chunks loaded", self.world.loaded_count()));
        let ignored = self.border.ignore_window();
        if !ignored.is_empty() {
            lines.push(format!("{} actors ignored by the border", ignored.len()));
        }
        CommandResult::ok(lines)
    }

    fn teleport(&mut self, actor: ActorId, to: Position) -> CommandResult {
        let from = self.positions.get(&actor).copied().unwrap_or((0.0, 0.0));
        let landed = self
            .border
            .on_move(actor, from, to, self.world.as_ref())
            .unwrap_or(to);
        self.positions.insert(actor, landed);

        if landed == to {
            CommandResult::ok_msg(format!("Moved {actor} to ({}, {})", to.0, to.1))
        } else {
            CommandResult::ok_msg(format!(
                "{actor} crossed the border and was moved to ({}, {})",
                landed.0, landed.1
            ))
        }
    }

    fn save_world(&self) {
        match self.world.flush_all() {
            Ok(saved) => info!("Saved {saved} chunks before stopping"),
            Err(e) => warn!("Failed to save the world before stopping: {e}"),
        }
    }
}
