//! Single-job lock and the tick-driven lifecycle of a fill job.

use pregen_common::{ChunkBounds, ChunkPopulator, DurableFlush};
use tracing::{info, warn};

use crate::bootstrap::{Resume, ResumeBootstrapper};
use crate::checkpoint::CheckpointStore;
use crate::command::{FillCommand, StartAck};
use crate::config::JobConfig;
use crate::error::StartError;
use crate::restart::{RestartCoordinator, RestartOutcome, RestartPolicy, Rewind};
use crate::scheduler::{StepScheduler, TickOutcome, TickReport};
use crate::state::JobState;

/// Lifecycle phase of the supervised job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// No job; a start command is accepted
    Idle,
    /// Job loaded, waiting for the host to settle
    WarmingUp {
        /// Ticks left to wait
        remaining: u32,
    },
    /// One batch per tick
    Running,
    /// Step budget used; waiting before the rewind and flush
    Handoff {
        /// Ticks left to wait
        remaining: u32,
    },
    /// Rewound checkpoint saved; waiting before the restart
    Restarting {
        /// Ticks left to wait
        remaining: u32,
    },
    /// The restart policy is taking the process down
    Terminated,
}

/// What a supervisor tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// No job
    Idle,
    /// Counting down a delay
    Waiting,
    /// Ran a batch and more remain in the step
    Progress(TickReport),
    /// Ran a batch that ended the step
    StepBoundary(TickReport),
    /// Rewound, flushed and saved for the next step
    StepAdvanced(Rewind),
    /// Ran the batch that finished the job
    Completed(TickReport),
    /// Handed control to the restart policy
    Restarted(RestartOutcome),
}

/// Owns the running job, if any, and drives it from the host tick.
///
/// The single-job lock is the phase: anything but [`JobPhase::Idle`] holds
/// it, from the start command until the job completes or the restart
/// policy brings the process back without a job in memory.
pub struct JobSupervisor<W, R> {
    world: W,
    store: CheckpointStore,
    config: JobConfig,
    coordinator: RestartCoordinator<W>,
    policy: R,
    scheduler: Option<StepScheduler<W>>,
    phase: JobPhase,
}

impl<W, R> JobSupervisor<W, R>
where
    W: ChunkPopulator + DurableFlush + Clone,
    R: RestartPolicy,
{
    /// Supervisor with no job loaded.
    pub fn new(world: W, store: CheckpointStore, config: JobConfig, policy: R) -> Self {
        let coordinator = RestartCoordinator::new(world.clone(), store.clone(), config.overlap_columns);
        Self {
            world,
            store,
            config,
            coordinator,
            policy,
            scheduler: None,
            phase: JobPhase::Idle,
        }
    }

    /// Resumes a checkpointed job if one is running. Returns whether a job
    /// is now held.
    pub fn bootstrap(&mut self) -> bool {
        if self.phase != JobPhase::Idle {
            return true;
        }
        match ResumeBootstrapper::new(&self.store, &self.coordinator).resume() {
            Resume::Idle => false,
            Resume::Running(state) => {
                self.install(state);
                true
            },
        }
    }

    /// Starts a new job over `border` grown by the command's padding.
    ///
    /// Refused without touching anything while another job holds the lock.
    pub fn start(&mut self, command: FillCommand, border: ChunkBounds) -> Result<StartAck, StartError> {
        if self.is_active() {
            let (current_step, total_steps) = self
                .state()
                .map_or((0, 0), |s| (s.current_step, s.total_steps));
            return Err(StartError::AlreadyRunning {
                current_step,
                total_steps,
            });
        }

        let state = command.into_state(border);
        if let Err(e) = self.store.save(&state) {
            warn!("Failed to save new fill job: {e}");
        }
        let ack = StartAck::for_state(&state);
        info!("{ack}");
        self.install(state);
        Ok(ack)
    }

    /// Advances the job by one host tick.
    pub fn tick(&mut self) -> SupervisorEvent {
        match self.phase {
            JobPhase::Idle | JobPhase::Terminated => SupervisorEvent::Idle,
            JobPhase::WarmingUp { remaining } if remaining > 0 => {
                self.phase = JobPhase::WarmingUp {
                    remaining: remaining - 1,
                };
                SupervisorEvent::Waiting
            },
            JobPhase::WarmingUp { .. } | JobPhase::Running => self.run_batch(),
            JobPhase::Handoff { remaining } if remaining > 0 => {
                self.phase = JobPhase::Handoff {
                    remaining: remaining - 1,
                };
                SupervisorEvent::Waiting
            },
            JobPhase::Handoff { .. } => self.hand_off(),
            JobPhase::Restarting { remaining } if remaining > 0 => {
                self.phase = JobPhase::Restarting {
                    remaining: remaining - 1,
                };
                SupervisorEvent::Waiting
            },
            JobPhase::Restarting { .. } => self.restart(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Whether a job holds the lock.
    pub fn is_active(&self) -> bool {
        self.phase != JobPhase::Idle
    }

    /// Progress of the job in memory, if any.
    pub fn state(&self) -> Option<&JobState> {
        self.scheduler.as_ref().map(StepScheduler::state)
    }

    /// Job tunables.
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// The checkpoint record.
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// The restart policy.
    pub fn policy(&self) -> &R {
        &self.policy
    }

    fn install(&mut self, state: JobState) {
        self.scheduler = Some(StepScheduler::new(
            state,
            self.world.clone(),
            self.store.clone(),
            self.config.log_frequency,
        ));
        self.phase = JobPhase::WarmingUp {
            remaining: self.config.warmup_ticks,
        };
    }

    fn run_batch(&mut self) -> SupervisorEvent {
        let Some(scheduler) = self.scheduler.as_mut() else {
            self.phase = JobPhase::Idle;
            return SupervisorEvent::Idle;
        };
        self.phase = JobPhase::Running;

        let report = scheduler.tick();
        match report.outcome {
            TickOutcome::Running => SupervisorEvent::Progress(report),
            TickOutcome::StepBoundary => {
                self.phase = JobPhase::Handoff {
                    remaining: self.config.handoff_delay_ticks,
                };
                SupervisorEvent::StepBoundary(report)
            },
            TickOutcome::JobComplete => {
                self.scheduler = None;
                self.phase = JobPhase::Idle;
                SupervisorEvent::Completed(report)
            },
        }
    }

    fn hand_off(&mut self) -> SupervisorEvent {
        let Some(scheduler) = self.scheduler.as_mut() else {
            self.phase = JobPhase::Idle;
            return SupervisorEvent::Idle;
        };

        let rewind = self.coordinator.advance_step(scheduler.state_mut());
        info!(
            "Restarting in {} ticks to release memory",
            self.config.restart_delay_ticks
        );
        self.phase = JobPhase::Restarting {
            remaining: self.config.restart_delay_ticks,
        };
        SupervisorEvent::StepAdvanced(rewind)
    }

    fn restart(&mut self) -> SupervisorEvent {
        let outcome = self.policy.restart();
        match outcome {
            RestartOutcome::Terminating => {
                self.phase = JobPhase::Terminated;
            },
            RestartOutcome::ResumeInProcess => {
                self.scheduler = None;
                self.phase = JobPhase::Idle;
                self.bootstrap();
            },
        }
        SupervisorEvent::Restarted(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restart::ResetInPlace;
    use crate::state::JobParams;
    use pregen_common::{ChunkCoord, WorldResult};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct World {
        visited: RefCell<Vec<ChunkCoord>>,
    }

    impl ChunkPopulator for World {
        fn populate(&self, coord: ChunkCoord) -> WorldResult<()> {
            self.visited.borrow_mut().push(coord);
            Ok(())
        }
    }

    impl DurableFlush for World {
        fn flush_all(&self) -> WorldResult<usize> {
            Ok(self.visited.borrow().len())
        }
    }

    struct Exit;

    impl RestartPolicy for Exit {
        fn restart(&mut self) -> RestartOutcome {
            RestartOutcome::Terminating
        }
    }

    fn quick_config() -> JobConfig {
        JobConfig {
            warmup_ticks: 0,
            handoff_delay_ticks: 0,
            restart_delay_ticks: 0,
            ..JobConfig::default()
        }
    }

    fn command(freq: u32, step: u32) -> FillCommand {
        FillCommand {
            params: JobParams::new(freq, 0, step),
        }
    }

    #[test]
    fn test_warmup_delays_first_batch() {
        let dir = TempDir::new().expect("temp dir");
        let world = Rc::new(World::default());
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let config = JobConfig {
            warmup_ticks: 2,
            ..quick_config()
        };
        let mut supervisor = JobSupervisor::new(Rc::clone(&world), store, config, Exit);

        supervisor
            .start(command(1, 10), ChunkBounds::new(0, 1, 0, 1))
            .expect("start");
        assert_eq!(supervisor.tick(), SupervisorEvent::Waiting);
        assert_eq!(supervisor.tick(), SupervisorEvent::Waiting);
        assert!(matches!(supervisor.tick(), SupervisorEvent::Progress(_)));
        assert_eq!(world.visited.borrow().len(), 1);
    }

    #[test]
    fn test_start_with_unwritable_checkpoint_runs_in_memory() {
        let dir = TempDir::new().expect("temp dir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").expect("write blocker");
        let world = Rc::new(World::default());
        let store = CheckpointStore::in_dir(&blocker, "fill_job.toml");
        let mut supervisor =
            JobSupervisor::new(Rc::clone(&world), store.clone(), quick_config(), Exit);

        supervisor
            .start(command(4, 10), ChunkBounds::new(0, 1, 0, 1))
            .expect("start");
        assert!(supervisor.is_active());
        assert!(!store.exists());

        assert!(matches!(supervisor.tick(), SupervisorEvent::Completed(_)));
        assert_eq!(world.visited.borrow().len(), 4);
    }

    #[test]
    fn test_second_start_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let world = Rc::new(World::default());
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let mut supervisor = JobSupervisor::new(world, store.clone(), quick_config(), Exit);

        supervisor
            .start(command(1, 10), ChunkBounds::new(0, 3, 0, 3))
            .expect("start");
        supervisor.tick();
        let before = store.load();

        let err = supervisor
            .start(command(7, 70), ChunkBounds::new(-9, 9, -9, 9))
            .expect_err("second start must be refused");
        assert_eq!(
            err,
            StartError::AlreadyRunning {
                current_step: 1,
                total_steps: 2
            }
        );
        assert_eq!(store.load(), before);
        assert_eq!(supervisor.state().map(|s| s.freq), Some(1));
    }

    #[test]
    fn test_lock_held_through_restart() {
        let dir = TempDir::new().expect("temp dir");
        let world = Rc::new(World::default());
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let config = JobConfig {
            restart_delay_ticks: 5,
            ..quick_config()
        };
        let mut supervisor = JobSupervisor::new(world, store, config, Exit);

        supervisor
            .start(command(2, 2), ChunkBounds::new(0, 3, 0, 3))
            .expect("start");
        assert!(matches!(supervisor.tick(), SupervisorEvent::StepBoundary(_)));
        assert!(matches!(supervisor.tick(), SupervisorEvent::StepAdvanced(_)));
        assert_eq!(supervisor.phase(), JobPhase::Restarting { remaining: 5 });
        assert!(supervisor
            .start(command(1, 1), ChunkBounds::new(0, 0, 0, 0))
            .is_err());

        for _ in 0..5 {
            assert_eq!(supervisor.tick(), SupervisorEvent::Waiting);
        }
        assert_eq!(
            supervisor.tick(),
            SupervisorEvent::Restarted(RestartOutcome::Terminating)
        );
        assert_eq!(supervisor.phase(), JobPhase::Terminated);
        assert_eq!(supervisor.tick(), SupervisorEvent::Idle);
    }

    #[test]
    fn test_in_process_restart_runs_to_completion() {
        let dir = TempDir::new().expect("temp dir");
        let world = Rc::new(World::default());
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let mut resets = 0u32;
        let policy = ResetInPlace::new(|| resets += 1);
        let mut supervisor = JobSupervisor::new(Rc::clone(&world), store.clone(), quick_config(), policy);

        supervisor
            .start(command(3, 6), ChunkBounds::new(0, 4, 0, 3))
            .expect("start");

        let mut completed = false;
        for _ in 0..200 {
            if let SupervisorEvent::Completed(_) = supervisor.tick() {
                completed = true;
                break;
            }
        }
        assert!(completed);
        assert!(!supervisor.is_active());
        assert!(!store.exists());
        drop(supervisor);
        assert!(resets > 0);

        let visited = world.visited.borrow();
        for x in 0..=4 {
            for z in 0..=3 {
                assert!(visited.contains(&ChunkCoord::new(x, z)), "missed ({x}, {z})");
            }
        }
    }

    #[test]
    fn test_bootstrap_resumes_saved_job() {
        let dir = TempDir::new().expect("temp dir");
        let world = Rc::new(World::default());
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let mut state = JobState::new(ChunkBounds::new(0, 1, 0, 1), JobParams::new(4, 0, 4));
        state.cur_x = 1;
        state.done = 2;
        state.this_step = 2;
        store.save(&state).expect("save");

        let mut supervisor = JobSupervisor::new(Rc::clone(&world), store, quick_config(), Exit);
        assert!(supervisor.bootstrap());
        assert_eq!(supervisor.state(), Some(&state));
        // the step budget runs out on the last column, completion wins
        assert!(matches!(supervisor.tick(), SupervisorEvent::Completed(_)));
        assert_eq!(
            *world.visited.borrow(),
            vec![ChunkCoord::new(1, 0), ChunkCoord::new(1, 1)]
        );
    }
}
