//! High-level runtime orchestrator.
//!
//! The runtime owns the session registry, the shared instance tracker, and
//! one worker task per running session. It exposes a builder-based API for
//! clients to start and stop sessions, request admissions, and observe the
//! event bus.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use game_core::{CatalogOracle, ChannelId, CombatConfig, UserId, compute_seed};

use crate::api::{AutoDecisionProvider, DecisionProvider, Result, RuntimeError, SessionError};
use crate::events::{Event, EventBus, SessionEvent, Topic};
use crate::instance::SharedInstanceManager;
use crate::intervention::{AdmissionDecision, AdmissionRejection, InterventionService};
use crate::repository::{
    ActorRepository, EncounterLog, EncounterRecord, FileEncounterLog, InMemoryActorRepo,
    InMemoryEncounterLog,
};
use crate::reward::RewardService;
use crate::session::{
    ContentMode, DungeonSession, EndReason, SessionHandle, SessionRegistry, StopRequest,
};
use crate::workers::{Services, SessionWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub combat: CombatConfig,
    /// Pause between two combat rounds.
    pub round_delay: Duration,
    /// Pause between two exploration steps.
    pub step_delay: Duration,
    /// How long a decision provider may take before the default choice applies.
    pub decision_timeout: Duration,
    pub event_buffer_size: usize,
    /// Directory of the encounter history file. `None` keeps history in memory.
    pub history_dir: Option<PathBuf>,
    /// Fixed base seed for reproducible runs. `None` draws one per session.
    pub seed: Option<u64>,
}

impl RuntimeConfig {
    pub const DEFAULT_ROUND_DELAY_MS: u64 = 1_500;
    pub const DEFAULT_STEP_DELAY_MS: u64 = 3_000;
    pub const DEFAULT_DECISION_TIMEOUT_MS: u64 = 30_000;
    pub const DEFAULT_EVENT_BUFFER: usize = 100;

    /// Configuration with every pause set to zero, for tests and batch runs.
    pub fn immediate() -> Self {
        Self {
            round_delay: Duration::ZERO,
            step_delay: Duration::ZERO,
            decision_timeout: Duration::from_millis(50),
            ..Self::default()
        }
    }

    /// Defaults overridden by `DUNGEON_*` environment variables.
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            read_env::<u64>(key).map_or(fallback, Duration::from_millis)
        };

        Self {
            combat: defaults.combat,
            round_delay: millis("DUNGEON_ROUND_DELAY_MS", defaults.round_delay),
            step_delay: millis("DUNGEON_STEP_DELAY_MS", defaults.step_delay),
            decision_timeout: millis("DUNGEON_DECISION_TIMEOUT_MS", defaults.decision_timeout),
            event_buffer_size: read_env("DUNGEON_EVENT_BUFFER")
                .unwrap_or(defaults.event_buffer_size),
            history_dir: read_env::<PathBuf>("DUNGEON_HISTORY_DIR").or(defaults.history_dir),
            seed: read_env("DUNGEON_SEED").or(defaults.seed),
        }
    }

    /// Platform data directory used for history files and logs.
    pub fn default_history_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "dungeon")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./save_data"))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            combat: CombatConfig::default(),
            round_delay: Duration::from_millis(Self::DEFAULT_ROUND_DELAY_MS),
            step_delay: Duration::from_millis(Self::DEFAULT_STEP_DELAY_MS),
            decision_timeout: Duration::from_millis(Self::DEFAULT_DECISION_TIMEOUT_MS),
            event_buffer_size: Self::DEFAULT_EVENT_BUFFER,
            history_dir: None,
            seed: None,
        }
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.parse().ok()
}

/// Main runtime that orchestrates dungeon sessions.
///
/// Cheap queries go straight to the registry; every running session is
/// advanced by its own worker task.
pub struct Runtime {
    config: RuntimeConfig,
    services: Services,
    instances: Arc<SharedInstanceManager>,
    history: Arc<dyn EncounterLog>,
    workers: Mutex<HashMap<UserId, JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.services.registry
    }

    pub fn instances(&self) -> &Arc<SharedInstanceManager> {
        &self.instances
    }

    pub fn actors(&self) -> &Arc<dyn ActorRepository> {
        &self.services.actors
    }

    pub fn intervention(&self) -> &Arc<InterventionService> {
        &self.services.intervention
    }

    pub fn events(&self) -> &EventBus {
        &self.services.events
    }

    /// Subscribe to one event topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.services.events.subscribe(topic)
    }

    fn workers(&self) -> MutexGuard<'_, HashMap<UserId, JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a dungeon session for `user` and spawns its worker.
    ///
    /// The user joins the shared instance of `(channel, dungeon)` for as long
    /// as the session runs.
    pub fn start_session(
        &self,
        user: UserId,
        channel: ChannelId,
        dungeon: &str,
        mode: ContentMode,
    ) -> Result<SessionHandle> {
        let definition = self
            .services
            .catalog
            .dungeon_by_id(dungeon)
            .ok_or_else(|| SessionError::UnknownDungeon(dungeon.to_string()))?;
        let record = self
            .services
            .actors
            .load(user)?
            .ok_or(SessionError::ActorNotFound(user))?;
        if record.level < definition.min_level {
            return Err(SessionError::LevelTooLow {
                required: definition.min_level,
                actual: record.level,
            }
            .into());
        }

        let seed = match self.config.seed {
            Some(base) => compute_seed(base, user.0, 0, channel.0 as u32),
            None => rand::random(),
        };
        let dungeon_id = definition.id.clone();
        let handle = self
            .services
            .registry
            .create(user, || {
                DungeonSession::new(user, channel, definition, mode, seed)
            })
            .ok_or(SessionError::AlreadyActive(user))?;

        let instance = self.instances.join(user, channel, &dungeon_id);
        tracing::info!(
            target: "runtime",
            user = %user,
            dungeon = %dungeon_id,
            %instance,
            %mode,
            "session started"
        );
        self.services.events.publish(SessionEvent::Started {
            user,
            dungeon: dungeon_id,
            mode,
        });

        let worker = SessionWorker::new(
            user,
            Arc::clone(&handle),
            self.services.clone(),
            self.shutdown.child_token(),
        );
        let task = tokio::spawn(worker.run());

        let mut workers = self.workers();
        workers.retain(|_, task| !task.is_finished());
        workers.insert(user, task);

        Ok(handle)
    }

    pub fn session(&self, user: UserId) -> Option<SessionHandle> {
        self.services.registry.get(user)
    }

    /// Asks the session of `user` to stop.
    ///
    /// An idle session ends at once. A session in an event or a fight ends
    /// once that event is resolved.
    pub async fn stop_session(&self, user: UserId) -> Result<StopRequest> {
        let handle = self
            .services
            .registry
            .get(user)
            .ok_or(SessionError::NotFound(user))?;
        let request = handle.lock().await.request_stop()?;

        match request {
            StopRequest::Immediate => {
                self.services.registry.end(user, EndReason::Stopped).await;
            }
            StopRequest::Deferred => {
                self.services
                    .events
                    .publish(SessionEvent::StopDeferred { user });
            }
        }
        Ok(request)
    }

    /// Requests admission of `requester` into the encounter led by `target`.
    pub async fn request_admission(
        &self,
        requester: UserId,
        target: UserId,
    ) -> std::result::Result<AdmissionDecision, AdmissionRejection> {
        self.services
            .intervention
            .request_admission(requester, target)
            .await
    }

    /// Leaders of encounters in the same shared instance as `user` that
    /// started within the correlation window of `user`'s encounter.
    pub async fn concurrent_encounters(&self, user: UserId) -> Vec<UserId> {
        let Some(instance) = self.instances.instance_of(user) else {
            return Vec::new();
        };
        let Some(own) = self.services.registry.get(user) else {
            return Vec::new();
        };
        let Some(started) = own.lock().await.combat().map(|combat| combat.created_at()) else {
            return Vec::new();
        };

        let window = self.config.combat.correlation_window_ms;
        let mut leaders = Vec::new();
        for other in self.instances.members(&instance) {
            if other == user {
                continue;
            }
            let Some(handle) = self.services.registry.get(other) else {
                continue;
            };
            let session = handle.lock().await;
            if session.is_ended() {
                continue;
            }
            if let Some(combat) = session.combat()
                && combat.started_within(started, window)
            {
                leaders.push(other);
            }
        }
        leaders
    }

    /// Encounter history led by `user`.
    pub fn history(&self, user: UserId) -> Result<Vec<EncounterRecord>> {
        Ok(self.history.records_for(user)?)
    }

    /// Drops expired history records and returns how many were removed.
    pub fn purge_history(&self) -> Result<usize> {
        let removed = self.history.purge_expired(chrono::Utc::now())?;
        tracing::debug!(target: "runtime", removed, "purged encounter history");
        Ok(removed)
    }

    /// Waits for the worker of `user` to finish.
    pub async fn join_session(&self, user: UserId) -> Result<()> {
        let task = self.workers().remove(&user);
        if let Some(task) = task {
            task.await.map_err(RuntimeError::WorkerJoin)?;
        }
        Ok(())
    }

    /// Cancels every running session and waits for the workers to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.cancel();

        let tasks: Vec<_> = self.workers().drain().map(|(_, task)| task).collect();
        tracing::info!(target: "runtime", workers = tasks.len(), "shutting down");
        for task in tasks {
            task.await.map_err(RuntimeError::WorkerJoin)?;
        }
        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    catalog: Option<Arc<dyn CatalogOracle>>,
    actors: Option<Arc<dyn ActorRepository>>,
    history: Option<Arc<dyn EncounterLog>>,
    decisions: Option<Arc<dyn DecisionProvider>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            catalog: None,
            actors: None,
            history: None,
            decisions: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set required content catalog
    pub fn catalog(mut self, catalog: Arc<dyn CatalogOracle>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Set the character repository (default: in memory)
    pub fn actors(mut self, actors: Arc<dyn ActorRepository>) -> Self {
        self.actors = Some(actors);
        self
    }

    /// Set the encounter history log.
    ///
    /// Defaults to a file log in `config.history_dir` when set, in memory
    /// otherwise.
    pub fn encounter_log(mut self, history: Arc<dyn EncounterLog>) -> Self {
        self.history = Some(history);
        self
    }

    /// Set the decision provider (default: [`AutoDecisionProvider`])
    pub fn decisions(mut self, decisions: Arc<dyn DecisionProvider>) -> Self {
        self.decisions = Some(decisions);
        self
    }

    pub async fn build(self) -> Result<Runtime> {
        let catalog = self.catalog.ok_or(RuntimeError::MissingCatalog)?;
        let actors = self
            .actors
            .unwrap_or_else(|| Arc::new(InMemoryActorRepo::new()));
        let history: Arc<dyn EncounterLog> = match (self.history, &self.config.history_dir) {
            (Some(history), _) => history,
            (None, Some(dir)) => Arc::new(FileEncounterLog::open_or_create(
                dir,
                FileEncounterLog::DEFAULT_FILENAME,
            )?),
            (None, None) => Arc::new(InMemoryEncounterLog::new()),
        };
        let decisions = self
            .decisions
            .unwrap_or_else(|| Arc::new(AutoDecisionProvider));

        let events = EventBus::with_capacity(self.config.event_buffer_size);
        let instances = Arc::new(SharedInstanceManager::new());
        let registry = Arc::new(SessionRegistry::new(
            Arc::clone(&actors),
            Arc::clone(&instances),
            events.clone(),
        ));
        let intervention = Arc::new(InterventionService::new(
            Arc::clone(&registry),
            Arc::clone(&instances),
            Arc::clone(&actors),
            Arc::clone(&catalog),
            self.config.combat.clone(),
            events.clone(),
        ));
        let rewards = Arc::new(RewardService::new(
            Arc::clone(&actors),
            Arc::clone(&history),
        ));

        match history.purge_expired(chrono::Utc::now()) {
            Ok(0) => {}
            Ok(removed) => {
                tracing::info!(target: "runtime", removed, "purged expired encounter history")
            }
            Err(error) => tracing::warn!(target: "runtime", %error, "history purge failed"),
        }

        let services = Services {
            registry,
            intervention,
            rewards,
            actors,
            catalog,
            decisions,
            events,
            config: self.config.clone(),
        };

        Ok(Runtime {
            config: self.config,
            services,
            instances,
            history,
            workers: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_config_has_no_pauses() {
        let config = RuntimeConfig::immediate();
        assert_eq!(config.round_delay, Duration::ZERO);
        assert_eq!(config.step_delay, Duration::ZERO);
        assert_eq!(config.event_buffer_size, RuntimeConfig::DEFAULT_EVENT_BUFFER);
    }

    #[test]
    fn unparsable_env_values_are_ignored() {
        assert_eq!(read_env::<u64>("DUNGEON_TEST_UNSET_VARIABLE"), None);
    }
}
