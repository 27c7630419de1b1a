//! Shared fixtures for runtime integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use game_content::CatalogLoader;
use game_core::{
    ActorStats, CatalogOracle, ChannelId, CombatConfig, CombatContext, DungeonDefinition,
    MonsterTemplate, Skill, UserId,
};
use runtime::{
    ActorRecord, ActorRepository, ContentMode, DungeonSession, EventBus, InMemoryActorRepo,
    InterventionService, SessionHandle, SessionRegistry, SharedInstanceManager,
};

pub const CHANNEL: ChannelId = ChannelId(1);

/// `arena`: a training dummy that never falls and barely hurts.
/// `rat_run`: three steps of one-hit rats.
/// `den`: a caller that summons rats.
pub const TEST_CATALOG: &str = r#"
(
    skills: [
        (id: "tap", name: "Tap", effects: [DirectDamage((power: 100))]),
        (id: "call", name: "Call", effects: [Summon((monster: "rat", count: 1))]),
    ],
    monsters: [
        (
            id: "dummy",
            name: "Training Dummy",
            level: 1,
            stats: (max_hp: 1000000, attack: 1, defense: 0, speed: 10),
            skills: ["tap"],
            exp: 10,
            gold: 10,
        ),
        (
            id: "rat",
            name: "Rat",
            level: 1,
            stats: (max_hp: 5, attack: 1, defense: 0, speed: 5),
            skills: ["tap"],
            exp: 12,
            gold: 6,
        ),
        (
            id: "caller",
            name: "Rat Caller",
            level: 1,
            stats: (max_hp: 1000000, attack: 1, defense: 0, speed: 100),
            skills: ["call"],
            exp: 10,
            gold: 10,
        ),
    ],
    dungeons: [
        (
            id: "arena",
            name: "Arena",
            min_level: 2,
            steps: 20,
            encounter_chance: 100,
            monster_pool: ["dummy"],
            min_group: 1,
            max_group: 1,
        ),
        (
            id: "rat_run",
            name: "Rat Run",
            min_level: 1,
            steps: 3,
            encounter_chance: 100,
            monster_pool: ["rat"],
            min_group: 1,
            max_group: 1,
        ),
        (
            id: "den",
            name: "Rat Den",
            min_level: 1,
            steps: 3,
            encounter_chance: 100,
            monster_pool: ["caller"],
            min_group: 1,
            max_group: 1,
        ),
    ],
)
"#;

pub fn catalog() -> Arc<dyn CatalogOracle> {
    Arc::new(CatalogLoader::parse(TEST_CATALOG).expect("test catalog should parse"))
}

/// Catalog that lost one monster after validation.
pub struct WithoutMonster {
    pub inner: Arc<dyn CatalogOracle>,
    pub missing: &'static str,
}

impl CatalogOracle for WithoutMonster {
    fn monster_by_id(&self, id: &str) -> Option<MonsterTemplate> {
        (id != self.missing).then(|| self.inner.monster_by_id(id)).flatten()
    }

    fn skill_by_id(&self, id: &str) -> Option<Skill> {
        self.inner.skill_by_id(id)
    }

    fn dungeon_by_id(&self, id: &str) -> Option<DungeonDefinition> {
        self.inner.dungeon_by_id(id)
    }
}

/// A level 5 character with plenty of hp, attack 20, and the given gold.
pub fn hero(user: u64, gold: u64) -> ActorRecord {
    ActorRecord::new(
        UserId(user),
        format!("hero-{user}"),
        5,
        ActorStats::new(500, 20, 5, 50),
        vec!["tap".into()],
    )
    .with_gold(gold)
}

/// Registry, instance tracker and intervention service over one repository.
pub struct World {
    pub catalog: Arc<dyn CatalogOracle>,
    pub actors: Arc<InMemoryActorRepo>,
    pub instances: Arc<SharedInstanceManager>,
    pub registry: Arc<SessionRegistry>,
    pub intervention: InterventionService,
    pub events: EventBus,
    pub config: CombatConfig,
}

impl World {
    pub fn new(records: impl IntoIterator<Item = ActorRecord>) -> Self {
        let catalog = catalog();
        let actors = Arc::new(InMemoryActorRepo::with_records(records));
        let events = EventBus::new();
        let instances = Arc::new(SharedInstanceManager::new());
        let repo: Arc<dyn ActorRepository> = actors.clone();
        let registry = Arc::new(SessionRegistry::new(
            repo.clone(),
            instances.clone(),
            events.clone(),
        ));
        let config = CombatConfig::default();
        let intervention = InterventionService::new(
            registry.clone(),
            instances.clone(),
            repo,
            catalog.clone(),
            config.clone(),
            events.clone(),
        );
        Self {
            catalog,
            actors,
            instances,
            registry,
            intervention,
            events,
            config,
        }
    }

    /// Opens a session for `leader` in `dungeon` and walks `steps` steps.
    pub async fn open(
        &self,
        leader: u64,
        dungeon: &str,
        mode: ContentMode,
        steps: u32,
    ) -> SessionHandle {
        let user = UserId(leader);
        let definition = self
            .catalog
            .dungeon_by_id(dungeon)
            .expect("dungeon should exist");
        let handle = self
            .registry
            .create(user, || DungeonSession::new(user, CHANNEL, definition, mode, 7))
            .expect("session slot should be free");
        self.instances.join(user, CHANNEL, dungeon);

        let mut session = handle.lock().await;
        for _ in 0..steps {
            session.advance_step().expect("idle session should advance");
            session.finish_event();
        }
        drop(session);
        handle
    }

    /// Starts a fight between the session owner and one `monster`, holding
    /// the owner's step reservation the way a session worker does.
    pub async fn engage(&self, handle: &SessionHandle, monster: &str) {
        let mut session = handle.lock().await;
        let leader = session.user();
        assert!(
            self.registry.begin_own_event(leader),
            "leader should be free to fight"
        );
        let profile = self
            .actors
            .load(leader)
            .expect("repository should be readable")
            .expect("leader should have a character")
            .profile(self.catalog.as_ref())
            .expect("leader loadout should resolve");
        let template = self
            .catalog
            .monster_by_id(monster)
            .expect("monster should exist");
        let created_at = Utc::now().timestamp_millis() as u64;
        let context = CombatContext::start(
            11,
            created_at,
            profile,
            &[template],
            None,
            self.catalog.as_ref(),
        )
        .expect("encounter should start");
        session.enter_combat(context).expect("session should enter combat");
    }
}
