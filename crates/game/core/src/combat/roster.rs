use crate::state::{Actor, ActorId, Side};

/// Both sides of an encounter, each kept in spawn order.
///
/// Players are listed leader first, then admitted participants in commit
/// order. Dead actors stay in the roster so their ids remain resolvable for
/// the rest of the encounter.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    players: Vec<Actor>,
    monsters: Vec<Actor>,
    next_id: u32,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh id. Ids are never reused within an encounter.
    pub fn allocate_id(&mut self) -> ActorId {
        let id = ActorId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, actor: Actor) {
        match actor.side() {
            Side::Players => self.players.push(actor),
            Side::Monsters => self.monsters.push(actor),
        }
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.iter().find(|actor| actor.id == id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.players
            .iter_mut()
            .chain(self.monsters.iter_mut())
            .find(|actor| actor.id == id)
    }

    pub fn side(&self, side: Side) -> &[Actor] {
        match side {
            Side::Players => &self.players,
            Side::Monsters => &self.monsters,
        }
    }

    pub fn players(&self) -> &[Actor] {
        &self.players
    }

    pub fn monsters(&self) -> &[Actor] {
        &self.monsters
    }

    /// Players first, then monsters.
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.players.iter().chain(self.monsters.iter())
    }

    pub fn ids(&self) -> Vec<ActorId> {
        self.iter().map(|actor| actor.id).collect()
    }

    /// Living actors of one side, in roster order.
    pub fn living(&self, side: Side) -> Vec<ActorId> {
        self.side(side)
            .iter()
            .filter(|actor| actor.is_alive())
            .map(|actor| actor.id)
            .collect()
    }

    pub fn is_wiped(&self, side: Side) -> bool {
        self.side(side).iter().all(|actor| !actor.is_alive())
    }

    pub fn len(&self) -> usize {
        self.players.len() + self.monsters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
