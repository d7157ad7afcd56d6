//! Session-to-player state, the room index, login orchestration, rename,
//! and the persistence handoff.

use std::collections::BTreeMap;

use ambonmud_domain::{
    is_valid_player_name, CoreStats, LoginPhase, PlayerClass, PlayerRecord, PlayerState, Race,
    RenameResult, RoomId, SessionId,
};
use ambonmud_shared::repository::PlayerRepository;
use ambonmud_shared::Clock;

use crate::progression::{compute_max_hp, compute_max_mana};

#[derive(Default)]
pub struct PlayerRegistry {
    by_session: BTreeMap<SessionId, PlayerState>,
    by_room: BTreeMap<RoomId, Vec<SessionId>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a freshly connected session into the login sub-state.
    pub fn connect(&mut self, session_id: SessionId, start_room: RoomId) {
        self.by_session.insert(
            session_id,
            PlayerState {
                session_id,
                name: String::new(),
                room_id: start_room,
                class: PlayerClass::Warrior,
                race: Race::Human,
                level: 1,
                xp_total: 0,
                gold: 0,
                stats: CoreStats::default(),
                hp: 1,
                max_hp: 1,
                mana: 0,
                max_mana: 0,
                base_max_hp: 1,
                is_staff: false,
                title: None,
                active_quests: Default::default(),
                completed_quests: Default::default(),
                achievements: Default::default(),
                ansi_enabled: false,
                login_phase: LoginPhase::AwaitingName,
                equipped: Default::default(),
                known_abilities: Default::default(),
            },
        );
    }

    pub fn get(&self, session_id: SessionId) -> Option<&PlayerState> {
        self.by_session.get(&session_id)
    }

    pub fn get_mut(&mut self, session_id: SessionId) -> Option<&mut PlayerState> {
        self.by_session.get_mut(&session_id)
    }

    pub fn in_room(&self, room_id: &RoomId) -> impl Iterator<Item = &PlayerState> {
        self.by_room
            .get(room_id)
            .into_iter()
            .flatten()
            .filter_map(move |sid| self.by_session.get(sid))
    }

    pub fn in_room_sessions(&self, room_id: &RoomId) -> &[SessionId] {
        self.by_room.get(room_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Name uniqueness against every in-game (post-login) session,
    /// case-insensitive. Callers additionally check the repository.
    pub fn name_taken_live(&self, name: &str) -> bool {
        self.by_session
            .values()
            .any(|p| p.login_phase == LoginPhase::InGame && p.name.eq_ignore_ascii_case(name))
    }

    /// Hydrate a freshly-authenticated session from a persisted record and
    /// place it in the room index.
    pub fn finalize_login_existing(&mut self, session_id: SessionId, record: PlayerRecord) {
        let max_hp = compute_max_hp(record.base_max_hp, record.class, record.level);
        let max_mana = compute_max_mana(record.class, record.level);
        let room_id = record.room_id.clone();
        let player = PlayerState {
            session_id,
            name: record.name,
            room_id: room_id.clone(),
            class: record.class,
            race: record.race,
            level: record.level,
            xp_total: record.xp_total,
            gold: record.gold,
            stats: record.stats,
            hp: max_hp,
            max_hp,
            mana: max_mana,
            max_mana,
            base_max_hp: record.base_max_hp,
            is_staff: record.is_staff,
            title: None,
            active_quests: record.active_quests,
            completed_quests: record.completed_quests,
            achievements: record.achievements,
            ansi_enabled: self.by_session.get(&session_id).map(|p| p.ansi_enabled).unwrap_or(false),
            login_phase: LoginPhase::InGame,
            equipped: record.equipped_item_ids,
            known_abilities: Default::default(),
        };
        self.by_session.insert(session_id, player);
        self.index_room(session_id, room_id);
    }

    /// Place a brand-new character (post character-creation) at
    /// `start_room`.
    pub fn finalize_login_new(
        &mut self,
        session_id: SessionId,
        name: String,
        class: PlayerClass,
        race: Race,
        start_room: RoomId,
    ) {
        let base_max_hp = (50_i64 + race.base_hp_bonus() as i64).max(1) as u32;
        let max_hp = compute_max_hp(base_max_hp, class, 1);
        let max_mana = compute_max_mana(class, 1);
        let ansi_enabled = self.by_session.get(&session_id).map(|p| p.ansi_enabled).unwrap_or(false);
        let player = PlayerState {
            session_id,
            name,
            room_id: start_room.clone(),
            class,
            race,
            level: 1,
            xp_total: 0,
            gold: 0,
            stats: CoreStats::default(),
            hp: max_hp,
            max_hp,
            mana: max_mana,
            max_mana,
            base_max_hp,
            is_staff: false,
            title: None,
            active_quests: Default::default(),
            completed_quests: Default::default(),
            achievements: Default::default(),
            ansi_enabled,
            login_phase: LoginPhase::InGame,
            equipped: Default::default(),
            known_abilities: Default::default(),
        };
        self.by_session.insert(session_id, player);
        self.index_room(session_id, start_room);
    }

    fn deindex_room(&mut self, session_id: SessionId) {
        if let Some(player) = self.by_session.get(&session_id) {
            if let Some(list) = self.by_room.get_mut(&player.room_id) {
                list.retain(|sid| *sid != session_id);
            }
        }
    }

    fn index_room(&mut self, session_id: SessionId, room_id: RoomId) {
        self.by_room.entry(room_id).or_default().push(session_id);
    }

    /// Updates `roomId` and the room index. Callers (the move command
    /// handler) are responsible for emitting `Room.*` GMCP updates.
    pub fn move_to(&mut self, session_id: SessionId, room_id: RoomId) {
        self.deindex_room(session_id);
        if let Some(player) = self.by_session.get_mut(&session_id) {
            player.room_id = room_id.clone();
        }
        self.index_room(session_id, room_id);
    }

    pub fn rename(&mut self, session_id: SessionId, new_name: &str) -> RenameResult {
        if !is_valid_player_name(new_name) {
            return RenameResult::Invalid;
        }
        if self.name_taken_live(new_name) {
            return RenameResult::Taken;
        }
        if let Some(player) = self.by_session.get_mut(&session_id) {
            player.name = new_name.to_string();
        }
        RenameResult::Ok
    }

    /// Removes the session from every index. Returns the final state so
    /// the caller can fold it (plus item-registry inventory/equipment) into
    /// a `PlayerRecord` and persist it.
    pub fn disconnect(&mut self, session_id: SessionId) -> Option<PlayerState> {
        self.deindex_room(session_id);
        self.by_session.remove(&session_id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &PlayerState> {
        self.by_session.values()
    }

    pub fn count_in_game(&self) -> usize {
        self.by_session.values().filter(|p| p.login_phase == LoginPhase::InGame).count()
    }
}

/// Build a durable [`PlayerRecord`] from live state plus the item
/// registry's inventory/equipment snapshot, stamping `last_login_at` from
/// the injected clock.
pub fn to_player_record(
    player: &PlayerState,
    inventory_item_ids: Vec<ambonmud_domain::ItemId>,
    equipped_item_ids: BTreeMap<ambonmud_domain::Slot, ambonmud_domain::ItemId>,
    password_hash: String,
    created_at: chrono::DateTime<chrono::Utc>,
    clock: &dyn Clock,
) -> PlayerRecord {
    PlayerRecord {
        name: player.name.clone(),
        password_hash,
        class: player.class,
        race: player.race,
        level: player.level,
        xp_total: player.xp_total,
        gold: player.gold,
        stats: player.stats,
        base_max_hp: player.base_max_hp,
        room_id: player.room_id.clone(),
        inventory_item_ids,
        equipped_item_ids,
        active_quests: player.active_quests.clone(),
        completed_quests: player.completed_quests.clone(),
        achievements: player.achievements.clone(),
        is_staff: player.is_staff,
        created_at,
        last_login_at: chrono::DateTime::from_timestamp_millis(clock.now_ms()).unwrap_or(created_at),
    }
}

/// Look up a name against both the live registry and the repository, for
/// the login flow's "name exists?" branch.
pub async fn name_exists(
    registry: &PlayerRegistry,
    repository: &dyn PlayerRepository,
    name: &str,
) -> Result<bool, ambonmud_shared::repository::RepositoryError> {
    if registry.name_taken_live(name) {
        return Ok(true);
    }
    repository.exists(name).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_places_session_in_login_phase() {
        let mut registry = PlayerRegistry::new();
        let room = RoomId::new("zone:start").unwrap();
        registry.connect(SessionId(1), room);
        assert_eq!(registry.get(SessionId(1)).unwrap().login_phase, LoginPhase::AwaitingName);
    }

    #[test]
    fn move_to_updates_room_index() {
        let mut registry = PlayerRegistry::new();
        let room_a = RoomId::new("zone:a").unwrap();
        let room_b = RoomId::new("zone:b").unwrap();
        registry.connect(SessionId(1), room_a.clone());
        registry.finalize_login_new(
            SessionId(1),
            "Alice".to_string(),
            PlayerClass::Warrior,
            Race::Human,
            room_a.clone(),
        );
        registry.move_to(SessionId(1), room_b.clone());
        assert!(registry.in_room(&room_a).next().is_none());
        assert!(registry.in_room(&room_b).next().is_some());
    }

    #[test]
    fn rename_rejects_taken_name_case_insensitively() {
        let mut registry = PlayerRegistry::new();
        let room = RoomId::new("zone:a").unwrap();
        registry.connect(SessionId(1), room.clone());
        registry.finalize_login_new(SessionId(1), "Alice".to_string(), PlayerClass::Warrior, Race::Human, room.clone());
        registry.connect(SessionId(2), room.clone());
        registry.finalize_login_new(SessionId(2), "Bob".to_string(), PlayerClass::Warrior, Race::Human, room);
        assert_eq!(registry.rename(SessionId(2), "ALICE"), RenameResult::Taken);
    }

    #[test]
    fn disconnect_removes_from_room_index() {
        let mut registry = PlayerRegistry::new();
        let room = RoomId::new("zone:a").unwrap();
        registry.connect(SessionId(1), room.clone());
        registry.finalize_login_new(SessionId(1), "Alice".to_string(), PlayerClass::Warrior, Race::Human, room.clone());
        registry.disconnect(SessionId(1));
        assert!(registry.in_room(&room).next().is_none());
        assert!(registry.get(SessionId(1)).is_none());
    }
}
