//! Live mobs, indexed by id and by room.

use std::collections::BTreeMap;

use ambonmud_domain::{MobId, MobState, RoomId};

#[derive(Default)]
pub struct MobRegistry {
    by_id: BTreeMap<MobId, MobState>,
    by_room: BTreeMap<RoomId, Vec<MobId>>,
}

impl MobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, mob: MobState) {
        self.remove_from_room_index(&mob.id);
        self.by_room.entry(mob.room_id.clone()).or_default().push(mob.id.clone());
        self.by_id.insert(mob.id.clone(), mob);
    }

    pub fn get(&self, id: &MobId) -> Option<&MobState> {
        self.by_id.get(id)
    }

    pub fn get_mut(&mut self, id: &MobId) -> Option<&mut MobState> {
        self.by_id.get_mut(id)
    }

    pub fn in_room(&self, room_id: &RoomId) -> impl Iterator<Item = &MobState> {
        self.by_room
            .get(room_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.by_id.get(id))
    }

    pub fn find_in_room_by_name(&self, room_id: &RoomId, keyword: &str) -> Option<&MobState> {
        let keyword = keyword.to_ascii_lowercase();
        self.in_room(room_id).find(|m| {
            m.name.to_ascii_lowercase() == keyword
                || (keyword.len() >= 3 && m.name.to_ascii_lowercase().contains(&keyword))
        })
    }

    fn remove_from_room_index(&mut self, id: &MobId) {
        if let Some(existing) = self.by_id.get(id) {
            if let Some(list) = self.by_room.get_mut(&existing.room_id) {
                list.retain(|existing_id| existing_id != id);
            }
        }
    }

    pub fn move_to_room(&mut self, id: &MobId, room_id: RoomId) {
        self.remove_from_room_index(id);
        if let Some(mob) = self.by_id.get_mut(id) {
            mob.room_id = room_id.clone();
        }
        self.by_room.entry(room_id).or_default().push(id.clone());
    }

    /// Remove a dead mob from the registry atomically (id and room index).
    pub fn remove(&mut self, id: &MobId) -> Option<MobState> {
        self.remove_from_room_index(id);
        self.by_id.remove(id)
    }

    pub fn all_ids_in_zone(&self, zone: &str) -> Vec<MobId> {
        self.by_id.keys().filter(|id| id.zone() == zone).cloned().collect()
    }

    pub fn remove_zone(&mut self, zone: &str) {
        for id in self.all_ids_in_zone(zone) {
            self.remove(&id);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MobState> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_domain::BtMemory;

    fn mob(id: &str, room: &str) -> MobState {
        MobState {
            id: MobId::new(id).unwrap(),
            name: "a rat".to_string(),
            room_id: RoomId::new(room).unwrap(),
            hp: 5,
            max_hp: 5,
            min_damage: 1,
            max_damage: 1,
            armor: 0,
            xp_reward: 10,
            dialogue_id: None,
            behavior_tree: None,
            memory: BtMemory::default(),
        }
    }

    #[test]
    fn move_to_room_updates_room_index() {
        let mut registry = MobRegistry::new();
        registry.upsert(mob("zone:rat", "zone:a"));
        let id = MobId::new("zone:rat").unwrap();
        registry.move_to_room(&id, RoomId::new("zone:b").unwrap());
        assert!(registry.in_room(&RoomId::new("zone:a").unwrap()).next().is_none());
        assert!(registry.in_room(&RoomId::new("zone:b").unwrap()).next().is_some());
    }

    #[test]
    fn remove_is_atomic_across_both_indexes() {
        let mut registry = MobRegistry::new();
        registry.upsert(mob("zone:rat", "zone:a"));
        let id = MobId::new("zone:rat").unwrap();
        registry.remove(&id);
        assert!(registry.get(&id).is_none());
        assert!(registry.in_room(&RoomId::new("zone:a").unwrap()).next().is_none());
    }

    #[test]
    fn find_in_room_by_name_requires_three_chars_for_substring() {
        let mut registry = MobRegistry::new();
        registry.upsert(mob("zone:rat", "zone:a"));
        let room = RoomId::new("zone:a").unwrap();
        assert!(registry.find_in_room_by_name(&room, "rat").is_some());
        assert!(registry.find_in_room_by_name(&room, "ra").is_none());
    }
}
