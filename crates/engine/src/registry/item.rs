//! Live item placement: rooms, inventories, mob-carried items, unplaced
//! templates, and equipped slots. All mutation happens on the engine
//! worker; no internal synchronization is needed.

use std::collections::BTreeMap;

use ambonmud_domain::{EquipResult, GiveResult, ItemId, ItemInstance, MobId, RoomId, SessionId, Slot, UseResult};

/// Result of resolving a `"get"` command's target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickedUp {
    Item(ItemId),
    Gold(u32),
}

#[derive(Default)]
pub struct ItemRegistry {
    room_items: BTreeMap<RoomId, Vec<ItemInstance>>,
    inventory_items: BTreeMap<SessionId, Vec<ItemInstance>>,
    mob_items: BTreeMap<MobId, Vec<ItemInstance>>,
    unplaced_items: BTreeMap<ItemId, ItemInstance>,
    equipped_items: BTreeMap<SessionId, BTreeMap<Slot, ItemInstance>>,
    /// Templates kept for mob-drop instantiation, keyed by the drop's item id.
    item_templates: BTreeMap<ItemId, ItemInstance>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_template(&mut self, instance: ItemInstance) {
        self.item_templates.insert(instance.id.clone(), instance);
    }

    pub fn place_in_room(&mut self, room_id: RoomId, instance: ItemInstance) {
        self.room_items.entry(room_id).or_default().push(instance);
    }

    pub fn place_unplaced(&mut self, instance: ItemInstance) {
        self.unplaced_items.insert(instance.id.clone(), instance);
    }

    pub fn room_items(&self, room_id: &RoomId) -> &[ItemInstance] {
        self.room_items.get(room_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn inventory(&self, session_id: SessionId) -> &[ItemInstance] {
        self.inventory_items.get(&session_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn equipped(&self, session_id: SessionId) -> Option<&BTreeMap<Slot, ItemInstance>> {
        self.equipped_items.get(&session_id)
    }

    pub fn give_to_inventory(&mut self, session_id: SessionId, instance: ItemInstance) {
        self.inventory_items.entry(session_id).or_default().push(instance);
    }

    /// Instantiate a mob drop template for placement (room or inventory).
    pub fn instantiate_drop(&self, item_id: &ItemId) -> Option<ItemInstance> {
        self.item_templates.get(item_id).cloned()
    }

    fn take_from_room(&mut self, room_id: &RoomId, keyword: &str) -> Option<ItemInstance> {
        let items = self.room_items.get_mut(room_id)?;
        let idx = items.iter().position(|i| i.matches_keyword(keyword))?;
        Some(items.remove(idx))
    }

    /// A room object a `"get"` just resolved to: either an ordinary item
    /// that was moved into the session's inventory, or a pile of gold that
    /// was consumed and should be credited to the purse instead.
    pub fn pick_up(&mut self, session_id: SessionId, room_id: &RoomId, keyword: &str) -> Option<PickedUp> {
        let instance = self.take_from_room(room_id, keyword)?;
        if instance.item.is_currency {
            return Some(PickedUp::Gold(instance.item.base_price));
        }
        let id = instance.id.clone();
        self.give_to_inventory(session_id, instance);
        Some(PickedUp::Item(id))
    }

    pub fn drop(&mut self, session_id: SessionId, room_id: RoomId, keyword: &str) -> Option<ItemId> {
        let items = self.inventory_items.get_mut(&session_id)?;
        let idx = items.iter().position(|i| i.matches_keyword(keyword))?;
        let instance = items.remove(idx);
        let id = instance.id.clone();
        self.place_in_room(room_id, instance);
        Some(id)
    }

    pub fn equip(&mut self, session_id: SessionId, keyword: &str) -> EquipResult {
        let Some(items) = self.inventory_items.get_mut(&session_id) else {
            return EquipResult::NotFound;
        };
        let Some(idx) = items.iter().position(|i| i.matches_keyword(keyword)) else {
            return EquipResult::NotFound;
        };
        let Some(slot) = items[idx].item.slot else {
            return EquipResult::NotWearable;
        };
        let equipped = self.equipped_items.entry(session_id).or_default();
        if let Some(current) = equipped.get(&slot) {
            return EquipResult::SlotOccupied { slot, current: current.id.clone() };
        }
        let instance = items.remove(idx);
        equipped.insert(slot, instance);
        EquipResult::Equipped { slot }
    }

    pub fn unequip(&mut self, session_id: SessionId, slot: Slot) -> EquipResult {
        let Some(equipped) = self.equipped_items.get_mut(&session_id) else {
            return EquipResult::NotFound;
        };
        let Some(instance) = equipped.remove(&slot) else {
            return EquipResult::NotFound;
        };
        self.inventory_items.entry(session_id).or_default().push(instance);
        EquipResult::Equipped { slot }
    }

    pub fn use_item(&mut self, session_id: SessionId, keyword: &str) -> UseResult {
        let Some(items) = self.inventory_items.get_mut(&session_id) else {
            return UseResult::NotFound;
        };
        let Some(idx) = items.iter().position(|i| i.matches_keyword(keyword)) else {
            return UseResult::NotFound;
        };
        if items[idx].item.on_use.is_none() {
            return UseResult::NotUsable;
        }
        match items[idx].item.charges {
            Some(0) => UseResult::NotUsable,
            Some(remaining) => {
                let new_remaining = remaining - 1;
                items[idx].item.charges = Some(new_remaining);
                let consumed = items[idx].item.consumable && new_remaining == 0;
                if consumed {
                    items.remove(idx);
                }
                UseResult::Used { charges_remaining: Some(new_remaining), consumed }
            }
            None => {
                let consumed = items[idx].item.consumable;
                if consumed {
                    items.remove(idx);
                }
                UseResult::Used { charges_remaining: None, consumed }
            }
        }
    }

    pub fn give(
        &mut self,
        from: SessionId,
        to: SessionId,
        recipient_in_room: bool,
        keyword: &str,
    ) -> GiveResult {
        if !recipient_in_room {
            return GiveResult::RecipientNotInRoom;
        }
        let Some(items) = self.inventory_items.get_mut(&from) else {
            return GiveResult::NotFound;
        };
        let Some(idx) = items.iter().position(|i| i.matches_keyword(keyword)) else {
            return GiveResult::NotFound;
        };
        let instance = items.remove(idx);
        self.inventory_items.entry(to).or_default().push(instance);
        GiveResult::Given
    }

    /// Remove a session's inventory and equipped items, returning them so
    /// the caller (player registry, on disconnect/persist) can fold them
    /// into a `PlayerRecord`.
    pub fn take_session_items(
        &mut self,
        session_id: SessionId,
    ) -> (Vec<ItemInstance>, BTreeMap<Slot, ItemInstance>) {
        (
            self.inventory_items.remove(&session_id).unwrap_or_default(),
            self.equipped_items.remove(&session_id).unwrap_or_default(),
        )
    }

    pub fn seed_session_items(
        &mut self,
        session_id: SessionId,
        inventory: Vec<ItemInstance>,
        equipped: BTreeMap<Slot, ItemInstance>,
    ) {
        if !inventory.is_empty() {
            self.inventory_items.insert(session_id, inventory);
        }
        if !equipped.is_empty() {
            self.equipped_items.insert(session_id, equipped);
        }
    }

    pub fn mob_items(&self, mob_id: &MobId) -> &[ItemInstance] {
        self.mob_items.get(mob_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn drop_mob_items_to_room(&mut self, mob_id: &MobId, room_id: RoomId) {
        if let Some(items) = self.mob_items.remove(mob_id) {
            self.room_items.entry(room_id).or_default().extend(items);
        }
    }

    /// Zone reset: drop every room/unplaced item belonging to `zone`, then
    /// reapply `spawns`. Inventory and equipped items are never touched.
    pub fn reset_zone(&mut self, zone: &str, spawns: impl IntoIterator<Item = (ItemInstance, Option<RoomId>)>) {
        for items in self.room_items.values_mut() {
            items.retain(|i| i.id.zone() != zone);
        }
        self.unplaced_items.retain(|id, _| id.zone() != zone);
        for (instance, room_id) in spawns {
            match room_id {
                Some(room_id) => self.place_in_room(room_id, instance),
                None => self.place_unplaced(instance),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_domain::{Item, OnUseEffect, StatBonuses};

    fn test_item(keyword: &str, id: &str, slot: Option<Slot>) -> ItemInstance {
        ItemInstance {
            id: ItemId::new(id).unwrap(),
            item: Item {
                keyword: keyword.to_string(),
                display_name: format!("a {keyword}"),
                description: String::new(),
                slot,
                damage: 0,
                armor: 0,
                stat_bonuses: StatBonuses::default(),
                consumable: false,
                charges: None,
                on_use: Some(OnUseEffect { heal_hp: 5, grant_xp: 0 }),
                match_by_key: false,
                base_price: 0,
                is_currency: false,
            },
        }
    }

    #[test]
    fn pick_up_moves_from_room_to_inventory() {
        let mut registry = ItemRegistry::new();
        let room = RoomId::new("zone:a").unwrap();
        registry.place_in_room(room.clone(), test_item("sword", "zone:sword1", Some(Slot::Hand)));
        let sid = SessionId(1);
        let picked = registry.pick_up(sid, &room, "sword").unwrap();
        assert_eq!(picked, PickedUp::Item(ItemId::new("zone:sword1").unwrap()));
        assert!(registry.room_items(&room).is_empty());
        assert_eq!(registry.inventory(sid).len(), 1);
    }

    #[test]
    fn pick_up_gold_credits_the_amount_instead_of_the_inventory() {
        let mut registry = ItemRegistry::new();
        let room = RoomId::new("zone:a").unwrap();
        let mut gold = test_item("gold", "zone:gold", None);
        gold.item.is_currency = true;
        gold.item.base_price = 7;
        registry.place_in_room(room.clone(), gold);
        let sid = SessionId(1);
        let picked = registry.pick_up(sid, &room, "gold").unwrap();
        assert_eq!(picked, PickedUp::Gold(7));
        assert!(registry.room_items(&room).is_empty());
        assert!(registry.inventory(sid).is_empty());
    }

    #[test]
    fn equip_reports_slot_occupied() {
        let mut registry = ItemRegistry::new();
        let sid = SessionId(1);
        registry.give_to_inventory(sid, test_item("sword", "zone:sword1", Some(Slot::Hand)));
        registry.give_to_inventory(sid, test_item("axe", "zone:axe1", Some(Slot::Hand)));
        assert_eq!(registry.equip(sid, "sword"), EquipResult::Equipped { slot: Slot::Hand });
        match registry.equip(sid, "axe") {
            EquipResult::SlotOccupied { slot, current } => {
                assert_eq!(slot, Slot::Hand);
                assert_eq!(current.as_str(), "zone:sword1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn equip_unwearable_item_reports_not_wearable() {
        let mut registry = ItemRegistry::new();
        let sid = SessionId(1);
        registry.give_to_inventory(sid, test_item("rock", "zone:rock1", None));
        assert_eq!(registry.equip(sid, "rock"), EquipResult::NotWearable);
    }

    #[test]
    fn use_item_with_one_charge_consumes_it() {
        let mut registry = ItemRegistry::new();
        let sid = SessionId(1);
        let mut potion = test_item("potion", "zone:potion1", None);
        potion.item.consumable = true;
        potion.item.charges = Some(1);
        registry.give_to_inventory(sid, potion);
        match registry.use_item(sid, "potion") {
            UseResult::Used { charges_remaining: Some(0), consumed: true } => {}
            other => panic!("unexpected {other:?}"),
        }
        assert!(registry.inventory(sid).is_empty());
    }

    #[test]
    fn reset_zone_preserves_inventory_and_equipped_items() {
        let mut registry = ItemRegistry::new();
        let room = RoomId::new("zone:a").unwrap();
        let sid = SessionId(1);
        registry.place_in_room(room.clone(), test_item("torch", "zone:torch1", None));
        registry.give_to_inventory(sid, test_item("sword", "zone:sword1", Some(Slot::Hand)));
        registry.equip(sid, "sword");

        registry.reset_zone("zone", std::iter::empty());

        assert!(registry.room_items(&room).is_empty());
        assert!(registry.equipped(sid).map(|m| m.contains_key(&Slot::Hand)).unwrap_or(false));
    }
}
