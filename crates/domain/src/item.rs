//! Items, equipment slots, and the registry operation results that model
//! equip/use/give outcomes as closed variant sets.

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

/// Equipment slots are exclusive: at most one item per slot per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    Head,
    Body,
    Hand,
}

impl Slot {
    pub fn parse(input: &str) -> Option<Slot> {
        match input.to_ascii_lowercase().as_str() {
            "head" => Some(Slot::Head),
            "body" => Some(Slot::Body),
            "hand" => Some(Slot::Hand),
            _ => None,
        }
    }
}

/// Flat stat bonuses an item can grant while equipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatBonuses {
    pub str_bonus: i32,
    pub dex_bonus: i32,
    pub con_bonus: i32,
    pub int_bonus: i32,
    pub wis_bonus: i32,
    pub cha_bonus: i32,
}

/// The effect applied when a consumable item is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OnUseEffect {
    pub heal_hp: u32,
    pub grant_xp: u32,
}

/// An item template: the immutable definition shared by every instance of
/// the same kind of item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub keyword: String,
    pub display_name: String,
    pub description: String,
    pub slot: Option<Slot>,
    pub damage: u32,
    pub armor: u32,
    pub stat_bonuses: StatBonuses,
    pub consumable: bool,
    pub charges: Option<u32>,
    pub on_use: Option<OnUseEffect>,
    /// When true, keyword lookups for this item require an exact match;
    /// substring matching against `display_name`/`description` is skipped.
    pub match_by_key: bool,
    pub base_price: u32,
    /// Gold rather than an inventory item: picking one up credits
    /// `base_price` to the player's purse instead of adding the instance
    /// to their inventory.
    pub is_currency: bool,
}

/// A concrete, placeable item: an id paired with its template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInstance {
    pub id: ItemId,
    pub item: Item,
}

impl ItemInstance {
    /// Remaining-charge-aware keyword match used by room/inventory/shop
    /// lookups: exact (case-insensitive keyword) first, falling back to a
    /// substring match over name/description for inputs of length >= 3
    /// unless `match_by_key` opts the item out of substring matching.
    pub fn matches_keyword(&self, input: &str) -> bool {
        let input_lower = input.to_ascii_lowercase();
        if self.item.keyword.eq_ignore_ascii_case(&input_lower) {
            return true;
        }
        if self.item.match_by_key || input_lower.len() < 3 {
            return false;
        }
        self.item.display_name.to_ascii_lowercase().contains(&input_lower)
            || self.item.description.to_ascii_lowercase().contains(&input_lower)
    }
}

/// Result of an equip attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EquipResult {
    Equipped { slot: Slot },
    NotWearable,
    SlotOccupied { slot: Slot, current: ItemId },
    NotFound,
}

/// Result of a use attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UseResult {
    Used { charges_remaining: Option<u32>, consumed: bool },
    NotUsable,
    NotFound,
}

/// Result of a give attempt (an atomic move between two players).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GiveResult {
    Given,
    NotFound,
    RecipientNotInRoom,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn potion(match_by_key: bool) -> ItemInstance {
        ItemInstance {
            id: ItemId::new("zone:potion1").unwrap(),
            item: Item {
                keyword: "potion".into(),
                display_name: "a healing potion".into(),
                description: "a small vial of red liquid".into(),
                slot: None,
                damage: 0,
                armor: 0,
                stat_bonuses: StatBonuses::default(),
                consumable: true,
                charges: Some(1),
                on_use: Some(OnUseEffect { heal_hp: 10, grant_xp: 0 }),
                match_by_key,
                base_price: 5,
                is_currency: false,
            },
        }
    }

    #[test]
    fn exact_keyword_matches() {
        assert!(potion(false).matches_keyword("potion"));
        assert!(potion(false).matches_keyword("POTION"));
    }

    #[test]
    fn substring_match_requires_three_chars() {
        assert!(potion(false).matches_keyword("vial"));
        assert!(!potion(false).matches_keyword("vi"));
    }

    #[test]
    fn match_by_key_disables_substring_match() {
        assert!(!potion(true).matches_keyword("vial"));
        assert!(potion(true).matches_keyword("potion"));
    }
}
