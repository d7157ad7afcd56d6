//! XP curve, level thresholds, and the `maxHp`/`maxMana` formulas derived
//! purely from class/level/race/`baseMaxHp`.

use ambonmud_domain::PlayerClass;

/// Total XP required to have reached `level` (level 1 requires 0).
pub fn xp_threshold(level: u32) -> u64 {
    let level = level as u64;
    100 * level.saturating_sub(1) * level
}

/// The highest level whose threshold `xp_total` has reached, starting at 1.
pub fn level_for_xp(xp_total: u64, max_level: u32) -> u32 {
    let mut level = 1;
    while level < max_level && xp_total >= xp_threshold(level + 1) {
        level += 1;
    }
    level
}

/// `maxHp` is `baseMaxHp` (class/race baseline rolled in at creation) plus
/// the class's per-level HP growth compounded from level 1.
pub fn compute_max_hp(base_max_hp: u32, class: PlayerClass, level: u32) -> u32 {
    base_max_hp + class.hp_per_level() * level.saturating_sub(1)
}

/// `maxMana` grows purely from class and level; there is no base-mana
/// baseline distinct from the formula (unlike HP, which folds in race).
pub fn compute_max_mana(class: PlayerClass, level: u32) -> u32 {
    class.mana_per_level() * level
}

/// The outcome of crediting XP: the new level (unchanged if no level-up)
/// and whether a level-up occurred, so the caller can apply rewards and
/// trigger a persistence save.
pub struct XpGainResult {
    pub new_level: u32,
    pub leveled_up: bool,
}

pub fn apply_xp_gain(current_level: u32, current_xp_total: u64, gained: u64, max_level: u32) -> (u64, XpGainResult) {
    let new_total = current_xp_total + gained;
    let new_level = level_for_xp(new_total, max_level);
    (
        new_total,
        XpGainResult {
            new_level,
            leveled_up: new_level > current_level,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_for_xp_increases_monotonically_with_threshold() {
        assert_eq!(level_for_xp(0, 50), 1);
        assert_eq!(level_for_xp(xp_threshold(2), 50), 2);
        assert_eq!(level_for_xp(xp_threshold(2) - 1, 50), 1);
    }

    #[test]
    fn level_for_xp_caps_at_max_level() {
        assert_eq!(level_for_xp(u64::MAX / 2, 10), 10);
    }

    #[test]
    fn max_hp_compounds_class_growth_from_level_one() {
        assert_eq!(compute_max_hp(50, PlayerClass::Warrior, 1), 50);
        assert_eq!(compute_max_hp(50, PlayerClass::Warrior, 3), 50 + 12 * 2);
    }

    #[test]
    fn apply_xp_gain_reports_level_up() {
        let (_, result) = apply_xp_gain(1, 0, xp_threshold(2), 50);
        assert!(result.leveled_up);
        assert_eq!(result.new_level, 2);
    }
}
