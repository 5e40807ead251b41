//! Sample creatures.
//!
//! Each entry is a [`CombatantConfig`] with no team and no position; callers
//! set both before building a [`crate::Combatant`].

use crate::ability::Ability;
use crate::combatant::CombatantConfig;
use crate::dice::Dice;
use crate::items::{get_armor, get_weapon, DamageType, Weapon};
use crate::spells::get_spell;
use crate::tactics::Tactics;

/// Add catalog weapons by name, each with its stat block's to-hit and
/// damage bonus.
fn armed(config: CombatantConfig, weapons: &[(&str, i32, i32)]) -> CombatantConfig {
    weapons
        .iter()
        .filter_map(|&(name, attack, damage)| {
            get_weapon(name).map(|w| w.with_attack_mod(attack).with_damage_mod(damage))
        })
        .fold(config, CombatantConfig::with_weapon)
}

/// Add catalog spells by name.
fn knowing(config: CombatantConfig, spells: &[&str]) -> CombatantConfig {
    spells
        .iter()
        .filter_map(|name| get_spell(name))
        .fold(config, |config, spell| config.with_spell(spell.clone()))
}

fn wearing(config: CombatantConfig, armor: &str) -> CombatantConfig {
    match get_armor(armor) {
        Some(armor) => config.with_armor(armor),
        None => config,
    }
}

lazy_static::lazy_static! {
    static ref CREATURES: Vec<CombatantConfig> = vec![
        armed(
            CombatantConfig::named("Commoner").with_max_hp(4),
            &[("club", 2, 0)],
        ),
        armed(
            wearing(
                CombatantConfig::named("Bandit")
                    .with_level(2)
                    .with_max_hp(11)
                    .with_score(Ability::Strength, 11)
                    .with_score(Ability::Dexterity, 12)
                    .with_score(Ability::Constitution, 12),
                "leather armor",
            ),
            &[("scimitar", 3, 1), ("light crossbow", 3, 1)],
        ),
        CombatantConfig::named("Blood Hawk")
            .with_max_hp(7)
            .with_armor_class(12)
            .with_score(Ability::Strength, 6)
            .with_score(Ability::Dexterity, 14)
            .with_score(Ability::Constitution, 10)
            .with_score(Ability::Intelligence, 3)
            .with_score(Ability::Wisdom, 14)
            .with_score(Ability::Charisma, 5)
            .with_weapon(
                Weapon::new("Beak", Dice::new(1, 4), DamageType::Piercing)
                    .with_attack_mod(4)
                    .with_damage_mod(2),
            ),
        armed(
            CombatantConfig::named("Kobold")
                .with_max_hp(5)
                .with_armor_class(12)
                .with_score(Ability::Strength, 7)
                .with_score(Ability::Dexterity, 15)
                .with_score(Ability::Constitution, 9)
                .with_score(Ability::Intelligence, 8)
                .with_score(Ability::Wisdom, 7)
                .with_score(Ability::Charisma, 8),
            &[("dagger", 4, 2)],
        ),
        armed(
            wearing(
                CombatantConfig::named("Knight")
                    .with_level(5)
                    .with_max_hp(52)
                    .with_score(Ability::Strength, 16)
                    .with_score(Ability::Constitution, 14)
                    .with_score(Ability::Wisdom, 11)
                    .with_score(Ability::Charisma, 15),
                "chain mail",
            ),
            &[("longsword", 5, 3)],
        ),
        armed(
            knowing(
                wearing(
                    CombatantConfig::named("Cleric")
                        .with_level(5)
                        .with_max_hp(27)
                        .with_score(Ability::Constitution, 12)
                        .with_score(Ability::Wisdom, 16)
                        .with_spellcasting(Ability::Wisdom)
                        .with_spell_slots(&[4, 2])
                        .with_tactics(Tactics::Healer),
                    "chain shirt",
                ),
                &["Cure Wounds", "Healing Word"],
            ),
            &[("mace", 2, 0)],
        ),
        armed(
            knowing(
                CombatantConfig::named("Mage")
                    .with_level(5)
                    .with_max_hp(22)
                    .with_armor_class(12)
                    .with_score(Ability::Dexterity, 14)
                    .with_score(Ability::Intelligence, 16)
                    .with_spellcasting(Ability::Intelligence)
                    .with_spell_slots(&[4, 3, 2])
                    .with_tactics(Tactics::Mage),
                &["Acid Splash", "Thunderwave"],
            ),
            &[("quarterstaff", 2, -1)],
        ),
    ];
}

/// Look up a creature by name (case-insensitive).
pub fn get(name: &str) -> Option<CombatantConfig> {
    let name_lower = name.to_lowercase();
    CREATURES
        .iter()
        .find(|c| c.name.to_lowercase() == name_lower)
        .cloned()
}

pub fn names() -> impl Iterator<Item = &'static str> {
    CREATURES.iter().map(|c| c.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::Combatant;
    use crate::testing::ScriptedRolls;

    fn build(name: &str) -> Combatant {
        Combatant::new(get(name).unwrap(), &mut ScriptedRolls::constant(1)).unwrap()
    }

    #[test]
    fn test_every_creature_builds() {
        for name in names() {
            let creature = build(name);
            assert_eq!(creature.name, name);
            assert!(creature.is_alive());
            assert!(!creature.weapons().is_empty());
        }
        assert_eq!(names().count(), 7);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(get("BLOOD HAWK").is_some());
        assert!(get("kobold").is_some());
        assert!(get("Tarrasque").is_none());
    }

    #[test]
    fn test_kobold_stat_block() {
        let kobold = build("Kobold");
        let dagger = &kobold.weapons()[0];
        assert_eq!(kobold.max_hp(), 5);
        assert_eq!(kobold.armor_class(), 12);
        assert_eq!(dagger.name, "Dagger");
        assert_eq!(kobold.attack_modifier(dagger), 4);
        assert_eq!(kobold.damage_modifier(dagger), 2);
    }

    #[test]
    fn test_stat_block_bonuses_ignore_proficiency() {
        let knight = build("Knight");
        assert_eq!(knight.proficiency, 3);
        assert_eq!(knight.attack_modifier(&knight.weapons()[0]), 5);

        let bandit = build("Bandit");
        let crossbow = &bandit.weapons()[1];
        assert!(!crossbow.melee);
        assert_eq!(bandit.attack_modifier(crossbow), 3);
    }

    #[test]
    fn test_armored_creatures() {
        // Leather 11 + Dex 1.
        assert_eq!(build("Bandit").armor_class(), 12);
        // Chain mail ignores Dex.
        assert_eq!(build("Knight").armor_class(), 16);
    }

    #[test]
    fn test_casters_know_their_spells() {
        let cleric = build("Cleric");
        assert_eq!(cleric.tactics, Tactics::Healer);
        assert!(cleric.knows_spell("cure wounds"));
        assert_eq!(cleric.spell_dc(), 8 + 3 + 3);
        assert!(cleric.can_cast_at(1));

        let mage = build("Mage");
        assert_eq!(mage.tactics, Tactics::Mage);
        assert_eq!(mage.spells()[0].name, "Acid Splash");
        assert!(mage.can_cast_at(3));
        assert!(!mage.can_cast_at(4));
    }
}
