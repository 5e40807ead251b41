//! End-to-end rules scenarios with scripted dice.

use combatsim_core::rules::{ActionContext, Intent, RulesEngine, RulesError};
use combatsim_core::tactics::{self, Tactics};
use combatsim_core::testing::{assert_logged, ScriptedRolls};
use combatsim_core::{
    get_spell, Ability, AbilityScore, Advantage, Area, Combatant, CombatantConfig, DamageType,
    Dice, Encounter, EncounterConfig, EventLog, Grid, Position, Team,
};

fn creature(config: CombatantConfig) -> Combatant {
    Combatant::new(config, &mut ScriptedRolls::constant(1)).unwrap()
}

fn cast(
    roster: &mut [Combatant],
    spell: &str,
    level: u8,
    targets: &[usize],
    rolls: &mut ScriptedRolls,
    log: &mut EventLog,
) -> Result<i32, RulesError> {
    let intent = Intent::CastSpell {
        caster: 0,
        spell: spell.to_string(),
        level,
        targets: targets.to_vec(),
    };
    let mut ctx = ActionContext::new(rolls, log);
    let resolution = RulesEngine::new().resolve(roster, intent, &mut ctx)?;
    Ok(resolution.cast().map(|c| c.magnitude).unwrap_or(0))
}

// =============================================================================
// Scenario A: ability bonuses
// =============================================================================

#[test]
fn test_ability_bonus_rounds_down() {
    assert_eq!(AbilityScore::new(15).bonus(), 2);
    assert_eq!(AbilityScore::new(4).bonus(), -3);
}

// =============================================================================
// Scenario B: resistance halves and rounds down
// =============================================================================

#[test]
fn test_resistance_floors_halved_damage() {
    let mut plain = creature(CombatantConfig::named("Plain").with_max_hp(6));
    plain.take_damage(1, DamageType::Acid);
    assert_eq!(plain.hp(), 5);

    let mut resistant = creature(
        CombatantConfig::named("Resistant")
            .with_max_hp(6)
            .with_resistance(DamageType::Acid),
    );
    assert_eq!(resistant.take_damage(1, DamageType::Acid), 0);
    assert_eq!(resistant.hp(), 6);
    assert_eq!(resistant.take_damage(3, DamageType::Acid), 1);
    assert_eq!(resistant.hp(), 5);
}

// =============================================================================
// Scenario C: a slot is spent exactly once
// =============================================================================

#[test]
fn test_single_slot_is_spent_once() {
    let mut roster = vec![creature(
        CombatantConfig::named("Acolyte")
            .with_max_hp(20)
            .with_score(Ability::Wisdom, 14)
            .with_spellcasting(Ability::Wisdom)
            .with_spell(get_spell("Cure Wounds").unwrap().clone())
            .with_spell_slots(&[1]),
    )];
    roster[0].take_damage(15, DamageType::Slashing);
    let mut log = EventLog::new();

    let healed = cast(&mut roster, "Cure Wounds", 1, &[0], &mut ScriptedRolls::new([5]), &mut log).unwrap();
    assert_eq!(healed, 7);
    assert_eq!(roster[0].hp(), 12);
    assert_eq!(roster[0].spell_slots.available(1), 0);

    let err = cast(&mut roster, "Cure Wounds", 1, &[0], &mut ScriptedRolls::new([5]), &mut log).unwrap_err();
    assert!(matches!(err, RulesError::NoSpellSlot { level: 1, .. }));
    assert_eq!(roster[0].spell_slots.available(1), 0);
    assert_eq!(roster[0].hp(), 12);
}

// =============================================================================
// Scenario D: sphere containment uses the bounding-box center
// =============================================================================

#[test]
fn test_sphere_uses_bounding_box_center() {
    let sphere = Area::sphere(5);
    assert!(sphere.check(&[Position::new(-5, 0), Position::new(5, 0)]).is_ok());
    assert_eq!(
        sphere.check(&[Position::new(-6, 0), Position::new(5, 0)]),
        Err(RulesError::TargetsOutsideArea { radius: 5 })
    );
}

// =============================================================================
// Scenario E: initiative order is fixed for the whole fight
// =============================================================================

#[test]
fn test_initiative_order_survives_deaths() {
    let fighter = |name: &str, team, bonus, hp| {
        creature(
            CombatantConfig::named(name)
                .with_team(Team(team))
                .with_max_hp(hp)
                .with_initiative(Dice::new(1, 1) + bonus),
        )
    };
    let mut encounter = Encounter::new(vec![
        fighter("Three", 1, 2, 30),
        fighter("Five", 2, 4, 30),
        fighter("Zero", 1, -1, 1),
    ])
    .with_config(EncounterConfig { max_rounds: 4 });

    let mut rolls = ScriptedRolls::constant(10);
    encounter.roll_initiative(&mut rolls);
    let rolled: Vec<i32> = encounter.initiative().iter().map(|e| e.roll).collect();
    assert_eq!(rolled, vec![5, 3, 0]);
    assert_eq!(encounter.turn_order(), vec![1, 0, 2]);

    let summary = encounter.run(&mut rolls).unwrap();
    assert!(summary.stalemate);
    assert_eq!(encounter.turn_order(), vec![1, 0, 2]);
    assert!(!encounter.combatants()[2].is_alive());

    let log = encounter.sink();
    assert_logged(log, "Zero falls");
    for round in 1..=4 {
        let actors: Vec<&str> = log
            .events()
            .iter()
            .filter(|e| e.round == round && e.message.contains(" attacks "))
            .filter_map(|e| e.message.split(' ').next())
            .collect();
        assert_eq!(actors, vec!["Five", "Three"], "round {round}");
    }
}

// =============================================================================
// Scenario F: the weakest enemy is always chosen
// =============================================================================

#[test]
fn test_target_weakest_picks_lowest_hp() {
    let roster = vec![
        creature(CombatantConfig::named("Hunter").with_team(Team(1))),
        creature(CombatantConfig::named("Ox").with_team(Team(2)).with_max_hp(10)),
        creature(CombatantConfig::named("Rabbit").with_team(Team(2)).with_max_hp(3)),
    ];
    assert_eq!(tactics::weakest_enemy(&roster, 0), Some(2));
    assert_eq!(
        Tactics::TargetWeakest.decide(&roster, 0),
        Some(Intent::Attack {
            attacker: 0,
            target: 2,
            weapon: 0,
            advantage: Advantage::Normal,
        })
    );
}

// =============================================================================
// Acid splash on a grid
// =============================================================================

/// An apprentice at the origin (DC 13, +3 spellcasting) and goblins placed
/// at the given cells.
fn acid_splash_setup(goblins: &[(i32, i32)]) -> (Grid, Vec<Combatant>) {
    let mut grid = Grid::new(100, 100).unwrap();
    let mut roster = vec![creature(
        CombatantConfig::named("Apprentice")
            .with_score(Ability::Intelligence, 16)
            .with_spellcasting(Ability::Intelligence)
            .with_spell(get_spell("Acid Splash").unwrap().clone()),
    )];
    for (i, _) in goblins.iter().enumerate() {
        roster.push(creature(
            CombatantConfig::named(format!("Goblin {}", i + 1)).with_max_hp(20),
        ));
    }
    grid.place(&mut roster[0], Position::new(0, 0)).unwrap();
    for (i, &cell) in goblins.iter().enumerate() {
        grid.place(&mut roster[i + 1], cell.into()).unwrap();
    }
    (grid, roster)
}

#[test]
fn test_acid_splash_single_target() {
    let (_grid, mut roster) = acid_splash_setup(&[(30, 0)]);
    let mut log = EventLog::new();

    // Failed save on 2, then 4 acid + 3.
    let dealt = cast(&mut roster, "Acid Splash", 0, &[1], &mut ScriptedRolls::new([2, 4]), &mut log).unwrap();
    assert_eq!(dealt, 7);
    assert_eq!(roster[1].hp(), 13);
    assert_logged(&log, "Goblin 1 fails a DC 13 DEX save against Acid Splash (2)");
    assert_logged(&log, "Goblin 1 takes 7 acid damage from Acid Splash (13 HP)");
}

#[test]
fn test_acid_splash_two_adjacent_targets() {
    let (_grid, mut roster) = acid_splash_setup(&[(30, 0), (35, 0)]);
    let mut log = EventLog::new();

    // The first goblin saves; the second fails and takes 5 + 3.
    let dealt = cast(&mut roster, "Acid Splash", 0, &[1, 2], &mut ScriptedRolls::new([15, 2, 5]), &mut log).unwrap();
    assert_eq!(dealt, 8);
    assert_eq!(roster[1].hp(), 20);
    assert_eq!(roster[2].hp(), 12);
    assert_logged(&log, "Goblin 1 makes a DC 13 DEX save");
}

#[test]
fn test_acid_splash_rejects_three_targets() {
    let (_grid, mut roster) = acid_splash_setup(&[(30, 0), (35, 0), (30, 5)]);
    let mut log = EventLog::new();
    let mut rolls = ScriptedRolls::constant(1);

    let err = cast(&mut roster, "Acid Splash", 0, &[1, 2, 3], &mut rolls, &mut log).unwrap_err();
    assert_eq!(err, RulesError::TooManyTargets { max: 2, got: 3 });
    assert_eq!(rolls.drawn(), 0);
    assert!(log.is_empty());
}

#[test]
fn test_acid_splash_rejects_repeated_target() {
    let (_grid, mut roster) = acid_splash_setup(&[(30, 0)]);
    let mut log = EventLog::new();
    let mut rolls = ScriptedRolls::constant(1);
    let err = cast(&mut roster, "Acid Splash", 0, &[1, 1], &mut rolls, &mut log).unwrap_err();
    assert_eq!(err, RulesError::DuplicateTarget("Goblin 1".to_string()));
    assert_eq!(rolls.drawn(), 0);
    assert_eq!(roster[1].hp(), 20);
    assert!(log.is_empty());
}

#[test]
fn test_acid_splash_rejects_spread_out_targets() {
    let (_grid, mut roster) = acid_splash_setup(&[(30, 0), (45, 0)]);
    let mut log = EventLog::new();

    let err = cast(&mut roster, "Acid Splash", 0, &[1, 2], &mut ScriptedRolls::constant(1), &mut log).unwrap_err();
    assert_eq!(err, RulesError::TargetsOutsideArea { radius: 5 });
    assert!(roster.iter().skip(1).all(|g| g.hp() == 20));
}

#[test]
fn test_acid_splash_out_of_range() {
    let (_grid, mut roster) = acid_splash_setup(&[(70, 0)]);
    let mut log = EventLog::new();

    let err = cast(&mut roster, "Acid Splash", 0, &[1], &mut ScriptedRolls::constant(1), &mut log).unwrap_err();
    assert!(matches!(err, RulesError::OutOfRange { range: 60, .. }));
    assert_eq!(roster[1].hp(), 20);
}

#[test]
fn test_occupied_cell_is_rejected() {
    let (mut grid, mut roster) = acid_splash_setup(&[(30, 0)]);
    let err = grid.place(&mut roster[1], Position::new(0, 0)).unwrap_err();
    assert_eq!(err, RulesError::CellOccupied { x: 0, y: 0 });
    assert_eq!(roster[1].position, Some(Position::new(30, 0)));
}
