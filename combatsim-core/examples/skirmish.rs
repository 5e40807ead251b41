//! Run a skirmish between two bestiary warbands and print the combat log.
//!
//! Usage: `skirmish [seed]`. Set `RUST_LOG=combat=debug` to trace every
//! action as it resolves.

use combatsim_core::{bestiary, Encounter, RandomRolls, Team};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut rolls = match std::env::args().nth(1) {
        Some(seed) => RandomRolls::seeded(seed.parse()?),
        None => RandomRolls::from_entropy(),
    };

    let warbands = [
        (Team(1), ["Knight", "Cleric", "Mage"].as_slice()),
        (Team(2), ["Bandit", "Bandit", "Kobold", "Kobold", "Blood Hawk"].as_slice()),
    ];
    let mut configs = Vec::new();
    for (team, names) in warbands {
        for name in names {
            let config = bestiary::get(name).ok_or_else(|| format!("unknown creature: {name}"))?;
            configs.push(config.with_team(team));
        }
    }

    let mut encounter = Encounter::from_configs(configs, &mut rolls)?;
    println!("=== Initiative ===");
    encounter.roll_initiative(&mut rolls);
    for entry in encounter.initiative() {
        println!("{:>3}  {}", entry.roll, encounter.combatants()[entry.combatant]);
    }

    let summary = encounter.run(&mut rolls)?;
    println!("\n=== Log ===");
    print!("{}", encounter.sink());
    println!("\n=== Result ===\n{summary}");
    Ok(())
}
