use siegeline_core::{Command, Event, GamePhase, SimulationConfig};
use siegeline_system_wave_director::{Config, DirectorState, WaveDirector};
use siegeline_world::{self as world, query, World};

fn tick(world: &mut World, director: &mut WaveDirector) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick, &mut events);
    let mut commands = Vec::new();
    director.handle(
        &events,
        query::phase(world),
        query::live_enemy_count(world),
        &mut commands,
    );
    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

#[test]
fn skipped_countdown_feeds_staggered_spawns_into_the_world() {
    let config = SimulationConfig::default();
    let mut world = World::with_config(config.clone());
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SetPhase {
            phase: GamePhase::Running,
        },
        &mut events,
    );
    let mut director = WaveDirector::new(Config::from_simulation(&config));
    director.call_next_wave();

    let first = tick(&mut world, &mut director);
    assert!(first.contains(&Event::WaveStarted { wave: 1 }));
    assert_eq!(query::wave(&world), 1);
    assert_eq!(query::live_enemy_count(&world), 1);

    for _ in 0..60 {
        let _ = tick(&mut world, &mut director);
    }
    assert_eq!(query::live_enemy_count(&world), 2);
    assert_eq!(director.state(), DirectorState::Spawning);
}
