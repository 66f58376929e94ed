//! End-to-end battle tests: targeting, spells, traps, dead units and
//! replay determinism, run through the full session loop.

use raid_core::ai::acquire_target;
use raid_core::layout::{LayoutEntry, VillageLayout};
use raid_core::math::{Fixed, Vec2Fixed};
use raid_core::replay::ReplayPlayer;
use raid_core::session::{BattleSession, TICK_RATE};
use raid_core::spells::SpellKind;
use raid_core::units::{AttackPreference, Unit, UnitKind, UnitState};
use raid_test_utils::fixtures::{
    attack_log, cell_position, empty_session, fixed, heal_log, sample_session,
};

fn run_seconds(session: &mut BattleSession, seconds: u32) -> Vec<raid_core::events::TickEvents> {
    (0..seconds * TICK_RATE).map(|_| session.tick()).collect()
}

fn with_buildings(entries: &[(&str, f64, f64)]) -> (BattleSession, Vec<raid_core::buildings::BuildingId>) {
    let mut layout = VillageLayout::new();
    for (name, row, col) in entries {
        layout.push(*name, LayoutEntry::new(*row, *col, 1));
    }
    let mut session = empty_session();
    // Layout ids come out grouped by name; map them back to entry order.
    session.load_layout(&layout);
    let ids = entries
        .iter()
        .map(|(name, row, col)| {
            let (row, col) = (Fixed::from_num(*row), Fixed::from_num(*col));
            session
                .buildings()
                .iter()
                .find(|b| b.name == *name && b.row == row && b.col == col)
                .map(|b| b.id)
                .expect("building was loaded")
        })
        .collect();
    (session, ids)
}

// =============================================================================
// Target acquisition
// =============================================================================

#[test]
fn preferred_building_beats_nearer_fallback() {
    let (mut session, ids) = with_buildings(&[("GoldMine", 10.0, 10.0), ("Cannon", 30.0, 30.0)]);
    let (mine, cannon) = (ids[0], ids[1]);

    let near_mine = cell_position(10, 10) + Vec2Fixed::from_ints(60, 0);
    let giant = session.place_troop(UnitKind::Giant, 1, near_mine).unwrap();
    let barbarian = session.place_troop(UnitKind::Barbarian, 1, near_mine).unwrap();
    session.tick();

    assert_eq!(session.unit(giant).unwrap().target, Some(cannon));
    assert_eq!(session.unit(barbarian).unwrap().target, Some(mine));
}

#[test]
fn fallback_is_used_when_nothing_matches() {
    let (session, ids) = with_buildings(&[("GoldMine", 10.0, 10.0), ("Barracks", 30.0, 30.0)]);
    let picked = acquire_target(
        cell_position(30, 30),
        AttackPreference::Defense,
        session.buildings().iter(),
    );
    assert_eq!(picked, Some(ids[1]));
}

#[test]
fn traps_are_never_targeted() {
    let (session, _) = with_buildings(&[("Bomb", 10.0, 10.0)]);
    let picked = acquire_target(
        cell_position(10, 10),
        AttackPreference::Any,
        session.buildings().iter(),
    );
    assert_eq!(picked, None);
}

// =============================================================================
// Spells
// =============================================================================

#[test]
fn rage_is_reversed_exactly_on_expiry() {
    let mut session = empty_session();
    let spot = cell_position(20, 20);
    let id = session.place_troop(UnitKind::Barbarian, 1, spot).unwrap();
    assert_eq!(session.unit(id).unwrap().stats.move_speed, fixed(100));

    session.cast_spell(SpellKind::Rage, spot).unwrap();
    let raged = session.unit(id).unwrap().stats;
    assert_eq!(raged.move_speed, fixed(150));
    assert_eq!(raged.attack_damage, fixed(12));

    session.tick();
    let spell = session.spells().next().unwrap();
    assert_eq!(spell.affected().len(), 1);
    assert!(spell.affected().contains(&id));
    assert_eq!(session.unit(id).unwrap().stats.move_speed, fixed(150));

    run_seconds(&mut session, 7);
    assert_eq!(session.spells().count(), 0);
    let unit = session.unit(id).unwrap();
    assert_eq!(unit.stats.move_speed, fixed(100));
    assert_eq!(unit.stats.attack_damage, fixed(8));
    assert_eq!(unit.stats.attack_speed, fixed(1));
}

#[test]
fn overlapping_rages_stack_and_unwind() {
    let mut session = empty_session();
    let spot = cell_position(20, 20);
    let id = session.place_troop(UnitKind::Barbarian, 1, spot).unwrap();

    session.cast_spell(SpellKind::Rage, spot).unwrap();
    run_seconds(&mut session, 1);
    session.cast_spell(SpellKind::Rage, spot).unwrap();
    assert_eq!(session.unit(id).unwrap().stats.move_speed, fixed(225));

    run_seconds(&mut session, 8);
    assert_eq!(session.unit(id).unwrap().stats.move_speed, fixed(100));
}

#[test]
fn heal_never_exceeds_max_hp() {
    let mut session = empty_session();
    let spot = cell_position(20, 20);
    let id = session.place_troop(UnitKind::Giant, 1, spot).unwrap();
    session.cast_spell(SpellKind::Heal, spot).unwrap();
    run_seconds(&mut session, 5);
    assert_eq!(session.unit(id).unwrap().hp(), fixed(300));
}

// =============================================================================
// Traps
// =============================================================================

#[test]
fn trap_fires_once_until_rearmed() {
    let (mut session, ids) = with_buildings(&[("Bomb", 10.0, 10.0)]);
    let bomb = ids[0];
    let spot = session.building(bomb).unwrap().position();

    let first = session.place_troop(UnitKind::Barbarian, 3, spot).unwrap();
    let detonations = |events: &[raid_core::events::TickEvents]| {
        events.iter().map(|e| e.traps_detonated.len()).sum::<usize>()
    };

    let events = run_seconds(&mut session, 2);
    assert_eq!(detonations(&events), 1);
    assert_eq!(session.unit(first).unwrap().hp(), fixed(25));

    let second = session.place_troop(UnitKind::Barbarian, 3, spot).unwrap();
    let events = run_seconds(&mut session, 3);
    assert_eq!(detonations(&events), 0);
    assert_eq!(session.unit(second).unwrap().hp(), fixed(65));

    assert_eq!(session.rearm_traps(), 1);
    let events = run_seconds(&mut session, 1);
    assert_eq!(detonations(&events), 1);
    assert!(!session.unit(first).unwrap().is_alive());
    assert_eq!(session.unit(second).unwrap().hp(), fixed(25));
}

// =============================================================================
// Dead units
// =============================================================================

#[test]
fn dead_units_are_inert() {
    let (mut session, _) = with_buildings(&[("Cannon", 10.0, 10.0)]);
    let spot = cell_position(10, 10) + Vec2Fixed::from_ints(100, 0);
    let id = session.place_troop(UnitKind::Barbarian, 1, spot).unwrap();

    run_seconds(&mut session, 6);
    let corpse: Unit = session.unit(id).unwrap().clone();
    assert_eq!(corpse.state(), UnitState::Dead);
    assert_eq!(corpse.hp(), Fixed::ZERO);
    assert_eq!(corpse.target, None);

    let corpse_spot = corpse.position;
    session.cast_spell(SpellKind::Heal, corpse_spot).unwrap();
    session.cast_spell(SpellKind::Rage, corpse_spot).unwrap();
    session.cast_spell(SpellKind::Lightning, corpse_spot).unwrap();
    run_seconds(&mut session, 8);

    assert_eq!(session.unit(id).unwrap(), &corpse);
}

// =============================================================================
// Replay
// =============================================================================

fn unit_trace(initial: &BattleSession, log: &raid_core::record::RecordLog) -> Vec<Vec<Unit>> {
    let mut player = ReplayPlayer::new(initial, log.clone(), 4).unwrap();
    let mut trace = Vec::new();
    while player.advance() {
        trace.push(player.session().units().iter().cloned().collect());
    }
    trace
}

#[test]
fn heal_log_replays_to_identical_unit_states() {
    let initial = empty_session();
    let log = heal_log();
    let a = unit_trace(&initial, &log);
    let b = unit_trace(&initial, &log);
    assert_eq!(a.len(), b.len());
    assert_eq!(a, b);
    assert_eq!(a.last().unwrap().len(), 1);
    assert_eq!(a.last().unwrap()[0].kind, UnitKind::Barbarian);
}

#[test]
fn attack_log_replays_through_json() {
    let initial = sample_session();
    let log = attack_log();
    let json = log.to_json_string().unwrap();
    let reparsed = raid_core::record::RecordLog::from_json_str(&json).unwrap();
    assert_eq!(reparsed, log);

    let mut direct = ReplayPlayer::new(&initial, log, 0).unwrap();
    let mut from_json = ReplayPlayer::new(&initial, reparsed, 0).unwrap();
    direct.run_to_end();
    from_json.run_to_end();

    assert_eq!(direct.records_applied(), 10);
    assert_eq!(direct.session().units().len(), 7);
    assert_eq!(direct.session().state_hash(), from_json.session().state_hash());

    let damaged = direct
        .session()
        .buildings()
        .iter()
        .filter(|b| b.hp() < b.max_hp())
        .count();
    assert!(damaged > 0);
}

#[test]
fn live_battle_and_its_replay_agree() {
    let mut live = sample_session();
    let initial = live.clone();
    live.start_recording();
    for record in attack_log().records {
        // Issue each placement when the live clock reaches its second.
        while live.tick_count() < u64::try_from(record.timestamp).unwrap() * u64::from(TICK_RATE) {
            live.tick();
        }
        live.apply_placement(&record.placement).unwrap();
    }
    while live.tick_count() < 30 * u64::from(TICK_RATE) {
        live.tick();
    }
    let log = live.finish_recording().unwrap();
    assert_eq!(log.len(), 10);

    let mut player = ReplayPlayer::new(&initial, log, 0).unwrap();
    player.seek(live.tick_count()).unwrap();
    let replayed: Vec<UnitKind> = player.session().units().iter().map(|u| u.kind).collect();
    let expected: Vec<UnitKind> = live.units().iter().map(|u| u.kind).collect();
    assert_eq!(replayed, expected);
    assert_eq!(player.session().state_hash(), live.state_hash());
}
