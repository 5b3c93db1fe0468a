use glam::Vec3;
use vitrine::config::{EffectKind, EffectsConfig};
use vitrine::ecs::{EffectCaps, StageWorld, Transform3D};
use vitrine::effects::{EffectSpawner, KindSelector};
use vitrine::events::StageEvent;

const DT: f32 = 0.05;

fn spawned_count(events: &[StageEvent]) -> usize {
    events.iter().filter(|e| matches!(e, StageEvent::EffectSpawned { .. })).count()
}

fn dropped_count(events: &[StageEvent]) -> usize {
    events.iter().filter(|e| matches!(e, StageEvent::EffectDropped { .. })).count()
}

#[test]
fn mesh_effects_expire_inside_the_guard_window() {
    let tuning = EffectsConfig::default();
    let mut stage = StageWorld::new();
    let mut spawner = EffectSpawner::new(&tuning);

    spawner.spawn(&mut stage, EffectKind::Mesh).expect("spawn succeeds");
    assert_eq!(stage.live_effects(), 1);

    // Still alive right through the trajectory duration...
    let duration_steps = (tuning.duration / DT) as usize;
    for _ in 0..duration_steps {
        stage.update(DT);
    }
    assert_eq!(stage.live_effects(), 1, "timer disposal must outlive the trajectory");

    // ...and gone once the guard buffer has elapsed.
    let guard_steps = (tuning.guard / DT) as usize + 2;
    for _ in 0..guard_steps {
        stage.update(DT);
    }
    assert_eq!(stage.live_effects(), 0, "mesh effect should be removed after duration + guard");
    let events = stage.drain_events();
    assert!(events.iter().any(|e| matches!(e, StageEvent::EffectExpired { .. })));
}

#[test]
fn sprite_effects_are_removed_by_fade_completion() {
    let tuning = EffectsConfig::default();
    let mut stage = StageWorld::new();
    let mut spawner = EffectSpawner::new(&tuning);

    spawner.spawn(&mut stage, EffectKind::Sprite).expect("spawn succeeds");
    assert_eq!(stage.live_effects(), 1);

    let fade_steps = (tuning.fade_duration / DT) as usize + 2;
    for _ in 0..fade_steps {
        stage.update(DT);
    }
    assert_eq!(stage.live_effects(), 0, "sprite is torn down by its fade, not a timer");
}

#[test]
fn unresolved_owner_spawns_at_the_fallback_anchor() {
    let tuning = EffectsConfig::default();
    let mut stage = StageWorld::new();
    let mut spawner = EffectSpawner::new(&tuning);

    let entity = spawner.spawn(&mut stage, EffectKind::Mesh).expect("fallback spawn");
    let translation = stage.world.get::<Transform3D>(entity).unwrap().translation;
    assert!(
        (translation - Vec3::from(tuning.fallback_position)).length() < 1e-5,
        "spawn origin should be the configured fallback, got {translation:?}"
    );
}

#[test]
fn batch_issues_every_spawn_on_schedule_even_with_nothing_loaded() {
    let tuning = EffectsConfig::default();
    let mut stage = StageWorld::new();
    let mut spawner = EffectSpawner::new(&tuning);

    spawner.queue_batch(KindSelector::Fixed(EffectKind::Mesh), 10, 0.1);
    assert_eq!(spawner.pending_spawns(), 10);

    let mut spawn_times = Vec::new();
    let mut elapsed = 0.0;
    for _ in 0..25 {
        spawner.tick(&mut stage, DT);
        elapsed += DT;
        let events = stage.drain_events();
        for _ in 0..spawned_count(&events) {
            spawn_times.push(elapsed);
        }
        stage.update(DT);
    }

    assert_eq!(spawn_times.len(), 10, "every scheduled spawn must fire");
    assert_eq!(spawner.pending_spawns(), 0);
    for (index, time) in spawn_times.iter().enumerate() {
        let expected = index as f32 * 0.1;
        assert!(
            (time - expected).abs() <= DT + 1e-4,
            "spawn {index} fired at {time:.2}, expected about {expected:.2}"
        );
    }
}

#[test]
fn a_burst_drains_back_to_baseline_after_max_lifetime() {
    let tuning = EffectsConfig::default();
    let mut stage = StageWorld::new();
    let mut spawner = EffectSpawner::new(&tuning);

    spawner.queue_batch(KindSelector::Weighted { sprite_weight: 0.5 }, 10, 0.1);
    let max_lifetime = (tuning.duration + tuning.guard).max(tuning.fade_duration);
    let total_steps = ((1.0 + max_lifetime) / DT) as usize + 10;
    for _ in 0..total_steps {
        spawner.tick(&mut stage, DT);
        stage.update(DT);
    }
    assert_eq!(stage.live_effects(), 0, "all transient effects must self-terminate");
}

#[test]
fn live_cap_drops_spawns_instead_of_accumulating() {
    let tuning = EffectsConfig::default();
    let mut stage = StageWorld::new();
    stage.set_effect_caps(EffectCaps { max_live: 3 });
    let mut spawner = EffectSpawner::new(&tuning);

    for _ in 0..5 {
        spawner.spawn(&mut stage, EffectKind::Mesh);
    }
    assert_eq!(stage.live_effects(), 3, "spawns beyond the cap are rejected");
    let events = stage.drain_events();
    assert_eq!(spawned_count(&events), 3);
    assert_eq!(dropped_count(&events), 2);
}

#[test]
fn mixed_batches_honor_both_disposal_strategies() {
    let mut tuning = EffectsConfig::default();
    // Stretch the fade past the mesh timer so the two windows are distinct.
    tuning.fade_duration = 2.0;
    let mut stage = StageWorld::new();
    let mut spawner = EffectSpawner::new(&tuning);

    spawner.spawn(&mut stage, EffectKind::Mesh);
    spawner.spawn(&mut stage, EffectKind::Sprite);
    assert_eq!(stage.live_effects(), 2);

    // Advance past the mesh window but short of the fade end.
    let mesh_lifetime = tuning.duration + tuning.guard;
    let steps = (mesh_lifetime / DT) as usize + 2;
    for _ in 0..steps {
        stage.update(DT);
    }
    assert_eq!(stage.live_effects(), 1, "sprite outlives the mesh timer window");

    let remaining = (tuning.fade_duration - mesh_lifetime).max(0.0);
    let steps = (remaining / DT) as usize + 2;
    for _ in 0..steps {
        stage.update(DT);
    }
    assert_eq!(stage.live_effects(), 0);
}
