//! Behaviour every collision backend must share

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::foundation::logging;
use crate::foundation::math::Vec3;
use crate::physics::{Border, CollisionEngine, EngineKind};

/// Every backend that can be built here, at `granularity`
fn engines(granularity: u32) -> Vec<CollisionEngine> {
    logging::init_for_tests();
    let mut engines = vec![
        CollisionEngine::new(EngineKind::Serial, granularity).unwrap(),
        CollisionEngine::new(EngineKind::Parallel, granularity).unwrap(),
    ];
    if cfg!(feature = "accelerator") {
        match CollisionEngine::new(EngineKind::Accelerator, granularity) {
            Ok(engine) if engine.granularity() == granularity => engines.push(engine),
            Ok(_) => log::warn!("Accelerator clamped granularity {granularity}, skipping"),
            Err(e) => log::warn!("Accelerator not available: {e}"),
        }
    }
    engines
}

fn cube(center: Vec3, half: f32) -> Border {
    Border::new(center, Vec3::repeat(half))
}

fn assert_all(granularity: u32, target: &Border, obstacle: &Border, expected: f32) {
    for engine in engines(granularity) {
        let fraction = engine.compute_collision(target, obstacle).unwrap();
        assert_abs_diff_eq!(fraction, expected, epsilon = 1e-6);
    }
}

#[test]
fn test_overlapping_at_start_gives_zero() {
    // Half-width 2: [-2, 2] and [1, 5] already overlap
    let a = cube(Vec3::zeros(), 2.0).with_movement(Vec3::new(1.0, 0.0, 0.0));
    let b = cube(Vec3::new(3.0, 0.0, 0.0), 2.0);
    assert_all(10, &a, &b, 0.0);
}

#[test]
fn test_contact_at_end_of_move() {
    // Side 2: [-1, 1] reaches [2, 4] exactly when the full move is applied
    let a = cube(Vec3::zeros(), 1.0).with_movement(Vec3::new(1.0, 0.0, 0.0));
    let b = cube(Vec3::new(3.0, 0.0, 0.0), 1.0);
    assert_all(10, &a, &b, 0.9);
}

#[test]
fn test_far_obstacle_is_clear() {
    let a = cube(Vec3::zeros(), 1.0).with_movement(Vec3::new(1.0, 0.0, 0.0));
    let b = cube(Vec3::new(10.0, 0.0, 0.0), 1.0);
    assert_all(10, &a, &b, 1.0);
}

#[test]
fn test_both_moving_towards_each_other() {
    // Gap of 2 closed from both sides at unit speed: contact at part 0.5
    let a = cube(Vec3::zeros(), 0.5).with_movement(Vec3::new(2.0, 0.0, 0.0));
    let b = cube(Vec3::new(3.0, 0.0, 0.0), 0.5).with_movement(Vec3::new(-2.0, 0.0, 0.0));
    assert_all(8, &a, &b, 0.375);
}

#[test]
fn test_moving_apart_is_clear() {
    let a = cube(Vec3::zeros(), 0.5).with_movement(Vec3::new(-1.0, 0.0, 0.0));
    let b = cube(Vec3::new(1.5, 0.0, 0.0), 0.5);
    assert_all(16, &a, &b, 1.0);
}

#[test]
fn test_serial_matches_parallel_on_random_configurations() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..500 {
        let random_vec = |rng: &mut StdRng, range: f32| {
            Vec3::new(
                rng.gen_range(-range..range),
                rng.gen_range(-range..range),
                rng.gen_range(-range..range),
            )
        };
        let a = Border::new(random_vec(&mut rng, 4.0), random_vec(&mut rng, 1.0).abs().add_scalar(0.1))
            .with_movement(random_vec(&mut rng, 3.0));
        let b = Border::new(random_vec(&mut rng, 4.0), random_vec(&mut rng, 1.0).abs().add_scalar(0.1))
            .with_movement(random_vec(&mut rng, 3.0));

        for granularity in [1, 3, 7, 16, 33, 64] {
            let serial = CollisionEngine::new(EngineKind::Serial, granularity).unwrap();
            let parallel = CollisionEngine::new(EngineKind::Parallel, granularity).unwrap();
            assert_eq!(
                serial.compute_collision(&a, &b).unwrap().to_bits(),
                parallel.compute_collision(&a, &b).unwrap().to_bits(),
                "granularity {granularity}: {a:?} vs {b:?}"
            );
        }
    }
}

#[test]
fn test_accelerator_matches_serial_when_present() {
    let mut rng = StdRng::seed_from_u64(7);
    let granularity = 32;
    let serial = CollisionEngine::new(EngineKind::Serial, granularity).unwrap();
    let Some(accelerator) = engines(granularity).into_iter().find(|e| e.kind() == EngineKind::Accelerator) else {
        return;
    };

    for _ in 0..50 {
        let a = cube(Vec3::new(rng.gen_range(-2.0..2.0), 0.0, 0.0), 0.5)
            .with_movement(Vec3::new(rng.gen_range(-3.0..3.0), rng.gen_range(-0.5..0.5), 0.0));
        let b = cube(Vec3::new(rng.gen_range(-2.0..2.0), 0.0, 0.0), 0.5);
        let expected = serial.compute_collision(&a, &b).unwrap();
        let actual = accelerator.compute_collision(&a, &b).unwrap();
        // One step of slack for differing float rounding on the device
        assert_abs_diff_eq!(actual, expected, epsilon = 1.0 / granularity as f32 + 1e-6);
    }
}

#[test]
fn test_fraction_brackets_analytic_contact() {
    for contact in [0.13_f32, 0.37, 0.61, 0.83] {
        // Unit cube moving +1 towards a unit cube whose near face is `contact` away
        let a = cube(Vec3::zeros(), 0.5).with_movement(Vec3::new(1.0, 0.0, 0.0));
        let b = cube(Vec3::new(1.0 + contact, 0.0, 0.0), 0.5);

        let mut coarser: Option<f32> = None;
        for granularity in [4, 8, 16, 32, 64, 128] {
            let step = 1.0 / granularity as f32;
            for engine in engines(granularity) {
                let fraction = engine.compute_collision(&a, &b).unwrap();
                assert!(fraction < 1.0, "contact {contact} missed at granularity {granularity}");
                assert!(fraction <= contact, "{fraction} past contact {contact}");
                assert!(fraction >= contact - step - 1e-6, "{fraction} too early for {contact}");
            }

            let fraction = engines(granularity)[0].compute_collision(&a, &b).unwrap();
            if let Some(previous) = coarser {
                // Refining moves the answer by less than one coarse step
                assert!((fraction - previous).abs() < 2.0 * step + 1e-6);
            }
            coarser = Some(fraction);
        }
    }
}

#[test]
fn test_doubling_never_loses_a_hit() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let a = cube(Vec3::zeros(), rng.gen_range(0.2..1.0))
            .with_movement(Vec3::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0), rng.gen_range(-1.0..1.0)));
        let b = cube(
            Vec3::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0), rng.gen_range(-1.0..1.0)),
            rng.gen_range(0.2..1.0),
        );

        let mut granularity = 2;
        let mut previous = CollisionEngine::serial();
        let mut previous_fraction = 1.0;
        for round in 0..6 {
            let engine = CollisionEngine::new(EngineKind::Serial, granularity).unwrap();
            let fraction = engine.compute_collision(&a, &b).unwrap();
            if round > 0 && previous_fraction < 1.0 {
                assert!(fraction < 1.0, "hit at {} lost at {}", previous.granularity(), granularity);
                assert!(fraction <= previous_fraction + 1.0 / granularity as f32 + 1e-6);
            }
            previous = engine;
            previous_fraction = fraction;
            granularity *= 2;
        }
    }
}

#[test]
fn test_fast_thin_crossing_needs_finer_steps() {
    // Each of 4 steps jumps 2.5: the obstacle at [3.4, 4.4] falls between two samples
    let a = cube(Vec3::zeros(), 0.5).with_movement(Vec3::new(10.0, 0.0, 0.0));
    let b = cube(Vec3::new(3.9, 0.0, 0.0), 0.5);
    assert_all(4, &a, &b, 1.0);

    let fine = CollisionEngine::new(EngineKind::Serial, 16).unwrap();
    assert!(fine.compute_collision(&a, &b).unwrap() < 1.0);
}

#[test]
fn test_single_instant_overlap_agrees_across_backends() {
    // x closes while y opens: the borders overlap only at part 0.5
    let a = cube(Vec3::zeros(), 0.5).with_movement(Vec3::new(2.0, 2.0, 0.0));
    let b = cube(Vec3::new(2.0, 0.0, 0.0), 0.5);

    assert_all(10, &a, &b, 0.4);
    assert_all(8, &a, &b, 0.375);
    // 0.5 is not a sample point of 5 steps
    assert_all(5, &a, &b, 1.0);
}
