//! Level glide integration tests.

use tickpilot::control::Controller;
use tickpilot::geometry::Vec3;
use tickpilot::{ControlState, Error, ErrorKind, PreconditionError};

use crate::fixtures::{assert_close, SimAgent, World};

#[tokio::test]
async fn test_cruise_straight_line() {
    let agent = SimAgent::new(World::gliding_at(Vec3::new(0.5, 100.0, 0.5)));
    let ctrl = Controller::new(agent.clone());

    let summary = ctrl.cruise(0.5, -20.5).unwrap().get().await.unwrap();

    assert_eq!(summary.reanchors, 0);
    let pos = agent.position_now();
    assert_close(pos.x, 0.5);
    assert_close(pos.z, -20.5);
    assert_close(pos.y, 100.0);
    assert!(ControlState::from_agent(&*agent).is_clear());
}

/// Test: Crosswind mid-route
/// Given a push of 2 blocks along x at tick 10
/// When cruising 21 blocks north
/// Then the route is re-anchored instead of failing and the glide still
/// arrives
#[tokio::test]
async fn test_cruise_reanchors_after_lateral_push() {
    let world = World::gliding_at(Vec3::new(0.5, 100.0, 0.5)).push_at(10, Vec3::new(2.0, 0.0, 0.0));
    let agent = SimAgent::new(world);
    let ctrl = Controller::new(agent.clone());

    let summary = ctrl.cruise(0.5, -20.5).unwrap().get().await.unwrap();

    assert!(summary.reanchors >= 1);
    let pos = agent.position_now();
    assert_close(pos.x, 0.5);
    assert_close(pos.z, -20.5);
}

#[tokio::test]
async fn test_cruise_diagonal() {
    let agent = SimAgent::new(World::gliding_at(Vec3::new(0.5, 100.0, 0.5)));
    let ctrl = Controller::new(agent.clone());

    ctrl.cruise(10.5, -20.5).unwrap().get().await.unwrap();

    let pos = agent.position_now();
    assert_close(pos.x, 10.5);
    assert_close(pos.z, -20.5);
}

#[tokio::test]
async fn test_cruise_altitude_loss_is_interfered() {
    let world = World::gliding_at(Vec3::new(0.5, 100.0, 0.5)).push_at(3, Vec3::new(0.0, -5.0, 0.0));
    let agent = SimAgent::new(world);
    let ctrl = Controller::new(agent.clone());

    let err = ctrl.cruise(0.5, -20.5).unwrap().get().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Interfered);
    assert_eq!(agent.tick(), 3);
}

/// Test: Steady crosswind
/// Given a push of 1.5 blocks along x on every tick
/// When cruising 21 blocks north
/// Then the glide keeps re-anchoring until the budget is spent and fails
/// as interfered instead of drifting away
#[tokio::test]
async fn test_cruise_steady_crosswind_is_interfered() {
    let mut world = World::gliding_at(Vec3::new(0.5, 100.0, 0.5));
    for tick in 1..200 {
        world = world.push_at(tick, Vec3::new(1.5, 0.0, 0.0));
    }
    let agent = SimAgent::new(world);
    let ctrl = Controller::new(agent.clone());

    let err = ctrl.cruise(0.5, -20.5).unwrap().get().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Interfered);
    assert!(err.to_string().contains("re-anchored 8 times"), "{}", err);
    assert!(agent.tick() < 20, "kept flying for {} ticks", agent.tick());
    assert!(ControlState::from_agent(&*agent).is_clear());
}

/// Test: Glide into a wall
/// Given a wall column five blocks north
/// When cruising through it
/// Then the glide stalls against the wall and fails as blocked
#[tokio::test]
async fn test_cruise_into_wall_is_blocked() {
    let agent = SimAgent::new(World::gliding_at(Vec3::new(0.5, 100.0, 0.5)).with_wall(0, -5));
    let ctrl = Controller::new(agent.clone());

    let err = ctrl.cruise(0.5, -20.5).unwrap().get().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PathBlocked);
    let pos = agent.position_now();
    assert_close(pos.z, -4.0);
    assert_close(pos.y, 100.0);
    assert!(ControlState::from_agent(&*agent).is_clear());
}

#[tokio::test]
async fn test_cruise_requires_gliding() {
    let agent = SimAgent::new(World::flat());
    let ctrl = Controller::new(agent.clone());

    let err = ctrl.cruise(0.5, -20.5).unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionError::NotAirborne)
    ));
}
