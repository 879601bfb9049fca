//! Behavior trees driving real motions.

use std::sync::Arc;

use tickpilot::behavior::{Action, BehaviorTree, Fallback, Node, Sequence};
use tickpilot::control::{Controller, MoveLevel};
use tickpilot::geometry::{Axis, Vec3};
use tickpilot::{ErrorKind, Result};

use crate::fixtures::{assert_close, SimAgent, World, GROUND_Y};

fn walk(axis: Axis, x: f64, z: f64) -> impl Node<Controller> {
    Action::new(format!("walk {} to ({}, {})", axis, x, z), move |ctrl: Arc<Controller>| async move {
        ctrl.move_axis(axis, Vec3::new(x, GROUND_Y, z), MoveLevel::Sprint)?
            .get()
            .await
            .map(|_| ())
    })
}

/// Test: Two-leg route
/// Given flat ground
/// When a sequence walks north then east
/// Then the agent ends on the corner block
#[tokio::test]
async fn test_sequence_of_walks() {
    let agent = SimAgent::new(World::flat());
    let ctrl = Arc::new(Controller::new(agent.clone()));

    let tree = BehaviorTree::new(
        Sequence::new()
            .append_child(walk(Axis::North, 0.5, -3.5))
            .append_child(walk(Axis::East, 3.5, -3.5)),
    );
    tree.run(ctrl).await.unwrap();

    let pos = agent.position_now();
    assert_close(pos.x, 3.5);
    assert_close(pos.z, -3.5);
}

/// Test: Detour around a wall
/// Given a wall two blocks north
/// When a fallback first tries the direct walk, then a detour east
/// Then the direct walk fails as blocked and the detour succeeds
#[tokio::test]
async fn test_fallback_takes_detour() {
    let agent = SimAgent::new(World::flat().with_wall(0, -2));
    let ctrl = Arc::new(Controller::new(agent.clone()));

    let detour = Sequence::new()
        .append_child(walk(Axis::East, 1.5, -0.5))
        .append_child(walk(Axis::North, 1.5, -4.5));
    let tree = BehaviorTree::new(
        Fallback::new()
            .append_child(walk(Axis::North, 0.5, -4.5))
            .append_child(detour),
    );
    tree.run(ctrl).await.unwrap();

    let pos = agent.position_now();
    assert_close(pos.x, 1.5);
    assert_close(pos.z, -4.5);
}

#[tokio::test]
async fn test_sequence_reports_motion_failure() {
    let agent = SimAgent::new(World::flat().with_wall(0, -2));
    let ctrl = Arc::new(Controller::new(agent.clone()));

    let tree = BehaviorTree::new(
        Sequence::new()
            .append_child(walk(Axis::North, 0.5, -4.5))
            .append_child(walk(Axis::East, 3.5, -4.5)),
    );
    let err = tree.run(ctrl).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathBlocked);
}

#[tokio::test]
async fn test_action_can_reject_synchronously() {
    let agent = SimAgent::new(World::flat());
    let ctrl = Arc::new(Controller::new(agent.clone()));

    let node = walk(Axis::North, 0.5, 3.5);
    let result: Result<()> = node.tick(ctrl).await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Argument);
}
