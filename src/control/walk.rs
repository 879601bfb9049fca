//! Ground movement: straight walks along a cardinal axis and jumps.

use serde::{Deserialize, Serialize};

use crate::agent::Control;
use crate::config::{StagnationCheck, WalkTuning};
use crate::core::Task;
use crate::error::{Error, PreconditionError, Result};
use crate::geometry::{Axis, Vec3};
use crate::plog_debug;

use super::{Controller, MotionCtx, StagnationDetector};

/// How hard to push while walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveLevel {
    Walk = 1,
    Sprint = 2,
}

/// Parameters for [`Controller::jump_forward`]. Unset fields are derived
/// from the distance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JumpTactic {
    pub sprint: Option<bool>,
    /// Horizontal blocks per tick.
    pub speed: Option<f64>,
}

/// Target of an axis walk, fixed for one invocation.
#[derive(Debug, Clone, Copy)]
struct AxisGoal {
    axis: Axis,
    target: Vec3,
}

impl AxisGoal {
    /// Signed distance left along the travel direction.
    fn remaining(&self, pos: Vec3) -> f64 {
        (self.target - pos).dot(self.axis.unit())
    }

    fn stable_value(&self) -> f64 {
        self.target.get(self.axis.stable_coord())
    }
}

/// Per-tick verdict of an axis walk.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Continue,
    Reached,
}

/// Classify one tick, in priority order: stable-axis drift, vertical drift,
/// goal reached, overshoot. Stagnation is checked by the caller only on
/// `Continue`.
fn classify_axis_step(goal: &AxisGoal, pos: Vec3, tuning: &WalkTuning) -> Result<Step> {
    let stable = goal.axis.stable_coord();
    let drift = (pos.get(stable) - goal.stable_value()).abs();
    if drift > tuning.stable_slack {
        plog_debug!(
            "move_axis: stable axis {:?} drifted to {} (target {})",
            stable,
            pos.get(stable),
            goal.stable_value()
        );
        return Err(Error::Interfered(format!(
            "stable coordinate drifted by {:.3}",
            drift
        )));
    }

    if (pos.y - goal.target.y).abs() > tuning.vertical_tolerance + f64::EPSILON {
        plog_debug!("move_axis: altitude {} vs target {}", pos.y, goal.target.y);
        return Err(Error::Interfered(format!(
            "altitude changed to {:.3}, expected {:.3}",
            pos.y, goal.target.y
        )));
    }

    let remaining = goal.remaining(pos);
    if remaining.abs() <= tuning.goal_tolerance {
        return Ok(Step::Reached);
    }
    if remaining < -tuning.goal_tolerance {
        plog_debug!("move_axis: went past target by {}", -remaining);
        return Err(Error::Interfered(format!(
            "overshot target by {:.3}",
            -remaining
        )));
    }
    Ok(Step::Continue)
}

impl Controller {
    /// Walk in a straight line along `axis` to `target`.
    ///
    /// `target` is snapped to its block centre and must lie on the agent's
    /// line of travel and walking plane, ahead of the agent. The task
    /// resolves to the number of ticks used; on success the agent's x and z
    /// are exactly the target's.
    pub fn move_axis(&self, axis: Axis, target: Vec3, level: MoveLevel) -> Result<Task<u32>> {
        let tuning = self.tuning.walk.clone();
        let target = target.centralize_xz();
        let source = self.agent.position().centralize_xz();
        let delta = target - source;
        let goal = AxisGoal { axis, target };
        let remaining = goal.remaining(source);

        plog_debug!(
            "move_axis: source {} target {} axis {} distance {}",
            source,
            target,
            axis,
            remaining
        );

        if delta.y.abs() > tuning.vertical_tolerance + f64::EPSILON
            || delta.get(axis.stable_coord()).abs() > f64::EPSILON
        {
            return Err(Error::argument(format!(
                "target {} is not on the {} line from {}",
                target, axis, source
            )));
        }
        if remaining < 0.0 {
            return Err(Error::argument(format!(
                "target lies behind the agent, use axis {}",
                axis.opposite()
            )));
        }
        if !self.agent.on_ground() {
            return Err(PreconditionError::NotGrounded.into());
        }

        Ok(self.spawn_motion("move_axis", move |mut ctx: MotionCtx<u32>| async move {
            ctx.agent.clear_controls();
            ctx.agent.set_position(source);
            ctx.look(axis.yaw(), 0.0).await?;

            ctx.controls.enable(Control::Forward);
            ctx.controls.set(Control::Sprint, level >= MoveLevel::Sprint);
            ctx.apply();

            let stable = axis.stable_coord();
            let mut stagnation = StagnationDetector::new(tuning.stagnation, source);
            loop {
                let mut pos = ctx.tick().await?;
                match classify_axis_step(&goal, pos, &tuning)? {
                    Step::Reached => {
                        ctx.release();
                        ctx.settle_xz(target);
                        return Ok(ctx.ticks);
                    }
                    Step::Continue => {
                        pos.set(stable, goal.stable_value());
                        if stagnation.push(pos) {
                            plog_debug!(
                                "move_axis: no progress since {:?}, now {}",
                                stagnation.oldest(),
                                pos
                            );
                            return Err(Error::PathBlocked(format!(
                                "no progress for {} ticks at {}",
                                tuning.stagnation.window, pos
                            )));
                        }
                    }
                }
            }
        }))
    }

    /// Press jump for a single tick.
    pub fn jump(&self) -> Task<()> {
        self.spawn_motion("jump", |mut ctx: MotionCtx<()>| async move {
            ctx.controls.enable(Control::Jump);
            ctx.apply();
            ctx.tick().await?;
            ctx.release();
            Ok(())
        })
    }

    /// Jump onto the block ahead along `axis`, holding forward and jump for
    /// `ticks` ticks, then snap onto the centre of that block.
    pub fn jump_up(&self, axis: Axis, ticks: u32) -> Result<Task<()>> {
        if ticks == 0 {
            return Err(Error::argument("jump_up needs at least one tick"));
        }
        if !self.agent.on_ground() {
            return Err(PreconditionError::NotGrounded.into());
        }
        let start = self.agent.position().centralize_xz();

        Ok(self.spawn_motion("jump_up", move |mut ctx: MotionCtx<()>| async move {
            ctx.agent.set_position(start);
            ctx.look(axis.yaw(), 0.0).await?;
            ctx.controls.enable(Control::Forward);
            ctx.controls.enable(Control::Jump);
            ctx.apply();
            for _ in 0..ticks {
                ctx.tick().await?;
            }
            ctx.release();

            let landing = start + axis.unit() + Vec3::new(0.0, 1.0, 0.0);
            ctx.agent.set_position(landing);
            ctx.settle_xz(landing);
            ctx.tick().await?;
            Ok(())
        }))
    }

    /// Running jump of `distance` blocks along `axis`.
    ///
    /// Sprints by default for jumps longer than 3 blocks. Fails with
    /// `Interfered` if the agent ends up more than the configured slack
    /// away from the landing point.
    pub fn jump_forward(&self, axis: Axis, distance: f64, tactic: JumpTactic) -> Result<Task<()>> {
        if !distance.is_finite() || distance <= 0.0 {
            return Err(Error::argument(format!("invalid jump distance {}", distance)));
        }
        if !self.agent.on_ground() {
            return Err(PreconditionError::NotGrounded.into());
        }
        let tuning = self.tuning.walk.clone();
        let sprint = tactic.sprint.unwrap_or(distance > 3.0);
        let speed = tactic.speed.unwrap_or(if sprint {
            tuning.jump_sprint_speed
        } else {
            tuning.jump_walk_speed
        });
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::argument(format!("invalid jump speed {}", speed)));
        }

        let start = self.agent.position().centralize_xz();
        let target = start + axis.unit() * distance;
        plog_debug!(
            "jump_forward: target {} sprint={} speed={}",
            target,
            sprint,
            speed
        );

        Ok(self.spawn_motion("jump_forward", move |mut ctx: MotionCtx<()>| async move {
            ctx.agent.set_position(start);
            ctx.look(axis.yaw(), 0.0).await?;

            ctx.controls.enable(Control::Forward);
            ctx.controls.enable(Control::Jump);
            ctx.controls.set(Control::Sprint, sprint);
            ctx.apply();
            let vel = ctx.agent.velocity();
            ctx.agent.set_velocity(vel + axis.unit() * speed);

            ctx.tick().await?;
            ctx.controls.disable(Control::Jump);
            ctx.apply();

            let airborne = ((distance / speed) - 1.0).floor().max(0.0) as u32;
            for _ in 0..airborne {
                ctx.tick().await?;
            }
            ctx.release();

            let pos = ctx.agent.position();
            plog_debug!("jump_forward: done at {}", pos);
            if pos.xz_distance(target) > tuning.jump_landing_slack {
                return Err(Error::Interfered(format!(
                    "landed at {}, expected {}",
                    pos, target
                )));
            }
            ctx.settle_xz(target);
            Ok(())
        }))
    }

    /// Jump and wait for the top of the arc. Resolves to the apex altitude.
    pub fn jump_to_highest(&self) -> Result<Task<f64>> {
        if !self.agent.on_ground() {
            return Err(PreconditionError::NotGrounded.into());
        }

        Ok(self.spawn_motion("jump_to_highest", |mut ctx: MotionCtx<f64>| async move {
            ctx.controls.enable(Control::Jump);
            ctx.apply();
            let mut pos = ctx.tick().await?;
            ctx.release();
            let mut stagnation = StagnationDetector::new(StagnationCheck::every_tick(5), pos);

            while ctx.agent.velocity().y > 0.0 {
                pos = ctx.tick().await?;
                if stagnation.push(pos) {
                    return Err(Error::PathBlocked(format!("jump stuck at {}", pos)));
                }
            }
            Ok(pos.y)
        }))
    }
}
