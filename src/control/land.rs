//! Two-phase landing: a hovering descent down to a safety altitude, then a
//! free fall with the glider stowed.

use std::f64::consts::PI;

use crate::agent::Control;
use crate::core::Task;
use crate::error::{Error, PreconditionError, Result};
use crate::geometry::{yaw_towards, Vec3};
use crate::plog_debug;

use super::{Controller, MotionCtx, StagnationDetector};

/// Headings cycled through while hovering down.
const HOVER_HEADINGS: [f64; 3] = [0.0, 2.0 * PI / 3.0, 4.0 * PI / 3.0];

fn check_displacement(pos: Vec3, anchor: Vec3, radius: f64, phase: &str) -> Result<()> {
    let drift = pos.xz_distance(anchor);
    if drift > radius {
        plog_debug!("land: {} drifted {} from {}", phase, drift, anchor);
        return Err(Error::Interfered(format!(
            "drifted {:.3} from the landing column during {}",
            drift, phase
        )));
    }
    Ok(())
}

impl Controller {
    /// Come down onto the column below the agent, stopping on the ground or
    /// at `ground_y`. Resolves to the ticks used.
    pub fn land(&self, ground_y: f64) -> Result<Task<u32>> {
        if !ground_y.is_finite() {
            return Err(Error::argument(format!("invalid landing altitude {}", ground_y)));
        }
        if self.agent.on_ground() {
            return Err(PreconditionError::NotAirborne.into());
        }
        let tuning = self.tuning.land.clone();
        let anchor = self.agent.position().centralize_xz();
        plog_debug!("land: above {} down to y={}", anchor, ground_y);

        Ok(self.spawn_motion("land", move |mut ctx: MotionCtx<u32>| async move {
            let safety = ground_y + tuning.safety_height;
            let mut stagnation = StagnationDetector::new(tuning.stagnation, ctx.agent.position());

            if ctx.agent.is_gliding() {
                ctx.controls.enable(Control::Sneak);
                'hover: for heading in HOVER_HEADINGS.iter().cycle() {
                    ctx.look(*heading, 0.0).await?;
                    ctx.apply();
                    for _ in 0..tuning.ticks_per_heading.max(1) {
                        let pos = ctx.tick().await?;
                        check_displacement(pos, anchor, tuning.hover_radius, "hover")?;
                        if pos.y <= safety || !ctx.agent.is_gliding() {
                            break 'hover;
                        }
                        if stagnation.push(pos) {
                            return Err(Error::PathBlocked(format!("hover stalled at {}", pos)));
                        }
                    }
                }
                ctx.release();
                plog_debug!("land: hover done at {}", ctx.agent.position());
            }

            if ctx.agent.is_gliding() {
                ctx.agent.stop_gliding().await?;
                ctx.checkpoint()?;
            }
            stagnation.reset(ctx.agent.position());

            loop {
                let pos = ctx.agent.position();
                if ctx.agent.on_ground() || pos.y <= ground_y + tuning.goal_tolerance {
                    ctx.settle_xz(anchor);
                    return Ok(ctx.ticks);
                }

                let to_anchor = anchor - pos;
                if to_anchor.xz_norm() > f64::EPSILON {
                    ctx.look(yaw_towards(to_anchor.x, to_anchor.z), 0.0).await?;
                }
                let pos = ctx.tick().await?;
                check_displacement(pos, anchor, tuning.fall_radius, "free fall")?;
                if stagnation.push(pos) {
                    return Err(Error::PathBlocked(format!("fall stalled at {}", pos)));
                }
            }
        }))
    }
}
