//! Vertical climb with jump held, e.g. up a ladder or vine column.
//!
//! Progress per tick is small, so stagnation is judged on a coarse window
//! (every ten ticks by default) rather than every tick.

use crate::agent::Control;
use crate::core::Task;
use crate::error::{Error, Result};
use crate::plog_debug;

use super::{Controller, MotionCtx, StagnationDetector};

impl Controller {
    /// Climb straight up to altitude `target_y`. Resolves to the ticks used.
    pub fn ascend_ladder(&self, target_y: f64) -> Result<Task<u32>> {
        let tuning = self.tuning.ladder.clone();
        let start = self.agent.position().centralize_xz();
        if !target_y.is_finite() || target_y - start.y <= tuning.goal_tolerance {
            return Err(Error::argument(format!(
                "ladder target {} must be above the agent at {}",
                target_y, start.y
            )));
        }
        plog_debug!("ascend_ladder: from {} to y={}", start, target_y);

        Ok(self.spawn_motion("ascend_ladder", move |mut ctx: MotionCtx<u32>| async move {
            ctx.agent.clear_controls();
            ctx.agent.set_position(start);
            ctx.checkpoint()?;

            ctx.controls.enable(Control::Jump);
            ctx.apply();

            let mut stagnation = StagnationDetector::new(tuning.stagnation, start);
            loop {
                let pos = ctx.tick().await?;

                let lateral = pos.xz_distance(start);
                if lateral > tuning.lateral_slack {
                    plog_debug!("ascend_ladder: pushed {} off the column to {}", lateral, pos);
                    return Err(Error::Interfered(format!(
                        "pushed {:.3} off the climbing column",
                        lateral
                    )));
                }

                let remaining = target_y - pos.y;
                if remaining.abs() <= tuning.goal_tolerance {
                    ctx.release();
                    ctx.settle_xz(start);
                    return Ok(ctx.ticks);
                }
                if remaining < -tuning.goal_tolerance {
                    plog_debug!("ascend_ladder: overshot to y={}", pos.y);
                    return Err(Error::Interfered(format!(
                        "climbed past target to {:.3}",
                        pos.y
                    )));
                }

                if stagnation.push(pos) {
                    plog_debug!(
                        "ascend_ladder: stuck at {} (window start {:?})",
                        pos,
                        stagnation.oldest()
                    );
                    return Err(Error::PathBlocked(format!(
                        "climb stalled at y={:.3}",
                        pos.y
                    )));
                }
            }
        }))
    }
}
