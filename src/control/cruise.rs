//! Level glide towards a horizontal destination.
//!
//! The agent flies along a route from an anchor point to the target. When
//! pushed off the route, or past the target, the route is re-anchored at the
//! current position and the heading recomputed. Forward is released inside
//! the braking distance and pulsed again if the glide stalls short. A glide
//! that keeps getting pushed off course fails once its re-anchor budget is
//! spent.

use serde::Serialize;

use crate::agent::Control;
use crate::core::Task;
use crate::error::{Error, PreconditionError, Result};
use crate::geometry::{yaw_towards, Vec3};
use crate::plog_debug;

use super::{Controller, MotionCtx, StagnationDetector};

/// Outcome of a cruise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CruiseSummary {
    pub ticks: u32,
    /// Times the route was recomputed after drifting or overshooting.
    pub reanchors: u32,
}

/// Straight route segment on the horizontal plane.
#[derive(Debug, Clone, Copy)]
struct Route {
    anchor: Vec3,
    target: Vec3,
}

impl Route {
    fn new(anchor: Vec3, target: Vec3) -> Self {
        Self {
            anchor,
            target: target.with_y(anchor.y),
        }
    }

    fn direction(&self) -> Vec3 {
        (self.target - self.anchor).with_y(0.0)
    }

    fn yaw(&self) -> f64 {
        let d = self.direction();
        yaw_towards(d.x, d.z)
    }

    /// Fraction of the route covered by `pos`, projected onto the route line.
    fn progress(&self, pos: Vec3) -> f64 {
        let d = self.direction();
        let len2 = d.xz_norm_squared();
        if len2 < f64::EPSILON {
            return 1.0;
        }
        (pos - self.anchor).dot_xz(d) / len2
    }

    /// Distance from `pos` to the route line.
    fn lateral_error(&self, pos: Vec3) -> f64 {
        let closest = self.anchor + self.direction() * self.progress(pos);
        pos.xz_distance(closest)
    }
}

impl Controller {
    /// Glide to the column at (`x`, `z`) keeping the current altitude.
    pub fn cruise(&self, x: f64, z: f64) -> Result<Task<CruiseSummary>> {
        if !x.is_finite() || !z.is_finite() {
            return Err(Error::argument(format!("invalid cruise target ({}, {})", x, z)));
        }
        if !self.agent.is_gliding() {
            return Err(PreconditionError::NotAirborne.into());
        }
        let tuning = self.tuning.cruise.clone();
        let start = self.agent.position();
        let target = Vec3::new(x, start.y, z);
        plog_debug!("cruise: from {} to {}", start, target);

        Ok(self.spawn_motion("cruise", move |mut ctx: MotionCtx<CruiseSummary>| async move {
            let mut route = Route::new(start, target);
            let mut reanchors = 0;
            ctx.look(route.yaw(), 0.0).await?;
            ctx.controls.enable(Control::Forward);
            ctx.apply();

            let mut stagnation = StagnationDetector::new(tuning.stagnation, start);
            loop {
                let pos = ctx.tick().await?;

                if (pos.y - start.y).abs() > tuning.altitude_slack {
                    plog_debug!("cruise: altitude {} left the band around {}", pos.y, start.y);
                    return Err(Error::Interfered(format!(
                        "altitude changed to {:.3}, started at {:.3}",
                        pos.y, start.y
                    )));
                }

                let residual = pos.xz_distance(target);
                let speed = ctx.agent.velocity().xz_norm();
                if residual <= tuning.arrival_radius && speed <= tuning.speed_threshold {
                    ctx.release();
                    ctx.settle_xz(target);
                    return Ok(CruiseSummary {
                        ticks: ctx.ticks,
                        reanchors,
                    });
                }

                let stalled = speed <= tuning.speed_threshold;
                let lateral = route.lateral_error(pos);
                let overshot = route.progress(pos) >= 1.0 && residual > tuning.arrival_radius;
                if lateral > tuning.lateral_threshold || overshot {
                    if reanchors >= tuning.max_reanchors {
                        plog_debug!("cruise: giving up at {} after {} re-anchors", pos, reanchors);
                        return Err(Error::Interfered(format!(
                            "re-anchored {} times and still {:.3} from the target",
                            reanchors, residual
                        )));
                    }
                    plog_debug!(
                        "cruise: re-anchoring at {} (lateral {:.3}, overshot {})",
                        pos,
                        lateral,
                        overshot
                    );
                    route = Route::new(pos, target);
                    reanchors += 1;
                    ctx.look(route.yaw(), 0.0).await?;
                    ctx.controls
                        .set(Control::Forward, residual > tuning.brake_distance || stalled);
                    stagnation.reset(pos);
                } else if residual <= tuning.brake_distance {
                    ctx.controls
                        .set(Control::Forward, stalled && residual > tuning.arrival_radius);
                } else {
                    ctx.controls.enable(Control::Forward);
                }
                ctx.apply();

                if stagnation.push(pos) {
                    plog_debug!("cruise: no progress since {:?}", stagnation.oldest());
                    return Err(Error::PathBlocked(format!("glide stalled at {}", pos)));
                }
            }
        }))
    }
}
