//! Glider take-off and booster-powered ascent.

use std::f64::consts::FRAC_PI_2;

use serde::Serialize;

use crate::agent::{Agent, EquipSlot, ItemKind};
use crate::config::AscentMode;
use crate::core::Task;
use crate::error::{Error, PreconditionError, Result};
use crate::geometry::Vec3;
use crate::plog_debug;

use super::{Controller, MotionCtx};

/// Outcome of a powered ascent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AscentSummary {
    pub ticks: u32,
    pub boosts: u32,
    pub altitude: f64,
}

/// Whether to keep waiting on the current boost instead of firing the next.
pub fn keep_waiting(mode: AscentMode, agent: &dyn Agent) -> bool {
    boost_still_useful(mode, agent.velocity().y, agent.boost_ticks_remaining())
}

fn boost_still_useful(mode: AscentMode, vertical_speed: f64, boost_ticks: u32) -> bool {
    match mode {
        AscentMode::Graceful { min_vertical_speed } => vertical_speed >= min_vertical_speed,
        AscentMode::Fast { velocity_ceiling } => {
            boost_ticks > 0 || velocity_ceiling.is_some_and(|ceiling| vertical_speed > ceiling)
        }
    }
}

impl Controller {
    /// Check the glider is worn and at least `boosters` boosters are carried.
    fn validate_flight(&self, boosters: u32) -> Result<()> {
        if self.skip_validation {
            plog_debug!("validate_flight: skipped");
            return Ok(());
        }

        match self.agent.equipped(EquipSlot::Torso) {
            Some(item) if item.kind == ItemKind::Glider => {}
            other => {
                plog_debug!("validate_flight: torso slot holds {:?}", other);
                return Err(PreconditionError::MissingEquipment("glider".to_string()).into());
            }
        }

        if boosters > 0 {
            let available = self.agent.count_items(&ItemKind::Booster);
            if available < boosters {
                plog_debug!("validate_flight: {} boosters, need {}", available, boosters);
                return Err(PreconditionError::InsufficientResource {
                    required: boosters,
                    available,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Wear the glider and hold boosters.
    pub fn prepare_flight(&self) -> Task<()> {
        self.spawn_motion("prepare_flight", |ctx: MotionCtx<()>| async move {
            ctx.agent.equip(ItemKind::Glider, EquipSlot::Torso).await?;
            ctx.checkpoint()?;
            ctx.agent.equip(ItemKind::Booster, EquipSlot::Hand).await?;
            ctx.checkpoint()
        })
    }

    /// Deploy the glider, jumping first when standing on the ground.
    pub fn take_off(&self) -> Result<Task<()>> {
        if self.agent.is_gliding() {
            return Err(PreconditionError::AlreadyGliding.into());
        }
        self.validate_flight(0)?;

        let ctrl = self.clone();
        Ok(self.spawn_motion("take_off", move |ctx: MotionCtx<()>| async move {
            take_off_steps(&ctrl, &ctx).await
        }))
    }

    /// Climb to `target_y` with boosters, using the configured ascent mode.
    pub fn ascend(&self, target_y: f64) -> Result<Task<AscentSummary>> {
        self.ascend_with(target_y, self.tuning.flight.mode)
    }

    /// Climb to `target_y` with boosters.
    ///
    /// Fires a booster, waits while `mode` says the boost is still useful,
    /// and repeats until the target altitude is reached. Re-equips boosters
    /// from the inventory when the held stack runs out.
    pub fn ascend_with(&self, target_y: f64, mode: AscentMode) -> Result<Task<AscentSummary>> {
        let tuning = self.tuning.flight.clone();
        let start = self.agent.position();
        if !target_y.is_finite() || target_y - start.y <= tuning.goal_tolerance {
            return Err(Error::argument(format!(
                "ascent target {} must be above the agent at {}",
                target_y, start.y
            )));
        }
        self.validate_flight(1)?;

        let anchor = start.centralize_xz();
        plog_debug!("ascend: from {} to y={} mode={:?}", anchor, target_y, mode);

        let ctrl = self.clone();
        Ok(self.spawn_motion("ascend", move |mut ctx: MotionCtx<AscentSummary>| async move {
            ctx.agent.set_position(ctx.agent.position().with_xz_of(anchor));
            ctx.look(0.0, FRAC_PI_2).await?;
            if !ctx.agent.is_gliding() {
                take_off_steps(&ctrl, &ctx).await?;
            }
            ctx.tick().await?;

            let floor = target_y - tuning.goal_tolerance;
            let mut boosts = 0;
            'boost: while ctx.agent.position().y < floor {
                ensure_booster(&ctx).await?;
                let before = ctx.agent.position().y;
                ctx.agent.activate_held_item();
                boosts += 1;
                plog_debug!("ascend: boost {} at y={}", boosts, before);

                loop {
                    let wait = ctx.agent.boost_ticks_remaining().max(1);
                    for _ in 0..wait {
                        let pos = ctx.tick().await?;
                        check_flight_drift(&*ctx.agent, pos, anchor, tuning.lateral_slack)?;
                        if pos.y >= floor {
                            break 'boost;
                        }
                    }
                    if !keep_waiting(mode, &*ctx.agent) {
                        break;
                    }
                }

                let gained = ctx.agent.position().y - before;
                if gained < f64::EPSILON {
                    plog_debug!("ascend: boost {} gained {}", boosts, gained);
                    return Err(Error::PathBlocked(format!(
                        "no altitude gained at y={:.3}",
                        before
                    )));
                }
            }

            ctx.release();
            ctx.settle_xz(anchor);
            Ok(AscentSummary {
                ticks: ctx.ticks,
                boosts,
                altitude: ctx.agent.position().y,
            })
        }))
    }
}

async fn take_off_steps<T>(ctrl: &Controller, ctx: &MotionCtx<T>) -> Result<()>
where
    T: Clone + Send + Sync + 'static,
{
    if ctx.agent.on_ground() {
        let jump = ctrl.jump_to_highest()?;
        let apex = ctx.wait_dependent_one(jump).await?;
        plog_debug!("take_off: apex at y={}", apex);
    }
    ctx.agent.start_gliding().await?;
    ctx.checkpoint()
}

/// Make sure a booster is in hand, pulling one from the inventory if needed.
async fn ensure_booster<T>(ctx: &MotionCtx<T>) -> Result<()>
where
    T: Clone + Send + Sync + 'static,
{
    let held = ctx
        .agent
        .held_item()
        .is_some_and(|item| item.kind == ItemKind::Booster && item.count > 0);
    if held {
        return Ok(());
    }

    let available = ctx.agent.count_items(&ItemKind::Booster);
    if available == 0 {
        plog_debug!("ascend: out of boosters");
        return Err(PreconditionError::InsufficientResource {
            required: 1,
            available: 0,
        }
        .into());
    }
    plog_debug!("ascend: re-equipping boosters, {} left", available);
    ctx.agent.equip(ItemKind::Booster, EquipSlot::Hand).await?;
    ctx.checkpoint()
}

fn check_flight_drift(agent: &dyn Agent, pos: Vec3, anchor: Vec3, slack: f64) -> Result<()> {
    if !agent.is_gliding() {
        return Err(Error::Interfered(format!("glide ended at {}", pos)));
    }
    let lateral = pos.xz_distance(anchor);
    if lateral > slack {
        plog_debug!("ascend: drifted {} from {} to {}", lateral, anchor, pos);
        return Err(Error::Interfered(format!(
            "drifted {:.3} off the ascent column",
            lateral
        )));
    }
    Ok(())
}
