//! Test fixtures for integration tests.
//!
//! Provides a small deterministic world simulation behind the `Agent` trait:
//! - Flat ground with optional walls, one ladder column and a ceiling
//! - Walking, sprinting, jumping and ladder climbing
//! - Gliding with boosters and sneak-descent
//! - Scheduled external pushes at given ticks
//!
//! The world only advances when a control loop waits for a tick, so every
//! run is reproducible.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use tickpilot::actors::TickClock;
use tickpilot::agent::{Agent, Control, ControlState, EquipSlot, ItemKind, ItemStack};
use tickpilot::geometry::{heading, Vec3};
use tickpilot::{Error, PreconditionError, Result};

pub const GROUND_Y: f64 = 64.0;
pub const WALK_SPEED: f64 = 0.25;
pub const SPRINT_SPEED: f64 = 0.5;
pub const GLIDE_SPEED: f64 = 0.5;
pub const CLIMB_SPEED: f64 = 0.2;
pub const JUMP_VELOCITY: f64 = 0.42;
/// Ticks of boost per unit of booster power.
pub const BOOST_TICKS: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct Ladder {
    pub x: i64,
    pub z: i64,
    pub top: f64,
}

/// Simulated world state for a single agent.
#[derive(Debug, Clone)]
pub struct World {
    pub tick: u64,
    pub pos: Vec3,
    pub vel: Vec3,
    pub on_ground: bool,
    pub yaw: f64,
    pub pitch: f64,
    pub controls: ControlState,
    pub gliding: bool,
    pub boost_ticks: u32,
    pub held: Option<ItemStack>,
    pub torso: Option<ItemStack>,
    pub inventory: Vec<ItemStack>,
    pub walls: HashSet<(i64, i64)>,
    pub ladder: Option<Ladder>,
    pub ceiling: Option<f64>,
    pub pushes: Vec<(u64, Vec3)>,
}

fn cell(pos: Vec3) -> (i64, i64) {
    (pos.x.floor() as i64, pos.z.floor() as i64)
}

impl World {
    /// Agent standing at the centre of block (0, 0) on flat ground.
    pub fn flat() -> Self {
        Self {
            tick: 0,
            pos: Vec3::new(0.5, GROUND_Y, 0.5),
            vel: Vec3::ZERO,
            on_ground: true,
            yaw: 0.0,
            pitch: 0.0,
            controls: ControlState::new(),
            gliding: false,
            boost_ticks: 0,
            held: None,
            torso: None,
            inventory: Vec::new(),
            walls: HashSet::new(),
            ladder: None,
            ceiling: None,
            pushes: Vec::new(),
        }
    }

    /// Agent gliding level at `pos` with a glider worn.
    pub fn gliding_at(pos: Vec3) -> Self {
        let mut world = Self::flat().with_glider();
        world.pos = pos;
        world.on_ground = false;
        world.gliding = true;
        world
    }

    pub fn at(mut self, pos: Vec3) -> Self {
        self.pos = pos;
        self
    }

    pub fn with_wall(mut self, x: i64, z: i64) -> Self {
        self.walls.insert((x, z));
        self
    }

    pub fn with_ladder(mut self, x: i64, z: i64, top: f64) -> Self {
        self.ladder = Some(Ladder { x, z, top });
        self
    }

    pub fn with_ceiling(mut self, y: f64) -> Self {
        self.ceiling = Some(y);
        self
    }

    pub fn with_glider(mut self) -> Self {
        self.torso = Some(ItemStack::new(ItemKind::Glider, 1));
        self
    }

    pub fn holding(mut self, stack: ItemStack) -> Self {
        self.held = Some(stack);
        self
    }

    pub fn carrying(mut self, stack: ItemStack) -> Self {
        self.inventory.push(stack);
        self
    }

    /// Displace the agent by `delta` right after the world steps to `tick`.
    pub fn push_at(mut self, tick: u64, delta: Vec3) -> Self {
        self.pushes.push((tick, delta));
        self
    }

    fn ladder_top_here(&self) -> Option<f64> {
        self.ladder
            .filter(|l| cell(self.pos) == (l.x, l.z))
            .map(|l| l.top)
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        self.tick += 1;
        let forward = self.controls.get(Control::Forward);
        let jump = self.controls.get(Control::Jump);
        let sprint = self.controls.get(Control::Sprint);
        let sneak = self.controls.get(Control::Sneak);
        let mut vel = self.vel;

        if self.gliding {
            if forward {
                let h = heading(self.yaw) * GLIDE_SPEED;
                vel.x = h.x;
                vel.z = h.z;
            } else {
                vel.x *= 0.5;
                vel.z *= 0.5;
                if vel.xz_norm() < 0.01 {
                    vel.x = 0.0;
                    vel.z = 0.0;
                }
            }

            if self.boost_ticks > 0 {
                vel.y = (vel.y + 0.1).min(1.0);
                self.boost_ticks -= 1;
            } else if sneak {
                vel.y = -0.25;
            } else if vel.y > 0.0 {
                vel.y = (vel.y - 0.05).max(0.0);
            } else {
                vel.y = (vel.y + 0.05).min(0.0);
            }
        } else {
            if forward {
                let speed = if sprint { SPRINT_SPEED } else { WALK_SPEED };
                let h = heading(self.yaw) * speed;
                vel.x = h.x;
                vel.z = h.z;
            } else if self.on_ground {
                vel.x = 0.0;
                vel.z = 0.0;
            }

            if let Some(top) = self.ladder_top_here() {
                if jump && self.pos.y < top {
                    vel.y = CLIMB_SPEED;
                    self.on_ground = false;
                } else if !self.on_ground {
                    vel.y = 0.0;
                }
            } else if jump && self.on_ground {
                vel.y = JUMP_VELOCITY;
                self.on_ground = false;
            } else if !self.on_ground {
                vel.y = (vel.y - 0.08) * 0.98;
            }
        }

        let mut next = self.pos + vel;
        if self.walls.contains(&cell(next)) {
            next.x = self.pos.x;
            next.z = self.pos.z;
            vel.x = 0.0;
            vel.z = 0.0;
        }
        if let Some(top) = self.ladder_top_here() {
            if next.y > top {
                next.y = top;
                vel.y = 0.0;
            }
        }
        if let Some(ceiling) = self.ceiling {
            if next.y > ceiling {
                next.y = ceiling;
                vel.y = 0.0;
            }
        }
        if next.y <= GROUND_Y {
            next.y = GROUND_Y;
            vel.y = 0.0;
            self.on_ground = true;
            self.gliding = false;
            self.boost_ticks = 0;
        }

        for (tick, delta) in &self.pushes {
            if *tick == self.tick {
                next = next + *delta;
            }
        }
        self.pos = next;
        self.vel = vel;
    }

    fn take_from_inventory(&mut self, kind: &ItemKind) -> Option<ItemStack> {
        let index = self.inventory.iter().position(|s| &s.kind == kind && s.count > 0)?;
        Some(self.inventory.remove(index))
    }
}

/// `Agent` adapter over a [`World`].
pub struct SimAgent {
    world: Mutex<World>,
    clock: Arc<TickClock>,
    tick_delay: Option<Duration>,
}

impl SimAgent {
    pub fn new(world: World) -> Arc<Self> {
        Arc::new(Self {
            world: Mutex::new(world),
            clock: Arc::new(TickClock::new()),
            tick_delay: None,
        })
    }

    /// Each tick also sleeps for `delay`, for timeout tests.
    pub fn with_tick_delay(world: World, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            world: Mutex::new(world),
            clock: Arc::new(TickClock::new()),
            tick_delay: Some(delay),
        })
    }

    pub fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap()
    }

    pub fn clock(&self) -> &Arc<TickClock> {
        &self.clock
    }

    pub fn tick(&self) -> u64 {
        self.world().tick
    }

    pub fn position_now(&self) -> Vec3 {
        self.world().pos
    }

    pub fn velocity_now(&self) -> Vec3 {
        self.world().vel
    }
}

#[async_trait]
impl Agent for SimAgent {
    async fn wait_ticks(&self, n: u32) {
        for _ in 0..n {
            if let Some(delay) = self.tick_delay {
                tokio::time::sleep(delay).await;
            }
            self.world().step();
            self.clock.advance();
            tokio::task::yield_now().await;
        }
    }

    fn current_tick(&self) -> u64 {
        self.clock.now()
    }

    fn position(&self) -> Vec3 {
        self.world().pos
    }

    fn set_position(&self, pos: Vec3) {
        self.world().pos = pos;
    }

    fn velocity(&self) -> Vec3 {
        self.world().vel
    }

    fn set_velocity(&self, vel: Vec3) {
        self.world().vel = vel;
    }

    fn on_ground(&self) -> bool {
        self.world().on_ground
    }

    fn control(&self, control: Control) -> bool {
        self.world().controls.get(control)
    }

    fn set_control(&self, control: Control, state: bool) {
        self.world().controls.set(control, state);
    }

    async fn look(&self, yaw: f64, pitch: f64, _force: bool) {
        let mut world = self.world();
        world.yaw = yaw;
        world.pitch = pitch;
    }

    fn held_item(&self) -> Option<ItemStack> {
        self.world().held.clone()
    }

    fn equipped(&self, slot: EquipSlot) -> Option<ItemStack> {
        let world = self.world();
        match slot {
            EquipSlot::Hand => world.held.clone(),
            EquipSlot::Torso => world.torso.clone(),
        }
    }

    fn count_items(&self, kind: &ItemKind) -> u32 {
        let world = self.world();
        world
            .held
            .iter()
            .chain(world.torso.iter())
            .chain(world.inventory.iter())
            .filter(|s| &s.kind == kind)
            .map(|s| s.count)
            .sum()
    }

    async fn equip(&self, kind: ItemKind, slot: EquipSlot) -> Result<()> {
        let mut world = self.world();
        let current = match slot {
            EquipSlot::Hand => world.held.as_ref(),
            EquipSlot::Torso => world.torso.as_ref(),
        };
        if current.is_some_and(|s| s.kind == kind && s.count > 0) {
            return Ok(());
        }
        let stack = world
            .take_from_inventory(&kind)
            .ok_or_else(|| Error::from(PreconditionError::MissingEquipment(format!("{:?}", kind))))?;
        let previous = match slot {
            EquipSlot::Hand => world.held.replace(stack),
            EquipSlot::Torso => world.torso.replace(stack),
        };
        if let Some(previous) = previous.filter(|s| s.count > 0) {
            world.inventory.push(previous);
        }
        Ok(())
    }

    fn activate_held_item(&self) {
        let mut world = self.world();
        if !world.gliding {
            return;
        }
        let Some(held) = world.held.as_mut() else {
            return;
        };
        if held.kind != ItemKind::Booster || held.count == 0 {
            return;
        }
        held.count -= 1;
        let power = held.power.max(1);
        if held.count == 0 {
            world.held = None;
        }
        world.boost_ticks = power * BOOST_TICKS;
    }

    fn is_gliding(&self) -> bool {
        self.world().gliding
    }

    async fn start_gliding(&self) -> Result<()> {
        let mut world = self.world();
        if world.on_ground {
            return Err(PreconditionError::NotAirborne.into());
        }
        if !world.torso.as_ref().is_some_and(|s| s.kind == ItemKind::Glider) {
            return Err(PreconditionError::MissingEquipment("glider".to_string()).into());
        }
        world.gliding = true;
        Ok(())
    }

    async fn stop_gliding(&self) -> Result<()> {
        let mut world = self.world();
        world.gliding = false;
        world.boost_ticks = 0;
        Ok(())
    }

    fn boost_ticks_remaining(&self) -> u32 {
        self.world().boost_ticks
    }
}

/// Assert two floats are within `1e-9` of each other.
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
