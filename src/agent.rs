//! Adapter boundary between the control loops and the live world.
//!
//! The world (physics, networking, inventory bookkeeping) is owned by
//! whatever implements [`Agent`]. Control loops only read state, flip
//! intent flags, and wait for ticks.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;
use crate::Result;

/// A boolean actuator flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
    Sneak,
}

impl Control {
    pub const ALL: [Control; 7] = [
        Control::Forward,
        Control::Back,
        Control::Left,
        Control::Right,
        Control::Jump,
        Control::Sprint,
        Control::Sneak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Control::Forward => "forward",
            Control::Back => "back",
            Control::Left => "left",
            Control::Right => "right",
            Control::Jump => "jump",
            Control::Sprint => "sprint",
            Control::Sneak => "sneak",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// The intent vector: which controls are held this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlState {
    bits: u8,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(controls: &[Control]) -> Self {
        let mut state = Self::new();
        for &c in controls {
            state.enable(c);
        }
        state
    }

    pub fn enable(&mut self, control: Control) {
        self.bits |= control.bit();
    }

    pub fn disable(&mut self, control: Control) {
        self.bits &= !control.bit();
    }

    pub fn set(&mut self, control: Control, on: bool) {
        if on {
            self.enable(control);
        } else {
            self.disable(control);
        }
    }

    pub fn get(&self, control: Control) -> bool {
        self.bits & control.bit() != 0
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub fn is_clear(&self) -> bool {
        self.bits == 0
    }

    /// Read the agent's currently held controls.
    pub fn from_agent(agent: &dyn Agent) -> Self {
        let mut state = Self::new();
        for c in Control::ALL {
            state.set(c, agent.control(c));
        }
        state
    }

    /// Push every flag to the agent, releasing the ones not held here.
    pub fn apply(&self, agent: &dyn Agent) {
        for c in Control::ALL {
            agent.set_control(c, self.get(c));
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let held: Vec<&str> = Control::ALL
            .iter()
            .filter(|c| self.get(**c))
            .map(Control::as_str)
            .collect();
        write!(f, "[{}]", held.join(","))
    }
}

/// Item categories the control loops care about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Consumable that gives a timed upward boost while gliding.
    Booster,
    /// Wearable that allows gliding.
    Glider,
    Other(String),
}

/// A stack of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub count: u32,
    /// Boost units per item (only meaningful for boosters).
    #[serde(default = "default_power")]
    pub power: u32,
}

fn default_power() -> u32 {
    1
}

impl ItemStack {
    pub fn new(kind: ItemKind, count: u32) -> Self {
        Self {
            kind,
            count,
            power: 1,
        }
    }

    pub fn booster(count: u32, power: u32) -> Self {
        Self {
            kind: ItemKind::Booster,
            count,
            power,
        }
    }

    /// Total boost units carried by this stack.
    pub fn boost_units(&self) -> u32 {
        if self.kind == ItemKind::Booster {
            self.count * self.power.max(1)
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Hand,
    Torso,
}

/// The live agent as seen by the control loops.
///
/// Implementations are injected into [`crate::control::Controller`]. State
/// accessors return the value as of the most recent tick; the environment
/// updates it between ticks.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Suspend until `n` ticks have elapsed.
    async fn wait_ticks(&self, n: u32);

    /// Number of ticks elapsed since the agent joined the world.
    fn current_tick(&self) -> u64;

    fn position(&self) -> Vec3;
    fn set_position(&self, pos: Vec3);
    fn velocity(&self) -> Vec3;
    fn set_velocity(&self, vel: Vec3);
    fn on_ground(&self) -> bool;

    fn control(&self, control: Control) -> bool;
    fn set_control(&self, control: Control, state: bool);

    fn clear_controls(&self) {
        for c in Control::ALL {
            self.set_control(c, false);
        }
    }

    /// Turn to face `yaw`/`pitch` (radians). `force` skips smoothing.
    async fn look(&self, yaw: f64, pitch: f64, force: bool);

    fn held_item(&self) -> Option<ItemStack>;
    fn equipped(&self, slot: EquipSlot) -> Option<ItemStack>;
    /// Items of `kind` carried anywhere, including hand and armor slots.
    fn count_items(&self, kind: &ItemKind) -> u32;
    async fn equip(&self, kind: ItemKind, slot: EquipSlot) -> Result<()>;
    /// Use the held item once (consumes one booster while gliding).
    fn activate_held_item(&self);

    fn is_gliding(&self) -> bool;
    async fn start_gliding(&self) -> Result<()>;
    async fn stop_gliding(&self) -> Result<()>;
    /// Ticks of boost left from the last activated booster.
    fn boost_ticks_remaining(&self) -> u32;
}
