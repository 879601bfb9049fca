pub mod agent;
pub mod behavior;
pub mod config;
pub mod error;
pub mod geometry;
pub mod log;
pub mod util;

// Task runtime and the motion loops built on it
pub mod actors;
pub mod control;
pub mod core;

pub use agent::{Agent, Control, ControlState, EquipSlot, ItemKind, ItemStack};
pub use config::{AscentMode, Config, MotionTuning};
pub use control::{AscentSummary, Controller, CruiseSummary, JumpTactic, MoveLevel};
pub use crate::core::{Task, TaskId, TaskStatus};
pub use error::{Error, ErrorKind, PreconditionError, Result};
pub use geometry::{Axis, Vec3};
