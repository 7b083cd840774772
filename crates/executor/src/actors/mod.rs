pub mod supervisor;
pub mod trading_cycle_actor;

pub use common::actors::{Actor, ActorType, ControlMessage};
