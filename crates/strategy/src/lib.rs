pub mod admission;
pub mod inference;
pub mod planner;
pub mod settlement;
pub mod signal;
