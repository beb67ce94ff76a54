pub mod dispatch;
pub mod expression;
pub mod runner;
pub mod triggers;

pub use dispatch::TriggerDispatcher;
pub use runner::{fire_once, run_trigger};
pub use triggers::{Trigger, TriggerAction, TriggerTiming, default_triggers};
