pub mod schema;

pub use schema::{
    Config, EngineConfig, EngineKind, GenerationConfig, ObservabilityConfig, ReliabilityConfig,
    SchedulerConfig,
};
