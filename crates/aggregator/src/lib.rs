pub mod collect;
pub mod error;
pub mod model;
pub mod table;

pub use collect::{Collector, ResultsAggregator};
pub use error::AggregatorError;
pub use model::{
    CollectedData, ComponentHealth, ConfigSummary, HealthCheckEntry, HealthCheckReport,
    ScenarioResult, Summary,
};
