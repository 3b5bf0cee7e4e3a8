pub mod controller;
pub mod state;

pub use controller::{Aggregator, AggregatorSnapshot, IngestOutcome, StartRequest};
pub use state::{AggregatorState, AggregatorStatus};
