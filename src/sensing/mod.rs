pub mod channel;
pub mod controller;
pub mod loop_worker;
pub mod simulated;
pub mod source;

pub use channel::ChannelSensor;
pub use controller::SensingController;
pub use simulated::SimulatedSensor;
pub use source::{Authorization, SensorSource, Subscription, SubscriptionHandle};
