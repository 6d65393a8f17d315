pub mod paper;
pub mod rest;

pub use paper::PaperBroker;
pub use rest::{RestBroker, RestBrokerConfig};
