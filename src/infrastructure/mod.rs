pub mod candidate_pool;
pub mod rate_gate;
pub mod sinks;
pub mod torn_client;

pub use candidate_pool::CandidatePool;
pub use rate_gate::{RateGate, RateGateSnapshot};
pub use sinks::{LogAlertSink, LogStatusSink};
pub use torn_client::TornClient;
