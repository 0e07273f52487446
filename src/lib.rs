mod config;
mod errors;
mod finalizer;
mod metrics;
mod operator;
mod resource;
mod sequencer;
mod status;
mod transport;
mod watch;

pub use config::*;
pub use errors::*;
pub use metrics::*;
pub use operator::*;
pub use resource::*;
pub use sequencer::*;
pub use transport::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
