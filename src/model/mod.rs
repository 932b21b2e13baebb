//! Model endpoint configuration and probing.

mod config;
mod probe;

pub use config::{
    EndpointPreset, ModelConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS, EMPTY_API_KEY,
};
pub use probe::{EndpointProbe, ProbeReport};
