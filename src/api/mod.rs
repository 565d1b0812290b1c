pub mod engine_client;
pub mod http_engine;
pub mod local_engine;
pub mod network;

pub use engine_client::BayesEngine;
pub use http_engine::HttpEngine;
pub use local_engine::{InferenceMode, LocalEngine};
