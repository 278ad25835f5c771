pub mod config;
pub mod error;
pub mod resource;
pub mod types;

pub use config::KubeactConfig;
pub use error::{CoreError, Result};
pub use resource::WorkloadResource;
pub use types::*;
