pub mod error;

pub use error::{ClusterError, Result};
