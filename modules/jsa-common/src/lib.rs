pub mod config;
pub mod error;
pub mod table;
pub mod types;

pub use config::{Credentials, Settings};
pub use error::JsaError;
pub use table::Table;
pub use types::{FilterSpec, RetryPolicy, RunContext};
