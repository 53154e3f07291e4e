pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, OnExhaustedRetries};
pub use error::{AppError, Result};
