pub mod builder;
mod datetime;
mod duration;
mod range;

pub use datetime::DateTime;
pub use duration::Duration;
pub use range::DateTimeRange;
