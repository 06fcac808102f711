pub mod math;
pub mod range;
pub mod time;
pub mod timeseries;
pub mod unit;

pub use range::Range;
