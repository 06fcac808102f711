pub mod dataframe;
pub mod datapoint;
pub mod interpolate;

pub use dataframe::DataFrame;
pub use datapoint::DataPoint;
pub use interpolate::{Interpolator, LastSeenInterpolator, LinearInterpolator};
