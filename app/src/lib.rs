pub mod adapter;
pub mod core;
pub mod estimation;
pub mod events;
pub mod features;
pub mod model;
pub mod optimizer;
pub mod scenario;
pub mod settings;
