pub mod api;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod experiment;
pub mod genome;
pub mod individual;
pub mod labels;
pub mod optimizer;
pub mod reports;
