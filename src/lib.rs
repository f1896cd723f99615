pub mod cli;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod frames;
pub mod job;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod report;
pub mod util;
