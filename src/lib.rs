pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod media;
pub mod orchestrator;
pub mod output;
pub mod ui;
