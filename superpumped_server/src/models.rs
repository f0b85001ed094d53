pub mod chart;
pub mod chat;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod files;
pub mod ingestions;
pub mod notes;
pub mod prompts;
pub mod state;
pub mod table;
pub mod vectors;
