//! Quill: writing sprints and word-count goals for Discord guilds.
//!
//! The binary wires the library crates together over one SQLite file:
//! - `daemon`: the job scheduler that starts, ends and scores sprints and resets goals
//! - `sprint`, `goal`, `project`, `setting`: one-shot commands issued as a guild member
//! - `jobs`: inspect the queue

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod messenger;

pub use app::App;
