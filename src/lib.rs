//! Generation job tracker
//!
//! Client-side lifecycle management for long-running, server-side content
//! generation jobs (slide decks, business reports): starting jobs, polling
//! them to a terminal state, and reattaching to jobs left running by a
//! previous session.

pub mod app_state;
pub mod config;
pub mod engine;
pub mod models;
pub mod services;
