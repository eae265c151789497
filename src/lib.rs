//! Community Link Bot Library
//!
//! A Telegram bot that shares community links and removes them again after
//! a delay.
//!
//! This crate provides the core functionality for:
//! - Loading and validating the link and bot configuration
//! - Connecting to Telegram via `MTProto` with a bot token
//! - Answering `/start`, `/help` and `/stats` and link button presses
//! - Deleting sent links after the configured delay

pub mod bot;
pub mod commands;
pub mod config;
pub mod scheduler;
pub mod telegram;
