//! Telegram client wrapper module.
//!
//! Provides the transport-agnostic [`ChatApi`] seam and its grammers-backed
//! implementation, including send throttling.

mod api;
mod client;
mod rate_limiter;
mod recent;

pub use api::{
    Button, ChatApi, ChatId, CommandInfo, EventSource, Incoming, Keyboard, MessageId, OutgoingMessage,
    SentMessage,
};
pub use client::{TelegramBot, TelegramError};
pub use grammers_client::update::CallbackQuery;
pub use rate_limiter::RateLimiter;
