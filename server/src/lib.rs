//! `ReportMe` Server
//!
//! Telegram bot that relays HTTP-delivered messages to per-user notification
//! streams. Each stream has a secret key; anyone holding the key can push a
//! message, and the owner receives it while the stream is active.

pub mod api;
pub mod bot;
pub mod config;
pub mod db;
pub mod streams;
pub mod telegram;
