//! Telegram delivery - the chat side of a mentor run
//!
//! - **Messages** (`message`) - `sendMessage` payloads and legacy Markdown
//!   formatting of a validated quote
//! - **Dispatcher** (`dispatcher`) - `TelegramDispatcher`, one Bot API call per
//!   delivery, with status codes classified into `DeliveryError`
//!
//! # Getting Started
//!
//! 1. Create a bot with @BotFather and copy its token
//! 2. Add the bot to the target chat and note the chat id
//! 3. Set env vars: `MENTOR_TELEGRAM_BOT_TOKEN`, `MENTOR_TELEGRAM_CHAT_ID`
//!
//! The bot token is part of every request URL, so transport errors are
//! stripped of their URL before they are logged or returned.

pub mod dispatcher;
pub mod message;

pub use dispatcher::{TelegramDispatcher, TelegramSettings};
pub use message::{MessageBuilder, ParseMode, SendMessage};
