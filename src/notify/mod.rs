// src/notify/mod.rs

//! Operator notifications.
//!
//! The batch driver only needs "send this text somewhere". [`NoopNotifier`]
//! is the default; [`TelegramNotifier`] posts through the Telegram bot API.

use std::future::Future;
use std::pin::Pin;

use tracing::{info, warn};

use crate::config::NotifySection;
use crate::errors::Result;

pub mod telegram;

pub use telegram::TelegramNotifier;

pub const TOKEN_ENV: &str = "FSSEG_TELEGRAM_TOKEN";
pub const CHAT_ID_ENV: &str = "FSSEG_TELEGRAM_CHAT_ID";

/// Sink for plain-text operator messages.
///
/// Callers never retry and never act on the result beyond logging it.
pub trait Notifier: Send + Sync {
    fn notify<'a>(
        &'a self,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify<'a>(
        &'a self,
        _message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

/// Pick a notifier from the `[notify]` section, falling back to the
/// environment for credentials.
///
/// Missing credentials with notifications enabled degrade to
/// [`NoopNotifier`] with a single warning.
pub fn notifier_from_config(section: &NotifySection) -> Box<dyn Notifier> {
    if !section.enabled {
        return Box::new(NoopNotifier);
    }

    let token = section
        .telegram_token
        .clone()
        .or_else(|| std::env::var(TOKEN_ENV).ok())
        .filter(|s| !s.trim().is_empty());
    let chat_id = section
        .telegram_chat_id
        .clone()
        .or_else(|| std::env::var(CHAT_ID_ENV).ok())
        .filter(|s| !s.trim().is_empty());

    match (token, chat_id) {
        (Some(token), Some(chat_id)) => match TelegramNotifier::new(token, chat_id) {
            Ok(n) => {
                info!("telegram notifications enabled");
                Box::new(n)
            }
            Err(e) => {
                warn!(error = %e, "could not set up telegram client; notifications disabled");
                Box::new(NoopNotifier)
            }
        },
        _ => {
            warn!(
                "notifications enabled but telegram token/chat id missing \
                 (set [notify] keys or {TOKEN_ENV}/{CHAT_ID_ENV}); notifications disabled"
            );
            Box::new(NoopNotifier)
        }
    }
}
