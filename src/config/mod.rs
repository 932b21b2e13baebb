//! Static configuration for the task runner.

mod i18n;

pub use i18n::{get_messages, Messages, MESSAGES_EN, MESSAGES_ZH};
