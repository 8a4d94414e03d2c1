//! Discord gateway adapter: serenity event handling and the
//! [`tempvoice_rooms::Platform`] implementation backing it.

pub mod bot;
pub mod error;
pub mod handler;
pub mod platform;
pub mod ui;

pub use {
    bot::run,
    error::{Error, Result},
    handler::TempVoiceHandler,
    platform::SerenityPlatform,
};
