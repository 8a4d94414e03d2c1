//! Temporary voice rooms: the lifecycle that creates and reclaims channel
//! pairs, and the dispatcher that runs owner-only panel actions.
//!
//! Nothing here talks to the gateway directly; see [`platform::Platform`].

pub mod action;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod locale;
pub mod notify;
pub mod permissions;
pub mod platform;
pub mod throttle;

mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use {
    action::{Command, Form, MAX_PICKER_USERS, PanelAction, Picker},
    dispatcher::{Dispatcher, Invocation, Reply},
    error::{ActionError, InvalidInput, LifecycleError, PlatformError},
    lifecycle::{Lifecycle, Reclaim, RoomSettings, SweepSummary, VoiceTransition},
    locale::Localizer,
    notify::{Notification, NotificationQueue, NotificationReceiver, notification_queue, spawn_delivery},
    platform::{ControlPanel, MemberInfo, Platform},
    throttle::ActionThrottle,
};
