use std::error::Error as StdError;

use serenity::all::{ChannelId, UserId};

type BoxedError = Box<dyn StdError + Send + Sync>;

/// Failure reported by a [`Platform`](crate::platform::Platform) call.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: BoxedError,
    },
}

impl PlatformError {
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    #[must_use]
    pub fn external(context: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Rejected user input. Each variant has its own message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("channel name must be 1-100 characters, got {len}")]
    ChannelName { len: usize },

    #[error("user limit must be an integer in 1..=99, got {raw:?}")]
    UserLimit { raw: String },

    #[error("no users selected")]
    NoSelection,

    #[error("selected user already owns the channel")]
    SameOwner,

    #[error("selected user is not a guild member")]
    MemberNotFound,
}

/// Why an interaction was refused. Carries the locale key shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("no record for {key}")]
    ChannelDataNotFound { key: String },

    #[error("channel {channel_id} no longer exists")]
    VoiceChannelNotFound { channel_id: ChannelId },

    #[error("user {user_id} does not own the channel")]
    PermissionDenied { user_id: UserId },

    #[error("unknown action {custom_id:?}")]
    UnknownAction { custom_id: String },

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    #[error("rate limited on {action}")]
    RateLimited { action: &'static str },

    #[error("{context}: {source}")]
    OperationFailed {
        context: String,
        #[source]
        source: BoxedError,
    },
}

impl ActionError {
    #[must_use]
    pub fn unknown(custom_id: impl Into<String>) -> Self {
        Self::UnknownAction {
            custom_id: custom_id.into(),
        }
    }

    #[must_use]
    pub fn failed(context: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::OperationFailed {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Message catalog key for the user-facing reply.
    #[must_use]
    pub fn locale_key(&self) -> &'static str {
        match self {
            Self::ChannelDataNotFound { .. } => "interactionCreate.channelDataNotFound",
            Self::VoiceChannelNotFound { .. } => "interactionCreate.voiceChannelNotFound",
            Self::PermissionDenied { .. } => "interactionCreate.permissionDenied",
            Self::UnknownAction { .. } => "errors.unknownAction",
            Self::InvalidInput(input) => match input {
                InvalidInput::ChannelName { .. } => "errors.invalidChannelName",
                InvalidInput::UserLimit { .. } => "errors.invalidUserLimit",
                InvalidInput::NoSelection => "errors.userNotSelected",
                InvalidInput::SameOwner => "transferOwnership.alreadyOwner",
                InvalidInput::MemberNotFound => "transferOwnership.userNotFound",
            },
            Self::RateLimited { .. } => "errors.rateLimited",
            Self::OperationFailed { .. } => "errors.operationFailed",
        }
    }

    /// Short outcome label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChannelDataNotFound { .. } => "channel_data_not_found",
            Self::VoiceChannelNotFound { .. } => "voice_channel_not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::UnknownAction { .. } => "unknown_action",
            Self::InvalidInput(_) => "invalid_input",
            Self::RateLimited { .. } => "rate_limited",
            Self::OperationFailed { .. } => "operation_failed",
        }
    }
}

impl From<tempvoice_store::Error> for ActionError {
    fn from(err: tempvoice_store::Error) -> Self {
        Self::failed("record store", err)
    }
}

/// Failure while provisioning or reclaiming a channel pair.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] tempvoice_store::Error),

    #[error("{step} failed: {source}")]
    Platform {
        step: &'static str,
        #[source]
        source: PlatformError,
    },
}

impl LifecycleError {
    pub(crate) fn platform(step: &'static str) -> impl FnOnce(PlatformError) -> Self {
        move |source| Self::Platform { step, source }
    }
}
