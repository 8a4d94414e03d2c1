#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("discord.token is not set")]
    MissingToken,

    #[error("rooms.lobby_channel_id and rooms.category_id must both be set")]
    MissingRooms,

    #[error(transparent)]
    Serenity(#[from] serenity::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
