use core_auth::AuthError;
use core_player::PlayerError;
use provider_spotify::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Player(#[from] PlayerError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
