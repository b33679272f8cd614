use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Playlist store error: {0}")]
    Playlist(#[from] core_playlist::PlaylistError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_errors_convert_with_context() {
        let err: CoreError = core_playlist::PlaylistError::InvalidData("empty title".into()).into();
        assert!(matches!(err, CoreError::Playlist(_)));
        assert!(err.to_string().starts_with("Playlist store error:"));
    }
}
