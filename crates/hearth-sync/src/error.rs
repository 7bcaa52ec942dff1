use hearth_types::ChannelIdError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Channel(#[from] ChannelIdError),

    #[error("database error: {0}")]
    Database(String),

    #[error("blocking task failed: {0}")]
    Runtime(String),
}

impl SyncError {
    pub fn db(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}
