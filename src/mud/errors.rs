use thiserror::Error;

/// Errors that can arise while loading or running the world.
#[derive(Debug, Error)]
pub enum MudError {
    /// Returned when an id does not refer to a live entity.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity reached final extraction without any location. The world
    /// cannot continue after this.
    #[error("entity {uid} ({name}) is not located anywhere")]
    NoLocation { uid: u64, name: String },

    /// Attachment of a trigger vnum that the registry does not know.
    #[error("unknown trigger vnum {0}")]
    UnknownTrigger(u32),

    /// A trigger prototype was attached to the wrong kind of entity.
    #[error("trigger {vnum} is a {expected} trigger, cannot attach to {found}")]
    WrongAttachType {
        vnum: u32,
        expected: &'static str,
        found: &'static str,
    },

    /// World seed content that cannot be turned into a world.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// Wrapper around serde_json errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl MudError {
    /// Whether the process has to stop after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MudError::NoLocation { .. })
    }
}
