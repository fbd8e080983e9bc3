use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("media rejected: {0}")]
    MediaRejected(String),
    #[error("engine error: {0}")]
    Engine(String),
}

/// Options applied when loading a stream into the engine.
#[derive(Debug, Clone, Copy)]
pub struct MediaOptions {
    pub network_caching_ms: u32,
}

/// The external media capability the session commands. The engine itself is
/// opaque; the session owns exactly one of these plus at most one loaded
/// media handle at a time.
pub trait MediaEngine {
    /// Owned handle to one loaded media resource. Dropping the handle
    /// releases the underlying engine resource.
    type Media;

    fn create_media(&mut self, url: &str, options: &MediaOptions)
        -> Result<Self::Media, PlaybackError>;

    /// Starts playback of a previously created media handle.
    fn play(&mut self, media: &Self::Media) -> Result<(), PlaybackError>;

    /// Stops the active stream, if any. Never fails.
    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    /// Applies an already-validated volume in 0..=100.
    fn set_volume(&mut self, volume: u8);
}
