use crate::command::SurfaceId;

/// Result alias that carries the custom [`GlowbitError`] type.
pub type Result<T> = std::result::Result<T, GlowbitError>;

/// Common error type for the core crate.
///
/// Only setup mistakes (a bad surface geometry, rendering a surface that was
/// never attached) travel out of the public API. Everything a running lesson
/// can trigger is logged and absorbed by the session instead.
#[derive(Debug, thiserror::Error)]
pub enum GlowbitError {
    /// Free-form message, mostly produced by lesson programs and handlers.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or lesson documents that failed to parse.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// A command or render request named a surface that was never attached.
    #[error("no surface attached as `{0}`")]
    UnknownSurface(SurfaceId),
    /// Pixel geometry that leaves no room to draw a cell.
    #[error("invalid surface geometry: pixel size {pixel_size}, padding {padding}")]
    InvalidGeometry { pixel_size: u32, padding: u32 },
    /// Colour text that is neither a hex triplet nor a known name.
    #[error("unrecognised colour `{0}`")]
    InvalidColor(String),
    /// Note name outside the supported pitch table.
    #[error("unknown note `{0}`")]
    UnknownNote(String),
    /// The tone backend could not play a tone.
    #[error("tone backend failed: {0}")]
    Tone(String),
}

impl GlowbitError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for GlowbitError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for GlowbitError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
