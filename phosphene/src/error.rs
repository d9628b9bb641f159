// THEORY:
// One error type covers everything that can go wrong between "here is an image
// on disk" and "here is a base64 PNG". Callers at the HTTP edge only need the
// message, so every variant renders the underlying cause verbatim.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    /// The identifier is outside the closed set of configured implants.
    #[error("Unknown implant: {0}")]
    UnknownImplant(String),
    /// Decoding the input or encoding the rendered percept failed.
    #[error("{0}")]
    Image(#[from] image::ImageError),
    /// The model could not be built or could not predict a percept.
    #[error("{0}")]
    Model(String),
    /// Staging, reading or writing a temporary file failed.
    #[error("{0}")]
    FileSystem(#[from] std::io::Error),
}

impl SimulationError {
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
