//! Error types for the subject-cutout crate.

/// Errors that can occur while configuring a run or processing a photo.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The run configuration is invalid. Fatal: nothing is processed.
    #[error("invalid configuration: {0}")]
    ConfigValidation(String),

    /// The external background-removal step failed.
    #[error("background removal failed: {0}")]
    Segmentation(String),

    /// The segmented image could not be decoded.
    #[error("failed to decode segmented image: {0}")]
    Decode(image::ImageError),

    /// The segmented image has no pixel with non-zero alpha.
    #[error("no subject detected: image is fully transparent")]
    NoSubject,

    /// The subject could not be placed on the canvas.
    #[error("composition failed: {0}")]
    Composition(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while encoding the output image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Short, stable label for the error kind, used in logs and reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigValidation(_) => "config",
            Error::Segmentation(_) => "segmentation",
            Error::Decode(_) => "decode",
            Error::NoSubject => "no-subject",
            Error::Composition(_) => "composition",
            Error::Io(_) => "io",
            Error::Image(_) => "encode",
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
