use std::fmt;

/// Fatal render failure. Propagates to the caller; nothing is retried.
#[derive(Debug)]
pub enum RenderError {
    InvalidConfiguration(String),
    Layout(String),
    Record(String),
    Archive(String),
    Io(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            RenderError::Layout(message) => write!(f, "layout error: {}", message),
            RenderError::Record(message) => write!(f, "invalid report record: {}", message),
            RenderError::Archive(message) => write!(f, "archive payload rejected: {}", message),
            RenderError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(value: std::io::Error) -> Self {
        RenderError::Io(value)
    }
}

impl From<crate::archive::ArchiveRejection> for RenderError {
    fn from(value: crate::archive::ArchiveRejection) -> Self {
        RenderError::Archive(value.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(value: serde_json::Error) -> Self {
        RenderError::Record(value.to_string())
    }
}

/// Per-asset decode failure. Composers recover from it locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDecodeError {
    Empty,
    Base64(String),
    Format(String),
    Compress(String),
}

impl ImageDecodeError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageDecodeError::Empty => "empty",
            ImageDecodeError::Base64(_) => "base64",
            ImageDecodeError::Format(_) => "format",
            ImageDecodeError::Compress(_) => "compress",
        }
    }
}

impl fmt::Display for ImageDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageDecodeError::Empty => write!(f, "image data is empty"),
            ImageDecodeError::Base64(message) => {
                write!(f, "invalid base64 image data: {}", message)
            }
            ImageDecodeError::Format(message) => write!(f, "unsupported image data: {}", message),
            ImageDecodeError::Compress(message) => {
                write!(f, "image compression failed: {}", message)
            }
        }
    }
}

impl std::error::Error for ImageDecodeError {}
