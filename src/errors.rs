// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types shared by the renderer, the encoder, and the request
//! handler.  Validation problems are the caller's fault and are never
//! retried; encoding problems happen after the pixels are computed.

use std::io;
use std::path::Path;

/// Everything that can go wrong between receiving render parameters
/// and handing back encoded image bytes.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// The request was rejected before any pixel was computed.
    #[fail(display = "Invalid render request: {}", reason)]
    InvalidRequest {
        /// A human readable description of the rejected field.
        reason: String,
    },

    /// A named parameter could not be parsed as the number it should be.
    #[fail(display = "Could not parse parameter {}: '{}'", name, value)]
    BadParameter {
        /// The parameter name as the caller supplied it.
        name: String,
        /// The raw, unparsed value.
        value: String,
    },

    /// The pixel buffer exists but could not be serialized.
    #[fail(display = "Could not encode image: {}", cause)]
    EncodingFailure {
        /// The underlying encoder failure.
        #[cause]
        cause: io::Error,
    },

    /// The image was fine but the destination could not be opened.
    #[fail(display = "Could not write {}: {}", path, cause)]
    OutputFailure {
        /// Where the image was meant to go.
        path: String,
        /// The underlying I/O failure.
        #[cause]
        cause: io::Error,
    },
}

impl RenderError {
    /// Shorthand for building an `InvalidRequest`.
    pub fn invalid<S: Into<String>>(reason: S) -> RenderError {
        RenderError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Shorthand for building an `OutputFailure`.
    pub fn output<P: AsRef<Path>>(path: P, cause: io::Error) -> RenderError {
        RenderError::OutputFailure {
            path: path.as_ref().display().to_string(),
            cause,
        }
    }

    /// True for errors that are the caller's mistake (bad or missing
    /// parameters), as opposed to failures on our side.
    pub fn is_client_error(&self) -> bool {
        match *self {
            RenderError::InvalidRequest { .. } | RenderError::BadParameter { .. } => true,
            RenderError::EncodingFailure { .. } | RenderError::OutputFailure { .. } => false,
        }
    }
}

impl From<io::Error> for RenderError {
    fn from(cause: io::Error) -> RenderError {
        RenderError::EncodingFailure { cause }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = ::std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        assert!(RenderError::invalid("width must be positive").is_client_error());
        let bad = RenderError::BadParameter {
            name: "width".to_string(),
            value: "wide".to_string(),
        };
        assert!(bad.is_client_error());
    }

    #[test]
    fn encoding_failures_are_not_client_errors() {
        let err: RenderError = io::Error::new(io::ErrorKind::Other, "disk full").into();
        assert!(!err.is_client_error());
        assert_eq!(format!("{}", err), "Could not encode image: disk full");
    }

    #[test]
    fn output_failures_name_the_path() {
        let cause = io::Error::new(io::ErrorKind::NotFound, "no such directory");
        let err = RenderError::output("/missing/out.png", cause);
        assert!(!err.is_client_error());
        assert_eq!(format!("{}", err), "Could not write /missing/out.png: no such directory");
    }
}
