/*
 *  strip/error.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the strip driver subsystem
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use thiserror::Error;

/// Failure to obtain a hardware binding at process start
#[derive(Debug, Error)]
pub enum BindingError {
    /// No candidate library file exists in any search path
    #[error("{library} not found (searched: {searched})")]
    NotFound { library: String, searched: String },

    /// dlopen failed
    #[error("failed to load {library}: {reason}")]
    Load { library: String, reason: String },

    /// Library loaded but an expected entry point is missing
    #[error("{library} is missing symbol {symbol}: {reason}")]
    Symbol { library: String, symbol: String, reason: String },

    /// Built without the `native-binding` feature
    #[error("native ws281x support not compiled in (enable the `native-binding` feature)")]
    NotCompiled,
}

/// Errors raised by the driver lifecycle and the active binding
#[derive(Debug, Error)]
pub enum DriverError {
    /// The native library rejected the detected board revision
    #[error("Hardware revision is not supported: {0}")]
    UnsupportedRevision(String),

    /// Any other initialization failure
    #[error("ws281x initialization failed: {0}")]
    Initialization(String),

    /// Driver configuration cannot be handed to the binding
    #[error("invalid driver configuration: {0}")]
    InvalidConfiguration(String),

    /// render() failed inside the binding
    #[error("ws281x render failed: {0}")]
    Render(String),

    /// reset/finalize failed during teardown
    #[error("ws281x finalization failed: {0}")]
    Finalize(String),

    /// render() or reset() with no live handle
    #[error("ws281x driver not initialized")]
    NotInitialized,

    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl DriverError {
    /// True for the failure that triggers the one-shot fallback retry
    pub fn is_unsupported_revision(&self) -> bool {
        matches!(self, DriverError::UnsupportedRevision(_))
    }
}

/// Payload decoding failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid color string: {0}")]
    InvalidColor(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_revision_detection() {
        assert!(DriverError::UnsupportedRevision("rev 0xd04170".into()).is_unsupported_revision());
        assert!(!DriverError::Initialization("mmap failed".into()).is_unsupported_revision());
        assert!(!DriverError::NotInitialized.is_unsupported_revision());
    }

    #[test]
    fn test_error_messages() {
        let err = DriverError::UnsupportedRevision("rev 0xd04170".into());
        assert!(err.to_string().contains("Hardware revision is not supported"));

        let err = CommandError::InvalidColor("not-a-color".into());
        assert_eq!(err.to_string(), "Invalid color string: not-a-color");

        let err: DriverError = BindingError::NotCompiled.into();
        assert!(err.to_string().contains("native-binding"));
    }
}
