/*
 *  strip/traits.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Hardware binding abstraction shared by the native and mock backends
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

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::strip::channel::{ChannelState, DriverConfig, SharedChannel, SingleChannelOptions};
use crate::strip::error::DriverError;

/// Which backend is servicing the strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// In-memory stand-in, used off-device or when forced
    Mock,

    /// Primary native library
    NativeOfficial,

    /// Secondary native library, used when the primary is missing or
    /// rejects the board revision
    NativeFallback,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Mock => write!(f, "mock"),
            BindingKind::NativeOfficial => write!(f, "official"),
            BindingKind::NativeFallback => write!(f, "fallback"),
        }
    }
}

/// LED chipsets understood by every binding
///
/// Serialized as the lowercase code handed to the driver ("ws2812"), looked
/// up from configuration by the uppercase name ("WS2812").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripType {
    Ws2812,
    Sk6812,
    Sk6812w,
}

impl StripType {
    pub const ALL: &'static [StripType] =
        &[StripType::Ws2812, StripType::Sk6812, StripType::Sk6812w];

    /// Name used in configuration
    pub fn name(&self) -> &'static str {
        match self {
            StripType::Ws2812 => "WS2812",
            StripType::Sk6812 => "SK6812",
            StripType::Sk6812w => "SK6812W",
        }
    }

    /// Code passed to the driver
    pub fn code(&self) -> &'static str {
        match self {
            StripType::Ws2812 => "ws2812",
            StripType::Sk6812 => "sk6812",
            StripType::Sk6812w => "sk6812w",
        }
    }

    pub fn from_name(name: &str) -> Option<StripType> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// True for chipsets with a dedicated white element
    pub fn has_white(&self) -> bool {
        matches!(self, StripType::Sk6812w)
    }
}

impl fmt::Display for StripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Uniform capability surface over a concrete strip backend
///
/// Implementations are selected once per process (see
/// [`crate::strip::binding::select_binding`]) and driven exclusively by the
/// [`crate::strip::manager::DriverManager`].
pub trait HardwareBinding: Send {
    /// Which backend this is
    fn kind(&self) -> BindingKind;

    /// Bring up the hardware for every requested channel (PWM path)
    fn init(&mut self, config: &DriverConfig) -> Result<Vec<ChannelState>, DriverError>;

    /// Bring up a single channel on a fixed pin (SPI and PCM paths)
    fn init_single(
        &mut self,
        count: u32,
        options: &SingleChannelOptions,
    ) -> Result<ChannelState, DriverError>;

    /// Push the current pixel buffers to the strip
    fn render(&mut self, channels: &[SharedChannel]) -> Result<(), DriverError>;

    /// Blank the strip
    fn reset(&mut self, channels: &[SharedChannel]) -> Result<(), DriverError>;

    /// Release the hardware
    fn finalize(&mut self) -> Result<(), DriverError>;

    /// Strip types this backend accepts, by configuration name
    fn strip_types(&self) -> &'static [StripType] {
        StripType::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_type_codes() {
        assert_eq!(StripType::from_name("WS2812").map(|t| t.code()), Some("ws2812"));
        assert_eq!(StripType::from_name("SK6812").map(|t| t.code()), Some("sk6812"));
        assert_eq!(StripType::from_name("SK6812W").map(|t| t.code()), Some("sk6812w"));
        assert_eq!(StripType::from_name("APA102"), None);
        // names are case sensitive, like the config table they come from
        assert_eq!(StripType::from_name("ws2812"), None);
    }

    #[test]
    fn test_strip_type_serde_uses_code() {
        let json = serde_json::to_string(&StripType::Sk6812w).unwrap();
        assert_eq!(json, "\"sk6812w\"");
        let parsed: StripType = serde_json::from_str("\"ws2812\"").unwrap();
        assert_eq!(parsed, StripType::Ws2812);
    }

    #[test]
    fn test_binding_kind_display() {
        assert_eq!(BindingKind::Mock.to_string(), "mock");
        assert_eq!(BindingKind::NativeOfficial.to_string(), "official");
        assert_eq!(BindingKind::NativeFallback.to_string(), "fallback");
    }
}
