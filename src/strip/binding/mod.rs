/*
 *  strip/binding/mod.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Hardware binding selection - native library chain or mock
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

pub mod mock;

#[cfg(feature = "native-binding")]
pub mod native;

use log::{debug, info, warn};

use crate::strip::error::BindingError;
use crate::strip::traits::{BindingKind, HardwareBinding};

pub use mock::{MockBinding, MockBindingState, SimulatedFailure};

/// Type alias for boxed binding trait objects
pub type BoxedBinding = Box<dyn HardwareBinding>;

/// A candidate in the native load chain
pub type BindingLoader = fn() -> Result<BoxedBinding, BindingError>;

/// Environment flag that forces the mock binding
pub const MOCK_ENV: &str = "WS281X_MOCK";

/// Native candidates in the order they are tried
pub const NATIVE_CHAIN: &[(BindingKind, BindingLoader)] = &[
    (BindingKind::NativeOfficial, load_official),
    (BindingKind::NativeFallback, load_fallback),
];

/// True when `WS281X_MOCK` is set to anything but an explicit "off" value
pub fn mock_override() -> bool {
    std::env::var(MOCK_ENV).map(|v| is_truthy(&v)).unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

/// Boards the native library can drive are ARM
pub fn is_embedded_target() -> bool {
    matches!(std::env::consts::ARCH, "arm" | "aarch64")
}

/// Pick the binding for this process
///
/// Mock when `force_mock`, `WS281X_MOCK` or a non-ARM platform says so;
/// otherwise the native chain. When every native candidate fails the
/// *first* failure is returned, since that is the root cause.
pub fn select_binding(force_mock: bool) -> Result<BoxedBinding, BindingError> {
    select_for(force_mock || mock_override(), is_embedded_target(), NATIVE_CHAIN)
}

fn select_for(
    force_mock: bool,
    embedded: bool,
    chain: &[(BindingKind, BindingLoader)],
) -> Result<BoxedBinding, BindingError> {
    if force_mock || !embedded {
        info!(
            "Using mock ws281x binding ({})",
            if force_mock { "forced" } else { "platform is not an embedded target" }
        );
        return Ok(Box::new(MockBinding::new()));
    }

    probe_board();
    first_available(chain)
}

/// Try `candidates` in order, keeping the first error for escalation
pub fn first_available<T>(
    candidates: &[(BindingKind, fn() -> Result<T, BindingError>)],
) -> Result<T, BindingError> {
    let mut first_error: Option<BindingError> = None;

    for (kind, load) in candidates {
        match load() {
            Ok(binding) => {
                match &first_error {
                    Some(err) => warn!("[ws281x] Falling back to {} binding because {}", kind, err),
                    None => info!("Using {} ws281x binding", kind),
                }
                return Ok(binding);
            }
            Err(err) => {
                debug!("{} binding unavailable: {}", kind, err);
                first_error.get_or_insert(err);
            }
        }
    }

    Err(first_error.unwrap_or(BindingError::NotCompiled))
}

/// Load the upstream native library
#[cfg(feature = "native-binding")]
pub fn load_official() -> Result<BoxedBinding, BindingError> {
    let binding = native::NativeBinding::load(native::NativeSource::Official)?;
    Ok(Box::new(binding))
}

/// Load the fallback native library
#[cfg(feature = "native-binding")]
pub fn load_fallback() -> Result<BoxedBinding, BindingError> {
    let binding = native::NativeBinding::load(native::NativeSource::Fallback)?;
    Ok(Box::new(binding))
}

#[cfg(not(feature = "native-binding"))]
pub fn load_official() -> Result<BoxedBinding, BindingError> {
    Err(BindingError::NotCompiled)
}

#[cfg(not(feature = "native-binding"))]
pub fn load_fallback() -> Result<BoxedBinding, BindingError> {
    Err(BindingError::NotCompiled)
}

#[cfg(feature = "rpi-detect")]
fn probe_board() {
    match rppal::system::DeviceInfo::new() {
        Ok(device) => info!("Detected {}", device.model()),
        Err(e) => warn!("Unable to identify board: {}", e),
    }
}

#[cfg(not(feature = "rpi-detect"))]
fn probe_board() {}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn missing_official() -> Result<BoxedBinding, BindingError> {
        Err(BindingError::NotFound {
            library: "libws2811.so".into(),
            searched: "/usr/lib".into(),
        })
    }

    fn missing_fallback() -> Result<BoxedBinding, BindingError> {
        Err(BindingError::NotFound {
            library: "libws281x.so".into(),
            searched: "/usr/lib".into(),
        })
    }

    fn fake_official() -> Result<BoxedBinding, BindingError> {
        Ok(Box::new(MockBinding::with_kind(BindingKind::NativeOfficial)))
    }

    fn fake_fallback() -> Result<BoxedBinding, BindingError> {
        Ok(Box::new(MockBinding::with_kind(BindingKind::NativeFallback)))
    }

    const OFFICIAL_ONLY: &[(BindingKind, BindingLoader)] =
        &[(BindingKind::NativeOfficial, fake_official)];

    #[test]
    fn test_non_embedded_platform_uses_mock() {
        let binding = select_for(false, false, OFFICIAL_ONLY).unwrap();
        assert_eq!(binding.kind(), BindingKind::Mock);
    }

    #[test]
    fn test_forced_mock_on_embedded_platform() {
        let binding = select_for(true, true, OFFICIAL_ONLY).unwrap();
        assert_eq!(binding.kind(), BindingKind::Mock);
    }

    #[test]
    fn test_official_preferred() {
        let chain: &[(BindingKind, BindingLoader)] = &[
            (BindingKind::NativeOfficial, fake_official),
            (BindingKind::NativeFallback, fake_fallback),
        ];
        let binding = select_for(false, true, chain).unwrap();
        assert_eq!(binding.kind(), BindingKind::NativeOfficial);
    }

    #[test]
    fn test_fallback_when_official_missing() {
        let chain: &[(BindingKind, BindingLoader)] = &[
            (BindingKind::NativeOfficial, missing_official),
            (BindingKind::NativeFallback, fake_fallback),
        ];
        let binding = select_for(false, true, chain).unwrap();
        assert_eq!(binding.kind(), BindingKind::NativeFallback);
    }

    #[test]
    fn test_first_error_is_escalated() {
        let chain: &[(BindingKind, BindingLoader)] = &[
            (BindingKind::NativeOfficial, missing_official),
            (BindingKind::NativeFallback, missing_fallback),
        ];
        let err = select_for(false, true, chain).err().unwrap();
        match err {
            BindingError::NotFound { library, .. } => assert_eq!(library, "libws2811.so"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("False"));
        assert!(!is_truthy(" off "));
    }

    #[test]
    #[serial]
    fn test_env_override_forces_mock() {
        // SAFETY: serialized with every other test touching the environment
        unsafe { std::env::set_var(MOCK_ENV, "1") };
        assert!(mock_override());
        let binding = select_binding(false).unwrap();
        assert_eq!(binding.kind(), BindingKind::Mock);

        unsafe { std::env::set_var(MOCK_ENV, "0") };
        assert!(!mock_override());

        unsafe { std::env::remove_var(MOCK_ENV) };
        assert!(!mock_override());
    }
}
