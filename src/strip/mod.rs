/*
 *  strip/mod.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  WS281x strip driver: bindings, lifecycle and pixel commands
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

//! Strip driver layer
//!
//! A [`HardwareBinding`] is selected once per process (native library or
//! mock) and owned by the [`DriverManager`], which reference-counts the
//! single hardware handle. Consumers get the shared [`ChannelState`]
//! buffers back from `acquire` and mutate them with [`StripCommand`]s.

pub mod binding;
pub mod channel;
pub mod color;
pub mod command;
pub mod error;
pub mod manager;
pub mod traits;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use binding::{select_binding, BoxedBinding, MockBinding, MockBindingState, SimulatedFailure};
pub use channel::{
    ChannelConfig, ChannelState, Channels, DriverConfig, Interface, SharedChannel,
    SingleChannelOptions,
};
pub use command::{Applied, StripCommand, StripMessage};
pub use error::{BindingError, CommandError, DriverError};
pub use manager::{DriverManager, SharedDriver};
pub use traits::{BindingKind, HardwareBinding, StripType};

/// Lock a mutex, recovering the data if a holder panicked
///
/// Pixel buffers and counters stay usable after a panicking consumer;
/// the worst case is a half-written frame.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
