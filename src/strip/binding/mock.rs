/*
 *  strip/binding/mock.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock strip binding for running without hardware
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

use std::sync::{Arc, Mutex};

use log::debug;

use crate::strip::channel::{ChannelState, DriverConfig, SharedChannel, SingleChannelOptions};
use crate::strip::error::DriverError;
use crate::strip::lock;
use crate::strip::traits::{BindingKind, HardwareBinding};

/// Mock strip binding
///
/// Used whenever the process is not on a supported board or the mock is
/// forced. Initialization hands out zero-filled buffers; render, reset and
/// finalize touch no hardware and leave the buffers alone.
///
/// Every call is counted in a shared [`MockBindingState`] so the lifecycle
/// can be verified, and init/finalize failures can be simulated.
#[derive(Debug, Clone)]
pub struct MockBinding {
    /// Reported kind, so fallback paths can be exercised with a mock
    kind: BindingKind,

    /// Shared state for inspection
    state: Arc<Mutex<MockBindingState>>,
}

/// Simulated initialization failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedFailure {
    /// Fails like a native library that does not know the board revision
    UnsupportedRevision,

    /// Any other initialization failure
    Other,
}

/// Call counters and failure switches (shared for inspection)
#[derive(Debug, Default)]
pub struct MockBindingState {
    /// Number of multi-channel init() calls that succeeded
    pub init_count: usize,

    /// Number of single-channel init_single() calls that succeeded
    pub single_init_count: usize,

    /// Number of render() calls
    pub render_count: usize,

    /// Number of reset() calls
    pub reset_count: usize,

    /// Number of finalize() calls
    pub finalize_count: usize,

    /// Pin used by the last successful initialization
    pub last_gpio: Option<u32>,

    /// Fail every initialization with this error
    pub simulate_init_failure: Option<SimulatedFailure>,

    /// Fail reset()
    pub simulate_reset_failure: bool,

    /// Fail finalize()
    pub simulate_finalize_failure: bool,

    /// True between a successful init and finalize
    pub live: bool,
}

impl MockBinding {
    pub fn new() -> Self {
        Self::with_kind(BindingKind::Mock)
    }

    /// A mock that reports itself as another backend
    pub fn with_kind(kind: BindingKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(MockBindingState::default())),
        }
    }

    /// Get reference to state for inspection
    pub fn state(&self) -> Arc<Mutex<MockBindingState>> {
        Arc::clone(&self.state)
    }

    fn check_init(&self) -> Result<(), DriverError> {
        let state = lock(&self.state);
        if state.live {
            return Err(DriverError::Initialization("device already initialized".to_string()));
        }
        match state.simulate_init_failure {
            Some(SimulatedFailure::UnsupportedRevision) => Err(DriverError::UnsupportedRevision(
                format!("simulated revision rejection ({})", self.kind),
            )),
            Some(SimulatedFailure::Other) => Err(DriverError::Initialization(format!(
                "simulated init failure ({})",
                self.kind
            ))),
            None => Ok(()),
        }
    }
}

impl Default for MockBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareBinding for MockBinding {
    fn kind(&self) -> BindingKind {
        self.kind
    }

    fn init(&mut self, config: &DriverConfig) -> Result<Vec<ChannelState>, DriverError> {
        self.check_init()?;

        let channels: Vec<ChannelState> = config
            .channels
            .iter()
            .map(|c| ChannelState::new(c, config.freq))
            .collect();

        let mut state = lock(&self.state);
        state.init_count += 1;
        state.live = true;
        state.last_gpio = config.channels.first().map(|c| c.gpio);
        debug!("mock init: {} channel(s)", channels.len());
        Ok(channels)
    }

    fn init_single(
        &mut self,
        count: u32,
        options: &SingleChannelOptions,
    ) -> Result<ChannelState, DriverError> {
        self.check_init()?;

        let mut state = lock(&self.state);
        state.single_init_count += 1;
        state.live = true;
        state.last_gpio = Some(options.gpio);
        debug!("mock single-channel init: {} LEDs on GPIO {}", count, options.gpio);
        Ok(ChannelState::single(count, options))
    }

    fn render(&mut self, _channels: &[SharedChannel]) -> Result<(), DriverError> {
        lock(&self.state).render_count += 1;
        Ok(())
    }

    fn reset(&mut self, _channels: &[SharedChannel]) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        if state.simulate_reset_failure {
            return Err(DriverError::Render("simulated reset failure".to_string()));
        }
        state.reset_count += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        state.live = false;
        if state.simulate_finalize_failure {
            return Err(DriverError::Finalize("simulated finalize failure".to_string()));
        }
        state.finalize_count += 1;
        Ok(())
    }
}
