/*
 *  strip/binding/native/mod.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Native binding - drives the strip through rpi_ws281x
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

//! The rpi_ws281x C library owns all DMA/PWM/PCM/SPI timing. This binding
//! loads it at runtime, fills its `ws2811_t` from our configuration and
//! copies pixel buffers into the library's LED arrays on every render.
//!
//! Two builds are tried (see [`NativeSource`]): upstream first, then a
//! patched build for board revisions upstream does not know yet.

pub mod ffi;
pub mod loader;

use std::ffi::c_int;

use log::{debug, warn};

use crate::strip::channel::{ChannelState, DriverConfig, SharedChannel, SingleChannelOptions};
use crate::strip::error::{BindingError, DriverError};
use crate::strip::lock;
use crate::strip::traits::{BindingKind, HardwareBinding};
use ffi::{strip_code, Ws2811, RPI_PWM_CHANNELS, WS2811_ERROR_HW_NOT_SUPPORTED, WS2811_SUCCESS};

pub use loader::{NativeSource, Ws2811Library};

/// Strip binding backed by a dlopen'd rpi_ws281x
pub struct NativeBinding {
    /// Resolved entry points
    library: Ws2811Library,

    /// Which build this is
    source: NativeSource,

    /// Live device; boxed so the address handed to the library is stable
    device: Option<Box<Ws2811>>,
}

// SAFETY: the raw pointers inside `Ws2811` are owned by the library and only
// touched through `&mut self`; the binding is never shared, only moved.
unsafe impl Send for NativeBinding {}

impl NativeBinding {
    /// Load the library for `source`
    pub fn load(source: NativeSource) -> Result<Self, BindingError> {
        let library = Ws2811Library::load(source)?;
        Ok(Self {
            library,
            source,
            device: None,
        })
    }

    fn start(&mut self, mut device: Box<Ws2811>) -> Result<(), DriverError> {
        if self.device.is_some() {
            return Err(DriverError::Initialization("device already initialized".to_string()));
        }

        // SAFETY: device is a fully initialized ws2811_t at a stable address;
        // on failure the library releases whatever it allocated
        let code = unsafe { (self.library.init)(&mut *device) };
        if code != WS2811_SUCCESS {
            return Err(self.init_error(code));
        }

        debug!("ws2811_init succeeded via {}", self.library.location());
        self.device = Some(device);
        Ok(())
    }

    fn init_error(&self, code: c_int) -> DriverError {
        let message = self.library.describe(code);
        if code == WS2811_ERROR_HW_NOT_SUPPORTED {
            DriverError::UnsupportedRevision(message)
        } else {
            DriverError::Initialization(message)
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut device) = self.device.take() {
            debug!("ws2811_fini via {}", self.library.location());
            // SAFETY: device was accepted by ws2811_init and not yet finalized
            unsafe { (self.library.fini)(&mut *device) };
        }
    }
}

impl HardwareBinding for NativeBinding {
    fn kind(&self) -> BindingKind {
        self.source.kind()
    }

    fn init(&mut self, config: &DriverConfig) -> Result<Vec<ChannelState>, DriverError> {
        if config.channels.is_empty() || config.channels.len() > RPI_PWM_CHANNELS {
            return Err(DriverError::InvalidConfiguration(format!(
                "expected 1..={} channels, got {}",
                RPI_PWM_CHANNELS,
                config.channels.len()
            )));
        }

        let mut device = Box::new(Ws2811::new(config.freq, config.dma));
        for (slot, channel) in device.channel.iter_mut().zip(&config.channels) {
            slot.gpionum = channel.gpio as c_int;
            slot.count = channel.count as c_int;
            slot.invert = channel.invert as c_int;
            slot.brightness = channel.brightness;
            slot.strip_type = strip_code(channel.strip_type);
        }

        self.start(device)?;

        Ok(config
            .channels
            .iter()
            .map(|c| ChannelState::new(c, config.freq))
            .collect())
    }

    fn init_single(
        &mut self,
        count: u32,
        options: &SingleChannelOptions,
    ) -> Result<ChannelState, DriverError> {
        let mut device = Box::new(Ws2811::new(options.freq, options.dma));
        let slot = &mut device.channel[0];
        slot.gpionum = options.gpio as c_int;
        slot.count = count as c_int;
        slot.invert = options.invert as c_int;
        slot.brightness = options.brightness;
        slot.strip_type = strip_code(options.strip_type);

        self.start(device)?;

        Ok(ChannelState::single(count, options))
    }

    fn render(&mut self, channels: &[SharedChannel]) -> Result<(), DriverError> {
        let device = self.device.as_mut().ok_or(DriverError::NotInitialized)?;

        for (slot, shared) in device.channel.iter_mut().zip(channels) {
            if slot.leds.is_null() || slot.count <= 0 {
                continue;
            }
            let state = lock(shared);
            let len = (slot.count as usize).min(state.pixels.len());
            // SAFETY: the library allocated `count` LEDs for this channel
            let leds = unsafe { std::slice::from_raw_parts_mut(slot.leds, len) };
            leds.copy_from_slice(&state.pixels[..len]);
            slot.brightness = state.brightness;
        }

        // SAFETY: device is live (checked above)
        let code = unsafe { (self.library.render)(&mut **device) };
        if code != WS2811_SUCCESS {
            return Err(DriverError::Render(self.library.describe(code)));
        }
        Ok(())
    }

    fn reset(&mut self, channels: &[SharedChannel]) -> Result<(), DriverError> {
        for channel in channels {
            lock(channel).clear();
        }
        self.render(channels)
    }

    fn finalize(&mut self) -> Result<(), DriverError> {
        self.shutdown();
        Ok(())
    }
}

impl Drop for NativeBinding {
    fn drop(&mut self) {
        if self.device.is_some() {
            warn!("{} dropped with a live device, finalizing", self.source);
            self.shutdown();
        }
    }
}
