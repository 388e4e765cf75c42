/*
 *  strip/manager.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Reference-counted owner of the single strip driver handle
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

use log::{debug, error, info, warn};

use crate::strip::binding::{self, BoxedBinding};
use crate::strip::channel::{ChannelState, Channels, DriverConfig, SingleChannelOptions};
use crate::strip::error::{BindingError, DriverError};
use crate::strip::traits::{BindingKind, StripType};

/// Produces the fallback binding for the unsupported-revision retry
pub type FallbackLoader = Box<dyn Fn() -> Result<BoxedBinding, BindingError> + Send>;

/// The manager as shared between config and output nodes
pub type SharedDriver = Arc<Mutex<DriverManager>>;

/// Owner of the one hardware handle in the process
///
/// The first `acquire` initializes the binding and freezes the
/// configuration; later calls only bump the reference count and hand back
/// the same channel list. The last `release` resets and finalizes the
/// hardware.
///
/// Invariant: `channels.is_some()` exactly when `ref_count > 0`.
pub struct DriverManager {
    binding: BoxedBinding,
    channels: Option<Channels>,
    ref_count: usize,
    fallback_loader: FallbackLoader,
}

impl DriverManager {
    pub fn new(binding: BoxedBinding) -> Self {
        Self::with_fallback_loader(binding, Box::new(binding::load_fallback))
    }

    /// Manager whose unsupported-revision retry loads bindings from `loader`
    pub fn with_fallback_loader(binding: BoxedBinding, loader: FallbackLoader) -> Self {
        Self {
            binding,
            channels: None,
            ref_count: 0,
            fallback_loader: loader,
        }
    }

    /// Wrap for sharing between nodes
    pub fn shared(self) -> SharedDriver {
        Arc::new(Mutex::new(self))
    }

    /// Take a reference on the driver, initializing it on first use
    ///
    /// `config` is ignored while a handle is live.
    pub fn acquire(&mut self, config: &DriverConfig) -> Result<Channels, DriverError> {
        if let Some(channels) = &self.channels {
            self.ref_count += 1;
            debug!("ws281x driver reused (refs: {})", self.ref_count);
            return Ok(Arc::clone(channels));
        }

        let states = match self.initialize(config) {
            Ok(states) => states,
            Err(err)
                if err.is_unsupported_revision()
                    && self.binding.kind() == BindingKind::NativeOfficial =>
            {
                self.retry_with_fallback(config, err)?
            }
            Err(err) => {
                self.clear();
                return Err(err);
            }
        };

        let channels: Channels =
            Arc::new(states.into_iter().map(ChannelState::into_shared).collect());
        self.channels = Some(Arc::clone(&channels));
        self.ref_count = 1;
        info!(
            "ws281x driver initialized with {} binding: {} channel(s) over {}",
            self.binding.kind(),
            channels.len(),
            config.interface
        );
        Ok(channels)
    }

    fn initialize(&mut self, config: &DriverConfig) -> Result<Vec<ChannelState>, DriverError> {
        let first = config
            .channels
            .first()
            .ok_or_else(|| DriverError::InvalidConfiguration("no channels requested".to_string()))?;

        match config.interface.fixed_gpio() {
            Some(gpio) => {
                if first.gpio != gpio {
                    debug!(
                        "{} drives GPIO {} only, ignoring GPIO {}",
                        config.interface, gpio, first.gpio
                    );
                }
                let options = SingleChannelOptions {
                    gpio,
                    freq: config.freq,
                    dma: config.dma,
                    brightness: first.brightness,
                    strip_type: first.strip_type,
                    invert: first.invert,
                };
                Ok(vec![self.binding.init_single(first.count, &options)?])
            }
            None => self.binding.init(config),
        }
    }

    /// One retry with the fallback binding. The fallback stays active
    /// whatever the outcome; on any failure the original error is returned.
    fn retry_with_fallback(
        &mut self,
        config: &DriverConfig,
        original: DriverError,
    ) -> Result<Vec<ChannelState>, DriverError> {
        warn!("{}; retrying with the fallback binding", original);

        match (self.fallback_loader)() {
            Ok(fallback) => self.binding = fallback,
            Err(e) => {
                error!("Fallback binding unavailable: {}", e);
                self.clear();
                return Err(original);
            }
        }

        match self.initialize(config) {
            Ok(states) => Ok(states),
            Err(e) => {
                error!("Fallback binding failed as well: {}", e);
                self.clear();
                Err(original)
            }
        }
    }

    /// Drop a reference; the last one tears the hardware down
    ///
    /// Teardown is best-effort: reset and finalize errors are logged and
    /// the handle is cleared regardless.
    pub fn release(&mut self) {
        if self.ref_count == 0 {
            warn!("ws281x release without a matching acquire");
        }
        self.ref_count = self.ref_count.saturating_sub(1);
        if self.ref_count > 0 {
            debug!("ws281x driver still referenced (refs: {})", self.ref_count);
            return;
        }

        if let Some(channels) = self.channels.take() {
            if let Err(e) = self.binding.reset(&channels) {
                error!("ws281x reset during teardown failed: {}", e);
            }
            match self.binding.finalize() {
                Ok(()) => info!("ws281x driver finalized"),
                Err(e) => error!("ws281x finalize failed: {}", e),
            }
        }
        self.clear();
    }

    /// Push the live buffers to the strip
    pub fn render(&mut self) -> Result<(), DriverError> {
        let channels = self.channels.as_ref().ok_or(DriverError::NotInitialized)?;
        self.binding.render(channels)
    }

    /// Blank the strip through the binding's reset path
    pub fn reset(&mut self) -> Result<(), DriverError> {
        let channels = self.channels.as_ref().ok_or(DriverError::NotInitialized)?;
        self.binding.reset(channels)
    }

    /// Strip types accepted by the active binding
    pub fn strip_types(&self) -> &'static [StripType] {
        self.binding.strip_types()
    }

    pub fn binding_kind(&self) -> BindingKind {
        self.binding.kind()
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    /// Live channel list, if initialized
    pub fn channels(&self) -> Option<Channels> {
        self.channels.clone()
    }

    /// Swap the active binding. Only meaningful while no handle is live.
    pub fn set_binding(&mut self, binding: BoxedBinding) {
        if self.channels.is_some() {
            warn!("Replacing the ws281x binding while the driver is live");
        }
        self.binding = binding;
    }

    fn clear(&mut self) {
        self.channels = None;
        self.ref_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strip::binding::{MockBinding, MockBindingState, SimulatedFailure};
    use crate::strip::channel::{ChannelConfig, GPIO_PCM_DOUT, GPIO_SPI_MOSI, Interface};

    fn config(interface: Interface, count: u32) -> DriverConfig {
        DriverConfig {
            dma: 10,
            freq: 800_000,
            interface,
            channels: vec![ChannelConfig {
                count,
                gpio: 18,
                brightness: 255,
                strip_type: StripType::Ws2812,
                invert: false,
            }],
        }
    }

    fn loader<F>(f: F) -> FallbackLoader
    where
        F: Fn() -> Result<BoxedBinding, BindingError> + Send + 'static,
    {
        Box::new(f)
    }

    fn no_fallback() -> FallbackLoader {
        loader(|| Err(BindingError::NotCompiled))
    }

    fn mock_manager() -> (DriverManager, Arc<Mutex<MockBindingState>>) {
        let mock = MockBinding::new();
        let state = mock.state();
        (DriverManager::with_fallback_loader(Box::new(mock), no_fallback()), state)
    }

    #[test]
    fn test_n_acquires_share_one_handle() {
        let (mut manager, state) = mock_manager();

        let first = manager.acquire(&config(Interface::Pwm, 10)).unwrap();
        for n in 2..=5 {
            let again = manager.acquire(&config(Interface::Pwm, 99)).unwrap();
            assert!(Arc::ptr_eq(&first, &again));
            assert!(Arc::ptr_eq(&first[0], &again[0]));
            assert_eq!(manager.ref_count(), n);
            manager.render().unwrap();
        }
        // frozen at first acquire
        assert_eq!(first[0].lock().unwrap().count, 10);

        for _ in 0..5 {
            manager.release();
        }

        let state = state.lock().unwrap();
        assert_eq!(state.init_count, 1);
        assert_eq!(state.finalize_count, 1);
        assert_eq!(state.reset_count, 1);
        assert_eq!(manager.ref_count(), 0);
        assert!(manager.channels().is_none());
    }

    #[test]
    fn test_reacquire_gives_new_identity() {
        let (mut manager, state) = mock_manager();

        let first = manager.acquire(&config(Interface::Pwm, 4)).unwrap();
        manager.release();
        let second = manager.acquire(&config(Interface::Pwm, 4)).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first[0], &second[0]));
        assert_eq!(state.lock().unwrap().init_count, 2);
    }

    #[test]
    fn test_single_channel_pins() {
        let (mut manager, state) = mock_manager();
        let channels = manager.acquire(&config(Interface::Spi, 8)).unwrap();
        assert_eq!(channels[0].lock().unwrap().gpio, GPIO_SPI_MOSI);
        manager.release();

        let channels = manager.acquire(&config(Interface::Pcm, 8)).unwrap();
        assert_eq!(channels[0].lock().unwrap().gpio, GPIO_PCM_DOUT);
        manager.release();

        let state = state.lock().unwrap();
        assert_eq!(state.single_init_count, 2);
        assert_eq!(state.init_count, 0);
        assert_eq!(state.last_gpio, Some(GPIO_PCM_DOUT));
    }

    #[test]
    fn test_render_without_handle() {
        let (mut manager, state) = mock_manager();
        assert!(matches!(manager.render(), Err(DriverError::NotInitialized)));
        assert!(matches!(manager.reset(), Err(DriverError::NotInitialized)));
        assert_eq!(state.lock().unwrap().render_count, 0);
    }

    #[test]
    fn test_empty_channel_list_rejected() {
        let (mut manager, _) = mock_manager();
        let mut empty = config(Interface::Pwm, 1);
        empty.channels.clear();

        assert!(matches!(manager.acquire(&empty), Err(DriverError::InvalidConfiguration(_))));
        assert_eq!(manager.ref_count(), 0);
    }

    #[test]
    fn test_init_failure_clears_state() {
        let (mut manager, state) = mock_manager();
        state.lock().unwrap().simulate_init_failure = Some(SimulatedFailure::Other);

        assert!(matches!(
            manager.acquire(&config(Interface::Pwm, 3)),
            Err(DriverError::Initialization(_))
        ));
        assert_eq!(manager.ref_count(), 0);
        assert!(manager.channels().is_none());
    }

    #[test]
    fn test_unsupported_revision_retries_with_fallback() {
        let official = MockBinding::with_kind(BindingKind::NativeOfficial);
        official.state().lock().unwrap().simulate_init_failure =
            Some(SimulatedFailure::UnsupportedRevision);
        let fallback = MockBinding::with_kind(BindingKind::NativeFallback);
        let fallback_state = fallback.state();

        let mut manager = DriverManager::with_fallback_loader(
            Box::new(official),
            loader(move || Ok(Box::new(fallback.clone()))),
        );

        let channels = manager.acquire(&config(Interface::Pwm, 6)).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(manager.binding_kind(), BindingKind::NativeFallback);
        assert_eq!(manager.ref_count(), 1);
        assert_eq!(fallback_state.lock().unwrap().init_count, 1);
    }

    #[test]
    fn test_failed_retry_surfaces_original_error() {
        let official = MockBinding::with_kind(BindingKind::NativeOfficial);
        official.state().lock().unwrap().simulate_init_failure =
            Some(SimulatedFailure::UnsupportedRevision);

        let mut manager = DriverManager::with_fallback_loader(
            Box::new(official),
            loader(|| {
                let fallback = MockBinding::with_kind(BindingKind::NativeFallback);
                fallback.state().lock().unwrap().simulate_init_failure =
                    Some(SimulatedFailure::Other);
                Ok(Box::new(fallback))
            }),
        );

        let err = manager.acquire(&config(Interface::Pwm, 6)).unwrap_err();
        assert!(err.is_unsupported_revision());
        assert_eq!(manager.binding_kind(), BindingKind::NativeFallback);
        assert_eq!(manager.ref_count(), 0);
        assert!(manager.channels().is_none());
    }

    #[test]
    fn test_missing_fallback_surfaces_original_error() {
        let official = MockBinding::with_kind(BindingKind::NativeOfficial);
        official.state().lock().unwrap().simulate_init_failure =
            Some(SimulatedFailure::UnsupportedRevision);
        let mut manager = DriverManager::with_fallback_loader(
            Box::new(official),
            no_fallback(),
        );

        let err = manager.acquire(&config(Interface::Pwm, 6)).unwrap_err();
        assert!(err.is_unsupported_revision());
        assert_eq!(manager.binding_kind(), BindingKind::NativeOfficial);
    }

    #[test]
    fn test_no_retry_for_non_official_binding() {
        let mock = MockBinding::new();
        mock.state().lock().unwrap().simulate_init_failure =
            Some(SimulatedFailure::UnsupportedRevision);
        let mut manager = DriverManager::with_fallback_loader(
            Box::new(mock),
            loader(|| panic!("fallback must not be loaded")),
        );

        assert!(manager.acquire(&config(Interface::Pwm, 2)).unwrap_err().is_unsupported_revision());
        assert_eq!(manager.binding_kind(), BindingKind::Mock);
    }

    #[test]
    fn test_finalize_error_still_clears() {
        let (mut manager, state) = mock_manager();
        manager.acquire(&config(Interface::Pwm, 2)).unwrap();
        state.lock().unwrap().simulate_finalize_failure = true;

        manager.release();

        assert_eq!(manager.ref_count(), 0);
        assert!(manager.channels().is_none());
        assert!(matches!(manager.render(), Err(DriverError::NotInitialized)));
    }

    #[test]
    fn test_reset_error_still_finalizes() {
        let (mut manager, state) = mock_manager();
        let first = manager.acquire(&config(Interface::Pwm, 2)).unwrap();
        state.lock().unwrap().simulate_reset_failure = true;

        manager.release();
        {
            let state = state.lock().unwrap();
            assert_eq!(state.reset_count, 0);
            assert_eq!(state.finalize_count, 1);
        }
        assert!(manager.channels().is_none());

        let second = manager.acquire(&config(Interface::Pwm, 2)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(manager.ref_count(), 1);
        assert_eq!(state.lock().unwrap().init_count, 2);
    }

    #[test]
    fn test_unmatched_release_clamps() {
        let (mut manager, state) = mock_manager();
        manager.release();
        manager.release();
        assert_eq!(manager.ref_count(), 0);

        manager.acquire(&config(Interface::Pwm, 2)).unwrap();
        assert_eq!(manager.ref_count(), 1);
        manager.release();
        assert_eq!(state.lock().unwrap().finalize_count, 1);
    }
}
