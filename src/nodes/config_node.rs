/*
 *  nodes/config_node.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Strip configuration node - holds the driver reference
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

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::nodes::NodeError;
use crate::nodes::status::NodeStatus;
use crate::strip::channel::{
    ChannelConfig, DriverConfig, GPIO_PCM_DOUT, GPIO_PWM_DEFAULT, GPIO_SPI_MOSI, Interface,
    SharedChannel,
};
use crate::strip::lock;
use crate::strip::manager::SharedDriver;
use crate::strip::traits::StripType;

pub type SharedConfigNode = Arc<Mutex<ConfigNode>>;

/// Strip properties as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripSettings {
    pub leds: u32,
    pub gpio: u32,
    pub interface: Interface,
    pub freq: u32,
    pub dma: u32,
    /// Strip type by name, e.g. "WS2812"
    pub strip_type: String,
    pub brightness: u8,
    pub invert: bool,
}

impl Default for StripSettings {
    fn default() -> Self {
        Self {
            leds: 1,
            gpio: GPIO_PWM_DEFAULT,
            interface: Interface::Pwm,
            freq: 800_000,
            dma: 10,
            strip_type: StripType::Ws2812.name().to_string(),
            brightness: 255,
            invert: false,
        }
    }
}

impl StripSettings {
    /// Pin after moving the PWM default onto the interface's data pin
    pub fn effective_gpio(&self) -> u32 {
        match (self.interface, self.gpio) {
            (Interface::Pcm, GPIO_PWM_DEFAULT) => GPIO_PCM_DOUT,
            (Interface::Spi, GPIO_PWM_DEFAULT) => GPIO_SPI_MOSI,
            _ => self.gpio,
        }
    }

    /// LED count, never zero
    pub fn led_count(&self) -> u32 {
        self.leds.max(1)
    }

    /// Single-channel driver configuration, resolving the strip type
    /// against the names offered by the binding
    pub fn driver_config(&self, strip_types: &[StripType]) -> Result<DriverConfig, NodeError> {
        let strip_type = strip_types
            .iter()
            .copied()
            .find(|t| t.name() == self.strip_type)
            .ok_or_else(|| NodeError::UnknownStripType(self.strip_type.clone()))?;

        Ok(DriverConfig {
            dma: self.dma,
            freq: self.freq,
            interface: self.interface,
            channels: vec![ChannelConfig {
                count: self.led_count(),
                gpio: self.effective_gpio(),
                brightness: self.brightness,
                strip_type,
                invert: self.invert,
            }],
        })
    }
}

/// Owner of one driver reference
///
/// Acquires on construction and keeps channel 0. Releases once on
/// `close()` (or drop), and only if the acquire succeeded.
pub struct ConfigNode {
    settings: StripSettings,
    driver: SharedDriver,
    channel: Option<SharedChannel>,
    status: Option<NodeStatus>,
    acquired: bool,
}

impl ConfigNode {
    pub fn new(driver: SharedDriver, settings: StripSettings) -> Self {
        let mut node = Self {
            settings,
            driver,
            channel: None,
            status: None,
            acquired: false,
        };
        if let Err(e) = node.open() {
            error!("Failed to initialize ws281x driver: {}", e);
            node.status = Some(NodeStatus::init_failed());
        }
        node
    }

    fn open(&mut self) -> Result<(), NodeError> {
        let mut driver = lock(&self.driver);
        let config = self.settings.driver_config(driver.strip_types())?;
        let channels = driver.acquire(&config)?;
        self.acquired = true;
        self.channel = channels.first().cloned();

        info!(
            "Initialized ws281x driver for {} LEDs on GPIO {} using {} interface",
            self.settings.led_count(),
            self.settings.effective_gpio(),
            self.settings.interface
        );
        Ok(())
    }

    pub fn shared(self) -> SharedConfigNode {
        Arc::new(Mutex::new(self))
    }

    /// Channel 0 of the driver, None when initialization failed
    pub fn channel(&self) -> Option<SharedChannel> {
        self.channel.clone()
    }

    pub fn driver(&self) -> &SharedDriver {
        &self.driver
    }

    pub fn settings(&self) -> &StripSettings {
        &self.settings
    }

    pub fn status(&self) -> Option<&NodeStatus> {
        self.status.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.acquired
    }

    /// Give the driver reference back
    pub fn close(&mut self) {
        self.channel = None;
        if !self.acquired {
            return;
        }
        self.acquired = false;
        lock(&self.driver).release();
        info!("ws281x driver finalized.");
    }
}

impl Drop for ConfigNode {
    fn drop(&mut self) {
        if self.acquired {
            warn!("ws281x config node dropped without close()");
            self.close();
        }
    }
}
