/*
 *  strip/channel.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Driver configuration and per-channel pixel state
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
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::strip::traits::StripType;

/// Default PWM data pin (BCM numbering)
pub const GPIO_PWM_DEFAULT: u32 = 18;
/// SPI MOSI, the only pin the SPI path can drive
pub const GPIO_SPI_MOSI: u32 = 10;
/// PCM DOUT, the only pin the PCM path can drive
pub const GPIO_PCM_DOUT: u32 = 21;

/// Signal generator used to clock out the LED protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interface {
    #[default]
    Pwm,
    Pcm,
    Spi,
}

impl Interface {
    /// Pin forced by the single-channel fast path, None for PWM
    pub fn fixed_gpio(&self) -> Option<u32> {
        match self {
            Interface::Pwm => None,
            Interface::Pcm => Some(GPIO_PCM_DOUT),
            Interface::Spi => Some(GPIO_SPI_MOSI),
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interface::Pwm => write!(f, "PWM"),
            Interface::Pcm => write!(f, "PCM"),
            Interface::Spi => write!(f, "SPI"),
        }
    }
}

impl FromStr for Interface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PWM" => Ok(Interface::Pwm),
            "PCM" => Ok(Interface::Pcm),
            "SPI" => Ok(Interface::Spi),
            other => Err(format!("unknown interface '{}' (expected PWM, PCM or SPI)", other)),
        }
    }
}

/// One requested output channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub count: u32,
    pub gpio: u32,
    pub brightness: u8,
    pub strip_type: StripType,
    pub invert: bool,
}

/// Configuration handed to [`crate::strip::manager::DriverManager::acquire`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub dma: u32,
    pub freq: u32,
    #[serde(default)]
    pub interface: Interface,
    pub channels: Vec<ChannelConfig>,
}

/// Options for the single-channel SPI/PCM initialization path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleChannelOptions {
    pub gpio: u32,
    pub freq: u32,
    pub dma: u32,
    pub brightness: u8,
    pub strip_type: StripType,
    pub invert: bool,
}

/// Pixel memory and settings of one physical output
///
/// `pixels` always holds exactly `count` packed 0xRRGGBB (or 0xWWRRGGBB)
/// words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    pub count: u32,
    pub pixels: Vec<u32>,
    pub brightness: u8,
    pub gpio: u32,
    pub freq: u32,
    pub strip_type: StripType,
    pub invert: bool,
}

/// Channel state shared between the driver and every consumer
pub type SharedChannel = Arc<Mutex<ChannelState>>;

/// The channel list produced by one initialization
pub type Channels = Arc<Vec<SharedChannel>>;

impl ChannelState {
    /// Fresh zero-filled channel for a multi-channel init
    pub fn new(config: &ChannelConfig, freq: u32) -> Self {
        Self {
            count: config.count,
            pixels: vec![0; config.count as usize],
            brightness: config.brightness,
            gpio: config.gpio,
            freq,
            strip_type: config.strip_type,
            invert: config.invert,
        }
    }

    /// Fresh zero-filled channel for the single-channel path
    pub fn single(count: u32, options: &SingleChannelOptions) -> Self {
        Self {
            count,
            pixels: vec![0; count as usize],
            brightness: options.brightness,
            gpio: options.gpio,
            freq: options.freq,
            strip_type: options.strip_type,
            invert: options.invert,
        }
    }

    pub fn into_shared(self) -> SharedChannel {
        Arc::new(Mutex::new(self))
    }

    /// Set every slot to `color`
    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Copy `values` positionally from slot 0; slots past the input are
    /// left untouched. Returns the number of slots written.
    pub fn copy_pixels(&mut self, values: &[u32]) -> usize {
        let len = self.pixels.len().min(values.len());
        self.pixels[..len].copy_from_slice(&values[..len]);
        len
    }

    /// Set one slot; out-of-range indices are ignored
    pub fn set_pixel(&mut self, index: i64, color: u32) -> bool {
        match usize::try_from(index).ok().and_then(|i| self.pixels.get_mut(i)) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    /// Update brightness when `value` is within 0..=255
    pub fn set_brightness(&mut self, value: i64) -> bool {
        match u8::try_from(value) {
            Ok(b) => {
                self.brightness = b;
                true
            }
            Err(_) => false,
        }
    }

    /// Zero the pixel buffer
    pub fn clear(&mut self) {
        self.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(count: u32) -> ChannelState {
        ChannelState::new(
            &ChannelConfig {
                count,
                gpio: 18,
                brightness: 255,
                strip_type: StripType::Ws2812,
                invert: false,
            },
            800_000,
        )
    }

    #[test]
    fn test_new_channel_is_zero_filled() {
        let ch = channel(10);
        assert_eq!(ch.count, 10);
        assert_eq!(ch.pixels.len(), 10);
        assert!(ch.pixels.iter().all(|&p| p == 0));
        assert_eq!(ch.freq, 800_000);
    }

    #[test]
    fn test_copy_pixels_leaves_tail_untouched() {
        let mut ch = channel(5);
        ch.fill(0x111111);
        let written = ch.copy_pixels(&[0xff0000, 0x00ff00]);
        assert_eq!(written, 2);
        assert_eq!(ch.pixels, vec![0xff0000, 0x00ff00, 0x111111, 0x111111, 0x111111]);

        // longer input is truncated to the buffer
        let written = ch.copy_pixels(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(written, 5);
        assert_eq!(ch.pixels, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_set_pixel_bounds() {
        let mut ch = channel(4);
        assert!(ch.set_pixel(3, 0x0000ff));
        assert!(!ch.set_pixel(4, 0x0000ff));
        assert!(!ch.set_pixel(-1, 0x0000ff));
        assert_eq!(ch.pixels, vec![0, 0, 0, 0x0000ff]);
    }

    #[test]
    fn test_set_brightness_range() {
        let mut ch = channel(1);
        assert!(ch.set_brightness(128));
        assert_eq!(ch.brightness, 128);
        assert!(!ch.set_brightness(999));
        assert!(!ch.set_brightness(-1));
        assert_eq!(ch.brightness, 128);
        assert!(ch.set_brightness(0));
        assert_eq!(ch.brightness, 0);
    }

    #[test]
    fn test_interface_parsing() {
        assert_eq!("spi".parse::<Interface>().unwrap(), Interface::Spi);
        assert_eq!("PCM".parse::<Interface>().unwrap(), Interface::Pcm);
        assert!("i2c".parse::<Interface>().is_err());
        assert_eq!(Interface::Spi.fixed_gpio(), Some(10));
        assert_eq!(Interface::Pcm.fixed_gpio(), Some(21));
        assert_eq!(Interface::Pwm.fixed_gpio(), None);
    }

    #[test]
    fn test_driver_config_json_shape() {
        let json = r#"{
            "dma": 10,
            "freq": 800000,
            "interface": "SPI",
            "channels": [
                {
                    "count": 10,
                    "gpio": 18,
                    "brightness": 255,
                    "stripType": "ws2812",
                    "invert": false
                }
            ]
        }"#;
        let config: DriverConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.interface, Interface::Spi);
        assert_eq!(config.channels[0].strip_type, StripType::Ws2812);

        // interface defaults to PWM
        let json = r#"{ "dma": 10, "freq": 800000, "channels": [] }"#;
        let config: DriverConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.interface, Interface::Pwm);
    }
}
