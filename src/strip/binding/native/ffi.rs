/*
 *  strip/binding/native/ffi.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  C ABI types of the rpi_ws281x library
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

//! Mirrors `ws2811.h`. All types use `#[repr(C)]` so a `Ws2811` can be
//! handed straight to `ws2811_init` / `ws2811_render` / `ws2811_fini`.

use std::ffi::{c_char, c_int, c_void};
use std::ptr;

use crate::strip::traits::StripType;

/// Number of PWM channels in `ws2811_t`
pub const RPI_PWM_CHANNELS: usize = 2;

/// `ws2811_return_t` values the binding reacts to
pub const WS2811_SUCCESS: c_int = 0;
pub const WS2811_ERROR_HW_NOT_SUPPORTED: c_int = -3;

/// Color layouts (`strip_type`)
pub const WS2811_STRIP_GRB: c_int = 0x0008_1000;
pub const SK6812_STRIP_GRBW: c_int = 0x1808_1000;

/// Entry points
pub type Ws2811InitFn = unsafe extern "C" fn(ws2811: *mut Ws2811) -> c_int;
pub type Ws2811RenderFn = unsafe extern "C" fn(ws2811: *mut Ws2811) -> c_int;
pub type Ws2811FiniFn = unsafe extern "C" fn(ws2811: *mut Ws2811);
pub type Ws2811ReturnStrFn = unsafe extern "C" fn(state: c_int) -> *const c_char;

/// `ws2811_channel_t`
#[repr(C)]
#[derive(Debug)]
pub struct Ws2811Channel {
    /// GPIO pin, 0 if unused
    pub gpionum: c_int,
    pub invert: c_int,
    /// LED count, 0 if unused
    pub count: c_int,
    pub strip_type: c_int,
    /// Allocated by the library in ws2811_init
    pub leds: *mut u32,
    pub brightness: u8,
    pub wshift: u8,
    pub rshift: u8,
    pub gshift: u8,
    pub bshift: u8,
    pub gamma: *mut u8,
}

impl Default for Ws2811Channel {
    fn default() -> Self {
        Self {
            gpionum: 0,
            invert: 0,
            count: 0,
            strip_type: WS2811_STRIP_GRB,
            leds: ptr::null_mut(),
            brightness: 0,
            wshift: 0,
            rshift: 0,
            gshift: 0,
            bshift: 0,
            gamma: ptr::null_mut(),
        }
    }
}

/// `ws2811_t`
#[repr(C)]
#[derive(Debug)]
pub struct Ws2811 {
    pub render_wait_time: u64,
    pub device: *mut c_void,
    pub rpi_hw: *const c_void,
    pub freq: u32,
    pub dmanum: c_int,
    pub channel: [Ws2811Channel; RPI_PWM_CHANNELS],
}

impl Ws2811 {
    pub fn new(freq: u32, dma: u32) -> Self {
        Self {
            render_wait_time: 0,
            device: ptr::null_mut(),
            rpi_hw: ptr::null(),
            freq,
            dmanum: dma as c_int,
            channel: [Ws2811Channel::default(), Ws2811Channel::default()],
        }
    }
}

/// Library color layout for a strip type
pub fn strip_code(strip_type: StripType) -> c_int {
    match strip_type {
        StripType::Ws2812 | StripType::Sk6812 => WS2811_STRIP_GRB,
        StripType::Sk6812w => SK6812_STRIP_GRBW,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_channel_defaults() {
        let ws = Ws2811::new(800_000, 10);
        assert_eq!(ws.freq, 800_000);
        assert_eq!(ws.dmanum, 10);
        for ch in &ws.channel {
            assert_eq!(ch.count, 0);
            assert_eq!(ch.gpionum, 0);
            assert!(ch.leds.is_null());
        }
    }

    #[test]
    fn test_strip_codes() {
        assert_eq!(strip_code(StripType::Ws2812), WS2811_STRIP_GRB);
        assert_eq!(strip_code(StripType::Sk6812), WS2811_STRIP_GRB);
        assert_eq!(strip_code(StripType::Sk6812w), SK6812_STRIP_GRBW);
    }
}
