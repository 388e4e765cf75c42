/*
 *  lib.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  WS281x strip driver wrapper and message controller
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

//! LyLEDs
//!
//! Drives a WS281x LED strip through a reference-counted driver handle and
//! turns flow messages into pixel changes.

pub mod config;
pub mod input;
pub mod nodes;
pub mod strip;
