/*
 *  nodes/mod.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Flow nodes: strip configuration and message output
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

//! The two consumer roles of a flow runtime
//!
//! A [`ConfigNode`] owns one reference on the driver for its lifetime; any
//! number of [`OutputNode`]s point at it and turn messages into pixel
//! changes.

pub mod config_node;
pub mod output_node;
pub mod status;

use thiserror::Error;

use crate::strip::error::{CommandError, DriverError};

pub use config_node::{ConfigNode, SharedConfigNode, StripSettings};
pub use output_node::OutputNode;
pub use status::{NodeStatus, StatusFill, StatusShape};

/// Errors surfaced by node operations
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Strip type name not offered by the active binding
    #[error("unknown strip type '{0}'")]
    UnknownStripType(String),
}
