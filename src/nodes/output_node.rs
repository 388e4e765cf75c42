/*
 *  nodes/output_node.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Strip output node - applies messages to the pixel buffer
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

use std::sync::Arc;

use log::{debug, error, info};
use serde_json::Value;

use crate::nodes::NodeError;
use crate::nodes::config_node::SharedConfigNode;
use crate::nodes::status::NodeStatus;
use crate::strip::channel::SharedChannel;
use crate::strip::command::{Applied, StripMessage};
use crate::strip::lock;
use crate::strip::manager::SharedDriver;

/// Completion callback for one message
pub type Done<'a> = &'a mut dyn FnMut(Result<(), NodeError>);

/// Turns inbound payloads into pixel changes on its config node's strip
pub struct OutputNode {
    server: Option<SharedConfigNode>,
    render_on_msg: bool,
    status: Option<NodeStatus>,
}

impl OutputNode {
    pub fn new(server: Option<SharedConfigNode>, render_on_msg: bool) -> Self {
        let status = match server {
            Some(_) => NodeStatus::ready(),
            None => NodeStatus::not_configured(),
        };
        let mut node = Self {
            server,
            render_on_msg,
            status: None,
        };
        node.set_status(Some(status));
        node
    }

    pub fn status(&self) -> Option<&NodeStatus> {
        self.status.as_ref()
    }

    /// Render after every message, whatever the payload says
    pub fn render_on_msg(&self) -> bool {
        self.render_on_msg
    }

    /// Apply one message payload
    ///
    /// Failures go to `done` when given, otherwise to the log. A strip that
    /// never initialized is reported but completes the message cleanly.
    pub fn receive(&mut self, payload: &Value, done: Option<Done<'_>>) {
        let Some(server) = self.server.clone() else {
            debug!("ws281x output not configured, message dropped");
            if let Some(done) = done {
                done(Ok(()));
            }
            return;
        };

        let (channel, driver) = {
            let node = lock(&server);
            (node.channel(), Arc::clone(node.driver()))
        };

        let Some(channel) = channel else {
            error!("ws281x driver not initialized. Deploy config first.");
            self.set_status(Some(NodeStatus::driver_error()));
            if let Some(done) = done {
                done(Ok(()));
            }
            return;
        };

        match self.apply(&driver, &channel, payload) {
            Ok(()) => {
                self.set_status(Some(NodeStatus::ready()));
                if let Some(done) = done {
                    done(Ok(()));
                }
            }
            Err(err) => {
                match done {
                    Some(done) => done(Err(err)),
                    None => error!("{}", err),
                }
                self.set_status(Some(NodeStatus::error()));
            }
        }
    }

    fn apply(
        &self,
        driver: &SharedDriver,
        channel: &SharedChannel,
        payload: &Value,
    ) -> Result<(), NodeError> {
        let message = StripMessage::decode(payload)?;
        let applied = message.command.apply(&mut lock(channel));

        let mut render = message.render_requested();
        if applied == Applied::Reset {
            lock(driver).reset()?;
            render = false;
        }

        if render || self.render_on_msg {
            lock(driver).render()?;
        }
        Ok(())
    }

    /// Clear the status; the config node owns the driver teardown
    pub fn close(&mut self) {
        self.set_status(None);
    }

    fn set_status(&mut self, status: Option<NodeStatus>) {
        if self.status != status {
            match &status {
                Some(s) => info!("ws281x output status: {}", s),
                None => debug!("ws281x output status cleared"),
            }
        }
        self.status = status;
    }
}
