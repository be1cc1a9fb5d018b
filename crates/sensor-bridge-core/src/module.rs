//! Embedding facade.
//!
//! [`SensorModule::start`] spawns the driver loop and hands back a
//! [`SensorModuleHandle`] the daemon uses to enable sensors, register
//! listeners, attach kernel event fallbacks and forward bus ownership
//! signals.

use std::os::fd::OwnedFd;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use sensor_bridge_hub::HubClient;
use sensor_bridge_types::{SensorId, SensorValue};

use crate::bridge::{Bridge, BridgeEvent, Command};
use crate::config::BridgeConfig;
use crate::core::CoreStatus;
use crate::error::BridgeError;

pub struct SensorModule;

impl SensorModule {
    /// Start the sensor module on the current runtime.
    pub fn start(config: BridgeConfig, hub: Arc<dyn HubClient>) -> SensorModuleHandle {
        let bridge = Bridge::new(config, hub);
        let tx = bridge.sender();
        let status_rx = bridge.status_receiver();
        let task = tokio::spawn(bridge.run());
        SensorModuleHandle {
            tx,
            status_rx,
            task,
        }
    }
}

pub struct SensorModuleHandle {
    tx: mpsc::UnboundedSender<BridgeEvent>,
    status_rx: watch::Receiver<CoreStatus>,
    task: JoinHandle<()>,
}

impl SensorModuleHandle {
    fn send(&self, command: Command) -> Result<(), BridgeError> {
        self.tx
            .send(BridgeEvent::Command(command))
            .map_err(|_| BridgeError::ChannelClosed)
    }

    /// Ask for the sensor to be powered and reporting.
    pub fn enable(&self, sensor: SensorId) -> Result<(), BridgeError> {
        self.send(Command::Enable(sensor))
    }

    /// Ask for the sensor to stop reporting.
    pub fn disable(&self, sensor: SensorId) -> Result<(), BridgeError> {
        self.send(Command::Disable(sensor))
    }

    /// Register the listener for a sensor; the current value is delivered
    /// immediately and again on every change.
    pub fn set_notify<F>(&self, sensor: SensorId, notify: F) -> Result<(), BridgeError>
    where
        F: Fn(SensorValue) + Send + 'static,
    {
        self.send(Command::SetNotify(sensor, Box::new(notify)))
    }

    /// Attach an already-open kernel event device as the preferred data
    /// source for this sensor. Only proximity and ambient light have
    /// fallback decoders; the fd is consumed either way.
    pub fn attach_evdev(&self, sensor: SensorId, fd: OwnedFd) -> Result<(), BridgeError> {
        self.send(Command::AttachEvdev(sensor, fd))
    }

    /// Forward a bus name-ownership change. Signals for names other than the
    /// configured hub service are ignored.
    pub fn name_owner_changed(
        &self,
        name: &str,
        _old_owner: Option<&str>,
        new_owner: Option<&str>,
    ) -> Result<(), BridgeError> {
        self.send(Command::NameOwnerChanged {
            name: name.to_string(),
            new_owner: new_owner.map(str::to_string),
        })
    }

    /// Snapshot of the current machine states.
    pub fn status(&self) -> CoreStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch channel publishing a status snapshot after every transition.
    pub fn status_receiver(&self) -> watch::Receiver<CoreStatus> {
        self.status_rx.clone()
    }

    /// Tear everything down and wait for the driver to exit.
    pub async fn shutdown(self) -> Result<(), BridgeError> {
        self.send(Command::Shutdown)?;
        self.task.await.map_err(|e| BridgeError::Other(e.into()))
    }
}
