//! The bridge driver.
//!
//! Owns every task, timer and socket the pure core asks for, and serializes
//! all state transitions through one event loop. Each spawned task carries a
//! token; events arriving with a token the driver no longer holds are stale
//! echoes of cancelled work and are dropped.

use std::collections::HashMap;
use std::os::fd::OwnedFd;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use sensor_bridge_hub::{HubClient, HubError};
use sensor_bridge_types::{Sample, SensorId, SensorValue};

use crate::backend;
use crate::config::BridgeConfig;
use crate::core::{Core, CoreStatus};
use crate::events::{CoreEffect, CoreEvent, HubCall, HubReply, Layer, SocketEvent};

/// Listener callback invoked with every delivered value.
pub type NotifyFn = Box<dyn Fn(SensorValue) + Send + 'static>;

/// Requests from the embedding daemon.
pub enum Command {
    Enable(SensorId),
    Disable(SensorId),
    SetNotify(SensorId, NotifyFn),
    AttachEvdev(SensorId, OwnedFd),
    NameOwnerChanged {
        name: String,
        new_owner: Option<String>,
    },
    Shutdown,
}

/// Everything that can wake the driver loop.
pub enum BridgeEvent {
    Command(Command),
    OwnerReply {
        token: u64,
        result: Result<Option<String>, HubError>,
    },
    Reply {
        sensor: SensorId,
        layer: Layer,
        token: u64,
        reply: HubReply,
    },
    Socket {
        sensor: SensorId,
        token: u64,
        event: SocketEvent,
    },
    Retry {
        sensor: SensorId,
        layer: Layer,
        token: u64,
    },
    WindowExpired {
        token: u64,
    },
    EvdevSample {
        sensor: SensorId,
        token: u64,
        sample: Sample,
    },
}

/// A spawned task plus the token its events must carry. Dropping it aborts
/// the task, so cancellation is removal from the owning map.
struct Pending {
    token: u64,
    handle: JoinHandle<()>,
}

impl Drop for Pending {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) struct Bridge {
    config: BridgeConfig,
    hub: Arc<dyn HubClient>,
    core: Core,
    rx: mpsc::UnboundedReceiver<BridgeEvent>,
    tx: mpsc::UnboundedSender<BridgeEvent>,
    listeners: HashMap<SensorId, NotifyFn>,
    owner_call: Option<Pending>,
    calls: HashMap<(SensorId, Layer), Pending>,
    retries: HashMap<(SensorId, Layer), Pending>,
    sockets: HashMap<SensorId, Pending>,
    evdev_readers: HashMap<SensorId, Pending>,
    window_timer: Option<Pending>,
    next_token: u64,
    status_tx: watch::Sender<CoreStatus>,
}

impl Bridge {
    pub(crate) fn new(config: BridgeConfig, hub: Arc<dyn HubClient>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let core = Core::new(&config);
        let (status_tx, _) = watch::channel(core.status());
        Self {
            config,
            hub,
            core,
            rx,
            tx,
            listeners: HashMap::new(),
            owner_call: None,
            calls: HashMap::new(),
            retries: HashMap::new(),
            sockets: HashMap::new(),
            evdev_readers: HashMap::new(),
            window_timer: None,
            next_token: 0,
            status_tx,
        }
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<BridgeEvent> {
        self.tx.clone()
    }

    pub(crate) fn status_receiver(&self) -> watch::Receiver<CoreStatus> {
        self.status_tx.subscribe()
    }

    pub(crate) async fn run(mut self) {
        let effects = self.core.start();
        self.apply(effects);
        let _ = self.status_tx.send(self.core.status());

        while let Some(event) = self.rx.recv().await {
            let shutting_down = matches!(event, BridgeEvent::Command(Command::Shutdown));
            self.dispatch(event);
            let _ = self.status_tx.send(self.core.status());
            if shutting_down {
                break;
            }
        }
        debug!("bridge driver stopped");
    }

    fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn dispatch(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Command(command) => self.handle_command(command),
            BridgeEvent::OwnerReply { token, result } => {
                if self.owner_call.as_ref().is_some_and(|p| p.token == token) {
                    self.owner_call = None;
                    let effects = self.core.handle(CoreEvent::OwnerReply(result));
                    self.apply(effects);
                } else {
                    trace!("stale owner reply dropped");
                }
            }
            BridgeEvent::Reply {
                sensor,
                layer,
                token,
                reply,
            } => {
                let live = self
                    .calls
                    .get(&(sensor, layer))
                    .is_some_and(|p| p.token == token);
                if live {
                    self.calls.remove(&(sensor, layer));
                    let effects = self.core.handle(CoreEvent::Reply {
                        sensor,
                        layer,
                        reply,
                    });
                    self.apply(effects);
                } else {
                    trace!(%sensor, %layer, "stale hub reply dropped");
                }
            }
            BridgeEvent::Socket {
                sensor,
                token,
                event,
            } => {
                let live = self
                    .sockets
                    .get(&sensor)
                    .is_some_and(|p| p.token == token);
                if live {
                    let effects = self.core.handle(CoreEvent::Socket { sensor, event });
                    self.apply(effects);
                } else {
                    trace!(%sensor, "stale socket event dropped");
                }
            }
            BridgeEvent::Retry {
                sensor,
                layer,
                token,
            } => {
                let live = self
                    .retries
                    .get(&(sensor, layer))
                    .is_some_and(|p| p.token == token);
                if live {
                    self.retries.remove(&(sensor, layer));
                    let effects = self.core.handle(CoreEvent::RetryExpired { sensor, layer });
                    self.apply(effects);
                } else {
                    trace!(%sensor, %layer, "stale retry timer dropped");
                }
            }
            BridgeEvent::WindowExpired { token } => {
                if self.window_timer.as_ref().is_some_and(|p| p.token == token) {
                    self.window_timer = None;
                    let effects = self.core.handle(CoreEvent::WindowExpired);
                    self.apply(effects);
                }
            }
            BridgeEvent::EvdevSample {
                sensor,
                token,
                sample,
            } => {
                let live = self
                    .evdev_readers
                    .get(&sensor)
                    .is_some_and(|p| p.token == token);
                if live {
                    let effects = self.core.handle(CoreEvent::EvdevSample(sample));
                    self.apply(effects);
                }
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Enable(sensor) => {
                let effects = self.core.handle(CoreEvent::Enable(sensor));
                self.apply(effects);
            }
            Command::Disable(sensor) => {
                let effects = self.core.handle(CoreEvent::Disable(sensor));
                self.apply(effects);
            }
            Command::SetNotify(sensor, notify) => {
                self.listeners.insert(sensor, notify);
                let effects = self.core.handle(CoreEvent::ListenerRegistered(sensor));
                self.apply(effects);
            }
            Command::AttachEvdev(sensor, fd) => self.attach_evdev(sensor, fd),
            Command::NameOwnerChanged { name, new_owner } => {
                if name != self.config.hub.service_name {
                    return;
                }
                let effects = self.core.handle(CoreEvent::OwnerChanged(new_owner));
                self.apply(effects);
            }
            Command::Shutdown => {
                let effects = self.core.shutdown();
                self.apply(effects);
                self.owner_call = None;
                self.calls.clear();
                self.retries.clear();
                self.sockets.clear();
                self.evdev_readers.clear();
            }
        }
    }

    #[cfg(feature = "linux")]
    fn attach_evdev(&mut self, sensor: SensorId, fd: OwnedFd) {
        if !matches!(sensor, SensorId::Proximity | SensorId::AmbientLight) {
            warn!(%sensor, "no kernel event fallback for this sensor");
            return;
        }
        let token = self.next_token();
        let tx = self.tx.clone();
        let handle = tokio::spawn(crate::fallback::run_evdev_reader(sensor, fd, token, tx));
        debug!(%sensor, "kernel event fallback attached");
        self.evdev_readers.insert(sensor, Pending { token, handle });
        let effects = self.core.handle(CoreEvent::EvdevAttached(sensor));
        self.apply(effects);
    }

    #[cfg(not(feature = "linux"))]
    fn attach_evdev(&mut self, sensor: SensorId, _fd: OwnedFd) {
        warn!(%sensor, "kernel event fallback support not compiled in");
    }

    fn apply(&mut self, effects: Vec<CoreEffect>) {
        for effect in effects {
            match effect {
                CoreEffect::QueryNameOwner => self.spawn_owner_query(),
                CoreEffect::HubCall {
                    sensor,
                    layer,
                    call,
                    session_id,
                } => self.spawn_hub_call(sensor, layer, call, session_id),
                CoreEffect::CancelCall { sensor, layer } => {
                    self.calls.remove(&(sensor, layer));
                }
                CoreEffect::ArmRetry { sensor, layer } => self.arm_retry(sensor, layer),
                CoreEffect::CancelRetry { sensor, layer } => {
                    self.retries.remove(&(sensor, layer));
                }
                CoreEffect::OpenSocket { sensor, session_id } => {
                    self.open_socket(sensor, session_id);
                }
                CoreEffect::CloseSocket { sensor } => {
                    self.sockets.remove(&sensor);
                }
                CoreEffect::ArmWindow(duration) => {
                    let token = self.next_token();
                    let tx = self.tx.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(duration).await;
                        let _ = tx.send(BridgeEvent::WindowExpired { token });
                    });
                    self.window_timer = Some(Pending { token, handle });
                }
                CoreEffect::CancelWindow => {
                    self.window_timer = None;
                }
                CoreEffect::Notify { sensor, value } => {
                    if let Some(notify) = self.listeners.get(&sensor) {
                        trace!(%sensor, %value, "notify listener");
                        notify(value);
                    }
                }
            }
        }
    }

    fn spawn_owner_query(&mut self) {
        let token = self.next_token();
        let hub = Arc::clone(&self.hub);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let result = hub.query_name_owner().await;
            let _ = tx.send(BridgeEvent::OwnerReply { token, result });
        });
        self.owner_call = Some(Pending { token, handle });
    }

    fn spawn_hub_call(&mut self, sensor: SensorId, layer: Layer, call: HubCall, session_id: i32) {
        let backend = backend::backend(sensor);
        let token = self.next_token();
        let hub = Arc::clone(&self.hub);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let reply = match call {
                HubCall::LoadPlugin => HubReply::Load(hub.load_plugin(backend.name).await),
                HubCall::RequestSession => HubReply::Session(
                    hub.request_session(backend.name, std::process::id()).await,
                ),
                HubCall::SetStandbyOverride(enable) => HubReply::Override(
                    hub.set_standby_override(backend.object_path, session_id, enable)
                        .await,
                ),
                HubCall::Start => HubReply::Ack(hub.start(backend.object_path, session_id).await),
                HubCall::Stop => HubReply::Ack(hub.stop(backend.object_path, session_id).await),
                HubCall::ReadValue => {
                    let Some(method) = backend.value_method else {
                        warn!(sensor = backend.name, "no value method to read");
                        return;
                    };
                    HubReply::Value(hub.read_value(backend.object_path, method).await)
                }
            };
            let _ = tx.send(BridgeEvent::Reply {
                sensor,
                layer,
                token,
                reply,
            });
        });
        // At most one call per machine; a replaced entry aborts its task.
        self.calls.insert((sensor, layer), Pending { token, handle });
    }

    fn arm_retry(&mut self, sensor: SensorId, layer: Layer) {
        let token = self.next_token();
        let delay = self.config.timing.retry_delay();
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(BridgeEvent::Retry {
                sensor,
                layer,
                token,
            });
        });
        self.retries.insert((sensor, layer), Pending { token, handle });
    }

    fn open_socket(&mut self, sensor: SensorId, session_id: i32) {
        let token = self.next_token();
        let path = self.config.hub.socket_path.clone();
        let tx = self.tx.clone();
        let handle = tokio::spawn(crate::socket::run_data_socket(
            path, sensor, session_id, token, tx,
        ));
        self.sockets.insert(sensor, Pending { token, handle });
    }
}
