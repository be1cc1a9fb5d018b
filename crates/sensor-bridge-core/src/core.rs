//! The sensor core: service tracking, per-sensor stacks, cache and window.
//!
//! Pure like the machines it composes. The driver feeds it [`CoreEvent`]s
//! and executes the [`CoreEffect`]s it returns; everything here is
//! synchronous and unit-testable without a runtime.

use std::collections::BTreeMap;
use std::time::Duration;

use sensor_bridge_types::SensorId;

use crate::cache::{CacheEvent, NotifyCache};
use crate::config::BridgeConfig;
use crate::events::{CoreEffect, CoreEvent};
use crate::exception::ExceptionWindow;
use crate::machines::{Service, ServiceOp, ServiceState};
use crate::stack::{SensorStack, StackEffect, StackStatus};

/// Snapshot of the whole core's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStatus {
    pub service: ServiceState,
    pub sensors: BTreeMap<SensorId, StackStatus>,
}

pub struct Core {
    service: Service,
    stacks: BTreeMap<SensorId, SensorStack>,
    cache: NotifyCache,
    window: ExceptionWindow,
    started_window: Duration,
    stopped_window: Duration,
    test_mode: bool,
}

impl Core {
    pub fn new(config: &BridgeConfig) -> Self {
        let test_mode = config.sensor_test_mode;
        let stacks = SensorId::ALL
            .into_iter()
            .filter(|id| id.always_available() || test_mode)
            .map(|id| (id, SensorStack::new(id)))
            .collect();
        Self {
            service: Service::new(),
            stacks,
            cache: NotifyCache::new(),
            window: ExceptionWindow::new(),
            started_window: config.timing.hub_started_window(),
            stopped_window: config.timing.hub_stopped_window(),
            test_mode,
        }
    }

    pub fn status(&self) -> CoreStatus {
        CoreStatus {
            service: self.service.state(),
            sensors: self
                .stacks
                .iter()
                .map(|(id, stack)| (*id, stack.status()))
                .collect(),
        }
    }

    /// Kick off the initial hub availability query.
    pub fn start(&mut self) -> Vec<CoreEffect> {
        let ops = self.service.query();
        self.run_service(ops)
    }

    /// Tear everything down for daemon exit.
    pub fn shutdown(&mut self) -> Vec<CoreEffect> {
        self.window.cancel();
        let mut effects = vec![CoreEffect::CancelWindow];
        let ids: Vec<SensorId> = self.stacks.keys().copied().collect();
        for id in ids {
            let (stack_effects, session_id) = self.with_stack(id, SensorStack::reset);
            self.map_effects(id, session_id, stack_effects, &mut effects);
        }
        effects
    }

    pub fn handle(&mut self, event: CoreEvent) -> Vec<CoreEffect> {
        match event {
            CoreEvent::OwnerReply(reply) => {
                let ops = self.service.on_owner_reply(reply);
                self.run_service(ops)
            }
            CoreEvent::OwnerChanged(owner) => {
                let ops = self.service.on_owner_changed(owner);
                self.run_service(ops)
            }
            CoreEvent::Enable(sensor) => self.set_enabled(sensor, true),
            CoreEvent::Disable(sensor) => {
                if self.test_mode {
                    tracing::info!(%sensor, "sensor test mode, disable overridden");
                    self.set_enabled(sensor, true)
                } else {
                    self.set_enabled(sensor, false)
                }
            }
            CoreEvent::ListenerRegistered(sensor) => {
                self.apply_cache(sensor, CacheEvent::Repeat).into_iter().collect()
            }
            CoreEvent::EvdevAttached(sensor) => {
                self.cache.mark_kernel_source(sensor);
                Vec::new()
            }
            CoreEvent::EvdevSample(sample) => self
                .apply_cache(sample.sensor(), CacheEvent::Kernel(sample))
                .into_iter()
                .collect(),
            CoreEvent::Reply {
                sensor,
                layer,
                reply,
            } => self.dispatch(sensor, |stack| stack.on_reply(layer, reply)),
            CoreEvent::Socket { sensor, event } => {
                self.dispatch(sensor, |stack| stack.on_socket(event))
            }
            CoreEvent::RetryExpired { sensor, layer } => {
                self.dispatch(sensor, |stack| stack.on_retry(layer))
            }
            CoreEvent::WindowExpired => {
                self.window.expire();
                self.apply_cache(SensorId::Proximity, CacheEvent::Repeat)
                    .into_iter()
                    .collect()
            }
        }
    }

    fn set_enabled(&mut self, sensor: SensorId, enable: bool) -> Vec<CoreEffect> {
        if !self.stacks.contains_key(&sensor) {
            tracing::warn!(%sensor, "request for unmanaged sensor ignored");
            return Vec::new();
        }
        self.dispatch(sensor, |stack| stack.set_targets(enable))
    }

    fn dispatch<F>(&mut self, sensor: SensorId, f: F) -> Vec<CoreEffect>
    where
        F: FnOnce(&mut SensorStack) -> Vec<StackEffect>,
    {
        let Some(stack) = self.stacks.get_mut(&sensor) else {
            tracing::warn!(%sensor, "event for unmanaged sensor dropped");
            return Vec::new();
        };
        let stack_effects = f(stack);
        let session_id = stack.session_id();
        let mut effects = Vec::new();
        self.map_effects(sensor, session_id, stack_effects, &mut effects);
        effects
    }

    fn with_stack<F>(&mut self, sensor: SensorId, f: F) -> (Vec<StackEffect>, i32)
    where
        F: FnOnce(&mut SensorStack) -> Vec<StackEffect>,
    {
        let stack = self
            .stacks
            .get_mut(&sensor)
            .unwrap_or_else(|| unreachable!("stack for managed sensor"));
        let effects = f(stack);
        (effects, stack.session_id())
    }

    fn run_service(&mut self, ops: Vec<ServiceOp>) -> Vec<CoreEffect> {
        let mut effects = Vec::new();
        for op in ops {
            match op {
                ServiceOp::Query => effects.push(CoreEffect::QueryNameOwner),
                ServiceOp::HubStarted => {
                    self.start_window(self.started_window, &mut effects);
                    let ids: Vec<SensorId> = self.stacks.keys().copied().collect();
                    for id in ids {
                        let (stack_effects, session_id) = self.with_stack(id, SensorStack::load);
                        self.map_effects(id, session_id, stack_effects, &mut effects);
                    }
                }
                ServiceOp::HubStopped => {
                    self.start_window(self.stopped_window, &mut effects);
                    let ids: Vec<SensorId> = self.stacks.keys().copied().collect();
                    for id in ids {
                        let (stack_effects, session_id) = self.with_stack(id, SensorStack::reset);
                        self.map_effects(id, session_id, stack_effects, &mut effects);
                    }
                }
            }
        }
        effects
    }

    fn start_window(&mut self, duration: Duration, effects: &mut Vec<CoreEffect>) {
        self.window.start();
        effects.push(CoreEffect::ArmWindow(duration));
        // Re-deliver proximity so listeners see the forced covered state.
        effects.extend(self.apply_cache(SensorId::Proximity, CacheEvent::Repeat));
    }

    fn apply_cache(&mut self, sensor: SensorId, event: CacheEvent) -> Option<CoreEffect> {
        let value = self.cache.apply(sensor, event, self.window.is_active())?;
        Some(CoreEffect::Notify { sensor, value })
    }

    fn map_effects(
        &mut self,
        sensor: SensorId,
        session_id: i32,
        stack_effects: Vec<StackEffect>,
        out: &mut Vec<CoreEffect>,
    ) {
        for effect in stack_effects {
            match effect {
                StackEffect::Call { layer, call } => out.push(CoreEffect::HubCall {
                    sensor,
                    layer,
                    call,
                    session_id,
                }),
                StackEffect::CancelCall(layer) => {
                    out.push(CoreEffect::CancelCall { sensor, layer });
                }
                StackEffect::ArmRetry(layer) => out.push(CoreEffect::ArmRetry { sensor, layer }),
                StackEffect::CancelRetry(layer) => {
                    out.push(CoreEffect::CancelRetry { sensor, layer });
                }
                StackEffect::OpenSocket { session_id } => {
                    out.push(CoreEffect::OpenSocket { sensor, session_id });
                }
                StackEffect::CloseSocket => out.push(CoreEffect::CloseSocket { sensor }),
                StackEffect::Cache(event) => out.extend(self.apply_cache(sensor, event)),
            }
        }
    }
}
