//! Scripted mock hub for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::HubError;
use crate::{HubClient, RawReading};

/// A call the mock hub received, recorded for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    QueryNameOwner,
    LoadPlugin(String),
    RequestSession(String, u32),
    SetStandbyOverride(String, i32, bool),
    Start(String, i32),
    Stop(String, i32),
    ReadValue(String, String),
}

#[derive(Debug, Default)]
struct MockHubState {
    owner: Option<String>,
    load_results: HashMap<String, VecDeque<Result<bool, HubError>>>,
    session_results: HashMap<String, VecDeque<Result<i32, HubError>>>,
    override_results: VecDeque<Result<bool, HubError>>,
    start_results: VecDeque<Result<(), HubError>>,
    stop_results: VecDeque<Result<(), HubError>>,
    readings: HashMap<String, RawReading>,
    next_session_id: i32,
    calls: Vec<MockCall>,
}

/// Scripted [`HubClient`] backend.
///
/// Unscripted calls succeed with permissive defaults: plugins load, sessions
/// are granted incrementing ids, overrides are accepted, start/stop ack.
/// Read-value replies must be scripted per object path.
pub struct MockHub {
    state: Arc<Mutex<MockHubState>>,
}

impl Default for MockHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHub {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockHubState {
                next_session_id: 1,
                ..MockHubState::default()
            })),
        }
    }

    /// Get a clonable handle for scripting replies and observing calls.
    pub fn handle(&self) -> MockHubHandle {
        MockHubHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable scripting/observer handle for [`MockHub`].
#[derive(Clone)]
pub struct MockHubHandle {
    state: Arc<Mutex<MockHubState>>,
}

impl MockHubHandle {
    pub fn set_owner(&self, owner: Option<&str>) {
        self.state.lock().unwrap().owner = owner.map(str::to_string);
    }

    pub fn push_load_result(&self, sensor: &str, result: Result<bool, HubError>) {
        self.state
            .lock()
            .unwrap()
            .load_results
            .entry(sensor.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn push_session_result(&self, sensor: &str, result: Result<i32, HubError>) {
        self.state
            .lock()
            .unwrap()
            .session_results
            .entry(sensor.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn push_override_result(&self, result: Result<bool, HubError>) {
        self.state.lock().unwrap().override_results.push_back(result);
    }

    pub fn push_start_result(&self, result: Result<(), HubError>) {
        self.state.lock().unwrap().start_results.push_back(result);
    }

    pub fn push_stop_result(&self, result: Result<(), HubError>) {
        self.state.lock().unwrap().stop_results.push_back(result);
    }

    pub fn set_reading(&self, object: &str, reading: RawReading) {
        self.state
            .lock()
            .unwrap()
            .readings
            .insert(object.to_string(), reading);
    }

    /// Snapshot of every call the mock received so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl HubClient for MockHub {
    async fn query_name_owner(&self) -> Result<Option<String>, HubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::QueryNameOwner);
        Ok(state.owner.clone())
    }

    async fn load_plugin(&self, sensor: &str) -> Result<bool, HubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::LoadPlugin(sensor.to_string()));
        state
            .load_results
            .get_mut(sensor)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(true))
    }

    async fn request_session(&self, sensor: &str, pid: u32) -> Result<i32, HubError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(MockCall::RequestSession(sensor.to_string(), pid));
        if let Some(result) = state
            .session_results
            .get_mut(sensor)
            .and_then(VecDeque::pop_front)
        {
            return result;
        }
        let id = state.next_session_id;
        state.next_session_id += 1;
        Ok(id)
    }

    async fn set_standby_override(
        &self,
        object: &str,
        session_id: i32,
        enable: bool,
    ) -> Result<bool, HubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::SetStandbyOverride(
            object.to_string(),
            session_id,
            enable,
        ));
        state
            .override_results
            .pop_front()
            .unwrap_or(Ok(true))
    }

    async fn start(&self, object: &str, session_id: i32) -> Result<(), HubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Start(object.to_string(), session_id));
        state.start_results.pop_front().unwrap_or(Ok(()))
    }

    async fn stop(&self, object: &str, session_id: i32) -> Result<(), HubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Stop(object.to_string(), session_id));
        state.stop_results.pop_front().unwrap_or(Ok(()))
    }

    async fn read_value(&self, object: &str, method: &str) -> Result<RawReading, HubError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(MockCall::ReadValue(object.to_string(), method.to_string()));
        state
            .readings
            .get(object)
            .cloned()
            .ok_or_else(|| HubError::NoReply(format!("no scripted reading for {object}")))
    }
}
