//! Hub service availability tracking.
//!
//! Watches whether the hub's bus name has an owner. Every transition into
//! RUNNING or STOPPED fans out to all sensor stacks and arms the proximity
//! exception window.

use sensor_bridge_hub::HubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Not yet queried.
    Unknown,
    /// Name-owner query in flight.
    Querying,
    /// The hub owns its bus name.
    Running,
    /// Nobody owns the hub's bus name.
    Stopped,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ServiceState::Unknown => "UNKNOWN",
            ServiceState::Querying => "QUERYING",
            ServiceState::Running => "RUNNING",
            ServiceState::Stopped => "STOPPED",
        })
    }
}

/// What the service machine asks of the core.
#[derive(Debug, PartialEq, Eq)]
pub enum ServiceOp {
    /// Issue the name-owner query.
    Query,
    /// The hub came up: arm the short exception window, load every stack.
    HubStarted,
    /// The hub went away: arm the long exception window, reset every stack.
    HubStopped,
}

#[derive(Debug)]
pub struct Service {
    state: ServiceState,
}

impl Default for Service {
    fn default() -> Self {
        Self::new()
    }
}

impl Service {
    pub fn new() -> Self {
        Self {
            state: ServiceState::Unknown,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Kick off the initial availability query.
    pub fn query(&mut self) -> Vec<ServiceOp> {
        if self.state != ServiceState::Unknown {
            return Vec::new();
        }
        self.state = ServiceState::Querying;
        vec![ServiceOp::Query]
    }

    pub fn on_owner_reply(&mut self, reply: Result<Option<String>, HubError>) -> Vec<ServiceOp> {
        if self.state != ServiceState::Querying {
            return Vec::new();
        }
        match reply {
            Ok(Some(owner)) => {
                tracing::info!(%owner, "sensor hub is running");
                self.state = ServiceState::Running;
                vec![ServiceOp::HubStarted]
            }
            Ok(None) => {
                tracing::info!("sensor hub is not running");
                self.state = ServiceState::Stopped;
                vec![ServiceOp::HubStopped]
            }
            Err(err) => {
                // Stay in QUERYING; an ownership signal will still move us.
                tracing::warn!(%err, "name owner query failed");
                Vec::new()
            }
        }
    }

    pub fn on_owner_changed(&mut self, new_owner: Option<String>) -> Vec<ServiceOp> {
        match new_owner {
            Some(owner) if self.state != ServiceState::Running => {
                tracing::info!(%owner, "sensor hub started");
                self.state = ServiceState::Running;
                vec![ServiceOp::HubStarted]
            }
            None if self.state != ServiceState::Stopped => {
                tracing::info!("sensor hub stopped");
                self.state = ServiceState::Stopped;
                vec![ServiceOp::HubStopped]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_then_owner_found() {
        let mut service = Service::new();
        assert_eq!(service.query(), vec![ServiceOp::Query]);
        assert_eq!(service.state(), ServiceState::Querying);

        let ops = service.on_owner_reply(Ok(Some(":1.42".into())));
        assert_eq!(ops, vec![ServiceOp::HubStarted]);
        assert_eq!(service.state(), ServiceState::Running);
    }

    #[test]
    fn query_then_no_owner() {
        let mut service = Service::new();
        service.query();
        let ops = service.on_owner_reply(Ok(None));
        assert_eq!(ops, vec![ServiceOp::HubStopped]);
        assert_eq!(service.state(), ServiceState::Stopped);
    }

    #[test]
    fn query_failure_waits_for_signal() {
        let mut service = Service::new();
        service.query();
        let ops = service.on_owner_reply(Err(HubError::NoReply("timeout".into())));
        assert!(ops.is_empty());
        assert_eq!(service.state(), ServiceState::Querying);

        let ops = service.on_owner_changed(Some(":1.9".into()));
        assert_eq!(ops, vec![ServiceOp::HubStarted]);
    }

    #[test]
    fn repeated_owner_signal_is_ignored() {
        let mut service = Service::new();
        service.query();
        service.on_owner_reply(Ok(Some(":1.1".into())));
        assert!(service.on_owner_changed(Some(":1.1".into())).is_empty());
    }

    #[test]
    fn restart_cycles_states() {
        let mut service = Service::new();
        service.query();
        service.on_owner_reply(Ok(Some(":1.1".into())));
        assert_eq!(
            service.on_owner_changed(None),
            vec![ServiceOp::HubStopped]
        );
        assert_eq!(
            service.on_owner_changed(Some(":1.2".into())),
            vec![ServiceOp::HubStarted]
        );
    }

    #[test]
    fn query_only_from_unknown() {
        let mut service = Service::new();
        service.query();
        assert!(service.query().is_empty());
    }
}
