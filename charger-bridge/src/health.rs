//! Per-charger connection health.
//!
//! Tracks whether the last poll of a charger succeeded, failed because
//! the device is unplugged, or failed mid-transfer. The state topic is
//! published exactly once per transition; repeating the same observation
//! is silent. The first observation after startup always counts as a
//! transition so subscribers get an initial retained state.

use crate::controller::ControllerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    NoConnection,
    CommunicationError,
}

impl LinkState {
    /// Wire value for the `chargers/{id}/state` topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Connected => "connected",
            LinkState::NoConnection => "no_connection",
            LinkState::CommunicationError => "communication_error",
        }
    }
}

impl From<&ControllerError> for LinkState {
    fn from(err: &ControllerError) -> Self {
        match err {
            ControllerError::NotConnected => LinkState::NoConnection,
            ControllerError::Communication(_) => LinkState::CommunicationError,
        }
    }
}

#[derive(Debug, Default)]
pub struct LinkStateTracker {
    state: Option<LinkState>,
}

impl LinkStateTracker {
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Records an observation. Returns `Some(next)` when it differs from
    /// the current state (caller publishes), `None` on repeats.
    pub fn observe(&mut self, next: LinkState) -> Option<LinkState> {
        if self.state == Some(next) {
            return None;
        }
        self.state = Some(next);
        Some(next)
    }

    pub fn state(&self) -> Option<LinkState> {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_transitions() {
        let mut t = LinkStateTracker::new();
        assert_eq!(t.observe(LinkState::Connected), Some(LinkState::Connected));
    }

    #[test]
    fn repeats_are_silent() {
        let mut t = LinkStateTracker::new();
        t.observe(LinkState::Connected);
        assert_eq!(t.observe(LinkState::Connected), None);
    }

    #[test]
    fn ok_ok_fail_fail_ok_publishes_three_times() {
        let mut t = LinkStateTracker::new();
        let seq = [
            LinkState::Connected,
            LinkState::Connected,
            LinkState::NoConnection,
            LinkState::NoConnection,
            LinkState::Connected,
        ];
        let published = seq.iter().filter(|s| t.observe(**s).is_some()).count();
        assert_eq!(published, 3);
    }

    #[test]
    fn error_kinds_map_to_states() {
        assert_eq!(
            LinkState::from(&ControllerError::NotConnected),
            LinkState::NoConnection
        );
        assert_eq!(
            LinkState::from(&ControllerError::Communication("stall".into())),
            LinkState::CommunicationError
        );
    }

    #[test]
    fn wire_strings_match_the_topic_contract() {
        assert_eq!(LinkState::Connected.as_str(), "connected");
        assert_eq!(LinkState::NoConnection.as_str(), "no_connection");
        assert_eq!(LinkState::CommunicationError.as_str(), "communication_error");
    }
}
