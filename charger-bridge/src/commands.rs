//! Inbound command parsing and routing.
//!
//! Commands arrive as JSON on either an addressed topic
//! (`chargers/{n}/channels/{m}`) or the deferred topic (`chargers/next`).
//! Payloads use an internally tagged `command` field, matching what the
//! dashboard publishes.

use serde::Deserialize;

use crate::controller::ChargeMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "command")]
pub enum CommandPayload {
    #[serde(rename = "stop")]
    Stop,
    #[serde(rename = "charge")]
    Charge { cell_count: u8, current_ma: u32 },
    #[serde(rename = "storage")]
    Storage { cell_count: u8, current_ma: u32 },
}

impl CommandPayload {
    /// Splits a start command into its charge program, if it is one.
    pub fn charge_program(&self) -> Option<(ChargeMode, u8, u32)> {
        match *self {
            CommandPayload::Stop => None,
            CommandPayload::Charge {
                cell_count,
                current_ma,
            } => Some((ChargeMode::Charge, cell_count, current_ma)),
            CommandPayload::Storage {
                cell_count,
                current_ma,
            } => Some((ChargeMode::Storage, cell_count, current_ma)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTarget {
    /// Explicit charger + channel from the topic path.
    Addressed { charger: usize, channel: usize },
    /// "Whichever channel connects next", resolved by the scheduler.
    NextAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeCommand {
    pub target: CommandTarget,
    pub payload: CommandPayload,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandParseError {
    #[error("topic {0:?} is not a command topic")]
    UnknownTopic(String),
    #[error("invalid command payload: {0}")]
    BadPayload(#[from] serde_json::Error),
}

/// Maps a subscribed topic to its command target. Addressed topics carry
/// the charger number at position 1 and the channel number at position 3.
pub fn parse_topic(topic: &str) -> Option<CommandTarget> {
    if topic == "chargers/next" {
        return Some(CommandTarget::NextAvailable);
    }
    let parts: Vec<&str> = topic.split('/').collect();
    match parts.as_slice() {
        ["chargers", charger, "channels", channel] => Some(CommandTarget::Addressed {
            charger: charger.parse().ok()?,
            channel: channel.parse().ok()?,
        }),
        _ => None,
    }
}

pub fn parse_message(topic: &str, payload: &[u8]) -> Result<BridgeCommand, CommandParseError> {
    let target =
        parse_topic(topic).ok_or_else(|| CommandParseError::UnknownTopic(topic.to_string()))?;
    let payload: CommandPayload = serde_json::from_slice(payload)?;
    Ok(BridgeCommand { target, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressed_topic_parses_positions_1_and_3() {
        assert_eq!(
            parse_topic("chargers/0/channels/2"),
            Some(CommandTarget::Addressed {
                charger: 0,
                channel: 2
            })
        );
    }

    #[test]
    fn next_topic_parses_as_deferred() {
        assert_eq!(parse_topic("chargers/next"), Some(CommandTarget::NextAvailable));
    }

    #[test]
    fn telemetry_topics_are_not_command_topics() {
        assert_eq!(parse_topic("chargers/0/channels/2/voltage"), None);
        assert_eq!(parse_topic("chargers/0/state"), None);
        assert_eq!(parse_topic("chargers/x/channels/2"), None);
    }

    #[test]
    fn charge_payload_parses() {
        let cmd = parse_message(
            "chargers/0/channels/2",
            br#"{"command":"charge","cell_count":4,"current_ma":2000}"#,
        )
        .unwrap();
        assert_eq!(
            cmd.payload,
            CommandPayload::Charge {
                cell_count: 4,
                current_ma: 2000
            }
        );
    }

    #[test]
    fn stop_needs_no_other_fields() {
        let cmd = parse_message("chargers/1/channels/0", br#"{"command":"stop"}"#).unwrap();
        assert_eq!(cmd.payload, CommandPayload::Stop);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = parse_message("chargers/0/channels/0", br#"{"command":"charge","cell_count":4}"#);
        assert!(matches!(err, Err(CommandParseError::BadPayload(_))));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = parse_message("chargers/next", b"not json");
        assert!(matches!(err, Err(CommandParseError::BadPayload(_))));
    }

    #[test]
    fn storage_maps_to_its_charge_program() {
        let payload = CommandPayload::Storage {
            cell_count: 3,
            current_ma: 1000,
        };
        assert_eq!(payload.charge_program(), Some((ChargeMode::Storage, 3, 1000)));
        assert_eq!(CommandPayload::Stop.charge_program(), None);
    }
}
