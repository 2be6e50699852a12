//! Protocol state model
//!
//! One outer [`State`] whose dialog variants carry their own step, so a
//! dialog step can only exist inside its dialog.

/// Top-level bridge state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Transport not initialized yet
    #[default]
    Starting,
    /// Waiting for a command
    Idle,
    /// Send dialog in progress
    Send(SendStep),
    /// Receive dialog in progress
    Receive(ReceiveStep),
    /// Configuration dialog in progress
    Configuration(ConfigurationStep),
    /// Malformed input; recovers to `Idle` on the next handler run
    ParseFailure,
    /// Fatal transport or session error; ends in a device reset
    Error,
}

impl State {
    /// Name used in `STATUS` reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Idle => "IDLE",
            Self::Send(_) => "SEND",
            Self::Receive(_) => "RECEIVE",
            Self::Configuration(_) => "CONFIGURATION",
            Self::ParseFailure => "PARSE_FAILURE",
            Self::Error => "ERROR",
        }
    }
}

/// Send dialog position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendStep {
    /// Just entered; buffers get cleared and an address is requested
    #[default]
    None,
    /// Waiting for the `ADDRESS` line
    AwaitAddress,
    /// Waiting for the `DATA` line
    AwaitData,
    /// Handing the message to the transport
    Sending,
}

/// Receive dialog position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveStep {
    /// Just entered
    #[default]
    None,
    /// Reporting the sender address
    SendAddress,
    /// Reporting the payload
    SendData,
}

/// Configuration dialog position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigurationStep {
    /// Just entered
    #[default]
    None,
    /// Reporting the bridge status
    Status,
    /// Reporting the transport's own address
    OwnAddress,
    /// Reporting the broadcast address
    BroadcastAddress,
    /// Reporting the maximum payload size
    MaximumMessageLength,
    /// Reporting the serial line buffer capacity
    SerialBufferSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(State::default().name(), "STARTING");
        assert_eq!(State::Idle.name(), "IDLE");
        assert_eq!(State::Send(SendStep::AwaitData).name(), "SEND");
        assert_eq!(State::Receive(ReceiveStep::None).name(), "RECEIVE");
        assert_eq!(
            State::Configuration(ConfigurationStep::Status).name(),
            "CONFIGURATION"
        );
        assert_eq!(State::ParseFailure.name(), "PARSE_FAILURE");
        assert_eq!(State::Error.name(), "ERROR");
    }
}
