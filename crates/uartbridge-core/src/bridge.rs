//! Protocol state machine
//!
//! [`Bridge`] owns the session state: the top-level [`State`] with its dialog
//! steps, the serial line buffer and both message buffers. It is driven by a
//! cooperative loop that feeds serial bytes with [`Bridge::feed`] and calls
//! [`Bridge::tick`] once per iteration. Nothing blocks; a dialog waiting for
//! a host line simply does nothing until the line arrives.
//!
//! ## Evaluation order
//!
//! Every tick runs the following checks in order. Several of them can fire
//! in the same tick (dispatching `SEND` immediately prints
//! `OK AWAIT_ADDRESS`), but each dialog advances at most one step.
//!
//! 1. `RESET` line - restart, regardless of state
//! 2. not started - report `ERROR NOT_STARTED` once
//! 3. transport poll, line overflow
//! 4. command dispatch (only in `Idle`)
//! 5. send, receive and configuration dialog steps
//! 6. parse failure handler (recovers to `Idle`)
//! 7. error handler (ends in a restart)

use core::fmt::Write;

use crate::codec::{self, OutputLine};
use crate::error::{Error, Result};
use crate::line::{LineBuffer, SERIAL_BUFFER_SIZE};
use crate::message::{Address, OutboundMessage, ReceiveBuffer, MAX_ADDRESS_LEN};
use crate::parser::{self, keyword};
use crate::sink::LineSink;
use crate::state::{ConfigurationStep, ReceiveStep, SendStep, State};
use crate::transport::Transport;

/// Outcome of one [`Bridge::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep looping
    Ready,
    /// The device must restart now
    ///
    /// The session has already been cleared back to `Starting`; call
    /// [`Bridge::begin`] to restart in place, or reboot the chip.
    Reset,
    /// `tick` was called before a successful [`Bridge::begin`]
    NotStarted,
}

/// Serial line protocol bridge
///
/// Borrows the transport (which outlives the bridge) and owns the output
/// sink.
pub struct Bridge<'a, T: Transport + ?Sized, S: LineSink> {
    transport: &'a mut T,
    sink: S,
    state: State,
    line: LineBuffer,
    outbound: OutboundMessage,
    inbound: ReceiveBuffer,
    not_started_reported: bool,
}

impl<'a, T: Transport + ?Sized, S: LineSink> Bridge<'a, T, S> {
    /// Create a bridge in the `Starting` state
    pub fn new(transport: &'a mut T, sink: S) -> Self {
        Self {
            transport,
            sink,
            state: State::Starting,
            line: LineBuffer::new(),
            outbound: OutboundMessage::default(),
            inbound: ReceiveBuffer::new(),
            not_started_reported: false,
        }
    }

    /// Initialize the transport and enter `Idle`
    ///
    /// On failure the bridge enters `Error`, so the next [`tick`] reports
    /// `ERROR` and requests a restart.
    ///
    /// [`tick`]: Bridge::tick
    pub fn begin(&mut self) -> Result<()> {
        self.line.reset();
        self.not_started_reported = false;

        let width = self.transport.address_width();
        if width == 0 || width > MAX_ADDRESS_LEN {
            log::error!(
                "transport address width {} not supported (1..={})",
                width,
                MAX_ADDRESS_LEN
            );
            self.transition(State::Error);
            return Err(Error::AddressWidthMismatch);
        }
        self.outbound.clear(width);

        if let Err(e) = self.transport.initialize() {
            log::error!("transport initialization failed: {}", e);
            self.transition(State::Error);
            return Err(e);
        }
        log::info!("bridge started, {}-byte addresses", width);
        self.transition(State::Idle);
        Ok(())
    }

    /// Feed one byte from the serial input
    ///
    /// Returns `false` if the byte was refused because the previous line has
    /// not been consumed yet; the caller should hold on to it and retry
    /// after the next [`tick`](Bridge::tick).
    pub fn feed(&mut self, byte: u8) -> bool {
        self.line.feed(byte)
    }

    /// A complete line (or a line overflow) is waiting to be processed
    pub fn line_pending(&self) -> bool {
        self.line.is_pending()
    }

    /// The transport reported that its link is gone
    pub fn notify_disconnected(&mut self) {
        log::warn!("transport disconnected");
        self.transition(State::Error);
    }

    /// Current top-level state
    pub fn state(&self) -> State {
        self.state
    }

    /// Get a reference to the transport
    pub fn transport(&self) -> &T {
        &*self.transport
    }

    /// Get a reference to the output sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Get a mutable reference to the output sink
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the bridge and return the output sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run one scheduling step
    ///
    /// Only a failing output sink produces an `Err`; every protocol or
    /// transport problem is reported to the host instead.
    pub fn tick(&mut self) -> Result<Step> {
        if let Some(line) = self.line.line() {
            log::trace!(
                "-> {}",
                core::str::from_utf8(line).unwrap_or("<non-utf8 line>")
            );
            if parser::has_keyword(line, keyword::RESET) {
                self.line.reset();
                return self.restart();
            }
        }

        if self.state == State::Starting {
            if !self.not_started_reported {
                self.not_started_reported = true;
                self.emit("ERROR NOT_STARTED")?;
            }
            return Ok(Step::NotStarted);
        }

        if self.state != State::Error {
            if let Err(e) = self.transport.poll(&mut self.inbound) {
                log::warn!("transport poll failed: {}", e);
                self.transition(State::Error);
            }
        }

        if self.line.is_overflowed() && self.state != State::Error {
            self.transition(State::ParseFailure);
        }

        if self.state == State::Idle && self.line.is_ready() {
            // RESET never gets here, it is handled above
            let next = self.line.line().and_then(command);
            match next {
                Some(next) => {
                    self.line.reset();
                    self.transition(next);
                }
                None => self.transition(State::ParseFailure),
            }
        }

        if let State::Send(step) = self.state {
            self.step_send(step)?;
        }

        if let State::Receive(step) = self.state {
            self.step_receive(step)?;
        }

        if let State::Configuration(step) = self.state {
            self.step_configuration(step)?;
        }

        if self.state == State::ParseFailure {
            self.emit("FAILURE PARSE_FAILURE")?;
            self.line.reset();
            self.outbound.clear(self.transport.address_width());
            self.transition(State::Idle);
        }

        if self.state == State::Error {
            self.emit("ERROR")?;
            self.line.reset();
            return self.restart();
        }

        Ok(Step::Ready)
    }

    fn step_send(&mut self, step: SendStep) -> Result<()> {
        let width = self.transport.address_width();
        match step {
            SendStep::None => {
                self.outbound.clear(width);
                self.emit("OK AWAIT_ADDRESS")?;
                self.transition(State::Send(SendStep::AwaitAddress));
            }
            SendStep::AwaitAddress => {
                let Some(line) = self.line.line() else {
                    return Ok(());
                };
                match codec::parse_address(line, width) {
                    Ok(address) => {
                        self.outbound.destination = address;
                        self.line.reset();
                        self.emit("OK AWAIT_DATA")?;
                        self.transition(State::Send(SendStep::AwaitData));
                    }
                    Err(e) => {
                        log::debug!("bad address line: {}", e);
                        self.transition(State::ParseFailure);
                    }
                }
            }
            SendStep::AwaitData => {
                if !self.line.is_ready() {
                    return Ok(());
                }
                let limit = match self.transport.max_payload_size() {
                    Ok(limit) => limit,
                    Err(e) => {
                        log::error!("transport payload size query failed: {}", e);
                        self.transition(State::Error);
                        return Ok(());
                    }
                };
                let parsed = self.line.line().map(|line| codec::parse_data(line, limit));
                match parsed {
                    Some(Ok(payload)) => {
                        self.outbound.payload = payload;
                        self.line.reset();
                        self.emit("OK SENDING")?;
                        self.transition(State::Send(SendStep::Sending));
                    }
                    Some(Err(e)) => {
                        log::debug!("bad data line: {}", e);
                        self.transition(State::ParseFailure);
                    }
                    None => {}
                }
            }
            SendStep::Sending => {
                let result = self
                    .transport
                    .send(&self.outbound.destination, &self.outbound.payload);
                match result {
                    Ok(()) => {
                        log::debug!(
                            "sent {} bytes to {:?}",
                            self.outbound.payload.len(),
                            self.outbound.destination.as_bytes()
                        );
                        self.outbound.clear(width);
                        self.emit("OK IDLE")?;
                        self.transition(State::Idle);
                    }
                    Err(e) => {
                        log::error!("transport send failed: {}", e);
                        self.transition(State::Error);
                    }
                }
            }
        }
        Ok(())
    }

    fn step_receive(&mut self, step: ReceiveStep) -> Result<()> {
        match step {
            ReceiveStep::None => {
                self.emit("OK SEND_ADDRESS")?;
                self.transition(State::Receive(ReceiveStep::SendAddress));
            }
            ReceiveStep::SendAddress => {
                let mut out = OutputLine::new();
                let written = match self.inbound.peek() {
                    Some(msg) => codec::write_bytes(&mut out, keyword::ADDRESS, msg.source.as_bytes()),
                    None => {
                        let empty = Address::zeroed(self.transport.address_width());
                        codec::write_bytes(&mut out, keyword::ADDRESS, empty.as_bytes())
                    }
                };
                written.map_err(|_| Error::LineTooLong)?;
                self.emit(&out)?;
                self.emit("OK SEND_DATA")?;
                self.transition(State::Receive(ReceiveStep::SendData));
            }
            ReceiveStep::SendData => {
                let payload = self.inbound.peek().map(|msg| msg.payload.as_slice());
                let mut out = OutputLine::new();
                codec::write_bytes(&mut out, keyword::DATA, payload.unwrap_or(&[]))
                    .map_err(|_| Error::LineTooLong)?;
                self.emit(&out)?;
                self.emit("OK IDLE")?;
                self.inbound.clear();
                self.transition(State::Idle);
            }
        }
        Ok(())
    }

    fn step_configuration(&mut self, step: ConfigurationStep) -> Result<()> {
        let mut out = OutputLine::new();
        let (written, next, announce) = match step {
            ConfigurationStep::None => {
                self.emit("OK SEND_STATUS")?;
                self.transition(State::Configuration(ConfigurationStep::Status));
                return Ok(());
            }
            ConfigurationStep::Status => (
                // The dialog reports the state it hands control back to
                write!(out, "STATUS {}", State::Idle.name()),
                ConfigurationStep::OwnAddress,
                "OK SEND_OWN_ADDRESS",
            ),
            ConfigurationStep::OwnAddress => match self.transport.own_address() {
                Ok(address) => (
                    codec::write_address(&mut out, "OWN_ADDRESS", address.as_ref()),
                    ConfigurationStep::BroadcastAddress,
                    "OK SEND_BROADCAST_ADDRESS",
                ),
                Err(e) => return self.query_failed("own address", e),
            },
            ConfigurationStep::BroadcastAddress => match self.transport.broadcast_address() {
                Ok(address) => (
                    codec::write_address(&mut out, "BROADCAST_ADDRESS", address.as_ref()),
                    ConfigurationStep::MaximumMessageLength,
                    "OK SEND_MAXIMUM_MESSAGE_LENGTH",
                ),
                Err(e) => return self.query_failed("broadcast address", e),
            },
            ConfigurationStep::MaximumMessageLength => match self.transport.max_payload_size() {
                Ok(size) => (
                    write!(out, "MAXIMUM_MESSAGE_LENGTH {}", size),
                    ConfigurationStep::SerialBufferSize,
                    "OK SEND_SERIAL_BUFFER_SIZE",
                ),
                Err(e) => return self.query_failed("maximum payload size", e),
            },
            ConfigurationStep::SerialBufferSize => {
                write!(out, "SERIAL_BUFFER_SIZE {}", SERIAL_BUFFER_SIZE)
                    .map_err(|_| Error::LineTooLong)?;
                self.emit(&out)?;
                self.emit("OK IDLE")?;
                self.transition(State::Idle);
                return Ok(());
            }
        };
        written.map_err(|_| Error::LineTooLong)?;
        self.emit(&out)?;
        self.emit(announce)?;
        self.transition(State::Configuration(next));
        Ok(())
    }

    fn query_failed(&mut self, what: &str, e: Error) -> Result<()> {
        log::error!("transport {} query failed: {}", what, e);
        self.transition(State::Error);
        Ok(())
    }

    /// Acknowledge the reset and clear the session back to `Starting`
    fn restart(&mut self) -> Result<Step> {
        log::info!("restarting from state {}", self.state.name());
        self.emit("OK RESET")?;
        self.line.reset();
        self.outbound = OutboundMessage::default();
        self.inbound.clear();
        self.state = State::Starting;
        self.not_started_reported = false;
        Ok(Step::Reset)
    }

    fn transition(&mut self, next: State) {
        if self.state != next {
            log::debug!("state {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    fn emit(&mut self, line: &str) -> Result<()> {
        log::trace!("<- {}", line);
        self.sink.write_line(line)
    }
}

/// Map an idle command line to the dialog it starts
fn command(line: &[u8]) -> Option<State> {
    if parser::has_keyword(line, keyword::SEND) {
        Some(State::Send(SendStep::None))
    } else if parser::has_keyword(line, keyword::RECEIVE) {
        Some(State::Receive(ReceiveStep::None))
    } else if parser::has_keyword(line, keyword::CONFIGURATION) {
        Some(State::Configuration(ConfigurationStep::None))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::sink::IoSink;
    use std::string::String;
    use std::vec;
    use std::vec::Vec;

    /// Scripted transport with 4-byte addresses
    struct FakeTransport {
        own: Option<Address>,
        broadcast: Option<Address>,
        max_payload: usize,
        fail_init: bool,
        fail_send: bool,
        fail_poll: bool,
        fail_query: bool,
        incoming: Vec<(Address, Vec<u8>)>,
        sent: Vec<(Address, Vec<u8>)>,
    }

    impl Default for FakeTransport {
        fn default() -> Self {
            Self {
                own: Address::from_slice(&[10, 0, 0, 1]),
                broadcast: Address::from_slice(&[255, 255, 255, 255]),
                max_payload: 64,
                fail_init: false,
                fail_send: false,
                fail_poll: false,
                fail_query: false,
                incoming: Vec::new(),
                sent: Vec::new(),
            }
        }
    }

    impl Transport for FakeTransport {
        fn initialize(&mut self) -> Result<()> {
            if self.fail_init {
                return Err(Error::TransportInitFailed);
            }
            Ok(())
        }

        fn poll(&mut self, inbox: &mut ReceiveBuffer) -> Result<()> {
            if self.fail_poll {
                return Err(Error::TransportDisconnected);
            }
            for (source, bytes) in self.incoming.drain(..) {
                inbox.offer(&source, &bytes);
            }
            Ok(())
        }

        fn send(&mut self, destination: &Address, payload: &[u8]) -> Result<()> {
            if self.fail_send {
                return Err(Error::SendFailed);
            }
            self.sent.push((destination.clone(), payload.to_vec()));
            Ok(())
        }

        fn address_width(&self) -> usize {
            4
        }

        fn own_address(&self) -> Result<Option<Address>> {
            if self.fail_query {
                return Err(Error::QueryFailed);
            }
            Ok(self.own.clone())
        }

        fn broadcast_address(&self) -> Result<Option<Address>> {
            Ok(self.broadcast.clone())
        }

        fn max_payload_size(&self) -> Result<usize> {
            Ok(self.max_payload)
        }
    }

    type TestBridge<'a> = Bridge<'a, FakeTransport, IoSink<Vec<u8>>>;

    fn started(transport: &mut FakeTransport) -> TestBridge<'_> {
        let mut bridge = Bridge::new(transport, IoSink::new(Vec::new()));
        bridge.begin().unwrap();
        bridge
    }

    fn send_line(bridge: &mut TestBridge<'_>, line: &str) -> Step {
        for &b in line.as_bytes() {
            assert!(bridge.feed(b), "byte refused while feeding {:?}", line);
        }
        bridge.tick().unwrap()
    }

    fn take_output(bridge: &mut TestBridge<'_>) -> String {
        let bytes: Vec<u8> = bridge.sink_mut().get_mut().drain(..).collect();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_send_dialog() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        assert_eq!(send_line(&mut bridge, "SEND\n"), Step::Ready);
        assert_eq!(take_output(&mut bridge), "OK AWAIT_ADDRESS\n");

        send_line(&mut bridge, "ADDRESS 1 2 3 4\n");
        assert_eq!(take_output(&mut bridge), "OK AWAIT_DATA\n");

        send_line(&mut bridge, "DATA 10 20\n");
        assert_eq!(take_output(&mut bridge), "OK SENDING\n");

        assert_eq!(bridge.tick().unwrap(), Step::Ready);
        assert_eq!(take_output(&mut bridge), "OK IDLE\n");
        assert_eq!(bridge.state(), State::Idle);

        let sent = &bridge.transport().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(sent[0].1, vec![10, 20]);
    }

    #[test]
    fn test_send_empty_data() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "SEND\n");
        send_line(&mut bridge, "ADDRESS 9 9 9 9\n");
        send_line(&mut bridge, "DATA\n");
        bridge.tick().unwrap();
        assert_eq!(
            take_output(&mut bridge),
            "OK AWAIT_ADDRESS\nOK AWAIT_DATA\nOK SENDING\nOK IDLE\n"
        );
        assert!(bridge.transport().sent[0].1.is_empty());
    }

    #[test]
    fn test_send_failure_is_fatal() {
        let mut transport = FakeTransport {
            fail_send: true,
            ..Default::default()
        };
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "SEND\n");
        send_line(&mut bridge, "ADDRESS 1 2 3 4\n");
        send_line(&mut bridge, "DATA 1\n");
        take_output(&mut bridge);

        assert_eq!(bridge.tick().unwrap(), Step::Reset);
        assert_eq!(take_output(&mut bridge), "ERROR\nOK RESET\n");
        assert_eq!(bridge.state(), State::Starting);
    }

    #[test]
    fn test_bad_address_recovers() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "SEND\n");
        take_output(&mut bridge);

        send_line(&mut bridge, "ADDRESS 1 2 3\n");
        assert_eq!(take_output(&mut bridge), "FAILURE PARSE_FAILURE\n");
        assert_eq!(bridge.state(), State::Idle);
        assert!(!bridge.line_pending());

        send_line(&mut bridge, "SEND\n");
        assert_eq!(take_output(&mut bridge), "OK AWAIT_ADDRESS\n");
    }

    #[test]
    fn test_data_over_transport_limit() {
        let mut transport = FakeTransport {
            max_payload: 3,
            ..Default::default()
        };
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "SEND\n");
        send_line(&mut bridge, "ADDRESS 1 2 3 4\n");
        take_output(&mut bridge);

        send_line(&mut bridge, "DATA 1 2 3 4\n");
        assert_eq!(take_output(&mut bridge), "FAILURE PARSE_FAILURE\n");
        assert!(bridge.transport().sent.is_empty());
    }

    #[test]
    fn test_unknown_command() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "send\n");
        assert_eq!(take_output(&mut bridge), "FAILURE PARSE_FAILURE\n");
        send_line(&mut bridge, "\n");
        assert_eq!(take_output(&mut bridge), "FAILURE PARSE_FAILURE\n");
        assert_eq!(bridge.state(), State::Idle);
    }

    #[test]
    fn test_receive_empty_buffer() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "RECEIVE\n");
        bridge.tick().unwrap();
        bridge.tick().unwrap();
        assert_eq!(
            take_output(&mut bridge),
            "OK SEND_ADDRESS\nADDRESS 0 0 0 0\nOK SEND_DATA\nDATA\nOK IDLE\n"
        );
    }

    #[test]
    fn test_receive_reports_and_clears() {
        let source = Address::from_slice(&[10, 0, 0, 2]).unwrap();
        let mut transport = FakeTransport {
            incoming: vec![(source, vec![3, 42, 43])],
            ..Default::default()
        };
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "RECEIVE\n");
        bridge.tick().unwrap();
        bridge.tick().unwrap();
        assert_eq!(
            take_output(&mut bridge),
            "OK SEND_ADDRESS\nADDRESS 10 0 0 2\nOK SEND_DATA\nDATA 3 42 43\nOK IDLE\n"
        );

        send_line(&mut bridge, "RECEIVE\n");
        bridge.tick().unwrap();
        bridge.tick().unwrap();
        assert!(take_output(&mut bridge).contains("ADDRESS 0 0 0 0\n"));
    }

    #[test]
    fn test_receive_drops_bad_self_length() {
        let source = Address::from_slice(&[10, 0, 0, 2]).unwrap();
        let mut transport = FakeTransport {
            incoming: vec![(source, vec![7, 1, 2])],
            ..Default::default()
        };
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "RECEIVE\n");
        bridge.tick().unwrap();
        bridge.tick().unwrap();
        let out = take_output(&mut bridge);
        assert!(out.contains("ADDRESS 0 0 0 0\n"));
        assert!(out.contains("DATA\n"));
    }

    #[test]
    fn test_configuration_dialog() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "CONFIGURATION\n");
        for _ in 0..5 {
            assert_eq!(bridge.tick().unwrap(), Step::Ready);
        }
        assert_eq!(
            take_output(&mut bridge),
            "OK SEND_STATUS\n\
             STATUS IDLE\n\
             OK SEND_OWN_ADDRESS\n\
             OWN_ADDRESS 10 0 0 1\n\
             OK SEND_BROADCAST_ADDRESS\n\
             BROADCAST_ADDRESS 255 255 255 255\n\
             OK SEND_MAXIMUM_MESSAGE_LENGTH\n\
             MAXIMUM_MESSAGE_LENGTH 64\n\
             OK SEND_SERIAL_BUFFER_SIZE\n\
             SERIAL_BUFFER_SIZE 300\n\
             OK IDLE\n"
        );
        assert_eq!(bridge.state(), State::Idle);
    }

    #[test]
    fn test_configuration_without_addresses() {
        let mut transport = FakeTransport {
            own: None,
            broadcast: None,
            ..Default::default()
        };
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "CONFIGURATION\n");
        for _ in 0..5 {
            bridge.tick().unwrap();
        }
        let out = take_output(&mut bridge);
        assert!(out.contains("OWN_ADDRESS N/A\n"));
        assert!(out.contains("BROADCAST_ADDRESS N/A\n"));
    }

    #[test]
    fn test_configuration_query_failure() {
        let mut transport = FakeTransport {
            fail_query: true,
            ..Default::default()
        };
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "CONFIGURATION\n");
        bridge.tick().unwrap();
        assert_eq!(bridge.tick().unwrap(), Step::Reset);
        assert_eq!(
            take_output(&mut bridge),
            "OK SEND_STATUS\nSTATUS IDLE\nOK SEND_OWN_ADDRESS\nERROR\nOK RESET\n"
        );
    }

    #[test]
    fn test_reset_interrupts_every_dialog() {
        // (host lines, extra ticks, state RESET arrives in)
        let cases: [(&[&str], usize, State); 8] = [
            (&["SEND\n"], 0, State::Send(SendStep::AwaitAddress)),
            (
                &["SEND\n", "ADDRESS 1 2 3 4\n"],
                0,
                State::Send(SendStep::AwaitData),
            ),
            (
                &["SEND\n", "ADDRESS 1 2 3 4\n", "DATA 1\n"],
                0,
                State::Send(SendStep::Sending),
            ),
            (&["RECEIVE\n"], 0, State::Receive(ReceiveStep::SendAddress)),
            (&["RECEIVE\n"], 1, State::Receive(ReceiveStep::SendData)),
            (
                &["CONFIGURATION\n"],
                0,
                State::Configuration(ConfigurationStep::Status),
            ),
            (
                &["CONFIGURATION\n"],
                2,
                State::Configuration(ConfigurationStep::BroadcastAddress),
            ),
            (
                &["CONFIGURATION\n"],
                4,
                State::Configuration(ConfigurationStep::SerialBufferSize),
            ),
        ];
        for (lines, ticks, expected) in cases {
            let mut transport = FakeTransport::default();
            let mut bridge = started(&mut transport);
            for line in lines {
                send_line(&mut bridge, line);
            }
            for _ in 0..ticks {
                bridge.tick().unwrap();
            }
            assert_eq!(bridge.state(), expected);
            take_output(&mut bridge);

            assert_eq!(send_line(&mut bridge, "RESET\n"), Step::Reset);
            assert_eq!(take_output(&mut bridge), "OK RESET\n");
            assert_eq!(bridge.state(), State::Starting);
            assert!(bridge.transport().sent.is_empty());
        }
    }

    #[test]
    fn test_restart_in_place() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        assert_eq!(send_line(&mut bridge, "RESET\n"), Step::Reset);
        bridge.begin().unwrap();
        take_output(&mut bridge);

        send_line(&mut bridge, "SEND\n");
        assert_eq!(take_output(&mut bridge), "OK AWAIT_ADDRESS\n");
    }

    #[test]
    fn test_line_overflow() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        for _ in 0..SERIAL_BUFFER_SIZE {
            bridge.feed(b'A');
        }
        assert!(bridge.line_pending());
        assert!(!bridge.feed(b'\n'));

        assert_eq!(bridge.tick().unwrap(), Step::Ready);
        assert_eq!(take_output(&mut bridge), "FAILURE PARSE_FAILURE\n");
        assert_eq!(bridge.state(), State::Idle);
        assert!(!bridge.line_pending());
    }

    #[test]
    fn test_overflow_tail_is_discarded() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        for _ in 0..SERIAL_BUFFER_SIZE {
            bridge.feed(b'X');
        }
        bridge.tick().unwrap();
        for &b in b"SEND\n" {
            assert!(bridge.feed(b));
        }
        bridge.tick().unwrap();
        bridge.tick().unwrap();
        assert_eq!(take_output(&mut bridge), "FAILURE PARSE_FAILURE\n");
        assert_eq!(bridge.state(), State::Idle);

        send_line(&mut bridge, "SEND\n");
        assert_eq!(take_output(&mut bridge), "OK AWAIT_ADDRESS\n");
    }

    #[test]
    fn test_not_started_reported_once() {
        let mut transport = FakeTransport::default();
        let mut bridge = Bridge::new(&mut transport, IoSink::new(Vec::new()));

        assert_eq!(bridge.tick().unwrap(), Step::NotStarted);
        assert_eq!(bridge.tick().unwrap(), Step::NotStarted);
        assert_eq!(take_output(&mut bridge), "ERROR NOT_STARTED\n");
        assert_eq!(bridge.state(), State::Starting);
    }

    #[test]
    fn test_init_failure() {
        let mut transport = FakeTransport {
            fail_init: true,
            ..Default::default()
        };
        let mut bridge = Bridge::new(&mut transport, IoSink::new(Vec::new()));

        assert_eq!(bridge.begin(), Err(Error::TransportInitFailed));
        assert_eq!(bridge.state(), State::Error);
        assert_eq!(bridge.tick().unwrap(), Step::Reset);
        assert_eq!(take_output(&mut bridge), "ERROR\nOK RESET\n");
    }

    #[test]
    fn test_poll_failure_is_fatal() {
        let mut transport = FakeTransport {
            fail_poll: true,
            ..Default::default()
        };
        let mut bridge = started(&mut transport);

        assert_eq!(bridge.tick().unwrap(), Step::Reset);
        assert_eq!(take_output(&mut bridge), "ERROR\nOK RESET\n");
    }

    #[test]
    fn test_disconnect_notification() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "SEND\n");
        take_output(&mut bridge);
        bridge.notify_disconnected();
        assert_eq!(bridge.tick().unwrap(), Step::Reset);
        assert_eq!(take_output(&mut bridge), "ERROR\nOK RESET\n");
    }

    #[test]
    fn test_line_waits_during_automatic_dialog() {
        let mut transport = FakeTransport::default();
        let mut bridge = started(&mut transport);

        send_line(&mut bridge, "RECEIVE\n");
        // Queued while the receive dialog is still reporting
        send_line(&mut bridge, "SEND\n");
        bridge.tick().unwrap();
        assert_eq!(
            take_output(&mut bridge),
            "OK SEND_ADDRESS\nADDRESS 0 0 0 0\nOK SEND_DATA\nDATA\nOK IDLE\n"
        );

        bridge.tick().unwrap();
        assert_eq!(take_output(&mut bridge), "OK AWAIT_ADDRESS\n");
    }
}
