//! uartbridge-loopback - In-memory transport emulator
//!
//! This crate provides a transport that behaves like a radio with nobody
//! else on the air: messages addressed to its own address or to the
//! broadcast address come straight back on the next poll. Test code can
//! also inject arbitrary inbound frames and force failures. It's useful for
//! testing and development without real hardware.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::collections::VecDeque;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use uartbridge_core::error::{Error, Result};
use uartbridge_core::message::{Address, ReceiveBuffer, PAYLOAD_CAPACITY};
use uartbridge_core::transport::Transport;

/// Configuration for the loopback transport
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Address width in bytes
    pub address_width: usize,
    /// Own address (`None` reports as unavailable)
    pub own_address: Option<Address>,
    /// Broadcast address (`None` disables broadcast)
    pub broadcast_address: Option<Address>,
    /// Largest payload accepted by `send`
    pub max_payload: usize,
    /// Frames held for delivery before new ones are dropped
    pub queue_depth: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            address_width: 4,
            own_address: Address::from_slice(&[10, 0, 0, 1]),
            broadcast_address: Address::from_slice(&[255, 255, 255, 255]),
            max_payload: PAYLOAD_CAPACITY,
            queue_depth: 8,
        }
    }
}

/// A frame on the emulated air
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg(feature = "alloc")]
pub struct Frame {
    /// Sender (for inbound frames) or destination (for sent frames)
    pub address: Address,
    /// Raw payload
    pub payload: Vec<u8>,
}

/// Loopback transport
///
/// Emulates a radio link in memory for testing purposes.
#[cfg(feature = "alloc")]
pub struct LoopbackTransport {
    config: LoopbackConfig,
    initialized: bool,
    air: VecDeque<Frame>,
    sent: Vec<Frame>,
    fail_initialize: bool,
    fail_next_send: bool,
    disconnected: bool,
    refused: usize,
}

#[cfg(feature = "alloc")]
impl LoopbackTransport {
    /// Create a new loopback transport with the given configuration
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            config,
            initialized: false,
            air: VecDeque::new(),
            sent: Vec::new(),
            fail_initialize: false,
            fail_next_send: false,
            disconnected: false,
            refused: 0,
        }
    }

    /// Create a new loopback transport with default configuration
    pub fn new_default() -> Self {
        Self::new(LoopbackConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &LoopbackConfig {
        &self.config
    }

    /// Queue an inbound frame as if it had been received from `source`
    ///
    /// Returns `false` if the delivery queue is full.
    pub fn inject(&mut self, source: Address, payload: &[u8]) -> bool {
        if self.air.len() >= self.config.queue_depth {
            log::warn!("loopback: delivery queue full, frame lost");
            return false;
        }
        self.air.push_back(Frame {
            address: source,
            payload: payload.to_vec(),
        });
        true
    }

    /// Frames handed to `send`, oldest first
    pub fn sent(&self) -> &[Frame] {
        &self.sent
    }

    /// Frames waiting to be delivered
    pub fn pending(&self) -> usize {
        self.air.len()
    }

    /// Number of delivered frames the receive buffer refused
    pub fn refused(&self) -> usize {
        self.refused
    }

    /// Make the next `initialize` fail
    pub fn fail_initialize(&mut self, fail: bool) {
        self.fail_initialize = fail;
    }

    /// Make the next `send` fail
    pub fn fail_next_send(&mut self) {
        self.fail_next_send = true;
    }

    /// Drop the link; every following `poll` fails until `initialize`
    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    fn loops_back(&self, destination: &Address) -> bool {
        self.config.own_address.as_ref() == Some(destination)
            || self.config.broadcast_address.as_ref() == Some(destination)
    }
}

#[cfg(feature = "alloc")]
impl Transport for LoopbackTransport {
    fn initialize(&mut self) -> Result<()> {
        if self.fail_initialize {
            return Err(Error::TransportInitFailed);
        }
        self.initialized = true;
        self.disconnected = false;
        log::info!(
            "loopback: up, own address {:?}",
            self.config.own_address.as_ref().map(Address::as_bytes)
        );
        Ok(())
    }

    fn poll(&mut self, inbox: &mut ReceiveBuffer) -> Result<()> {
        if self.disconnected {
            return Err(Error::TransportDisconnected);
        }
        // One frame per poll, like a radio receiving one packet at a time
        if let Some(frame) = self.air.pop_front() {
            if !inbox.offer(&frame.address, &frame.payload) {
                self.refused += 1;
            }
        }
        Ok(())
    }

    fn send(&mut self, destination: &Address, payload: &[u8]) -> Result<()> {
        if !self.initialized {
            return Err(Error::SendFailed);
        }
        if core::mem::take(&mut self.fail_next_send) {
            return Err(Error::SendFailed);
        }
        if destination.width() != self.config.address_width {
            return Err(Error::AddressWidthMismatch);
        }
        if payload.len() > self.config.max_payload {
            return Err(Error::PayloadTooLarge);
        }

        log::debug!(
            "loopback: {} bytes to {:?}",
            payload.len(),
            destination.as_bytes()
        );
        self.sent.push(Frame {
            address: destination.clone(),
            payload: payload.to_vec(),
        });

        if self.loops_back(destination) {
            let source = self
                .config
                .own_address
                .clone()
                .unwrap_or_else(|| Address::zeroed(self.config.address_width));
            self.inject(source, payload);
        }
        Ok(())
    }

    fn address_width(&self) -> usize {
        self.config.address_width
    }

    fn own_address(&self) -> Result<Option<Address>> {
        Ok(self.config.own_address.clone())
    }

    fn broadcast_address(&self) -> Result<Option<Address>> {
        Ok(self.config.broadcast_address.clone())
    }

    fn max_payload_size(&self) -> Result<usize> {
        Ok(self.config.max_payload)
    }
}
