//! Message buffers
//!
//! Both directions hold at most one message at a time, in fixed-capacity
//! storage. The receive side applies a backpressure policy: a new inbound
//! message is only accepted once the host has drained the previous one.

use heapless::Vec;

/// Largest address width any transport may declare
pub const MAX_ADDRESS_LEN: usize = 8;

/// Payload storage capacity in bytes
pub const PAYLOAD_CAPACITY: usize = 64;

/// Payload storage
pub type Payload = Vec<u8, PAYLOAD_CAPACITY>;

/// Fixed-width link-layer address
///
/// The width is chosen by the transport; an unset address is all zeroes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Address {
    bytes: Vec<u8, MAX_ADDRESS_LEN>,
}

impl Address {
    /// All-zero address of `width` bytes (clamped to [`MAX_ADDRESS_LEN`])
    pub fn zeroed(width: usize) -> Self {
        let mut bytes = Vec::new();
        bytes.resize(width.min(MAX_ADDRESS_LEN), 0).ok();
        Self { bytes }
    }

    /// Address from raw bytes, `None` if longer than [`MAX_ADDRESS_LEN`]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        Vec::from_slice(bytes).ok().map(|bytes| Self { bytes })
    }

    /// Address bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes in the address
    pub fn width(&self) -> usize {
        self.bytes.len()
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Message assembled by the send dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination address
    pub destination: Address,
    /// Payload bytes
    pub payload: Payload,
}

impl OutboundMessage {
    /// Zero the destination (keeping `width`) and drop the payload
    pub fn clear(&mut self, width: usize) {
        self.destination = Address::zeroed(width);
        self.payload.clear();
    }
}

/// Message accepted from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender address
    pub source: Address,
    /// Payload bytes; the first byte equals the payload length
    pub payload: Payload,
}

/// Single-slot staging area for inbound messages
#[derive(Debug, Clone, Default)]
pub struct ReceiveBuffer {
    slot: Option<InboundMessage>,
}

impl ReceiveBuffer {
    /// Create an empty receive buffer
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Offer a message delivered by the transport
    ///
    /// Accepted only when the slot is free and the payload is
    /// self-describing: its first byte equals the number of bytes delivered,
    /// which must fit [`PAYLOAD_CAPACITY`]. Everything else is dropped
    /// silently; the sender is never told.
    ///
    /// Returns whether the message was staged.
    pub fn offer(&mut self, source: &Address, bytes: &[u8]) -> bool {
        let Some(&declared) = bytes.first() else {
            log::debug!("inbound message dropped: empty payload");
            return false;
        };
        if usize::from(declared) != bytes.len() {
            log::debug!(
                "inbound message dropped: declared length {} but {} bytes delivered",
                declared,
                bytes.len()
            );
            return false;
        }
        if self.slot.is_some() {
            log::debug!("inbound message dropped: receive buffer occupied");
            return false;
        }
        let Ok(payload) = Payload::from_slice(bytes) else {
            log::debug!("inbound message dropped: {} bytes exceed capacity", bytes.len());
            return false;
        };
        log::debug!("inbound message staged: {} bytes", payload.len());
        self.slot = Some(InboundMessage {
            source: source.clone(),
            payload,
        });
        true
    }

    /// A message is staged
    pub fn is_occupied(&self) -> bool {
        self.slot.is_some()
    }

    /// Staged message, if any
    pub fn peek(&self) -> Option<&InboundMessage> {
        self.slot.as_ref()
    }

    /// Remove and return the staged message
    pub fn take(&mut self) -> Option<InboundMessage> {
        self.slot.take()
    }

    /// Drop the staged message
    pub fn clear(&mut self) {
        self.slot = None;
    }
}
