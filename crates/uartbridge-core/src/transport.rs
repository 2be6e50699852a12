//! Transport capability trait
//!
//! A transport moves one message at a time between this device and its
//! peers. The bridge never owns it; it only borrows it. A restart happens in
//! place on the same bridge, so [`Transport::initialize`] may be called again
//! on a transport that is already initialized and must start it afresh.

use crate::error::Result;
use crate::message::{Address, ReceiveBuffer};

/// Message transport (radio, network socket, emulator)
///
/// ## Inbound delivery
///
/// Inbound messages are handed over synchronously from inside [`poll`]:
/// the transport calls [`ReceiveBuffer::offer`] for every message it has
/// received. The buffer decides whether to keep it; refused messages are
/// lost. Because delivery happens on the caller's stack there is no
/// concurrent access to the buffer.
///
/// ## Example
///
/// ```ignore
/// impl Transport for Radio {
///     fn poll(&mut self, inbox: &mut ReceiveBuffer) -> Result<()> {
///         while let Some(frame) = self.driver.next_frame()? {
///             inbox.offer(&frame.source, frame.payload());
///         }
///         Ok(())
///     }
///     // ...
/// }
/// ```
///
/// [`poll`]: Transport::poll
pub trait Transport {
    /// Bring the transport up
    fn initialize(&mut self) -> Result<()>;

    /// Service the transport and deliver any received messages
    ///
    /// An error is treated as a disconnect and is fatal for the session.
    fn poll(&mut self, inbox: &mut ReceiveBuffer) -> Result<()>;

    /// Send one message
    fn send(&mut self, destination: &Address, payload: &[u8]) -> Result<()>;

    /// Width of an address on this transport, in bytes
    fn address_width(&self) -> usize;

    /// This device's own address, `None` if not (yet) assigned
    fn own_address(&self) -> Result<Option<Address>>;

    /// Address that reaches every peer, `None` if broadcast is unsupported
    fn broadcast_address(&self) -> Result<Option<Address>>;

    /// Largest payload the transport can carry in one message
    fn max_payload_size(&self) -> Result<usize>;
}

// Blanket impl for boxed transports to allow runtime selection
#[cfg(feature = "alloc")]
impl Transport for alloc::boxed::Box<dyn Transport + Send> {
    fn initialize(&mut self) -> Result<()> {
        (**self).initialize()
    }

    fn poll(&mut self, inbox: &mut ReceiveBuffer) -> Result<()> {
        (**self).poll(inbox)
    }

    fn send(&mut self, destination: &Address, payload: &[u8]) -> Result<()> {
        (**self).send(destination, payload)
    }

    fn address_width(&self) -> usize {
        (**self).address_width()
    }

    fn own_address(&self) -> Result<Option<Address>> {
        (**self).own_address()
    }

    fn broadcast_address(&self) -> Result<Option<Address>> {
        (**self).broadcast_address()
    }

    fn max_payload_size(&self) -> Result<usize> {
        (**self).max_payload_size()
    }
}
