//! uartbridge-core - Serial line protocol for a low-power wireless transport
//!
//! This crate implements the host-facing side of a bridge that exposes a
//! radio (or any other message transport) over a byte-oriented serial link.
//! The host talks a human-readable line protocol:
//!
//! | Host → Bridge            | Bridge → Host                                   |
//! |--------------------------|-------------------------------------------------|
//! | `SEND`                   | `OK AWAIT_ADDRESS`                              |
//! | `ADDRESS b0 … b(N-1)`    | `OK AWAIT_DATA`                                 |
//! | `DATA b0 … bk`           | `OK SENDING`, then `OK IDLE` or `ERROR`         |
//! | `RECEIVE`                | `OK SEND_ADDRESS`, `ADDRESS …`, `OK SEND_DATA`, `DATA …`, `OK IDLE` |
//! | `CONFIGURATION`          | status, own/broadcast address, limits, `OK IDLE` |
//! | `RESET`                  | `OK RESET`, then the device restarts            |
//!
//! The crate is `no_std` and allocation free. Everything the bridge needs from
//! the outside world comes in through two traits:
//!
//! - [`Transport`] - the radio: initialize, poll, send, address queries
//! - [`LineSink`] - the serial output, one line at a time
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable `Box<dyn Transport>` forwarding
//!
//! # Example
//!
//! ```ignore
//! use uartbridge_core::{Bridge, IoSink, Step};
//!
//! let mut bridge = Bridge::new(&mut radio, IoSink::new(uart_tx));
//! bridge.begin()?;
//! loop {
//!     while let Some(byte) = uart_rx.next_byte() {
//!         if !bridge.feed(byte) {
//!             break;
//!         }
//!     }
//!     if bridge.tick()? == Step::Reset {
//!         cortex_m::peripheral::SCB::sys_reset();
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod bridge;
pub mod codec;
pub mod error;
pub mod line;
pub mod message;
pub mod parser;
pub mod sink;
pub mod state;
pub mod transport;

pub use bridge::{Bridge, Step};
pub use error::{Error, Result};
pub use line::{LineBuffer, SERIAL_BUFFER_SIZE};
pub use message::{Address, InboundMessage, OutboundMessage, ReceiveBuffer};
pub use message::{MAX_ADDRESS_LEN, PAYLOAD_CAPACITY};
pub use sink::{IoSink, LineSink};
pub use state::{ConfigurationStep, ReceiveStep, SendStep, State};
pub use transport::Transport;
