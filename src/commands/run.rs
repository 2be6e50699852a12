//! Run command: drive the bridge from a console

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use uartbridge_core::{Bridge, State, Step};

use crate::console::{self, ConsoleSpec};
use crate::error::AppError;
use crate::transports::{self, TransportSettings};

/// Pause when a loop iteration did nothing
const IDLE_SLEEP: Duration = Duration::from_millis(2);

/// Settings for one run after merging CLI and config file
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Console to read commands from
    pub console: ConsoleSpec,
    /// Transport to bridge to
    pub transport: TransportSettings,
    /// Stop after this many restarts
    pub max_restarts: Option<u32>,
    /// Pause before each restart
    pub restart_delay: Duration,
}

/// Run the bridge until the console input closes
pub fn cmd_run(options: &RunOptions) -> Result<(), AppError> {
    let mut transport = transports::open_transport(&options.transport)?;
    let (mut source, sink) = console::open_console(&options.console)?;

    let mut bridge = Bridge::new(&mut transport, sink);
    if let Err(e) = bridge.begin() {
        log::warn!("Bridge failed to start: {}", e);
    }

    let mut pending: VecDeque<u8> = VecDeque::new();
    let mut input_open = true;
    let mut restarts: u32 = 0;

    loop {
        let mut busy = false;

        while !bridge.line_pending() {
            let Some(byte) = pending.pop_front() else {
                break;
            };
            if !bridge.feed(byte) {
                pending.push_front(byte);
                break;
            }
            busy = true;
        }

        if input_open {
            let before = pending.len();
            input_open = source.read_into(&mut pending)?;
            busy |= pending.len() != before;
            if !input_open {
                log::debug!("Console input closed, {} bytes left", pending.len());
            }
        }

        let was_pending = bridge.line_pending();
        let state_before = bridge.state();
        match bridge.tick()? {
            Step::Ready => {}
            Step::NotStarted => {}
            Step::Reset => {
                restarts += 1;
                if let Some(max) = options.max_restarts {
                    if restarts > max {
                        return Err(AppError::TooManyRestarts(max));
                    }
                }
                log::info!("Restarting bridge (restart {})", restarts);
                if !options.restart_delay.is_zero() {
                    thread::sleep(options.restart_delay);
                }
                if let Err(e) = bridge.begin() {
                    log::warn!("Bridge failed to restart: {}", e);
                }
                continue;
            }
        }
        busy |= was_pending && !bridge.line_pending();

        // Once input is gone, stop when the bridge can make no more progress
        // on its own: idle, or stuck waiting for a line that will never come.
        if !input_open && pending.is_empty() && !bridge.line_pending() {
            let state = bridge.state();
            if matches!(state, State::Idle | State::Starting) || state == state_before {
                if state != State::Idle {
                    log::warn!("Console closed while in state {}", state.name());
                }
                break;
            }
        }

        if !busy {
            thread::sleep(IDLE_SLEEP);
        }
    }

    log::info!("Console closed after {} restarts", restarts);
    Ok(())
}
