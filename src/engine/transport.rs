//! Stream lifecycle state machine
//!
//! The video transport owns the connection; it tells the pipeline when a
//! stream starts and stops. Frames are only classified while the stream is
//! live. Frames outside that window still pass through untouched so the
//! transport always gets one frame back per frame in.

use std::fmt;

use log::{debug, info, warn};

/// Lifecycle states of one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Created, waiting for the transport to start the stream
    #[default]
    Idle,
    /// Frames are flowing and being sampled
    Live,
    /// The transport stopped the stream; the session is read-only
    Stopped,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Idle => write!(f, "Idle"),
            StreamState::Live => write!(f, "Live"),
            StreamState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Lifecycle events delivered by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Started,
    Stopped,
}

/// Tracks the stream lifecycle
///
/// Transitions:
/// - Idle → Live on `Started`
/// - Live → Stopped on `Stopped`
/// - Stopped → Live on `Started` (a reconnect continues the same session)
///
/// Anything else is ignored with a warning; lifecycle noise from the
/// transport must not take the pipeline down.
#[derive(Debug, Clone, Default)]
pub struct StreamLifecycle {
    state: StreamState,
    /// Number of times the stream went live
    starts: u32,
}

impl StreamLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a transport event, returning the resulting state
    pub fn handle(&mut self, event: StreamEvent) -> StreamState {
        let next = match (self.state, event) {
            (StreamState::Idle, StreamEvent::Started) | (StreamState::Stopped, StreamEvent::Started) => {
                self.starts += 1;
                info!("[STREAM] live (start #{})", self.starts);
                StreamState::Live
            }
            (StreamState::Live, StreamEvent::Stopped) => {
                info!("[STREAM] stopped");
                StreamState::Stopped
            }
            (state, event) => {
                warn!("[STREAM] ignoring {:?} while {}", event, state);
                state
            }
        };
        debug!("[STREAM] {} -> {}", self.state, next);
        self.state = next;
        next
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == StreamState::Live
    }

    pub fn start_count(&self) -> u32 {
        self.starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let lifecycle = StreamLifecycle::new();
        assert_eq!(lifecycle.state(), StreamState::Idle);
        assert!(!lifecycle.is_live());
    }

    #[test]
    fn test_start_stop_restart() {
        let mut lifecycle = StreamLifecycle::new();
        assert_eq!(lifecycle.handle(StreamEvent::Started), StreamState::Live);
        assert_eq!(lifecycle.handle(StreamEvent::Stopped), StreamState::Stopped);
        assert_eq!(lifecycle.handle(StreamEvent::Started), StreamState::Live);
        assert_eq!(lifecycle.start_count(), 2);
    }

    #[test]
    fn test_invalid_transitions_are_ignored() {
        let mut lifecycle = StreamLifecycle::new();
        assert_eq!(lifecycle.handle(StreamEvent::Stopped), StreamState::Idle);
        lifecycle.handle(StreamEvent::Started);
        assert_eq!(lifecycle.handle(StreamEvent::Started), StreamState::Live);
        assert_eq!(lifecycle.start_count(), 1);
    }
}
