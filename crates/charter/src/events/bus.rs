//! Event bus for queuing engine notifications and host commands.
//!
//! Nothing is delivered by callback: the engine only pushes onto the
//! queues, and the host drains them when it is ready.

use std::collections::VecDeque;

use super::types::{Command, EngineEvent};
use crate::range::IndicatorRequirements;

/// Queues events and commands for processing.
///
/// The event bus maintains two separate queues:
/// - Events: notifications produced by the engine
/// - Commands: mutations waiting to be executed by the engine
///
/// # Usage Pattern
///
/// ```ignore
/// engine.bus_mut().dispatch(Command::Append(candle));
/// engine.run_pending()?;
///
/// for event in engine.drain_events() {
///     if let EngineEvent::IndicatorRequirementsChanged(req) = event {
///         fetcher.request(req.range);
///     }
/// }
/// ```
#[derive(Debug, Default)]
pub struct EventBus {
    events: VecDeque<EngineEvent>,
    commands: VecDeque<Command>,
}

impl EventBus {
    /// Create a new empty event bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an event. Events are drained in FIFO order.
    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push_back(event);
    }

    /// Dispatch a command to be executed.
    pub fn dispatch(&mut self, cmd: Command) {
        self.commands.push_back(cmd);
    }

    /// Dispatch multiple commands at once.
    pub fn dispatch_all(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.extend(commands);
    }

    /// Drain all pending events.
    pub fn drain_events(&mut self) -> impl Iterator<Item = EngineEvent> + '_ {
        self.events.drain(..)
    }

    /// Take the next pending command.
    pub fn next_command(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    /// Take all pending events, leaving the queue empty.
    #[must_use]
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    /// The newest queued history requirements. Older ones are superseded
    /// and any response to them would be discarded as stale.
    pub fn pending_requirements(&self) -> Option<&IndicatorRequirements> {
        self.events.iter().rev().find_map(|event| match event {
            EngineEvent::IndicatorRequirementsChanged(req) => Some(req),
            _ => None,
        })
    }

    /// Check if there are any pending events.
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}
