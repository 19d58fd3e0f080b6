//! Event subscription API.
//!
//! Delivery is synchronous: `EventBus::emit` calls every subscriber
//! registered for that event's kind, in registration order, on the
//! calling thread, matching the sheriff's single-threaded cooperative
//! ordering.

use crate::deputy::command::{DeputyCommand, Status};
use crate::deputy::Deputy;
use crate::script::{Action, Script};

#[derive(Clone)]
pub enum Event {
    DeputyInfoReceived(Deputy),
    CommandAdded(Deputy, DeputyCommand),
    CommandRemoved(Deputy, DeputyCommand),
    CommandStatusChanged(DeputyCommand, Option<Status>, Status),
    CommandGroupChanged(DeputyCommand),
    ScriptAdded(Script),
    ScriptRemoved(Script),
    ScriptStarted(Script),
    ScriptActionExecuting(Script, Action),
    ScriptFinished(Script),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EventKind {
    DeputyInfoReceived,
    CommandAdded,
    CommandRemoved,
    CommandStatusChanged,
    CommandGroupChanged,
    ScriptAdded,
    ScriptRemoved,
    ScriptStarted,
    ScriptActionExecuting,
    ScriptFinished,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DeputyInfoReceived(_) => EventKind::DeputyInfoReceived,
            Event::CommandAdded(_, _) => EventKind::CommandAdded,
            Event::CommandRemoved(_, _) => EventKind::CommandRemoved,
            Event::CommandStatusChanged(_, _, _) => EventKind::CommandStatusChanged,
            Event::CommandGroupChanged(_) => EventKind::CommandGroupChanged,
            Event::ScriptAdded(_) => EventKind::ScriptAdded,
            Event::ScriptRemoved(_) => EventKind::ScriptRemoved,
            Event::ScriptStarted(_) => EventKind::ScriptStarted,
            Event::ScriptActionExecuting(_, _) => EventKind::ScriptActionExecuting,
            Event::ScriptFinished(_) => EventKind::ScriptFinished,
        }
    }
}

type Callback = Box<dyn FnMut(&Event)>;

/// Registry of `event-kind -> callbacks`, dispatched synchronously.
#[derive(Default)]
pub struct EventBus {
    subscribers: std::collections::HashMap<EventKind, Vec<Callback>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event of the given kind. The closure runs
    /// synchronously, on the thread that calls `emit`.
    pub fn subscribe(&mut self, kind: EventKind, callback: Callback) {
        self.subscribers.entry(kind).or_default().push(callback);
    }

    pub fn emit(&mut self, event: Event) {
        if let Some(subs) = self.subscribers.get_mut(&event.kind()) {
            for cb in subs.iter_mut() {
                cb(&event);
            }
        }
    }
}
