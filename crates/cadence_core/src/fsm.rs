//! State Machine Runtime
//!
//! Flat Harel-style statecharts over caller-defined state and event enums.
//! Supports:
//! - Transition tables keyed by (state, event)
//! - Bounded transition history for debugging
//!
//! An event with no matching transition leaves the machine where it is.

use std::collections::VecDeque;
use std::fmt::Debug;

/// Transitions kept in the history ring
const HISTORY_LIMIT: usize = 32;

/// Bounds shared by state and event types
pub trait Symbol: Copy + Eq + Debug + Send + 'static {}

impl<T: Copy + Eq + Debug + Send + 'static> Symbol for T {}

/// A transition in the state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition<S, E> {
    pub from_state: S,
    pub event: E,
    pub to_state: S,
}

impl<S: Symbol, E: Symbol> Transition<S, E> {
    pub fn new(from: S, event: E, to: S) -> Self {
        Self {
            from_state: from,
            event,
            to_state: to,
        }
    }
}

/// Builder for creating state machines
pub struct StateMachineBuilder<S: Symbol, E: Symbol> {
    name: &'static str,
    initial_state: S,
    transitions: Vec<Transition<S, E>>,
}

impl<S: Symbol, E: Symbol> StateMachineBuilder<S, E> {
    pub fn new(name: &'static str, initial_state: S) -> Self {
        Self {
            name,
            initial_state,
            transitions: Vec::new(),
        }
    }

    /// Add a simple transition (from, event, to)
    pub fn on(mut self, from: S, event: E, to: S) -> Self {
        self.transitions.push(Transition::new(from, event, to));
        self
    }

    /// Add the same event transition from several states
    pub fn on_any(mut self, from: &[S], event: E, to: S) -> Self {
        self.transitions
            .extend(from.iter().map(|state| Transition::new(*state, event, to)));
        self
    }

    /// Build the state machine
    pub fn build(self) -> StateMachine<S, E> {
        StateMachine {
            name: self.name,
            current_state: self.initial_state,
            transitions: self.transitions,
            history: VecDeque::new(),
        }
    }
}

/// A state machine instance
pub struct StateMachine<S: Symbol, E: Symbol> {
    name: &'static str,
    current_state: S,
    transitions: Vec<Transition<S, E>>,
    history: VecDeque<(S, E, S)>,
}

impl<S: Symbol, E: Symbol> StateMachine<S, E> {
    /// Create a builder for a state machine
    pub fn builder(name: &'static str, initial_state: S) -> StateMachineBuilder<S, E> {
        StateMachineBuilder::new(name, initial_state)
    }

    /// Get the current state
    pub fn current_state(&self) -> S {
        self.current_state
    }

    /// Check if we're in a specific state
    pub fn is_in(&self, state: S) -> bool {
        self.current_state == state
    }

    /// Check if an event can trigger a transition from current state
    pub fn can_send(&self, event: E) -> bool {
        self.find(event).is_some()
    }

    /// Recent transitions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &(S, E, S)> {
        self.history.iter()
    }

    /// Send an event to the state machine, potentially triggering a transition
    pub fn send(&mut self, event: E) -> S {
        let from = self.current_state;
        let Some(to) = self.find(event) else {
            tracing::trace!(machine = self.name, state = ?from, ?event, "event ignored");
            return from;
        };

        self.current_state = to;
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back((from, event, to));
        tracing::debug!(machine = self.name, ?from, ?event, ?to, "transition");

        to
    }

    /// Move directly to a state, bypassing the transition table.
    ///
    /// Used when an owner re-initializes (e.g. a hook retargeted to a new element).
    pub fn reset(&mut self, state: S) {
        self.current_state = state;
        self.history.clear();
    }

    fn find(&self, event: E) -> Option<S> {
        self.transitions
            .iter()
            .find(|t| t.from_state == self.current_state && t.event == event)
            .map(|t| t.to_state)
    }
}
