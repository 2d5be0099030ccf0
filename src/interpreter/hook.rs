//! Instrumentation interface
//!
//! The interpreter reports execution to a [`Hook`] the way a settrace-style
//! debugger hook works: `on_call` runs when a frame is entered and decides
//! whether the hook subscribes to that frame; subscribed frames then deliver
//! `line`, `return` and `exception` events to `on_event`. Frames the hook
//! declined run without any callbacks.

use super::errors::PyException;
use crate::memory::stack::Frame;
use crate::memory::value::Value;

/// An event in a subscribed frame
#[derive(Debug, Clone, Copy)]
pub enum TraceEvent<'a> {
    /// About to execute the statement at `frame.line`
    Line,
    /// The frame is returning normally with this value
    Return(&'a Value),
    /// An exception reached this frame
    Exception(&'a PyException),
}

impl TraceEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            TraceEvent::Line => "line",
            TraceEvent::Return(_) => "return",
            TraceEvent::Exception(_) => "exception",
        }
    }
}

/// Whether execution may continue after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookControl {
    Continue,
    Stop,
}

pub trait Hook {
    /// Called on frame entry; returning `true` subscribes to the frame's events
    fn on_call(&mut self, frame: &Frame) -> bool;

    /// Called for each event of a subscribed frame
    fn on_event(&mut self, frame: &Frame, event: TraceEvent<'_>) -> HookControl;

    /// Polled between statements of every frame, subscribed or not
    fn should_abort(&mut self) -> bool {
        false
    }
}

/// Runs code without instrumentation
#[derive(Debug, Default)]
pub struct NoHook;

impl Hook for NoHook {
    fn on_call(&mut self, _frame: &Frame) -> bool {
        false
    }

    fn on_event(&mut self, _frame: &Frame, _event: TraceEvent<'_>) -> HookControl {
        HookControl::Continue
    }
}
