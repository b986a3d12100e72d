//! Alert transition events and the queue that hands them to the caller.

use std::collections::VecDeque;

use serde::Serialize;

use crate::tracked_object::{AlertLevel, CentroidSample};

/// Kind of an [`Event`], for callers that only dispatch on the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PreAlert,
    Alert,
    Recovered,
    Lost,
}

/// One alert state transition. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Track entered PREALERT.
    PreAlert {
        track_id: u64,
        risk: f64,
        last: CentroidSample,
    },
    /// Track entered ALERT.
    Alert {
        track_id: u64,
        risk: f64,
        last: CentroidSample,
    },
    /// Risk cleared for the debounce interval after PREALERT or ALERT.
    Recovered {
        track_id: u64,
        risk: f64,
        last: CentroidSample,
        from: AlertLevel,
    },
    /// Escalated track removed after the long-loss cap.
    Lost {
        track_id: u64,
        risk: f64,
        last: CentroidSample,
        level: AlertLevel,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PreAlert { .. } => EventKind::PreAlert,
            Event::Alert { .. } => EventKind::Alert,
            Event::Recovered { .. } => EventKind::Recovered,
            Event::Lost { .. } => EventKind::Lost,
        }
    }

    pub fn track_id(&self) -> u64 {
        match self {
            Event::PreAlert { track_id, .. }
            | Event::Alert { track_id, .. }
            | Event::Recovered { track_id, .. }
            | Event::Lost { track_id, .. } => *track_id,
        }
    }

    pub fn risk(&self) -> f64 {
        match self {
            Event::PreAlert { risk, .. }
            | Event::Alert { risk, .. }
            | Event::Recovered { risk, .. }
            | Event::Lost { risk, .. } => *risk,
        }
    }

    /// Last known centroid of the track when the event fired.
    pub fn last_sample(&self) -> CentroidSample {
        match self {
            Event::PreAlert { last, .. }
            | Event::Alert { last, .. }
            | Event::Recovered { last, .. }
            | Event::Lost { last, .. } => *last,
        }
    }
}

/// FIFO queue of events awaiting the caller.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Take every queued event in arrival order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<Event> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
