//! The before/after comparison as a state machine, independent of any
//! rendering toolkit.
//!
//! ```text
//! Empty --select_image--> Processing --complete(Ok)--> Enhanced
//!                             |                           |
//!                             +----complete(Err)--> Failed |
//!                                                     |    |
//! Empty <--------------------reset--------------------+----+
//! ```

pub mod reveal;

pub use reveal::RevealBoundary;

use thiserror::Error;

use crate::image;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Processing,
    Enhanced,
    Failed,
}

/// Identifies one submission. Completions carrying an outdated ticket are
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("an enhancement is already in progress")]
    Busy,
    #[error("a photo is already loaded; reset first")]
    Occupied,
    #[error("only image files can be restored")]
    NotAnImage,
}

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Empty,
    Processing {
        original: String,
        ticket: Ticket,
    },
    Enhanced {
        original: String,
        enhanced: String,
    },
    Failed {
        original: String,
        error: String,
    },
}

/// One page session's worth of comparison state.
#[derive(Debug, Default)]
pub struct ComparisonSession {
    state: State,
    reveal: RevealBoundary,
    dragging: bool,
    next_ticket: u64,
}

impl ComparisonSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Empty => Phase::Empty,
            State::Processing { .. } => Phase::Processing,
            State::Enhanced { .. } => Phase::Enhanced,
            State::Failed { .. } => Phase::Failed,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, State::Processing { .. })
    }

    /// The photo as the user supplied it.
    pub fn uploaded(&self) -> Option<&str> {
        match &self.state {
            State::Empty => None,
            State::Processing { original, .. }
            | State::Enhanced { original, .. }
            | State::Failed { original, .. } => Some(original),
        }
    }

    pub fn enhanced(&self) -> Option<&str> {
        match &self.state {
            State::Enhanced { enhanced, .. } => Some(enhanced),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            State::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn reveal(&self) -> RevealBoundary {
        self.reveal
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Accept a photo (as a data URL) and hand out the ticket for the
    /// enhancement request the caller is about to make.
    pub fn select_image(&mut self, data_url: impl Into<String>) -> Result<Ticket, SessionError> {
        match self.state {
            State::Processing { .. } => return Err(SessionError::Busy),
            State::Enhanced { .. } | State::Failed { .. } => return Err(SessionError::Occupied),
            State::Empty => {}
        }

        let data_url = data_url.into();
        let is_image = image::decode(&data_url).is_ok_and(|d| d.is_image());
        if !is_image {
            return Err(SessionError::NotAnImage);
        }

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.state = State::Processing {
            original: data_url,
            ticket,
        };
        Ok(ticket)
    }

    /// Deliver the gateway's answer. Returns false when the ticket no longer
    /// matches the request in flight (the session was reset meanwhile).
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<String, String>) -> bool {
        let original = match &mut self.state {
            State::Processing {
                original,
                ticket: current,
            } if *current == ticket => std::mem::take(original),
            _ => return false,
        };

        self.reveal = RevealBoundary::default();
        self.dragging = false;
        self.state = match outcome {
            Ok(enhanced) => State::Enhanced { original, enhanced },
            Err(error) => State::Failed { original, error },
        };
        true
    }

    /// Grab the handle. Only meaningful while a comparison is shown.
    pub fn begin_drag(&mut self) {
        self.dragging = self.phase() == Phase::Enhanced;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Pointer or touch moved. The boundary follows only while dragging.
    pub fn drag_to(&mut self, pointer_x: f64, left: f64, width: f64) -> f64 {
        if self.dragging {
            self.reveal.track(pointer_x, left, width)
        } else {
            self.reveal.percent()
        }
    }

    /// What to save when the user asks for a download.
    pub fn download_source(&self) -> Option<&str> {
        self.enhanced()
    }

    /// Back to a blank slate. Any request still in flight is orphaned.
    pub fn reset(&mut self) {
        self.state = State::Empty;
        self.reveal = RevealBoundary::default();
        self.dragging = false;
    }
}
