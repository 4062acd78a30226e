//! Per-day punch state and shift timer.

use serde::Serialize;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{
    error::ApiError,
    store::{PunchRecord, PunchType},
};

/// Where a worker stands on one local date.
#[derive(Debug, Clone, PartialEq)]
pub enum PunchState {
    None,
    PunchedIn { punch_in: PunchRecord },
    PunchedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllowedActions {
    pub punch_in: bool,
    pub punch_out: bool,
}

impl PunchState {
    /// Derives the state from one worker's records for one date. Any OUT
    /// closes the day; otherwise the earliest IN opens it.
    pub fn from_records(records: &[PunchRecord]) -> Self {
        if records.iter().any(|r| r.punch_type == PunchType::Out) {
            return PunchState::PunchedOut;
        }
        records
            .iter()
            .filter(|r| r.punch_type == PunchType::In)
            .min_by_key(|r| r.time)
            .map(|r| PunchState::PunchedIn {
                punch_in: r.clone(),
            })
            .unwrap_or(PunchState::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PunchState::None => "none",
            PunchState::PunchedIn { .. } => "punched_in",
            PunchState::PunchedOut => "punched_out",
        }
    }

    pub fn allowed(&self) -> AllowedActions {
        match self {
            PunchState::None => AllowedActions {
                punch_in: true,
                punch_out: false,
            },
            PunchState::PunchedIn { .. } => AllowedActions {
                punch_in: false,
                punch_out: true,
            },
            PunchState::PunchedOut => AllowedActions {
                punch_in: false,
                punch_out: false,
            },
        }
    }

    /// Rejects a punch the current state does not allow.
    pub fn check(&self, punch: PunchType) -> Result<(), ApiError> {
        match (self, punch) {
            (PunchState::None, PunchType::In) | (PunchState::PunchedIn { .. }, PunchType::Out) => {
                Ok(())
            }
            (PunchState::PunchedIn { .. }, PunchType::In) => Err(ApiError::DuplicateAction(
                "punch IN already recorded today".into(),
            )),
            (PunchState::PunchedOut, PunchType::In) => Err(ApiError::DuplicateAction(
                "shift already closed today".into(),
            )),
            (PunchState::None, PunchType::Out) => Err(ApiError::DuplicateAction(
                "no punch IN recorded today".into(),
            )),
            (PunchState::PunchedOut, PunchType::Out) => Err(ApiError::DuplicateAction(
                "punch OUT already recorded today".into(),
            )),
        }
    }
}

/// Time worked since punch IN against the configured shift length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftProgress {
    pub hours: i64,
    pub minutes: i64,
    pub worked_hours: f64,
    pub shift_hours: f64,
    pub complete: bool,
    /// `None` once the shift is complete.
    pub remaining_hours: Option<f64>,
    pub message: String,
}

impl ShiftProgress {
    pub fn compute(punch_in: &PunchRecord, now_local: OffsetDateTime, shift_hours: f64) -> Self {
        let in_at = PrimitiveDateTime::new(punch_in.date, punch_in.time);
        let now = PrimitiveDateTime::new(now_local.date(), now_local.time());
        let secs = (now - in_at).whole_seconds().max(0);

        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let worked_hours = secs as f64 / 3600.0;
        let complete = worked_hours >= shift_hours;
        let remaining_hours = (!complete).then(|| shift_hours - worked_hours);

        let message = match remaining_hours {
            None => format!("Shift complete: {hours} hours {minutes} minutes worked"),
            Some(left) => {
                format!("Working time {hours} hours {minutes} minutes, {left:.1} hours remaining")
            }
        };

        Self {
            hours,
            minutes,
            worked_hours,
            shift_hours,
            complete,
            remaining_hours,
            message,
        }
    }
}
