//! Bus trip (schedule) model and the status lifecycle table.
//!
//! A trip only moves forward: scheduled -> departed -> arrived. Cancellation
//! is a separate target, offered while the trip has not arrived yet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::format_timestamp;

/// Operational status of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Scheduled,
    Departed,
    Arrived,
    Cancelled,
}

/// Color tag used when rendering a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Info,
    Warning,
    Success,
    Error,
}

struct StatusEntry {
    label: &'static str,
    color: StatusColor,
    next: Option<TripStatus>,
    cancellable: bool,
}

// Indexed by `TripStatus::index`.
const LIFECYCLE: [StatusEntry; 4] = [
    StatusEntry {
        label: "Đã lên lịch",
        color: StatusColor::Info,
        next: Some(TripStatus::Departed),
        cancellable: true,
    },
    StatusEntry {
        label: "Đã khởi hành",
        color: StatusColor::Warning,
        next: Some(TripStatus::Arrived),
        cancellable: true,
    },
    StatusEntry {
        label: "Đã đến",
        color: StatusColor::Success,
        next: None,
        cancellable: false,
    },
    StatusEntry {
        label: "Đã hủy",
        color: StatusColor::Error,
        next: None,
        cancellable: false,
    },
];

impl TripStatus {
    pub const ALL: [TripStatus; 4] = [
        TripStatus::Scheduled,
        TripStatus::Departed,
        TripStatus::Arrived,
        TripStatus::Cancelled,
    ];

    fn index(self) -> usize {
        match self {
            TripStatus::Scheduled => 0,
            TripStatus::Departed => 1,
            TripStatus::Arrived => 2,
            TripStatus::Cancelled => 3,
        }
    }

    fn entry(self) -> &'static StatusEntry {
        &LIFECYCLE[self.index()]
    }

    /// Wire name, as the backend spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::Departed => "departed",
            TripStatus::Arrived => "arrived",
            TripStatus::Cancelled => "cancelled",
        }
    }

    /// Display label shown to operators.
    pub fn label(self) -> &'static str {
        self.entry().label
    }

    pub fn color(self) -> StatusColor {
        self.entry().color
    }

    /// The single legal forward successor, if any.
    pub fn next(self) -> Option<TripStatus> {
        self.entry().next
    }

    /// Whether a cancel action is offered from this status.
    pub fn can_cancel(self) -> bool {
        self.entry().cancellable
    }

    /// Terminal statuses offer no transition at all.
    pub fn is_terminal(self) -> bool {
        self.next().is_none() && !self.can_cancel()
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TripStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown status: {}. Use: scheduled, departed, arrived, cancelled",
                    s
                )
            })
    }
}

/// A status change an operator can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to the table successor.
    Advance,
    /// Jump straight to `cancelled`.
    Cancel,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("trip is {0}; no next status is offered")]
    NoSuccessor(TripStatus),
    #[error("trip is {0}; cancellation is only offered before arrival")]
    NotCancellable(TripStatus),
}

impl Transition {
    /// Resolve the status this transition leads to from `current`.
    pub fn target(self, current: TripStatus) -> Result<TripStatus, TransitionError> {
        match self {
            Transition::Advance => current
                .next()
                .ok_or(TransitionError::NoSuccessor(current)),
            Transition::Cancel if current.can_cancel() => Ok(TripStatus::Cancelled),
            Transition::Cancel => Err(TransitionError::NotCancellable(current)),
        }
    }
}

/// Origin/destination pair of a trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfo {
    #[serde(alias = "departure")]
    pub origin: String,
    #[serde(alias = "arrival")]
    pub destination: String,
}

/// A scheduled bus trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub bus_id: Option<String>,
    #[serde(default)]
    pub route: Option<RouteInfo>,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default, alias = "capacity")]
    pub total_seats: Option<u32>,
    #[serde(default)]
    pub available_seats: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
    pub status: TripStatus,
}

impl Trip {
    pub fn route_label(&self) -> String {
        match self.route {
            Some(ref r) => format!("{} -> {}", r.origin, r.destination),
            None => "(no route)".to_string(),
        }
    }

    pub fn departure_label(&self) -> String {
        self.departure_time
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string())
    }

    /// Actions offered for this trip, in display order.
    pub fn offered_transitions(&self) -> Vec<(Transition, TripStatus)> {
        [Transition::Advance, Transition::Cancel]
            .into_iter()
            .filter_map(|t| t.target(self.status).ok().map(|target| (t, target)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_table() {
        assert_eq!(TripStatus::Scheduled.next(), Some(TripStatus::Departed));
        assert_eq!(TripStatus::Departed.next(), Some(TripStatus::Arrived));
        assert_eq!(TripStatus::Arrived.next(), None);
        assert_eq!(TripStatus::Cancelled.next(), None);
    }

    #[test]
    fn test_cancel_only_before_arrival() {
        for status in TripStatus::ALL {
            let expected = matches!(status, TripStatus::Scheduled | TripStatus::Departed);
            assert_eq!(status.can_cancel(), expected, "{}", status);
            assert_eq!(
                Transition::Cancel.target(status).is_ok(),
                expected,
                "{}",
                status
            );
        }
    }

    #[test]
    fn test_advance_targets_exactly_the_successor() {
        for status in TripStatus::ALL {
            match status.next() {
                Some(next) => assert_eq!(Transition::Advance.target(status), Ok(next)),
                None => assert_eq!(
                    Transition::Advance.target(status),
                    Err(TransitionError::NoSuccessor(status))
                ),
            }
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TripStatus::Arrived.is_terminal());
        assert!(TripStatus::Cancelled.is_terminal());
        assert!(!TripStatus::Scheduled.is_terminal());
        assert!(!TripStatus::Departed.is_terminal());
    }

    #[test]
    fn test_labels_and_colors() {
        assert_eq!(TripStatus::Departed.label(), "Đã khởi hành");
        assert_eq!(TripStatus::Scheduled.color(), StatusColor::Info);
        assert_eq!(TripStatus::Cancelled.color(), StatusColor::Error);
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("Departed".parse::<TripStatus>(), Ok(TripStatus::Departed));
        assert!("boarding".parse::<TripStatus>().is_err());
    }

    #[test]
    fn test_trip_deserialize_and_offered_actions() {
        let trip: Trip = serde_json::from_value(serde_json::json!({
            "_id": "t1",
            "route": { "origin": "Hà Nội", "destination": "Hải Phòng" },
            "departureTime": "2026-10-19T07:30:00Z",
            "capacity": 40,
            "price": 150000.0,
            "status": "scheduled"
        }))
        .unwrap();

        assert_eq!(trip.id, "t1");
        assert_eq!(trip.total_seats, Some(40));
        assert_eq!(trip.route_label(), "Hà Nội -> Hải Phòng");
        assert_eq!(
            trip.offered_transitions(),
            vec![
                (Transition::Advance, TripStatus::Departed),
                (Transition::Cancel, TripStatus::Cancelled),
            ]
        );

        let arrived = Trip {
            status: TripStatus::Arrived,
            ..trip
        };
        assert!(arrived.offered_transitions().is_empty());
    }
}
