//! Bus schedule (trip) API: listing, generation and status changes
//!
//! Status changes never patch local state. After the backend accepts a
//! change the whole trip list is fetched again and that is what gets shown.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use crossterm::style::{Color, Stylize};
use serde_json::json;

use super::client::AdminClient;
use super::{cell, query_string};
use crate::models::{format_price, StatusColor, Transition, Trip, TripStatus};

/// Optional list filters.
#[derive(Debug, Default, Clone)]
pub struct TripFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<TripStatus>,
}

impl TripFilter {
    fn query(&self) -> String {
        query_string(&[
            ("date", self.date.map(|d| d.to_string())),
            ("status", self.status.map(|s| s.as_str().to_string())),
        ])
    }
}

pub async fn list_trips_data(client: &AdminClient, filter: &TripFilter) -> Result<Vec<Trip>> {
    let path = format!("/bus-schedules{}", filter.query());
    let trips: Vec<Trip> = client
        .get(&path)
        .await
        .context("Failed to list bus schedules")?;
    Ok(match filter.status {
        Some(status) => trips.into_iter().filter(|t| t.status == status).collect(),
        None => trips,
    })
}

/// List trips (prints to stdout).
pub async fn list_trips(client: &AdminClient, filter: &TripFilter) -> Result<()> {
    let trips = list_trips_data(client, filter).await?;
    print_trips(&trips);
    Ok(())
}

fn print_trips(trips: &[Trip]) {
    println!("\nBus schedules:");
    println!("{:-<110}", "");

    if trips.is_empty() {
        println!("  (no trips found)");
        return;
    }

    println!(
        "{:<26} {:<28} {:<17} {:>7} {:>12} {:<14} ACTIONS",
        "ID", "ROUTE", "DEPARTS", "SEATS", "PRICE", "STATUS"
    );
    let styled = std::io::stdout().is_terminal();
    for trip in trips {
        println!("{}", trip_row(trip, styled));
    }
}

fn term_color(color: StatusColor) -> Color {
    match color {
        StatusColor::Info => Color::Cyan,
        StatusColor::Warning => Color::Yellow,
        StatusColor::Success => Color::Green,
        StatusColor::Error => Color::Red,
    }
}

/// Padded status label, colored by its lifecycle tag when `styled`.
fn status_cell(status: TripStatus, styled: bool) -> String {
    let padded = format!("{:<14}", status.label());
    if styled {
        padded.with(term_color(status.color())).to_string()
    } else {
        padded
    }
}

fn trip_row(trip: &Trip, styled: bool) -> String {
    let seats = match (trip.available_seats, trip.total_seats) {
        (Some(free), Some(total)) => format!("{}/{}", free, total),
        (None, Some(total)) => total.to_string(),
        _ => "-".to_string(),
    };
    format!(
        "{:<26} {:<28} {:<17} {:>7} {:>12} {} {}",
        cell(&trip.id, 26),
        cell(&trip.route_label(), 28),
        trip.departure_label(),
        seats,
        trip.price.map(format_price).unwrap_or_else(|| "-".into()),
        status_cell(trip.status, styled),
        actions_label(trip)
    )
}

/// Offered actions as shown in the table, e.g. `advance->departed, cancel`.
pub fn actions_label(trip: &Trip) -> String {
    if trip.status.is_terminal() {
        return "-".to_string();
    }
    let actions: Vec<String> = trip
        .offered_transitions()
        .into_iter()
        .map(|(transition, target)| match transition {
            Transition::Advance => format!("advance->{}", target),
            Transition::Cancel => "cancel".to_string(),
        })
        .collect();
    if actions.is_empty() {
        "-".to_string()
    } else {
        actions.join(", ")
    }
}

/// Generate the day's trips from the route templates.
pub async fn generate_trips(client: &AdminClient, date: NaiveDate) -> Result<()> {
    let body = json!({ "date": date.to_string() });
    let resp: serde_json::Value = client
        .post("/bus-schedules/generate", &body)
        .await
        .with_context(|| format!("Failed to generate schedules for {}", date))?;

    let created = match resp {
        serde_json::Value::Array(ref items) => Some(items.len() as u64),
        serde_json::Value::Object(ref obj) => obj
            .get("count")
            .or_else(|| obj.get("created"))
            .and_then(|v| v.as_u64()),
        _ => None,
    };
    match created {
        Some(n) => println!("Generated {} trips for {}", n, date),
        None => println!("Schedules generated for {}", date),
    }

    let filter = TripFilter {
        date: Some(date),
        status: None,
    };
    list_trips(client, &filter).await
}

/// Request a status change and return the freshly fetched trip list.
///
/// The target is resolved from the trip's current status through the
/// lifecycle table; a transition the table does not offer is refused
/// before anything is sent.
pub async fn change_status_data(
    client: &AdminClient,
    trip_id: &str,
    transition: Transition,
) -> Result<(TripStatus, Vec<Trip>)> {
    let trip: Trip = client
        .get(&format!("/bus-schedules/{}", trip_id))
        .await
        .with_context(|| format!("Failed to fetch trip {}", trip_id))?;

    let target = transition.target(trip.status)?;
    tracing::info!(
        "Changing trip {} status: {} -> {}",
        trip_id,
        trip.status,
        target
    );

    client
        .patch(
            &format!("/bus-schedules/{}/status", trip_id),
            &json!({ "status": target }),
        )
        .await
        .with_context(|| format!("Failed to update status of trip {}", trip_id))?;

    let trips = list_trips_data(client, &TripFilter::default()).await?;
    Ok((target, trips))
}

/// Change a trip's status and print its refreshed row.
pub async fn change_status(client: &AdminClient, trip_id: &str, transition: Transition) -> Result<()> {
    let (target, trips) = change_status_data(client, trip_id, transition).await?;

    match trips.iter().find(|t| t.id == trip_id) {
        Some(trip) => {
            if trip.status != target {
                tracing::warn!(
                    "Backend reports trip {} as {} after requesting {}",
                    trip_id,
                    trip.status,
                    target
                );
            }
            println!("Status updated: {}", trip.status.label());
            println!("{}", trip_row(trip, std::io::stdout().is_terminal()));
        }
        None => println!("Status updated to {}; trip {} is no longer listed", target.label(), trip_id),
    }
    Ok(())
}
