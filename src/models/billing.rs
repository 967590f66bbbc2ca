//! Discount codes, tickets, payments and revenue reports

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Percentage discount code with a validity window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    #[serde(alias = "_id")]
    pub id: String,
    pub code: String,
    pub percent: f64,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

impl Discount {
    /// Whether the code can be redeemed on `day`. Open ends are unbounded.
    pub fn is_valid_on(&self, day: NaiveDate) -> bool {
        self.valid_from.map_or(true, |from| day >= from)
            && self.valid_until.map_or(true, |until| day <= until)
    }
}

/// Payload for creating a discount code
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiscount {
    pub code: String,
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<NaiveDate>,
}

/// A sold (or reserved) ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, alias = "busScheduleId")]
    pub trip_id: Option<String>,
    #[serde(default)]
    pub seat_number: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    /// Backend ticket state, e.g. "booked", "paid", "cancelled"
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A payment for one or more tickets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub ticket_id: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub method: Option<String>,
    pub status: String,
    #[serde(default)]
    pub paid_at: Option<String>,
}

/// Revenue totals for a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub tickets_sold: u64,
    #[serde(default)]
    pub trips: u64,
    #[serde(default)]
    pub daily: Vec<DailyRevenue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: f64,
    #[serde(default)]
    pub tickets: u64,
}
