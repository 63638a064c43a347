use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::AgreementRecord;

/// One rented item on an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The order aggregate, restricted to the fields the agreement lifecycle
/// reads and writes. The rest of the order (pricing, fulfillment, CRM)
/// belongs to the back-office CRUD and is not modeled here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,

    pub customer_email: String,
    pub customer_name: String,

    /// Scheduled delivery. Authoritative when present; orders without it
    /// are flagged by the reminder campaign, never silently derived from
    /// free text.
    pub delivery_at: Option<DateTime<Utc>>,

    /// Operator free text. Carried for display only.
    pub delivery_notes: Option<String>,

    pub total_amount: Decimal,
    pub line_items: Vec<LineItem>,

    pub cancelled: bool,

    /// Optimistic-concurrency token. Every agreement write is conditional
    /// on this value and increments it.
    pub version: u64,

    pub agreement: AgreementRecord,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        customer_email: impl Into<String>,
        customer_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            customer_email: customer_email.into(),
            customer_name: customer_name.into(),
            delivery_at: None,
            delivery_notes: None,
            total_amount: Decimal::ZERO,
            line_items: Vec::new(),
            cancelled: false,
            version: 0,
            agreement: AgreementRecord::new(),
        }
    }

    /// Whole hours until the scheduled delivery, negative once it has
    /// passed. `None` when no structured delivery date is set.
    pub fn hours_until_delivery(&self, now: DateTime<Utc>) -> Option<i64> {
        self.delivery_at.map(|at| (at - now).num_hours())
    }

    /// Whether the scheduled delivery is already in the past.
    pub fn delivery_passed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.delivery_at, Some(at) if at <= now)
    }
}
