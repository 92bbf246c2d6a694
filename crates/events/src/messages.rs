use crate::error::EventsError;
use chrono::{DateTime, Utc};
use core_types::{AccountManagerData, Execution, Order, OrderFields, Position};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Partial order fields addressed by order id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPartialUpdate {
    pub id: String,
    pub fields: OrderFields,
}

/// Partial position refresh addressed by position id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPartialUpdate {
    pub id: String,
    pub position: Position,
}

/// Running profit for the position on `symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlUpdate {
    pub symbol: String,
    pub value: Decimal,
}

/// Every notification the broker sends to its host.
///
/// Serialized with `#[serde(tag = "type", content = "payload")]`, so an
/// execution looks like:
/// `{
///   "type": "ExecutionUpdate",
///   "payload": { "id": "2", "symbol": "AAPL", ... }
/// }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum HostEvent {
    /// Full order record; sent on placement, modification and every status change.
    OrderUpdate(Order),
    /// The order's last observed price moved.
    OrderPartialUpdate(OrderPartialUpdate),
    /// Full position record. A zero quantity means the position was closed.
    PositionUpdate(Position),
    /// The position's last price and profit moved.
    PositionPartialUpdate(PositionPartialUpdate),
    /// A fill was recorded.
    ExecutionUpdate(Execution),
    /// Profit for the chart's position line.
    PlUpdate(PlUpdate),
    /// Balance / equity / PL summary changed.
    AccountUpdate(AccountManagerData),
}

impl HostEvent {
    /// Short label for logs and tables.
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::OrderUpdate(_) => "order",
            HostEvent::OrderPartialUpdate(_) => "order-partial",
            HostEvent::PositionUpdate(_) => "position",
            HostEvent::PositionPartialUpdate(_) => "position-partial",
            HostEvent::ExecutionUpdate(_) => "execution",
            HostEvent::PlUpdate(_) => "pl",
            HostEvent::AccountUpdate(_) => "account",
        }
    }
}

/// A host event with the wall-clock time it was emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedEvent {
    pub timestamp: DateTime<Utc>,
    pub event: HostEvent,
}

impl StampedEvent {
    pub fn now(event: HostEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }

    /// One JSON object per line, for event logs.
    pub fn to_json_line(&self) -> Result<String, EventsError> {
        Ok(serde_json::to_string(self)?)
    }
}
