use crate::enums::{OrderDuration, OrderStatus, OrderType, QuoteStatus, Side};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// An order request as it comes from the order ticket, before the broker has
/// assigned an id. Side and type fall back to Buy / Market when omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreOrder {
    pub symbol: String,
    pub broker_symbol: Option<String>,
    pub order_type: Option<OrderType>,
    pub side: Option<Side>,
    pub qty: Decimal,
    pub status: Option<OrderStatus>,
    pub stop_price: Option<Decimal>,
    pub limit_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub duration: Option<OrderDuration>,
}

impl PreOrder {
    /// A plain market order, the shape used by close and reverse.
    pub fn market(symbol: impl Into<String>, side: Side, qty: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: Some(OrderType::Market),
            side: Some(side),
            qty,
            ..Default::default()
        }
    }

    /// Checks the fields an order cannot exist without.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.symbol.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "symbol".to_string(),
                "must not be empty".to_string(),
            ));
        }
        check_terms(self.qty, self.limit_price, self.stop_price)
    }

    /// True when the request carries brackets or a duration, which the
    /// simulator accepts but ignores.
    pub fn has_unsupported_fields(&self) -> bool {
        self.stop_loss.is_some() || self.take_profit.is_some() || self.duration.is_some()
    }
}

/// Largest quantity a single order may carry.
pub const MAX_ORDER_QTY: Decimal = dec!(1000000000000);

/// Largest limit or stop price an order may carry.
pub const MAX_ORDER_PRICE: Decimal = dec!(1000000000000);

fn check_terms(
    qty: Decimal,
    limit_price: Option<Decimal>,
    stop_price: Option<Decimal>,
) -> Result<(), CoreError> {
    if qty <= Decimal::ZERO || qty > MAX_ORDER_QTY {
        return Err(CoreError::InvalidInput(
            "qty".to_string(),
            format!("must be in (0, {}], got {}", MAX_ORDER_QTY, qty),
        ));
    }
    for (field, price) in [("limit_price", limit_price), ("stop_price", stop_price)] {
        if let Some(price) = price {
            if price <= Decimal::ZERO || price > MAX_ORDER_PRICE {
                return Err(CoreError::InvalidInput(
                    field.to_string(),
                    format!("must be in (0, {}], got {}", MAX_ORDER_PRICE, price),
                ));
            }
        }
    }
    Ok(())
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub broker_symbol: Option<String>,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub status: OrderStatus,
    /// Last observed tick price.
    pub last: Option<Decimal>,
    /// Seeded from the first tick; the execution price once filled.
    pub price: Option<Decimal>,
    pub avg_price: Option<Decimal>,
    pub profit: Decimal,
    pub duration: Option<OrderDuration>,
}

impl Order {
    /// Builds a working order from a validated request.
    pub fn from_pre_order(id: String, pre: &PreOrder) -> Self {
        Self {
            id,
            symbol: pre.symbol.clone(),
            broker_symbol: pre.broker_symbol.clone(),
            side: pre.side.unwrap_or_default(),
            order_type: pre.order_type.unwrap_or_default(),
            qty: pre.qty,
            limit_price: pre.limit_price,
            stop_price: pre.stop_price,
            status: OrderStatus::Working,
            last: None,
            price: None,
            avg_price: None,
            profit: Decimal::ZERO,
            duration: pre.duration.clone(),
        }
    }

    /// Checks the editable terms: quantity, limit and stop price.
    pub fn validate_terms(&self) -> Result<(), CoreError> {
        check_terms(self.qty, self.limit_price, self.stop_price)
    }

    /// The fields an order ticket can edit, in request form.
    pub fn to_pre_order(&self) -> PreOrder {
        PreOrder {
            symbol: self.symbol.clone(),
            broker_symbol: self.broker_symbol.clone(),
            order_type: Some(self.order_type),
            side: Some(self.side),
            qty: self.qty,
            status: Some(self.status),
            stop_price: self.stop_price,
            limit_price: self.limit_price,
            stop_loss: None,
            take_profit: None,
            duration: self.duration.clone(),
        }
    }
}

/// Partial order fields pushed to the host between full updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFields {
    pub last: Option<Decimal>,
}

/// An open position. The id is the symbol: one position per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub broker_symbol: Option<String>,
    pub side: Side,
    pub qty: Decimal,
    pub avg_price: Decimal,
    pub last: Option<Decimal>,
    pub profit: Decimal,
}

impl Position {
    /// Mark-to-market profit at `price`, positive when the price moved in the
    /// held side's favor. `None` if the amount does not fit in a `Decimal`.
    pub fn profit_at(&self, price: Decimal) -> Option<Decimal> {
        price
            .checked_sub(self.avg_price)?
            .checked_mul(self.qty)?
            .checked_mul(Decimal::from(self.side.sign()))
    }
}

/// An immutable fill record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub symbol: String,
    pub broker_symbol: Option<String>,
    pub price: Decimal,
    pub qty: Decimal,
    pub side: Side,
    pub time: DateTime<Utc>,
}

/// Values carried by a quote update. Only the last price matters here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteValues {
    #[serde(rename = "lp")]
    pub last_price: Option<Decimal>,
}

/// One symbol's entry in a quote feed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteData {
    #[serde(rename = "n")]
    pub symbol: String,
    #[serde(rename = "s")]
    pub status: QuoteStatus,
    #[serde(rename = "v")]
    pub values: QuoteValues,
}

impl QuoteData {
    pub fn last(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            status: QuoteStatus::Ok,
            values: QuoteValues {
                last_price: Some(price),
            },
        }
    }

    pub fn error(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            status: QuoteStatus::Error,
            values: QuoteValues::default(),
        }
    }
}

/// Symbol metadata as the host's datafeed reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub description: String,
    pub minmov: Decimal,
    pub pricescale: Decimal,
    pub last_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityMetainfo {
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Trading metadata for a symbol, as the order ticket needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub qty: QuantityMetainfo,
    pub pip_value: Decimal,
    pub pip_size: Decimal,
    pub min_tick: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub name: String,
    pub currency: String,
}

/// The account summary row shown by the account manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountManagerData {
    pub title: String,
    pub balance: Decimal,
    pub equity: Decimal,
    pub pl: Decimal,
}
