use crate::fill::{FillCheck, check_fill};
use core_types::{Order, OrderStatus, PreOrder, Side};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

/// What the ledger needs to book a fill.
#[derive(Debug, Clone, PartialEq)]
pub struct FillRequest {
    pub symbol: String,
    pub broker_symbol: Option<String>,
    pub side: Side,
    pub qty: Decimal,
    pub price: Decimal,
}

/// Result of feeding one tick to one order.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTick {
    /// Unknown id, terminal order, or the same price as last time.
    Ignored,
    /// The order saw a new price but did not execute.
    Updated(Order),
    /// The order executed at the tick price and is now Filled.
    Filled { order: Order, fill: FillRequest },
}

/// Owns every order the broker has accepted.
///
/// Orders are never removed; `orders()` returns them in placement order.
#[derive(Debug, Default)]
pub struct OrderBook {
    by_id: HashMap<String, Order>,
    order_ids: Vec<String>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a working order built from `pre` under `id`.
    pub fn place(&mut self, id: String, pre: &PreOrder) -> Order {
        let order = Order::from_pre_order(id, pre);
        self.order_ids.push(order.id.clone());
        self.by_id.insert(order.id.clone(), order.clone());
        order
    }

    /// Copies quantity, stop price and limit price from `changes` onto the
    /// stored order with the same id. Unknown and terminal orders are left alone.
    pub fn modify(&mut self, changes: &Order) -> Option<Order> {
        let order = self.by_id.get_mut(&changes.id)?;
        if order.status.is_terminal() {
            debug!(order_id = %order.id, status = %order.status, "modify of a terminal order ignored");
            return None;
        }
        order.qty = changes.qty;
        order.stop_price = changes.stop_price;
        order.limit_price = changes.limit_price;
        Some(order.clone())
    }

    /// Marks a live order Canceled.
    pub fn cancel(&mut self, id: &str) -> Option<Order> {
        let order = self.by_id.get_mut(id)?;
        if order.status.is_terminal() {
            debug!(order_id = %id, status = %order.status, "cancel of a terminal order ignored");
            return None;
        }
        order.status = OrderStatus::Canceled;
        Some(order.clone())
    }

    /// Marks an order Rejected after its fill could not be booked.
    pub fn reject(&mut self, id: &str) -> Option<Order> {
        let order = self.by_id.get_mut(id)?;
        order.status = OrderStatus::Rejected;
        order.avg_price = None;
        Some(order.clone())
    }

    /// Feeds `last` to the order. Seeding the price, evaluating the fill and
    /// flipping the status happen in one step, so an order fills at most once.
    pub fn on_tick(&mut self, id: &str, last: Decimal) -> OrderTick {
        let Some(order) = self.by_id.get_mut(id) else {
            return OrderTick::Ignored;
        };
        if order.status.is_terminal() || order.last == Some(last) {
            return OrderTick::Ignored;
        }

        order.last = Some(last);
        if order.price.is_none() {
            order.price = Some(last);
        }

        if order.status != OrderStatus::Working {
            return OrderTick::Updated(order.clone());
        }

        match check_fill(order, last) {
            FillCheck::Fill => {
                order.price = Some(last);
                order.avg_price = Some(last);
                order.status = OrderStatus::Filled;
                let fill = FillRequest {
                    symbol: order.symbol.clone(),
                    broker_symbol: order.broker_symbol.clone(),
                    side: order.side,
                    qty: order.qty,
                    price: last,
                };
                OrderTick::Filled {
                    order: order.clone(),
                    fill,
                }
            }
            FillCheck::Wait | FillCheck::Unsupported => OrderTick::Updated(order.clone()),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Order> {
        self.by_id.get(id)
    }

    pub fn orders(&self) -> Vec<Order> {
        self.order_ids
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }
}
