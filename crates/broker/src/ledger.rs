use crate::error::BrokerError;
use crate::order_book::FillRequest;
use chrono::{DateTime, Utc};
use core_types::{Execution, Position};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

/// How a fill changed the position on its symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionChange {
    Opened,
    Increased,
    Reduced,
    /// An opposite fill larger than the position: the excess opens the other side.
    Flipped,
    Closed,
}

/// Everything a single fill produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerUpdate {
    pub execution: Execution,
    /// The position after the fill. Quantity is zero when `change` is `Closed`.
    pub position: Position,
    pub change: PositionChange,
    /// Profit locked in by the reducing part of the fill, to be credited to the balance.
    pub realized_pnl: Decimal,
}

/// Owns open positions, one per symbol, keyed by position id (= symbol).
#[derive(Debug, Default)]
pub struct PositionLedger {
    by_id: HashMap<String, Position>,
    position_ids: Vec<String>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Works out what booking `fill` would do, without touching the ledger.
    /// Fails if any resulting amount does not fit in a `Decimal`.
    pub fn preview(
        &self,
        fill: &FillRequest,
        execution_id: String,
        time: DateTime<Utc>,
    ) -> Result<LedgerUpdate, BrokerError> {
        let execution = Execution {
            id: execution_id,
            symbol: fill.symbol.clone(),
            broker_symbol: fill.broker_symbol.clone(),
            price: fill.price,
            qty: fill.qty,
            side: fill.side,
            time,
        };
        let overflow = || {
            BrokerError::Overflow(format!(
                "{} {} {} @ {}",
                fill.side, fill.qty, fill.symbol, fill.price
            ))
        };

        let Some(current) = self.by_id.get(&fill.symbol) else {
            let position = Position {
                id: fill.symbol.clone(),
                symbol: fill.symbol.clone(),
                broker_symbol: fill.broker_symbol.clone(),
                side: fill.side,
                qty: fill.qty,
                avg_price: fill.price,
                last: Some(fill.price),
                profit: Decimal::ZERO,
            };
            return Ok(LedgerUpdate {
                execution,
                position,
                change: PositionChange::Opened,
                realized_pnl: Decimal::ZERO,
            });
        };

        let mut position = current.clone();
        let mut realized_pnl = Decimal::ZERO;
        let change = if position.side == fill.side {
            let total_qty = position.qty.checked_add(fill.qty).ok_or_else(overflow)?;
            let cost = position
                .qty
                .checked_mul(position.avg_price)
                .zip(fill.qty.checked_mul(fill.price))
                .and_then(|(held, added)| held.checked_add(added))
                .ok_or_else(overflow)?;
            position.avg_price = cost.checked_div(total_qty).ok_or_else(overflow)?;
            position.qty = total_qty;
            PositionChange::Increased
        } else {
            let closed_qty = fill.qty.min(position.qty);
            realized_pnl = fill
                .price
                .checked_sub(position.avg_price)
                .and_then(|diff| diff.checked_mul(closed_qty))
                .and_then(|pnl| pnl.checked_mul(Decimal::from(position.side.sign())))
                .ok_or_else(overflow)?;

            match fill.qty.cmp(&position.qty) {
                Ordering::Less => {
                    position.qty -= fill.qty;
                    PositionChange::Reduced
                }
                Ordering::Equal => {
                    position.qty = Decimal::ZERO;
                    PositionChange::Closed
                }
                Ordering::Greater => {
                    // The surviving excess takes the fill price as its basis.
                    position.qty = fill.qty - position.qty;
                    position.side = position.side.opposite();
                    position.avg_price = fill.price;
                    PositionChange::Flipped
                }
            }
        };

        position.last = Some(fill.price);
        position.profit = if change == PositionChange::Closed {
            Decimal::ZERO
        } else {
            position.profit_at(fill.price).ok_or_else(overflow)?
        };

        Ok(LedgerUpdate {
            execution,
            position,
            change,
            realized_pnl,
        })
    }

    /// Applies a previewed update.
    pub fn commit(&mut self, update: &LedgerUpdate) {
        let position = &update.position;
        match update.change {
            PositionChange::Opened => {
                self.position_ids.push(position.id.clone());
                self.by_id.insert(position.id.clone(), position.clone());
            }
            PositionChange::Closed => {
                self.position_ids.retain(|existing| *existing != position.id);
                self.by_id.remove(&position.id);
            }
            PositionChange::Increased | PositionChange::Reduced | PositionChange::Flipped => {
                self.by_id.insert(position.id.clone(), position.clone());
            }
        }
    }

    /// Marks the position to `last`. Returns the refreshed position, or `None`
    /// when the id is unknown, the price did not change, or the profit at
    /// `last` is out of range.
    pub fn on_tick(&mut self, id: &str, last: Decimal) -> Option<Position> {
        let position = self.by_id.get_mut(id)?;
        if position.last == Some(last) {
            return None;
        }
        let Some(profit) = position.profit_at(last) else {
            warn!(position_id = id, price = %last, "profit out of range; tick skipped");
            return None;
        };
        position.last = Some(last);
        position.profit = profit;
        Some(position.clone())
    }

    pub fn get(&self, id: &str) -> Option<&Position> {
        self.by_id.get(id)
    }

    pub fn positions(&self) -> Vec<Position> {
        self.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.position_ids.iter().filter_map(|id| self.by_id.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Side;
    use rust_decimal_macros::dec;

    fn fill(side: Side, qty: Decimal, price: Decimal) -> FillRequest {
        FillRequest {
            symbol: "AAPL".to_string(),
            broker_symbol: None,
            side,
            qty,
            price,
        }
    }

    fn book(ledger: &mut PositionLedger, side: Side, qty: Decimal, price: Decimal) -> LedgerUpdate {
        let update = ledger
            .preview(&fill(side, qty, price), "1".to_string(), Utc::now())
            .unwrap();
        ledger.commit(&update);
        update
    }

    #[test]
    fn same_side_fill_averages_price() {
        let mut ledger = PositionLedger::new();
        assert_eq!(book(&mut ledger, Side::Buy, dec!(10), dec!(100)).change, PositionChange::Opened);

        let update = book(&mut ledger, Side::Buy, dec!(5), dec!(106));
        assert_eq!(update.change, PositionChange::Increased);
        assert_eq!(update.position.qty, dec!(15));
        assert_eq!(update.position.avg_price, dec!(102));
        assert_eq!(update.realized_pnl, Decimal::ZERO);
        // Marked at the fill price: (106 - 102) * 15.
        assert_eq!(update.position.profit, dec!(60));
    }

    #[test]
    fn opposite_fill_realizes_and_keeps_basis() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Buy, dec!(10), dec!(100));

        let update = book(&mut ledger, Side::Sell, dec!(4), dec!(110));
        assert_eq!(update.change, PositionChange::Reduced);
        assert_eq!(update.realized_pnl, dec!(40));
        assert_eq!(update.position.side, Side::Buy);
        assert_eq!(update.position.qty, dec!(6));
        assert_eq!(update.position.avg_price, dec!(100));
    }

    #[test]
    fn short_reduction_realizes_with_inverted_sign() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Sell, dec!(10), dec!(100));

        let update = book(&mut ledger, Side::Buy, dec!(5), dec!(90));
        assert_eq!(update.realized_pnl, dec!(50));
        assert_eq!(update.position.side, Side::Sell);
    }

    #[test]
    fn over_fill_flips_side_at_fill_price() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Buy, dec!(6), dec!(100));

        let update = book(&mut ledger, Side::Sell, dec!(10), dec!(90));
        assert_eq!(update.change, PositionChange::Flipped);
        assert_eq!(update.realized_pnl, dec!(-60));
        assert_eq!(update.position.side, Side::Sell);
        assert_eq!(update.position.qty, dec!(4));
        assert_eq!(update.position.avg_price, dec!(90));
        assert_eq!(ledger.get("AAPL").unwrap().qty, dec!(4));
    }

    #[test]
    fn exact_offset_closes_and_removes() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Buy, dec!(3), dec!(100));

        let update = book(&mut ledger, Side::Sell, dec!(3), dec!(95));
        assert_eq!(update.change, PositionChange::Closed);
        assert_eq!(update.realized_pnl, dec!(-15));
        assert_eq!(update.position.qty, Decimal::ZERO);
        assert_eq!(update.position.last, Some(dec!(95)));
        assert!(ledger.get("AAPL").is_none());
        assert!(ledger.positions().is_empty());
    }

    #[test]
    fn preview_leaves_ledger_untouched() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Buy, dec!(10), dec!(100));

        let update = ledger
            .preview(&fill(Side::Sell, dec!(10), dec!(120)), "2".to_string(), Utc::now())
            .unwrap();
        assert_eq!(update.change, PositionChange::Closed);
        assert_eq!(ledger.get("AAPL").unwrap().qty, dec!(10));
    }

    #[test]
    fn overflowing_fill_is_refused() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Buy, Decimal::MAX, dec!(1));

        let err = ledger
            .preview(&fill(Side::Buy, dec!(1), dec!(5)), "2".to_string(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, BrokerError::Overflow(_)));
        assert_eq!(ledger.get("AAPL").unwrap().qty, Decimal::MAX);
    }

    #[test]
    fn tick_marks_to_market_once_per_price() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Sell, dec!(2), dec!(50));

        let marked = ledger.on_tick("AAPL", dec!(45)).unwrap();
        assert_eq!(marked.profit, dec!(10));
        assert!(ledger.on_tick("AAPL", dec!(45)).is_none());
        assert!(ledger.on_tick("MSFT", dec!(45)).is_none());
    }

    #[test]
    fn out_of_range_tick_is_skipped() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Buy, dec!(100000000000000000000), dec!(1000000000));

        assert!(ledger.on_tick("AAPL", dec!(2000000000)).is_none());
        let position = ledger.get("AAPL").unwrap();
        assert_eq!(position.last, Some(dec!(1000000000)));
        assert_eq!(position.profit, Decimal::ZERO);
    }
}
