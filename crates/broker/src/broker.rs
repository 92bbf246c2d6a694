use crate::account::{AccountAggregator, AccountManagerInfo, SummaryField};
use crate::error::BrokerError;
use crate::execution_log::ExecutionLog;
use crate::host::HostNotifier;
use crate::ids::IdSequence;
use crate::ledger::{PositionChange, PositionLedger};
use crate::order_book::{FillRequest, OrderBook, OrderTick};
use crate::quotes::{Listener, QuoteDelivery, QuoteFeed, QuoteSubscriptions};
use chrono::Utc;
use configuration::Config;
use core_types::{
    AccountInfo, AccountManagerData, ConnectionStatus, Execution, InstrumentInfo, Order,
    MAX_ORDER_QTY, OrderFields, OrderType, Position, PreOrder, QuantityMetainfo, QuoteData,
    SymbolSnapshot,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// The simulated broker: orders, positions, fills and the account, driven by
/// quote deliveries.
///
/// Every method here is the "silent" path: no confirmation is asked for.
/// Mutations take `&mut self`, so one tick or one request is applied as a
/// single step. `TradingSession` adds the confirmation dialogs and shares the
/// broker between the host and the quote pump.
pub struct Broker {
    ids: IdSequence,
    orders: OrderBook,
    ledger: PositionLedger,
    account: AccountAggregator,
    executions: ExecutionLog,
    quotes: QuoteSubscriptions,
    host: Arc<dyn HostNotifier>,
    account_info: AccountInfo,
}

impl Broker {
    pub fn new(config: &Config, feed: Arc<dyn QuoteFeed>, host: Arc<dyn HostNotifier>) -> Self {
        let account = &config.account;
        Self {
            ids: IdSequence::new(),
            orders: OrderBook::new(),
            ledger: PositionLedger::new(),
            account: AccountAggregator::new(account.title.clone(), account.initial_balance),
            executions: ExecutionLog::new(),
            quotes: QuoteSubscriptions::new(feed, config.broker.subscription_prefix.clone()),
            host,
            account_info: AccountInfo {
                id: account.title.clone(),
                name: String::new(),
                currency: account.currency.clone(),
            },
        }
    }

    // --- Order operations ---

    /// Accepts an order, subscribes it to its symbol's quotes and tells the host.
    pub fn place_order(&mut self, pre: PreOrder) -> Result<Order, BrokerError> {
        pre.validate()?;

        if pre.has_unsupported_fields() {
            warn!(
                symbol = %pre.symbol,
                "stop loss, take profit and duration are not supported; ignoring them"
            );
        }
        if pre.order_type == Some(OrderType::StopLimit) {
            warn!(symbol = %pre.symbol, "stop-limit orders are accepted but never execute");
        }

        let id = self.ids.next_id();
        let order = self.orders.place(id, &pre);
        self.quotes
            .subscribe(&order.symbol, Listener::Order(order.id.clone()));

        info!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            order_type = %order.order_type,
            qty = %order.qty,
            "order placed"
        );
        self.host.order_update(&order);
        Ok(order)
    }

    /// Replaces quantity, limit and stop price of a live order. Unknown and
    /// terminal ids are a no-op.
    pub fn modify_order(&mut self, changes: &Order) -> Result<Option<Order>, BrokerError> {
        let Some(current) = self.orders.get(&changes.id) else {
            debug!(order_id = %changes.id, "modify of unknown order ignored");
            return Ok(None);
        };
        if current.status.is_terminal() {
            debug!(order_id = %changes.id, status = %current.status, "modify of a terminal order ignored");
            return Ok(None);
        }
        changes.validate_terms()?;

        let Some(order) = self.orders.modify(changes) else {
            return Ok(None);
        };
        info!(order_id = %order.id, qty = %order.qty, "order modified");
        self.host.order_update(&order);
        Ok(Some(order))
    }

    /// Cancels a live order and releases its quote subscription. Unknown and
    /// terminal ids are a no-op.
    pub fn cancel_order(&mut self, id: &str) -> Option<Order> {
        let Some(order) = self.orders.cancel(id) else {
            debug!(order_id = %id, "cancel ignored");
            return None;
        };
        self.quotes.release(&Listener::Order(order.id.clone()));
        info!(order_id = %order.id, "order canceled");
        self.host.order_update(&order);
        Some(order)
    }

    pub fn cancel_orders(&mut self, ids: &[String]) -> Vec<Order> {
        ids.iter().filter_map(|id| self.cancel_order(id)).collect()
    }

    // --- Position operations ---

    /// Places an opposite-side market order for the position's full quantity.
    pub fn close_position(&mut self, position_id: &str) -> Result<Option<Order>, BrokerError> {
        self.offset_position(position_id, Decimal::ONE)
    }

    /// Places an opposite-side market order for twice the position's quantity.
    pub fn reverse_position(&mut self, position_id: &str) -> Result<Option<Order>, BrokerError> {
        self.offset_position(position_id, Decimal::TWO)
    }

    fn offset_position(
        &mut self,
        position_id: &str,
        multiplier: Decimal,
    ) -> Result<Option<Order>, BrokerError> {
        let Some(position) = self.ledger.get(position_id) else {
            debug!(position_id, "no open position to offset");
            return Ok(None);
        };
        let qty = position.qty.checked_mul(multiplier).ok_or_else(|| {
            BrokerError::Overflow(format!("offset of {} {}", position.qty, position.symbol))
        })?;
        let pre = PreOrder::market(position.symbol.clone(), position.side.opposite(), qty);
        self.place_order(pre).map(Some)
    }

    // --- Quote handling ---

    pub fn handle_delivery(&mut self, delivery: &QuoteDelivery) {
        self.on_quotes(&delivery.subscription_id, &delivery.quotes);
    }

    /// Entry point for the quote feed.
    pub fn on_quotes(&mut self, subscription_id: &str, quotes: &[QuoteData]) {
        let Some(listener) = self.quotes.resolve(subscription_id).cloned() else {
            debug!(subscription_id, "delivery for inactive subscription dropped");
            return;
        };
        let Some(last) = QuoteSubscriptions::last_price(quotes) else {
            return;
        };

        match listener {
            Listener::Order(id) => self.on_order_tick(&id, last),
            Listener::Position(id) => self.on_position_tick(&id, last),
        }
    }

    fn on_order_tick(&mut self, order_id: &str, last: Decimal) {
        match self.orders.on_tick(order_id, last) {
            OrderTick::Ignored => {}
            OrderTick::Updated(order) => {
                self.host
                    .order_partial_update(&order.id, &OrderFields { last: order.last });
            }
            OrderTick::Filled { order, fill } => {
                let order = match self.apply_fill(&fill) {
                    Ok(()) => {
                        info!(order_id = %order.id, symbol = %order.symbol, price = %last, "order filled");
                        order
                    }
                    Err(e) => {
                        warn!(order_id = %order.id, error = %e, "fill could not be booked; order rejected");
                        self.orders.reject(&order.id).unwrap_or(order)
                    }
                };
                self.quotes.release(&Listener::Order(order.id.clone()));
                self.host.order_update(&order);
                self.host
                    .order_partial_update(&order.id, &OrderFields { last: order.last });
            }
        }
    }

    fn on_position_tick(&mut self, position_id: &str, last: Decimal) {
        let Some(position) = self.ledger.on_tick(position_id, last) else {
            return;
        };
        debug!(position_id, price = %last, profit = %position.profit, "position marked");
        self.host.pl_update(&position.symbol, position.profit);
        self.host.position_partial_update(&position.id, &position);
        self.recalculate_account();
    }

    /// Books a fill. Nothing changes if any resulting amount is out of range.
    fn apply_fill(&mut self, fill: &FillRequest) -> Result<(), BrokerError> {
        let execution_id = self.ids.next_id();
        let update = self.ledger.preview(fill, execution_id, Utc::now())?;
        if !update.realized_pnl.is_zero() {
            self.account.realize(update.realized_pnl)?;
        }
        self.ledger.commit(&update);

        self.executions.record(update.execution.clone());
        self.host.execution_update(&update.execution);

        let listener = Listener::Position(update.position.id.clone());
        match update.change {
            PositionChange::Opened => {
                self.quotes.subscribe(&update.position.symbol, listener);
            }
            PositionChange::Closed => {
                self.quotes.release(&listener);
                info!(
                    symbol = %update.position.symbol,
                    realized = %update.realized_pnl,
                    "position closed"
                );
            }
            PositionChange::Increased | PositionChange::Reduced | PositionChange::Flipped => {}
        }

        self.host.position_update(&update.position);
        self.recalculate_account();
        Ok(())
    }

    fn recalculate_account(&mut self) {
        match self.account.recompute(self.ledger.iter()) {
            Ok(data) => {
                debug!(balance = %data.balance, equity = %data.equity, pl = %data.pl, "account recalculated");
                self.host.account_update(data);
            }
            Err(e) => warn!(error = %e, "account summary not updated"),
        }
    }

    // --- Queries ---

    pub fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus::Connected
    }

    pub fn is_tradable(&self, _symbol: &str) -> bool {
        true
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.orders()
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn positions(&self) -> Vec<Position> {
        self.ledger.positions()
    }

    pub fn position(&self, id: &str) -> Option<&Position> {
        self.ledger.get(id)
    }

    pub fn executions(&self, symbol: &str) -> Vec<Execution> {
        self.executions.for_symbol(symbol)
    }

    pub fn all_executions(&self) -> &[Execution] {
        self.executions.all()
    }

    pub fn account(&self) -> AccountManagerData {
        self.account.snapshot()
    }

    pub fn account_updates(&self) -> watch::Receiver<AccountManagerData> {
        self.account.subscribe()
    }

    pub fn account_info(&self) -> AccountInfo {
        self.account_info.clone()
    }

    pub fn account_manager_info(&self) -> AccountManagerInfo {
        let data = self.account.snapshot();
        AccountManagerInfo {
            account_title: data.title.clone(),
            summary: vec![
                SummaryField {
                    text: "Balance".to_string(),
                    value: data.balance,
                },
                SummaryField {
                    text: "Equity".to_string(),
                    value: data.equity,
                },
            ],
            updates: self.account.subscribe(),
        }
    }

    /// Number of quote subscriptions currently held on the feed.
    pub fn active_subscriptions(&self) -> usize {
        self.quotes.active_count()
    }
}

/// Order-ticket metadata for a symbol: unit quantity steps up to the largest
/// accepted order, a pip equal to the minimal tick, and a point value of one
/// account-currency unit.
pub fn instrument_info(snapshot: &SymbolSnapshot) -> InstrumentInfo {
    let min_tick = if snapshot.pricescale.is_zero() {
        Decimal::ZERO
    } else {
        snapshot.minmov / snapshot.pricescale
    };
    let pip_size = min_tick;
    let point_value = Decimal::ONE;
    let account_currency_rate = Decimal::ONE;
    let pip_value = match pip_size * point_value * account_currency_rate {
        value if value.is_zero() => Decimal::ONE,
        value => value,
    };

    InstrumentInfo {
        qty: QuantityMetainfo {
            min: Decimal::ONE,
            max: MAX_ORDER_QTY,
            step: Decimal::ONE,
        },
        pip_value,
        pip_size,
        min_tick,
        description: snapshot.description.clone(),
    }
}
