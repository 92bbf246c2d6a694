#![allow(dead_code)]

use async_trait::async_trait;
use broker::{Broker, BrokerError, HostDialogs, HostNotifier, QuoteFeed};
use configuration::Config;
use core_types::{
    AccountManagerData, Execution, Order, OrderFields, Position, PreOrder, QuoteData, Side,
    SymbolSnapshot,
};
use events::{HostEvent, OrderPartialUpdate, PlUpdate, PositionPartialUpdate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

/// Collects every host notification in arrival order.
#[derive(Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(HostEvent::kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn last_account(&self) -> Option<AccountManagerData> {
        self.events().into_iter().rev().find_map(|event| match event {
            HostEvent::AccountUpdate(data) => Some(data),
            _ => None,
        })
    }

    pub fn position_updates(&self) -> Vec<Position> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HostEvent::PositionUpdate(position) => Some(position),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: HostEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl HostNotifier for RecordingHost {
    fn order_update(&self, order: &Order) {
        self.push(HostEvent::OrderUpdate(order.clone()));
    }

    fn order_partial_update(&self, id: &str, fields: &OrderFields) {
        self.push(HostEvent::OrderPartialUpdate(OrderPartialUpdate {
            id: id.to_string(),
            fields: fields.clone(),
        }));
    }

    fn position_update(&self, position: &Position) {
        self.push(HostEvent::PositionUpdate(position.clone()));
    }

    fn position_partial_update(&self, id: &str, position: &Position) {
        self.push(HostEvent::PositionPartialUpdate(PositionPartialUpdate {
            id: id.to_string(),
            position: position.clone(),
        }));
    }

    fn execution_update(&self, execution: &Execution) {
        self.push(HostEvent::ExecutionUpdate(execution.clone()));
    }

    fn pl_update(&self, symbol: &str, value: Decimal) {
        self.push(HostEvent::PlUpdate(PlUpdate {
            symbol: symbol.to_string(),
            value,
        }));
    }

    fn account_update(&self, data: &AccountManagerData) {
        self.push(HostEvent::AccountUpdate(data.clone()));
    }
}

/// Records subscribe and unsubscribe calls without delivering anything.
#[derive(Default)]
pub struct RecordingFeed {
    subscribed: Mutex<Vec<(String, Vec<String>)>>,
    unsubscribed: Mutex<Vec<String>>,
}

impl RecordingFeed {
    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn symbols_for(&self, subscription_id: &str) -> Option<Vec<String>> {
        self.subscribed
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == subscription_id)
            .map(|(_, symbols)| symbols.clone())
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().unwrap().clone()
    }

    pub fn unsubscribe_count(&self, subscription_id: &str) -> usize {
        self.unsubscribed()
            .iter()
            .filter(|id| *id == subscription_id)
            .count()
    }
}

impl QuoteFeed for RecordingFeed {
    fn subscribe_quotes(&self, symbols: &[String], subscription_id: &str) {
        self.subscribed
            .lock()
            .unwrap()
            .push((subscription_id.to_string(), symbols.to_vec()));
    }

    fn unsubscribe_quotes(&self, subscription_id: &str) {
        self.unsubscribed
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
    }
}

/// Dialogs with a fixed answer, counting how often they were shown.
pub struct ScriptedDialogs {
    pub approve: bool,
    pub shown: Mutex<Vec<&'static str>>,
}

impl ScriptedDialogs {
    pub fn approving() -> Self {
        Self {
            approve: true,
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn dismissing() -> Self {
        Self {
            approve: false,
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn shown(&self) -> Vec<&'static str> {
        self.shown.lock().unwrap().clone()
    }

    fn show(&self, dialog: &'static str) -> bool {
        self.shown.lock().unwrap().push(dialog);
        self.approve
    }
}

#[async_trait]
impl HostDialogs for ScriptedDialogs {
    async fn show_order_dialog(&self, pre_order: &PreOrder) -> Option<PreOrder> {
        self.show("order").then(|| pre_order.clone())
    }

    async fn show_modify_dialog(&self, order: &Order) -> Option<Order> {
        self.show("modify").then(|| order.clone())
    }

    async fn show_cancel_order_dialog(&self, _order_id: &str) -> bool {
        self.show("cancel")
    }

    async fn show_cancel_multiple_orders_dialog(
        &self,
        _symbol: &str,
        _side: Option<Side>,
        _count: usize,
    ) -> bool {
        self.show("cancel-multiple")
    }

    async fn show_close_position_dialog(&self, _position_id: &str) -> bool {
        self.show("close")
    }

    async fn show_reverse_position_dialog(&self, _position: &Position) -> bool {
        self.show("reverse")
    }

    async fn symbol_snapshot(&self, symbol: &str) -> Result<SymbolSnapshot, BrokerError> {
        match symbol {
            "AAPL" => Ok(SymbolSnapshot {
                description: "Apple Inc.".to_string(),
                minmov: dec!(1),
                pricescale: dec!(100),
                last_price: Some(dec!(100)),
            }),
            other => Err(BrokerError::UnknownSymbol(other.to_string())),
        }
    }
}

pub struct Harness {
    pub broker: Broker,
    pub host: Arc<RecordingHost>,
    pub feed: Arc<RecordingFeed>,
}

impl Harness {
    pub fn new() -> Self {
        let host = Arc::new(RecordingHost::default());
        let feed = Arc::new(RecordingFeed::default());
        let broker = Broker::new(&Config::default(), feed.clone(), host.clone());
        Self { broker, host, feed }
    }

    /// Delivers `price` on the order's subscription.
    pub fn tick_order(&mut self, order_id: &str, symbol: &str, price: Decimal) {
        let subscription_id = order_subscription(order_id);
        self.broker
            .on_quotes(&subscription_id, &[QuoteData::last(symbol, price)]);
    }

    /// Delivers `price` on the position's subscription.
    pub fn tick_position(&mut self, symbol: &str, price: Decimal) {
        let subscription_id = position_subscription(symbol);
        self.broker
            .on_quotes(&subscription_id, &[QuoteData::last(symbol, price)]);
    }

    /// Places a market order and fills it at `price`.
    pub fn fill_market(&mut self, symbol: &str, side: Side, qty: Decimal, price: Decimal) -> Order {
        let order = self
            .broker
            .place_order(PreOrder::market(symbol, side, qty))
            .unwrap();
        self.tick_order(&order.id, symbol, price);
        self.broker.order(&order.id).cloned().unwrap()
    }
}

pub fn order_subscription(order_id: &str) -> String {
    format!("SampleBroker-order-{}", order_id)
}

pub fn position_subscription(symbol: &str) -> String {
    format!("SampleBroker-position-{}", symbol)
}

pub fn initial_balance() -> Decimal {
    dec!(10000000)
}

/// equity == balance + sum of open profit, and the aggregate PL matches the ledger.
pub fn assert_equity_invariant(broker: &Broker) {
    let account = broker.account();
    let open_profit: Decimal = broker.positions().iter().map(|p| p.profit).sum();
    assert_eq!(account.pl, open_profit);
    assert_eq!(account.equity, account.balance + open_profit);
}
