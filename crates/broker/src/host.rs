use crate::error::BrokerError;
use async_trait::async_trait;
use configuration::Config;
use core_types::{
    AccountManagerData, Execution, Order, OrderFields, Position, PreOrder, Side, SymbolSnapshot,
};
use events::{HostEvent, OrderPartialUpdate, PlUpdate, PositionPartialUpdate};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

/// The host UI's notification sink. Every call is fire-and-forget.
pub trait HostNotifier: Send + Sync {
    fn order_update(&self, order: &Order);
    fn order_partial_update(&self, id: &str, fields: &OrderFields);
    fn position_update(&self, position: &Position);
    fn position_partial_update(&self, id: &str, position: &Position);
    fn execution_update(&self, execution: &Execution);
    fn pl_update(&self, symbol: &str, value: Decimal);
    /// Account summary changed. Hosts that bind to the account watch channel
    /// instead can ignore this.
    fn account_update(&self, _data: &AccountManagerData) {}
}

/// Confirmation dialogs and datafeed lookups the broker asks the host for.
///
/// Returning `None` / `false` means the user dismissed the dialog; the broker
/// then leaves its state untouched.
#[async_trait]
pub trait HostDialogs: Send + Sync {
    /// Shows the order ticket. Returns the (possibly edited) request to place.
    async fn show_order_dialog(&self, pre_order: &PreOrder) -> Option<PreOrder>;
    /// Shows the ticket for an existing order. Returns the edited order.
    async fn show_modify_dialog(&self, order: &Order) -> Option<Order>;
    async fn show_cancel_order_dialog(&self, order_id: &str) -> bool;
    async fn show_cancel_multiple_orders_dialog(
        &self,
        symbol: &str,
        side: Option<Side>,
        count: usize,
    ) -> bool;
    async fn show_close_position_dialog(&self, position_id: &str) -> bool;
    async fn show_reverse_position_dialog(&self, position: &Position) -> bool;
    async fn symbol_snapshot(&self, symbol: &str) -> Result<SymbolSnapshot, BrokerError>;
}

/// Forwards every notification as a `HostEvent` over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: HostEvent) {
        // The host may have gone away; notifications are not acknowledged.
        let _ = self.tx.send(event);
    }
}

impl HostNotifier for ChannelNotifier {
    fn order_update(&self, order: &Order) {
        self.send(HostEvent::OrderUpdate(order.clone()));
    }

    fn order_partial_update(&self, id: &str, fields: &OrderFields) {
        self.send(HostEvent::OrderPartialUpdate(OrderPartialUpdate {
            id: id.to_string(),
            fields: fields.clone(),
        }));
    }

    fn position_update(&self, position: &Position) {
        self.send(HostEvent::PositionUpdate(position.clone()));
    }

    fn position_partial_update(&self, id: &str, position: &Position) {
        self.send(HostEvent::PositionPartialUpdate(PositionPartialUpdate {
            id: id.to_string(),
            position: position.clone(),
        }));
    }

    fn execution_update(&self, execution: &Execution) {
        self.send(HostEvent::ExecutionUpdate(execution.clone()));
    }

    fn pl_update(&self, symbol: &str, value: Decimal) {
        self.send(HostEvent::PlUpdate(PlUpdate {
            symbol: symbol.to_string(),
            value,
        }));
    }

    fn account_update(&self, data: &AccountManagerData) {
        self.send(HostEvent::AccountUpdate(data.clone()));
    }
}

/// Dialogs that confirm everything unchanged, with symbol metadata served
/// from configuration. Used for headless sessions.
#[derive(Debug, Clone, Default)]
pub struct AutoConfirm {
    config: Config,
}

impl AutoConfirm {
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl HostDialogs for AutoConfirm {
    async fn show_order_dialog(&self, pre_order: &PreOrder) -> Option<PreOrder> {
        Some(pre_order.clone())
    }

    async fn show_modify_dialog(&self, order: &Order) -> Option<Order> {
        Some(order.clone())
    }

    async fn show_cancel_order_dialog(&self, _order_id: &str) -> bool {
        true
    }

    async fn show_cancel_multiple_orders_dialog(
        &self,
        _symbol: &str,
        _side: Option<Side>,
        _count: usize,
    ) -> bool {
        true
    }

    async fn show_close_position_dialog(&self, _position_id: &str) -> bool {
        true
    }

    async fn show_reverse_position_dialog(&self, _position: &Position) -> bool {
        true
    }

    async fn symbol_snapshot(&self, symbol: &str) -> Result<SymbolSnapshot, BrokerError> {
        let settings = self
            .config
            .symbol(symbol)
            .ok_or_else(|| BrokerError::UnknownSymbol(symbol.to_string()))?;

        Ok(SymbolSnapshot {
            description: settings.description.clone(),
            minmov: settings.minmov,
            pricescale: settings.pricescale,
            last_price: None,
        })
    }
}
