use crate::account::AccountManagerInfo;
use crate::broker::{Broker, instrument_info};
use crate::error::BrokerError;
use crate::host::HostDialogs;
use crate::quotes::QuoteDelivery;
use core_types::{
    AccountInfo, AccountManagerData, ConnectionStatus, Execution, InstrumentInfo, Order, Position,
    PreOrder,
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The host-facing broker: every user action goes through a confirmation
/// dialog first, then runs on the shared `Broker`.
///
/// Dialogs are awaited without holding the broker lock, so quote deliveries
/// keep flowing while the user looks at a ticket. A dismissed dialog returns
/// `Ok(None)` (or an empty list) and changes nothing.
#[derive(Clone)]
pub struct TradingSession {
    broker: Arc<Mutex<Broker>>,
    dialogs: Arc<dyn HostDialogs>,
}

impl TradingSession {
    pub fn new(broker: Broker, dialogs: Arc<dyn HostDialogs>) -> Self {
        Self {
            broker: Arc::new(Mutex::new(broker)),
            dialogs,
        }
    }

    /// The shared broker, for the quote pump and for direct inspection.
    pub fn broker(&self) -> Arc<Mutex<Broker>> {
        self.broker.clone()
    }

    /// Starts a task that applies every delivery from `rx` to the broker.
    pub fn spawn_quote_pump(&self, rx: mpsc::UnboundedReceiver<QuoteDelivery>) -> JoinHandle<()> {
        tokio::spawn(pump_quotes(self.broker.clone(), rx))
    }

    // --- Orders ---

    pub async fn place_order(&self, pre_order: PreOrder) -> Result<Option<Order>, BrokerError> {
        let Some(confirmed) = self.dialogs.show_order_dialog(&pre_order).await else {
            info!(symbol = %pre_order.symbol, "order dialog dismissed");
            return Ok(None);
        };
        self.broker.lock().await.place_order(confirmed).map(Some)
    }

    pub async fn modify_order(&self, order: &Order) -> Result<Option<Order>, BrokerError> {
        let Some(current) = self.order(&order.id).await else {
            debug!(order_id = %order.id, "modify of unknown order ignored");
            return Ok(None);
        };
        if current.status.is_terminal() {
            debug!(order_id = %order.id, status = %current.status, "modify of a terminal order ignored");
            return Ok(None);
        }
        let Some(edited) = self.dialogs.show_modify_dialog(order).await else {
            info!(order_id = %order.id, "modify dialog dismissed");
            return Ok(None);
        };
        self.broker.lock().await.modify_order(&edited)
    }

    pub async fn cancel_order(&self, order_id: &str) -> Option<Order> {
        if !self.is_live(order_id).await {
            debug!(order_id, "cancel ignored");
            return None;
        }
        if !self.dialogs.show_cancel_order_dialog(order_id).await {
            info!(order_id, "cancel dialog dismissed");
            return None;
        }
        self.broker.lock().await.cancel_order(order_id)
    }

    /// Cancels several orders of one symbol behind a single confirmation.
    pub async fn cancel_orders(&self, symbol: &str, order_ids: &[String]) -> Vec<Order> {
        // Side is only shown when every order shares it.
        let side = {
            let broker = self.broker.lock().await;
            let mut sides = order_ids
                .iter()
                .filter_map(|id| broker.order(id))
                .map(|order| order.side);
            match sides.next() {
                Some(first) if sides.all(|side| side == first) => Some(first),
                _ => None,
            }
        };

        if !self
            .dialogs
            .show_cancel_multiple_orders_dialog(symbol, side, order_ids.len())
            .await
        {
            info!(symbol, count = order_ids.len(), "cancel dialog dismissed");
            return Vec::new();
        }
        self.broker.lock().await.cancel_orders(order_ids)
    }

    // --- Positions ---

    pub async fn close_position(&self, position_id: &str) -> Result<Option<Order>, BrokerError> {
        if self.position(position_id).await.is_none() {
            debug!(position_id, "no open position to close");
            return Ok(None);
        }
        if !self.dialogs.show_close_position_dialog(position_id).await {
            info!(position_id, "close dialog dismissed");
            return Ok(None);
        }
        self.broker.lock().await.close_position(position_id)
    }

    pub async fn reverse_position(&self, position_id: &str) -> Result<Option<Order>, BrokerError> {
        let Some(position) = self.position(position_id).await else {
            debug!(position_id, "no open position to reverse");
            return Ok(None);
        };
        if !self.dialogs.show_reverse_position_dialog(&position).await {
            info!(position_id, "reverse dialog dismissed");
            return Ok(None);
        }
        self.broker.lock().await.reverse_position(position_id)
    }

    // --- Queries ---

    pub async fn orders(&self) -> Vec<Order> {
        self.broker.lock().await.orders()
    }

    pub async fn order(&self, order_id: &str) -> Option<Order> {
        self.broker.lock().await.order(order_id).cloned()
    }

    pub async fn positions(&self) -> Vec<Position> {
        self.broker.lock().await.positions()
    }

    pub async fn position(&self, position_id: &str) -> Option<Position> {
        self.broker.lock().await.position(position_id).cloned()
    }

    pub async fn executions(&self, symbol: &str) -> Vec<Execution> {
        self.broker.lock().await.executions(symbol)
    }

    pub async fn account(&self) -> AccountManagerData {
        self.broker.lock().await.account()
    }

    pub async fn account_updates(&self) -> watch::Receiver<AccountManagerData> {
        self.broker.lock().await.account_updates()
    }

    pub async fn account_info(&self) -> AccountInfo {
        self.broker.lock().await.account_info()
    }

    pub async fn account_manager_info(&self) -> AccountManagerInfo {
        self.broker.lock().await.account_manager_info()
    }

    pub async fn connection_status(&self) -> ConnectionStatus {
        self.broker.lock().await.connection_status()
    }

    pub async fn is_tradable(&self, symbol: &str) -> bool {
        self.broker.lock().await.is_tradable(symbol)
    }

    /// Order-ticket metadata, built from the host datafeed's symbol snapshot.
    pub async fn symbol_info(&self, symbol: &str) -> Result<InstrumentInfo, BrokerError> {
        let snapshot = self.dialogs.symbol_snapshot(symbol).await?;
        Ok(instrument_info(&snapshot))
    }

    async fn is_live(&self, order_id: &str) -> bool {
        self.order(order_id)
            .await
            .is_some_and(|order| !order.status.is_terminal())
    }
}

/// Applies quote deliveries to the broker until the feed side of the channel
/// is dropped. Each delivery is handled under one lock acquisition.
pub async fn pump_quotes(broker: Arc<Mutex<Broker>>, mut rx: mpsc::UnboundedReceiver<QuoteDelivery>) {
    while let Some(delivery) = rx.recv().await {
        broker.lock().await.handle_delivery(&delivery);
    }
    debug!("quote feed closed, pump stopping");
}
