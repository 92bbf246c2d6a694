use core_types::{QuoteData, QuoteStatus};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The quote source the broker subscribes to.
///
/// Ticks are not returned from these calls: the feed later hands a
/// `QuoteDelivery` carrying the same subscription id to `Broker::on_quotes`.
pub trait QuoteFeed: Send + Sync {
    fn subscribe_quotes(&self, symbols: &[String], subscription_id: &str);
    fn unsubscribe_quotes(&self, subscription_id: &str);
}

/// One batch of quotes for one subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDelivery {
    pub subscription_id: String,
    pub quotes: Vec<QuoteData>,
}

/// Who a subscription delivers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Listener {
    Order(String),
    Position(String),
}

/// Tracks which subscriptions the broker holds on the feed.
///
/// Every listener has at most one live subscription. Releasing removes it from
/// the feed exactly once; later releases and deliveries for it are dropped.
pub struct QuoteSubscriptions {
    feed: Arc<dyn QuoteFeed>,
    prefix: String,
    active: HashMap<String, Listener>,
}

impl QuoteSubscriptions {
    pub fn new(feed: Arc<dyn QuoteFeed>, prefix: impl Into<String>) -> Self {
        Self {
            feed,
            prefix: prefix.into(),
            active: HashMap::new(),
        }
    }

    /// The feed-side id for a listener.
    pub fn subscription_id(&self, listener: &Listener) -> String {
        match listener {
            Listener::Order(id) => format!("{}-order-{}", self.prefix, id),
            Listener::Position(id) => format!("{}-position-{}", self.prefix, id),
        }
    }

    /// Subscribes `listener` to `symbol` unless it already is.
    pub fn subscribe(&mut self, symbol: &str, listener: Listener) -> String {
        let subscription_id = self.subscription_id(&listener);
        if self.active.contains_key(&subscription_id) {
            return subscription_id;
        }
        self.feed
            .subscribe_quotes(&[symbol.to_string()], &subscription_id);
        debug!(%subscription_id, symbol, "quotes subscribed");
        self.active.insert(subscription_id.clone(), listener);
        subscription_id
    }

    /// Drops the listener's subscription. Returns false if it held none.
    pub fn release(&mut self, listener: &Listener) -> bool {
        let subscription_id = self.subscription_id(listener);
        if self.active.remove(&subscription_id).is_none() {
            warn!(%subscription_id, "release of a subscription that is not active");
            return false;
        }
        self.feed.unsubscribe_quotes(&subscription_id);
        debug!(%subscription_id, "quotes unsubscribed");
        true
    }

    pub fn resolve(&self, subscription_id: &str) -> Option<&Listener> {
        self.active.get(subscription_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Extracts the last price from a delivery. Only the first quote counts,
    /// since every subscription covers one symbol. Error statuses and quotes
    /// without a last price yield `None`.
    pub fn last_price(quotes: &[QuoteData]) -> Option<Decimal> {
        let quote = quotes.first()?;
        if quote.status != QuoteStatus::Ok {
            return None;
        }
        quote.values.last_price
    }
}

/// An in-process feed: `publish` pushes a last price to every live
/// subscription on that symbol through an unbounded channel.
pub struct SimulatedQuoteFeed {
    // Kept in subscription order so deliveries are deterministic.
    subscriptions: Mutex<Vec<(String, Vec<String>)>>,
    tx: mpsc::UnboundedSender<QuoteDelivery>,
}

impl SimulatedQuoteFeed {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<QuoteDelivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let feed = Self {
            subscriptions: Mutex::new(Vec::new()),
            tx,
        };
        (feed, rx)
    }

    /// Sends `price` for `symbol`; returns how many subscriptions received it.
    pub fn publish(&self, symbol: &str, price: Decimal) -> usize {
        self.broadcast(symbol, QuoteData::last(symbol, price))
    }

    /// Sends an error quote for `symbol`.
    pub fn publish_error(&self, symbol: &str) -> usize {
        self.broadcast(symbol, QuoteData::error(symbol))
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_subscribed(&self, subscription_id: &str) -> bool {
        self.lock().iter().any(|(id, _)| id == subscription_id)
    }

    fn broadcast(&self, symbol: &str, quote: QuoteData) -> usize {
        let targets: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, symbols)| symbols.iter().any(|s| s == symbol))
            .map(|(id, _)| id.clone())
            .collect();

        let mut delivered = 0;
        for subscription_id in targets {
            let delivery = QuoteDelivery {
                subscription_id,
                quotes: vec![quote.clone()],
            };
            if self.tx.send(delivery).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Vec<String>)>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl QuoteFeed for SimulatedQuoteFeed {
    fn subscribe_quotes(&self, symbols: &[String], subscription_id: &str) {
        let mut subscriptions = self.lock();
        subscriptions.retain(|(id, _)| id != subscription_id);
        subscriptions.push((subscription_id.to_string(), symbols.to_vec()));
    }

    fn unsubscribe_quotes(&self, subscription_id: &str) {
        self.lock().retain(|(id, _)| id != subscription_id);
    }
}
