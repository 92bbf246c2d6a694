//! # Broker Crate
//!
//! A paper-trading brokerage engine. It accepts orders from a host UI,
//! simulates their execution against live quotes, keeps one position per
//! symbol and derives the account's balance, equity and P&L from them.
//!
//! `Broker` is the synchronous core; `TradingSession` wraps it with the
//! host's confirmation dialogs and a quote pump.

pub mod account;
pub mod broker;
pub mod error;
pub mod execution_log;
pub mod fill;
pub mod host;
pub mod ids;
pub mod ledger;
pub mod order_book;
pub mod quotes;
pub mod session;

pub use account::{AccountAggregator, AccountManagerInfo, SummaryField};
pub use broker::{Broker, instrument_info};
pub use error::BrokerError;
pub use execution_log::ExecutionLog;
pub use fill::{FillCheck, check_fill};
pub use host::{AutoConfirm, ChannelNotifier, HostDialogs, HostNotifier};
pub use ids::IdSequence;
pub use ledger::{LedgerUpdate, PositionChange, PositionLedger};
pub use order_book::{FillRequest, OrderBook, OrderTick};
pub use quotes::{Listener, QuoteDelivery, QuoteFeed, QuoteSubscriptions, SimulatedQuoteFeed};
pub use session::{TradingSession, pump_quotes};
