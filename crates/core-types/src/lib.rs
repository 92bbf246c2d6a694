pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{ConnectionStatus, OrderDuration, OrderStatus, OrderType, QuoteStatus, Side};
pub use error::CoreError;
pub use structs::{
    MAX_ORDER_PRICE, MAX_ORDER_QTY,
    AccountInfo, AccountManagerData, Execution, InstrumentInfo, Order, OrderFields, Position,
    PreOrder, QuantityMetainfo, QuoteData, QuoteValues, SymbolSnapshot,
};
