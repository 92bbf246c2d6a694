use core_types::{Order, OrderType, Side};
use rust_decimal::Decimal;

/// Outcome of evaluating an order against the latest price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillCheck {
    /// Execute at the observed price.
    Fill,
    /// Conditions not met yet.
    Wait,
    /// The order type is accepted but never executes in this simulator.
    Unsupported,
}

/// Decides whether `order` executes at `last`.
///
/// Market orders fire once the order has seen any price. Limit orders fire at
/// the limit or better, stops at the stop or worse. A limit or stop order
/// without the matching price never fires.
pub fn check_fill(order: &Order, last: Decimal) -> FillCheck {
    let triggered = match (order.side, order.order_type) {
        (_, OrderType::StopLimit) => return FillCheck::Unsupported,
        (_, OrderType::Market) => order.price.is_some(),
        (Side::Sell, OrderType::Limit) => order.limit_price.is_some_and(|limit| last >= limit),
        (Side::Buy, OrderType::Limit) => order.limit_price.is_some_and(|limit| last <= limit),
        (Side::Sell, OrderType::Stop) => order.stop_price.is_some_and(|stop| last <= stop),
        (Side::Buy, OrderType::Stop) => order.stop_price.is_some_and(|stop| last >= stop),
    };

    if triggered { FillCheck::Fill } else { FillCheck::Wait }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::PreOrder;
    use rust_decimal_macros::dec;

    fn order(side: Side, order_type: OrderType, limit: Option<Decimal>, stop: Option<Decimal>) -> Order {
        let pre = PreOrder {
            symbol: "AAPL".to_string(),
            side: Some(side),
            order_type: Some(order_type),
            qty: dec!(1),
            limit_price: limit,
            stop_price: stop,
            ..Default::default()
        };
        Order::from_pre_order("1".to_string(), &pre)
    }

    #[test]
    fn market_waits_for_a_price() {
        let mut market = order(Side::Buy, OrderType::Market, None, None);
        assert_eq!(check_fill(&market, dec!(100)), FillCheck::Wait);
        market.price = Some(dec!(100));
        assert_eq!(check_fill(&market, dec!(100)), FillCheck::Fill);
    }

    #[test]
    fn buy_limit_fills_at_or_below() {
        let limit = order(Side::Buy, OrderType::Limit, Some(dec!(100)), None);
        assert_eq!(check_fill(&limit, dec!(101)), FillCheck::Wait);
        assert_eq!(check_fill(&limit, dec!(100)), FillCheck::Fill);
        assert_eq!(check_fill(&limit, dec!(99.5)), FillCheck::Fill);
    }

    #[test]
    fn sell_limit_fills_at_or_above() {
        let limit = order(Side::Sell, OrderType::Limit, Some(dec!(100)), None);
        assert_eq!(check_fill(&limit, dec!(99)), FillCheck::Wait);
        assert_eq!(check_fill(&limit, dec!(100)), FillCheck::Fill);
    }

    #[test]
    fn stops_trigger_through_the_stop_price() {
        let sell_stop = order(Side::Sell, OrderType::Stop, None, Some(dec!(100)));
        assert_eq!(check_fill(&sell_stop, dec!(100.01)), FillCheck::Wait);
        assert_eq!(check_fill(&sell_stop, dec!(100)), FillCheck::Fill);
        assert_eq!(check_fill(&sell_stop, dec!(98)), FillCheck::Fill);

        let buy_stop = order(Side::Buy, OrderType::Stop, None, Some(dec!(100)));
        assert_eq!(check_fill(&buy_stop, dec!(99)), FillCheck::Wait);
        assert_eq!(check_fill(&buy_stop, dec!(100)), FillCheck::Fill);
    }

    #[test]
    fn missing_trigger_price_never_fills() {
        let limit = order(Side::Buy, OrderType::Limit, None, None);
        assert_eq!(check_fill(&limit, dec!(1)), FillCheck::Wait);
    }

    #[test]
    fn stop_limit_is_unsupported() {
        let stop_limit = order(Side::Buy, OrderType::StopLimit, Some(dec!(100)), Some(dec!(99)));
        assert_eq!(check_fill(&stop_limit, dec!(100)), FillCheck::Unsupported);
    }
}
