use crate::error::BrokerError;
use core_types::{AccountManagerData, Position};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;

/// Derives the account summary from the balance and the open positions.
///
/// The balance only moves when a reducing fill realizes profit. Every
/// `recompute` publishes the new summary on a watch channel, which is what
/// UI-bound balance and equity values follow.
#[derive(Debug)]
pub struct AccountAggregator {
    data: AccountManagerData,
    tx: watch::Sender<AccountManagerData>,
}

impl AccountAggregator {
    pub fn new(title: impl Into<String>, initial_balance: Decimal) -> Self {
        let data = AccountManagerData {
            title: title.into(),
            balance: initial_balance,
            equity: initial_balance,
            pl: Decimal::ZERO,
        };
        let (tx, _rx) = watch::channel(data.clone());
        Self { data, tx }
    }

    /// Credits realized profit (or debits a loss) to the balance. The balance
    /// is left unchanged if the result would be out of range.
    pub fn realize(&mut self, amount: Decimal) -> Result<(), BrokerError> {
        self.data.balance = self
            .data
            .balance
            .checked_add(amount)
            .ok_or_else(|| BrokerError::Overflow(format!("balance credit of {}", amount)))?;
        Ok(())
    }

    /// pl = sum of unrealized profit, equity = balance + pl. Nothing is
    /// published if either total is out of range.
    pub fn recompute<'a>(
        &mut self,
        positions: impl IntoIterator<Item = &'a Position>,
    ) -> Result<&AccountManagerData, BrokerError> {
        let overflow = || BrokerError::Overflow("account totals".to_string());
        let pl = positions
            .into_iter()
            .try_fold(Decimal::ZERO, |sum, position| sum.checked_add(position.profit))
            .ok_or_else(overflow)?;
        let equity = self.data.balance.checked_add(pl).ok_or_else(overflow)?;

        self.data.pl = pl;
        self.data.equity = equity;
        self.tx.send_replace(self.data.clone());
        Ok(&self.data)
    }

    pub fn snapshot(&self) -> AccountManagerData {
        self.data.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AccountManagerData> {
        self.tx.subscribe()
    }

}

/// One labelled value in the account manager header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryField {
    pub text: String,
    pub value: Decimal,
}

/// What the host needs to render the account manager.
#[derive(Debug, Clone)]
pub struct AccountManagerInfo {
    pub account_title: String,
    pub summary: Vec<SummaryField>,
    /// Follows every recomputation of the account summary.
    pub updates: watch::Receiver<AccountManagerData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Side;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, profit: Decimal) -> Position {
        Position {
            id: symbol.to_string(),
            symbol: symbol.to_string(),
            broker_symbol: None,
            side: Side::Buy,
            qty: dec!(1),
            avg_price: dec!(1),
            last: None,
            profit,
        }
    }

    #[test]
    fn equity_is_balance_plus_open_profit() {
        let mut account = AccountAggregator::new("Test", dec!(1000));
        account.realize(dec!(40)).unwrap();
        let positions = [position("AAPL", dec!(15)), position("MSFT", dec!(-5))];

        let data = account.recompute(positions.iter()).unwrap();
        assert_eq!(data.balance, dec!(1040));
        assert_eq!(data.pl, dec!(10));
        assert_eq!(data.equity, dec!(1050));
    }

    #[test]
    fn recompute_notifies_watchers() {
        let mut account = AccountAggregator::new("Test", dec!(100));
        let mut rx = account.subscribe();
        assert!(!rx.has_changed().unwrap());

        account.recompute([position("AAPL", dec!(7))].iter()).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().equity, dec!(107));
    }

    #[test]
    fn out_of_range_totals_keep_last_summary() {
        let mut account = AccountAggregator::new("Test", dec!(100));
        assert!(account.realize(Decimal::MAX).is_err());
        assert_eq!(account.snapshot().balance, dec!(100));

        let mut rx = account.subscribe();
        let positions = [position("AAPL", Decimal::MAX), position("MSFT", Decimal::MAX)];
        assert!(account.recompute(positions.iter()).is_err());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(account.snapshot().equity, dec!(100));
    }
}
