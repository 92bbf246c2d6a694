use anyhow::{Context, Result, bail};
use broker::{AutoConfirm, Broker, ChannelNotifier, SimulatedQuoteFeed, TradingSession};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use core_types::{OrderType, PreOrder, Side};
use events::{HostEvent, StampedEvent};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// The main entry point for the paper broker.
#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; it only carries RUST_LOG and config overrides.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Simulate(args) => handle_simulate(args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A paper-trading broker that fills orders against simulated quotes.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Also write logs to a daily-rotated file in this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place orders, replay a price path through the quote feed and report the result.
    Simulate(SimulateArgs),
}

#[derive(Parser)]
struct SimulateArgs {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// The symbol to trade (e.g., "AAPL").
    #[arg(long)]
    symbol: String,

    /// Comma-separated last prices to publish, in order.
    #[arg(long, value_delimiter = ',', required = true)]
    prices: Vec<Decimal>,

    /// An order as `side:type:qty[@price]`, e.g. `buy:market:10` or `sell:limit:5@101.5`.
    /// May be repeated.
    #[arg(long = "order", value_parser = parse_order)]
    orders: Vec<OrderSpec>,

    /// Write every host event as a JSON line to this file.
    #[arg(long)]
    events_json: Option<PathBuf>,
}

/// An order given on the command line.
#[derive(Debug, Clone, PartialEq)]
struct OrderSpec {
    side: Side,
    order_type: OrderType,
    qty: Decimal,
    price: Option<Decimal>,
}

impl OrderSpec {
    fn to_pre_order(&self, symbol: &str) -> PreOrder {
        let mut pre = PreOrder {
            order_type: Some(self.order_type),
            ..PreOrder::market(symbol, self.side, self.qty)
        };
        match self.order_type {
            OrderType::Limit => pre.limit_price = self.price,
            OrderType::Stop => pre.stop_price = self.price,
            OrderType::StopLimit => {
                pre.limit_price = self.price;
                pre.stop_price = self.price;
            }
            OrderType::Market => {}
        }
        pre
    }
}

fn parse_order(raw: &str) -> Result<OrderSpec> {
    let (body, price) = match raw.split_once('@') {
        Some((body, price)) => (body, Some(Decimal::from_str(price.trim())?)),
        None => (raw, None),
    };
    let parts: Vec<&str> = body.split(':').map(str::trim).collect();
    let [side, order_type, qty] = parts.as_slice() else {
        bail!("expected side:type:qty[@price], got '{}'", raw);
    };

    let side = match side.to_ascii_lowercase().as_str() {
        "buy" => Side::Buy,
        "sell" => Side::Sell,
        other => bail!("unknown side '{}'", other),
    };
    let order_type = match order_type.to_ascii_lowercase().as_str() {
        "market" => OrderType::Market,
        "limit" => OrderType::Limit,
        "stop" => OrderType::Stop,
        "stoplimit" | "stop-limit" => OrderType::StopLimit,
        other => bail!("unknown order type '{}'", other),
    };
    if order_type != OrderType::Market && price.is_none() {
        bail!("{} orders need a price: '{}'", order_type, raw);
    }

    Ok(OrderSpec {
        side,
        order_type,
        qty: Decimal::from_str(qty).with_context(|| format!("invalid quantity in '{}'", raw))?,
        price,
    })
}

// ==============================================================================
// Logging
// ==============================================================================

/// Console logging filtered by RUST_LOG (default `info`), plus an optional
/// non-blocking daily file. The returned guard must live until exit.
fn init_tracing(log_dir: Option<&std::path::Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "paper-broker.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init()?;
            Ok(None)
        }
    }
}

// ==============================================================================
// Simulate Command Logic
// ==============================================================================

async fn handle_simulate(args: SimulateArgs) -> Result<()> {
    let config = configuration::load_config(&args.config)
        .with_context(|| format!("failed to load configuration from '{}'", args.config))?;

    let (feed, mut deliveries) = SimulatedQuoteFeed::channel();
    let feed = Arc::new(feed);
    let (notifier, mut host_events) = ChannelNotifier::channel();

    let broker = Broker::new(&config, feed.clone(), Arc::new(notifier));
    let session = TradingSession::new(broker, Arc::new(AutoConfirm::from_config(&config)));

    info!(symbol = %args.symbol, orders = args.orders.len(), ticks = args.prices.len(), "starting simulation");

    for spec in &args.orders {
        session
            .place_order(spec.to_pre_order(&args.symbol))
            .await
            .context("order rejected")?;
    }

    // Each tick is fully applied before the next one is published.
    let shared = session.broker();
    for price in &args.prices {
        feed.publish(&args.symbol, *price);
        while let Ok(delivery) = deliveries.try_recv() {
            shared.lock().await.handle_delivery(&delivery);
        }
    }

    let mut events = Vec::new();
    while let Ok(event) = host_events.try_recv() {
        events.push(StampedEvent::now(event));
    }
    if let Some(path) = &args.events_json {
        write_events(path, &events)?;
        info!(path = %path.display(), count = events.len(), "host events written");
    }

    print_report(&session, &events).await;
    Ok(())
}

fn write_events(path: &std::path::Path, events: &[StampedEvent]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    for event in events {
        writeln!(writer, "{}", event.to_json_line()?)?;
    }
    writer.flush()?;
    Ok(())
}

async fn print_report(session: &TradingSession, events: &[StampedEvent]) {
    let mut orders = Table::new();
    orders.set_header(vec!["Id", "Side", "Type", "Qty", "Limit", "Stop", "Status", "Price"]);
    for order in session.orders().await {
        orders.add_row(vec![
            order.id.clone(),
            order.side.to_string(),
            order.order_type.to_string(),
            order.qty.to_string(),
            display_price(order.limit_price),
            display_price(order.stop_price),
            order.status.to_string(),
            display_price(order.avg_price),
        ]);
    }
    println!("\n--- Orders ---\n{}", orders);

    let mut positions = Table::new();
    positions.set_header(vec!["Symbol", "Side", "Qty", "Avg Price", "Last", "Profit"]);
    for position in session.positions().await {
        positions.add_row(vec![
            position.symbol.clone(),
            position.side.to_string(),
            position.qty.to_string(),
            position.avg_price.to_string(),
            display_price(position.last),
            position.profit.round_dp(2).to_string(),
        ]);
    }
    println!("\n--- Positions ---\n{}", positions);

    let mut executions = Table::new();
    executions.set_header(vec!["Id", "Time", "Side", "Qty", "Price"]);
    for symbol in executed_symbols(events) {
        for execution in session.executions(&symbol).await {
            executions.add_row(vec![
                execution.id.clone(),
                execution.time.format("%H:%M:%S%.3f").to_string(),
                execution.side.to_string(),
                execution.qty.to_string(),
                execution.price.to_string(),
            ]);
        }
    }
    println!("\n--- Executions ---\n{}", executions);

    let account = session.account().await;
    let mut summary = Table::new();
    summary.set_header(vec!["Account", "Balance", "Equity", "P&L"]);
    summary.add_row(vec![
        account.title,
        account.balance.round_dp(2).to_string(),
        account.equity.round_dp(2).to_string(),
        account.pl.round_dp(2).to_string(),
    ]);
    println!("\n--- Account ---\n{}", summary);
    println!("{} host events emitted", events.len());
}

fn executed_symbols(events: &[StampedEvent]) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for stamped in events {
        if let HostEvent::ExecutionUpdate(execution) = &stamped.event {
            if !symbols.contains(&execution.symbol) {
                symbols.push(execution.symbol.clone());
            }
        }
    }
    symbols
}

fn display_price(price: Option<Decimal>) -> String {
    price.map_or_else(|| "-".to_string(), |p| p.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_market_and_priced_orders() {
        assert_eq!(
            parse_order("buy:market:10").unwrap(),
            OrderSpec {
                side: Side::Buy,
                order_type: OrderType::Market,
                qty: dec!(10),
                price: None,
            }
        );

        let spec = parse_order("Sell:Limit:5@101.5").unwrap();
        assert_eq!(spec.side, Side::Sell);
        assert_eq!(spec.price, Some(dec!(101.5)));

        let pre = spec.to_pre_order("AAPL");
        assert_eq!(pre.limit_price, Some(dec!(101.5)));
        assert_eq!(pre.stop_price, None);
    }

    #[test]
    fn rejects_malformed_orders() {
        assert!(parse_order("buy:10").is_err());
        assert!(parse_order("hold:market:1").is_err());
        assert!(parse_order("buy:stop:1").is_err());
        assert!(parse_order("buy:market:ten").is_err());
    }
}
