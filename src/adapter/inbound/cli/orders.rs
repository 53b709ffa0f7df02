//! Handler for the `orders` command.

use rust_decimal::Decimal;
use serde_json::json;

use crate::adapter::inbound::cli::command::OrdersArgs;
use crate::adapter::inbound::cli::{ledger, output};
use crate::domain::id::{BotId, CycleId};
use crate::domain::order::OrderRecord;
use crate::error::Result;

/// Execute the orders command.
pub fn execute(args: &OrdersArgs) -> Result<()> {
    if output::is_quiet() && !output::is_json() {
        return Ok(());
    }
    if !ledger::require_database(&args.db, "orders") {
        return Ok(());
    }

    let store = ledger::open_ledger(&args.db)?;
    let cycle_id = CycleId::new(args.cycle);

    let mut orders = match (args.open, args.bot) {
        (true, _) => store.open_orders(cycle_id)?,
        (false, Some(bot)) => store.orders_for_bot(BotId::new(bot), cycle_id)?,
        (false, None) => store.orders_in_cycle(cycle_id, args.limit)?,
    };
    if let Some(bot) = args.bot {
        orders.retain(|order| order.bot_id.get() == bot);
    }
    orders.truncate(args.limit.max(0) as usize);

    if output::is_json() {
        let rows: Vec<_> = orders.iter().map(order_to_json).collect();
        output::json_output(json!({
            "command": "orders",
            "cycle_id": args.cycle,
            "bot_id": args.bot,
            "open_only": args.open,
            "count": rows.len(),
            "orders": rows,
        }));
        return Ok(());
    }

    if orders.is_empty() {
        output::note("No orders match.");
        return Ok(());
    }

    output::section(&format!("Orders (cycle {})", args.cycle));
    let widths = [14, 4, 4, 8, 9, 9, 16, 10, 19];
    output::table_header(&[
        ("ORDER", widths[0]),
        ("BOT", widths[1]),
        ("SIDE", widths[2]),
        ("QTY", widths[3]),
        ("PRICE", widths[4]),
        ("FILL", widths[5]),
        ("STATUS", widths[6]),
        ("PNL", widths[7]),
        ("PLACED", widths[8]),
    ]);
    output::table_separator(&widths);

    for order in &orders {
        output::table_row(
            &[
                short_order_id(order),
                order.bot_id.to_string(),
                order.side.to_string(),
                order.qty.to_string(),
                order.price.to_string(),
                order
                    .resulting_fill_price
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                order.status.to_string(),
                pnl_cell(order),
                output::short_ts(&order.ts),
            ],
            &widths,
        );
    }

    Ok(())
}

// Colored cells would break the column alignment, so tables stay plain.
fn pnl_cell(order: &OrderRecord) -> String {
    match order.pnl {
        Some(pnl) if pnl >= Decimal::ZERO => format!("+{pnl}"),
        Some(pnl) => pnl.to_string(),
        None => "-".to_string(),
    }
}

/// First segment of the order id; the full id stays in JSON output.
fn short_order_id(order: &OrderRecord) -> String {
    let id = order.order_id.as_str();
    if id.chars().count() <= 14 {
        id.to_string()
    } else {
        let prefix: String = id.chars().take(13).collect();
        format!("{prefix}…")
    }
}

fn order_to_json(order: &OrderRecord) -> serde_json::Value {
    json!({
        "order_id": order.order_id.as_str(),
        "bot_id": order.bot_id.get(),
        "cycle_id": order.cycle_id.get(),
        "symbol": order.symbol,
        "side": order.side.as_str(),
        "qty": order.qty.to_string(),
        "price": order.price.to_string(),
        "resulting_fill_price": order.resulting_fill_price.map(|p| p.to_string()),
        "fee_asset": order.fee_asset,
        "fee_amount": order.fee_amount.map(|f| f.to_string()),
        "ts": order.ts,
        "status": order.status.as_str(),
        "pnl": order.pnl.map(|p| p.to_string()),
        "pnl_pct": order.pnl_pct,
        "expected_profit_ticks": order.context.expected_profit_ticks,
        "actual_profit_ticks": order.actual_profit_ticks,
        "slippage_ticks": order.slippage_ticks(),
        "spread_ticks": order.context.spread_ticks,
        "imbalance_pct": order.context.imbalance_pct,
        "latency_ms": order.context.latency_ms,
        "cancel_replace_count": order.cancel_replace_count,
        "time_in_force": order.time_in_force.map(|t| t.as_str()),
        "hold_time_s": order.hold_time_s,
        "notes": order.notes,
    })
}
