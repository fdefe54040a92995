/*
[INPUT]:  Demo configuration and an unstarted Zubr client
[OUTPUT]: Channel subscriptions and requests queued on the client, logged on arrival
[POS]:    Demo layer - what the demo watches and sends
[UPDATE]: When adding channels or changing the startup requests
*/

use serde_json::Value;
use tracing::{error, info, warn};
use zubr_sdk::{Callback, NewOrder, Result, ZubrClient, callback};

use crate::config::DemoConfig;

fn log_push(channel: &'static str) -> Callback {
    callback(move |data: Value| info!(channel, %data, "push"))
}

fn log_response(request: &'static str) -> Callback {
    callback(move |message: Value| {
        if message.get("error").is_some() {
            warn!(request, %message, "request failed");
        } else {
            info!(request, %message, "response");
        }
    })
}

/// Queue every subscription and request the demo makes; returns how many were queued.
///
/// Private channels and orders are skipped without credentials.
pub async fn register_feeds(client: &ZubrClient, config: &DemoConfig) -> Result<usize> {
    let market = &config.market;
    let mut queued = 0;

    client
        .subscribe_errors(callback(|message| error!(%message, "server error")))
        .await;
    client
        .set_default_callback(callback(|message| info!(%message, "unrouted frame")))
        .await;

    client.subscribe_instruments(log_push("instruments")).await?;
    client.subscribe_orderbook(log_push("orderbook")).await?;
    client.subscribe_last_trades(log_push("lasttrades")).await?;
    client
        .subscribe_candles(
            market.instrument_id,
            &market.candle_resolution,
            log_push("candles"),
        )
        .await?;
    queued += 4;

    if let (Some(from), Some(to)) = (market.candles_from, market.candles_to) {
        client
            .get_candles_range(
                market.instrument_id,
                &market.candle_resolution,
                from,
                to,
                Some(log_response("getCandlesRange")),
            )
            .await?;
        queued += 1;
    }

    if !config.has_credentials() {
        info!("no credentials; skipping private channels");
        return Ok(queued);
    }

    client.subscribe_orders(log_push("orders")).await?;
    client.subscribe_order_fills(log_push("orderFills")).await?;
    client.subscribe_balance(log_push("balance")).await?;
    queued += 3;

    for order in &config.orders {
        let new_order = NewOrder {
            instrument_id: market.instrument_id,
            price: order.price.into(),
            size: order.size,
            order_type: order.order_type,
            time_in_force: order.time_in_force,
            side: order.side,
        };
        info!(?new_order, "queueing order");
        client
            .place_order(new_order, Some(log_response("placeOrder")))
            .await?;
        queued += 1;
    }

    Ok(queued)
}
