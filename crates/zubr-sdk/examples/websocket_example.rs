/*
[INPUT]:  Public Zubr WebSocket endpoint
[OUTPUT]: Market data pushes printed to stdout
[POS]:    Examples - anonymous channel subscriptions
[UPDATE]: When channel names or subscribe API changes
*/

use std::time::Duration;

use zubr_sdk::*;

/// Example: anonymous market data streams
///
/// Subscriptions made before `run` are queued and sent as soon as the socket opens.
#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Zubr WebSocket Example ===\n");

    let client = ZubrClient::new(ClientConfig::default())?;

    client
        .subscribe_errors(callback(|message| println!("[error] {message}")))
        .await;
    client
        .set_default_callback(callback(|message| println!("[other] {message}")))
        .await;

    client
        .subscribe_instruments(callback(|data| println!("[instruments] {data}")))
        .await?;
    client
        .subscribe_orderbook(callback(|data| println!("[orderbook] {data}")))
        .await?;
    client
        .subscribe_last_trades(callback(|data| println!("[lasttrades] {data}")))
        .await?;
    client
        .subscribe_candles(1, "1", callback(|data| println!("[candles 1/1] {data}")))
        .await?;
    client
        .get_candles_range(
            1,
            "1",
            1_582_801_200,
            1_582_804_800,
            Some(callback(|message| println!("[candles range] {message}"))),
        )
        .await?;
    println!("✓ Subscriptions queued\n");

    // Stop after a short while
    let shutdown = client.shutdown_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        shutdown.cancel();
    });

    client.run().await?;
    println!("\n✓ WebSocket example complete");
    Ok(())
}
