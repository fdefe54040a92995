/*
[INPUT]:  ZUBR_API_KEY / ZUBR_API_SECRET environment variables
[OUTPUT]: Order placement responses and private channel pushes
[POS]:    Examples - authenticated trading flow
[UPDATE]: When order API or login handshake changes
*/

use std::time::Duration;

use zubr_sdk::*;

/// Example: log in, watch private channels, and place a far-from-market limit order
#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Zubr Trading Example ===\n");

    let credentials = Credentials::from_parts(
        std::env::var("ZUBR_API_KEY").ok().as_deref(),
        std::env::var("ZUBR_API_SECRET").ok().as_deref(),
    )?
    .ok_or_else(|| ZubrError::Config("set ZUBR_API_KEY and ZUBR_API_SECRET".to_string()))?;

    let config = ClientConfig::default()
        .with_credentials(credentials)
        .with_reconnect(ReconnectConfig::default());
    let client = ZubrClient::new(config)?;

    client
        .subscribe_orders(callback(|data| println!("[orders] {data}")))
        .await?;
    client
        .subscribe_order_fills(callback(|data| println!("[fills] {data}")))
        .await?;
    client
        .subscribe_balance(callback(|data| println!("[balance] {data}")))
        .await?;

    // Sent after login completes
    client
        .buy(
            1,
            "1003.8",
            1,
            OrderType::Limit,
            TimeInForce::Gtc,
            Some(callback(|response| println!("[buy] {response}"))),
        )
        .await?;
    println!("✓ Order queued until login\n");

    let shutdown = client.shutdown_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        shutdown.cancel();
    });

    client.run().await?;
    println!("\n✓ Trading example complete");
    Ok(())
}
