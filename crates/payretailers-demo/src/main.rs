use payretailers::{
    ClientConfig, Country, CountryClient, PayerDetails, PaywallParams, TransactionParams,
};
use tracing_subscriber::EnvFilter;

const NOTIFICATION_URL: &str = "https://example.com/webhooks/payretailers";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> payretailers::Result<()> {
    let config = ClientConfig::from_env()?;
    let country: Country = std::env::var("PAYRETAILERS_COUNTRY")
        .unwrap_or_else(|_| "BR".to_string())
        .parse()?;
    let tag = std::env::var("PAYRETAILERS_PAYMENT_METHOD").unwrap_or_else(|_| "ONLINE".to_string());

    tracing::info!(%country, payment_method = %tag, "starting PayRetailers demo");
    let client = CountryClient::new(config, country)?;
    println!(
        "Environment: {} ({})",
        if client.is_sandbox() { "sandbox" } else { "production" },
        client.base_url()
    );
    println!("Country: {country}, default currency: {}\n", client.default_currency());

    let payer = PayerDetails {
        first_name: Some("Test".into()),
        last_name: Some("Buyer".into()),
        ..PayerDetails::default()
    };

    let tracking_id = uuid::Uuid::new_v4().to_string();
    let params = TransactionParams::new(
        "100.00",
        "SDK demo transaction",
        &tracking_id,
        NOTIFICATION_URL,
        "buyer@example.com",
    )
    .with_payer(payer.clone())
    .with_payment_method_tag(tag);

    let transaction = client.create_transaction(params).await?;
    println!("Transaction created:");
    println!("{}", pretty(&transaction));

    if let Some(uid) = transaction
        .get("uid")
        .or_else(|| transaction.get("id"))
        .and_then(|v| v.as_str())
    {
        let fetched = client.get_transaction(uid).await?;
        println!("\nTransaction {uid} status: {}", fetched["status"]);
    }

    let paywall = PaywallParams::new(
        "50.00",
        "SDK demo paywall",
        uuid::Uuid::new_v4().to_string(),
        NOTIFICATION_URL,
        "buyer@example.com",
    )
    .with_payer(payer);

    let paywall = client.create_paywall(paywall).await?;
    println!("\nPaywall created:");
    println!("{}", pretty(&paywall));

    Ok(())
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
