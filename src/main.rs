use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use optin::app;
use optin::controller::Subscriptions;
use optin::settings::Settings;
use optin::telemetry::{create_subscriber, set_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = create_subscriber("info".into(), std::io::stdout);
    set_subscriber(subscriber)?;

    let settings = Settings::load().context("Failed to load settings")?;

    let workflow = Subscriptions::from_settings(&settings).await?;

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!(
        address = %listener.local_addr()?,
        policy = ?workflow.policy(),
        "Listening"
    );

    app::run(listener, Arc::new(workflow))?
        .await
        .context("Failed to run app")
}
