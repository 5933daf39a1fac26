use lambda_http::{run, service_fn, Error, Request};

use optin::controller::Subscriptions;
use optin::lambda::handle;
use optin::settings::Settings;
use optin::telemetry::{create_subscriber, set_subscriber};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let subscriber = create_subscriber("info".into(), std::io::stdout);
    set_subscriber(subscriber)?;

    // Built once per cold start and shared across invocations
    let settings = Settings::load_from_env()?;
    let workflow = Subscriptions::from_settings(&settings).await?;
    let workflow = &workflow;

    run(service_fn(move |event: Request| async move {
        handle(workflow, event).await
    }))
    .await
}
