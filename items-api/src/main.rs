#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let settings = items_api::config::Settings::from_env()?;
    items_api::web::start_web_server(settings).await
}
