use pnl_journal::app_config::load_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    pnl_journal::init_logging(&config);
    pnl_journal::run(config).await
}
