use anyhow::Result;

use greekwatch::driver::{Driver, ShutdownController};
use greekwatch::logging::{log, obj, v_str, Domain, Level};
use greekwatch::state::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;
    let exchange = cfg.exchange.build(&cfg)?;

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("symbol", v_str(&cfg.symbol)),
            ("exchange", v_str(&format!("{:?}", cfg.exchange).to_lowercase())),
            ("pricing", serde_json::to_value(cfg.pricing())?),
            ("kline_limit", serde_json::json!(cfg.kline_limit)),
        ]),
    );

    let shutdown = ShutdownController::with_ctrl_c();
    let mut driver = Driver::new(exchange, cfg);
    driver.run(shutdown.token()).await;
    Ok(())
}
