use anyhow::Result;
use quiz_tutor::config::Config;
use quiz_tutor::orchestrator::App;
use quiz_tutor::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
