use crate::config::Config;
use crate::cycle;
use crate::db::now_timestamp;

pub async fn cmd_notify_test(config: &Config) -> anyhow::Result<()> {
    let notifier = cycle::notifier(config)?;
    notifier.send_test(&now_timestamp()).await?;

    println!("✓ Test message sent");
    Ok(())
}
