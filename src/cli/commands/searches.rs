use crate::config::Config;
use crate::cycle::with_store;

pub async fn cmd_searches(config: &Config) -> anyhow::Result<()> {
    let rows = with_store(config, |store| async move {
        let mut rows = Vec::new();
        for search in store.list_searches().await? {
            let count = store.count_listings_for_search(search.id).await?;
            rows.push((search, count));
        }
        Ok(rows)
    })
    .await?;

    if rows.is_empty() {
        println!("No searches stored yet.");
        return Ok(());
    }

    println!("Stored Searches:");
    println!("{:-<70}", "");

    for (search, count) in rows {
        println!("[{}] {}", search.id, search.query);
        println!(
            "    Runs: {} | Listings: {} | Last run: {}",
            search.run_count, count, search.last_run
        );
    }

    Ok(())
}
