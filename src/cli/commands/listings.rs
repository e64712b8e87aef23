use crate::config::Config;
use crate::cycle::with_store;
use crate::domain::ListingId;

pub async fn cmd_listings(config: &Config, limit: usize) -> anyhow::Result<()> {
    let target = config.search_target()?;
    let name = target.search_name();

    let rows = with_store(config, |store| async move {
        let Some(search) = store.find_search(&name).await? else {
            return Ok(None);
        };

        let mut rows = Vec::new();
        for listing in store.listings_for_search(search.id).await?.into_iter().take(limit) {
            let evaluation = store.get_evaluation(&listing.id).await?;
            rows.push((listing, evaluation));
        }
        Ok(Some(rows))
    })
    .await?;

    let Some(rows) = rows else {
        println!("No stored search for {}", target);
        return Ok(());
    };

    println!("Newest listings for {}:", target);
    println!("{:-<70}", "");

    for (listing, evaluation) in rows {
        println!("[{}] {}", listing.id, listing.title);
        println!(
            "    {} | {} | first seen {}",
            listing.price.as_deref().unwrap_or("No price"),
            listing.location.as_deref().unwrap_or("Unknown location"),
            listing.first_seen
        );
        match evaluation {
            Some(stored) => println!(
                "    Value {:.1}/10 | Match {:.1}/10 | Red flags: {}",
                stored.evaluation.value_score,
                stored.evaluation.match_score,
                stored.evaluation.red_flags.as_str()
            ),
            None => println!("    Not evaluated"),
        }
    }

    Ok(())
}

pub async fn cmd_clear_evaluation(config: &Config, id: &str) -> anyhow::Result<()> {
    let listing_id = ListingId::new(id.trim());

    let cleared = with_store(config, |store| async move {
        Ok(store.clear_evaluation(&listing_id).await?)
    })
    .await?;

    if cleared {
        println!("✓ Cleared evaluation for listing {}", id.trim());
    } else {
        println!("Listing {} has no stored evaluation", id.trim());
    }

    Ok(())
}
