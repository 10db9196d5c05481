//! Read-only ledger and status query handlers.

use tagpulse_core::AppConfig;
use tagpulse_db::RunFilters;

/// Print recent ledger entries, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let rows = tagpulse_db::list_harvest_runs(
        pool,
        &RunFilters {
            limit: Some(limit.clamp(1, 200)),
            ..RunFilters::default()
        },
    )
    .await?;

    if rows.is_empty() {
        println!("no harvest runs recorded yet; run `tagpulse collect` first");
        return Ok(());
    }

    println!(
        "{:<18}{:<11}{:<9}{:>6}{:>7}{:>7}{:>8}  KEYWORDS",
        "CREATED", "PLATFORM", "STATUS", "ITEMS", "SAVED", "DUPES", "ERRORS"
    );
    for row in &rows {
        let created = row.created_at.format("%Y-%m-%d %H:%M").to_string();
        println!(
            "{:<18}{:<11}{:<9}{:>6}{:>7}{:>7}{:>8}  {}",
            created,
            row.platform,
            row.status,
            row.items_returned,
            row.saved,
            row.duplicates,
            row.errors,
            row.keywords.join(",")
        );
    }

    Ok(())
}

/// Show the campaign definition and store totals at a glance.
///
/// # Errors
///
/// Returns an error if the campaign cannot be loaded or a database query
/// fails.
pub(crate) async fn run_status(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let campaign = tagpulse_core::load_campaign(&config.campaign_path)?;

    let post_count = tagpulse_db::count_posts(pool).await?;
    let run_count = tagpulse_db::count_harvest_runs(pool).await?;
    let last_runs = tagpulse_db::list_harvest_runs(
        pool,
        &RunFilters {
            limit: Some(1),
            ..RunFilters::default()
        },
    )
    .await?;

    let platforms: Vec<&str> = campaign.platforms.iter().map(|p| p.as_str()).collect();

    println!("campaign");
    println!("  keywords:  [{}]", campaign.keywords.join(", "));
    println!("  platforms: [{}]", platforms.join(", "));
    println!("  schedules: [{}]", campaign.schedules.join(", "));
    println!("store");
    println!("  posts:        {post_count}");
    println!("  harvest runs: {run_count}");
    match last_runs.first() {
        Some(last) => println!(
            "  last harvest: {} — {} ({}, {} saved)",
            last.created_at.format("%Y-%m-%d %H:%M UTC"),
            last.platform,
            last.status,
            last.saved
        ),
        None => println!("  last harvest: never"),
    }

    Ok(())
}
