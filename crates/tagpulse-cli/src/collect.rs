//! The `collect` command: one harvest cycle, run on demand.

use tagpulse_collector::{client_from_config, run_cycle};
use tagpulse_core::{AppConfig, CampaignConfig, Platform};

/// Run one harvest cycle over the campaign's platforms.
///
/// `platform_filter` narrows the cycle to a single platform; it must be one
/// the campaign actually tracks. When `dry_run` is `true` the function prints
/// the harvest plan and returns without calling the scraping service.
///
/// # Errors
///
/// Returns an error if the campaign cannot be loaded, the platform filter
/// does not resolve, the Apify client cannot be constructed, or a ledger row
/// cannot be written. Per-platform harvest failures are reported in the
/// summary, not propagated.
pub(crate) async fn run_collect(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    platform_filter: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut campaign = tagpulse_core::load_campaign(&config.campaign_path)?;

    if let Some(raw) = platform_filter {
        let platform: Platform = raw
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown platform '{raw}'; expected instagram or tiktok"))?;
        if !campaign.platforms.contains(&platform) {
            anyhow::bail!("platform '{platform}' is not part of the campaign; check the campaign file");
        }
        campaign.platforms = vec![platform];
    }

    if dry_run {
        print_plan(&campaign);
        return Ok(());
    }

    let client = client_from_config(config)?;
    let summary = run_cycle(pool, &client, &campaign).await?;

    for outcome in &summary.runs {
        if let Some(message) = &outcome.error_message {
            println!("{}: {} — {message}", outcome.platform, outcome.status);
            continue;
        }
        println!(
            "{}: {} — {} items, {} saved, {} duplicates, {} errors in {} ms",
            outcome.platform,
            outcome.status,
            outcome.items_returned,
            outcome.saved,
            outcome.duplicates,
            outcome.errors,
            outcome.duration_ms
        );
        for (keyword, stats) in &outcome.keyword_counts {
            println!(
                "  #{keyword}: {} matched, {} saved, {} duplicates",
                stats.total, stats.saved, stats.duplicates
            );
        }
    }

    println!(
        "cycle complete: {} saved, {} duplicates, {} errors across {} platforms",
        summary.total_saved(),
        summary.total_duplicates(),
        summary.total_errors(),
        summary.runs.len()
    );

    Ok(())
}

fn print_plan(campaign: &CampaignConfig) {
    let platforms: Vec<&str> = campaign.platforms.iter().map(|p| p.as_str()).collect();

    println!("dry-run: one harvest cycle would cover:");
    println!("  platforms: [{}]", platforms.join(", "));
    println!("  keywords:  [{}]", campaign.keywords.join(", "));
    println!(
        "  limits:    {} posts per keyword, {}s run timeout, {} MB actor memory, {}s between platforms",
        campaign.collection.results_limit,
        campaign.collection.timeout_secs,
        campaign.collection.memory_mbytes,
        campaign.collection.platform_delay_secs
    );
}
