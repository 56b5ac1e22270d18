/// Smoke-test for `ChromeLauncher`.
///
/// Launches a headless Chromium, extracts today's schedule from the live
/// site, and prints a short summary.
///
/// Run with:
///   cargo run -p matchday-client --example browser_smoke
use matchday_client::ChromeLauncher;
use matchday_core::{BatchOrchestrator, ScraperConfig, SessionPool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = ScraperConfig::from_env()?;
    let pool = SessionPool::new(ChromeLauncher::default(), &config);
    let orchestrator = BatchOrchestrator::new(pool.clone(), config)?;

    let today = chrono::Local::now().date_naive();
    println!("Extracting schedule for {today} …");
    let result = orchestrator.extract_day(today).await;
    pool.shutdown().await;

    let matches = result?;
    println!("OK: {} matches", matches.len());
    for m in matches.iter().take(5) {
        println!(
            "  [{}] {} {} {} {} ({})",
            m.tournament, m.time, m.home_team, m.score, m.away_team, m.status
        );
    }
    Ok(())
}
