//! adgate simulator
//!
//! Drives a real `AdEngine` against the scripted mock SDK so policy
//! settings can be tried from a terminal:
//! 1. Loads entitlement from a JSON state file (created if missing)
//! 2. Initializes the mock SDK and preloads ads
//! 3. Attempts a series of interstitial / rewarded shows on a simulated clock
//!
//! Usage:
//!   adgate-sim --attempts 8 --interval-ms 12000
//!   adgate-sim --premium-after 3 --state /tmp/adgate.json

use adgate_ads::mock::MockAdSdk;
use adgate_ads::{AdEngine, AdEngineConfig};
use adgate_entitlement::JsonFileStore;
use adgate_types::{Clock, ManualClock, StatusSnapshot, SystemClock};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "adgate-sim")]
#[command(about = "Simulate entitlement-gated ad delivery")]
struct Args {
    /// Engine configuration (JSON). Defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Entitlement state file
    #[arg(short, long, default_value = "adgate-state.json")]
    state: PathBuf,

    /// Number of show attempts
    #[arg(short, long, default_value = "8")]
    attempts: u32,

    /// Simulated time between attempts (ms)
    #[arg(long, default_value = "12000")]
    interval_ms: i64,

    /// Every Nth attempt shows a rewarded ad instead (0 disables)
    #[arg(long, default_value = "3")]
    rewarded_every: u32,

    /// Grant premium after this many attempts
    #[arg(long)]
    premium_after: Option<u32>,

    /// Clear entitlement before starting
    #[arg(long)]
    reset: bool,

    /// Make SDK initialization fail
    #[arg(long)]
    fail_init: bool,

    /// Never fill ad requests
    #[arg(long)]
    no_fill: bool,

    /// Print every status snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let config = match &args.config {
        Some(path) => AdEngineConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AdEngineConfig::default(),
    };
    info!(
        vendor = config.vendor.as_str(),
        cooldown_ms = config.cooldown_ms,
        max_per_session = config.max_per_session,
        "adgate simulator starting"
    );

    let mut sdk = MockAdSdk::new().with_auto_close();
    if !args.no_fill {
        sdk = sdk.with_auto_fill();
    }
    if args.fail_init {
        sdk = sdk.with_init_failure("simulated initialization failure");
    }
    let sdk = Arc::new(sdk);

    let clock = Arc::new(ManualClock::new(SystemClock.now_ms()));
    let engine = AdEngine::start_with_clock(
        config.clone(),
        Arc::new(JsonFileStore::new(&args.state)),
        sdk.clone(),
        clock.clone(),
    );

    let json = args.json;
    let subscription = engine.on_status_change(move |status| print_status(status, json));

    let initialized = engine.wait_for_initialization().await;
    info!(initialized, "SDK initialization settled");

    if args.reset {
        engine.set_entitlement(false, false).await;
    }

    let rewards = Arc::new(AtomicU32::new(0));
    let mut shown = 0u32;
    let settle = config.unit_timings().reload_after_close_delay + Duration::from_millis(50);

    for attempt in 1..=args.attempts {
        if args.premium_after == Some(attempt - 1) {
            info!("Granting premium");
            engine.set_entitlement(true, false).await;
        }
        // Let preloading and post-close reloads finish before the next attempt.
        tokio::time::sleep(settle).await;

        let rewarded = args.rewarded_every > 0 && attempt % args.rewarded_every == 0;
        let ok = if rewarded {
            let earned = rewards.clone();
            engine
                .show_rewarded(move |reward| {
                    earned.fetch_add(reward.amount, Ordering::SeqCst);
                })
                .await
        } else {
            engine.show_interstitial(&format!("attempt_{attempt}")).await
        };
        if ok {
            shown += 1;
        }
        println!(
            "  #{attempt:<3} {:<12} {}",
            if rewarded { "rewarded" } else { "interstitial" },
            if ok { "shown" } else { "suppressed" }
        );

        clock.advance(args.interval_ms);
    }

    subscription.unsubscribe();
    let status = engine.status();
    engine.shutdown();

    println!("\n========================================");
    println!("  adgate simulation finished");
    println!("========================================");
    println!("  Attempts:          {}", args.attempts);
    println!("  Shown:             {shown}");
    println!("  Interstitials:     {}", status.session_show_count);
    println!("  Reward earned:     {}", rewards.load(Ordering::SeqCst));
    println!("  Premium:           {}", status.premium);
    println!("  Staff override:    {}", status.staff_override);
    if let Some(error) = &status.initialization_error {
        println!("  Init error:        {error}");
    }
    println!("  State file:        {}", args.state.display());
    println!("========================================\n");

    if !initialized && !args.fail_init && !status.is_entitled() {
        warn!("SDK never initialized");
    }
    Ok(())
}

fn print_status(status: &StatusSnapshot, json: bool) {
    if json {
        match serde_json::to_string(status) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to encode status: {}", e),
        }
        return;
    }
    println!(
        "  [status v{}] ads={} init={} interstitial={} rewarded={} shows={}",
        status.version,
        status.should_show_ads,
        status.is_initialized,
        status.interstitial_ready,
        status.rewarded_ready,
        status.session_show_count,
    );
}
