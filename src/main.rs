use std::sync::Arc;

use chrono::{Timelike, Utc};
use tokio::io::AsyncBufReadExt;

use barber_assist::channels::ConsoleMessenger;
use barber_assist::config::AppConfig;
use barber_assist::directory::WorkerDirectory;
use barber_assist::resolver::Resolver;
use barber_assist::store::{JsonStore, Store};
use barber_assist::workflow::{
    Booking, ConfirmationLedger, ConfirmationWorkflow, WorkflowDeps, spawn_sweep_task,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env();

    eprintln!("💈 Barber Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Data dir: {}", config.data_dir.display());
    eprintln!(
        "   Confirmation window: {}s, sweep every {}s",
        config.confirmation_timeout.as_secs(),
        config.sweep_interval.as_secs()
    );
    eprintln!("   Commands:");
    eprintln!("     book <date> <time> <service> <client>   request a booking");
    eprintln!("     reply <contact> <text…>                 worker reply");
    eprintln!("     workers                                 list workers");
    eprintln!("     quit\n");

    // ── Persistence ──────────────────────────────────────────────────────
    let store: Arc<dyn Store> = Arc::new(JsonStore::new(&config.data_dir));

    // ── Worker directory ─────────────────────────────────────────────────
    let directory = Arc::new(WorkerDirectory::new(store.clone()));
    directory.load().await?;
    eprintln!("   Workers: {}", directory.len().await);

    // ── Confirmation ledger: reload persisted state, purge stale records ─
    let ledger = Arc::new(ConfirmationLedger::new());
    ledger.replace_all(store.load_confirmations().await?).await;
    let purge_cutoff = Utc::now()
        - chrono::Duration::from_std(config.purge_age).unwrap_or(chrono::Duration::hours(1));
    let purged = ledger.purge_created_before(purge_cutoff).await;
    if purged > 0 {
        store.save_confirmations(&ledger.snapshot().await).await?;
        eprintln!("   Purged {purged} stale confirmations");
    }

    // ── Workflow ─────────────────────────────────────────────────────────
    let resolver = Arc::new(Resolver::new(directory.clone()));
    let workflow = Arc::new(ConfirmationWorkflow::new(
        WorkflowDeps {
            directory: directory.clone(),
            resolver: resolver.clone(),
            ledger: ledger.clone(),
            store: store.clone(),
            messenger: Arc::new(ConsoleMessenger::new()),
        },
        config.confirmation_timeout,
    ));

    // ── Background tasks ─────────────────────────────────────────────────
    let _sweep_handle = spawn_sweep_task(workflow.clone(), config.sweep_interval);
    let _reset_handle = spawn_daily_reset_task(directory.clone(), &config);

    // ── Console loop ─────────────────────────────────────────────────────
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                if !handle_command(line.trim(), &directory, &resolver, &workflow).await {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}

/// Execute one console command. Returns false to exit the loop.
async fn handle_command(
    line: &str,
    directory: &Arc<WorkerDirectory>,
    resolver: &Arc<Resolver>,
    workflow: &Arc<ConfirmationWorkflow>,
) -> bool {
    if line.is_empty() {
        return true;
    }
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("quit") | Some("exit") => return false,

        Some("workers") => {
            for worker in directory.snapshot().await {
                eprintln!(
                    "   {} ({}) available={} bookings_today={}",
                    worker.name, worker.contact_id, worker.available, worker.bookings_today
                );
            }
        }

        Some("book") => {
            let (Some(date), Some(time), Some(service)) =
                (parts.next(), parts.next(), parts.next())
            else {
                eprintln!("   usage: book <date> <time> <service> <client>");
                return true;
            };
            let client = parts.collect::<Vec<_>>().join(" ");
            let booking = Booking {
                date: date.into(),
                start_time: time.into(),
                service_name: service.into(),
                client_display_name: if client.is_empty() { "client".into() } else { client },
            };
            match resolver.resolve(date, time, None).await {
                Some(worker) => {
                    match workflow
                        .create_confirmation(&booking, &worker, "console")
                        .await
                    {
                        Ok(conf) => eprintln!(
                            "   Assigned to {} (confirmation {}, status {})",
                            worker.name, conf.id, conf.status
                        ),
                        Err(e) => eprintln!("   Could not create confirmation: {e}"),
                    }
                }
                None => eprintln!("   No barber available on {date} at {time}"),
            }
        }

        Some("reply") => {
            let Some(contact) = parts.next() else {
                eprintln!("   usage: reply <contact> <text…>");
                return true;
            };
            let text = parts.collect::<Vec<_>>().join(" ");
            match workflow.handle_worker_reply(contact, &text).await {
                Some(outcome) => eprintln!(
                    "   {} → {}",
                    outcome.worker.name, outcome.confirmation.status
                ),
                None => eprintln!("   (not confirmation-related, ignored)"),
            }
        }

        Some(other) => eprintln!("   Unknown command: {other}"),
        None => {}
    }
    true
}

/// Reset every worker's same-day counter at local business midnight.
fn spawn_daily_reset_task(
    directory: Arc<WorkerDirectory>,
    config: &AppConfig,
) -> tokio::task::JoinHandle<()> {
    let offset = config.business_offset();
    tokio::spawn(async move {
        loop {
            let local = Utc::now().with_timezone(&offset);
            let elapsed_today = u64::from(local.num_seconds_from_midnight());
            // Small slack so the tick lands just past midnight
            let until_midnight = 86_400 - elapsed_today + 5;
            tokio::time::sleep(std::time::Duration::from_secs(until_midnight)).await;
            directory.reset_daily_counters().await;
        }
    })
}
