mod logging;
mod prompt;

use std::sync::Arc;

use color_eyre::eyre::{Context, Result};
use owo_colors::OwoColorize;
use tokio::sync::Notify;
use sweep_worker::{
    Account, BridgeProvider, Config, DialogOutcome, InactivityPeriod, MuteDuration, NewAccount,
    Proxy, SkipReason, SweepDb, SweepEvent, SweepReport, SweepWorker, WorkerError,
};

use crate::prompt::{StdinPrompt, parse_number, read_line};

type Worker = SweepWorker<BridgeProvider>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::load().wrap_err("Failed to load configuration")?;
    logging::init(&config.log_path)?;
    tracing::info!("Sweep start, data dir {}", config.data_dir.display());

    std::fs::create_dir_all(&config.settings.sessions_dir).wrap_err_with(|| {
        format!(
            "Failed to create sessions directory {}",
            config.settings.sessions_dir.display()
        )
    })?;

    let db = SweepDb::new_with_path(&config.db_path)
        .await
        .wrap_err("Failed to open account database")?;

    let provider = BridgeProvider::new(config.bridge.clone());
    if let Err(e) = provider.start().await {
        tracing::warn!("Bridge did not start: {}", e);
        println!(
            "{} Bridge unavailable ({}). Account operations will fail until it can start.",
            "⚠".yellow(),
            e
        );
    }

    let mut worker = SweepWorker::new(db, provider, config.settings.clone());
    let mut event_rx = worker
        .take_event_receiver()
        .ok_or_else(|| color_eyre::eyre::eyre!("Failed to get event receiver"))?;

    let reported = Arc::new(Notify::new());
    let printer = reported.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let completed = matches!(event, SweepEvent::Completed { .. });
            handle_event(event);
            if completed {
                printer.notify_one();
            }
        }
    });

    // Passed explicitly to each operation rather than stored in the worker.
    let mut selected: Option<Account> = None;

    loop {
        print_menu(selected.as_ref());
        let choice = read_line("Choice: ")?;

        let current = selected.clone();
        let result = match (choice.as_str(), current) {
            ("1", _) => add_account(&worker).await,
            ("2", _) => select_account(&worker, &mut selected).await,
            ("3" | "4" | "5" | "6", None) => {
                println!("⚠ Please select an account first.");
                Ok(())
            }
            ("3", Some(account)) => set_proxy(&worker, account, &mut selected).await,
            ("4", Some(account)) => mute_channels(&worker, account, &reported).await,
            ("5", Some(account)) => delete_inactive(&worker, account, &reported).await,
            ("6", Some(account)) => leave_inactive(&worker, account, &reported).await,
            ("0", _) => {
                println!("👋 Shutting down...");
                worker.provider().shutdown().await?;
                break;
            }
            (_, _) => {
                println!("❌ Invalid choice");
                Ok(())
            }
        };

        if let Err(e) = result {
            if e.is_fatal() {
                return Err(e).wrap_err("Storage failure");
            }
            tracing::warn!("Operation failed: {}", e);
            println!("{} {}", "❌".red(), e);
        }
    }

    Ok(())
}

fn print_menu(selected: Option<&Account>) {
    println!();
    println!("{}", "╔════════════════════════════════════╗".cyan());
    println!("{}", "║       SWEEP - Account Manager      ║".cyan());
    println!("{}", "╠════════════════════════════════════╣".cyan());
    println!("║  1. Add Account                    ║");
    println!("║  2. Select Account                 ║");
    println!("║  3. Set Proxy                      ║");
    println!("║  4. Mute All Channels              ║");
    println!("║  5. Delete Inactive Chats          ║");
    println!("║  6. Leave Inactive Chats/Channels  ║");
    println!("║  0. Exit                           ║");
    println!("{}", "╚════════════════════════════════════╝".cyan());
    match selected {
        Some(account) => println!("Current account: {}", account.label().green()),
        None => println!("{}", "No account selected.".dimmed()),
    }
}

fn handle_event(event: SweepEvent) {
    match event {
        SweepEvent::Started {
            kind,
            account,
            total,
        } => {
            println!("\n🧹 {} for {}: {} dialogs", kind, account, total);
        }
        SweepEvent::Progress {
            current,
            total,
            dialog,
            outcome,
            ..
        } => {
            println!("   [{}/{}] {} - {}", current, total, dialog, describe(&outcome));
        }
        SweepEvent::RateLimited {
            operation, wait, ..
        } => {
            println!(
                "   ⏳ Rate limited on {}, waiting {}s",
                operation,
                wait.as_secs()
            );
        }
        SweepEvent::Completed { account, report } => {
            tracing::debug!(account = %account, "Sweep completed");
            print_report(&report);
        }
    }
}

fn describe(outcome: &DialogOutcome) -> String {
    match outcome {
        DialogOutcome::Acted => "done".green().to_string(),
        DialogOutcome::Skipped(SkipReason::ServiceNotices) => {
            "skipped (service notices)".to_string()
        }
        DialogOutcome::Skipped(SkipReason::NoMessages) => "skipped (no messages)".to_string(),
        DialogOutcome::Skipped(SkipReason::Active) => "skipped (active)".dimmed().to_string(),
        DialogOutcome::Failed(reason) => format!("failed: {}", reason).red().to_string(),
    }
}

/// Printed from the event task so it lands after the last progress line.
fn print_report(report: &SweepReport) {
    println!(
        "\n✅ Finished {}: {} acted, {} skipped, {} failed (of {})",
        report.kind,
        report.acted,
        report.skipped,
        report.failed.len(),
        report.total
    );
    for failed in &report.failed {
        println!("   ⚠ {} ({}): {}", failed.name, failed.id, failed.reason);
    }
}

async fn add_account(worker: &Worker) -> Result<(), WorkerError> {
    let api_id = read_line("API ID: ").map_err(prompt_error)?;
    let api_hash = read_line("API hash: ").map_err(prompt_error)?;
    let phone_number = read_line("Phone number: ").map_err(prompt_error)?;

    if api_id.is_empty() || api_hash.is_empty() || phone_number.is_empty() {
        println!("❌ API ID, API hash and phone number are required");
        return Ok(());
    }

    let account = worker
        .register_account(
            NewAccount {
                api_id,
                api_hash,
                phone_number,
            },
            &StdinPrompt,
        )
        .await?;
    println!("✅ Added account {} (ID {})", account.label(), account.id);
    Ok(())
}

async fn select_account(
    worker: &Worker,
    selected: &mut Option<Account>,
) -> Result<(), WorkerError> {
    let accounts = worker.list_accounts().await?;
    if accounts.is_empty() {
        println!("📭 No accounts found");
        return Ok(());
    }

    println!("\n📋 Accounts:");
    for account in &accounts {
        let proxy = if account.proxy.is_some() { " 🌐" } else { "" };
        println!("  ID: {}, Username: {}{}", account.id, account.label(), proxy);
    }

    let input = read_line("Account ID: ").map_err(prompt_error)?;
    let Some(id) = parse_number::<i64>(&input) else {
        println!("❌ Not a valid ID");
        return Ok(());
    };

    match worker.get_account(id).await {
        Ok(account) => {
            println!("Selected account: {}", account.label().green());
            *selected = Some(account);
            Ok(())
        }
        Err(WorkerError::AccountNotFound(_)) => {
            println!("❌ Account not found.");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn set_proxy(
    worker: &Worker,
    account: Account,
    selected: &mut Option<Account>,
) -> Result<(), WorkerError> {
    let input = read_line("Proxy as type,host,port[,user,password] (empty to clear): ")
        .map_err(prompt_error)?;

    let proxy = if input.is_empty() {
        None
    } else {
        match input.parse::<Proxy>() {
            Ok(proxy) => Some(proxy),
            Err(e) => {
                println!("❌ Invalid proxy: {}", e);
                return Ok(());
            }
        }
    };

    let updated = worker.set_proxy(account.id, proxy.as_ref()).await?;
    match &updated.proxy {
        Some(p) => println!("✅ Proxy set: {}://{}:{}", p.kind.as_str(), p.host, p.port),
        None => println!("✅ Proxy cleared"),
    }
    *selected = Some(updated);
    Ok(())
}

async fn mute_channels(
    worker: &Worker,
    account: Account,
    reported: &Notify,
) -> Result<(), WorkerError> {
    let input = read_line("Mute duration in minutes (0 = forever): ").map_err(prompt_error)?;
    let Some(minutes) = parse_number::<u32>(&input) else {
        println!("❌ Enter a whole number of minutes");
        return Ok(());
    };

    worker
        .mute_all_channels(&account, MuteDuration::from_minutes(minutes), &StdinPrompt)
        .await?;
    reported.notified().await;
    Ok(())
}

async fn delete_inactive(
    worker: &Worker,
    account: Account,
    reported: &Notify,
) -> Result<(), WorkerError> {
    let Some(period) = read_period("Inactivity period for deleting chats (days): ")? else {
        return Ok(());
    };

    worker
        .delete_inactive_chats(&account, period, &StdinPrompt)
        .await?;
    reported.notified().await;
    Ok(())
}

async fn leave_inactive(
    worker: &Worker,
    account: Account,
    reported: &Notify,
) -> Result<(), WorkerError> {
    let Some(period) = read_period("Inactivity period for leaving channels and groups (days): ")?
    else {
        return Ok(());
    };

    worker.leave_inactive(&account, period, &StdinPrompt).await?;
    reported.notified().await;
    Ok(())
}

fn read_period(prompt: &str) -> Result<Option<InactivityPeriod>, WorkerError> {
    let input = read_line(prompt).map_err(prompt_error)?;
    match parse_number::<u32>(&input) {
        Some(days) => Ok(Some(InactivityPeriod::days(days))),
        None => {
            println!("❌ Enter a whole number of days");
            Ok(None)
        }
    }
}

fn prompt_error(e: std::io::Error) -> WorkerError {
    WorkerError::Prompt(e.to_string())
}
