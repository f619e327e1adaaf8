use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

mod api;
mod cli;
mod error;
mod metrics;
mod models;
mod services;
mod state;

use api::{agent_routes, watchdog_routes};
use cli::{Command, CommandArgs};
use metrics::WatchdogMetrics;
use models::AppConfig;
use services::notifier::startup_message;
use services::process_checker::hostname;
use services::{
    AgentClient, CompositeLister, ConfigStore, DingTalkNotifier, HeartbeatMonitor, Notifier,
    PollScheduler, StateEngine, StatusReporter, TargetLister,
};
use state::{AppContext, AppState};

const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();

    match args.command {
        Some(Command::Agent { ref address, port }) => run_agent(address, port).await,
        None => run_watchdog(&args).await,
    }
}

async fn run_agent(address: &str, port: u16) -> anyhow::Result<()> {
    let bind_address = format!("{}:{}", address, port);
    log::info!("Agent mode on {} (host {})", bind_address, hostname());

    HttpServer::new(|| App::new().configure(agent_routes))
        .bind(&bind_address)
        .with_context(|| format!("failed to bind agent to {}", bind_address))?
        .run()
        .await
        .context("agent server failed")
}

async fn run_watchdog(args: &CommandArgs) -> anyhow::Result<()> {
    let store = ConfigStore::new(args.config.clone());
    let config = store
        .load()
        .with_context(|| format!("cannot start with config {}", store.path().display()))?;

    let address = args.address.clone().unwrap_or_else(|| config.web_host.clone());
    let port = args.port.unwrap_or(config.web_port);
    let bind_address = format!("{}:{}", address, port);
    let reporter = hostname();

    let metrics = Arc::new(WatchdogMetrics::new().context("failed to register metrics")?);
    let engine = Arc::new(StateEngine::new(
        config.alert_cooldown(),
        reporter.clone(),
        metrics.clone(),
    ));
    let dingtalk = DingTalkNotifier::new(&config.notification);
    if !dingtalk.is_configured() {
        log::warn!("Notification webhook is not configured, alerts will only be logged");
    }
    let notifier: Arc<dyn Notifier> = Arc::new(dingtalk);
    let heartbeat = Arc::new(HeartbeatMonitor::new(&config.heartbeat));
    let agent = AgentClient::new();
    let lister: Arc<dyn TargetLister> = Arc::new(CompositeLister::from_client(agent.clone()));
    let targets = config.targets();

    let state: AppState = Arc::new(AppContext {
        config_store: store,
        status: StatusReporter::new(
            engine.clone(),
            agent.clone(),
            targets.clone(),
            heartbeat.is_enabled(),
            config.check_interval_seconds,
            config.alert_cooldown_seconds,
        ),
        notifier: notifier.clone(),
        agent,
        metrics: metrics.clone(),
        reporter: reporter.clone(),
    });

    print_banner(&config, &bind_address);
    notifier.notify(&startup_message(&reporter)).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = PollScheduler::new(
        targets,
        config.check_interval(),
        lister,
        engine,
        notifier,
        metrics,
    );
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let heartbeat_task = {
        let heartbeat = heartbeat.clone();
        tokio::spawn(async move { heartbeat.run(shutdown_rx).await })
    };

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(watchdog_routes)
    })
    .disable_signals()
    .bind(&bind_address)
    .with_context(|| format!("failed to bind status API to {}", bind_address))?
    .run();
    let server_handle = server.handle();
    let mut server_task = actix_rt::spawn(server);

    let server_result = tokio::select! {
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received");
            None
        }
        res = &mut server_task => Some(res),
    };

    let _ = shutdown_tx.send(true);

    let server_result = match server_result {
        Some(res) => res,
        None => {
            server_handle.stop(true).await;
            server_task.await
        }
    };

    for (name, task) in [("poll scheduler", scheduler_task), ("heartbeat", heartbeat_task)] {
        match tokio::time::timeout(TASK_STOP_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("{} task ended abnormally: {}", name, e),
            Err(_) => log::warn!("{} did not stop within {:?}, abandoning it", name, TASK_STOP_TIMEOUT),
        }
    }

    match server_result {
        Ok(Ok(())) => {
            log::info!("Watchdog stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            heartbeat.ping_fail(&format!("status API failed: {}", e)).await;
            Err(e).context("status API failed")
        }
        Err(e) => {
            heartbeat.ping_fail(&format!("status API crashed: {}", e)).await;
            Err(anyhow::anyhow!("status API task crashed: {}", e))
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                log::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn print_banner(config: &AppConfig, bind_address: &str) {
    let enabled = config.monitors.iter().filter(|m| m.enabled).count();

    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║      Process Watchdog v{:<35}║", env!("CARGO_PKG_VERSION"));
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🚀 Status API on http://{}", bind_address);
    println!(
        "⏱  Check every {}s, alert cooldown {}s",
        config.check_interval_seconds, config.alert_cooldown_seconds
    );
    println!("📋 Monitors: {} configured, {} enabled", config.monitors.len(), enabled);
    for monitor in &config.monitors {
        let location = monitor.locator();
        let flag = if monitor.enabled { " " } else { "-" };
        println!(
            "  {} {:<16} {:<22} {}",
            flag,
            monitor.name,
            location.to_string(),
            monitor.processes.join(", ")
        );
    }
    println!();
    println!("💓 Heartbeat: {}", if config.heartbeat.enabled { "enabled" } else { "disabled" });
    println!("═══════════════════════════════════════════════════════════");
}
