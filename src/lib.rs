pub mod api;
pub mod clients;
pub mod config;
pub mod controller;
pub mod db;
pub mod domain;
pub mod entities;
pub mod services;
pub mod state;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::Config;
pub use controller::SearchController;

use crate::domain::Identity;
use crate::state::SharedState;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key, value)?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" | "daemon" | "-d" | "--daemon" => run_server(config, prometheus_handle).await,

        "ask" | "a" => {
            let query = args[2..].join(" ");
            cmd_ask(config, &query).await
        }

        "history" | "h" => {
            let limit = args
                .get(2)
                .and_then(|s| s.parse().ok())
                .unwrap_or(db::DEFAULT_LIST_LIMIT);
            cmd_history(config, limit).await
        }

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Askarr - Self-hosted AI Search Assistant");
    println!("Ask questions, get cited answers, keep your history private");
    println!();
    println!("USAGE:");
    println!("  askarr <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  ask [query]       Run a search (interactive session when no query given)");
    println!("  history [n]       Show recent searches (default: 20)");
    println!("  serve             Run the web API server");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("INTERACTIVE COMMANDS (inside 'askarr ask'):");
    println!("  :history          Toggle the history view");
    println!("  :rerun <n>        Re-run entry <n> from the history view");
    println!("  :delete <id>      Delete a history entry by record id");
    println!("  :quit             Exit the session");
    println!();
    println!("EXAMPLES:");
    println!("  askarr ask \"current rust release\"   # One-shot search");
    println!("  askarr ask                          # Interactive session");
    println!("  askarr history 5                    # Last 5 searches");
    println!("  askarr serve                        # Start the web server");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure the provider, server, and logging.");
    println!("  Set ASKARR_PROVIDER_API_KEY to override the configured API key.");
}

/// Resolve the configured CLI user to an identity. The CLI runs every
/// command as this user, so it must exist in the database.
async fn resolve_cli_identity(state: &SharedState, username: &str) -> anyhow::Result<Identity> {
    let user = state
        .store
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("CLI user '{username}' not found in database"))?;

    Ok(Identity::new(user.id))
}

async fn cmd_ask(config: Config, query: &str) -> anyhow::Result<()> {
    let cli_user = config.general.cli_user.clone();
    let state = SharedState::new(config).await?;
    let identity = resolve_cli_identity(&state, &cli_user).await?;

    let mut controller = SearchController::new(
        state.store.clone(),
        (*state.search_gateway).clone(),
        Some(identity),
    );

    if !query.trim().is_empty() {
        controller.submit(query).await;
        print_outcome(&controller);
        return Ok(());
    }

    println!("Askarr interactive session (user: {cli_user})");
    println!("Type a question, or :help for commands.");
    println!();

    controller.refresh_views().await;

    loop {
        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let line = input.trim();

        if line.is_empty() {
            continue;
        }

        match line {
            ":quit" | ":q" | ":exit" => break,

            ":help" => {
                println!("  :history          Toggle the history view");
                println!("  :rerun <n>        Re-run entry <n> from the history view");
                println!("  :delete <id>      Delete a history entry by record id");
                println!("  :quit             Exit the session");
                continue;
            }

            ":history" => {
                controller.toggle_history();
                if controller.show_history {
                    print_history(&controller.all);
                }
                continue;
            }

            _ => {}
        }

        if let Some(arg) = line.strip_prefix(":rerun ") {
            let Ok(index) = arg.trim().parse::<usize>() else {
                println!("Usage: :rerun <n>");
                continue;
            };
            let Some(record) = controller.all.get(index.wrapping_sub(1)).cloned() else {
                println!("No history entry #{index}. Use :history to list entries.");
                continue;
            };
            println!("Re-running: {}", record.query);
            controller.select_history_entry(record).await;
            print_outcome(&controller);
        } else if let Some(arg) = line.strip_prefix(":delete ") {
            let Ok(record_id) = arg.trim().parse::<i32>() else {
                println!("Usage: :delete <id>");
                continue;
            };
            controller.delete_entry(record_id).await;
            if let Some(err) = controller.error_message.take() {
                println!("✗ {err}");
            } else {
                println!("✓ Deleted record #{record_id}");
            }
        } else {
            controller.submit(line).await;
            print_outcome(&controller);
        }

        controller.refresh_from_events().await;
    }

    Ok(())
}

fn print_outcome(controller: &SearchController) {
    if let Some(err) = &controller.error_message {
        println!("✗ Search failed: {err}");
        return;
    }

    let Some(outcome) = &controller.current_result else {
        return;
    };

    println!();
    println!("{}", outcome.response);

    if !outcome.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &outcome.sources {
            println!("  {} - {}", source.title, source.url);
        }
    }
    println!();
}

fn print_history(records: &[domain::search::SearchRecord]) {
    if records.is_empty() {
        println!("No search history.");
        return;
    }

    println!("Search History ({} entries)", records.len());
    println!("{:-<70}", "");

    for (index, record) in records.iter().enumerate() {
        let when = chrono::DateTime::from_timestamp_millis(record.created_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());

        println!("{}. [{}] {} (id: {})", index + 1, when, record.query, record.id);
    }
    println!();
}

async fn cmd_history(config: Config, limit: u64) -> anyhow::Result<()> {
    let cli_user = config.general.cli_user.clone();
    let state = SharedState::new(config).await?;
    let identity = resolve_cli_identity(&state, &cli_user).await?;

    let records = state.store.list_all(Some(identity), limit).await?;

    if records.is_empty() {
        println!("No search history.");
        println!();
        println!("Run a search with: askarr ask \"your question\"");
        return Ok(());
    }

    println!("Search History (last {}):", records.len());
    println!("{:-<70}", "");

    for record in records {
        let when = chrono::DateTime::from_timestamp_millis(record.created_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());

        let preview: String = record.response.chars().take(80).collect();
        let ellipsis = if record.response.chars().count() > 80 {
            "..."
        } else {
            ""
        };

        println!("• [{}] {} (id: {})", when, record.query, record.id);
        println!("  {}{}", preview.replace('\n', " "), ellipsis);
        if !record.sources.is_empty() {
            println!("  {} sources", record.sources.len());
        }
        println!();
    }

    Ok(())
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("Askarr v{} starting...", env!("CARGO_PKG_VERSION"));

    if !config.server.enabled {
        anyhow::bail!("Server is disabled in config.toml ([server] enabled = false)");
    }

    let port = config.server.port;
    let api_state = api::create_app_state_from_config(config, prometheus_handle).await?;

    let app = api::router(api_state).await;
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("🌐 Web Server running at http://0.0.0.0:{port}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    info!("Server running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    info!("Server stopped");

    Ok(())
}
