//! puppetbridge - Discord <-> IRC relay with per-user IRC puppets.
//!
//! Without a linked Discord client the bridge speaks JSON lines: puppet
//! commands on stdin, webhook and direct-message deliveries on stdout.

use std::sync::Arc;

use puppetbridge::config::{self, ChannelLinkTable, Config};
use puppetbridge::discord::stdio::{self, JsonLinesOutbound};
use puppetbridge::discord::{DiscordOutbound, run_direct, run_relay};
use puppetbridge::http;
use puppetbridge::irc::{ConnectionMachine, IrcContext, Role, SessionOutcome, TcpConnector};
use puppetbridge::mention::MentionLookup;
use puppetbridge::metrics::BridgeStats;
use puppetbridge::puppet::{PuppetContext, Supervisor};
use puppetbridge::roles::{AdminBot, Listener};
use puppetbridge::telemetry::{init_tracing, spans};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "puppetbridge.toml";

async fn await_connection(role: &str, task: JoinHandle<SessionOutcome>) {
    match task.await {
        Ok(outcome) => info!(role, ?outcome, "Connection task finished"),
        Err(e) => error!(role, error = %e, "Connection task failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };
    init_tracing(&config.global.log_level);

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.irc.server,
        port = config.irc.port,
        tls = config.irc.tls,
        links = config.links.len(),
        "Starting puppetbridge"
    );

    let stats = Arc::new(BridgeStats::new()?);
    let shutdown = CancellationToken::new();

    // Prometheus metrics are optional; metrics_port = 0 disables the endpoint.
    if config.global.metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        let (port, stats, shutdown) = (config.global.metrics_port, stats.clone(), shutdown.clone());
        tokio::spawn(async move {
            http::run_http_server(port, stats, shutdown).await;
        });
    }

    let irc = IrcContext {
        config: Arc::new(config.connection_config()),
        connector: Arc::new(TcpConnector),
        stats: stats.clone(),
        shutdown: shutdown.clone(),
    };
    let links = Arc::new(ChannelLinkTable::from_config(&config.links));
    let mentions = Arc::new(RwLock::new(MentionLookup::new()));
    let policy = config.nick_policy();

    let (relay_tx, relay_rx) = mpsc::unbounded_channel();
    let (direct_tx, direct_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    // IRC -> Discord listener
    let listener = Listener::new(
        config.irc.listener_nickname.clone(),
        config.irc.puppet_suffix.clone(),
        links.clone(),
        relay_tx,
        stats.clone(),
    );
    let listener_task = ConnectionMachine::new(listener, irc.clone()).spawn(spans::connection(
        Listener::KIND,
        &config.irc.listener_nickname,
    ));

    // Admin bot
    let bot = AdminBot::new(
        config.irc.bot_nickname.clone(),
        config.irc.bot_channel.clone(),
        stats.clone(),
    );
    let bot_task = ConnectionMachine::new(bot, irc.clone())
        .spawn(spans::connection(AdminBot::KIND, &config.irc.bot_nickname));

    // Puppets
    let supervisor = Supervisor::new(
        policy.clone(),
        PuppetContext {
            irc: irc.clone(),
            links: links.clone(),
            direct: direct_tx,
        },
    );
    let supervisor_task = tokio::spawn(supervisor.run(command_rx));

    // Discord boundary
    let outbound: Arc<dyn DiscordOutbound> = Arc::new(JsonLinesOutbound::new(tokio::io::stdout()));
    tokio::spawn(run_relay(relay_rx, outbound.clone(), links.clone(), mentions.clone()));
    tokio::spawn(run_direct(direct_rx, outbound, mentions.clone()));
    tokio::spawn(stdio::run_commands(
        tokio::io::stdin(),
        command_tx,
        policy,
        links,
        mentions,
        shutdown.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();

    if let Err(e) = supervisor_task.await {
        error!(error = %e, "Supervisor task failed");
    }
    await_connection(Listener::KIND, listener_task).await;
    await_connection(AdminBot::KIND, bot_task).await;

    info!("puppetbridge stopped");
    Ok(())
}
