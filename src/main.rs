//! asif - a small IRC bot driven by the asif client framework.
//!
//! Connects to the configured server, joins the `autojoin` channels once
//! registered and logs the conversation. Ctrl-C quits cleanly.

use asif::{Client, Config, Matcher, Recipient, telemetry};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let json = std::env::var("ASIF_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    telemetry::init("info", json);

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        server = %config.address(),
        nick = %config.identity.nick,
        channels = config.autojoin.len(),
        "Starting asif"
    );

    let autojoin = config.autojoin.clone();
    let client = Client::new(config);

    client.on_connected(move |client| {
        let autojoin = autojoin.clone();
        async move {
            for channel in &autojoin {
                client.join(channel)?;
            }
            Ok(())
        }
    });

    client.on_join(None, |channel| async move {
        info!(channel = %channel.name(), members = channel.members().len(), "Ready in channel");
        Ok(())
    });

    client.on_message(Matcher::any(), |msg, _| async move {
        let from = msg.sender.as_ref().map(|u| u.name().to_string()).unwrap_or_default();
        match &msg.recipient {
            Recipient::Channel(channel) => {
                info!(channel = %channel.name(), from = %from, notice = msg.notice, "{}", msg.text)
            }
            Recipient::User(_) => info!(from = %from, notice = msg.notice, "{}", msg.text),
        }
        Ok(())
    });

    // Quit on Ctrl-C; the loop ends once the server closes the link.
    let quitter = client.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Shutdown signal received");
        if let Err(e) = quitter.quit(Some("Shutting down")).await {
            warn!(error = %e, "Quit failed");
        }
    });

    client.run().await?;
    info!("Server shutdown complete");
    Ok(())
}
