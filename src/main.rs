use clap::Parser;
use std::time::Duration;
use stream_viewer_lib::config::{SessionConfig, Timing, DEFAULT_SIGNALING_URL};
use stream_viewer_lib::utils::server_config_from_url;

/// Headless viewer for a remote WebRTC media source.
///
/// Commands on stdin: start, stop, cancel, status, roi x,y ..., quit
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// WebSocket signaling endpoint
    #[arg(long, default_value = DEFAULT_SIGNALING_URL, env = "VIEWER_SIGNALING_URL")]
    signaling_url: String,

    /// STUN/TURN servers (comma-separated); empty means host candidates only
    #[arg(long = "ice-server", value_delimiter = ',', env = "VIEWER_ICE_SERVERS")]
    ice_servers: Vec<String>,

    /// Username for TURN servers
    #[arg(long, env = "VIEWER_TURN_USERNAME")]
    turn_username: Option<String>,

    /// Credential for TURN servers
    #[arg(long, env = "VIEWER_TURN_CREDENTIAL")]
    turn_credential: Option<String>,

    /// Auto-recovery countdown in seconds
    #[arg(long, default_value_t = 5)]
    recovery_countdown: u32,

    /// Delay before reopening a dropped signaling channel, in milliseconds
    #[arg(long, default_value_t = 2000)]
    reopen_delay_ms: u64,

    /// Wait for an explicit `start` instead of connecting immediately
    #[arg(long)]
    no_autostart: bool,
}

impl Cli {
    fn into_config(self) -> SessionConfig {
        let ice_servers = self
            .ice_servers
            .iter()
            .filter(|url| !url.trim().is_empty())
            .enumerate()
            .map(|(i, url)| {
                server_config_from_url(
                    i,
                    url.trim(),
                    self.turn_username.as_deref(),
                    self.turn_credential.as_deref(),
                )
            })
            .collect();

        let timing = Timing {
            recovery_countdown: self.recovery_countdown,
            channel_reopen_delay: Duration::from_millis(self.reopen_delay_ms),
            ..Default::default()
        };

        SessionConfig::new(self.signaling_url)
            .with_ice_servers(ice_servers)
            .with_timing(timing)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let autostart = !cli.no_autostart;
    stream_viewer_lib::run(cli.into_config(), autostart).await
}
