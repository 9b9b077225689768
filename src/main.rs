use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use nostr_note::config::{self, Config};
use nostr_note::crypto::Schnorr;
use nostr_note::identity::IdentityStore;
use nostr_note::{nostr, platform, relay, util};

#[derive(Parser, Debug)]
#[command(name = "nostr-note", version, about = "Publish a signed Nostr text note to a relay")]
struct Args {
    /// Note content.
    #[arg(default_value = "Hello")]
    message: String,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    key_file: Option<PathBuf>,
    #[arg(long)]
    relay: Option<String>,
    #[arg(long, default_value = "warn")]
    log_level: String,
    #[arg(long)]
    connect_timeout_secs: Option<u64>,
    #[arg(long)]
    ack_timeout_secs: Option<u64>,
    /// Print the public key and exit without publishing.
    #[arg(long)]
    show_pubkey: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = util::parse_log_level(&args.log_level)
                .ok_or_else(|| anyhow!("invalid log level: {}", args.log_level))?;
            EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let _ = rustls::crypto::ring::default_provider().install_default();

    let cfg = resolve_config(&args)?;
    let store = match cfg.key_file.as_ref() {
        Some(path) => IdentityStore::at(path),
        None => IdentityStore::default_location()?,
    };

    let scheme = Schnorr::new();
    let keyset = store
        .get_or_init(&scheme)
        .with_context(|| format!("identity unavailable ({})", store.path().display()))?;
    info!(pubkey = %keyset.public, path = %store.path().display(), "identity ready");

    if args.show_pubkey {
        println!("{}", keyset.public);
        return Ok(());
    }

    let event = nostr::sign_text_note(&scheme, &keyset, &args.message).context("could not sign note")?;
    info!(event = %event.id, relay = %cfg.relay, "publishing");

    let ack = relay::publish(&event, &cfg.relay, &cfg.publish_options())
        .await
        .with_context(|| format!("publish to {} failed", cfg.relay))?;

    if ack.message.is_empty() {
        println!("published {} to {}", ack.event_id, cfg.relay);
    } else {
        println!("published {} to {} ({})", ack.event_id, cfg.relay, ack.message);
    }
    Ok(())
}

fn resolve_config(args: &Args) -> Result<Config> {
    let (path, required) = match args.config.as_ref() {
        Some(p) => (p.clone(), true),
        None => (platform::default_config_path(), false),
    };
    let mut cfg = Config::load(&path, required)?;

    if let Some(relay) = args.relay.as_ref() {
        cfg.relay = relay.trim().to_string();
    }
    if let Some(key_file) = args.key_file.as_ref() {
        cfg.key_file = Some(key_file.clone());
    }
    if let Some(secs) = args.connect_timeout_secs {
        cfg.connect_timeout_secs = secs;
    }
    if let Some(secs) = args.ack_timeout_secs {
        cfg.ack_timeout_secs = secs;
    }
    cfg.validate()?;
    if cfg.relay != config::DEFAULT_RELAY {
        info!(relay = %cfg.relay, "using configured relay");
    }
    Ok(cfg)
}
