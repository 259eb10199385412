// lockbox — OTP-secured LAN messaging from the command line
//
// Plays the controller role around lockbox-core: collects message, phone,
// and peer inputs, runs the send/receive flows, and renders typed core
// errors for the terminal.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use lockbox_core::config::{RelayConfig, SmsGatewayConfig};
use lockbox_core::otp::{self, OtpKind};
use lockbox_core::relay::client::{pull_message, push_message};
use lockbox_core::relay::supervisor::RelaySupervisor;
use lockbox_core::{crypto, discovery, sms, DEFAULT_PORT};

#[derive(Parser)]
#[command(name = "lockbox")]
#[command(about = "LockBox — OTP-secured messaging over the local network", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the local subnet for reachable relays
    Scan {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Encrypt a message and push it into a peer's mailbox
    Send {
        /// Peer IPv4 address (see `lockbox scan`)
        peer: String,
        message: String,
        /// Phone number that receives the OTP out of band
        #[arg(short = 'n', long)]
        phone: String,
        #[arg(long, default_value_t = OtpKind::Numeric)]
        otp_kind: OtpKind,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Encrypt a message without pushing it anywhere
    Encrypt {
        message: String,
        /// Deliver the OTP to this phone; omit to print it instead
        #[arg(short = 'n', long)]
        phone: Option<String>,
        #[arg(long, default_value_t = OtpKind::Numeric)]
        otp_kind: OtpKind,
    },
    /// Pull the pending message from the local mailbox and decrypt it
    Receive {
        /// OTP received out of band
        #[arg(short, long)]
        otp: String,
        /// Decrypt this envelope instead of pulling from the local mailbox
        #[arg(short, long)]
        envelope: Option<String>,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Run the relay mailbox server in the foreground
    Serve {
        /// Bind host (overrides LOCKBOX_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides LOCKBOX_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { port } => cmd_scan(port).await,
        Commands::Send {
            peer,
            message,
            phone,
            otp_kind,
            port,
        } => cmd_send(peer, message, phone, otp_kind, port).await,
        Commands::Encrypt {
            message,
            phone,
            otp_kind,
        } => cmd_encrypt(message, phone, otp_kind).await,
        Commands::Receive {
            otp,
            envelope,
            port,
        } => cmd_receive(otp, envelope, port).await,
        Commands::Serve { host, port } => cmd_serve(host, port).await,
    }
}

async fn cmd_scan(port: u16) -> Result<()> {
    println!("{}", "Scanning the local subnet…".bold());
    let peers = discovery::scan(port).await;

    if peers.is_empty() {
        println!("  {} no devices found", "✗".red());
        return Ok(());
    }
    for peer in peers {
        println!(
            "  {} {} ({})",
            "✓".green(),
            peer.device_name.bright_cyan(),
            peer.ip
        );
    }
    Ok(())
}

async fn cmd_send(
    peer: String,
    message: String,
    phone: String,
    otp_kind: OtpKind,
    port: u16,
) -> Result<()> {
    let otp = otp::generate(otp_kind);
    deliver_otp(&phone, &otp).await?;

    let status = push_message(&message, &otp, &peer, port)
        .await
        .with_context(|| format!("failed to push the message to {}", peer))?;

    if status.is_success() {
        println!("  {} message delivered to {}", "✓".green(), peer);
        Ok(())
    } else {
        bail!("peer {} answered with status {}", peer, status);
    }
}

async fn cmd_encrypt(message: String, phone: Option<String>, otp_kind: OtpKind) -> Result<()> {
    let otp = otp::generate(otp_kind);
    match phone {
        Some(phone) => deliver_otp(&phone, &otp).await?,
        None => println!("  {} OTP: {}", "✓".green(), otp.bright_yellow()),
    }

    let envelope = crypto::encrypt_message(&message, &otp).context("encryption failed")?;
    println!("{}", "Envelope:".bold());
    println!("{}", envelope);
    Ok(())
}

async fn cmd_receive(otp: String, envelope: Option<String>, port: u16) -> Result<()> {
    let plaintext = match envelope {
        Some(envelope) => crypto::decrypt_message(&envelope, &otp)
            .context("failed to decrypt the envelope")?,
        None => pull_message(&otp, port)
            .await
            .context("failed to read the local mailbox")?,
    };

    println!("{}", "Decrypted message:".bold());
    println!("{}", plaintext.bright_cyan());
    Ok(())
}

async fn cmd_serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = RelayConfig::from_env();
    if let Some(host) = host {
        config.host = host.parse().context("invalid bind host")?;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let supervisor = RelaySupervisor::new();
    let addr = supervisor.start(&config)?;
    println!("  {} relay mailbox listening on {}", "✓".green(), addr);
    println!("  press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    supervisor.stop().await;
    println!("  {} relay stopped", "✓".green());
    Ok(())
}

async fn deliver_otp(phone: &str, otp: &str) -> Result<()> {
    let gateway = SmsGatewayConfig::from_env().context(
        "SMS gateway not configured; set LOCKBOX_SMS_URL, LOCKBOX_SMS_DEVICE and LOCKBOX_SMS_API_KEY",
    )?;
    sms::send_otp(&gateway, phone, otp)
        .await
        .context("failed to deliver the OTP")?;
    println!("  {} OTP sent to {}", "✓".green(), phone);
    Ok(())
}
