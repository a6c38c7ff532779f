//! `mailadmin` - IMAP setup check and quota tool
//!
//! Logs in to a mail server once, runs one administrative query and logs out.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use mailadmin_imap::{AuthMechanism, ErrorKind, IpPreference, Quota, Security, Session};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::{PASSWORD_ENV, Settings};

/// Checks IMAP login settings and reports capabilities and storage quotas.
#[derive(Debug, Parser)]
#[command(name = "mailadmin", version, max_term_width = 80)]
struct Cli {
    /// JSON file with the connection settings.
    #[arg(short, long, env = "MAILADMIN_SETTINGS")]
    settings: Option<PathBuf>,

    /// Server hostname.
    #[arg(long, env = "MAILADMIN_IMAP_HOST")]
    host: Option<String>,

    /// Server port [default: 143, or 993 with --encryption tls].
    #[arg(long, env = "MAILADMIN_IMAP_PORT")]
    port: Option<u16>,

    /// Administrator username. The password is read from the settings file
    /// or the `MAILADMIN_IMAP_PASSWORD` environment variable.
    #[arg(short, long, env = "MAILADMIN_IMAP_USER")]
    user: Option<String>,

    /// Address family.
    #[arg(long, value_enum)]
    protocol: Option<Protocol>,

    /// Encryption mode.
    #[arg(short, long, value_enum)]
    encryption: Option<Encryption>,

    /// Authentication mechanism.
    #[arg(short, long, value_enum)]
    auth: Option<Mechanism>,

    /// Name to verify in the server certificate [default: host].
    #[arg(long)]
    tls_name: Option<String>,

    /// Mailbox hierarchy separator used in quota roots.
    #[arg(long)]
    separator: Option<char>,

    /// Reply timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in, print the negotiated capabilities and log out.
    Check,
    /// Print the server capabilities.
    Capabilities {
        /// Ask the server again instead of using the login reply.
        #[arg(long)]
        reload: bool,
    },
    /// Print a user's storage quota.
    Quota {
        /// Mailbox owner, e.g. `alice`.
        user: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Protocol {
    Any,
    V4,
    V6,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Encryption {
    None,
    Starttls,
    Tls,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mechanism {
    Clear,
    Login,
    Plain,
    CramMd5,
}

impl From<Protocol> for IpPreference {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Any => Self::Any,
            Protocol::V4 => Self::V4,
            Protocol::V6 => Self::V6,
        }
    }
}

impl From<Encryption> for Security {
    fn from(encryption: Encryption) -> Self {
        match encryption {
            Encryption::None => Self::Unsecured,
            Encryption::Starttls => Self::StartTls,
            Encryption::Tls => Self::Implicit,
        }
    }
}

impl From<Mechanism> for AuthMechanism {
    fn from(mechanism: Mechanism) -> Self {
        match mechanism {
            Mechanism::Clear => Self::Clear,
            Mechanism::Login => Self::Login,
            Mechanism::Plain => Self::Plain,
            Mechanism::CramMd5 => Self::CramMd5,
        }
    }
}

impl Cli {
    /// Settings given on the command line or through the environment.
    fn overrides(&self, password: Option<String>) -> Settings {
        Settings {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password,
            protocol: self.protocol.map(Into::into),
            encryption: self.encryption.map(Into::into),
            auth_mechanism: self.auth.map(Into::into),
            tls_server_name: self.tls_name.clone(),
            hierarchy_separator: self.separator,
            connect_timeout_secs: None,
            io_timeout_secs: self.timeout,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = match cli.verbose {
        0 => "mailadmin=info,mailadmin_imap=info",
        1 => "mailadmin=debug,mailadmin_imap=debug",
        _ => "mailadmin=trace,mailadmin_imap=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error [{}]: {e:#}", error_kind(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let file = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let settings = file.merge(cli.overrides(std::env::var(PASSWORD_ENV).ok()));
    debug!(?settings, "settings");
    let config = settings.into_config()?;

    let target = format!("{}:{}", config.host, config.port);
    let mut session = Session::new(config);
    session
        .login()
        .with_context(|| format!("login to {target} failed"))?;
    info!(%target, encrypted = session.is_encrypted(), "connected");

    let outcome = execute(&mut session, &cli.command);
    let logout = session.logout();
    outcome?;
    logout.context("logout failed")
}

fn execute(session: &mut Session, command: &Commands) -> anyhow::Result<()> {
    match command {
        Commands::Check => {
            println!(
                "login ok ({})",
                if session.is_encrypted() {
                    "encrypted"
                } else {
                    "not encrypted"
                }
            );
            println!("capabilities: {}", session.cached_capabilities());
        }
        Commands::Capabilities { reload } => {
            let capabilities = session
                .capabilities(*reload)
                .context("CAPABILITY failed")?;
            for capability in capabilities {
                println!("{capability}");
            }
        }
        Commands::Quota { user } => {
            let quota = session
                .quota(user)
                .with_context(|| format!("GETQUOTA for {user} failed"))?;
            println!("{}", quota_line(user, quota));
        }
    }
    Ok(())
}

fn quota_line(user: &str, quota: Quota) -> String {
    match quota.usage_percent() {
        Some(percent) if quota.is_exceeded() => format!(
            "{user}: {} / {} KiB ({percent:.1}%, over quota)",
            quota.used, quota.limit
        ),
        Some(percent) => format!("{user}: {} / {} KiB ({percent:.1}%)", quota.used, quota.limit),
        None => format!("{user}: {} KiB, no limit", quota.used),
    }
}

/// Finds the engine's classification of a failure.
fn error_kind(error: &anyhow::Error) -> ErrorKind {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<mailadmin_imap::Error>())
        .map_or(ErrorKind::ConfigError, mailadmin_imap::Error::kind)
}
