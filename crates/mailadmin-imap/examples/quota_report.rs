#![allow(clippy::uninlined_format_args)]
//! Example: Print the storage quota of one or more users
//!
//! Logs in with an administrator account and queries each user's quota root.
//!
//! ## Running
//!
//! ```bash
//! IMAP_HOST=imap.example.com IMAP_USER=admin IMAP_PASSWORD=secret \
//!     cargo run --package mailadmin-imap --example quota_report -- alice bob
//! ```

use std::env;

use mailadmin_imap::{AuthMechanism, Config, Credentials, Security, Session};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailadmin_imap=debug".into()),
        )
        .init();

    let host = env::var("IMAP_HOST")?;
    let credentials = Credentials::new(env::var("IMAP_USER")?, env::var("IMAP_PASSWORD")?);

    let config = Config::builder(host)
        .security(Security::Implicit)
        .auth_mechanism(AuthMechanism::Plain)
        .credentials(credentials)
        .build();
    let mut session = Session::new(config);
    session.login()?;

    println!("Server capabilities: {}", session.capabilities(false)?);

    for user in env::args().skip(1) {
        match session.quota(&user) {
            Ok(quota) => match quota.usage_percent() {
                Some(percent) => println!("{user}: {}/{} ({percent:.1}%)", quota.used, quota.limit),
                None => println!("{user}: {} used, unlimited", quota.used),
            },
            Err(e) => println!("{user}: {} ({e})", e.kind()),
        }
    }

    session.logout()?;
    Ok(())
}
