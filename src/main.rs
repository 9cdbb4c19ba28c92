use anyhow::Result;
use clap::Parser;
use linkctl::commands;
use linkctl::config::Config;
use linkctl::polling::{
    DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, PollOptions,
};
use std::time::Duration;

/// linkctl - consumer account client
///
/// Look up consumer accounts and manage their saved payment methods.
///
/// Commands that act on a session take the client secret printed by
/// `linkctl lookup`. If the session has expired it is refreshed once and the
/// command retried; the new secret is printed to stderr.
///
/// Examples:
///   linkctl lookup jane@example.com
///   linkctl list --email jane@example.com --client-secret <SECRET>
#[derive(Parser, Debug)]
#[command(author, version = env!("LINKCTL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (defaults to https://api.stripe.com)
    #[arg(long = "api-url", env = "LINKCTL_API_URL", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Publishable key used to authenticate requests
    #[arg(
        long = "publishable-key",
        env = "LINKCTL_PUBLISHABLE_KEY",
        value_name = "KEY",
        global = true,
        hide_env_values = true
    )]
    pub publishable_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Look up an account by email
    Lookup(LookupArgs),

    /// Refresh a session and print the new client secret
    Refresh(SessionArgs),

    /// List saved payment methods
    List(SessionArgs),

    /// Delete a saved payment method
    Delete(PaymentDetailsArgs),

    /// Make a saved payment method the default
    SetDefault(PaymentDetailsArgs),

    /// Wait until a payment method has finished processing
    Wait(WaitArgs),

    /// End a session
    LogOut(SessionArgs),
}

#[derive(clap::Args, Debug)]
pub struct LookupArgs {
    /// Email address of the account
    #[arg(value_name = "EMAIL")]
    pub email: String,
}

#[derive(clap::Args, Debug)]
pub struct SessionArgs {
    /// Email address of the account
    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    /// Client secret of the consumer session
    #[arg(
        long = "client-secret",
        env = "LINKCTL_CLIENT_SECRET",
        value_name = "SECRET",
        hide_env_values = true
    )]
    pub client_secret: String,
}

#[derive(clap::Args, Debug)]
pub struct PaymentDetailsArgs {
    /// Payment method id
    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(clap::Args, Debug)]
pub struct WaitArgs {
    /// Payment method id
    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Delay before the first attempt, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_INITIAL_DELAY.as_millis() as u64)]
    pub initial_delay_ms: u64,

    /// Attempts after the first one before giving up
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Delay between attempts, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_RETRY_INTERVAL.as_millis() as u64)]
    pub retry_interval_ms: u64,
}

impl WaitArgs {
    fn poll_options(&self) -> PollOptions {
        PollOptions {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_retries: self.max_retries,
            retry_interval: Duration::from_millis(self.retry_interval_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let Some(publishable_key) = cli.publishable_key.as_deref() else {
        anyhow::bail!("A publishable key is required (--publishable-key or LINKCTL_PUBLISHABLE_KEY).");
    };
    let config = Config::new(
        publishable_key,
        cli.api_url.clone(),
        cli.timeout.map(Duration::from_secs),
    )?;

    match cli.command {
        Commands::Lookup(args) => commands::lookup(&config, &args.email).await?,
        Commands::Refresh(args) => {
            commands::refresh(&config, &args.email, &args.client_secret).await?
        }
        Commands::List(args) => commands::list(&config, &args.email, &args.client_secret).await?,
        Commands::Delete(args) => {
            commands::delete(
                &config,
                &args.session.email,
                &args.session.client_secret,
                &args.id,
            )
            .await?
        }
        Commands::SetDefault(args) => {
            commands::set_default(
                &config,
                &args.session.email,
                &args.session.client_secret,
                &args.id,
            )
            .await?
        }
        Commands::Wait(args) => {
            let config = config.with_poll_options(args.poll_options());
            commands::wait(
                &config,
                &args.session.email,
                &args.session.client_secret,
                &args.id,
            )
            .await?
        }
        Commands::LogOut(args) => {
            commands::log_out(&config, &args.email, &args.client_secret).await?
        }
    }
    Ok(())
}
