//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use loyalty_core::api::{ApiClient, AuthApi};
use loyalty_core::config::Config;
use loyalty_core::debug_log::DebugLog;
use loyalty_core::guard::Requirement;
use loyalty_core::logging;
use loyalty_core::session::SessionStore;
use loyalty_core::storage::FileStorage;

mod commands;

#[derive(Parser)]
#[command(name = "loyalty")]
#[command(version)]
#[command(about = "Loyalty points platform client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with your phone number and a one-time code
    Login {
        /// Phone number, e.g. +60123456789 (prompted if omitted)
        #[arg(long)]
        phone: Option<String>,
    },

    /// Create an account with your phone number and a one-time code
    Register {
        /// Phone number, e.g. +60123456789 (prompted if omitted)
        #[arg(long)]
        phone: Option<String>,
        /// Email address for the new account
        #[arg(long)]
        email: String,
        /// Account role
        #[arg(long, default_value = "customer")]
        role: String,
        /// Accept the terms and conditions
        #[arg(long = "accept-terms")]
        accept_terms: bool,
    },

    /// Log out (clear the stored session)
    Logout,

    /// Show the logged-in user
    Whoami {
        /// Privilege the user must hold
        #[arg(long, value_enum, default_value_t = RequireArg::Authenticated)]
        require: RequireArg,
        /// Print the raw user profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Request a password reset email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },

    /// Set a new password with a reset token
    ResetPassword {
        /// Token from the reset email
        #[arg(long)]
        token: String,
        /// New password
        #[arg(long, env = "LOYALTY_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Inspect the diagnostic log
    DebugLog {
        #[command(subcommand)]
        command: DebugLogCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Show the effective configuration (file plus environment)
    Show,
    /// Set the backend API URL
    SetApiUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(clap::Subcommand)]
enum DebugLogCommands {
    /// Print recorded entries, oldest first
    Show {
        /// Only print the newest N entries
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },
    /// Delete all entries
    Clear,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RequireArg {
    Authenticated,
    Admin,
    Staff,
}

impl From<RequireArg> for Requirement {
    fn from(arg: RequireArg) -> Self {
        match arg {
            RequireArg::Authenticated => Requirement::Authenticated,
            RequireArg::Admin => Requirement::Admin,
            RequireArg::Staff => Requirement::Staff,
        }
    }
}

/// Shared state for commands that talk to the backend or the session.
pub struct AppContext {
    pub config: Config,
    pub store: SessionStore,
    pub debug_log: DebugLog,
}

impl AppContext {
    fn open(config: Config) -> Self {
        let storage = FileStorage::open_default();
        Self {
            config,
            store: SessionStore::new(storage.clone()),
            debug_log: DebugLog::new(storage),
        }
    }

    /// Backend client, authenticated as the stored user when logged in.
    pub fn auth_api(&mut self) -> Result<AuthApi> {
        self.store.ensure_initialized();
        let client = ApiClient::from_config(&self.config)?.with_session(&self.store);
        tracing::debug!(authenticated = client.has_bearer(), "api client ready");
        Ok(AuthApi::new(client))
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        // Config commands must work even when the current file is broken.
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::SetApiUrl { url } => commands::config::set_api_url(&url),
        },
        command => {
            let config = Config::load().context("load config")?;
            tracing::debug!(api_url = %config.api_url, is_trial = config.is_trial, "config loaded");
            let mut ctx = AppContext::open(config);
            dispatch_with_context(&mut ctx, command).await
        }
    }
}

async fn dispatch_with_context(ctx: &mut AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Login { phone } => {
            commands::auth::login(ctx, phone, &mut std::io::stdin().lock()).await
        }
        Commands::Register {
            phone,
            email,
            role,
            accept_terms,
        } => {
            let options = commands::auth::RegisterOptions {
                phone,
                email,
                role,
                accept_terms,
            };
            commands::auth::register(ctx, options, &mut std::io::stdin().lock()).await
        }
        Commands::Logout => commands::auth::logout(ctx),
        Commands::Whoami { require, json } => commands::session::whoami(ctx, require.into(), json),
        Commands::ForgotPassword { email } => commands::auth::forgot_password(ctx, &email).await,
        Commands::ResetPassword { token, password } => {
            commands::auth::reset_password(ctx, &token, &password).await
        }
        Commands::DebugLog { command } => match command {
            DebugLogCommands::Show { limit } => commands::debug_log::show(ctx, limit),
            DebugLogCommands::Clear => commands::debug_log::clear(ctx),
        },
        Commands::Config { .. } => Ok(()),
    }
}
