use anyhow::{Context, Result};
use bpaf::Bpaf;
use tankobon_core::SessionContext;
use tracing::{debug, instrument};

use crate::commands::catalog_client;
use crate::config::Config;
use crate::utils::message;

/// Manage the login session
#[derive(Debug, Bpaf, Clone)]
pub enum Auth {
    /// Log in to the catalog
    #[bpaf(command)]
    Login {
        /// Email address of the account
        #[bpaf(short, long, argument("EMAIL"))]
        email: String,

        /// Password of the account
        #[bpaf(short, long, argument("PASSWORD"))]
        password: String,
    },

    /// Create an account
    #[bpaf(command)]
    Register {
        /// Name of the new account
        #[bpaf(short, long, argument("USERNAME"))]
        username: String,

        /// Email address of the new account
        #[bpaf(short, long, argument("EMAIL"))]
        email: String,

        /// Password of the new account
        #[bpaf(short, long, argument("PASSWORD"))]
        password: String,
    },

    /// Discard the stored session
    #[bpaf(command)]
    Logout,

    /// Show who is currently logged in
    #[bpaf(command)]
    Status {
        /// Exchange the stored token for a fresh one first
        #[bpaf(long)]
        refresh: bool,
    },
}

impl Auth {
    #[instrument(name = "auth", skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let session_file = config.session_file();
        let (client, mut session) = catalog_client(&config)?;

        match self {
            Auth::Login { email, password } => {
                let tokens = client
                    .login(&email, &password)
                    .await
                    .context("Login failed")?;
                let name = tokens.user.name.clone();
                session = SessionContext::authenticated(tokens.user, tokens.token);
                session.save(&session_file)?;
                message::updated(format!("Logged in as '{name}'"));
            },
            Auth::Register {
                username,
                email,
                password,
            } => {
                client
                    .register(&username, &email, &password)
                    .await
                    .context("Registration failed")?;
                message::updated(format!("Account '{username}' created, you can now log in"));
            },
            Auth::Logout => {
                if !session.is_authenticated() {
                    message::plain("You are not logged in");
                    return Ok(());
                }
                SessionContext::clear(&session_file)?;
                message::deleted("Logged out");
            },
            Auth::Status { refresh } => {
                if refresh {
                    let token = session
                        .token
                        .clone()
                        .context("Cannot refresh, you are not logged in")?;
                    let tokens = client
                        .refresh(&token)
                        .await
                        .context("Token refresh failed")?;
                    debug!("refreshed session token");
                    session = SessionContext::authenticated(tokens.user, tokens.token);
                    session.save(&session_file)?;
                }
                match &session.user {
                    Some(user) => {
                        message::plain(format!("Logged in as '{}'", user.name));
                        if let Some(email) = &user.email {
                            message::plain(format!("Email: {email}"));
                        }
                    },
                    None => message::plain("You are not logged in"),
                }
            },
        }

        Ok(())
    }
}
