use std::fmt;

use anyhow::{Context, Result};
use bpaf::{Bpaf, Parser};
use tankobon_catalog::{CatalogClient, CatalogClientConfig};
use tankobon_core::SessionContext;

use crate::config::Config;

mod auth;
mod browse;
mod read;
mod show;
mod tags;

const TANKOBON_DESCRIPTION: &str = "tankobon - browse a manga catalog from your terminal";

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, descr(TANKOBON_DESCRIPTION))]
pub struct TankobonCli(#[bpaf(external(tankobon_args))] pub TankobonArgs);

/// Main args parser
#[derive(Debug, Bpaf)]
pub struct TankobonArgs {
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    /// Print the version of the program
    #[allow(dead_code)] // fake arg, `--version` is checked for separately (see [Version])
    #[bpaf(long, short('V'))]
    version: bool,

    #[bpaf(external(commands))]
    command: Commands,
}

impl TankobonArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        std::fs::create_dir_all(&config.tankobon.data_dir).with_context(|| {
            format!(
                "Could not create data directory: {:?}",
                config.tankobon.data_dir
            )
        })?;

        match self.command {
            Commands::Browse(args) => args.handle(config).await,
            Commands::Show(args) => args.handle(config).await,
            Commands::Read(args) => args.handle(config).await,
            Commands::Tags(args) => args.handle(config).await,
            Commands::Auth(args) => args.handle(config).await,
        }
    }
}

#[derive(Bpaf)]
enum Commands {
    /// Browse the published catalog with filters and pagination
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),

    /// Show a title with its chapter list
    #[bpaf(command)]
    Show(#[bpaf(external(show::show))] show::Show),

    /// Show a chapter and its page image URLs
    #[bpaf(command)]
    Read(#[bpaf(external(read::read))] read::Read),

    /// List the tag catalog grouped by tag group
    #[bpaf(command)]
    Tags(#[bpaf(external(tags::tags))] tags::Tags),

    /// Manage the login session
    #[bpaf(command)]
    Auth(#[bpaf(external(auth::auth))] auth::Auth),
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Commands::Browse(_) => "browse",
            Commands::Show(_) => "show",
            Commands::Read(_) => "read",
            Commands::Tags(_) => "tags",
            Commands::Auth(_) => "auth",
        };
        write!(f, "Commands::{name}")
    }
}

/// Load the persisted session and build a catalog client carrying its
/// token.
pub(crate) fn catalog_client(config: &Config) -> Result<(CatalogClient, SessionContext)> {
    let session = SessionContext::load(&config.session_file())?;
    // `TANKOBON_TOKEN` / config token wins over the stored session
    let token = config.tankobon.token.clone().or_else(|| session.token.clone());
    let client_config = CatalogClientConfig {
        catalog_url: config.tankobon.api_url.clone(),
        token,
        extra_headers: Default::default(),
        user_agent: None,
    };
    let client = CatalogClient::new(client_config).context("Could not build the catalog client")?;
    Ok((client, session))
}

/// Fake argument used to parse `--version` separately
///
/// bpaf accepts invalid arguments when `--version` is present; common
/// utilities such as git require correct arguments even in the presence
/// of short circuiting flags, so `--version` is checked on its own
/// before the main parser runs.
#[derive(Bpaf, Default)]
pub struct Version(#[bpaf(short('V'), long("version"))] bool);

impl Version {
    /// Parses to [Self] and extracts the `--version` flag
    pub fn check() -> bool {
        bpaf::construct!(version(), tankobon_args())
            .to_options()
            .run_inner(bpaf::Args::current_args())
            .map(|(v, _)| v)
            .unwrap_or_default()
            .0
    }
}
