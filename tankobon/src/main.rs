use std::process::ExitCode;

use anyhow::Result;
use bpaf::{Args, Parser};
use commands::{TankobonArgs, TankobonCli, Version};
use tracing::debug;
use utils::init::init_logger;
use utils::message;

mod commands;
mod config;
mod utils;

async fn run(args: TankobonArgs) -> Result<()> {
    init_logger(Some(args.verbosity));
    let config = config::Config::parse()?;
    args.handle(config).await?;
    Ok(())
}

fn main() -> ExitCode {
    // Initialize the logger with defaults; it is reinitialized as soon
    // as the verbosity flags have been parsed.
    init_logger(None);

    // Quit early if `--version` is present
    if Version::check() {
        println!("Version: {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::from(0);
    }

    // Parse verbosity flags first so help messages and parse errors are
    // logged at the requested level
    let verbosity = {
        let verbosity_parser = commands::verbosity();
        let other_parser = bpaf::any("ARG", Some::<String>).many();

        bpaf::construct!(verbosity_parser, other_parser)
            .map(|(v, _)| v)
            .to_options()
            .run_inner(Args::current_args())
            .unwrap_or_default()
    };

    init_logger(Some(verbosity));

    let args = commands::tankobon_cli().run_inner(Args::current_args());

    if let Some(parse_err) = args.as_ref().err() {
        match parse_err {
            bpaf::ParseFailure::Stdout(m, _) => {
                print!("{m:80}");
                return ExitCode::from(0);
            },
            bpaf::ParseFailure::Stderr(m) => {
                message::error(format!("{m:80}"));
                return ExitCode::from(1);
            },
            bpaf::ParseFailure::Completion(c) => {
                print!("{c}");
                return ExitCode::from(0);
            },
        }
    }

    // Errors are handled above
    let TankobonCli(args) = args.unwrap();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            message::error(format!("Could not start the async runtime: {err}"));
            return ExitCode::from(1);
        },
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            debug!("{:#}", err);
            let err_str = err
                .chain()
                .skip(1)
                .fold(err.to_string(), |acc, cause| format!("{acc}: {cause}"));
            message::error(err_str);
            ExitCode::from(1)
        },
    }
}
