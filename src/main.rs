use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use scormchef::cli::{Cli, Command};
use scormchef::http::HttpClient;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    scormchef::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(command = ?cli.command, "parsed cli");

    match cli.command {
        Command::Run(args) => {
            scormchef::build::run(args, cli.token.as_deref()).context("run")?;
        }
        Command::Crawl(args) => {
            let client = HttpClient::new(args.network.retry_policy(), args.network.timeout())?;
            scormchef::crawl::run(&args, &client).context("crawl")?;
        }
        Command::Download(args) => {
            let client = HttpClient::new(args.network.retry_policy(), args.network.timeout())?;
            scormchef::download::run(&args, &client).context("download")?;
        }
        Command::Tree(args) => {
            scormchef::tree::run(&args).context("tree")?;
        }
    }

    Ok(())
}
