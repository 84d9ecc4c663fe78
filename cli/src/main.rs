mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, Session, catalog, report, scan};
use gvmkit_common::config::{self, Config, DEFAULT_LOG_LEVEL};
use terminal::{logging, print};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CommandLine::parse_args();

    let config = config::load_env_file().and_then(|_| Config::from_env(args.global.overrides()));
    let level = match &config {
        Ok(config) => config.log_level.clone(),
        Err(_) => args
            .global
            .log_level
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
    };
    if let Err(err) = logging::init_logging(&level) {
        eprintln!("cannot set up logging: {err:#}");
        return ExitCode::FAILURE;
    }

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!("configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    if !args.global.json {
        print::banner();
    }
    let session = Session::connect(config, args.global.json);
    match run(&session, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(session: &Session, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Version => catalog::version(session).await,
        Commands::Targets => catalog::targets(session).await,
        Commands::Target { id } => catalog::target(session, &id).await,
        Commands::Tasks => catalog::tasks(session).await,
        Commands::Task { id } => catalog::task(session, &id).await,
        Commands::PortLists => catalog::port_lists(session).await,
        Commands::Configs => catalog::scan_configs(session).await,
        Commands::Scanners => catalog::scanners(session).await,
        Commands::Scan {
            hosts,
            port_list,
            port_range,
            name,
            config,
        } => {
            let target = scan::TargetArgs {
                hosts,
                port_list,
                port_range,
                name,
            };
            scan::scan(session, target, config).await
        }
        Commands::Status { task } => scan::status(session, &task).await,
        Commands::Watch {
            task,
            interval,
            timeout,
            max_attempts,
        } => {
            let args = scan::WatchArgs {
                interval,
                timeout,
                max_attempts,
            };
            scan::watch(session, &task, args).await
        }
        Commands::Start { task } => scan::start(session, &task).await,
        Commands::Stop { task } => scan::stop(session, &task).await,
        Commands::Rescan { task, target } => scan::rescan(session, task, target).await,
        Commands::Report { task, id } => report::report(session, task, id).await,
        Commands::Delta { older, newer, task } => report::delta(session, older, newer, task).await,
    }
}
