use clap::{CommandFactory, Parser};
use problem_sync::cli::CliArgs;
use problem_sync::config::{self, ServerConfig, SyncSettings};
use problem_sync::core::processor;
use problem_sync::core::run_log::{self, RunLogEntry};
use problem_sync::core::stats::RunStats;
use problem_sync::error::{AppError, AppResult};
use problem_sync::io;
use problem_sync::logging::{log, setup_logging, LogLevel};
use std::process::ExitCode;
use tokio::runtime::Builder;

fn main() -> ExitCode {
    setup_logging();

    let cli_args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            log(LogLevel::Error, &format!("CLI Argument Error: {}", e));
            let _ = CliArgs::command().print_help();
            return ExitCode::from(2);
        }
    };

    match dotenvy::dotenv() {
        Ok(path) => log(
            LogLevel::Info,
            &format!("Loaded environment from {}", path.display()),
        ),
        Err(e) if e.not_found() => {}
        Err(e) => log(LogLevel::Warning, &format!("Ignoring unreadable .env: {}", e)),
    }

    let runtime = match Builder::new_multi_thread()
        .enable_all()
        .thread_name("sync-worker")
        .worker_threads(num_cpus::get())
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log(
                LogLevel::Error,
                &format!("FATAL: Failed to build Tokio runtime: {}", e),
            );
            return ExitCode::FAILURE;
        }
    };

    let main_result: AppResult<i32> = runtime.block_on(async {
        if let Some(path) = cli_args.get_reformat_file() {
            if !path.exists() {
                log(
                    LogLevel::Error,
                    &format!("File to reformat not found: {}", path.display()),
                );
                return Err(AppError::Argument("Need to provide file to clean up.".into()));
            }
            io::reformat_listing_file(&path).await?;
            return Ok(0);
        }

        let sources = match cli_args.get_sources() {
            Ok(s) => s,
            Err(e) => {
                log(LogLevel::Error, &e.to_string());
                let _ = CliArgs::command().print_help();
                return Err(e);
            }
        };

        let server = match ServerConfig::from_env(cli_args.use_test_server()) {
            Ok(s) => s,
            Err(e) => {
                let entry = RunLogEntry::fatal(&RunStats::new(), &e);
                run_log::record(&cli_args.get_run_log(), &entry).await;
                return Err(e);
            }
        };

        let settings = SyncSettings {
            server,
            listing_base_url: config::listing_base_from_env(),
            sources,
            run_log_path: cli_args.get_run_log(),
            max_concurrency: config::MAX_SOURCE_CONCUR,
        };

        let report = processor::run(settings).await?;
        Ok(report.outcome.exit_code())
    });

    match main_result {
        Ok(exit_code) => ExitCode::from(exit_code as u8),
        Err(AppError::Argument(_)) => ExitCode::from(2),
        Err(e) => {
            log(LogLevel::Error, &format!("FATAL: {}", e));
            ExitCode::FAILURE
        }
    }
}
