use clap::Parser;
use tracing_subscriber::EnvFilter;

use taxops::cli::{self, Cli, Commands, Workspace};
use taxops::config;
use taxops::errors::TaxopsError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .with_writer(std::io::stderr)
            .init();
    }
    if cli.no_color {
        console::set_colors_enabled(false);
    }

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            TaxopsError::Config(_) | TaxopsError::Yaml(_) => 2,
            TaxopsError::AuthRequired(_) => 3,
            e if e.is_unauthorized() => 3,
            TaxopsError::Permission(_) => 4,
            e if e.status() == Some(403) => 4,
            TaxopsError::Validation(_)
            | TaxopsError::RunInFlight(_)
            | TaxopsError::ModuleBlocked(_) => 5,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<(), TaxopsError> {
    if let Commands::Validate(args) = &cli.command {
        return handle_validate(args).await;
    }

    let ws = Workspace::open(cli.config.as_deref(), cli.json).await?;
    if !ws.config.output.color {
        console::set_colors_enabled(false);
    }

    match cli.command {
        Commands::Login(args) => cli::auth::handle_login(&ws, args).await,
        Commands::RegisterFirm(args) => cli::auth::handle_register_firm(&ws, args).await,
        Commands::ForgotPassword(args) => cli::auth::handle_forgot_password(&ws, args).await,
        Commands::Logout => cli::auth::handle_logout(&ws).await,
        Commands::Whoami => cli::auth::handle_whoami(&ws).await,
        Commands::Firm => cli::workspace::handle_firm(&ws).await,
        Commands::Clients => cli::workspace::handle_clients(&ws).await,
        Commands::Engagements(args) => cli::workspace::handle_engagements(&ws, args).await,
        Commands::Workflow(args) => cli::workspace::handle_workflow(&ws, args).await,
        Commands::Run(args) => cli::workspace::handle_run(&ws, args).await,
        Commands::Upload(args) => cli::workspace::handle_upload(&ws, args).await,
        Commands::Documents(args) => cli::workspace::handle_documents(&ws, args).await,
        Commands::Findings(args) => cli::findings::handle_findings(&ws, args).await,
        Commands::SetStatus(args) => cli::findings::handle_set_status(&ws, args).await,
        Commands::Report(args) => cli::report::handle_report(&ws, args).await,
        Commands::Validate(_) => Ok(()),
    }
}

async fn handle_validate(args: &cli::commands::ValidateArgs) -> Result<(), TaxopsError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
