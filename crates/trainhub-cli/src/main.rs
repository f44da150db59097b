//! trainhub CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use trainhub_core::model::Role;

mod commands;

use commands::assessments::AssessmentsCommand;
use commands::certificates::CertificatesCommand;
use commands::content::ContentCommand;
use commands::modules::ModulesCommand;
use commands::programs::ProgramsCommand;
use commands::questions::QuestionsCommand;
use commands::units::UnitsCommand;

#[derive(Parser)]
#[command(
    name = "trainhub",
    version,
    about = "Training programs, assessments and certificates"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter trainhub.toml
    Init,

    /// Check that the backend is reachable
    Health,

    /// Log in and remember the session
    Login {
        #[arg(long)]
        username: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,

        #[arg(long)]
        full_name: String,

        /// admin, instructor or learner
        #[arg(long, default_value = "learner")]
        role: Role,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user and what they may do
    Whoami,

    /// Training programs
    #[command(subcommand)]
    Programs(ProgramsCommand),

    /// Modules of a program
    #[command(subcommand)]
    Modules(ModulesCommand),

    /// Units of a module
    #[command(subcommand)]
    Units(UnitsCommand),

    /// Uploaded learning content and progress
    #[command(subcommand)]
    Content(ContentCommand),

    /// The question bank
    #[command(subcommand)]
    Questions(QuestionsCommand),

    /// Build and take assessments
    #[command(subcommand)]
    Assessments(AssessmentsCommand),

    /// Issued certificates
    #[command(subcommand)]
    Certificates(CertificatesCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trainhub=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Health => commands::health::execute(config).await,
        Commands::Login { username, password } => {
            commands::auth::login(config, username, password).await
        }
        Commands::Register {
            username,
            email,
            password,
            full_name,
            role,
        } => commands::auth::register(config, username, email, password, full_name, role).await,
        Commands::Logout => commands::auth::logout(config),
        Commands::Whoami => commands::auth::whoami(config).await,
        Commands::Programs(cmd) => commands::programs::execute(config, cmd).await,
        Commands::Modules(cmd) => commands::modules::execute(config, cmd).await,
        Commands::Units(cmd) => commands::units::execute(config, cmd).await,
        Commands::Content(cmd) => commands::content::execute(config, cmd).await,
        Commands::Questions(cmd) => commands::questions::execute(config, cmd).await,
        Commands::Assessments(cmd) => commands::assessments::execute(config, cmd).await,
        Commands::Certificates(cmd) => commands::certificates::execute(config, cmd).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
