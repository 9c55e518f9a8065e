use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "taxops",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIMESTAMP"), ")"),
    about = "Engagement workspace for CPA audit automation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and persist the session token
    Login(LoginArgs),
    /// Create a firm and its first user
    RegisterFirm(RegisterFirmArgs),
    /// Request a password reset email
    ForgotPassword(ForgotPasswordArgs),
    /// Sign out and remove the persisted token
    Logout,
    /// Show the signed-in user and firm
    Whoami,
    /// Firm dashboard counters
    Firm,
    /// List the firm's clients
    Clients,
    /// List a client's engagements
    Engagements(EngagementsArgs),
    /// Show an engagement's uploads and modules
    Workflow(EngagementArgs),
    /// Trigger an audit module run
    Run(RunArgs),
    /// Upload a data file for a domain
    Upload(UploadArgs),
    /// List, filter and summarise findings
    Findings(FindingsArgs),
    /// Change a finding's review status
    SetStatus(SetStatusArgs),
    /// Report summary, draft generation and exports
    Report(ReportArgs),
    /// List documents uploaded to an engagement
    Documents(EngagementArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    /// Password (or set TAXOPS_PASSWORD)
    #[arg(long, env = "TAXOPS_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Firm to sign in to when the user belongs to several
    #[arg(long)]
    pub firm_id: Option<String>,
}

#[derive(Args, Clone)]
pub struct RegisterFirmArgs {
    #[arg(long)]
    pub firm_name: String,

    #[arg(long)]
    pub email: String,

    /// Password (or set TAXOPS_PASSWORD)
    #[arg(long, env = "TAXOPS_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long)]
    pub full_name: Option<String>,
}

#[derive(Args, Clone)]
pub struct ForgotPasswordArgs {
    #[arg(long)]
    pub email: String,
}

#[derive(Args, Clone)]
pub struct EngagementsArgs {
    /// Client ID
    pub client_id: String,
}

#[derive(Args, Clone)]
pub struct EngagementArgs {
    /// Engagement ID
    pub engagement_id: String,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Engagement ID
    pub engagement_id: String,

    /// Module ID
    pub module_id: String,
}

#[derive(Args, Clone)]
pub struct UploadArgs {
    /// Engagement ID
    pub engagement_id: String,

    /// Upload kind as domain/resource, e.g. books/gl or bank/statements
    pub kind: String,

    /// File to upload
    pub file: String,

    /// Document type (documents/upload only)
    #[arg(long)]
    pub doc_type: Option<String>,

    #[arg(long)]
    pub amount: Option<f64>,

    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub counterparty: Option<String>,

    #[arg(long)]
    pub external_ref: Option<String>,
}

#[derive(Args, Clone)]
pub struct FindingsArgs {
    /// Engagement ID
    pub engagement_id: String,

    /// Severity filter: all, critical, high, medium, low, warning, info
    #[arg(long, default_value = "all")]
    pub severity: String,

    /// Status filter: all, open, in_review, closed
    #[arg(long, default_value = "all")]
    pub status: String,

    /// Domain filter, or all
    #[arg(long, default_value = "all")]
    pub domain: String,

    /// Comma-separated domain streams to load in addition to the engagement findings
    #[arg(long)]
    pub domains: Option<String>,

    /// Print as markdown
    #[arg(long)]
    pub markdown: bool,
}

#[derive(Args, Clone)]
pub struct SetStatusArgs {
    /// Engagement ID
    pub engagement_id: String,

    /// Finding ID
    pub finding_id: String,

    /// New status: open, in_review, closed
    pub status: String,
}

#[derive(Args, Clone)]
pub struct ReportArgs {
    /// Engagement ID
    pub engagement_id: String,

    /// Generate a new draft first
    #[arg(long)]
    pub generate: bool,

    /// Request an export link: pdf or xlsx
    #[arg(long)]
    pub export: Option<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
