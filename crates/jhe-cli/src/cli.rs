use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "jhe")]
#[command(about = "Browse a JupyterHealth Exchange and tidy its observations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Exchange base URL (overrides JHE_URL)
    #[arg(short, long, global = true, env = "JHE_URL")]
    pub url: Option<String>,

    /// Bearer token (overrides JHE_TOKEN)
    #[arg(short, long, global = true, env = "JHE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Items requested per page
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
    Csv,
    Ndjson,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the user owning the token
    User,
    /// List organizations, or show one
    Organizations(OrganizationsArgs),
    /// List studies, or show one
    Studies(StudiesArgs),
    /// List patients, show one, or look one up
    Patients(PatientsArgs),
    /// List registered data sources
    DataSources,
    /// Fetch observations as tidy records
    Observations(ObservationsArgs),
    /// Tidy observations from a file or stdin without contacting a server
    Tidy(TidyArgs),
}

#[derive(clap::Args)]
pub struct OrganizationsArgs {
    /// Organization ID
    pub id: Option<i64>,
}

#[derive(clap::Args)]
pub struct StudiesArgs {
    /// Study ID
    pub id: Option<i64>,
    /// Only studies owned by this organization
    #[arg(long, conflicts_with = "id")]
    pub organization_id: Option<i64>,
}

#[derive(clap::Args)]
pub struct PatientsArgs {
    /// Patient ID
    pub id: Option<i64>,
    /// Find the patient with this email
    #[arg(long, conflicts_with = "id")]
    pub email: Option<String>,
    /// Find the patient with this external identifier
    #[arg(long, conflicts_with = "id")]
    pub external_id: Option<String>,
    /// Show the patient's study consents
    #[arg(long, requires = "id")]
    pub consents: bool,
}

#[derive(clap::Args)]
pub struct ObservationsArgs {
    /// Observations of this patient
    #[arg(long)]
    pub patient_id: Option<i64>,
    /// Observations shared with this study
    #[arg(long)]
    pub study_id: Option<i64>,
    /// Open mHealth code (e.g. omh:blood-glucose:4.0)
    #[arg(long)]
    pub code: Option<String>,
    /// Stop after this many observations
    #[arg(long)]
    pub limit: Option<usize>,
    /// Print FHIR resources instead of tidy records
    #[arg(long)]
    pub raw: bool,
}

#[derive(clap::Args)]
pub struct TidyArgs {
    /// JSON or NDJSON file (reads from stdin if omitted)
    pub file: Option<PathBuf>,
    /// Fail when header and body define the same key
    #[arg(long)]
    pub strict: bool,
}
