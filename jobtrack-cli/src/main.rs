use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use jobtrack::{LatexRenderer, Managers};
use jobtrack_cli::commands::jobs::{AddJobArgs, ListJobsArgs, UpdateJobArgs};
use jobtrack_cli::commands::resumes::{AddResumeArgs, UpdateResumeArgs};
use jobtrack_cli::commands::{self, jobs, resumes, users, CliResult};
use jobtrack_data::{with_tenant, Gateway};

#[derive(Parser)]
#[command(name = "jobtrack", version, about = "Track job applications and render résumés")]
struct Cli {
    /// Configuration profile (JOBTRACK_PROFILE wins when set)
    #[arg(long, global = true, default_value = "dev")]
    profile: String,
    /// Tenant to act as when the database is multi-tenant
    #[arg(long, global = true)]
    tenant: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a user
    AddUser { name: String },
    /// Delete a user and everything they own
    DeleteUser { id: String },
    /// Record a job application
    AddJob(AddJobArgs),
    /// Change fields of a job
    UpdateJob(UpdateJobArgs),
    DeleteJob { id: String },
    /// List jobs page by page
    ListJobs(ListJobsArgs),
    /// Add résumé main info
    AddResume(AddResumeArgs),
    /// Store a revised copy of a résumé
    UpdateResume(UpdateResumeArgs),
    /// Add a LaTeX résumé template from a file
    AddTemplate { file: PathBuf },
    /// Store a revised copy of a template from a file
    UpdateTemplate { id: String, file: PathBuf },
    /// Fill a template with a résumé
    Render {
        resume_id: String,
        template_id: String,
        /// Write here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

async fn dispatch<G: Gateway>(managers: &Managers<G>, command: Commands) -> CliResult {
    match command {
        Commands::AddUser { name } => users::add(managers, &name).await,
        Commands::DeleteUser { id } => users::delete(managers, &id).await,
        Commands::AddJob(args) => jobs::add(managers, args).await,
        Commands::UpdateJob(args) => jobs::update(managers, args).await,
        Commands::DeleteJob { id } => jobs::delete(managers, &id).await,
        Commands::ListJobs(args) => jobs::list(managers, &args).await.map(|_| ()),
        Commands::AddResume(args) => resumes::add(managers, args).await,
        Commands::UpdateResume(args) => resumes::update(managers, args).await,
        Commands::AddTemplate { file } => resumes::add_template(managers, &file).await,
        Commands::UpdateTemplate { id, file } => resumes::update_template(managers, &id, &file).await,
        Commands::Render {
            resume_id,
            template_id,
            output,
        } => {
            let renderer = LatexRenderer::new()?;
            resumes::render(managers, &renderer, &resume_id, &template_id, output.as_deref()).await
        }
    }
}

async fn run(cli: Cli) -> CliResult {
    let managers = commands::open(&cli.profile).await?;
    match cli.tenant {
        Some(tenant) => with_tenant(tenant, dispatch(&managers, cli.command)).await,
        None => dispatch(&managers, cli.command).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}", format!("Error: {e}").red());
        std::process::exit(1);
    }
}
