//! CLI subcommands
//!
//! The three subcommands are independent entry points sharing only on-disk
//! state (the manifest, the active-application directory, the credentials
//! directory). Each receives the explicitly loaded configuration it needs
//! rather than reading ambient state deep in the call chain.

use clap::Subcommand;

use crate::config::{Framework, Manifest, Project};
use crate::creds::{self, ProvideRoleOptions, DEFAULT_SESSION_SECONDS};
use crate::error::{DevkitError, DevkitResult};
use crate::smoke::{self, SmokeTestOptions};
use crate::sync;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set or repair the project configuration and materialize app_src/
    ///
    /// With both arguments, persists the new name and framework into
    /// webapp.toml and copies the framework template into app_src/. With no
    /// arguments, re-reads webapp.toml and re-runs the copy.
    Configure {
        /// Application name (letters, numbers, hyphens, underscores)
        #[arg(requires = "framework")]
        app_name: Option<String>,

        /// Target framework
        #[arg(value_enum)]
        framework: Option<Framework>,
    },

    /// Build and run the active application, then poll its health endpoint
    ///
    /// The container is always stopped and removed before exit, whatever
    /// the outcome.
    SmokeTest {
        /// After a passing check, keep the container running until Enter
        /// is pressed
        #[arg(long)]
        wait: bool,
    },

    /// Obtain temporary AWS credentials and write them for the dev container
    ProvideRole {
        /// MFA code to use instead of prompting interactively
        #[arg(long, value_name = "CODE")]
        mfa_code: Option<String>,

        /// Requested session duration in seconds (900-43200)
        #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_SESSION_SECONDS)]
        duration: i32,

        /// Skip role assumption and pass the current profile credentials
        /// through
        #[arg(long)]
        use_profile: bool,
    },
}

/// Dispatch a parsed subcommand against the project.
pub async fn execute(command: Commands, project: &Project) -> DevkitResult<()> {
    match command {
        Commands::Configure {
            app_name,
            framework,
        } => {
            let args = match (app_name, framework) {
                (Some(app_name), Some(framework)) => Some((app_name, framework)),
                (None, None) => None,
                _ => {
                    return Err(DevkitError::Usage(
                        "configure takes either both <APP_NAME> and <FRAMEWORK> or no arguments"
                            .to_string(),
                    ))
                }
            };
            sync::run(project, args)
        }
        Commands::SmokeTest { wait } => {
            let manifest = Manifest::load(&project.manifest_path())?;
            smoke::run(project, &manifest, &SmokeTestOptions { wait }).await
        }
        Commands::ProvideRole {
            mfa_code,
            duration,
            use_profile,
        } => {
            let manifest = Manifest::load(&project.manifest_path())?;
            creds::run(
                project,
                &manifest,
                &ProvideRoleOptions {
                    mfa_code,
                    duration_secs: duration,
                    use_profile,
                },
            )
            .await
        }
    }
}
