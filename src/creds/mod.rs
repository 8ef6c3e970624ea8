//! Credential provisioner
//!
//! Resolves the caller's AWS identity, optionally assumes the project's
//! configured IAM role (with MFA when the caller has a device registered),
//! and persists the resulting short-lived credentials for the dev container.
//!
//! The flow is linear with no retries: MFA codes are time-boxed, so a stale
//! retry would fail anyway. The decision of which credentials to request is
//! pure ([`plan`]); all network and terminal I/O sits behind the
//! [`IdentityProvider`] trait and an injected code reader.

pub mod provider;
pub mod writer;

use std::io::Write as _;

use crate::config::{AwsSection, Manifest, Project};
use crate::error::{DevkitError, DevkitResult};
use provider::{
    AssumeRoleRequest, AwsIdentityProvider, CredentialBundle, IdentityProvider, MfaChallenge,
};
use writer::DEFAULT_PROFILE;

/// STS lower bound for a session duration
pub const MIN_SESSION_SECONDS: i32 = 900;

/// STS upper bound for a session duration
pub const MAX_SESSION_SECONDS: i32 = 43_200;

/// Session duration requested when the operator does not override it
pub const DEFAULT_SESSION_SECONDS: i32 = 3_600;

/// Provisioner options from the CLI.
#[derive(Debug, Clone)]
pub struct ProvideRoleOptions {
    /// MFA code supplied as an argument; prompted for when absent and needed
    pub mfa_code: Option<String>,
    /// Requested session duration in seconds
    pub duration_secs: i32,
    /// Force pass-through of the current profile credentials
    pub use_profile: bool,
}

impl Default for ProvideRoleOptions {
    fn default() -> Self {
        Self {
            mfa_code: None,
            duration_secs: DEFAULT_SESSION_SECONDS,
            use_profile: false,
        }
    }
}

/// Which credentials to obtain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPlan {
    /// Use the chain's own credentials; no assume-role call, no MFA prompt
    PassThrough,
    /// Assume the configured role, with MFA when a serial is present
    AssumeRole {
        role_arn: String,
        mfa_serial: Option<String>,
    },
}

/// Validate the requested duration against the STS-accepted range.
///
/// Runs before any network call, so an out-of-range value never costs a
/// round trip.
pub fn validate_duration(duration_secs: i32) -> DevkitResult<()> {
    if !(MIN_SESSION_SECONDS..=MAX_SESSION_SECONDS).contains(&duration_secs) {
        return Err(DevkitError::Usage(format!(
            "session duration must be between {} and {} seconds (got {})",
            MIN_SESSION_SECONDS, MAX_SESSION_SECONDS, duration_secs
        )));
    }
    Ok(())
}

/// Decide which credentials to request. Pure.
pub fn plan(role_arn: Option<&str>, use_profile: bool, mfa_serial: Option<&str>) -> CredentialPlan {
    match role_arn {
        Some(role_arn) if !use_profile => CredentialPlan::AssumeRole {
            role_arn: role_arn.to_string(),
            mfa_serial: mfa_serial.map(|s| s.to_string()),
        },
        _ => CredentialPlan::PassThrough,
    }
}

/// Derive an STS session name from the caller's ARN.
///
/// Uses the last path segment of the ARN (the user name), keeping only the
/// characters STS accepts and truncating to its 64-character limit.
pub fn session_name(caller_arn: &str) -> String {
    let user = caller_arn.rsplit('/').next().unwrap_or(caller_arn);
    let mut name: String = format!("webapp-devkit-{}", user)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '=' | ',' | '.' | '@' | '_' | '-'))
        .collect();
    name.truncate(64);
    name
}

/// Run the provisioning flow against an identity provider.
///
/// `read_mfa_code` is invoked only when a role assumption needs a code and
/// none was supplied as an argument.
pub async fn provision<P, F>(
    identity_provider: &P,
    aws: &AwsSection,
    options: &ProvideRoleOptions,
    read_mfa_code: F,
) -> DevkitResult<CredentialBundle>
where
    P: IdentityProvider + Sync,
    F: FnOnce() -> DevkitResult<String>,
{
    validate_duration(options.duration_secs)?;

    let identity = identity_provider.caller_identity().await?;
    tracing::info!(arn = %identity.arn, account = %identity.account, "resolved caller identity");

    let mfa_serial = if aws.role_arn.is_some() && !options.use_profile {
        identity_provider.mfa_serial().await?
    } else {
        None
    };

    match plan(aws.role_arn.as_deref(), options.use_profile, mfa_serial.as_deref()) {
        CredentialPlan::PassThrough => {
            println!("Using current profile credentials (no role assumption).");
            identity_provider.current_credentials().await
        }
        CredentialPlan::AssumeRole {
            role_arn,
            mfa_serial,
        } => {
            let mfa = match mfa_serial {
                Some(serial) => {
                    let code = match &options.mfa_code {
                        Some(code) => code.clone(),
                        None => read_mfa_code()?,
                    };
                    Some(MfaChallenge { serial, code })
                }
                None => None,
            };

            println!("Assuming role {}...", role_arn);
            identity_provider
                .assume_role(&AssumeRoleRequest {
                    role_arn,
                    session_name: session_name(&identity.arn),
                    duration_secs: options.duration_secs,
                    mfa,
                })
                .await
        }
    }
}

/// Prompt the operator for an MFA code on the terminal.
///
/// No timeout: the operator is expected to be present.
fn prompt_mfa_code() -> DevkitResult<String> {
    eprint!("Enter MFA code: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let code = line.trim().to_string();
    if code.is_empty() {
        return Err(DevkitError::Usage("MFA code must not be empty".to_string()));
    }
    Ok(code)
}

/// Provision against the given identity provider and persist the bundle.
///
/// The write happens only after the provider flow succeeds: a rejected role
/// assumption leaves previously written credential files untouched.
pub async fn provision_and_persist<P, F>(
    identity_provider: &P,
    project: &Project,
    manifest: &Manifest,
    options: &ProvideRoleOptions,
    read_mfa_code: F,
) -> DevkitResult<()>
where
    P: IdentityProvider + Sync,
    F: FnOnce() -> DevkitResult<String>,
{
    let bundle = provision(identity_provider, &manifest.aws, options, read_mfa_code).await?;

    let destination = project.root().join(&manifest.aws.credentials_dir);
    writer::write_credential_files(&destination, DEFAULT_PROFILE, &bundle, &manifest.aws.region)?;

    println!(
        "Wrote credentials for access key {} to {}/",
        bundle.access_key_id,
        destination.display()
    );
    if let Some(expiration) = bundle.expiration {
        println!("Session expires at {}", expiration.to_rfc3339());
    }
    Ok(())
}

/// Run the provisioner end to end: resolve, obtain, persist.
///
/// Connecting loads the default chain with the manifest's region but does no
/// network I/O of its own; the first provider call happens inside
/// `provision`, after the duration has been validated.
pub async fn run(
    project: &Project,
    manifest: &Manifest,
    options: &ProvideRoleOptions,
) -> DevkitResult<()> {
    let identity_provider = AwsIdentityProvider::connect(&manifest.aws.region).await?;
    provision_and_persist(&identity_provider, project, manifest, options, prompt_mfa_code).await
}
