//! Identity provider seam
//!
//! The provisioning flow talks to the identity provider through a trait so
//! the decision logic stays testable with a fake client. The real
//! implementation wraps the AWS default credential chain plus the STS and
//! IAM APIs.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_iam::Client as IamClient;
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;
use chrono::{DateTime, Utc};

use crate::error::{DevkitError, DevkitResult};

/// The caller's resolved (non-temporary) identity.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub arn: String,
    pub account: String,
    pub user_id: String,
}

/// MFA serial + code pair attached to an assume-role call.
#[derive(Debug, Clone)]
pub struct MfaChallenge {
    pub serial: String,
    pub code: String,
}

/// Parameters for a role assumption.
#[derive(Debug, Clone)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub duration_secs: i32,
    pub mfa: Option<MfaChallenge>,
}

/// A set of (possibly short-lived) credentials ready to be persisted.
#[derive(Debug, Clone)]
pub struct CredentialBundle {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

/// Identity-provider operations used by the provisioning flow.
#[async_trait]
pub trait IdentityProvider {
    /// Resolve who the current credential chain authenticates as.
    async fn caller_identity(&self) -> DevkitResult<CallerIdentity>;

    /// Serial number of the caller's registered MFA device, if any.
    async fn mfa_serial(&self) -> DevkitResult<Option<String>>;

    /// The chain's own credentials, for pass-through mode.
    async fn current_credentials(&self) -> DevkitResult<CredentialBundle>;

    /// Perform the role assumption.
    async fn assume_role(&self, request: &AssumeRoleRequest) -> DevkitResult<CredentialBundle>;
}

// ============================================================================
// AWS implementation
// ============================================================================

/// Identity provider backed by the AWS default credential chain.
pub struct AwsIdentityProvider {
    sdk_config: SdkConfig,
    sts: StsClient,
    iam: IamClient,
}

impl AwsIdentityProvider {
    /// Load the default credential chain with the configured region and
    /// build STS/IAM clients on top of it.
    pub async fn connect(region: &str) -> DevkitResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(Region::new(region.to_string())).or_default_provider();

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let sts = StsClient::new(&sdk_config);
        let iam = IamClient::new(&sdk_config);

        Ok(Self {
            sdk_config,
            sts,
            iam,
        })
    }
}

#[async_trait]
impl IdentityProvider for AwsIdentityProvider {
    async fn caller_identity(&self) -> DevkitResult<CallerIdentity> {
        let output = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| DevkitError::Identity(format!("{}", DisplayErrorContext(&e))))?;

        Ok(CallerIdentity {
            arn: output.arn().unwrap_or_default().to_string(),
            account: output.account().unwrap_or_default().to_string(),
            user_id: output.user_id().unwrap_or_default().to_string(),
        })
    }

    async fn mfa_serial(&self) -> DevkitResult<Option<String>> {
        let output = self
            .iam
            .list_mfa_devices()
            .send()
            .await
            .map_err(|e| DevkitError::Identity(format!("{}", DisplayErrorContext(&e))))?;

        Ok(output
            .mfa_devices()
            .first()
            .map(|device| device.serial_number().to_string()))
    }

    async fn current_credentials(&self) -> DevkitResult<CredentialBundle> {
        let provider = self.sdk_config.credentials_provider().ok_or_else(|| {
            DevkitError::Identity("no credential provider in the default chain".to_string())
        })?;

        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| DevkitError::Identity(e.to_string()))?;

        Ok(CredentialBundle {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().map(|t| t.to_string()),
            expiration: credentials.expiry().map(DateTime::<Utc>::from),
        })
    }

    async fn assume_role(&self, request: &AssumeRoleRequest) -> DevkitResult<CredentialBundle> {
        let mut call = self
            .sts
            .assume_role()
            .role_arn(&request.role_arn)
            .role_session_name(&request.session_name)
            .duration_seconds(request.duration_secs);

        if let Some(mfa) = &request.mfa {
            call = call.serial_number(&mfa.serial).token_code(&mfa.code);
        }

        // Provider rejections (bad MFA code, trust policy, expired source
        // credentials) are surfaced verbatim; a retry with a stale code
        // would fail anyway.
        let output = call
            .send()
            .await
            .map_err(|e| DevkitError::Identity(format!("{}", DisplayErrorContext(&e))))?;

        let credentials = output.credentials().ok_or_else(|| {
            DevkitError::Identity("assume-role response carried no credentials".to_string())
        })?;

        let expiration = credentials.expiration();
        Ok(CredentialBundle {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: Some(credentials.session_token().to_string()),
            expiration: DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos()),
        })
    }
}
