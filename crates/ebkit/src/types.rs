//! Resource models for the application platform.
//!
//! Live records use the platform's PascalCase field names on the wire.
//! Desired specs implement [`DesiredSpec`] and live records implement
//! [`ObservedResource`] so the shared differ can compare them.

use chrono::{DateTime, Utc};
use declarative::{DesiredSpec, Field, ObservedResource, OptionSetting, VersionRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Application (container for versions, environments, templates)
    Application,
    /// Application version (deployable artifact)
    Version,
    /// Runtime environment
    Environment,
    /// Saved configuration template
    Template,
}

impl ResourceKind {
    /// Human-readable label used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Application => "Application",
            ResourceKind::Version => "Version",
            ResourceKind::Environment => "Environment",
            ResourceKind::Template => "Configuration Template",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// Live records
// =============================================================================

/// An application as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Application {
    /// Application name
    pub application_name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Creation timestamp
    pub date_created: DateTime<Utc>,
    /// Last update timestamp
    pub date_updated: DateTime<Utc>,
    /// Labels of the application's versions
    #[serde(default)]
    pub versions: Vec<String>,
    /// Names of the application's configuration templates
    #[serde(default)]
    pub configuration_templates: Vec<String>,
}

impl ObservedResource for Application {
    fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Description => self.description.as_deref(),
            _ => None,
        }
    }
}

/// Location of a version's source bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBundle {
    /// Bucket holding the bundle
    #[serde(rename = "S3Bucket")]
    pub s3_bucket: String,
    /// Object key of the bundle
    #[serde(rename = "S3Key")]
    pub s3_key: String,
}

impl SourceBundle {
    /// Create a source bundle location.
    pub fn new(s3_bucket: impl Into<String>, s3_key: impl Into<String>) -> Self {
        Self {
            s3_bucket: s3_bucket.into(),
            s3_key: s3_key.into(),
        }
    }
}

impl fmt::Display for SourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.s3_bucket, self.s3_key)
    }
}

/// An application version as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationVersion {
    /// Owning application
    pub application_name: String,
    /// Version label
    pub version_label: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Where the artifact lives
    #[serde(default)]
    pub source_bundle: Option<SourceBundle>,
    /// Creation timestamp
    pub date_created: DateTime<Utc>,
    /// Last update timestamp
    pub date_updated: DateTime<Utc>,
}

impl ApplicationVersion {
    /// View used by the retention selector.
    pub fn to_record(&self) -> VersionRecord {
        VersionRecord {
            label: self.version_label.clone(),
            date_created: self.date_created,
            date_updated: self.date_updated,
            source_location: self.source_bundle.as_ref().map(ToString::to_string),
        }
    }
}

impl ObservedResource for ApplicationVersion {
    fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Description => self.description.as_deref(),
            Field::VersionLabel => Some(&self.version_label),
            _ => None,
        }
    }
}

/// Lifecycle status of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentStatus {
    /// Being created
    Launching,
    /// Applying a change
    Updating,
    /// Stable and serving
    Ready,
    /// Being torn down
    Terminating,
    /// Gone
    Terminated,
    /// Status this client does not know about
    #[serde(other)]
    Unknown,
}

impl EnvironmentStatus {
    /// Whether the environment is gone or going away.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminating | Self::Terminated)
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Launching => "Launching",
            Self::Updating => "Updating",
            Self::Ready => "Ready",
            Self::Terminating => "Terminating",
            Self::Terminated => "Terminated",
            Self::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

/// Health color of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentHealth {
    /// Healthy
    Green,
    /// Degraded
    Yellow,
    /// Failing
    Red,
    /// Not reporting (launching, updating or stopped)
    Grey,
    /// Health this client does not know about
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EnvironmentHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Green => "Green",
            Self::Yellow => "Yellow",
            Self::Red => "Red",
            Self::Grey => "Grey",
            Self::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

/// Environment tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TierName {
    /// Serves HTTP traffic
    #[default]
    WebServer,
    /// Consumes a work queue
    Worker,
}

impl TierName {
    /// Tier type sent to the platform.
    pub fn tier_type(&self) -> &'static str {
        match self {
            Self::WebServer => "Standard",
            Self::Worker => "SQS/HTTP",
        }
    }

    /// Full tier description for this tier.
    pub fn tier(&self) -> Tier {
        Tier {
            name: *self,
            tier_type: self.tier_type().to_string(),
            version: TIER_VERSION.to_string(),
        }
    }
}

const TIER_VERSION: &str = "1.0";

/// Tier of an environment as sent to and reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tier {
    /// Tier name
    pub name: TierName,
    /// Tier type (`Standard` or `SQS/HTTP`)
    #[serde(rename = "Type")]
    pub tier_type: String,
    /// Tier version
    pub version: String,
}

/// An environment as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Environment {
    /// Platform-assigned id, stable for the environment's lifetime
    pub environment_id: String,
    /// Environment name
    pub environment_name: String,
    /// Owning application
    pub application_name: String,
    /// Deployed version
    #[serde(default)]
    pub version_label: Option<String>,
    /// Solution stack
    #[serde(default)]
    pub solution_stack_name: Option<String>,
    /// Configuration template the environment was launched from
    #[serde(default)]
    pub template_name: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Public host name
    #[serde(default, rename = "CNAME")]
    pub cname: Option<String>,
    /// Lifecycle status
    pub status: EnvironmentStatus,
    /// Health color
    pub health: EnvironmentHealth,
    /// Tier
    #[serde(default)]
    pub tier: Option<Tier>,
    /// Creation timestamp
    pub date_created: DateTime<Utc>,
    /// Last update timestamp
    pub date_updated: DateTime<Utc>,
}

impl Environment {
    /// First label of the CNAME.
    pub fn cname_prefix(&self) -> Option<&str> {
        self.cname.as_deref().and_then(|c| c.split('.').next())
    }
}

impl ObservedResource for Environment {
    fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Description => self.description.as_deref(),
            Field::VersionLabel => self.version_label.as_deref(),
            Field::TemplateName => self.template_name.as_deref(),
            Field::SolutionStackName => self.solution_stack_name.as_deref(),
            Field::CnamePrefix => self.cname_prefix(),
        }
    }
}

/// An environment together with its current option settings.
///
/// Serializes as the environment's own fields plus `OptionSettings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentSnapshot {
    /// The environment
    #[serde(flatten)]
    pub environment: Environment,
    /// Its configured option settings
    pub option_settings: Vec<OptionSetting>,
}

impl ObservedResource for EnvironmentSnapshot {
    fn field(&self, field: Field) -> Option<&str> {
        self.environment.field(field)
    }

    fn option_settings(&self) -> &[OptionSetting] {
        &self.option_settings
    }
}

/// Option settings of an environment or configuration template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigurationSettings {
    /// Owning application
    pub application_name: String,
    /// Environment these settings belong to, if any
    #[serde(default)]
    pub environment_name: Option<String>,
    /// Template these settings belong to, if any
    #[serde(default)]
    pub template_name: Option<String>,
    /// Solution stack
    #[serde(default)]
    pub solution_stack_name: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Deployment status of an environment's settings
    #[serde(default)]
    pub deployment_status: Option<String>,
    /// Configured option settings
    #[serde(default)]
    pub option_settings: Vec<OptionSetting>,
    /// Creation timestamp
    pub date_created: DateTime<Utc>,
    /// Last update timestamp
    pub date_updated: DateTime<Utc>,
}

impl ObservedResource for ConfigurationSettings {
    fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Description => self.description.as_deref(),
            Field::TemplateName => self.template_name.as_deref(),
            Field::SolutionStackName => self.solution_stack_name.as_deref(),
            _ => None,
        }
    }

    fn option_settings(&self) -> &[OptionSetting] {
        &self.option_settings
    }
}

// =============================================================================
// Desired specs
// =============================================================================

/// Desired application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationSpec {
    /// Application name
    pub application_name: String,
    /// Description, compared only when set
    pub description: Option<String>,
}

impl ApplicationSpec {
    /// Create a spec with no declared description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            application_name: name.into(),
            description: None,
        }
    }

    /// Declare a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl DesiredSpec for ApplicationSpec {
    fn declared(&self, field: Field) -> Option<&str> {
        match field {
            Field::Description => self.description.as_deref(),
            _ => None,
        }
    }
}

/// Desired application version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionSpec {
    /// Owning application
    pub application_name: String,
    /// Version label
    pub version_label: String,
    /// Description, compared only when set
    pub description: Option<String>,
    /// Artifact location, required to create the version
    pub source_bundle: Option<SourceBundle>,
}

impl VersionSpec {
    /// Create a spec for `label` in `app`.
    pub fn new(app: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            application_name: app.into(),
            version_label: label.into(),
            description: None,
            source_bundle: None,
        }
    }

    /// Declare a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the source bundle.
    pub fn with_source(mut self, bundle: SourceBundle) -> Self {
        self.source_bundle = Some(bundle);
        self
    }
}

impl DesiredSpec for VersionSpec {
    fn declared(&self, field: Field) -> Option<&str> {
        match field {
            Field::Description => self.description.as_deref(),
            _ => None,
        }
    }
}

/// Desired environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentSpec {
    /// Owning application
    pub application_name: String,
    /// Environment name
    pub environment_name: String,
    /// Version to deploy
    pub version_label: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Template to launch from (exclusive with `solution_stack_name`)
    pub template_name: Option<String>,
    /// Solution stack to launch on (exclusive with `template_name`)
    pub solution_stack_name: Option<String>,
    /// Requested CNAME prefix
    #[serde(rename = "CNAMEPrefix")]
    pub cname_prefix: Option<String>,
    /// Tier
    pub tier: TierName,
    /// Desired option settings, in caller order
    pub option_settings: Vec<OptionSetting>,
    /// Tags applied on create
    pub tags: BTreeMap<String, String>,
    /// Health required before a create or update counts as complete
    #[serde(skip)]
    pub wait_for_health: Option<EnvironmentHealth>,
}

impl EnvironmentSpec {
    /// Create a spec for `name` in `app` with nothing else declared.
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            application_name: app.into(),
            environment_name: name.into(),
            version_label: None,
            description: None,
            template_name: None,
            solution_stack_name: None,
            cname_prefix: None,
            tier: TierName::default(),
            option_settings: Vec::new(),
            tags: BTreeMap::new(),
            wait_for_health: None,
        }
    }

    /// Tier description sent on create.
    pub fn tier(&self) -> Tier {
        self.tier.tier()
    }
}

impl DesiredSpec for EnvironmentSpec {
    fn declared(&self, field: Field) -> Option<&str> {
        match field {
            Field::Description => self.description.as_deref(),
            Field::VersionLabel => self.version_label.as_deref(),
            Field::TemplateName => self.template_name.as_deref(),
            Field::SolutionStackName => self.solution_stack_name.as_deref(),
            Field::CnamePrefix => self.cname_prefix.as_deref(),
        }
    }

    fn option_settings(&self) -> &[OptionSetting] {
        &self.option_settings
    }
}

/// Desired configuration template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateSpec {
    /// Owning application
    pub application_name: String,
    /// Template name
    pub template_name: String,
    /// Description
    pub description: Option<String>,
    /// Solution stack
    pub solution_stack_name: Option<String>,
    /// Desired option settings, in caller order
    pub option_settings: Vec<OptionSetting>,
    /// Tags applied on create
    pub tags: BTreeMap<String, String>,
}

impl TemplateSpec {
    /// Create a spec for `name` in `app` with nothing else declared.
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            application_name: app.into(),
            template_name: name.into(),
            description: None,
            solution_stack_name: None,
            option_settings: Vec::new(),
            tags: BTreeMap::new(),
        }
    }
}

impl DesiredSpec for TemplateSpec {
    fn declared(&self, field: Field) -> Option<&str> {
        match field {
            Field::Description => self.description.as_deref(),
            Field::SolutionStackName => self.solution_stack_name.as_deref(),
            _ => None,
        }
    }

    fn option_settings(&self) -> &[OptionSetting] {
        &self.option_settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn environment() -> Environment {
        Environment {
            environment_id: "e-123".to_string(),
            environment_name: "shop-prod".to_string(),
            application_name: "shop".to_string(),
            version_label: Some("v1".to_string()),
            solution_stack_name: None,
            template_name: Some("base".to_string()),
            description: None,
            cname: Some("shop-prod.us-east-1.example.com".to_string()),
            status: EnvironmentStatus::Ready,
            health: EnvironmentHealth::Green,
            tier: Some(TierName::WebServer.tier()),
            date_created: ts(),
            date_updated: ts(),
        }
    }

    #[test]
    fn test_tier_types() {
        assert_eq!(TierName::WebServer.tier_type(), "Standard");
        assert_eq!(TierName::Worker.tier_type(), "SQS/HTTP");
        assert_eq!(TierName::Worker.tier().version, "1.0");
    }

    #[test]
    fn test_cname_prefix_is_first_label() {
        let env = environment();
        assert_eq!(env.cname_prefix(), Some("shop-prod"));
        assert_eq!(env.field(Field::CnamePrefix), Some("shop-prod"));
    }

    #[test]
    fn test_status_terminal() {
        assert!(EnvironmentStatus::Terminated.is_terminal());
        assert!(EnvironmentStatus::Terminating.is_terminal());
        assert!(!EnvironmentStatus::Updating.is_terminal());
    }

    #[test]
    fn test_environment_wire_format() {
        let json = serde_json::to_value(environment()).unwrap();
        assert_eq!(json["EnvironmentName"], "shop-prod");
        assert_eq!(json["CNAME"], "shop-prod.us-east-1.example.com");
        assert_eq!(json["Tier"]["Type"], "Standard");

        let back: Environment = serde_json::from_value(json).unwrap();
        assert_eq!(back, environment());
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let mut json = serde_json::to_value(environment()).unwrap();
        json["Status"] = "Aborting".into();
        let env: Environment = serde_json::from_value(json).unwrap();
        assert_eq!(env.status, EnvironmentStatus::Unknown);
    }

    #[test]
    fn test_version_record_carries_source_location() {
        let version = ApplicationVersion {
            application_name: "shop".to_string(),
            version_label: "v7".to_string(),
            description: None,
            source_bundle: Some(SourceBundle::new("artifacts", "shop/v7.zip")),
            date_created: ts(),
            date_updated: ts(),
        };
        let record = version.to_record();
        assert_eq!(record.label, "v7");
        assert_eq!(record.source_location.as_deref(), Some("s3://artifacts/shop/v7.zip"));
    }

    #[test]
    fn test_environment_spec_declares_only_set_fields() {
        let mut spec = EnvironmentSpec::new("shop", "shop-prod");
        spec.version_label = Some("v2".to_string());
        assert_eq!(spec.declared(Field::VersionLabel), Some("v2"));
        assert_eq!(spec.declared(Field::TemplateName), None);
    }

    #[test]
    fn test_template_spec_ignores_environment_fields() {
        let mut spec = TemplateSpec::new("shop", "base");
        spec.description = Some("base config".to_string());
        assert_eq!(spec.declared(Field::Description), Some("base config"));
        assert_eq!(spec.declared(Field::VersionLabel), None);
        assert_eq!(spec.declared(Field::CnamePrefix), None);
    }
}
