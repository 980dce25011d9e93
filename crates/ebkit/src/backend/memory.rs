//! In-process control plane.
//!
//! [`MemoryBackend`] keeps applications, versions, environments and templates
//! in memory and behaves like the remote platform where reconcile flows care:
//! environment mutations are asynchronous (a launching, updating or
//! terminating environment settles only after a configurable number of
//! observations), rejections carry the platform's messages, reads can be
//! throttled on demand, and every call is recorded.
//!
//! Clones share state, so a test can keep one handle for assertions while a
//! [`Client`](crate::Client) owns another.

use crate::backend::{Backend, SettingsTarget};
use crate::error::{Error, Result};
use crate::types::{
    Application, ApplicationVersion, ConfigurationSettings, Environment, EnvironmentHealth,
    EnvironmentSpec, EnvironmentStatus, ResourceKind, SourceBundle, TemplateSpec, VersionSpec,
};
use chrono::{DateTime, Utc};
use declarative::OptionSetting;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Observations a transitional environment needs before it settles.
pub const DEFAULT_TRANSITION_POLLS: u32 = 2;

const WRITE_OPS: [&str; 12] = [
    "create_application",
    "update_application",
    "delete_application",
    "create_version",
    "update_version",
    "delete_version",
    "create_environment",
    "update_environment",
    "terminate_environment",
    "create_configuration_template",
    "update_configuration_template",
    "delete_configuration_template",
];

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Backend method name
    pub op: &'static str,
    /// What it addressed (`app`, `app/label`, ...)
    pub target: String,
}

impl Call {
    fn new(op: &'static str, target: impl Into<String>) -> Self {
        Self {
            op,
            target: target.into(),
        }
    }

    /// Whether this call mutates state.
    pub fn is_write(&self) -> bool {
        WRITE_OPS.contains(&self.op)
    }
}

#[derive(Debug)]
struct EnvironmentEntry {
    environment: Environment,
    settings: Vec<OptionSetting>,
    remaining: u32,
}

impl EnvironmentEntry {
    fn is_live(&self) -> bool {
        self.environment.status != EnvironmentStatus::Terminated
    }

    /// Count one observation and settle the status once it is due.
    fn observe(&mut self, settled_health: EnvironmentHealth) {
        let target = match self.environment.status {
            EnvironmentStatus::Launching | EnvironmentStatus::Updating => {
                (EnvironmentStatus::Ready, settled_health)
            }
            EnvironmentStatus::Terminating => {
                (EnvironmentStatus::Terminated, EnvironmentHealth::Grey)
            }
            _ => return,
        };
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.environment.status = target.0;
            self.environment.health = target.1;
            self.environment.date_updated = Utc::now();
        }
    }

    fn begin(&mut self, status: EnvironmentStatus, polls: u32) {
        self.environment.status = status;
        self.environment.health = EnvironmentHealth::Grey;
        self.environment.date_updated = Utc::now();
        self.remaining = polls;
    }
}

#[derive(Debug)]
struct State {
    applications: BTreeMap<String, Application>,
    versions: Vec<ApplicationVersion>,
    environments: Vec<EnvironmentEntry>,
    templates: Vec<ConfigurationSettings>,
    missing_sources: BTreeSet<String>,
    failing_deletes: BTreeSet<String>,
    throttled_reads: u32,
    throttle_after_write: u32,
    transition_polls: u32,
    settled_health: EnvironmentHealth,
    next_id: u32,
    calls: Vec<Call>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            applications: BTreeMap::new(),
            versions: Vec::new(),
            environments: Vec::new(),
            templates: Vec::new(),
            missing_sources: BTreeSet::new(),
            failing_deletes: BTreeSet::new(),
            throttled_reads: 0,
            throttle_after_write: 0,
            transition_polls: DEFAULT_TRANSITION_POLLS,
            settled_health: EnvironmentHealth::Green,
            next_id: 1,
            calls: Vec::new(),
        }
    }
}

impl State {
    fn require_application(&self, app: &str) -> Result<()> {
        if self.applications.contains_key(app) {
            Ok(())
        } else {
            Err(rejected(
                ResourceKind::Application,
                app,
                format!("No Application named '{app}' found."),
            ))
        }
    }

    fn live_environment_mut(&mut self, app: Option<&str>, name: &str) -> Option<&mut EnvironmentEntry> {
        self.environments.iter_mut().rev().find(|e| {
            e.is_live()
                && e.environment.environment_name == name
                && app.is_none_or(|a| e.environment.application_name == a)
        })
    }

    fn template_index(&self, app: &str, name: &str) -> Option<usize> {
        self.templates.iter().position(|t| {
            t.application_name == app && t.template_name.as_deref() == Some(name)
        })
    }

    fn is_deployed(&self, app: &str, label: &str) -> bool {
        self.environments.iter().any(|e| {
            e.is_live()
                && e.environment.application_name == app
                && e.environment.version_label.as_deref() == Some(label)
        })
    }

    fn application_view(&self, app: &Application) -> Application {
        let mut view = app.clone();
        view.versions = self
            .versions
            .iter()
            .filter(|v| v.application_name == app.application_name)
            .map(|v| v.version_label.clone())
            .collect();
        view.configuration_templates = self
            .templates
            .iter()
            .filter(|t| t.application_name == app.application_name)
            .filter_map(|t| t.template_name.clone())
            .collect();
        view
    }
}

fn rejected(kind: ResourceKind, name: &str, message: String) -> Error {
    Error::from_remote("InvalidParameterValue", &message, kind, name)
}

fn no_environment(name: &str) -> Error {
    rejected(
        ResourceKind::Environment,
        name,
        format!("No Environment found for EnvironmentName = '{name}'."),
    )
}

fn no_template(app: &str, name: &str) -> Error {
    rejected(
        ResourceKind::Template,
        name,
        format!("No Configuration Template named '{app}/{name}' found."),
    )
}

fn no_version(label: &str) -> Error {
    rejected(
        ResourceKind::Version,
        label,
        format!("No Application Version named '{label}' found."),
    )
}

/// An environment call rejected because it names a missing version or template.
fn bad_reference(environment: &str, missing: Error) -> Error {
    rejected(ResourceKind::Environment, environment, missing.to_string())
}

/// Override or append settings by `(Namespace, OptionName)`.
fn merge_settings(current: &mut Vec<OptionSetting>, changes: &[OptionSetting]) {
    for setting in changes {
        match current.iter_mut().find(|s| s.same_option(setting)) {
            Some(existing) => existing.value.clone_from(&setting.value),
            None => current.push(setting.clone()),
        }
    }
}

/// In-memory platform used by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    /// Create an empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many observations a transitional environment needs to settle.
    pub fn with_transition_polls(self, polls: u32) -> Self {
        self.lock().transition_polls = polls;
        self
    }

    /// Health an environment reports once a launch or update settles.
    pub fn with_settled_health(self, health: EnvironmentHealth) -> Self {
        self.lock().settled_health = health;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, op: &'static str, kind: ResourceKind, target: &str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(Call::new(op, target));
        if state.throttled_reads > 0 {
            state.throttled_reads -= 1;
            log::trace!("memory backend: throttling {op} {target}");
            return Err(Error::from_remote("Throttling", "Rate exceeded", kind, target));
        }
        Ok(state)
    }

    fn write(&self, op: &'static str, target: &str) -> MutexGuard<'_, State> {
        let mut state = self.lock();
        state.calls.push(Call::new(op, target));
        let pending = std::mem::take(&mut state.throttle_after_write);
        state.throttled_reads += pending;
        state
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Add an application.
    pub fn seed_application(&self, name: &str, description: Option<&str>) {
        let now = Utc::now();
        self.lock().applications.insert(
            name.to_string(),
            Application {
                application_name: name.to_string(),
                description: description.map(str::to_string),
                date_created: now,
                date_updated: now,
                versions: Vec::new(),
                configuration_templates: Vec::new(),
            },
        );
    }

    /// Add a version last updated at `updated`.
    pub fn seed_version(&self, app: &str, label: &str, updated: DateTime<Utc>) {
        self.insert_version(ApplicationVersion {
            application_name: app.to_string(),
            version_label: label.to_string(),
            description: None,
            source_bundle: Some(SourceBundle::new("artifacts", format!("{app}/{label}.zip"))),
            date_created: updated,
            date_updated: updated,
        });
    }

    /// Add a fully specified version.
    pub fn insert_version(&self, version: ApplicationVersion) {
        self.lock().versions.push(version);
    }

    /// Add a Ready, Green environment and return its id.
    pub fn seed_environment(&self, app: &str, name: &str, version_label: Option<&str>) -> String {
        let mut state = self.lock();
        let id = format!("e-{:08}", state.next_id);
        state.next_id += 1;
        let now = Utc::now();
        state.environments.push(EnvironmentEntry {
            environment: Environment {
                environment_id: id.clone(),
                environment_name: name.to_string(),
                application_name: app.to_string(),
                version_label: version_label.map(str::to_string),
                solution_stack_name: Some("64bit Amazon Linux running Docker".to_string()),
                template_name: None,
                description: None,
                cname: Some(format!("{name}.platform.example.com")),
                status: EnvironmentStatus::Ready,
                health: EnvironmentHealth::Green,
                tier: Some(crate::types::TierName::WebServer.tier()),
                date_created: now,
                date_updated: now,
            },
            settings: Vec::new(),
            remaining: 0,
        });
        id
    }

    /// Replace the option settings of a live environment.
    pub fn set_environment_settings(&self, name: &str, settings: Vec<OptionSetting>) {
        if let Some(entry) = self.lock().live_environment_mut(None, name) {
            entry.settings = settings;
        }
    }

    /// Add a configuration template.
    pub fn insert_template(&self, template: ConfigurationSettings) {
        self.lock().templates.push(template);
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    /// Fail the next `n` reads with a throttling error.
    pub fn throttle_reads(&self, n: u32) {
        self.lock().throttled_reads += n;
    }

    /// Fail `n` reads with a throttling error, starting after the next write.
    pub fn throttle_reads_after_next_write(&self, n: u32) {
        self.lock().throttle_after_write += n;
    }

    /// Pretend the source bundle of `label` is already gone.
    pub fn mark_source_missing(&self, label: &str) {
        self.lock().missing_sources.insert(label.to_string());
    }

    /// Reject every deletion of version `label`.
    pub fn fail_deletes_of(&self, label: &str) {
        self.lock().failing_deletes.insert(label.to_string());
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Every mutating call so far, in order.
    pub fn writes(&self) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Most recent environment with this name, in any status.
    pub fn environment(&self, name: &str) -> Option<Environment> {
        self.lock()
            .environments
            .iter()
            .rev()
            .find(|e| e.environment.environment_name == name)
            .map(|e| e.environment.clone())
    }

    /// Option settings of the live environment with this name.
    pub fn environment_settings(&self, name: &str) -> Vec<OptionSetting> {
        self.lock()
            .live_environment_mut(None, name)
            .map(|e| e.settings.clone())
            .unwrap_or_default()
    }

    /// Labels of an application's versions.
    pub fn version_labels(&self, app: &str) -> Vec<String> {
        self.lock()
            .versions
            .iter()
            .filter(|v| v.application_name == app)
            .map(|v| v.version_label.clone())
            .collect()
    }
}

impl Backend for MemoryBackend {
    fn list_applications(&self, name: Option<&str>) -> Result<Vec<Application>> {
        let state = self.read("list_applications", ResourceKind::Application, name.unwrap_or(""))?;
        Ok(state
            .applications
            .values()
            .filter(|a| name.is_none_or(|n| a.application_name == n))
            .map(|a| state.application_view(a))
            .collect())
    }

    fn create_application(&self, name: &str, description: Option<&str>) -> Result<()> {
        let mut state = self.write("create_application", name);
        if state.applications.contains_key(name) {
            return Err(rejected(
                ResourceKind::Application,
                name,
                format!("Application {name} already exists."),
            ));
        }
        let now = Utc::now();
        state.applications.insert(
            name.to_string(),
            Application {
                application_name: name.to_string(),
                description: description.map(str::to_string),
                date_created: now,
                date_updated: now,
                versions: Vec::new(),
                configuration_templates: Vec::new(),
            },
        );
        Ok(())
    }

    fn update_application(&self, name: &str, description: Option<&str>) -> Result<()> {
        let mut state = self.write("update_application", name);
        state.require_application(name)?;
        if let Some(app) = state.applications.get_mut(name) {
            app.description = description.map(str::to_string);
            app.date_updated = Utc::now();
        }
        Ok(())
    }

    fn delete_application(&self, name: &str) -> Result<()> {
        let mut state = self.write("delete_application", name);
        state.require_application(name)?;
        state.applications.remove(name);
        state.versions.retain(|v| v.application_name != name);
        state.templates.retain(|t| t.application_name != name);
        Ok(())
    }

    fn list_versions(&self, app: &str, label: Option<&str>) -> Result<Vec<ApplicationVersion>> {
        let target = label.map_or_else(|| app.to_string(), |l| format!("{app}/{l}"));
        let state = self.read("list_versions", ResourceKind::Version, &target)?;
        Ok(state
            .versions
            .iter()
            .filter(|v| v.application_name == app)
            .filter(|v| label.is_none_or(|l| v.version_label == l))
            .cloned()
            .collect())
    }

    fn create_version(&self, spec: &VersionSpec) -> Result<()> {
        let app = &spec.application_name;
        let label = &spec.version_label;
        let mut state = self.write("create_version", &format!("{app}/{label}"));
        state.require_application(app)?;
        if state
            .versions
            .iter()
            .any(|v| &v.application_name == app && &v.version_label == label)
        {
            return Err(rejected(
                ResourceKind::Version,
                label,
                format!("Application Version {label} already exists."),
            ));
        }
        let Some(source_bundle) = spec.source_bundle.clone() else {
            return Err(Error::from_remote(
                "MissingParameter",
                "SourceBundle is required",
                ResourceKind::Version,
                label,
            ));
        };
        let now = Utc::now();
        state.versions.push(ApplicationVersion {
            application_name: app.clone(),
            version_label: label.clone(),
            description: spec.description.clone(),
            source_bundle: Some(source_bundle),
            date_created: now,
            date_updated: now,
        });
        Ok(())
    }

    fn update_version(&self, app: &str, label: &str, description: Option<&str>) -> Result<()> {
        let mut state = self.write("update_version", &format!("{app}/{label}"));
        let version = state
            .versions
            .iter_mut()
            .find(|v| v.application_name == app && v.version_label == label)
            .ok_or_else(|| no_version(label))?;
        version.description = description.map(str::to_string);
        version.date_updated = Utc::now();
        Ok(())
    }

    fn delete_version(&self, app: &str, label: &str, delete_source: bool) -> Result<()> {
        let mut state = self.write("delete_version", &format!("{app}/{label}"));
        if state.failing_deletes.contains(label) {
            return Err(Error::from_remote(
                "InsufficientPrivilegesException",
                &format!("Access denied deleting version {label}"),
                ResourceKind::Version,
                label,
            ));
        }
        if state.is_deployed(app, label) {
            return Err(Error::from_remote(
                "OperationInProgressFailure",
                &format!("Unable to delete application version {label} because it is being used by an environment"),
                ResourceKind::Version,
                label,
            ));
        }
        let index = state
            .versions
            .iter()
            .position(|v| v.application_name == app && v.version_label == label)
            .ok_or_else(|| no_version(label))?;
        state.versions.remove(index);

        if delete_source && state.missing_sources.contains(label) {
            return Err(Error::from_remote(
                "SourceBundleDeletionFailure",
                &format!("Unable to delete source bundle for version {label}: object does not exist"),
                ResourceKind::Version,
                label,
            ));
        }
        Ok(())
    }

    fn list_environments(&self, app: &str, names: Option<&[String]>) -> Result<Vec<Environment>> {
        let target = names.map_or_else(|| app.to_string(), |n| format!("{app}/{}", n.join(",")));
        let mut state = self.read("list_environments", ResourceKind::Environment, &target)?;
        let settled = state.settled_health;
        let mut found = Vec::new();
        for entry in &mut state.environments {
            let env = &entry.environment;
            if env.application_name != app {
                continue;
            }
            if names.is_some_and(|n| !n.contains(&env.environment_name)) {
                continue;
            }
            entry.observe(settled);
            found.push(entry.environment.clone());
        }
        Ok(found)
    }

    fn create_environment(&self, spec: &EnvironmentSpec) -> Result<Environment> {
        let app = &spec.application_name;
        let name = &spec.environment_name;
        let mut state = self.write("create_environment", &format!("{app}/{name}"));
        state.require_application(app)?;

        if state
            .environments
            .iter()
            .any(|e| e.is_live() && &e.environment.environment_name == name)
        {
            return Err(rejected(
                ResourceKind::Environment,
                name,
                format!("Environment {name} already exists."),
            ));
        }

        let mut settings = Vec::new();
        let mut solution_stack = spec.solution_stack_name.clone();
        match (&spec.template_name, &spec.solution_stack_name) {
            (Some(template), _) => {
                let index = state
                    .template_index(app, template)
                    .ok_or_else(|| bad_reference(name, no_template(app, template)))?;
                let template = &state.templates[index];
                settings.clone_from(&template.option_settings);
                solution_stack.clone_from(&template.solution_stack_name);
            }
            (None, Some(_)) => {}
            (None, None) => {
                return Err(Error::from_remote(
                    "MissingParameter",
                    "Either TemplateName or SolutionStackName must be specified",
                    ResourceKind::Environment,
                    name,
                ));
            }
        }

        if let Some(label) = &spec.version_label
            && !state
                .versions
                .iter()
                .any(|v| &v.application_name == app && &v.version_label == label)
        {
            return Err(bad_reference(name, no_version(label)));
        }

        merge_settings(&mut settings, &spec.option_settings);

        let id = format!("e-{:08}", state.next_id);
        state.next_id += 1;
        let now = Utc::now();
        let prefix = spec.cname_prefix.as_deref().unwrap_or(name);
        let environment = Environment {
            environment_id: id,
            environment_name: name.clone(),
            application_name: app.clone(),
            version_label: spec.version_label.clone(),
            solution_stack_name: solution_stack,
            template_name: spec.template_name.clone(),
            description: spec.description.clone(),
            cname: Some(format!("{prefix}.platform.example.com")),
            status: EnvironmentStatus::Launching,
            health: EnvironmentHealth::Grey,
            tier: Some(spec.tier()),
            date_created: now,
            date_updated: now,
        };
        let remaining = state.transition_polls;
        state.environments.push(EnvironmentEntry {
            environment: environment.clone(),
            settings,
            remaining,
        });
        Ok(environment)
    }

    fn update_environment(&self, spec: &EnvironmentSpec) -> Result<Environment> {
        let app = &spec.application_name;
        let name = &spec.environment_name;
        let mut state = self.write("update_environment", &format!("{app}/{name}"));
        let polls = state.transition_polls;

        if let Some(label) = &spec.version_label
            && !state
                .versions
                .iter()
                .any(|v| &v.application_name == app && &v.version_label == label)
        {
            return Err(bad_reference(name, no_version(label)));
        }

        let entry = state
            .live_environment_mut(Some(app), name)
            .ok_or_else(|| no_environment(name))?;
        if entry.environment.status != EnvironmentStatus::Ready {
            return Err(rejected(
                ResourceKind::Environment,
                name,
                format!("Environment named {name} is in an invalid state for this operation. Must be Ready."),
            ));
        }

        let env = &mut entry.environment;
        if spec.version_label.is_some() {
            env.version_label.clone_from(&spec.version_label);
        }
        if spec.description.is_some() {
            env.description.clone_from(&spec.description);
        }
        if spec.template_name.is_some() {
            env.template_name.clone_from(&spec.template_name);
        }
        if spec.solution_stack_name.is_some() {
            env.solution_stack_name.clone_from(&spec.solution_stack_name);
        }
        merge_settings(&mut entry.settings, &spec.option_settings);
        entry.begin(EnvironmentStatus::Updating, polls);
        Ok(entry.environment.clone())
    }

    fn terminate_environment(&self, name: &str) -> Result<()> {
        let mut state = self.write("terminate_environment", name);
        let polls = state.transition_polls;
        let entry = state
            .live_environment_mut(None, name)
            .filter(|e| e.environment.status != EnvironmentStatus::Terminating)
            .ok_or_else(|| no_environment(name))?;
        entry.begin(EnvironmentStatus::Terminating, polls);
        Ok(())
    }

    fn describe_configuration_settings(
        &self,
        app: &str,
        target: SettingsTarget<'_>,
    ) -> Result<Vec<ConfigurationSettings>> {
        let kind = match target {
            SettingsTarget::Environment(_) => ResourceKind::Environment,
            _ => ResourceKind::Template,
        };
        let mut state = self.read(
            "describe_configuration_settings",
            kind,
            &format!("{app}/{target}"),
        )?;

        match target {
            SettingsTarget::Environment(name) => {
                let entry = state
                    .live_environment_mut(Some(app), name)
                    .ok_or_else(|| no_environment(name))?;
                let env = &entry.environment;
                Ok(vec![ConfigurationSettings {
                    application_name: env.application_name.clone(),
                    environment_name: Some(env.environment_name.clone()),
                    template_name: None,
                    solution_stack_name: env.solution_stack_name.clone(),
                    description: env.description.clone(),
                    deployment_status: Some("deployed".to_string()),
                    option_settings: entry.settings.clone(),
                    date_created: env.date_created,
                    date_updated: env.date_updated,
                }])
            }
            SettingsTarget::Template(name) => {
                let index = state
                    .template_index(app, name)
                    .ok_or_else(|| no_template(app, name))?;
                Ok(vec![state.templates[index].clone()])
            }
            SettingsTarget::AllTemplates => Ok(state
                .templates
                .iter()
                .filter(|t| t.application_name == app)
                .cloned()
                .collect()),
        }
    }

    fn create_configuration_template(&self, spec: &TemplateSpec) -> Result<()> {
        let app = &spec.application_name;
        let name = &spec.template_name;
        let mut state = self.write("create_configuration_template", &format!("{app}/{name}"));
        state.require_application(app)?;
        if state.template_index(app, name).is_some() {
            return Err(rejected(
                ResourceKind::Template,
                name,
                format!("Configuration Template {name} already exists."),
            ));
        }
        let mut settings = Vec::new();
        merge_settings(&mut settings, &spec.option_settings);
        let now = Utc::now();
        state.templates.push(ConfigurationSettings {
            application_name: app.clone(),
            environment_name: None,
            template_name: Some(name.clone()),
            solution_stack_name: spec.solution_stack_name.clone(),
            description: spec.description.clone(),
            deployment_status: None,
            option_settings: settings,
            date_created: now,
            date_updated: now,
        });
        Ok(())
    }

    fn update_configuration_template(&self, spec: &TemplateSpec) -> Result<()> {
        let app = &spec.application_name;
        let name = &spec.template_name;
        let mut state = self.write("update_configuration_template", &format!("{app}/{name}"));
        let index = state
            .template_index(app, name)
            .ok_or_else(|| no_template(app, name))?;
        let template = &mut state.templates[index];
        if spec.description.is_some() {
            template.description.clone_from(&spec.description);
        }
        if spec.solution_stack_name.is_some() {
            template.solution_stack_name.clone_from(&spec.solution_stack_name);
        }
        merge_settings(&mut template.option_settings, &spec.option_settings);
        template.date_updated = Utc::now();
        Ok(())
    }

    fn delete_configuration_template(&self, app: &str, name: &str) -> Result<()> {
        let mut state = self.write("delete_configuration_template", &format!("{app}/{name}"));
        let index = state
            .template_index(app, name)
            .ok_or_else(|| no_template(app, name))?;
        state.templates.remove(index);
        Ok(())
    }
}
