//! HTTP control plane backend.
//!
//! Speaks blocking JSON over HTTP. Resources live under
//! `/applications/{app}/...`; failed calls return a `{code, message}` body that
//! is classified with [`Error::from_remote`].

use crate::backend::{Backend, SettingsTarget};
use crate::error::{Error, Result};
use crate::types::{
    Application, ApplicationVersion, ConfigurationSettings, Environment, EnvironmentSpec,
    ResourceKind, SourceBundle, TemplateSpec, Tier, VersionSpec,
};
use declarative::OptionSetting;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ureq::Body;
use ureq::http::Response;
use url::Url;

const USER_AGENT: &str = concat!("ebkit/", env!("CARGO_PKG_VERSION"));

/// Backend talking to the control plane over HTTP.
pub struct HttpBackend {
    agent: ureq::Agent,
    base: Url,
}

impl HttpBackend {
    /// Create a backend for the control plane at `endpoint`.
    pub fn new(endpoint: &str) -> Result<Self> {
        let base = Url::parse(endpoint)?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidRequest(format!(
                "endpoint cannot be used as a base URL: {endpoint}"
            )));
        }
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Ok(Self { agent, base })
    }

    /// The control plane base URL.
    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    /// Build a URL from percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                Error::InvalidRequest(format!("endpoint cannot be a base URL: {}", self.base))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, url: &Url, kind: ResourceKind, name: &str) -> Result<T> {
        log::trace!("GET {url}");
        let response = self
            .agent
            .get(url.as_str())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .call()?;
        let mut response = check(response, kind, name)?;
        Ok(response.body_mut().read_json()?)
    }

    fn post<B: Serialize>(&self, url: &Url, body: &B, kind: ResourceKind, name: &str) -> Result<Response<Body>> {
        log::trace!("POST {url}");
        let response = self
            .agent
            .post(url.as_str())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_json(body)?;
        check(response, kind, name)
    }

    fn put<B: Serialize>(&self, url: &Url, body: &B, kind: ResourceKind, name: &str) -> Result<Response<Body>> {
        log::trace!("PUT {url}");
        let response = self
            .agent
            .put(url.as_str())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_json(body)?;
        check(response, kind, name)
    }

    fn delete(&self, url: &Url, kind: ResourceKind, name: &str) -> Result<()> {
        log::trace!("DELETE {url}");
        let response = self
            .agent
            .delete(url.as_str())
            .header("User-Agent", USER_AGENT)
            .call()?;
        check(response, kind, name).map(|_| ())
    }
}

/// Error body returned for non-2xx responses.
#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    code: String,
    message: String,
}

/// Pass 2xx responses through; classify everything else.
fn check(mut response: Response<Body>, kind: ResourceKind, name: &str) -> Result<Response<Body>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let (code, message) = match response.body_mut().read_json::<RemoteErrorBody>() {
        Ok(body) => (body.code, body.message),
        Err(_) => (
            status.as_str().to_string(),
            status.canonical_reason().unwrap_or("request failed").to_string(),
        ),
    };
    let code = if matches!(status.as_u16(), 429 | 503) {
        "Throttling".to_string()
    } else {
        code
    };

    log::debug!("{kind} {name}: HTTP {status}: {code}: {message}");
    Err(Error::from_remote(&code, &message, kind, name))
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ApplicationBody<'a> {
    application_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateVersionBody<'a> {
    version_label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    source_bundle: &'a SourceBundle,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescriptionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TagBody<'a> {
    key: &'a str,
    value: &'a str,
}

fn tag_bodies(tags: &BTreeMap<String, String>) -> Vec<TagBody<'_>> {
    tags.iter()
        .map(|(key, value)| TagBody { key, value })
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateEnvironmentBody<'a> {
    environment_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution_stack_name: Option<&'a str>,
    #[serde(rename = "CNAMEPrefix", skip_serializing_if = "Option::is_none")]
    cname_prefix: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    option_settings: &'a [OptionSetting],
    tags: Vec<TagBody<'a>>,
    tier: Tier,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateEnvironmentBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version_label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution_stack_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    option_settings: &'a [OptionSetting],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TemplateBody<'a> {
    template_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution_stack_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    option_settings: &'a [OptionSetting],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<TagBody<'a>>,
}

impl Backend for HttpBackend {
    fn list_applications(&self, name: Option<&str>) -> Result<Vec<Application>> {
        let mut url = self.url(&["applications"])?;
        if let Some(name) = name {
            url.query_pairs_mut().append_pair("name", name);
        }
        self.get(&url, ResourceKind::Application, name.unwrap_or(""))
    }

    fn create_application(&self, name: &str, description: Option<&str>) -> Result<()> {
        let url = self.url(&["applications"])?;
        let body = ApplicationBody {
            application_name: name,
            description,
        };
        self.post(&url, &body, ResourceKind::Application, name).map(|_| ())
    }

    fn update_application(&self, name: &str, description: Option<&str>) -> Result<()> {
        let url = self.url(&["applications", name])?;
        let body = DescriptionBody { description };
        self.put(&url, &body, ResourceKind::Application, name).map(|_| ())
    }

    fn delete_application(&self, name: &str) -> Result<()> {
        let url = self.url(&["applications", name])?;
        self.delete(&url, ResourceKind::Application, name)
    }

    fn list_versions(&self, app: &str, label: Option<&str>) -> Result<Vec<ApplicationVersion>> {
        let mut url = self.url(&["applications", app, "versions"])?;
        if let Some(label) = label {
            url.query_pairs_mut().append_pair("label", label);
        }
        self.get(&url, ResourceKind::Version, label.unwrap_or(app))
    }

    fn create_version(&self, spec: &VersionSpec) -> Result<()> {
        let source_bundle = spec.source_bundle.as_ref().ok_or_else(|| {
            Error::InvalidRequest(format!(
                "a source bundle is required to create version {}",
                spec.version_label
            ))
        })?;
        let url = self.url(&["applications", &spec.application_name, "versions"])?;
        let body = CreateVersionBody {
            version_label: &spec.version_label,
            description: spec.description.as_deref(),
            source_bundle,
        };
        self.post(&url, &body, ResourceKind::Version, &spec.version_label)
            .map(|_| ())
    }

    fn update_version(&self, app: &str, label: &str, description: Option<&str>) -> Result<()> {
        let url = self.url(&["applications", app, "versions", label])?;
        let body = DescriptionBody { description };
        self.put(&url, &body, ResourceKind::Version, label).map(|_| ())
    }

    fn delete_version(&self, app: &str, label: &str, delete_source: bool) -> Result<()> {
        let mut url = self.url(&["applications", app, "versions", label])?;
        if delete_source {
            url.query_pairs_mut().append_pair("delete_source", "true");
        }
        self.delete(&url, ResourceKind::Version, label)
    }

    fn list_environments(&self, app: &str, names: Option<&[String]>) -> Result<Vec<Environment>> {
        let mut url = self.url(&["applications", app, "environments"])?;
        if let Some(names) = names {
            let mut query = url.query_pairs_mut();
            for name in names {
                query.append_pair("name", name);
            }
        }
        let query = names.map(|n| n.join(",")).unwrap_or_default();
        self.get(&url, ResourceKind::Environment, &query)
    }

    fn create_environment(&self, spec: &EnvironmentSpec) -> Result<Environment> {
        let url = self.url(&["applications", &spec.application_name, "environments"])?;
        let body = CreateEnvironmentBody {
            environment_name: &spec.environment_name,
            version_label: spec.version_label.as_deref(),
            template_name: spec.template_name.as_deref(),
            solution_stack_name: spec.solution_stack_name.as_deref(),
            cname_prefix: spec.cname_prefix.as_deref(),
            description: spec.description.as_deref(),
            option_settings: &spec.option_settings,
            tags: tag_bodies(&spec.tags),
            tier: spec.tier(),
        };
        let mut response = self.post(&url, &body, ResourceKind::Environment, &spec.environment_name)?;
        Ok(response.body_mut().read_json()?)
    }

    fn update_environment(&self, spec: &EnvironmentSpec) -> Result<Environment> {
        let url = self.url(&[
            "applications",
            &spec.application_name,
            "environments",
            &spec.environment_name,
        ])?;
        let body = UpdateEnvironmentBody {
            version_label: spec.version_label.as_deref(),
            template_name: spec.template_name.as_deref(),
            solution_stack_name: spec.solution_stack_name.as_deref(),
            description: spec.description.as_deref(),
            option_settings: &spec.option_settings,
        };
        let mut response = self.put(&url, &body, ResourceKind::Environment, &spec.environment_name)?;
        Ok(response.body_mut().read_json()?)
    }

    fn terminate_environment(&self, name: &str) -> Result<()> {
        let url = self.url(&["environments", name])?;
        self.delete(&url, ResourceKind::Environment, name)
    }

    fn describe_configuration_settings(
        &self,
        app: &str,
        target: SettingsTarget<'_>,
    ) -> Result<Vec<ConfigurationSettings>> {
        let mut url = self.url(&["applications", app, "settings"])?;
        let (kind, name) = match target {
            SettingsTarget::Environment(name) => {
                url.query_pairs_mut().append_pair("environment", name);
                (ResourceKind::Environment, name)
            }
            SettingsTarget::Template(name) => {
                url.query_pairs_mut().append_pair("template", name);
                (ResourceKind::Template, name)
            }
            SettingsTarget::AllTemplates => (ResourceKind::Template, app),
        };
        self.get(&url, kind, name)
    }

    fn create_configuration_template(&self, spec: &TemplateSpec) -> Result<()> {
        let url = self.url(&["applications", &spec.application_name, "templates"])?;
        let body = TemplateBody {
            template_name: &spec.template_name,
            solution_stack_name: spec.solution_stack_name.as_deref(),
            description: spec.description.as_deref(),
            option_settings: &spec.option_settings,
            tags: tag_bodies(&spec.tags),
        };
        self.post(&url, &body, ResourceKind::Template, &spec.template_name)
            .map(|_| ())
    }

    fn update_configuration_template(&self, spec: &TemplateSpec) -> Result<()> {
        let url = self.url(&[
            "applications",
            &spec.application_name,
            "templates",
            &spec.template_name,
        ])?;
        let body = TemplateBody {
            template_name: &spec.template_name,
            solution_stack_name: spec.solution_stack_name.as_deref(),
            description: spec.description.as_deref(),
            option_settings: &spec.option_settings,
            tags: Vec::new(),
        };
        self.put(&url, &body, ResourceKind::Template, &spec.template_name)
            .map(|_| ())
    }

    fn delete_configuration_template(&self, app: &str, name: &str) -> Result<()> {
        let url = self.url(&["applications", app, "templates", name])?;
        self.delete(&url, ResourceKind::Template, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_base_endpoint() {
        assert!(HttpBackend::new("mailto:ops@example.com").is_err());
        assert!(HttpBackend::new("not a url").is_err());
    }

    #[test]
    fn test_url_encodes_segments() {
        let backend = HttpBackend::new("https://control.example.com/api/").unwrap();
        let url = backend
            .url(&["applications", "Sample App", "versions", "v1/rc"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://control.example.com/api/applications/Sample%20App/versions/v1%2Frc"
        );
    }

    #[test]
    fn test_url_without_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8080").unwrap();
        let url = backend.url(&["environments", "shop-prod"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/environments/shop-prod");
    }

    #[test]
    fn test_create_environment_body_shape() {
        let mut spec = EnvironmentSpec::new("shop", "shop-worker");
        spec.tier = crate::types::TierName::Worker;
        spec.solution_stack_name = Some("64bit Amazon Linux".to_string());
        spec.tags.insert("team".to_string(), "payments".to_string());
        spec.option_settings
            .push(OptionSetting::new("aws:autoscaling:asg", "MaxSize", "4"));

        let body = CreateEnvironmentBody {
            environment_name: &spec.environment_name,
            version_label: spec.version_label.as_deref(),
            template_name: spec.template_name.as_deref(),
            solution_stack_name: spec.solution_stack_name.as_deref(),
            cname_prefix: spec.cname_prefix.as_deref(),
            description: spec.description.as_deref(),
            option_settings: &spec.option_settings,
            tags: tag_bodies(&spec.tags),
            tier: spec.tier(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["Tier"]["Name"], "Worker");
        assert_eq!(json["Tier"]["Type"], "SQS/HTTP");
        assert_eq!(json["Tier"]["Version"], "1.0");
        assert_eq!(json["Tags"][0]["Key"], "team");
        assert_eq!(json["OptionSettings"][0]["OptionName"], "MaxSize");
        assert!(json.get("TemplateName").is_none());
    }
}
