//! LF View URL templates and matchers
//!
//! Views are reachable through three URL forms: the web app URL, the
//! project-service URL and the view-service URL. Matchers here recognise
//! each form and convert between them.

use crate::error::{ClientError, Result};
use crate::resources::ResourceKind;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Default API host
pub const DEFAULT_ENDPOINT: &str = "https://lfview.com";

const SEGMENT: &str = "[a-z0-9]+";

/// Current user endpoint, used to check an API key
pub fn user_url(endpoint: &str) -> String {
    format!("{}/api/v1/user", endpoint)
}

/// Organisation collection endpoint
pub fn orgs_url(endpoint: &str) -> String {
    format!("{}/api/v1/orgs", endpoint)
}

/// Project collection of an organisation
pub fn org_projects_url(endpoint: &str, org: &str) -> String {
    format!("{}/api/v1/orgs/{}/projects", endpoint, org)
}

/// Base URL of a project's resources
pub fn project_url(endpoint: &str, org: &str, project: &str) -> String {
    format!("{}/api/v1/project/{}/{}", endpoint, org, project)
}

/// POST target for creating a resource of `kind` in a project
pub fn upload_url(endpoint: &str, org: &str, project: &str, kind: ResourceKind) -> String {
    format!("{}/{}", project_url(endpoint, org, project), kind.upload_path())
}

/// Invite endpoint of a view
pub fn invites_url(view_url: &str) -> String {
    format!("{}/invites", view_url)
}

/// Slide collection of a view
pub fn slides_url(view_url: &str) -> String {
    format!("{}/slides", view_url)
}

/// Feedback collection of a slide
pub fn feedback_url(slide_url: &str) -> String {
    format!("{}/feedback", slide_url)
}

/// Organisation, project and view ids parsed from a view URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLocation {
    pub base: String,
    pub org: String,
    pub project: String,
    pub view: String,
}

impl ViewLocation {
    fn from_captures(captures: Captures<'_>) -> Self {
        let group = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };
        Self {
            base: group("base"),
            org: group("org"),
            project: group("proj"),
            view: group("view"),
        }
    }

    /// Web app form
    pub fn app_url(&self) -> String {
        format!("{}/app/{}/{}/{}", self.base, self.org, self.project, self.view)
    }

    /// Project-service form
    pub fn project_url(&self) -> String {
        format!(
            "{}/api/v1/project/{}/{}/views/{}",
            self.base, self.org, self.project, self.view
        )
    }

    /// View-service form
    pub fn view_url(&self) -> String {
        format!(
            "{}/api/v1/view/{}/{}/{}",
            self.base, self.org, self.project, self.view
        )
    }
}

macro_rules! lazy_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new(&$pattern).expect("static URL pattern"))
        }
    };
}

lazy_regex!(
    app_re,
    format!(
        r"^(?P<base>.+)/app/(?P<org>{s})/(?P<proj>{s})/(?P<view>{s})$",
        s = SEGMENT
    )
);
lazy_regex!(
    project_re,
    format!(
        r"^(?P<base>.+)/api/v1/project/(?P<org>{s})/(?P<proj>{s})/views/(?P<view>{s})$",
        s = SEGMENT
    )
);
lazy_regex!(
    view_re,
    format!(
        r"^(?P<base>.+)/api/v1/view/(?P<org>{s})/(?P<proj>{s})/(?P<view>{s})$",
        s = SEGMENT
    )
);
lazy_regex!(
    slide_re,
    format!(r"^.+/api/v1/view/{s}/{s}/{s}/slides/{s}$", s = SEGMENT)
);
lazy_regex!(
    feedback_re,
    format!(
        r"^.+/api/v1/view/{s}/{s}/{s}/slides/{s}/feedback/{s}$",
        s = SEGMENT
    )
);
lazy_regex!(
    resource_re,
    format!(
        r"^.+/api/v1/(view/{s}|project)/{s}/{s}/(?P<basetype>[a-z]+)/(?P<subtype>[a-z]+)/{s}$",
        s = SEGMENT
    )
);

/// Match a web app URL, e.g. `https://example.com/app/org/proj/view`
pub fn match_app_url(url: &str) -> Option<ViewLocation> {
    app_re().captures(url).map(ViewLocation::from_captures)
}

/// Match a project-service view URL
pub fn match_project_url(url: &str) -> Option<ViewLocation> {
    project_re().captures(url).map(ViewLocation::from_captures)
}

/// Match a view-service view URL
pub fn match_view_url(url: &str) -> Option<ViewLocation> {
    view_re().captures(url).map(ViewLocation::from_captures)
}

/// Whether `url` addresses a single slide
pub fn is_slide_url(url: &str) -> bool {
    slide_re().is_match(url)
}

/// Whether `url` addresses a single feedback item
pub fn is_feedback_url(url: &str) -> bool {
    feedback_re().is_match(url)
}

/// Rewrite a web app URL as a project-service view URL
pub fn convert_app_to_project(url: &str) -> Result<String> {
    match_app_url(url)
        .map(|loc| loc.project_url())
        .ok_or_else(|| ClientError::InvalidUrl(format!("Invalid app url: {}", url)))
}

/// Rewrite a project-service view URL as a view-service URL
pub fn convert_project_to_view(url: &str) -> Result<String> {
    match_project_url(url)
        .map(|loc| loc.view_url())
        .ok_or_else(|| ClientError::InvalidUrl(format!("Invalid project url: {}", url)))
}

/// Normalise any of the three view URL forms to a view-service URL
pub fn to_view_url(url: &str) -> Result<String> {
    if let Some(loc) = match_app_url(url)
        .or_else(|| match_project_url(url))
        .or_else(|| match_view_url(url))
    {
        return Ok(loc.view_url());
    }
    Err(ClientError::InvalidUrl(format!("Invalid view url: {}", url)))
}

/// API base type and sub type addressed by a URL
pub fn types_from_url(url: &str) -> Result<(String, Option<String>)> {
    if is_slide_url(url) {
        return Ok(("slides".to_string(), None));
    }
    if is_feedback_url(url) {
        return Ok(("feedback".to_string(), None));
    }
    if app_re().is_match(url) || project_re().is_match(url) || view_re().is_match(url) {
        return Ok(("views".to_string(), None));
    }
    let captures = resource_re().captures(url).ok_or_else(|| {
        ClientError::UnknownResourceType(format!("Unknown resource type from {}", url))
    })?;
    Ok((
        captures["basetype"].to_string(),
        Some(captures["subtype"].to_string()),
    ))
}

/// Resource kind addressed by a URL
pub fn kind_from_url(url: &str) -> Result<ResourceKind> {
    let (base, sub) = types_from_url(url)?;
    ResourceKind::from_types(&base, sub.as_deref())
}

/// Check that a configured endpoint is an absolute http(s) URL
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    let parsed = url::Url::parse(endpoint)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ClientError::InvalidUrl(format!(
            "Endpoint must use http or https, found {}",
            other
        ))),
    }
}
