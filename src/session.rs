//! Authenticated session against the LF View API
//!
//! A [`Session`] uploads local resource graphs, downloads remote resources
//! into graphs, and manages slides, feedback and view invitations.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::files::{ArrayData, Image, ARRAY_CONTENT_TYPE, IMAGE_CONTENT_TYPE};
use crate::graph::{NodeState, ResourceGraph};
use crate::resources::{Pointer, Resource, ResourceKind};
use crate::scene::{extra_slide_validation, Feedback};
use crate::urls;
use crate::utils::{chunk_ranges, content_range, format_bytes, validate_chunk_size};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE,
};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Roles that may be granted through a view invitation
pub const VIEW_ROLES: &[&str] = &["view.editor", "view.spectator"];

/// Options for [`Session::upload`]
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Recompute a view's contents from its elements before upload
    pub update_contents: bool,
    /// PNG thumbnail for the uploaded root resource
    pub thumbnail: Option<Bytes>,
    /// Overrides the session chunk size
    pub chunk_size: Option<usize>,
    /// Overrides the session worker count; `1` uploads sequentially
    pub workers: Option<usize>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            update_contents: true,
            thumbnail: None,
            chunk_size: None,
            workers: None,
        }
    }
}

impl UploadOptions {
    pub fn with_thumbnail(mut self, png: impl Into<Bytes>) -> Self {
        self.thumbnail = Some(png.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn sequential(self) -> Self {
        self.with_workers(1)
    }

    pub fn keep_contents(mut self) -> Self {
        self.update_contents = false;
        self
    }
}

/// Options for [`Session::upload_slide`]
#[derive(Debug, Clone)]
pub struct SlideOptions {
    /// Derive a missing annotation plane from the camera
    pub autofill_plane: bool,
    pub thumbnail: Option<Bytes>,
}

impl Default for SlideOptions {
    fn default() -> Self {
        Self {
            autofill_plane: true,
            thumbnail: None,
        }
    }
}

/// Options for [`Session::download`]
#[derive(Debug, Clone, Copy)]
pub struct DownloadOptions {
    /// Follow pointers and download everything they reference
    pub recursive: bool,
    /// Detach downloads from their source; uploading them creates new resources
    pub copy: bool,
    /// Keep the URL of resources that cannot be fetched instead of failing
    pub allow_failure: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            copy: false,
            allow_failure: false,
        }
    }
}

#[derive(Debug)]
enum Target {
    Post(String),
    Patch(String),
}

/// One resource ready to send, detached from the graph
#[derive(Debug)]
struct UploadJob {
    uid: Uuid,
    label: String,
    target: Target,
    body: Value,
    payload: Option<(Bytes, &'static str)>,
    thumbnail: Option<Bytes>,
}

struct Fetched {
    uid: Uuid,
    copy: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    config: ClientConfig,
    org: String,
    project: String,
    client: Client,
}

fn build_client(config: &ClientConfig) -> Result<Client> {
    let key = config.api_key.as_deref().ok_or_else(|| {
        ClientError::Configuration("User not logged in - please set api_key".to_string())
    })?;
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("bearer {}", key))
        .map_err(|e| ClientError::Configuration(format!("Invalid api key: {}", e)))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    if let Some(source) = &config.source {
        let value = HeaderValue::from_str(source)
            .map_err(|e| ClientError::Configuration(format!("Invalid source: {}", e)))?;
        headers.insert(HeaderName::from_static("source"), value);
    }
    Ok(Client::builder().default_headers(headers).build()?)
}

async fn handle_response(response: Response) -> Result<Value> {
    let status = response.status();
    if status.is_success() {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

fn link(json: &Value, name: &str) -> Result<String> {
    json.get("links")
        .and_then(|links| links.get(name))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::MissingField(format!("links.{}", name)))
}

fn is_element_url(url: &str) -> bool {
    url.rsplit('/').nth(2) == Some("elements")
}

impl Session {
    /// Log in with an API key
    pub async fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::new(api_key).with_endpoint(endpoint)).await
    }

    /// Log in and resolve the user's organization and default project
    pub async fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        let response = client.get(urls::user_url(&config.endpoint)).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Configuration(
                "Invalid api key or endpoint".to_string(),
            ));
        }
        let user: Value = response.json().await?;
        let org = user
            .get("uid")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::MissingField("uid".to_string()))?
            .to_string();
        let session = Self {
            config,
            org,
            project: "default".to_string(),
            client,
        };
        session.validate_org_project().await?;
        info!(org = %session.org, project = %session.project, "Session started");
        Ok(session)
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Ensure the session organization and project exist
    pub async fn validate_org_project(&self) -> Result<()> {
        let url = urls::project_url(&self.config.endpoint, &self.org, &self.project);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Validation(format!(
                "Invalid org/project {}/{}",
                self.org, self.project
            )));
        }
        Ok(())
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) -> Result<()> {
        let mut config = self.config.clone().with_api_key(api_key);
        self.client = build_client(&config)?;
        std::mem::swap(&mut self.config, &mut config);
        Ok(())
    }

    /// Change or remove the `Source` header
    pub fn set_source(&mut self, source: Option<String>) -> Result<()> {
        let mut config = self.config.clone().with_source(source);
        self.client = build_client(&config)?;
        std::mem::swap(&mut self.config, &mut config);
        Ok(())
    }

    /// Create an organization and make it the session organization
    pub async fn create_org(
        &mut self,
        slug: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Value> {
        let body = json!({
            "slug": slug,
            "name": name.unwrap_or_default(),
            "description": description.unwrap_or_default(),
        });
        let response = self
            .client
            .post(urls::orgs_url(&self.config.endpoint))
            .json(&body)
            .send()
            .await?;
        let created = handle_response(response).await?;
        self.org = slug.to_string();
        Ok(created)
    }

    /// Create a project in the session organization and switch to it
    pub async fn create_project(
        &mut self,
        slug: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Value> {
        if self.org.is_empty() {
            return Err(ClientError::Validation("No org specified".to_string()));
        }
        let body = json!({
            "slug": slug,
            "name": name.unwrap_or_default(),
            "description": description.unwrap_or_default(),
        });
        let response = self
            .client
            .post(urls::org_projects_url(&self.config.endpoint, &self.org))
            .json(&body)
            .send()
            .await?;
        let created = handle_response(response).await?;
        self.project = slug.to_string();
        Ok(created)
    }

    /// Invite a user to a view by email
    ///
    /// `message` is only sent when `send_email` is set.
    pub async fn invite_to_view(
        &self,
        view_url: &str,
        email: &str,
        role: &str,
        send_email: bool,
        message: Option<&str>,
    ) -> Result<Value> {
        if self.org.is_empty() {
            return Err(ClientError::Validation("No org specified".to_string()));
        }
        if self.project.is_empty() {
            return Err(ClientError::Validation("No project specified".to_string()));
        }
        if !VIEW_ROLES.contains(&role) {
            return Err(ClientError::Validation(
                "Role must be view.editor or view.spectator".to_string(),
            ));
        }
        let mut body = json!({
            "email": email,
            "roles": [role],
            "send_email": send_email,
        });
        if send_email {
            body["message"] = json!(message);
        }
        let response = self
            .client
            .post(urls::invites_url(view_url))
            .json(&body)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Upload a resource and everything it points to
    ///
    /// Local children are uploaded first, one level of the graph at a time
    /// with up to `workers` requests in flight. Resources already on the
    /// server and untouched are reused; touched ones are patched. Returns
    /// the URL of the root resource.
    pub async fn upload(
        &self,
        graph: &mut ResourceGraph,
        uid: Uuid,
        options: UploadOptions,
    ) -> Result<String> {
        let kind = graph.require(uid)?.kind();
        if kind.is_collaboration() {
            return Err(ClientError::UnsupportedResource(format!(
                "Use upload_slide or upload_feedback for {}",
                kind
            )));
        }
        let chunk_size = options.chunk_size.unwrap_or(self.config.chunk_size);
        validate_chunk_size(chunk_size)?;
        let workers = options
            .workers
            .unwrap_or_else(|| self.config.effective_workers())
            .max(1);
        info!(resource = %graph.require(uid)?, "Starting upload");

        for node in graph.reachable(uid)? {
            if graph.get(node).is_some_and(|r| r.kind().is_data()) {
                graph.sanitize_data_colormaps(node)?;
            }
        }
        if kind == ResourceKind::View && options.update_contents {
            let contents = graph.compute_children(uid)?;
            let stale = matches!(graph.get(uid), Some(Resource::View(view)) if view.contents != contents);
            if stale {
                if let Some(Resource::View(view)) = graph.get_mut(uid) {
                    view.contents = contents;
                }
            }
        }
        graph.validate_all(uid)?;

        let levels = graph.upload_levels(uid)?;
        for level in levels {
            let mut jobs = Vec::new();
            for node in level {
                let post_url = urls::upload_url(
                    &self.config.endpoint,
                    &self.org,
                    &self.project,
                    graph.require(node)?.kind(),
                );
                let thumbnail = if node == uid {
                    options.thumbnail.clone()
                } else {
                    None
                };
                if let Some(job) = self.plan_job(graph, node, Some(post_url), thumbnail)? {
                    jobs.push(job);
                }
            }
            if jobs.is_empty() {
                continue;
            }
            debug!(count = jobs.len(), workers, "Uploading graph level");
            // Record every finished upload before reporting a failure
            let mut uploads = stream::iter(jobs)
                .map(|job| self.run_job(job, chunk_size))
                .buffer_unordered(workers);
            let mut failure = None;
            while let Some(result) = uploads.next().await {
                match result {
                    Ok((node, url)) => graph.mark_uploaded(node, &url)?,
                    Err(e) => {
                        warn!(error = %e, "Upload failed");
                        failure.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = failure {
                return Err(e);
            }
        }

        let url = graph
            .url(uid)
            .map(str::to_string)
            .ok_or_else(|| ClientError::NotUploaded(uid.to_string()))?;
        info!(%url, "Finished upload");
        Ok(url)
    }

    /// Upload a slide to a view
    ///
    /// `view_url` may be an app, project or view URL and is required unless
    /// the slide was uploaded before. The slide is checked against the
    /// view's elements before sending.
    pub async fn upload_slide(
        &self,
        graph: &mut ResourceGraph,
        uid: Uuid,
        view_url: Option<&str>,
        options: SlideOptions,
    ) -> Result<String> {
        let needs_plane = match graph.require(uid)? {
            Resource::Slide(slide) => slide.annotation_plane.is_none(),
            other => {
                return Err(ClientError::UnsupportedResource(format!(
                    "upload_slide input must be Slide, not {}",
                    other.kind()
                )))
            }
        };
        let existing = graph.url(uid).map(str::to_string);
        let view_url = match (view_url, &existing) {
            (Some(url), _) => urls::to_view_url(url)?,
            (None, Some(slide_url)) => slide_url
                .split("/slides/")
                .next()
                .unwrap_or(slide_url)
                .to_string(),
            (None, None) => {
                return Err(ClientError::Validation(
                    "view_url must be specified to upload new slides".to_string(),
                ))
            }
        };
        if options.autofill_plane && needs_plane {
            if let Some(Resource::Slide(slide)) = graph.get_mut(uid) {
                slide.autofill_annotation_plane();
            }
        }
        graph.validate(uid)?;

        let (view_graph, view) = self
            .download(
                &view_url,
                DownloadOptions {
                    recursive: false,
                    copy: true,
                    allow_failure: false,
                },
            )
            .await?;
        let element_urls: Vec<String> = match view_graph.resolve(&view)? {
            Resource::View(view) => view
                .elements
                .iter()
                .filter_map(Pointer::as_url)
                .map(str::to_string)
                .collect(),
            other => {
                return Err(ClientError::Validation(format!(
                    "{} is not a view",
                    other.kind()
                )))
            }
        };
        if let Resource::Slide(slide) = graph.require(uid)? {
            extra_slide_validation(slide, &element_urls)?;
        }

        let post_url = urls::slides_url(&view_url);
        self.upload_single(graph, uid, post_url, options.thumbnail)
            .await
    }

    /// Upload feedback to a slide
    pub async fn upload_feedback(
        &self,
        graph: &mut ResourceGraph,
        uid: Uuid,
        slide_url: Option<&str>,
    ) -> Result<String> {
        if let Some(other) = graph.get(uid).filter(|r| r.kind() != ResourceKind::Feedback) {
            return Err(ClientError::UnsupportedResource(format!(
                "upload_feedback input must be Feedback, not {}",
                other.kind()
            )));
        }
        let post_url = match slide_url {
            Some(url) if !urls::is_slide_url(url) => {
                return Err(ClientError::InvalidUrl(format!("slide_url is invalid: {}", url)))
            }
            Some(url) => urls::feedback_url(url),
            None if graph.url(uid).is_some() => String::new(),
            None => {
                return Err(ClientError::Validation(
                    "slide_url must be specified to upload new feedback".to_string(),
                ))
            }
        };
        graph.validate(uid)?;
        self.upload_single(graph, uid, post_url, None).await
    }

    /// Post a text comment on a slide
    pub async fn post_comment(&self, slide_url: &str, comment: &str) -> Result<String> {
        let mut graph = ResourceGraph::new();
        let uid = graph.insert(Feedback::new(comment));
        self.upload_feedback(&mut graph, uid, Some(slide_url)).await
    }

    async fn upload_single(
        &self,
        graph: &mut ResourceGraph,
        uid: Uuid,
        post_url: String,
        thumbnail: Option<Bytes>,
    ) -> Result<String> {
        info!(resource = %graph.require(uid)?, "Starting upload");
        if let Some(job) = self.plan_job(graph, uid, Some(post_url), thumbnail)? {
            let (node, url) = self.run_job(job, self.config.chunk_size).await?;
            graph.mark_uploaded(node, &url)?;
        }
        let url = graph
            .url(uid)
            .map(str::to_string)
            .ok_or_else(|| ClientError::NotUploaded(uid.to_string()))?;
        info!(%url, "Finished upload");
        Ok(url)
    }

    /// Decide how a node is sent, or `None` when it is already current
    fn plan_job(
        &self,
        graph: &ResourceGraph,
        uid: Uuid,
        post_url: Option<String>,
        thumbnail: Option<Bytes>,
    ) -> Result<Option<UploadJob>> {
        if graph.is_uploaded(&Pointer::Local(uid)) {
            return Ok(None);
        }
        let target = match (graph.url(uid), post_url) {
            (Some(url), _) => Target::Patch(url.to_string()),
            (None, Some(url)) if !url.is_empty() => Target::Post(url),
            _ => return Err(ClientError::NotUploaded(uid.to_string())),
        };
        let resource = graph.require(uid)?;
        let payload = match resource {
            Resource::Array(array) => {
                let data = array.array.as_ref().ok_or_else(|| {
                    ClientError::Validation("Array has no data to upload".to_string())
                })?;
                Some((Bytes::from(data.to_le_bytes()), ARRAY_CONTENT_TYPE))
            }
            Resource::Image(image) => {
                let data = image.data.clone().ok_or_else(|| {
                    ClientError::Validation("Image has no data to upload".to_string())
                })?;
                Some((data, IMAGE_CONTENT_TYPE))
            }
            _ => None,
        };
        Ok(Some(UploadJob {
            uid,
            label: resource.to_string(),
            target,
            body: graph.upload_body(uid)?,
            payload,
            thumbnail,
        }))
    }

    async fn run_job(&self, job: UploadJob, chunk_size: usize) -> Result<(Uuid, String)> {
        let request = match &job.target {
            Target::Post(url) => {
                debug!(resource = %job.label, %url, "POST");
                self.client.post(url)
            }
            Target::Patch(url) => {
                debug!(resource = %job.label, %url, "PATCH");
                self.client.patch(url)
            }
        };
        let response = request.json(&job.body).send().await?;
        let json = handle_response(response).await?;
        let self_url = link(&json, "self")?;
        if let Some((data, content_type)) = job.payload {
            let location = link(&json, "location")?;
            debug!(resource = %job.label, size = %format_bytes(data.len()), "Uploading file");
            self.upload_file(&location, data, content_type, chunk_size)
                .await?;
        }
        if let Some(png) = job.thumbnail {
            match link(&json, "thumbnail") {
                Ok(thumbnail_url) => self.upload_thumbnail(&thumbnail_url, png, chunk_size).await?,
                Err(_) => warn!(resource = %job.label, "Resource does not accept a thumbnail"),
            }
        }
        Ok((job.uid, self_url))
    }

    /// PUT binary data to `url` in chunks with `Content-Range` headers
    pub async fn upload_file(
        &self,
        url: &str,
        data: Bytes,
        content_type: &str,
        chunk_size: usize,
    ) -> Result<()> {
        let total = data.len();
        for (start, stop) in chunk_ranges(total, chunk_size) {
            let response = self
                .client
                .put(url)
                .header(CONTENT_LENGTH, (stop - start).to_string())
                .header(CONTENT_TYPE, content_type)
                .header(CONTENT_RANGE, content_range(start, stop, total))
                .body(data.slice(start..stop))
                .send()
                .await?;
            handle_response(response).await?;
        }
        Ok(())
    }

    async fn upload_thumbnail(&self, url: &str, png: Bytes, chunk_size: usize) -> Result<()> {
        let thumbnail = Image::new(png.clone());
        thumbnail.validate()?;
        let response = self.client.put(url).json(&thumbnail).send().await?;
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Thumbnail rejected");
            return Ok(());
        }
        let json = handle_response(response).await?;
        let location = link(&json, "location")?;
        self.upload_file(&location, png, IMAGE_CONTENT_TYPE, chunk_size)
            .await
    }

    /// Download a resource into a new graph
    ///
    /// Returns the graph and a pointer to the downloaded root; with
    /// `allow_failure` the pointer is the URL when the root is unavailable.
    pub async fn download(
        &self,
        url: &str,
        options: DownloadOptions,
    ) -> Result<(ResourceGraph, Pointer)> {
        let mut graph = ResourceGraph::new();
        let root = self.download_into(&mut graph, url, options).await?;
        Ok((graph, root))
    }

    /// Download a resource, and with `recursive` everything it points to
    pub async fn download_into(
        &self,
        graph: &mut ResourceGraph,
        url: &str,
        options: DownloadOptions,
    ) -> Result<Pointer> {
        info!(%url, "Starting download");
        let root = match self
            .fetch(graph, url, options.copy, options.allow_failure)
            .await?
        {
            Some(fetched) => fetched,
            None => return Ok(Pointer::Url(url.to_string())),
        };
        let root_kind = graph.require(root.uid)?.kind();
        if !options.recursive || root_kind.is_collaboration() {
            return Ok(Pointer::Local(root.uid));
        }

        let mut lookup: HashMap<String, Uuid> = HashMap::new();
        lookup.insert(url.to_string(), root.uid);
        let mut failed: HashSet<String> = HashSet::new();
        let mut downloaded = vec![root.uid];
        let mut queue = vec![root.uid];
        while let Some(node) = queue.pop() {
            let pending: Vec<String> = graph
                .require(node)?
                .pointers()
                .into_iter()
                .filter_map(Pointer::as_url)
                .filter(|child| !lookup.contains_key(*child) && !failed.contains(*child))
                .map(str::to_string)
                .collect();
            for child_url in pending {
                if lookup.contains_key(&child_url) {
                    continue;
                }
                match self
                    .fetch(graph, &child_url, root.copy, options.allow_failure)
                    .await?
                {
                    Some(child) => {
                        lookup.insert(child_url, child.uid);
                        downloaded.push(child.uid);
                        queue.push(child.uid);
                    }
                    None => {
                        warn!(url = %child_url, "Keeping URL of unavailable resource");
                        failed.insert(child_url);
                    }
                }
            }
        }
        for node in downloaded {
            graph.link_urls(node, &lookup)?;
        }
        info!(%url, resources = lookup.len(), "Finished download");
        Ok(Pointer::Local(root.uid))
    }

    /// Fetch one resource and its binary data into the graph
    async fn fetch(
        &self,
        graph: &mut ResourceGraph,
        url: &str,
        copy: bool,
        allow_failure: bool,
    ) -> Result<Option<Fetched>> {
        let mut url = url.to_string();
        let mut copy = copy;
        let mut found = None;
        if let Some(location) = urls::match_app_url(&url) {
            let project_url = location.project_url();
            let response = self.client.get(&project_url).send().await?;
            if response.status().is_success() {
                url = project_url;
                found = Some(response);
            } else {
                info!("You do not own View; attempting to download a copy");
                copy = true;
                url = location.view_url();
            }
        }
        let response = match found {
            Some(response) => response,
            None => self.client.get(&url).send().await?,
        };
        if !response.status().is_success() {
            if allow_failure {
                return Ok(None);
            }
            return Err(ClientError::Api {
                status: response.status().as_u16(),
                body: format!("Unable to download {}", url),
            });
        }
        let json: Value = response.json().await?;
        let kind = match json.get("type").and_then(Value::as_str) {
            Some(type_field) => ResourceKind::from_type_field(type_field)?,
            None => urls::kind_from_url(&url)?,
        };
        debug!(%url, %kind, "Downloaded");
        let mut resource = Resource::from_json(kind, json.clone())?;

        if let Resource::View(view) = &mut resource {
            if json.get("elements").is_none() {
                view.elements = view
                    .contents
                    .iter()
                    .filter(|p| p.as_url().is_some_and(is_element_url))
                    .cloned()
                    .collect();
            }
        }

        if kind.is_file() {
            let location = link(&json, "location")?;
            let file_response = self.client.get(&location).send().await?;
            let status = file_response.status();
            if !status.is_success() {
                let body = file_response.text().await.unwrap_or_default();
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    body,
                });
            }
            let data = file_response.bytes().await?;
            match &mut resource {
                Resource::Array(array) => {
                    array.array = Some(ArrayData::from_le_bytes(array.dtype, &data)?);
                    array.validate()?;
                }
                Resource::Image(image) => image.data = Some(data),
                other => {
                    return Err(ClientError::UnsupportedResource(format!(
                        "Unknown file resource: {}",
                        other.kind()
                    )))
                }
            }
        }

        let state = if copy {
            NodeState::default()
        } else {
            NodeState {
                url: Some(url),
                touched: false,
            }
        };
        let uid = graph.insert_with_state(resource, state);
        Ok(Some(Fetched { uid, copy }))
    }

    pub async fn delete(&self, url: &str) -> Result<()> {
        let response = self.client.delete(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Api {
                status: response.status().as_u16(),
                body: format!("Failed to delete: {}", url),
            });
        }
        info!(%url, "Deleted");
        Ok(())
    }

    /// Delete the server copy of a graph node; the local node is kept
    pub async fn delete_resource(&self, graph: &mut ResourceGraph, uid: Uuid) -> Result<()> {
        let url = graph
            .url(uid)
            .map(str::to_string)
            .ok_or_else(|| ClientError::NotUploaded(uid.to_string()))?;
        self.delete(&url).await?;
        graph.forget_url(uid);
        Ok(())
    }
}
