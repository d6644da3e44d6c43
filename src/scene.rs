//! Slides, scenes and feedback
//!
//! A slide captures one camera position and the per-element plot state of
//! a view. Only the parts the client needs to inspect are typed; anything
//! else the API sends is carried through untouched.

use crate::error::{ClientError, Result};
use crate::resources::Pointer;
use crate::types::Vector3;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Plane used to place annotations on a slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingPlane {
    pub origin: Vector3,
    pub axis_u: Vector3,
    pub axis_v: Vector3,
}

impl DrawingPlane {
    pub fn validate(&self) -> Result<()> {
        let finite = self
            .origin
            .iter()
            .chain(&self.axis_u)
            .chain(&self.axis_v)
            .all(|v| v.is_finite());
        if !finite {
            return Err(ClientError::Validation(
                "Drawing plane values must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_mode() -> String {
    "perspective".to_string()
}

fn default_up() -> Vector3 {
    [0.0, 0.0, 1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    #[serde(default = "default_mode")]
    pub mode: String,
    pub target: Vector3,
    pub radius: f64,
    pub zoom: f64,
    /// Quaternion `[i, j, k, r]`
    pub rotation: [f64; 4],
    #[serde(default = "default_up")]
    pub up_direction: Vector3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            target: [0.0; 3],
            radius: 1.0,
            zoom: 1.0,
            rotation: [0.0; 4],
            up_direction: default_up(),
        }
    }
}

impl Camera {
    pub fn validate(&self) -> Result<()> {
        if !(self.radius > 0.0) || !(self.zoom > 0.0) {
            return Err(ClientError::Validation(
                "Camera radius and zoom must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Data or mapping driving one visual attribute of a plotted element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Pointer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Pointer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureView {
    pub data: Pointer,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Display state of one element in a plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotView {
    pub element: Pointer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ViewAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<ViewAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<ViewAttribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<TextureView>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlotView {
    pub fn new(element: impl Into<Pointer>) -> Self {
        Self {
            element: element.into(),
            color: None,
            opacity: None,
            radius: None,
            textures: Vec::new(),
            extra: Map::new(),
        }
    }

    fn attributes(&self) -> impl Iterator<Item = &ViewAttribute> {
        [&self.color, &self.opacity, &self.radius]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plot {
    #[serde(default)]
    pub views: Vec<PlotView>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub plots: Vec<Plot>,
    #[serde(default)]
    pub lights: Vec<Value>,
    pub camera: Camera,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            plots: vec![Plot::default()],
            lights: Vec::new(),
            camera: Camera::default(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scene: Scene,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_plane: Option<DrawingPlane>,
    #[serde(default)]
    pub annotations: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Slide {
    pub fn new(scene: Scene) -> Self {
        Self {
            name: None,
            description: None,
            scene,
            annotation_plane: None,
            annotations: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Views of the first plot, the only one the web app renders
    pub fn plot_views(&self) -> &[PlotView] {
        self.scene
            .plots
            .first()
            .map(|plot| plot.views.as_slice())
            .unwrap_or(&[])
    }

    /// Fill a missing annotation plane from the camera
    pub fn autofill_annotation_plane(&mut self) {
        if self.annotation_plane.is_none() {
            self.annotation_plane = Some(drawing_plane_from_camera(&self.scene.camera));
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.scene.camera.validate()?;
        if let Some(plane) = &self.annotation_plane {
            plane.validate()?;
        }
        Ok(())
    }
}

/// Comment left on a slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub comment: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feedback {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            extra: Map::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.comment.trim().is_empty() {
            return Err(ClientError::Validation(
                "Feedback comment must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Estimate a drawing plane facing the camera
///
/// The plane spans `radius / zoom` along each axis and is centred on the
/// camera target. It approximates, but does not reproduce, the plane the
/// web app computes.
pub fn drawing_plane_from_camera(camera: &Camera) -> DrawingPlane {
    let [qi, qj, qk, qr] = camera.rotation;
    let s = if camera.rotation.iter().all(|q| *q == 0.0) {
        1.0
    } else {
        1.0 / (qi * qi + qj * qj + qk * qk + qr * qr).sqrt()
    };
    let length = camera.radius / camera.zoom;
    let rotate = |axis: Vector3| -> Vector3 {
        [
            (1.0 - 2.0 * s * (qj * qj + qk * qk)) * axis[0]
                + 2.0 * s * (qi * qj - qk * qr) * axis[1]
                + 2.0 * s * (qi * qk + qj * qr) * axis[2],
            2.0 * s * (qi * qj + qk * qr) * axis[0]
                + (1.0 - 2.0 * s * (qi * qi + qk * qk)) * axis[1]
                + 2.0 * s * (qj * qk - qi * qr) * axis[2],
            2.0 * s * (qi * qk - qj * qr) * axis[0]
                + 2.0 * s * (qj * qk + qi * qr) * axis[1]
                + (1.0 - 2.0 * s * (qi * qi + qj * qj)) * axis[2],
        ]
    };
    let axis_u = rotate([length, 0.0, 0.0]);
    let axis_v = rotate([0.0, length, 0.0]);
    let origin = [0, 1, 2].map(|i| camera.target[i] - axis_u[i] / 2.0 - axis_v[i] / 2.0);
    DrawingPlane {
        origin,
        axis_u,
        axis_v,
    }
}

fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Checks the web app applies when loading a slide
///
/// Every element, data and texture reference in the plot views must be a
/// URL, and the plotted elements must be exactly the view's elements.
pub fn extra_slide_validation(slide: &Slide, element_urls: &[String]) -> Result<()> {
    let views = slide.plot_views();
    let mut plotted = HashSet::new();
    for view in views {
        let url = view.element.as_url().ok_or_else(|| {
            ClientError::Validation("Elements specified in plot views must be URL strings".to_string())
        })?;
        plotted.insert(last_segment(url));
    }
    let expected: HashSet<&str> = element_urls.iter().map(|url| last_segment(url)).collect();
    if plotted != expected {
        return Err(ClientError::Validation(
            "All Elements in the View must be placed in the plot; to hide the Element set visible=False"
                .to_string(),
        ));
    }
    for view in views {
        if view
            .attributes()
            .any(|attr| matches!(attr.data, Some(Pointer::Local(_))))
        {
            return Err(ClientError::Validation(
                "Data specified in plot views must be URL strings".to_string(),
            ));
        }
        if view.textures.iter().any(|tex| tex.data.as_local().is_some()) {
            return Err(ClientError::Validation(
                "Texture data specified in plot views must be URL strings".to_string(),
            ));
        }
    }
    Ok(())
}
