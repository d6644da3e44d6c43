//! Typed LF View resources and the pointers linking them
//!
//! Resources mirror the JSON documents served by the API. Any field that
//! refers to another resource is a [`Pointer`]: either the URL of a remote
//! resource or the id of a resource held in a
//! [`ResourceGraph`](crate::graph::ResourceGraph).

use crate::error::{ClientError, Result};
use crate::files::{Array, Image};
use crate::scene::{Feedback, Slide};
use crate::types::{Color, DataLocation, Vector3};
use crate::utils::linspace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Reference from one resource to another
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pointer {
    /// API URL of a remote resource
    Url(String),
    /// Resource stored in the local graph
    Local(Uuid),
}

impl Pointer {
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Pointer::Url(url) => Some(url),
            Pointer::Local(_) => None,
        }
    }

    pub fn as_local(&self) -> Option<Uuid> {
        match self {
            Pointer::Url(_) => None,
            Pointer::Local(uid) => Some(*uid),
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::Url(url) => f.write_str(url),
            Pointer::Local(uid) => write!(f, "local:{}", uid),
        }
    }
}

impl From<&str> for Pointer {
    fn from(url: &str) -> Self {
        Pointer::Url(url.to_string())
    }
}

impl From<String> for Pointer {
    fn from(url: String) -> Self {
        Pointer::Url(url)
    }
}

impl From<Uuid> for Pointer {
    fn from(uid: Uuid) -> Self {
        Pointer::Local(uid)
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Pointer::Url(url) => serializer.serialize_str(url),
            Pointer::Local(uid) => Err(serde::ser::Error::custom(format!(
                "unresolved pointer to local resource {}",
                uid
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Pointer::Url)
    }
}

/// API resource type, addressed as `{base_type}/{sub_type}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Array,
    Image,
    DataBasic,
    DataCategory,
    MappingContinuous,
    MappingDiscrete,
    MappingCategory,
    TextureProjection,
    PointSet,
    LineSet,
    Surface,
    SurfaceGrid,
    VolumeGrid,
    View,
    Slide,
    Feedback,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 16] = [
        ResourceKind::Array,
        ResourceKind::Image,
        ResourceKind::DataBasic,
        ResourceKind::DataCategory,
        ResourceKind::MappingContinuous,
        ResourceKind::MappingDiscrete,
        ResourceKind::MappingCategory,
        ResourceKind::TextureProjection,
        ResourceKind::PointSet,
        ResourceKind::LineSet,
        ResourceKind::Surface,
        ResourceKind::SurfaceGrid,
        ResourceKind::VolumeGrid,
        ResourceKind::View,
        ResourceKind::Slide,
        ResourceKind::Feedback,
    ];

    pub fn base_type(&self) -> &'static str {
        match self {
            ResourceKind::Array | ResourceKind::Image => "files",
            ResourceKind::DataBasic | ResourceKind::DataCategory => "data",
            ResourceKind::MappingContinuous
            | ResourceKind::MappingDiscrete
            | ResourceKind::MappingCategory => "mappings",
            ResourceKind::TextureProjection => "textures",
            ResourceKind::PointSet
            | ResourceKind::LineSet
            | ResourceKind::Surface
            | ResourceKind::SurfaceGrid
            | ResourceKind::VolumeGrid => "elements",
            ResourceKind::View => "views",
            ResourceKind::Slide => "slides",
            ResourceKind::Feedback => "feedback",
        }
    }

    pub fn sub_type(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Array => Some("array"),
            ResourceKind::Image => Some("image"),
            ResourceKind::DataBasic => Some("basic"),
            ResourceKind::DataCategory => Some("category"),
            ResourceKind::MappingContinuous => Some("continuous"),
            ResourceKind::MappingDiscrete => Some("discrete"),
            ResourceKind::MappingCategory => Some("category"),
            ResourceKind::TextureProjection => Some("projection"),
            ResourceKind::PointSet => Some("pointset"),
            ResourceKind::LineSet => Some("lineset"),
            ResourceKind::Surface => Some("surface"),
            ResourceKind::SurfaceGrid => Some("surfacegrid"),
            ResourceKind::VolumeGrid => Some("volumegrid"),
            ResourceKind::View | ResourceKind::Slide | ResourceKind::Feedback => None,
        }
    }

    /// Find the kind matching an API base type and optional sub type
    pub fn from_types(base_type: &str, sub_type: Option<&str>) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.base_type() == base_type && kind.sub_type() == sub_type)
            .ok_or_else(|| {
                ClientError::UnknownResourceType(match sub_type {
                    Some(sub) => format!("{}/{}", base_type, sub),
                    None => base_type.to_string(),
                })
            })
    }

    /// Parse the `type` field of an API response, e.g. `elements/pointset`
    pub fn from_type_field(type_field: &str) -> Result<Self> {
        match type_field.split_once('/') {
            Some((base, sub)) => Self::from_types(base, Some(sub)),
            None => Self::from_types(type_field, None),
        }
    }

    /// Path fragment appended to the project URL when creating a resource
    pub fn upload_path(&self) -> String {
        match self.sub_type() {
            Some(sub) => format!("{}/{}", self.base_type(), sub),
            None => self.base_type().to_string(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, ResourceKind::Array | ResourceKind::Image)
    }

    pub fn is_element(&self) -> bool {
        self.base_type() == "elements"
    }

    pub fn is_data(&self) -> bool {
        matches!(self, ResourceKind::DataBasic | ResourceKind::DataCategory)
    }

    /// Slides and feedback have their own upload entry points
    pub fn is_collaboration(&self) -> bool {
        matches!(self, ResourceKind::Slide | ResourceKind::Feedback)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.upload_path())
    }
}

/// Value of a discrete or category mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingValue {
    Color(Color),
    Number(f64),
    Text(String),
}

impl MappingValue {
    pub fn is_color(&self) -> bool {
        matches!(self, MappingValue::Color(_))
    }
}

impl From<Color> for MappingValue {
    fn from(color: Color) -> Self {
        MappingValue::Color(color)
    }
}

impl From<f64> for MappingValue {
    fn from(value: f64) -> Self {
        MappingValue::Number(value)
    }
}

impl From<&str> for MappingValue {
    fn from(value: &str) -> Self {
        MappingValue::Text(value.to_string())
    }
}

/// Scalar data with optional mappings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBasic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub location: DataLocation,
    pub array: Pointer,
    #[serde(default)]
    pub mappings: Vec<Pointer>,
}

impl DataBasic {
    pub fn new(location: DataLocation, array: impl Into<Pointer>) -> Self {
        Self {
            name: None,
            description: None,
            location,
            array: array.into(),
            mappings: Vec::new(),
        }
    }
}

/// Integer category data indexing into a category mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub location: DataLocation,
    pub array: Pointer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Pointer>,
    #[serde(default)]
    pub mappings: Vec<Pointer>,
}

impl DataCategory {
    pub fn new(location: DataLocation, array: impl Into<Pointer>) -> Self {
        Self {
            name: None,
            description: None,
            location,
            array: array.into(),
            categories: None,
            mappings: Vec::new(),
        }
    }
}

/// Continuous mapping of data values onto a color gradient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingContinuous {
    /// Gradient array of RGB rows
    pub gradient: Pointer,
    pub data_controls: Vec<f64>,
    #[serde(default)]
    pub gradient_controls: Vec<f64>,
    #[serde(default)]
    pub visibility: Vec<bool>,
    #[serde(default)]
    pub interpolate: bool,
}

impl MappingContinuous {
    /// Build a mapping with the viewer's default gradient controls
    ///
    /// Four data controls clamp the gradient at both ends and hide values
    /// outside the outer controls; two controls stretch the gradient across
    /// the range with everything visible.
    pub fn new(gradient: impl Into<Pointer>, data_controls: Vec<f64>) -> Self {
        let count = data_controls.len();
        let (gradient_controls, visibility) = match count {
            4 => (
                vec![0.0, 0.0, 1.0, 1.0],
                vec![false, true, true, true, false],
            ),
            0 => (Vec::new(), Vec::new()),
            1 => (vec![0.0], vec![true, true]),
            _ => (linspace(0.0, 1.0, count), vec![true; count + 1]),
        };
        Self {
            gradient: gradient.into(),
            data_controls,
            gradient_controls,
            visibility,
            interpolate: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_controls.is_empty() {
            return Err(ClientError::Validation(
                "Continuous mapping needs data controls".to_string(),
            ));
        }
        if self.gradient_controls.len() != self.data_controls.len() {
            return Err(ClientError::Validation(format!(
                "{} gradient controls for {} data controls",
                self.gradient_controls.len(),
                self.data_controls.len()
            )));
        }
        if self.visibility.len() != self.data_controls.len() + 1 {
            return Err(ClientError::Validation(
                "Continuous mapping visibility needs one more entry than data controls"
                    .to_string(),
            ));
        }
        if self.data_controls.windows(2).any(|w| w[0] > w[1]) {
            return Err(ClientError::Validation(
                "Data controls must be non-decreasing".to_string(),
            ));
        }
        if self
            .gradient_controls
            .iter()
            .any(|g| !(0.0..=1.0).contains(g))
        {
            return Err(ClientError::Validation(
                "Gradient controls must lie in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mapping of data ranges to discrete values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDiscrete {
    pub values: Vec<MappingValue>,
    pub end_points: Vec<f64>,
    #[serde(default)]
    pub end_inclusive: Vec<bool>,
    #[serde(default)]
    pub visibility: Vec<bool>,
}

impl MappingDiscrete {
    /// Ranges split at `end_points`, all visible and end-inclusive
    pub fn new(values: Vec<MappingValue>, end_points: Vec<f64>) -> Self {
        Self {
            visibility: vec![true; values.len()],
            end_inclusive: vec![true; end_points.len()],
            values,
            end_points,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.values.len() != self.end_points.len() + 1 {
            return Err(ClientError::Validation(
                "Discrete mapping needs one more value than end points".to_string(),
            ));
        }
        if self.end_inclusive.len() != self.end_points.len() {
            return Err(ClientError::Validation(
                "Discrete mapping end_inclusive must match end points".to_string(),
            ));
        }
        if self.visibility.len() != self.values.len() {
            return Err(ClientError::Validation(
                "Discrete mapping visibility must match values".to_string(),
            ));
        }
        if self.end_points.windows(2).any(|w| w[0] > w[1]) {
            return Err(ClientError::Validation(
                "End points must be non-decreasing".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mapping of category indices to values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingCategory {
    pub values: Vec<MappingValue>,
    pub indices: Vec<i64>,
    #[serde(default)]
    pub visibility: Vec<bool>,
}

impl MappingCategory {
    /// Categories indexed `0..n`, all visible
    pub fn new(values: Vec<MappingValue>) -> Self {
        let count = values.len();
        Self {
            values,
            indices: (0..count as i64).collect(),
            visibility: vec![true; count],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.indices.len() != self.values.len() || self.visibility.len() != self.values.len() {
            return Err(ClientError::Validation(
                "Category mapping values, indices and visibility must have equal length"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Image projected onto an element along a plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureProjection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub origin: Vector3,
    pub axis_u: Vector3,
    pub axis_v: Vector3,
    pub image: Pointer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorOption {
    pub value: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpacityOption {
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireframeOption {
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiusOption {
    pub value: f64,
}

fn default_visible() -> bool {
    true
}

/// Default display options of an element
///
/// Line sets with a radius are drawn as tubes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementOptions {
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<OpacityOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wireframe: Option<WireframeOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<RadiusOption>,
}

impl Default for ElementOptions {
    fn default() -> Self {
        Self {
            visible: true,
            color: None,
            opacity: None,
            wireframe: None,
            radius: None,
        }
    }
}

impl ElementOptions {
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(ColorOption { value: color });
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(OpacityOption { value: opacity });
        self
    }

    pub fn with_wireframe(mut self, active: bool) -> Self {
        self.wireframe = Some(WireframeOption { active });
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(RadiusOption { value: radius });
        self
    }

    pub fn color(&self) -> Option<Color> {
        self.color.as_ref().map(|c| c.value)
    }

    fn validate(&self) -> Result<()> {
        if let Some(opacity) = &self.opacity {
            if !(0.0..=1.0).contains(&opacity.value) {
                return Err(ClientError::Validation(format!(
                    "Opacity {} outside [0, 1]",
                    opacity.value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementPointSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub vertices: Pointer,
    #[serde(default)]
    pub data: Vec<Pointer>,
    #[serde(default)]
    pub defaults: ElementOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementLineSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub vertices: Pointer,
    pub segments: Pointer,
    #[serde(default)]
    pub data: Vec<Pointer>,
    #[serde(default)]
    pub defaults: ElementOptions,
}

impl ElementLineSet {
    /// Whether the line set renders as tubes rather than lines
    pub fn is_tubes(&self) -> bool {
        self.defaults.radius.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSurface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub vertices: Pointer,
    pub triangles: Pointer,
    #[serde(default)]
    pub data: Vec<Pointer>,
    #[serde(default)]
    pub defaults: ElementOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSurfaceGrid {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tensor_u: Vec<f64>,
    pub tensor_v: Vec<f64>,
    pub axis_u: Vector3,
    pub axis_v: Vector3,
    pub origin: Vector3,
    /// Per-node heights along the grid normal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_w: Option<Pointer>,
    #[serde(default)]
    pub data: Vec<Pointer>,
    #[serde(default)]
    pub defaults: ElementOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementVolumeGrid {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tensor_u: Vec<f64>,
    pub tensor_v: Vec<f64>,
    pub tensor_w: Vec<f64>,
    pub axis_u: Vector3,
    pub axis_v: Vector3,
    pub axis_w: Vector3,
    pub origin: Vector3,
    #[serde(default)]
    pub data: Vec<Pointer>,
    #[serde(default)]
    pub defaults: ElementOptions,
}

fn validate_tensor(name: &str, tensor: &[f64]) -> Result<()> {
    if tensor.is_empty() || tensor.iter().any(|t| !(*t > 0.0)) {
        return Err(ClientError::Validation(format!(
            "{} must be a non-empty list of positive spacings",
            name
        )));
    }
    Ok(())
}

fn validate_axis(name: &str, axis: &Vector3) -> Result<()> {
    if axis.iter().all(|v| *v == 0.0) {
        return Err(ClientError::Validation(format!("{} must be non-zero", name)));
    }
    Ok(())
}

/// Collection of elements shown together in the web app
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct View {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub elements: Vec<Pointer>,
    /// Every resource the view depends on, elements included
    #[serde(default)]
    pub contents: Vec<Pointer>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Any resource that can live in a [`ResourceGraph`](crate::graph::ResourceGraph)
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Array(Array),
    Image(Image),
    DataBasic(DataBasic),
    DataCategory(DataCategory),
    MappingContinuous(MappingContinuous),
    MappingDiscrete(MappingDiscrete),
    MappingCategory(MappingCategory),
    TextureProjection(TextureProjection),
    PointSet(ElementPointSet),
    LineSet(ElementLineSet),
    Surface(ElementSurface),
    SurfaceGrid(ElementSurfaceGrid),
    VolumeGrid(ElementVolumeGrid),
    View(View),
    Slide(Slide),
    Feedback(Feedback),
}

macro_rules! dispatch {
    ($resource:expr, $inner:ident => $body:expr) => {
        match $resource {
            Resource::Array($inner) => $body,
            Resource::Image($inner) => $body,
            Resource::DataBasic($inner) => $body,
            Resource::DataCategory($inner) => $body,
            Resource::MappingContinuous($inner) => $body,
            Resource::MappingDiscrete($inner) => $body,
            Resource::MappingCategory($inner) => $body,
            Resource::TextureProjection($inner) => $body,
            Resource::PointSet($inner) => $body,
            Resource::LineSet($inner) => $body,
            Resource::Surface($inner) => $body,
            Resource::SurfaceGrid($inner) => $body,
            Resource::VolumeGrid($inner) => $body,
            Resource::View($inner) => $body,
            Resource::Slide($inner) => $body,
            Resource::Feedback($inner) => $body,
        }
    };
}

fn parse<T: DeserializeOwned>(json: serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(json)?)
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Array(_) => ResourceKind::Array,
            Resource::Image(_) => ResourceKind::Image,
            Resource::DataBasic(_) => ResourceKind::DataBasic,
            Resource::DataCategory(_) => ResourceKind::DataCategory,
            Resource::MappingContinuous(_) => ResourceKind::MappingContinuous,
            Resource::MappingDiscrete(_) => ResourceKind::MappingDiscrete,
            Resource::MappingCategory(_) => ResourceKind::MappingCategory,
            Resource::TextureProjection(_) => ResourceKind::TextureProjection,
            Resource::PointSet(_) => ResourceKind::PointSet,
            Resource::LineSet(_) => ResourceKind::LineSet,
            Resource::Surface(_) => ResourceKind::Surface,
            Resource::SurfaceGrid(_) => ResourceKind::SurfaceGrid,
            Resource::VolumeGrid(_) => ResourceKind::VolumeGrid,
            Resource::View(_) => ResourceKind::View,
            Resource::Slide(_) => ResourceKind::Slide,
            Resource::Feedback(_) => ResourceKind::Feedback,
        }
    }

    /// Pointer fields, ordered by field name
    pub fn pointers(&self) -> Vec<&Pointer> {
        match self {
            Resource::DataBasic(d) => std::iter::once(&d.array).chain(&d.mappings).collect(),
            Resource::DataCategory(d) => std::iter::once(&d.array)
                .chain(d.categories.as_ref())
                .chain(&d.mappings)
                .collect(),
            Resource::MappingContinuous(m) => vec![&m.gradient],
            Resource::TextureProjection(t) => vec![&t.image],
            Resource::PointSet(e) => e.data.iter().chain(std::iter::once(&e.vertices)).collect(),
            Resource::LineSet(e) => e
                .data
                .iter()
                .chain([&e.segments, &e.vertices])
                .collect(),
            Resource::Surface(e) => e
                .data
                .iter()
                .chain([&e.triangles, &e.vertices])
                .collect(),
            Resource::SurfaceGrid(e) => e.data.iter().chain(e.offset_w.as_ref()).collect(),
            Resource::VolumeGrid(e) => e.data.iter().collect(),
            Resource::View(v) => v.contents.iter().chain(&v.elements).collect(),
            Resource::Array(_)
            | Resource::Image(_)
            | Resource::MappingDiscrete(_)
            | Resource::MappingCategory(_)
            | Resource::Slide(_)
            | Resource::Feedback(_) => Vec::new(),
        }
    }

    /// Mutable pointer fields, in the same order as [`Resource::pointers`]
    pub fn pointers_mut(&mut self) -> Vec<&mut Pointer> {
        match self {
            Resource::DataBasic(d) => std::iter::once(&mut d.array)
                .chain(&mut d.mappings)
                .collect(),
            Resource::DataCategory(d) => std::iter::once(&mut d.array)
                .chain(d.categories.as_mut())
                .chain(&mut d.mappings)
                .collect(),
            Resource::MappingContinuous(m) => vec![&mut m.gradient],
            Resource::TextureProjection(t) => vec![&mut t.image],
            Resource::PointSet(e) => e
                .data
                .iter_mut()
                .chain(std::iter::once(&mut e.vertices))
                .collect(),
            Resource::LineSet(e) => e
                .data
                .iter_mut()
                .chain([&mut e.segments, &mut e.vertices])
                .collect(),
            Resource::Surface(e) => e
                .data
                .iter_mut()
                .chain([&mut e.triangles, &mut e.vertices])
                .collect(),
            Resource::SurfaceGrid(e) => e.data.iter_mut().chain(e.offset_w.as_mut()).collect(),
            Resource::VolumeGrid(e) => e.data.iter_mut().collect(),
            Resource::View(v) => v.contents.iter_mut().chain(&mut v.elements).collect(),
            Resource::Array(_)
            | Resource::Image(_)
            | Resource::MappingDiscrete(_)
            | Resource::MappingCategory(_)
            | Resource::Slide(_)
            | Resource::Feedback(_) => Vec::new(),
        }
    }

    /// Display name, if the resource type carries one
    pub fn name(&self) -> Option<&str> {
        match self {
            Resource::DataBasic(r) => r.name.as_deref(),
            Resource::DataCategory(r) => r.name.as_deref(),
            Resource::TextureProjection(r) => r.name.as_deref(),
            Resource::PointSet(r) => r.name.as_deref(),
            Resource::LineSet(r) => r.name.as_deref(),
            Resource::Surface(r) => r.name.as_deref(),
            Resource::SurfaceGrid(r) => r.name.as_deref(),
            Resource::VolumeGrid(r) => r.name.as_deref(),
            Resource::View(r) => r.name.as_deref(),
            Resource::Slide(r) => r.name.as_deref(),
            _ => None,
        }
    }

    /// API JSON body; every pointer must already be a URL
    pub fn to_json(&self) -> Result<serde_json::Value> {
        dispatch!(self, inner => serde_json::to_value(inner).map_err(ClientError::from))
    }

    /// Build a resource of the given kind from API JSON
    pub fn from_json(kind: ResourceKind, json: serde_json::Value) -> Result<Self> {
        Ok(match kind {
            ResourceKind::Array => Resource::Array(parse(json)?),
            ResourceKind::Image => Resource::Image(parse(json)?),
            ResourceKind::DataBasic => Resource::DataBasic(parse(json)?),
            ResourceKind::DataCategory => Resource::DataCategory(parse(json)?),
            ResourceKind::MappingContinuous => Resource::MappingContinuous(parse(json)?),
            ResourceKind::MappingDiscrete => Resource::MappingDiscrete(parse(json)?),
            ResourceKind::MappingCategory => Resource::MappingCategory(parse(json)?),
            ResourceKind::TextureProjection => Resource::TextureProjection(parse(json)?),
            ResourceKind::PointSet => Resource::PointSet(parse(json)?),
            ResourceKind::LineSet => Resource::LineSet(parse(json)?),
            ResourceKind::Surface => Resource::Surface(parse(json)?),
            ResourceKind::SurfaceGrid => Resource::SurfaceGrid(parse(json)?),
            ResourceKind::VolumeGrid => Resource::VolumeGrid(parse(json)?),
            ResourceKind::View => Resource::View(parse(json)?),
            ResourceKind::Slide => Resource::Slide(parse(json)?),
            ResourceKind::Feedback => Resource::Feedback(parse(json)?),
        })
    }

    /// Checks that need only this resource
    pub fn validate(&self) -> Result<()> {
        match self {
            Resource::Array(a) => a.validate(),
            Resource::Image(i) => i.validate(),
            Resource::MappingContinuous(m) => m.validate(),
            Resource::MappingDiscrete(m) => m.validate(),
            Resource::MappingCategory(m) => m.validate(),
            Resource::TextureProjection(t) => {
                validate_axis("axis_u", &t.axis_u)?;
                validate_axis("axis_v", &t.axis_v)
            }
            Resource::PointSet(e) => e.defaults.validate(),
            Resource::LineSet(e) => e.defaults.validate(),
            Resource::Surface(e) => e.defaults.validate(),
            Resource::SurfaceGrid(e) => {
                validate_tensor("tensor_u", &e.tensor_u)?;
                validate_tensor("tensor_v", &e.tensor_v)?;
                validate_axis("axis_u", &e.axis_u)?;
                validate_axis("axis_v", &e.axis_v)?;
                e.defaults.validate()
            }
            Resource::VolumeGrid(e) => {
                validate_tensor("tensor_u", &e.tensor_u)?;
                validate_tensor("tensor_v", &e.tensor_v)?;
                validate_tensor("tensor_w", &e.tensor_w)?;
                validate_axis("axis_u", &e.axis_u)?;
                validate_axis("axis_v", &e.axis_v)?;
                validate_axis("axis_w", &e.axis_w)?;
                e.defaults.validate()
            }
            Resource::Slide(s) => s.validate(),
            Resource::Feedback(f) => f.validate(),
            Resource::DataBasic(_) | Resource::DataCategory(_) | Resource::View(_) => Ok(()),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) if !name.is_empty() => write!(f, "{} '{}'", self.kind(), name),
            _ => write!(f, "{}", self.kind()),
        }
    }
}

macro_rules! impl_into_resource {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for Resource {
            fn from(value: $ty) -> Self {
                Resource::$variant(value)
            }
        })*
    };
}

impl_into_resource!(
    Array(Array),
    Image(Image),
    DataBasic(DataBasic),
    DataCategory(DataCategory),
    MappingContinuous(MappingContinuous),
    MappingDiscrete(MappingDiscrete),
    MappingCategory(MappingCategory),
    TextureProjection(TextureProjection),
    PointSet(ElementPointSet),
    LineSet(ElementLineSet),
    Surface(ElementSurface),
    SurfaceGrid(ElementSurfaceGrid),
    VolumeGrid(ElementVolumeGrid),
    View(View),
    Slide(Slide),
    Feedback(Feedback),
);
