//! In-memory OMF v1 project model
//!
//! The model is a tree: a project owns its elements, and each element owns
//! its geometry, data and textures. Shared arrays and uids only exist in
//! the file dictionary, see [`super::io`].

use crate::error::{ClientError, Result};
use crate::files::PNG_SIGNATURE;
use crate::types::Vector3;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// RGB color as stored by OMF
pub type Rgb = [u8; 3];

/// Top-level OMF container
#[derive(Debug, Clone, PartialEq)]
pub struct OmfProject {
    pub uid: Uuid,
    pub name: String,
    pub description: String,
    pub author: String,
    pub revision: String,
    pub units: String,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    /// Offset applied to every element geometry
    pub origin: Vector3,
    pub elements: Vec<OmfElement>,
}

impl Default for OmfProject {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4(),
            name: String::new(),
            description: String::new(),
            author: String::new(),
            revision: String::new(),
            units: String::new(),
            date_created: now,
            date_modified: now,
            origin: [0.0; 3],
            elements: Vec::new(),
        }
    }
}

impl OmfProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_finite(&self.origin, "Project origin")?;
        for element in &self.elements {
            element.validate().map_err(|e| match e {
                ClientError::Validation(msg) if !element.name.is_empty() => {
                    ClientError::Validation(format!("{}: {}", element.name, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Element geometry; the variant decides the OMF element class
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    PointSet {
        origin: Vector3,
        vertices: Vec<Vector3>,
    },
    LineSet {
        origin: Vector3,
        vertices: Vec<Vector3>,
        segments: Vec<[i64; 2]>,
    },
    Surface {
        origin: Vector3,
        vertices: Vec<Vector3>,
        triangles: Vec<[i64; 3]>,
    },
    SurfaceGrid {
        origin: Vector3,
        tensor_u: Vec<f64>,
        tensor_v: Vec<f64>,
        axis_u: Vector3,
        axis_v: Vector3,
        /// Node offsets along the grid normal
        offset_w: Option<Vec<f64>>,
    },
    VolumeGrid {
        origin: Vector3,
        tensor_u: Vec<f64>,
        tensor_v: Vec<f64>,
        tensor_w: Vec<f64>,
        axis_u: Vector3,
        axis_v: Vector3,
        axis_w: Vector3,
    },
}

impl Geometry {
    pub fn origin(&self) -> Vector3 {
        match self {
            Geometry::PointSet { origin, .. }
            | Geometry::LineSet { origin, .. }
            | Geometry::Surface { origin, .. }
            | Geometry::SurfaceGrid { origin, .. }
            | Geometry::VolumeGrid { origin, .. } => *origin,
        }
    }

    /// OMF class name of the geometry
    pub fn class_name(&self) -> &'static str {
        match self {
            Geometry::PointSet { .. } => "PointSetGeometry",
            Geometry::LineSet { .. } => "LineSetGeometry",
            Geometry::Surface { .. } => "SurfaceGeometry",
            Geometry::SurfaceGrid { .. } => "SurfaceGridGeometry",
            Geometry::VolumeGrid { .. } => "VolumeGridGeometry",
        }
    }

    /// OMF class name of an element holding this geometry
    pub fn element_class(&self) -> &'static str {
        match self {
            Geometry::PointSet { .. } => "PointSetElement",
            Geometry::LineSet { .. } => "LineSetElement",
            Geometry::Surface { .. } | Geometry::SurfaceGrid { .. } => "SurfaceElement",
            Geometry::VolumeGrid { .. } => "VolumeElement",
        }
    }

    /// Subtypes allowed on the element class
    pub fn subtypes(&self) -> &'static [&'static str] {
        match self {
            Geometry::PointSet { .. } => &["point", "collar", "blasthole"],
            Geometry::LineSet { .. } => &["line", "borehole"],
            Geometry::Surface { .. } | Geometry::SurfaceGrid { .. } => &["surface"],
            Geometry::VolumeGrid { .. } => &["volume"],
        }
    }

    /// Number of values data needs at `location`
    pub fn location_len(&self, location: &str) -> Result<usize> {
        let len = match (self, location) {
            (Geometry::PointSet { vertices, .. }, "vertices")
            | (Geometry::LineSet { vertices, .. }, "vertices")
            | (Geometry::Surface { vertices, .. }, "vertices") => vertices.len(),
            (Geometry::LineSet { segments, .. }, "segments") => segments.len(),
            (Geometry::Surface { triangles, .. }, "faces") => triangles.len(),
            (
                Geometry::SurfaceGrid {
                    tensor_u, tensor_v, ..
                },
                "vertices",
            ) => (tensor_u.len() + 1) * (tensor_v.len() + 1),
            (
                Geometry::SurfaceGrid {
                    tensor_u, tensor_v, ..
                },
                "faces",
            ) => tensor_u.len() * tensor_v.len(),
            (
                Geometry::VolumeGrid {
                    tensor_u,
                    tensor_v,
                    tensor_w,
                    ..
                },
                "vertices",
            ) => (tensor_u.len() + 1) * (tensor_v.len() + 1) * (tensor_w.len() + 1),
            (
                Geometry::VolumeGrid {
                    tensor_u,
                    tensor_v,
                    tensor_w,
                    ..
                },
                "cells",
            ) => tensor_u.len() * tensor_v.len() * tensor_w.len(),
            (geometry, location) => {
                return Err(ClientError::Validation(format!(
                    "Location '{}' is not valid for {}",
                    location,
                    geometry.class_name()
                )))
            }
        };
        Ok(len)
    }

    pub fn validate(&self) -> Result<()> {
        check_finite(&self.origin(), "Geometry origin")?;
        match self {
            Geometry::PointSet { vertices, .. } => check_vertices(vertices),
            Geometry::LineSet {
                vertices, segments, ..
            } => {
                check_vertices(vertices)?;
                check_indices(segments, vertices.len(), "Segments")
            }
            Geometry::Surface {
                vertices,
                triangles,
                ..
            } => {
                check_vertices(vertices)?;
                check_indices(triangles, vertices.len(), "Triangles")
            }
            Geometry::SurfaceGrid {
                tensor_u,
                tensor_v,
                axis_u,
                axis_v,
                offset_w,
                ..
            } => {
                check_tensor(tensor_u, "tensor_u")?;
                check_tensor(tensor_v, "tensor_v")?;
                check_axes(&[axis_u, axis_v])?;
                if let Some(offset_w) = offset_w {
                    let expected = self.location_len("vertices")?;
                    if offset_w.len() != expected {
                        return Err(ClientError::Validation(format!(
                            "offset_w needs {} values, found {}",
                            expected,
                            offset_w.len()
                        )));
                    }
                }
                Ok(())
            }
            Geometry::VolumeGrid {
                tensor_u,
                tensor_v,
                tensor_w,
                axis_u,
                axis_v,
                axis_w,
                ..
            } => {
                check_tensor(tensor_u, "tensor_u")?;
                check_tensor(tensor_v, "tensor_v")?;
                check_tensor(tensor_w, "tensor_w")?;
                check_axes(&[axis_u, axis_v, axis_w])
            }
        }
    }
}

/// Values held by a data entry
#[derive(Debug, Clone, PartialEq)]
pub enum DataValues {
    Scalar {
        array: Vec<f64>,
        colormap: Option<ScalarColormap>,
    },
    /// Indices into each legend; negative values are unmapped
    Mapped {
        indices: Vec<i64>,
        legends: Vec<Legend>,
    },
    Vector2(Vec<[f64; 2]>),
    Vector3(Vec<Vector3>),
    Color(Vec<Rgb>),
    String(Vec<String>),
    DateTime(Vec<String>),
}

impl DataValues {
    pub fn class_name(&self) -> &'static str {
        match self {
            DataValues::Scalar { .. } => "ScalarData",
            DataValues::Mapped { .. } => "MappedData",
            DataValues::Vector2(_) => "Vector2Data",
            DataValues::Vector3(_) => "Vector3Data",
            DataValues::Color(_) => "ColorData",
            DataValues::String(_) => "StringData",
            DataValues::DateTime(_) => "DateTimeData",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DataValues::Scalar { array, .. } => array.len(),
            DataValues::Mapped { indices, .. } => indices.len(),
            DataValues::Vector2(values) => values.len(),
            DataValues::Vector3(values) => values.len(),
            DataValues::Color(values) => values.len(),
            DataValues::String(values) | DataValues::DateTime(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OmfData {
    pub name: String,
    pub description: String,
    /// `vertices`, `segments`, `faces` or `cells`
    pub location: String,
    pub values: DataValues,
}

impl OmfData {
    pub fn scalar(name: impl Into<String>, location: impl Into<String>, array: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            location: location.into(),
            values: DataValues::Scalar {
                array,
                colormap: None,
            },
        }
    }

    pub fn mapped(
        name: impl Into<String>,
        location: impl Into<String>,
        indices: Vec<i64>,
        legends: Vec<Legend>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            location: location.into(),
            values: DataValues::Mapped { indices, legends },
        }
    }

    fn validate(&self, geometry: &Geometry) -> Result<()> {
        let expected = geometry.location_len(&self.location)?;
        if self.values.len() != expected {
            return Err(ClientError::Validation(format!(
                "Data '{}' needs {} values on {}, found {}",
                self.name,
                expected,
                self.location,
                self.values.len()
            )));
        }
        match &self.values {
            DataValues::Scalar {
                colormap: Some(colormap),
                ..
            } => colormap.validate(),
            DataValues::Mapped { indices, legends } => {
                for legend in legends {
                    if let Some(index) = indices
                        .iter()
                        .find(|&&i| i >= legend.values.len() as i64)
                    {
                        return Err(ClientError::Validation(format!(
                            "Index {} outside legend '{}'",
                            index, legend.name
                        )));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarColormap {
    pub gradient: Vec<Rgb>,
    /// Data values at the two ends of the gradient
    pub limits: [f64; 2],
}

impl ScalarColormap {
    fn validate(&self) -> Result<()> {
        if self.gradient.is_empty() {
            return Err(ClientError::Validation(
                "Colormap gradient is empty".to_string(),
            ));
        }
        if self.limits.iter().any(|v| v.is_nan()) || self.limits[0] > self.limits[1] {
            return Err(ClientError::Validation(format!(
                "Colormap limits {:?} must be increasing",
                self.limits
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LegendValues {
    Color(Vec<Rgb>),
    String(Vec<String>),
    DateTime(Vec<String>),
    Scalar(Vec<f64>),
}

impl LegendValues {
    pub fn len(&self) -> usize {
        match self {
            LegendValues::Color(values) => values.len(),
            LegendValues::String(values) | LegendValues::DateTime(values) => values.len(),
            LegendValues::Scalar(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub name: String,
    pub description: String,
    pub values: LegendValues,
}

impl Legend {
    pub fn new(values: LegendValues) -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            values,
        }
    }
}

/// PNG projected onto an element along a plane
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTexture {
    pub name: String,
    pub description: String,
    pub origin: Vector3,
    pub axis_u: Vector3,
    pub axis_v: Vector3,
    pub image: Bytes,
}

impl ImageTexture {
    fn validate(&self) -> Result<()> {
        check_finite(&self.origin, "Texture origin")?;
        check_axes(&[&self.axis_u, &self.axis_v])?;
        if !self.image.starts_with(PNG_SIGNATURE) {
            return Err(ClientError::Validation(format!(
                "Texture '{}' image is not a PNG",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OmfElement {
    pub name: String,
    pub description: String,
    /// Class-specific subtype, e.g. `borehole` for line sets
    pub subtype: String,
    pub color: Option<Rgb>,
    pub geometry: Geometry,
    pub data: Vec<OmfData>,
    /// Only point sets and surfaces carry textures
    pub textures: Vec<ImageTexture>,
}

impl OmfElement {
    /// Element with the default subtype of its geometry
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        let subtype = geometry.subtypes()[0].to_string();
        Self {
            name: name.into(),
            description: String::new(),
            subtype,
            color: None,
            geometry,
            data: Vec::new(),
            textures: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.geometry.subtypes().contains(&self.subtype.as_str()) {
            return Err(ClientError::Validation(format!(
                "Subtype '{}' is not valid for {}",
                self.subtype,
                self.geometry.element_class()
            )));
        }
        self.geometry.validate()?;
        for data in &self.data {
            data.validate(&self.geometry)?;
        }
        if !self.textures.is_empty()
            && matches!(
                self.geometry,
                Geometry::LineSet { .. } | Geometry::VolumeGrid { .. }
            )
        {
            return Err(ClientError::Validation(format!(
                "{} does not support textures",
                self.geometry.element_class()
            )));
        }
        for texture in &self.textures {
            texture.validate()?;
        }
        Ok(())
    }
}

fn check_finite(values: &[f64], what: &str) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ClientError::Validation(format!("{} must be finite", what)))
    }
}

fn check_vertices(vertices: &[Vector3]) -> Result<()> {
    if vertices.iter().flatten().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ClientError::Validation("Vertices must be finite".to_string()))
    }
}

fn check_indices<const N: usize>(rows: &[[i64; N]], count: usize, what: &str) -> Result<()> {
    match rows
        .iter()
        .flatten()
        .find(|&&i| i < 0 || i as usize >= count)
    {
        Some(index) => Err(ClientError::Validation(format!(
            "{} index {} outside {} vertices",
            what, index, count
        ))),
        None => Ok(()),
    }
}

fn check_tensor(tensor: &[f64], what: &str) -> Result<()> {
    if tensor.is_empty() || tensor.iter().any(|v| *v <= 0.0 || !v.is_finite()) {
        return Err(ClientError::Validation(format!(
            "{} must be non-empty and positive",
            what
        )));
    }
    Ok(())
}

fn check_axes(axes: &[&Vector3]) -> Result<()> {
    for axis in axes {
        check_finite(*axis, "Axis")?;
        if axis.iter().all(|v| *v == 0.0) {
            return Err(ClientError::Validation("Axis must be non-zero".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Geometry {
        Geometry::SurfaceGrid {
            origin: [0.0; 3],
            tensor_u: vec![1.0; 5],
            tensor_v: vec![1.0; 5],
            axis_u: [1.0, 0.0, 0.0],
            axis_v: [0.0, 1.0, 0.0],
            offset_w: None,
        }
    }

    #[test]
    fn test_grid_locations() {
        let geometry = grid();
        assert_eq!(geometry.location_len("vertices").unwrap(), 36);
        assert_eq!(geometry.location_len("faces").unwrap(), 25);
        assert!(geometry.location_len("cells").is_err());
    }

    #[test]
    fn test_element_validation() {
        let mut element = OmfElement::new("grid", grid());
        element
            .data
            .push(OmfData::scalar("values", "faces", vec![1.0; 25]));
        element.validate().unwrap();

        element.data[0] = OmfData::scalar("values", "faces", vec![1.0; 24]);
        assert!(element.validate().is_err());

        let mut lines = OmfElement::new(
            "lines",
            Geometry::LineSet {
                origin: [0.0; 3],
                vertices: vec![[0.0; 3], [1.0; 3]],
                segments: vec![[0, 2]],
            },
        );
        assert!(lines.validate().is_err());
        lines.subtype = "borehole".to_string();
        if let Geometry::LineSet { segments, .. } = &mut lines.geometry {
            segments[0] = [0, 1];
        }
        lines.validate().unwrap();
        lines.subtype = "surface".to_string();
        assert!(lines.validate().is_err());
    }

    #[test]
    fn test_mapped_indices_checked() {
        let mut element = OmfElement::new("grid", grid());
        let legend = Legend::new(LegendValues::String(vec!["a".into(), "b".into()]));
        element
            .data
            .push(OmfData::mapped("cats", "faces", vec![2; 25], vec![legend]));
        assert!(element.validate().is_err());
    }
}
