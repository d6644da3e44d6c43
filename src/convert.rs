//! Conversion between LF View resource graphs and OMF projects
//!
//! [`omf_to_view`] builds a View and everything it contains as local nodes
//! of a new [`ResourceGraph`]. [`view_to_omf`] walks a fully local View
//! graph back into an OMF project; download views recursively before
//! converting them. Custom discrete colormaps have no OMF v1 counterpart
//! and are dropped.

use crate::error::{ClientError, Result};
use crate::files::{Array, ArrayData, Image};
use crate::graph::ResourceGraph;
use crate::omf::{
    DataValues, Geometry, ImageTexture, Legend, LegendValues, OmfData, OmfElement, OmfProject,
    OmfReader, OmfWriter, Rgb, ScalarColormap,
};
use crate::resources::{
    DataBasic, DataCategory, ElementLineSet, ElementOptions, ElementPointSet, ElementSurface,
    ElementSurfaceGrid, ElementVolumeGrid, MappingCategory, MappingContinuous, MappingValue,
    Pointer, Resource, TextureProjection, View,
};
use crate::types::{Color, DataLocation, Vector3};
use bytes::Bytes;
use ndarray::Ix2;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Colors in a gradient sampled from a continuous mapping
pub const GRADIENT_SIZE: usize = 128;

/// Tube radius given to borehole line sets
pub const BOREHOLE_RADIUS: f64 = 10.0;

/// Read an OMF file into a new graph holding a View
///
/// Returns the graph and the uid of the View node.
pub fn omf_to_view<P: AsRef<Path>>(path: P) -> Result<(ResourceGraph, Uuid)> {
    let path = path.as_ref();
    info!(path = %path.display(), "Converting OMF file to View");
    project_to_view(&OmfReader::open(path)?.project()?)
}

pub fn omf_to_view_bytes(data: impl Into<Bytes>) -> Result<(ResourceGraph, Uuid)> {
    project_to_view(&OmfReader::from_bytes(data)?.project()?)
}

/// Write a View held in `graph` to an OMF file
pub fn view_to_omf<P: AsRef<Path>>(graph: &ResourceGraph, view: Uuid, path: P) -> Result<()> {
    let path = path.as_ref();
    let project = view_to_project(graph, view)?;
    OmfWriter::new().write_file(&project, path)?;
    info!(path = %path.display(), elements = project.elements.len(), "Wrote View to OMF file");
    Ok(())
}

pub fn view_to_omf_bytes(graph: &ResourceGraph, view: Uuid) -> Result<Vec<u8>> {
    OmfWriter::new().to_bytes(&view_to_project(graph, view)?)
}

/// Translate an OMF project into View resources
pub fn project_to_view(project: &OmfProject) -> Result<(ResourceGraph, Uuid)> {
    project.validate()?;
    let mut graph = ResourceGraph::new();
    let mut elements = Vec::with_capacity(project.elements.len());
    for element in &project.elements {
        elements.push(Pointer::Local(add_element(&mut graph, element, project.origin)?));
    }
    let view = graph.insert(View {
        name: Some(project.name.clone()),
        description: Some(project.description.clone()),
        elements,
        contents: Vec::new(),
    });
    let contents = graph.compute_children(view)?;
    if let Some(Resource::View(v)) = graph.get_mut(view) {
        v.contents = contents;
    }
    debug!(resources = graph.len(), "Built View from OMF project");
    Ok((graph, view))
}

fn shift(point: Vector3, offset: Vector3) -> Vector3 {
    [point[0] + offset[0], point[1] + offset[1], point[2] + offset[2]]
}

fn index_array<const N: usize>(rows: &[[i64; N]]) -> Result<Array> {
    let converted = rows
        .iter()
        .map(|row| {
            let mut out = [0u32; N];
            for (slot, index) in out.iter_mut().zip(row) {
                *slot = u32::try_from(*index).map_err(|_| {
                    ClientError::Validation(format!("Index {} out of range", index))
                })?;
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Array::from_indices(&converted))
}

fn add_element(graph: &mut ResourceGraph, element: &OmfElement, origin: Vector3) -> Result<Uuid> {
    let offset = shift(element.geometry.origin(), origin);
    let mut data = Vec::new();
    for item in &element.data {
        if let Some(uid) = add_data(graph, item)? {
            data.push(Pointer::Local(uid));
        }
    }
    for texture in &element.textures {
        data.push(Pointer::Local(add_texture(graph, texture, origin)));
    }
    let name = Some(element.name.clone());
    let description = Some(element.description.clone());
    let mut defaults = ElementOptions::default();
    if let Some(rgb) = element.color {
        defaults = defaults.with_color(Color::Rgb(rgb));
    }
    let moved = |vertices: &[Vector3]| -> Vec<Vector3> {
        vertices.iter().map(|v| shift(*v, offset)).collect()
    };

    let uid = match &element.geometry {
        Geometry::PointSet { vertices, .. } => {
            let vertices = graph.insert(Array::from_vectors(&moved(vertices)));
            graph.insert(ElementPointSet {
                name,
                description,
                vertices: vertices.into(),
                data,
                defaults,
            })
        }
        Geometry::LineSet {
            vertices, segments, ..
        } => {
            let vertices = graph.insert(Array::from_vectors(&moved(vertices)));
            let segments = graph.insert(index_array(segments)?);
            let color = element.color.map(Color::Rgb).unwrap_or(Color::Random);
            let mut defaults = ElementOptions::default()
                .with_color(color)
                .with_opacity(1.0);
            if element.subtype == "borehole" {
                defaults = defaults.with_radius(BOREHOLE_RADIUS);
            }
            graph.insert(ElementLineSet {
                name,
                description,
                vertices: vertices.into(),
                segments: segments.into(),
                data,
                defaults,
            })
        }
        Geometry::Surface {
            vertices,
            triangles,
            ..
        } => {
            let vertices = graph.insert(Array::from_vectors(&moved(vertices)));
            let triangles = graph.insert(index_array(triangles)?);
            graph.insert(ElementSurface {
                name,
                description,
                vertices: vertices.into(),
                triangles: triangles.into(),
                data,
                defaults,
            })
        }
        Geometry::SurfaceGrid {
            tensor_u,
            tensor_v,
            axis_u,
            axis_v,
            offset_w,
            ..
        } => {
            let offset_w = offset_w
                .as_ref()
                .filter(|values| !values.is_empty())
                .map(|values| Pointer::Local(graph.insert(Array::from_f64(values.clone()))));
            graph.insert(ElementSurfaceGrid {
                name,
                description,
                tensor_u: tensor_u.clone(),
                tensor_v: tensor_v.clone(),
                axis_u: *axis_u,
                axis_v: *axis_v,
                origin: offset,
                offset_w,
                data,
                defaults,
            })
        }
        Geometry::VolumeGrid {
            tensor_u,
            tensor_v,
            tensor_w,
            axis_u,
            axis_v,
            axis_w,
            ..
        } => graph.insert(ElementVolumeGrid {
            name,
            description,
            tensor_u: tensor_u.clone(),
            tensor_v: tensor_v.clone(),
            tensor_w: tensor_w.clone(),
            axis_u: *axis_u,
            axis_v: *axis_v,
            axis_w: *axis_w,
            origin: offset,
            data,
            defaults,
        }),
    };
    Ok(uid)
}

fn color_array(colors: &[Rgb]) -> Array {
    let flat = colors.iter().flatten().copied().collect();
    Array::new(ArrayData::Uint8(flat), vec![colors.len(), 3])
}

fn add_data(graph: &mut ResourceGraph, data: &OmfData) -> Result<Option<Uuid>> {
    let location = DataLocation::from_omf(&data.location)?;
    let name = Some(data.name.clone());
    let description = Some(data.description.clone());
    let uid = match &data.values {
        DataValues::Scalar { array, colormap } => {
            let values = ArrayData::Float64(array.clone());
            // Controls span the data, not the colormap limits
            let controls = values
                .nan_min_max()
                .map_or(colormap.as_ref().map(|c| c.limits), |(lo, hi)| Some([lo, hi]));
            let array = graph.insert(Array::new(values, vec![array.len()]));
            let mut basic = DataBasic::new(location, array);
            basic.name = name;
            basic.description = description;
            if let (Some(colormap), Some(controls)) = (colormap, controls) {
                let gradient = graph.insert(color_array(&colormap.gradient));
                let mapping = graph.insert(MappingContinuous::new(gradient, controls.to_vec()));
                basic.mappings.push(Pointer::Local(mapping));
            }
            graph.insert(basic)
        }
        DataValues::Mapped { indices, legends } => {
            let values = indices
                .iter()
                .map(|i| {
                    i32::try_from(*i).map_err(|_| {
                        ClientError::Validation(format!("Category index {} out of range", i))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let count = values.len();
            let array = graph.insert(Array::new(ArrayData::Int32(values), vec![count]));
            let mut category = DataCategory::new(location, array);
            category.name = name;
            category.description = description;

            let mut strings = None;
            let mut colors = None;
            for legend in legends {
                match &legend.values {
                    LegendValues::String(values) if strings.is_none() => {
                        strings = Some(values.iter().map(|v| MappingValue::Text(v.clone())).collect())
                    }
                    LegendValues::Color(values) if colors.is_none() => {
                        colors = Some(values.iter().map(|v| MappingValue::Color(Color::Rgb(*v))).collect())
                    }
                    _ => debug!(legend = %legend.name, "Skipping unused legend"),
                }
            }
            if let Some(values) = strings {
                let mapping = graph.insert(MappingCategory::new(values));
                category.categories = Some(Pointer::Local(mapping));
            }
            if let Some(values) = colors {
                let mapping = Pointer::Local(graph.insert(MappingCategory::new(values)));
                if category.categories.is_none() {
                    category.categories = Some(mapping);
                } else {
                    category.mappings.push(mapping);
                }
            }
            graph.insert(category)
        }
        other => {
            warn!(
                data = %data.name,
                class = other.class_name(),
                "Skipping unsupported OMF data"
            );
            return Ok(None);
        }
    };
    Ok(Some(uid))
}

fn add_texture(graph: &mut ResourceGraph, texture: &ImageTexture, origin: Vector3) -> Uuid {
    let image = graph.insert(Image::new(texture.image.clone()));
    graph.insert(TextureProjection {
        name: Some(texture.name.clone()),
        description: Some(texture.description.clone()),
        origin: shift(texture.origin, origin),
        axis_u: texture.axis_u,
        axis_v: texture.axis_v,
        image: image.into(),
    })
}

/// Translate a local View graph into an OMF project
pub fn view_to_project(graph: &ResourceGraph, view: Uuid) -> Result<OmfProject> {
    let view = match graph.get(view) {
        Some(Resource::View(view)) => view,
        Some(other) => {
            return Err(ClientError::UnsupportedResource(format!(
                "Expected a View, found {}",
                other.kind()
            )))
        }
        None => return Err(ClientError::NotFound(view.to_string())),
    };
    let mut project = OmfProject::new(view.name.clone().unwrap_or_default());
    project.description = view.description.clone().unwrap_or_default();
    for element in &view.elements {
        project.elements.push(to_element(graph, element)?);
    }
    Ok(project)
}

fn values<'a>(graph: &'a ResourceGraph, pointer: &Pointer) -> Result<&'a ArrayData> {
    graph
        .resolve_array(pointer)?
        .array
        .as_ref()
        .ok_or_else(|| ClientError::MissingField(format!("array data for {}", pointer)))
}

fn vectors(graph: &ResourceGraph, pointer: &Pointer) -> Result<Vec<Vector3>> {
    let shape = &graph.resolve_array(pointer)?.shape;
    let grid = values(graph, pointer)?
        .to_ndarray(shape)?
        .into_dimensionality::<Ix2>()
        .map_err(|_| ClientError::Validation(format!("Vertices must be 2D, found {:?}", shape)))?;
    if grid.ncols() != 3 {
        return Err(ClientError::Validation(format!(
            "Vertices must have shape [n, 3], found {:?}",
            shape
        )));
    }
    Ok(grid.rows().into_iter().map(|row| [row[0], row[1], row[2]]).collect())
}

fn indices<const N: usize>(graph: &ResourceGraph, pointer: &Pointer) -> Result<Vec<[i64; N]>> {
    flat_rows(&values(graph, pointer)?.to_i64_vec()?)
}

fn flat_rows<T: Copy + Default, const N: usize>(flat: &[T]) -> Result<Vec<[T; N]>> {
    if flat.len() % N != 0 {
        return Err(ClientError::Validation(format!(
            "{} values do not form rows of {}",
            flat.len(),
            N
        )));
    }
    Ok(flat
        .chunks_exact(N)
        .map(|chunk| {
            let mut row = [T::default(); N];
            row.copy_from_slice(chunk);
            row
        })
        .collect())
}

fn to_element(graph: &ResourceGraph, pointer: &Pointer) -> Result<OmfElement> {
    let resource = graph.resolve(pointer)?;
    let (geometry, data, defaults, subtype) = match resource {
        Resource::PointSet(e) => (
            Geometry::PointSet {
                origin: [0.0; 3],
                vertices: vectors(graph, &e.vertices)?,
            },
            &e.data,
            &e.defaults,
            "point",
        ),
        Resource::LineSet(e) => (
            Geometry::LineSet {
                origin: [0.0; 3],
                vertices: vectors(graph, &e.vertices)?,
                segments: indices(graph, &e.segments)?,
            },
            &e.data,
            &e.defaults,
            if e.is_tubes() { "borehole" } else { "line" },
        ),
        Resource::Surface(e) => (
            Geometry::Surface {
                origin: [0.0; 3],
                vertices: vectors(graph, &e.vertices)?,
                triangles: indices(graph, &e.triangles)?,
            },
            &e.data,
            &e.defaults,
            "surface",
        ),
        Resource::SurfaceGrid(e) => (
            Geometry::SurfaceGrid {
                origin: e.origin,
                tensor_u: e.tensor_u.clone(),
                tensor_v: e.tensor_v.clone(),
                axis_u: e.axis_u,
                axis_v: e.axis_v,
                offset_w: match &e.offset_w {
                    Some(offset) => Some(values(graph, offset)?.to_f64_vec()),
                    None => None,
                },
            },
            &e.data,
            &e.defaults,
            "surface",
        ),
        Resource::VolumeGrid(e) => (
            Geometry::VolumeGrid {
                origin: e.origin,
                tensor_u: e.tensor_u.clone(),
                tensor_v: e.tensor_v.clone(),
                tensor_w: e.tensor_w.clone(),
                axis_u: e.axis_u,
                axis_v: e.axis_v,
                axis_w: e.axis_w,
            },
            &e.data,
            &e.defaults,
            "volume",
        ),
        other => {
            return Err(ClientError::UnsupportedResource(format!(
                "{} is not an element",
                other.kind()
            )))
        }
    };
    let mut element = OmfElement::new(resource.name().unwrap_or_default(), geometry);
    element.description = description_of(resource);
    element.subtype = subtype.to_string();
    element.color = defaults.color().and_then(|c| c.as_rgb());
    for item in data {
        match graph.resolve(item)? {
            Resource::TextureProjection(texture) => {
                element.textures.push(to_texture(graph, texture)?)
            }
            _ => element.data.push(to_data(graph, item, &element.geometry)?),
        }
    }
    Ok(element)
}

fn description_of(resource: &Resource) -> String {
    let description = match resource {
        Resource::PointSet(e) => &e.description,
        Resource::LineSet(e) => &e.description,
        Resource::Surface(e) => &e.description,
        Resource::SurfaceGrid(e) => &e.description,
        Resource::VolumeGrid(e) => &e.description,
        _ => return String::new(),
    };
    description.clone().unwrap_or_default()
}

/// OMF location name for data on an element geometry
fn omf_location(location: DataLocation, geometry: &Geometry) -> &'static str {
    match (location, geometry) {
        (DataLocation::Nodes, _) => "vertices",
        (DataLocation::Cells, Geometry::LineSet { .. }) => "segments",
        (DataLocation::Cells, Geometry::VolumeGrid { .. }) => "cells",
        (DataLocation::Cells, _) => "faces",
    }
}

fn to_data(graph: &ResourceGraph, pointer: &Pointer, geometry: &Geometry) -> Result<OmfData> {
    match graph.resolve(pointer)? {
        Resource::DataBasic(data) => {
            let mut colormap = None;
            for mapping in &data.mappings {
                match graph.resolve(mapping)? {
                    Resource::MappingContinuous(m) => {
                        colormap = Some(sample_colormap(graph, m)?);
                        break;
                    }
                    other => debug!(kind = %other.kind(), "Dropping custom colormap"),
                }
            }
            Ok(OmfData {
                name: data.name.clone().unwrap_or_default(),
                description: data.description.clone().unwrap_or_default(),
                location: omf_location(data.location, geometry).to_string(),
                values: DataValues::Scalar {
                    array: values(graph, &data.array)?.to_f64_vec(),
                    colormap,
                },
            })
        }
        Resource::DataCategory(data) => {
            let mut legends = Vec::new();
            for mapping in data.categories.iter().chain(&data.mappings) {
                match graph.resolve(mapping)? {
                    Resource::MappingCategory(m) => legends.push(to_legend(m)?),
                    other => {
                        return Err(ClientError::Validation(format!(
                            "Category data cannot use {}",
                            other.kind()
                        )))
                    }
                }
            }
            Ok(OmfData {
                name: data.name.clone().unwrap_or_default(),
                description: data.description.clone().unwrap_or_default(),
                location: omf_location(data.location, geometry).to_string(),
                values: DataValues::Mapped {
                    indices: values(graph, &data.array)?.to_i64_vec()?,
                    legends,
                },
            })
        }
        other => Err(ClientError::UnsupportedResource(format!(
            "{} cannot be element data",
            other.kind()
        ))),
    }
}

/// Legend whose position `i` holds the value mapped from data value `i`
///
/// Indices must address one of the mapping's values.
fn to_legend(mapping: &MappingCategory) -> Result<Legend> {
    let count = mapping.values.len();
    if let Some(index) = mapping
        .indices
        .iter()
        .find(|i| usize::try_from(**i).map_or(true, |i| i >= count))
    {
        return Err(ClientError::Validation(format!(
            "Category index {} outside {} values",
            index, count
        )));
    }
    let size = count;
    let all_colors = mapping.values.iter().all(MappingValue::is_color);
    let values = if all_colors && !mapping.values.is_empty() {
        let mut colors: Vec<Rgb> = vec![[0, 0, 0]; size];
        for (index, value) in mapping.indices.iter().zip(&mapping.values) {
            if let (Ok(slot), MappingValue::Color(color)) = (usize::try_from(*index), value) {
                colors[slot] = color.as_rgb().unwrap_or([128, 128, 128]);
            }
        }
        LegendValues::Color(colors)
    } else {
        let mut strings = vec![String::new(); size];
        for (index, value) in mapping.indices.iter().zip(&mapping.values) {
            if let Ok(slot) = usize::try_from(*index) {
                strings[slot] = match value {
                    MappingValue::Text(text) => text.clone(),
                    MappingValue::Number(number) => number.to_string(),
                    MappingValue::Color(color) => color.to_hex(),
                };
            }
        }
        LegendValues::String(strings)
    };
    Ok(Legend::new(values))
}

/// Piecewise-linear lookup of `x` in increasing control points
fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    match (xs.first(), xs.last()) {
        (Some(first), _) if x <= *first => ys[0],
        (_, Some(last)) if x >= *last => ys[ys.len() - 1],
        _ => {
            let upper = xs.iter().position(|v| *v > x).unwrap_or(xs.len() - 1);
            let lower = upper.saturating_sub(1);
            let span = xs[upper] - xs[lower];
            if span <= 0.0 {
                return ys[upper];
            }
            ys[lower] + (ys[upper] - ys[lower]) * (x - xs[lower]) / span
        }
    }
}

/// Resample a continuous mapping into an OMF colormap
fn sample_colormap(graph: &ResourceGraph, mapping: &MappingContinuous) -> Result<ScalarColormap> {
    let gradient: Vec<[f64; 3]> = flat_rows(&values(graph, &mapping.gradient)?.to_f64_vec())?;
    if gradient.is_empty() || mapping.data_controls.is_empty() {
        return Err(ClientError::Validation(
            "Continuous mapping has an empty gradient".to_string(),
        ));
    }
    if mapping.gradient_controls.len() != mapping.data_controls.len() {
        return Err(ClientError::Validation(format!(
            "{} gradient controls for {} data controls",
            mapping.gradient_controls.len(),
            mapping.data_controls.len()
        )));
    }
    let low = mapping.data_controls[0];
    let high = mapping.data_controls[mapping.data_controls.len() - 1];
    let last = (gradient.len() - 1) as f64;
    let colors = (0..GRADIENT_SIZE)
        .map(|i| {
            let value = low + (high - low) * i as f64 / (GRADIENT_SIZE - 1) as f64;
            let position =
                interpolate(value, &mapping.data_controls, &mapping.gradient_controls).clamp(0.0, 1.0)
                    * last;
            let below = position.floor() as usize;
            let above = position.ceil() as usize;
            let weight = position - below as f64;
            let mut rgb = [0u8; 3];
            for (channel, slot) in rgb.iter_mut().enumerate() {
                let mixed = gradient[below][channel] * (1.0 - weight) + gradient[above][channel] * weight;
                *slot = mixed.round().clamp(0.0, 255.0) as u8;
            }
            rgb
        })
        .collect();
    Ok(ScalarColormap {
        gradient: colors,
        limits: [low, high],
    })
}

fn to_texture(graph: &ResourceGraph, texture: &TextureProjection) -> Result<ImageTexture> {
    let image = match graph.resolve(&texture.image)? {
        Resource::Image(image) => image
            .data
            .clone()
            .ok_or_else(|| ClientError::MissingField("image data".to_string()))?,
        other => {
            return Err(ClientError::Validation(format!(
                "Texture image cannot be {}",
                other.kind()
            )))
        }
    };
    Ok(ImageTexture {
        name: texture.name.clone().unwrap_or_default(),
        description: texture.description.clone().unwrap_or_default(),
        origin: texture.origin,
        axis_u: texture.axis_u,
        axis_v: texture.axis_v,
        image,
    })
}
