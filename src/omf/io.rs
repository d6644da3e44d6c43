//! OMF v1 file reader and writer
//!
//! Layout: 4-byte magic, 32-byte NUL-padded version, 16-byte project uid,
//! little-endian u64 offset of the JSON dictionary, zlib-compressed binary
//! blocks, then the JSON dictionary. The dictionary maps uid strings to
//! objects tagged with `__class__`; nested objects are referenced by uid.

use super::model::{
    DataValues, Geometry, ImageTexture, Legend, LegendValues, OmfData, OmfElement, OmfProject,
    Rgb, ScalarColormap,
};
use crate::compression::{get_compressor, CompressionLevel, CompressionMethod, Compressor};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::types::{Color, Vector3};
use crate::OMF_MAGIC;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Version string written to and accepted from file headers
pub const OMF_VERSION: &str = "OMF-v0.9.0";

/// Bytes before the first binary block
pub const HEADER_SIZE: usize = 4 + 32 + 16 + 8;

const PNG_DTYPE: &str = "image/png";

/// Serializes an [`OmfProject`] to OMF v1 bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct OmfWriter {
    level: CompressionLevel,
}

impl OmfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: CompressionLevel) -> Self {
        Self { level }
    }

    /// Writer using the configured compression level
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_level(config.compression_level)
    }

    /// Validate and encode a project
    pub fn to_bytes(&self, project: &OmfProject) -> Result<Vec<u8>> {
        project.validate()?;
        let mut encoder = Encoder {
            dict: Map::new(),
            blocks: Vec::new(),
            compressor: get_compressor(CompressionMethod::Zlib),
            level: self.level,
        };
        encoder.project(project)?;

        let json = serde_json::to_vec(&Value::Object(encoder.dict))?;
        let json_start = (HEADER_SIZE + encoder.blocks.len()) as u64;
        let mut out = Vec::with_capacity(json_start as usize + json.len());
        out.extend_from_slice(OMF_MAGIC);
        let mut version = [0u8; 32];
        version[..OMF_VERSION.len()].copy_from_slice(OMF_VERSION.as_bytes());
        out.extend_from_slice(&version);
        out.extend_from_slice(project.uid.as_bytes());
        out.extend_from_slice(&json_start.to_le_bytes());
        out.extend_from_slice(&encoder.blocks);
        out.extend_from_slice(&json);
        debug!(
            elements = project.elements.len(),
            bytes = out.len(),
            "Encoded OMF project"
        );
        Ok(out)
    }

    pub fn write_file<P: AsRef<Path>>(&self, project: &OmfProject, path: P) -> Result<()> {
        let bytes = self.to_bytes(project)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

struct Encoder {
    dict: Map<String, Value>,
    blocks: Vec<u8>,
    compressor: Box<dyn Compressor>,
    level: CompressionLevel,
}

impl Encoder {
    /// Add an object to the dictionary and return its uid
    fn add(&mut self, class: &str, fields: Value) -> String {
        self.add_with_uid(Uuid::new_v4(), class, fields)
    }

    fn add_with_uid(&mut self, uid: Uuid, class: &str, fields: Value) -> String {
        let key = uid.hyphenated().to_string();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut object = Map::new();
        object.insert("__class__".to_string(), json!(class));
        object.insert("uid".to_string(), json!(key));
        object.insert("date_created".to_string(), json!(now));
        object.insert("date_modified".to_string(), json!(now));
        if let Value::Object(fields) = fields {
            object.extend(fields);
        }
        self.dict.insert(key.clone(), Value::Object(object));
        key
    }

    fn block(&mut self, raw: &[u8], dtype: &str) -> Result<Value> {
        let compressed = self.compressor.compress(raw, self.level)?;
        let start = HEADER_SIZE + self.blocks.len();
        self.blocks.extend_from_slice(&compressed);
        Ok(json!({"start": start, "length": compressed.len(), "dtype": dtype}))
    }

    fn float_array(&mut self, class: &str, values: impl Iterator<Item = f64>) -> Result<String> {
        let raw: Vec<u8> = values.flat_map(f64::to_le_bytes).collect();
        let array = self.block(&raw, "<f8")?;
        Ok(self.add(class, json!({ "array": array })))
    }

    fn int_array(&mut self, class: &str, values: impl Iterator<Item = i64>) -> Result<String> {
        let raw: Vec<u8> = values.flat_map(i64::to_le_bytes).collect();
        let array = self.block(&raw, "<i8")?;
        Ok(self.add(class, json!({ "array": array })))
    }

    fn color_array(&mut self, colors: &[Rgb]) -> String {
        self.add("ColorArray", json!({ "array": colors }))
    }

    fn project(&mut self, project: &OmfProject) -> Result<()> {
        let elements = project
            .elements
            .iter()
            .map(|element| self.element(element))
            .collect::<Result<Vec<_>>>()?;
        let key = self.add_with_uid(
            project.uid,
            "Project",
            json!({
                "name": project.name,
                "description": project.description,
                "author": project.author,
                "revision": project.revision,
                "units": project.units,
                "origin": project.origin,
                "elements": elements,
            }),
        );
        if let Some(Value::Object(object)) = self.dict.get_mut(&key) {
            object.insert("date_created".to_string(), json!(format_date(&project.date_created)));
            object.insert(
                "date_modified".to_string(),
                json!(format_date(&project.date_modified)),
            );
        }
        Ok(())
    }

    fn element(&mut self, element: &OmfElement) -> Result<String> {
        let geometry = self.geometry(&element.geometry)?;
        let data = element
            .data
            .iter()
            .map(|data| self.data(data))
            .collect::<Result<Vec<_>>>()?;
        let mut fields = json!({
            "name": element.name,
            "description": element.description,
            "subtype": element.subtype,
            "color": element.color,
            "geometry": geometry,
            "data": data,
        });
        if matches!(
            element.geometry,
            Geometry::PointSet { .. } | Geometry::Surface { .. } | Geometry::SurfaceGrid { .. }
        ) {
            let textures = element
                .textures
                .iter()
                .map(|texture| self.texture(texture))
                .collect::<Result<Vec<_>>>()?;
            fields["textures"] = json!(textures);
        }
        Ok(self.add(element.geometry.element_class(), fields))
    }

    fn geometry(&mut self, geometry: &Geometry) -> Result<String> {
        let fields = match geometry {
            Geometry::PointSet { origin, vertices } => {
                let vertices = self.vectors(vertices)?;
                json!({"origin": origin, "vertices": vertices})
            }
            Geometry::LineSet {
                origin,
                vertices,
                segments,
            } => {
                let vertices = self.vectors(vertices)?;
                let segments =
                    self.int_array("Int2Array", segments.iter().flatten().copied())?;
                json!({"origin": origin, "vertices": vertices, "segments": segments})
            }
            Geometry::Surface {
                origin,
                vertices,
                triangles,
            } => {
                let vertices = self.vectors(vertices)?;
                let triangles =
                    self.int_array("Int3Array", triangles.iter().flatten().copied())?;
                json!({"origin": origin, "vertices": vertices, "triangles": triangles})
            }
            Geometry::SurfaceGrid {
                origin,
                tensor_u,
                tensor_v,
                axis_u,
                axis_v,
                offset_w,
            } => {
                let offset_w = match offset_w {
                    Some(values) => {
                        Some(self.float_array("ScalarArray", values.iter().copied())?)
                    }
                    None => None,
                };
                json!({
                    "origin": origin,
                    "tensor_u": tensor_u,
                    "tensor_v": tensor_v,
                    "axis_u": axis_u,
                    "axis_v": axis_v,
                    "offset_w": offset_w,
                })
            }
            Geometry::VolumeGrid {
                origin,
                tensor_u,
                tensor_v,
                tensor_w,
                axis_u,
                axis_v,
                axis_w,
            } => json!({
                "origin": origin,
                "tensor_u": tensor_u,
                "tensor_v": tensor_v,
                "tensor_w": tensor_w,
                "axis_u": axis_u,
                "axis_v": axis_v,
                "axis_w": axis_w,
            }),
        };
        Ok(self.add(geometry.class_name(), fields))
    }

    fn vectors(&mut self, vectors: &[Vector3]) -> Result<String> {
        self.float_array("Vector3Array", vectors.iter().flatten().copied())
    }

    fn data(&mut self, data: &OmfData) -> Result<String> {
        let mut fields = json!({
            "name": data.name,
            "description": data.description,
            "location": data.location,
        });
        match &data.values {
            DataValues::Scalar { array, colormap } => {
                fields["array"] = json!(self.float_array("ScalarArray", array.iter().copied())?);
                fields["colormap"] = match colormap {
                    Some(colormap) => {
                        let gradient = self.color_array(&colormap.gradient);
                        json!(self.add(
                            "ScalarColormap",
                            json!({"gradient": gradient, "limits": colormap.limits}),
                        ))
                    }
                    None => Value::Null,
                };
            }
            DataValues::Mapped { indices, legends } => {
                fields["array"] = json!(self.int_array("ScalarArray", indices.iter().copied())?);
                let legends = legends
                    .iter()
                    .map(|legend| self.legend(legend))
                    .collect::<Result<Vec<_>>>()?;
                fields["legends"] = json!(legends);
            }
            DataValues::Vector2(values) => {
                fields["array"] = json!(
                    self.float_array("Vector2Array", values.iter().flatten().copied())?
                );
            }
            DataValues::Vector3(values) => {
                fields["array"] = json!(self.vectors(values)?);
            }
            DataValues::Color(values) => {
                fields["array"] = json!(self.color_array(values));
            }
            DataValues::String(values) => {
                fields["array"] = json!(self.add("StringArray", json!({ "array": values })));
            }
            DataValues::DateTime(values) => {
                fields["array"] = json!(self.add("DateTimeArray", json!({ "array": values })));
            }
        }
        Ok(self.add(data.values.class_name(), fields))
    }

    fn legend(&mut self, legend: &Legend) -> Result<String> {
        let values = match &legend.values {
            LegendValues::Color(colors) => self.color_array(colors),
            LegendValues::String(values) => self.add("StringArray", json!({ "array": values })),
            LegendValues::DateTime(values) => {
                self.add("DateTimeArray", json!({ "array": values }))
            }
            LegendValues::Scalar(values) => {
                self.float_array("ScalarArray", values.iter().copied())?
            }
        };
        Ok(self.add(
            "Legend",
            json!({
                "name": legend.name,
                "description": legend.description,
                "values": values,
            }),
        ))
    }

    fn texture(&mut self, texture: &ImageTexture) -> Result<String> {
        let image = self.block(&texture.image, PNG_DTYPE)?;
        Ok(self.add(
            "ImageTexture",
            json!({
                "name": texture.name,
                "description": texture.description,
                "origin": texture.origin,
                "axis_u": texture.axis_u,
                "axis_v": texture.axis_v,
                "image": image,
            }),
        ))
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses OMF v1 bytes into an [`OmfProject`]
pub struct OmfReader {
    data: Bytes,
    json_start: usize,
    root: Uuid,
    dict: Map<String, Value>,
    compressor: Box<dyn Compressor>,
}

impl OmfReader {
    /// Check the header and load the JSON dictionary
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() < HEADER_SIZE {
            return Err(ClientError::InvalidFormat(format!(
                "File is {} bytes, shorter than the OMF header",
                data.len()
            )));
        }
        if &data[..4] != OMF_MAGIC {
            return Err(ClientError::InvalidFormat(
                "Missing OMF magic number".to_string(),
            ));
        }
        let version = String::from_utf8_lossy(&data[4..36])
            .trim_end_matches('\0')
            .to_string();
        if version != OMF_VERSION {
            return Err(ClientError::UnsupportedVersion(version));
        }
        let root = Uuid::from_slice(&data[36..52])
            .map_err(|e| ClientError::InvalidFormat(format!("Invalid project uid: {}", e)))?;
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&data[52..60]);
        let json_start = u64::from_le_bytes(offset) as usize;
        if json_start < HEADER_SIZE || json_start > data.len() {
            return Err(ClientError::InvalidFormat(format!(
                "JSON offset {} outside file of {} bytes",
                json_start,
                data.len()
            )));
        }
        let dict = match serde_json::from_slice(&data[json_start..])? {
            Value::Object(dict) => dict,
            _ => {
                return Err(ClientError::InvalidFormat(
                    "OMF dictionary is not a JSON object".to_string(),
                ))
            }
        };
        Ok(Self {
            data,
            json_start,
            root,
            dict,
            compressor: get_compressor(CompressionMethod::Zlib),
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Decode the project tree
    pub fn project(&self) -> Result<OmfProject> {
        let key = self.root.hyphenated().to_string();
        let object = self
            .object(&key, &["Project"])
            .or_else(|_| self.object(&self.root.simple().to_string(), &["Project"]))
            .map_err(|_| {
                ClientError::InvalidFormat(format!("Project {} not found in dictionary", key))
            })?;
        let elements = uid_list(object, "elements")?
            .iter()
            .map(|uid| self.element(uid))
            .collect::<Result<Vec<_>>>()?;
        let now = Utc::now();
        let project = OmfProject {
            uid: self.root,
            name: text(object, "name"),
            description: text(object, "description"),
            author: text(object, "author"),
            revision: text(object, "revision"),
            units: text(object, "units"),
            date_created: date(object, "date_created")?.unwrap_or(now),
            date_modified: date(object, "date_modified")?.unwrap_or(now),
            origin: vector3(object, "origin")?.unwrap_or([0.0; 3]),
            elements,
        };
        debug!(elements = project.elements.len(), "Decoded OMF project");
        Ok(project)
    }

    fn object(&self, uid: &str, classes: &[&str]) -> Result<&Map<String, Value>> {
        let object = self
            .dict
            .get(uid)
            .and_then(Value::as_object)
            .ok_or_else(|| ClientError::InvalidFormat(format!("Missing object {}", uid)))?;
        let class = object
            .get("__class__")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !classes.contains(&class) {
            return Err(ClientError::InvalidFormat(format!(
                "Object {} is {}, expected one of {:?}",
                uid, class, classes
            )));
        }
        Ok(object)
    }

    fn class_of(&self, uid: &str) -> Result<&str> {
        self.dict
            .get(uid)
            .and_then(|object| object.get("__class__"))
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::InvalidFormat(format!("Missing object {}", uid)))
    }

    fn element(&self, uid: &str) -> Result<OmfElement> {
        let object = self.object(
            uid,
            &[
                "PointSetElement",
                "LineSetElement",
                "SurfaceElement",
                "VolumeElement",
            ],
        )?;
        let geometry = self.geometry(reference(object, "geometry")?)?;
        let data = uid_list(object, "data")?
            .iter()
            .map(|uid| self.data(uid))
            .collect::<Result<Vec<_>>>()?;
        let textures = uid_list(object, "textures")?
            .iter()
            .map(|uid| self.texture(uid))
            .collect::<Result<Vec<_>>>()?;
        let subtype = match object.get("subtype").and_then(Value::as_str) {
            Some(subtype) => subtype.to_string(),
            None => geometry.subtypes()[0].to_string(),
        };
        Ok(OmfElement {
            name: text(object, "name"),
            description: text(object, "description"),
            subtype,
            color: object
                .get("color")
                .filter(|v| !v.is_null())
                .map(parse_color)
                .transpose()?,
            geometry,
            data,
            textures,
        })
    }

    fn geometry(&self, uid: &str) -> Result<Geometry> {
        let class = self.class_of(uid)?;
        let object = self.object(uid, &[class])?;
        let origin = vector3(object, "origin")?.unwrap_or([0.0; 3]);
        let geometry = match class {
            "PointSetGeometry" => Geometry::PointSet {
                origin,
                vertices: self.vectors(reference(object, "vertices")?)?,
            },
            "LineSetGeometry" => Geometry::LineSet {
                origin,
                vertices: self.vectors(reference(object, "vertices")?)?,
                segments: rows(&self.ints(reference(object, "segments")?)?)?,
            },
            "SurfaceGeometry" => Geometry::Surface {
                origin,
                vertices: self.vectors(reference(object, "vertices")?)?,
                triangles: rows(&self.ints(reference(object, "triangles")?)?)?,
            },
            "SurfaceGridGeometry" => Geometry::SurfaceGrid {
                origin,
                tensor_u: floats(object, "tensor_u")?,
                tensor_v: floats(object, "tensor_v")?,
                axis_u: vector3(object, "axis_u")?.unwrap_or([1.0, 0.0, 0.0]),
                axis_v: vector3(object, "axis_v")?.unwrap_or([0.0, 1.0, 0.0]),
                offset_w: match object.get("offset_w").and_then(Value::as_str) {
                    Some(uid) => Some(self.floats(uid)?),
                    None => None,
                },
            },
            "VolumeGridGeometry" => Geometry::VolumeGrid {
                origin,
                tensor_u: floats(object, "tensor_u")?,
                tensor_v: floats(object, "tensor_v")?,
                tensor_w: floats(object, "tensor_w")?,
                axis_u: vector3(object, "axis_u")?.unwrap_or([1.0, 0.0, 0.0]),
                axis_v: vector3(object, "axis_v")?.unwrap_or([0.0, 1.0, 0.0]),
                axis_w: vector3(object, "axis_w")?.unwrap_or([0.0, 0.0, 1.0]),
            },
            other => {
                return Err(ClientError::InvalidFormat(format!(
                    "Unknown geometry class {}",
                    other
                )))
            }
        };
        Ok(geometry)
    }

    fn data(&self, uid: &str) -> Result<OmfData> {
        let class = self.class_of(uid)?;
        let object = self.object(uid, &[class])?;
        let array = reference(object, "array")?;
        let values = match class {
            "ScalarData" => DataValues::Scalar {
                array: self.floats(array)?,
                colormap: match object.get("colormap").and_then(Value::as_str) {
                    Some(colormap) => Some(self.colormap(colormap)?),
                    None => None,
                },
            },
            "MappedData" => DataValues::Mapped {
                indices: self.ints(array)?,
                legends: uid_list(object, "legends")?
                    .iter()
                    .map(|uid| self.legend(uid))
                    .collect::<Result<Vec<_>>>()?,
            },
            "Vector2Data" => DataValues::Vector2(rows(&self.floats(array)?)?),
            "Vector3Data" => DataValues::Vector3(self.vectors(array)?),
            "ColorData" => DataValues::Color(self.colors(array)?),
            "StringData" => DataValues::String(self.strings(array)?),
            "DateTimeData" => DataValues::DateTime(self.strings(array)?),
            other => {
                return Err(ClientError::InvalidFormat(format!(
                    "Unknown data class {}",
                    other
                )))
            }
        };
        Ok(OmfData {
            name: text(object, "name"),
            description: text(object, "description"),
            location: text(object, "location"),
            values,
        })
    }

    fn colormap(&self, uid: &str) -> Result<ScalarColormap> {
        let object = self.object(uid, &["ScalarColormap"])?;
        let limits = floats(object, "limits")?;
        if limits.len() != 2 {
            return Err(ClientError::InvalidFormat(format!(
                "Colormap limits need 2 values, found {}",
                limits.len()
            )));
        }
        Ok(ScalarColormap {
            gradient: self.colors(reference(object, "gradient")?)?,
            limits: [limits[0], limits[1]],
        })
    }

    fn legend(&self, uid: &str) -> Result<Legend> {
        let object = self.object(uid, &["Legend"])?;
        let values_uid = reference(object, "values")?;
        let values = match self.class_of(values_uid)? {
            "ColorArray" => LegendValues::Color(self.colors(values_uid)?),
            "StringArray" => LegendValues::String(self.strings(values_uid)?),
            "DateTimeArray" => LegendValues::DateTime(self.strings(values_uid)?),
            "ScalarArray" => LegendValues::Scalar(self.floats(values_uid)?),
            other => {
                return Err(ClientError::InvalidFormat(format!(
                    "Unknown legend array class {}",
                    other
                )))
            }
        };
        Ok(Legend {
            name: text(object, "name"),
            description: text(object, "description"),
            values,
        })
    }

    fn texture(&self, uid: &str) -> Result<ImageTexture> {
        let object = self.object(uid, &["ImageTexture"])?;
        let image = object
            .get("image")
            .ok_or_else(|| ClientError::MissingField("image".to_string()))?;
        let (image, dtype) = self.block(image)?;
        if dtype != PNG_DTYPE {
            return Err(ClientError::InvalidFormat(format!(
                "Unsupported image dtype {}",
                dtype
            )));
        }
        Ok(ImageTexture {
            name: text(object, "name"),
            description: text(object, "description"),
            origin: vector3(object, "origin")?.unwrap_or([0.0; 3]),
            axis_u: vector3(object, "axis_u")?.unwrap_or([1.0, 0.0, 0.0]),
            axis_v: vector3(object, "axis_v")?.unwrap_or([0.0, 1.0, 0.0]),
            image: Bytes::from(image),
        })
    }

    /// Decompress a `{start, length, dtype}` block
    fn block(&self, descriptor: &Value) -> Result<(Vec<u8>, String)> {
        let field = |name: &str| {
            descriptor
                .get(name)
                .and_then(Value::as_u64)
                .map(|v| v as usize)
                .ok_or_else(|| ClientError::InvalidFormat(format!("Block missing {}", name)))
        };
        let start = field("start")?;
        let length = field("length")?;
        let dtype = descriptor
            .get("dtype")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::InvalidFormat("Block missing dtype".to_string()))?;
        let end = start.checked_add(length).unwrap_or(usize::MAX);
        if start < HEADER_SIZE || end > self.json_start {
            return Err(ClientError::InvalidFormat(format!(
                "Block {}..{} outside binary section",
                start, end
            )));
        }
        let raw = self.compressor.decompress(&self.data[start..end])?;
        Ok((raw, dtype.to_string()))
    }

    fn numbers(&self, uid: &str) -> Result<Numbers> {
        let object = self.object(
            uid,
            &[
                "ScalarArray",
                "Vector2Array",
                "Vector3Array",
                "Int2Array",
                "Int3Array",
            ],
        )?;
        let descriptor = object
            .get("array")
            .ok_or_else(|| ClientError::MissingField("array".to_string()))?;
        if let Some(values) = descriptor.as_array() {
            let flat: Vec<f64> = values
                .iter()
                .flat_map(|v| match v {
                    Value::Array(row) => row.iter().filter_map(Value::as_f64).collect::<Vec<f64>>(),
                    other => other.as_f64().into_iter().collect::<Vec<_>>(),
                })
                .collect();
            return Ok(Numbers::Float(flat));
        }
        let (raw, dtype) = self.block(descriptor)?;
        decode_numbers(&raw, &dtype)
    }

    fn floats(&self, uid: &str) -> Result<Vec<f64>> {
        Ok(self.numbers(uid)?.into_floats())
    }

    fn ints(&self, uid: &str) -> Result<Vec<i64>> {
        self.numbers(uid)?.into_ints()
    }

    fn vectors(&self, uid: &str) -> Result<Vec<Vector3>> {
        rows(&self.floats(uid)?)
    }

    fn colors(&self, uid: &str) -> Result<Vec<Rgb>> {
        let object = self.object(uid, &["ColorArray"])?;
        object
            .get("array")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::MissingField("array".to_string()))?
            .iter()
            .map(parse_color)
            .collect()
    }

    fn strings(&self, uid: &str) -> Result<Vec<String>> {
        let object = self.object(uid, &["StringArray", "DateTimeArray"])?;
        Ok(object
            .get("array")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::MissingField("array".to_string()))?
            .iter()
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect())
    }
}

enum Numbers {
    Float(Vec<f64>),
    Int(Vec<i64>),
}

impl Numbers {
    fn into_floats(self) -> Vec<f64> {
        match self {
            Numbers::Float(values) => values,
            Numbers::Int(values) => values.into_iter().map(|v| v as f64).collect(),
        }
    }

    fn into_ints(self) -> Result<Vec<i64>> {
        match self {
            Numbers::Int(values) => Ok(values),
            Numbers::Float(values) => values
                .into_iter()
                .map(|v| {
                    if v.fract() == 0.0 && v.is_finite() {
                        Ok(v as i64)
                    } else {
                        Err(ClientError::InvalidFormat(format!(
                            "Expected integer, found {}",
                            v
                        )))
                    }
                })
                .collect(),
        }
    }
}

fn decode_numbers(raw: &[u8], dtype: &str) -> Result<Numbers> {
    macro_rules! decode {
        ($ty:ty) => {
            raw.chunks_exact(std::mem::size_of::<$ty>())
                .map(|chunk| {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(chunk);
                    <$ty>::from_le_bytes(bytes)
                })
        };
    }
    let numbers = match dtype {
        "<f8" => Numbers::Float(decode!(f64).collect()),
        "<f4" => Numbers::Float(decode!(f32).map(f64::from).collect()),
        "<i8" => Numbers::Int(decode!(i64).collect()),
        "<i4" => Numbers::Int(decode!(i32).map(i64::from).collect()),
        other => {
            return Err(ClientError::InvalidFormat(format!(
                "Unsupported array dtype {}",
                other
            )))
        }
    };
    Ok(numbers)
}

/// Split a flat array into rows of width `N`
fn rows<T: Copy + Default, const N: usize>(flat: &[T]) -> Result<Vec<[T; N]>> {
    if flat.len() % N != 0 {
        return Err(ClientError::InvalidFormat(format!(
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

fn text(object: &Map<String, Value>, field: &str) -> String {
    object
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn reference<'a>(object: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    object
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::MissingField(field.to_string()))
}

fn uid_list<'a>(object: &'a Map<String, Value>, field: &str) -> Result<Vec<&'a str>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str().ok_or_else(|| {
                    ClientError::InvalidFormat(format!("{} must hold uid strings", field))
                })
            })
            .collect(),
        Some(_) => Err(ClientError::InvalidFormat(format!(
            "{} must be a list",
            field
        ))),
    }
}

fn floats(object: &Map<String, Value>, field: &str) -> Result<Vec<f64>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => Ok(serde_json::from_value(value.clone())?),
    }
}

fn vector3(object: &Map<String, Value>, field: &str) -> Result<Option<Vector3>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
    }
}

fn date(object: &Map<String, Value>, field: &str) -> Result<Option<DateTime<Utc>>> {
    match object.get(field).and_then(Value::as_str) {
        None => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|date| Some(date.with_timezone(&Utc)))
            .map_err(|e| ClientError::InvalidFormat(format!("Invalid {}: {}", field, e))),
    }
}

/// Colors are `[r, g, b]` lists, but hex and named strings are accepted
fn parse_color(value: &Value) -> Result<Rgb> {
    if let Ok(rgb) = serde_json::from_value::<Rgb>(value.clone()) {
        return Ok(rgb);
    }
    value
        .as_str()
        .and_then(|text| text.parse::<Color>().ok())
        .and_then(|color| color.as_rgb())
        .ok_or_else(|| ClientError::InvalidFormat(format!("Invalid color {}", value)))
}
