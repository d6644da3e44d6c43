//! Integration tests converting OMF files to Views and back
//!
//! Projects are written to temporary OMF files, converted into resource
//! graphs and checked the way the web viewer would see them.

use lfview_client::files::PNG_SIGNATURE;
use lfview_client::resources::MappingValue;
use lfview_client::omf::{
    read_omf, write_omf, DataValues, Geometry, ImageTexture, Legend, LegendValues, OmfData,
    OmfElement, OmfProject, ScalarColormap,
};
use lfview_client::{
    omf_to_view, omf_to_view_bytes, view_to_omf, view_to_omf_bytes, ClientError, Color,
    Resource, ResourceGraph, ResourceKind,
};
use tempfile::TempDir;
use uuid::Uuid;

fn view_from_project(project: &OmfProject) -> (ResourceGraph, Uuid) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("temp.omf");
    write_omf(project, &path).expect("Failed to write OMF file");
    let (graph, view) = omf_to_view(&path).expect("Failed to convert OMF file");
    graph.validate_all(view).expect("Converted view is invalid");
    (graph, view)
}

fn contents(graph: &ResourceGraph, view: Uuid) -> Vec<Uuid> {
    match graph.get(view) {
        Some(Resource::View(v)) => v.contents.iter().filter_map(|p| p.as_local()).collect(),
        other => panic!("expected view, found {:?}", other),
    }
}

fn find(graph: &ResourceGraph, view: Uuid, kind: ResourceKind) -> Uuid {
    contents(graph, view)
        .into_iter()
        .find(|uid| graph.get(*uid).map(Resource::kind) == Some(kind))
        .unwrap_or_else(|| panic!("no {} in view contents", kind))
}

fn first_vertex(graph: &ResourceGraph, pointer: &lfview_client::Pointer) -> Vec<f64> {
    let array = graph.resolve_array(pointer).unwrap();
    array.array.as_ref().unwrap().to_f64_vec()[..3].to_vec()
}

fn vertices() -> Vec<[f64; 3]> {
    (0..10)
        .map(|i| [i as f64 / 3.0, i as f64 / 4.0, i as f64 / 5.0])
        .collect()
}

fn unit_grid(offset_w: Option<Vec<f64>>) -> Geometry {
    Geometry::SurfaceGrid {
        origin: [0.0; 3],
        tensor_u: vec![1.0; 5],
        tensor_v: vec![1.0; 5],
        axis_u: [1.0, 0.0, 0.0],
        axis_v: [0.0, 1.0, 0.0],
        offset_w,
    }
}

fn named(name: &str, geometry: Geometry) -> OmfElement {
    let mut element = OmfElement::new(name, geometry);
    element.description = "my desc".to_string();
    element.color = Some([255, 0, 0]);
    element
}

#[test]
fn test_empty_project() {
    let mut project = OmfProject::new("my proj");
    project.description = "my desc".to_string();
    let (graph, view) = view_from_project(&project);

    match graph.get(view) {
        Some(Resource::View(v)) => {
            assert_eq!(v.name.as_deref(), Some("my proj"));
            assert_eq!(v.description.as_deref(), Some("my desc"));
            assert!(v.contents.is_empty());
            assert!(v.elements.is_empty());
        }
        other => panic!("expected view, found {:?}", other),
    }
}

#[test]
fn test_points_are_offset_by_origins() {
    let mut project = OmfProject::new("");
    project.origin = [5.0, 5.0, 5.0];
    project.elements.push(named(
        "my elem",
        Geometry::PointSet {
            origin: [5.0, 5.0, 5.0],
            vertices: vertices(),
        },
    ));
    let (graph, view) = view_from_project(&project);
    assert_eq!(contents(&graph, view).len(), 2);

    let points = find(&graph, view, ResourceKind::PointSet);
    match graph.get(points) {
        Some(Resource::PointSet(e)) => {
            assert_eq!(e.name.as_deref(), Some("my elem"));
            assert_eq!(e.description.as_deref(), Some("my desc"));
            assert_eq!(e.defaults.color().map(|c| c.to_hex()).as_deref(), Some("#FF0000"));
            assert_eq!(first_vertex(&graph, &e.vertices), vec![10.0, 10.0, 10.0]);
        }
        other => panic!("expected point set, found {:?}", other),
    }
}

#[test]
fn test_lines_and_boreholes() {
    for (subtype, tubes) in [("line", false), ("borehole", true)] {
        let mut project = OmfProject::new("");
        project.origin = [5.0, 5.0, 5.0];
        let mut lines = named(
            "my elem",
            Geometry::LineSet {
                origin: [5.0, 5.0, 5.0],
                vertices: vertices(),
                segments: (0..9).map(|i| [i, i + 1]).collect(),
            },
        );
        lines.subtype = subtype.to_string();
        project.elements.push(lines);

        let (graph, view) = view_from_project(&project);
        assert_eq!(contents(&graph, view).len(), 3);
        match graph.get(find(&graph, view, ResourceKind::LineSet)) {
            Some(Resource::LineSet(e)) => {
                assert_eq!(e.is_tubes(), tubes, "subtype {}", subtype);
                if tubes {
                    assert_eq!(e.defaults.radius.as_ref().map(|r| r.value), Some(10.0));
                }
                assert_eq!(e.defaults.color(), Some(Color::rgb(255, 0, 0)));
                assert_eq!(first_vertex(&graph, &e.vertices), vec![10.0, 10.0, 10.0]);
            }
            other => panic!("expected line set, found {:?}", other),
        }
    }
}

#[test]
fn test_surfaces_and_grids() {
    let mut project = OmfProject::new("");
    project.origin = [5.0, 5.0, 5.0];
    project.elements.push(named(
        "my elem",
        Geometry::Surface {
            origin: [5.0, 5.0, 5.0],
            vertices: vertices(),
            triangles: (0..8).map(|i| [i, i + 1, i + 2]).collect(),
        },
    ));
    let mut grid = named("my elem", unit_grid(Some(vec![1.0; 36])));
    if let Geometry::SurfaceGrid { origin, .. } = &mut grid.geometry {
        *origin = [5.0, 5.0, 5.0];
    }
    project.elements.push(grid);

    let (graph, view) = view_from_project(&project);
    assert_eq!(contents(&graph, view).len(), 5);

    match graph.get(find(&graph, view, ResourceKind::Surface)) {
        Some(Resource::Surface(e)) => {
            assert_eq!(first_vertex(&graph, &e.vertices), vec![10.0, 10.0, 10.0]);
            assert_eq!(e.defaults.color(), Some(Color::rgb(255, 0, 0)));
        }
        other => panic!("expected surface, found {:?}", other),
    }
    match graph.get(find(&graph, view, ResourceKind::SurfaceGrid)) {
        Some(Resource::SurfaceGrid(e)) => {
            assert_eq!(e.origin, [10.0, 10.0, 10.0]);
            assert!(e.offset_w.is_some());
            assert_eq!(e.name.as_deref(), Some("my elem"));
        }
        other => panic!("expected surface grid, found {:?}", other),
    }
}

#[test]
fn test_volume_grid() {
    let mut project = OmfProject::new("");
    project.origin = [5.0, 5.0, 5.0];
    project.elements.push(named(
        "my elem",
        Geometry::VolumeGrid {
            origin: [5.0, 5.0, 5.0],
            tensor_u: vec![1.0; 5],
            tensor_v: vec![1.0; 5],
            tensor_w: vec![1.0; 5],
            axis_u: [1.0, 0.0, 0.0],
            axis_v: [0.0, 1.0, 0.0],
            axis_w: [0.0, 0.0, 1.0],
        },
    ));
    let (graph, view) = view_from_project(&project);
    assert_eq!(contents(&graph, view).len(), 1);
    match graph.get(find(&graph, view, ResourceKind::VolumeGrid)) {
        Some(Resource::VolumeGrid(e)) => assert_eq!(e.origin, [10.0, 10.0, 10.0]),
        other => panic!("expected volume grid, found {:?}", other),
    }
}

fn data_project() -> OmfProject {
    let values: Vec<f64> = (0..25).map(f64::from).collect();
    let mut scalar = OmfData::scalar("my data", "faces", values);
    if let DataValues::Scalar { colormap, .. } = &mut scalar.values {
        *colormap = Some(ScalarColormap {
            gradient: [[255, 0, 0], [0, 0, 255], [0, 0, 0], [255, 165, 0]].repeat(32),
            limits: [0.0, 24.0],
        });
    }
    let mapped = OmfData::mapped(
        "my data",
        "faces",
        (0..25).map(|i| i % 4).collect(),
        vec![
            Legend::new(LegendValues::Color(vec![
                [255, 255, 0],
                [0, 0, 0],
                [165, 42, 42],
                [0, 128, 0],
            ])),
            Legend::new(LegendValues::String(
                ["yellow!", "black!!", "brown!!!", "green!!!!"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )),
        ],
    );
    let mut surface = OmfElement::new("", unit_grid(None));
    surface.data = vec![scalar, mapped];
    let mut project = OmfProject::new("");
    project.elements.push(surface);
    project
}

#[test]
fn test_scalar_and_mapped_data() {
    let (graph, view) = view_from_project(&data_project());
    assert_eq!(contents(&graph, view).len(), 9);

    match graph.get(find(&graph, view, ResourceKind::MappingContinuous)) {
        Some(Resource::MappingContinuous(m)) => {
            assert_eq!(m.data_controls, vec![0.0, 24.0]);
            assert_eq!(m.gradient_controls, vec![0.0, 1.0]);
            assert_eq!(m.visibility, vec![true; 3]);
            let gradient = graph.resolve_array(&m.gradient).unwrap();
            assert_eq!(gradient.shape, vec![128, 3]);
        }
        other => panic!("expected continuous mapping, found {:?}", other),
    }
    match graph.get(find(&graph, view, ResourceKind::DataCategory)) {
        Some(Resource::DataCategory(d)) => {
            let categories = d.categories.as_ref().expect("categories set");
            match graph.resolve(categories).unwrap() {
                Resource::MappingCategory(m) => {
                    assert_eq!(m.values[0], MappingValue::from("yellow!"));
                    assert_eq!(m.indices, vec![0, 1, 2, 3]);
                }
                other => panic!("expected category mapping, found {:?}", other),
            }
            assert_eq!(d.mappings.len(), 1);
            assert!(graph.is_color_mapping(&d.mappings[0]));
        }
        other => panic!("expected category data, found {:?}", other),
    }
}

#[test]
fn test_texture() {
    let mut image = PNG_SIGNATURE.to_vec();
    image.extend_from_slice(b"\0\0\0\rIHDR\0\0\0\x0c\0\0\0\x04\x10\0\0\0\0");
    let mut surface = OmfElement::new("", unit_grid(None));
    surface.textures.push(ImageTexture {
        name: String::new(),
        description: String::new(),
        origin: [0.0; 3],
        axis_u: [5.0, 0.0, 0.0],
        axis_v: [0.0, 5.0, 0.0],
        image: image.clone().into(),
    });
    let mut project = OmfProject::new("");
    project.elements.push(surface);

    let (graph, view) = view_from_project(&project);
    assert_eq!(contents(&graph, view).len(), 3);
    match graph.get(find(&graph, view, ResourceKind::Image)) {
        Some(Resource::Image(i)) => assert_eq!(i.data.as_deref(), Some(&image[..])),
        other => panic!("expected image, found {:?}", other),
    }
}

#[test]
fn test_data_controls_span_data() {
    let mut project = data_project();
    if let DataValues::Scalar { colormap: Some(colormap), .. } =
        &mut project.elements[0].data[0].values
    {
        colormap.limits = [-100.0, 100.0];
    }
    let (graph, view) = view_from_project(&project);
    match graph.get(find(&graph, view, ResourceKind::MappingContinuous)) {
        Some(Resource::MappingContinuous(m)) => assert_eq!(m.data_controls, vec![0.0, 24.0]),
        other => panic!("expected continuous mapping, found {:?}", other),
    }
}

#[test]
fn test_view_to_omf_rejects_mismatched_gradient_controls() {
    let (mut graph, view) = view_from_project(&data_project());
    let mapping = find(&graph, view, ResourceKind::MappingContinuous);
    if let Some(Resource::MappingContinuous(m)) = graph.get_mut(mapping) {
        m.gradient_controls.clear();
    }
    let result = view_to_omf_bytes(&graph, view);
    assert!(matches!(result, Err(ClientError::Validation(_))));
}

#[test]
fn test_view_to_omf_rejects_category_index_out_of_range() {
    let (mut graph, view) = view_from_project(&data_project());
    let categories = contents(&graph, view)
        .into_iter()
        .filter(|uid| graph.get(*uid).map(Resource::kind) == Some(ResourceKind::MappingCategory))
        .collect::<Vec<_>>();
    assert_eq!(categories.len(), 2);
    if let Some(Resource::MappingCategory(m)) = graph.get_mut(categories[0]) {
        m.indices[3] = 1 << 40;
    }
    let result = view_to_omf_bytes(&graph, view);
    assert!(matches!(result, Err(ClientError::Validation(_))));
}

#[test]
fn test_unsupported_data_is_skipped() {
    let mut surface = OmfElement::new("", unit_grid(None));
    surface.data.push(OmfData {
        name: "notes".to_string(),
        description: String::new(),
        location: "faces".to_string(),
        values: DataValues::String(vec!["x".to_string(); 25]),
    });
    let mut project = OmfProject::new("");
    project.elements.push(surface);
    let (graph, view) = view_from_project(&project);
    assert_eq!(contents(&graph, view).len(), 1);
}

#[test]
fn test_view_to_omf_round_trip() {
    let (graph, view) = view_from_project(&data_project());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("view.omf");
    view_to_omf(&graph, view, &path).expect("Failed to write view");

    let project = read_omf(&path).expect("Failed to read written file");
    assert_eq!(project.elements.len(), 1);
    let element = &project.elements[0];
    assert_eq!(element.subtype, "surface");
    assert_eq!(element.data.len(), 2);
    match &element.data[0].values {
        DataValues::Scalar { array, colormap } => {
            assert_eq!(array.len(), 25);
            let colormap = colormap.as_ref().expect("colormap kept");
            assert_eq!(colormap.gradient.len(), 128);
            assert_eq!(colormap.limits, [0.0, 24.0]);
            assert_eq!(colormap.gradient[0], [255, 0, 0]);
        }
        other => panic!("expected scalar data, found {:?}", other),
    }
    match &element.data[1].values {
        DataValues::Mapped { indices, legends } => {
            assert_eq!(indices[..5], [0, 1, 2, 3, 0]);
            assert_eq!(legends.len(), 2);
            assert!(matches!(legends[0].values, LegendValues::String(_)));
            assert_eq!(
                legends[1].values,
                LegendValues::Color(vec![[255, 255, 0], [0, 0, 0], [165, 42, 42], [0, 128, 0]])
            );
        }
        other => panic!("expected mapped data, found {:?}", other),
    }
    println!("✓ View survived OMF round trip");
}

#[test]
fn test_byte_conversions() {
    let mut project = OmfProject::new("bytes");
    project.elements.push(named(
        "pts",
        Geometry::PointSet {
            origin: [0.0; 3],
            vertices: vertices(),
        },
    ));
    let bytes = lfview_client::omf::OmfWriter::new().to_bytes(&project).unwrap();
    let (graph, view) = omf_to_view_bytes(bytes).unwrap();
    let written = view_to_omf_bytes(&graph, view).unwrap();
    let (again, view_again) = omf_to_view_bytes(written).unwrap();
    assert_eq!(contents(&again, view_again).len(), 2);
}

#[test]
fn test_view_to_omf_needs_local_resources() {
    let mut graph = ResourceGraph::new();
    let mut view = lfview_client::resources::View::new("remote");
    view.elements
        .push("https://lfview.com/api/v1/view/org/proj/view/elements/pointset/abc".into());
    let uid = graph.insert(view);
    assert!(view_to_omf_bytes(&graph, uid).is_err());
}
