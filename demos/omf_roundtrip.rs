//! Example: build an OMF project, convert it to a View and back
//!
//! Run with: cargo run --example omf_roundtrip

use lfview_client::omf::{read_omf, write_omf, Geometry, OmfData, OmfElement, OmfProject};
use lfview_client::{omf_to_view, view_to_omf, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lfview_client=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    println!("OMF <-> View Round Trip");
    println!("=======================\n");

    let mut project = OmfProject::new("Demo project");
    project.origin = [100.0, 200.0, 0.0];

    let mut points = OmfElement::new(
        "Samples",
        Geometry::PointSet {
            origin: [0.0; 3],
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0]],
        },
    );
    points.color = Some([255, 128, 0]);
    points
        .data
        .push(OmfData::scalar("Grade", "vertices", vec![0.1, 0.5, 0.9, 1.3]));
    project.elements.push(points);

    project.elements.push(OmfElement::new(
        "Drillhole",
        Geometry::LineSet {
            origin: [0.0; 3],
            vertices: vec![[0.0, 0.0, 0.0], [0.0, 0.0, -10.0], [0.0, 0.0, -20.0]],
            segments: vec![[0, 1], [1, 2]],
        },
    ));

    let dir = std::env::temp_dir().join("lfview-omf-roundtrip");
    std::fs::create_dir_all(&dir)?;
    let source = dir.join("source.omf");
    write_omf(&project, &source)?;
    println!("Wrote {}", source.display());

    let (graph, view) = omf_to_view(&source)?;
    println!("View graph holds {} resources:", graph.len());
    for (_, resource) in graph.iter() {
        println!("  - {}", resource);
    }
    if let Some(Resource::View(view)) = graph.get(view) {
        println!(
            "View has {} elements and {} contents\n",
            view.elements.len(),
            view.contents.len()
        );
    }

    let target = dir.join("roundtrip.omf");
    view_to_omf(&graph, view, &target)?;
    let restored = read_omf(&target)?;
    println!("Read back {} with {} elements:", target.display(), restored.elements.len());
    for element in &restored.elements {
        println!(
            "  ✓ {} ({}, {} data)",
            element.name,
            element.geometry.class_name(),
            element.data.len()
        );
    }

    Ok(())
}
