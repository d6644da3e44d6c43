//! Session tests against a mock LF View API
//!
//! Every request the client makes is answered by an `httpmock` server, so
//! these tests cover URL building, headers and the upload/download
//! protocol without network access.

#![cfg(feature = "http-client")]

use httpmock::prelude::*;
use httpmock::Method::PATCH;
use lfview_client::resources::{ElementLineSet, ElementPointSet, View};
use lfview_client::scene::{PlotView, Scene};
use lfview_client::{
    Array, ArrayData, ArrayDtype, ClientError, DownloadOptions, Feedback, Pointer, Resource,
    ResourceGraph, Session, Slide, SlideOptions, UploadOptions,
};
use serde_json::json;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake image body";

/// Start a session logged in as `org1` with the `default` project
async fn login(server: &MockServer) -> Session {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/user")
                .header("authorization", "bearer my_key");
            then.status(200).json_body(json!({"uid": "org1"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/project/org1/default");
            then.status(200).json_body(json!({}));
        })
        .await;
    Session::new("my_key", server.base_url())
        .await
        .expect("Failed to log in")
}

fn points() -> (ResourceGraph, uuid::Uuid, uuid::Uuid) {
    let mut graph = ResourceGraph::new();
    let vertices = graph.insert(Array::from_vectors(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
    ]));
    let element = graph.insert(Resource::PointSet(ElementPointSet {
        name: Some("pts".to_string()),
        description: None,
        vertices: Pointer::Local(vertices),
        data: Vec::new(),
        defaults: Default::default(),
    }));
    (graph, vertices, element)
}

#[tokio::test]
async fn test_login() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;

    assert_eq!(session.org(), "org1");
    assert_eq!(session.project(), "default");
    assert_eq!(session.endpoint(), server.base_url());
    println!("✓ Logged in as {}/{}", session.org(), session.project());
}

#[tokio::test]
async fn test_login_sends_source_header() {
    let server = MockServer::start_async().await;
    let user = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/user")
                .header_exists("source");
            then.status(200).json_body(json!({"uid": "org1"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/project/org1/default");
            then.status(200);
        })
        .await;

    Session::new("my_key", server.base_url())
        .await
        .expect("Failed to log in");
    user.assert_async().await;
}

#[tokio::test]
async fn test_login_invalid_key() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/user");
            then.status(401).json_body(json!({"reason": "unauthorized"}));
        })
        .await;

    let result = Session::new("bad_key", server.base_url()).await;
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_login_invalid_project() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/user");
            then.status(200).json_body(json!({"uid": "org1"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/project/org1/default");
            then.status(404);
        })
        .await;

    let result = Session::new("my_key", server.base_url()).await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
}

#[tokio::test]
async fn test_login_requires_key() {
    let result = Session::new("", "https://example.com").await;
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_create_org_and_project() {
    let server = MockServer::start_async().await;
    let mut session = login(&server).await;
    let org = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/orgs")
                .json_body(json!({"slug": "neworg", "name": "New", "description": ""}));
            then.status(201).json_body(json!({"slug": "neworg"}));
        })
        .await;
    let project = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/orgs/neworg/projects")
                .json_body_partial(r#"{"slug": "newproj"}"#);
            then.status(201).json_body(json!({"slug": "newproj"}));
        })
        .await;

    session
        .create_org("neworg", Some("New"), None)
        .await
        .expect("Failed to create org");
    session
        .create_project("newproj", None, None)
        .await
        .expect("Failed to create project");

    org.assert_async().await;
    project.assert_async().await;
    assert_eq!(session.org(), "neworg");
    assert_eq!(session.project(), "newproj");
}

#[tokio::test]
async fn test_upload_pointset() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let array_url = server.url("/api/v1/project/org1/default/files/array/arr1");
    let element_url = server.url("/api/v1/project/org1/default/elements/pointset/pts1");

    let post_array = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/project/org1/default/files/array")
                .json_body_partial(
                    r#"{"shape": [3, 3], "dtype": "Float64Array", "content_length": 72}"#,
                );
            then.status(201).json_body(json!({
                "links": {"self": array_url, "location": server.url("/blob/arr1")}
            }));
        })
        .await;
    let put_array = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/blob/arr1")
                .header("content-range", "bytes 0-71/72")
                .header("content-type", "application/octet-stream");
            then.status(200);
        })
        .await;
    let post_element = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/project/org1/default/elements/pointset")
                .json_body_partial(json!({"vertices": array_url}).to_string());
            then.status(201)
                .json_body(json!({"links": {"self": element_url}}));
        })
        .await;

    let (mut graph, vertices, element) = points();
    let url = session
        .upload(&mut graph, element, UploadOptions::default())
        .await
        .expect("Failed to upload point set");

    assert_eq!(url, element_url);
    assert_eq!(graph.url(vertices), Some(array_url.as_str()));
    assert!(graph.is_uploaded(&Pointer::Local(element)));

    // Nothing changed, nothing is sent again
    session
        .upload(&mut graph, element, UploadOptions::default())
        .await
        .expect("Failed to repeat upload");
    post_array.assert_async().await;
    put_array.assert_async().await;
    post_element.assert_async().await;
    println!("✓ Uploaded point set to {}", url);
}

#[tokio::test]
async fn test_upload_touched_resource_patches() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let array_url = server.url("/api/v1/project/org1/default/files/array/arr1");
    let element_url = server.url("/api/v1/project/org1/default/elements/pointset/pts1");

    let (mut graph, vertices, element) = points();
    graph
        .mark_uploaded(vertices, &array_url)
        .expect("Failed to mark array");
    graph
        .mark_uploaded(element, &element_url)
        .expect("Failed to mark element");
    if let Some(Resource::PointSet(pts)) = graph.get_mut(element) {
        pts.name = Some("renamed".to_string());
    }

    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/api/v1/project/org1/default/elements/pointset/pts1")
                .json_body_partial(r#"{"name": "renamed"}"#);
            then.status(200)
                .json_body(json!({"links": {"self": element_url}}));
        })
        .await;
    let post_array = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/project/org1/default/files/array");
            then.status(500);
        })
        .await;

    let url = session
        .upload(&mut graph, element, UploadOptions::default().sequential())
        .await
        .expect("Failed to patch point set");

    assert_eq!(url, element_url);
    patch.assert_async().await;
    assert_eq!(post_array.hits_async().await, 0);
}

#[tokio::test]
async fn test_failed_upload_keeps_finished_siblings() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let vertices_url = server.url("/api/v1/project/org1/default/files/array/verts");
    let segments_url = server.url("/api/v1/project/org1/default/files/array/segs");
    let element_url = server.url("/api/v1/project/org1/default/elements/lineset/lines");

    let post_vertices = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/project/org1/default/files/array")
                .json_body_partial(r#"{"dtype": "Float64Array"}"#);
            then.status(201).json_body(json!({
                "links": {"self": vertices_url, "location": server.url("/blob/verts")}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/blob/verts");
            then.status(200);
        })
        .await;
    let mut post_segments = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/project/org1/default/files/array")
                .json_body_partial(r#"{"dtype": "Uint32Array"}"#);
            then.status(500).body("server error");
        })
        .await;

    let mut graph = ResourceGraph::new();
    let vertices = graph.insert(Array::from_vectors(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
    ]));
    let segments = graph.insert(Array::from_indices(&[[0u32, 1], [1, 2]]));
    let element = graph.insert(Resource::LineSet(ElementLineSet {
        name: Some("lines".to_string()),
        description: None,
        vertices: Pointer::Local(vertices),
        segments: Pointer::Local(segments),
        data: Vec::new(),
        defaults: Default::default(),
    }));

    let result = session
        .upload(&mut graph, element, UploadOptions::default().with_workers(2))
        .await;
    assert!(matches!(result, Err(ClientError::Api { status: 500, .. })));
    assert_eq!(graph.url(vertices), Some(vertices_url.as_str()));
    assert_eq!(graph.url(segments), None);
    assert_eq!(graph.url(element), None);

    post_segments.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/project/org1/default/files/array")
                .json_body_partial(r#"{"dtype": "Uint32Array"}"#);
            then.status(201).json_body(json!({
                "links": {"self": segments_url, "location": server.url("/blob/segs")}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/blob/segs");
            then.status(200);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/project/org1/default/elements/lineset");
            then.status(201)
                .json_body(json!({"links": {"self": element_url}}));
        })
        .await;

    let url = session
        .upload(&mut graph, element, UploadOptions::default().with_workers(2))
        .await
        .expect("Failed to retry upload");
    assert_eq!(url, element_url);
    post_vertices.assert_async().await;
}

#[tokio::test]
async fn test_upload_in_chunks() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let first = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/blob/data")
                .header("content-range", "bytes 0-3/10");
            then.status(200);
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/blob/data")
                .header("content-range", "bytes 4-7/10");
            then.status(200);
        })
        .await;
    let last = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/blob/data")
                .header("content-range", "bytes 8-9/10");
            then.status(200);
        })
        .await;

    session
        .upload_file(
            &server.url("/blob/data"),
            bytes::Bytes::from_static(b"0123456789"),
            "application/octet-stream",
            4,
        )
        .await
        .expect("Failed to upload chunks");

    first.assert_async().await;
    second.assert_async().await;
    last.assert_async().await;
}

#[tokio::test]
async fn test_upload_rejects_invalid_input() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;

    let mut graph = ResourceGraph::new();
    let empty = graph.insert(Array {
        shape: vec![3],
        dtype: ArrayDtype::Float64Array,
        array: None,
    });
    let result = session
        .upload(&mut graph, empty, UploadOptions::default())
        .await;
    assert!(matches!(result, Err(ClientError::Validation(_))));

    let slide = graph.insert(Slide::new(Scene::default()));
    let result = session
        .upload(&mut graph, slide, UploadOptions::default())
        .await;
    assert!(matches!(result, Err(ClientError::UnsupportedResource(_))));
}

#[tokio::test]
async fn test_upload_view_with_thumbnail() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let view_url = server.url("/api/v1/project/org1/default/views/view1");

    let post_view = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/project/org1/default/views")
                .json_body_partial(r#"{"name": "My View", "elements": [], "contents": []}"#);
            then.status(201).json_body(json!({
                "links": {"self": view_url, "thumbnail": server.url("/thumb/view1")}
            }));
        })
        .await;
    let put_thumbnail = server
        .mock_async(|when, then| {
            when.method(PUT).path("/thumb/view1");
            then.status(200)
                .json_body(json!({"links": {"location": server.url("/blob/thumb")}}));
        })
        .await;
    let put_png = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/blob/thumb")
                .header("content-type", "image/png");
            then.status(200);
        })
        .await;

    let mut graph = ResourceGraph::new();
    let view = graph.insert(View::new("My View"));
    let url = session
        .upload(
            &mut graph,
            view,
            UploadOptions::default().with_thumbnail(PNG),
        )
        .await
        .expect("Failed to upload view");

    assert_eq!(url, view_url);
    post_view.assert_async().await;
    put_thumbnail.assert_async().await;
    put_png.assert_async().await;
}

#[tokio::test]
async fn test_rejected_thumbnail_only_warns() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let view_url = server.url("/api/v1/project/org1/default/views/view1");

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/project/org1/default/views");
            then.status(201).json_body(json!({
                "links": {"self": view_url, "thumbnail": server.url("/thumb/view1")}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/thumb/view1");
            then.status(400);
        })
        .await;

    let mut graph = ResourceGraph::new();
    let view = graph.insert(View::new("My View"));
    let url = session
        .upload(
            &mut graph,
            view,
            UploadOptions::default().with_thumbnail(PNG),
        )
        .await
        .expect("Thumbnail failure should not fail the upload");
    assert_eq!(url, view_url);
}

#[tokio::test]
async fn test_download_array() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let array_url = server.url("/api/v1/project/org1/default/files/array/arr1");
    let data: Vec<u8> = [1.0f64, 2.0, 3.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/project/org1/default/files/array/arr1");
            then.status(200).json_body(json!({
                "type": "files/array",
                "shape": [3],
                "dtype": "Float64Array",
                "links": {"self": array_url, "location": server.url("/blob/arr1")}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/blob/arr1");
            then.status(200).body(data.clone());
        })
        .await;

    let (graph, root) = session
        .download(&array_url, DownloadOptions::default())
        .await
        .expect("Failed to download array");

    let array = graph.resolve_array(&root).expect("Failed to resolve array");
    assert_eq!(array.array, Some(ArrayData::Float64(vec![1.0, 2.0, 3.0])));
    let uid = root.as_local().expect("Root should be local");
    assert_eq!(graph.url(uid), Some(array_url.as_str()));
    assert!(graph.is_uploaded(&root));
}

#[tokio::test]
async fn test_download_view_recursive() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let view_url = server.url("/api/v1/project/org1/default/views/view1");
    let element_url = server.url("/api/v1/project/org1/default/elements/pointset/pts1");
    let array_url = server.url("/api/v1/project/org1/default/files/array/arr1");

    let get_view = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/project/org1/default/views/view1");
            then.status(200).json_body(json!({
                "type": "views",
                "name": "remote",
                "elements": [element_url],
                "contents": [element_url, array_url],
                "links": {"self": view_url}
            }));
        })
        .await;
    let get_element = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/project/org1/default/elements/pointset/pts1");
            then.status(200).json_body(json!({
                "type": "elements/pointset",
                "name": "pts",
                "vertices": array_url,
                "data": [],
                "defaults": {}
            }));
        })
        .await;
    let get_array = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/project/org1/default/files/array/arr1");
            then.status(200).json_body(json!({
                "type": "files/array",
                "shape": [1, 3],
                "dtype": "Float64Array",
                "links": {"location": server.url("/blob/arr1")}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/blob/arr1");
            then.status(200).body(vec![0u8; 24]);
        })
        .await;

    let (graph, root) = session
        .download(&view_url, DownloadOptions::default())
        .await
        .expect("Failed to download view");

    get_view.assert_async().await;
    get_element.assert_async().await;
    get_array.assert_async().await;
    assert_eq!(graph.len(), 3);

    let view = match graph.resolve(&root).expect("Failed to resolve view") {
        Resource::View(view) => view.clone(),
        other => panic!("Expected view, found {}", other.kind()),
    };
    assert_eq!(view.name.as_deref(), Some("remote"));
    let element = view.elements[0]
        .as_local()
        .expect("Element pointer should be linked");
    match graph.get(element) {
        Some(Resource::PointSet(pts)) => {
            assert!(pts.vertices.as_local().is_some());
            assert_eq!(
                graph.pointer_url(&pts.vertices).expect("Array should have a URL"),
                array_url
            );
        }
        other => panic!("Expected point set, found {:?}", other),
    }
    println!("✓ Downloaded view with {} resources", graph.len());
}

#[tokio::test]
async fn test_download_copy_has_no_urls() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let view_url = server.url("/api/v1/project/org1/default/views/view1");

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/project/org1/default/views/view1");
            then.status(200)
                .json_body(json!({"type": "views", "elements": [], "contents": []}));
        })
        .await;

    let options = DownloadOptions {
        copy: true,
        ..DownloadOptions::default()
    };
    let (graph, root) = session
        .download(&view_url, options)
        .await
        .expect("Failed to download view");

    let uid = root.as_local().expect("Root should be local");
    assert_eq!(graph.url(uid), None);
    assert!(!graph.is_uploaded(&root));
}

#[tokio::test]
async fn test_download_app_url_falls_back_to_view_copy() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let app_url = server.url("/app/org2/proj2/view2");
    let element_url = server.url("/api/v1/view/org2/proj2/view2/elements/pointset/pts1");
    let data_url = server.url("/api/v1/view/org2/proj2/view2/data/basic/dat1");

    let project = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/project/org2/proj2/views/view2");
            then.status(403);
        })
        .await;
    let view = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/view/org2/proj2/view2");
            then.status(200).json_body(json!({
                "name": "shared",
                "contents": [element_url, data_url]
            }));
        })
        .await;

    let options = DownloadOptions {
        recursive: false,
        ..DownloadOptions::default()
    };
    let (graph, root) = session
        .download(&app_url, options)
        .await
        .expect("Failed to download shared view");

    project.assert_async().await;
    view.assert_async().await;
    let uid = root.as_local().expect("Root should be local");
    assert_eq!(graph.url(uid), None);
    match graph.get(uid) {
        Some(Resource::View(view)) => {
            assert_eq!(view.elements, vec![Pointer::Url(element_url.clone())]);
            assert_eq!(view.contents.len(), 2);
        }
        other => panic!("Expected view, found {:?}", other),
    }
}

#[tokio::test]
async fn test_download_allow_failure() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let missing = server.url("/api/v1/project/org1/default/files/array/gone");

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/project/org1/default/files/array/gone");
            then.status(404);
        })
        .await;

    let result = session.download(&missing, DownloadOptions::default()).await;
    assert!(matches!(result, Err(ClientError::Api { status: 404, .. })));

    let options = DownloadOptions {
        allow_failure: true,
        ..DownloadOptions::default()
    };
    let (graph, root) = session
        .download(&missing, options)
        .await
        .expect("Failure should be allowed");
    assert!(graph.is_empty());
    assert_eq!(root, Pointer::Url(missing));
}

#[tokio::test]
async fn test_upload_slide() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let view_url = server.url("/api/v1/view/org1/proj1/view1");
    let element_url = format!("{}/elements/pointset/pts1", view_url);
    let slide_url = format!("{}/slides/slide1", view_url);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/view/org1/proj1/view1");
            then.status(200).json_body(json!({
                "type": "views",
                "elements": [element_url],
                "contents": [element_url]
            }));
        })
        .await;
    let post_slide = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/view/org1/proj1/view1/slides");
            then.status(201)
                .json_body(json!({"links": {"self": slide_url}}));
        })
        .await;

    let mut scene = Scene::default();
    scene.plots[0]
        .views
        .push(PlotView::new(Pointer::Url(element_url.clone())));
    let mut graph = ResourceGraph::new();
    let slide = graph.insert(Slide::new(scene));

    let url = session
        .upload_slide(&mut graph, slide, Some(&view_url), SlideOptions::default())
        .await
        .expect("Failed to upload slide");

    assert_eq!(url, slide_url);
    post_slide.assert_async().await;
    match graph.get(slide) {
        Some(Resource::Slide(slide)) => assert!(slide.annotation_plane.is_some()),
        other => panic!("Expected slide, found {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_slide_must_plot_every_element() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let view_url = server.url("/api/v1/view/org1/proj1/view1");
    let element_url = format!("{}/elements/pointset/pts1", view_url);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/view/org1/proj1/view1");
            then.status(200).json_body(json!({
                "type": "views",
                "elements": [element_url],
                "contents": [element_url]
            }));
        })
        .await;
    let post_slide = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/view/org1/proj1/view1/slides");
            then.status(201);
        })
        .await;

    let mut graph = ResourceGraph::new();
    let slide = graph.insert(Slide::new(Scene::default()));

    let result = session
        .upload_slide(&mut graph, slide, Some(&view_url), SlideOptions::default())
        .await;
    assert!(matches!(result, Err(ClientError::Validation(_))));

    let result = session
        .upload_slide(&mut graph, slide, None, SlideOptions::default())
        .await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert_eq!(post_slide.hits_async().await, 0);
}

#[tokio::test]
async fn test_post_comment() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let slide_url = server.url("/api/v1/view/org1/proj1/view1/slides/slide1");
    let feedback_url = format!("{}/feedback/fb1", slide_url);

    let post = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/view/org1/proj1/view1/slides/slide1/feedback")
                .json_body(json!({"comment": "Looks good"}));
            then.status(201)
                .json_body(json!({"links": {"self": feedback_url}}));
        })
        .await;

    let url = session
        .post_comment(&slide_url, "Looks good")
        .await
        .expect("Failed to post comment");
    assert_eq!(url, feedback_url);
    post.assert_async().await;

    let result = session
        .post_comment(&server.url("/api/v1/view/org1/proj1/view1"), "Looks good")
        .await;
    assert!(matches!(result, Err(ClientError::InvalidUrl(_))));

    let mut graph = ResourceGraph::new();
    let feedback = graph.insert(Feedback::new("No slide"));
    let result = session.upload_feedback(&mut graph, feedback, None).await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
}

#[tokio::test]
async fn test_invite_to_view() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let view_url = server.url("/api/v1/view/org1/proj1/view1");

    let invite = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/view/org1/proj1/view1/invites")
                .json_body(json!({
                    "email": "someone@example.com",
                    "roles": ["view.spectator"],
                    "send_email": false
                }));
            then.status(200).json_body(json!({}));
        })
        .await;

    session
        .invite_to_view(&view_url, "someone@example.com", "view.spectator", false, None)
        .await
        .expect("Failed to invite");
    invite.assert_async().await;

    let result = session
        .invite_to_view(&view_url, "someone@example.com", "view.owner", false, None)
        .await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert_eq!(invite.hits_async().await, 1);
}

#[tokio::test]
async fn test_delete() {
    let server = MockServer::start_async().await;
    let session = login(&server).await;
    let array_url = server.url("/api/v1/project/org1/default/files/array/arr1");

    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/api/v1/project/org1/default/files/array/arr1");
            then.status(204);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/api/v1/project/org1/default/files/array/gone");
            then.status(404);
        })
        .await;

    let mut graph = ResourceGraph::new();
    let uid = graph.insert_remote(Resource::Array(Array::from_f64(vec![1.0])), &array_url);
    session
        .delete_resource(&mut graph, uid)
        .await
        .expect("Failed to delete array");
    delete.assert_async().await;
    assert_eq!(graph.url(uid), None);
    assert!(graph.contains(uid));

    let result = session
        .delete(&server.url("/api/v1/project/org1/default/files/array/gone"))
        .await;
    assert!(matches!(result, Err(ClientError::Api { status: 404, .. })));

    let result = session.delete_resource(&mut graph, uid).await;
    assert!(matches!(result, Err(ClientError::NotUploaded(_))));
}
