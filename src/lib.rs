//! LF View API client
//!
//! Upload and download 3D geoscience resources (elements, data, mappings,
//! textures, views, slides) through the LF View API, and convert Views to
//! and from Open Mining Format (OMF) files.
//!
//! # Features
//!
//! - Typed resources linked through a local [`ResourceGraph`]
//! - Authenticated async [`Session`] with chunked binary uploads and
//!   level-by-level concurrent upload of resource graphs
//! - OMF v1 reader and writer
//! - `omf_to_view` / `view_to_omf` conversion
//!
//! # Example
//!
//! ```rust,ignore
//! use lfview_client::{omf_to_view, Session, UploadOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new("my-api-key", "https://lfview.com").await?;
//! let (mut graph, view) = omf_to_view("model.omf")?;
//! let url = session.upload(&mut graph, view, UploadOptions::default()).await?;
//! println!("uploaded {}", url);
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod config;
pub mod convert;
pub mod error;
pub mod files;
pub mod graph;
pub mod omf;
pub mod resources;
pub mod scene;
#[cfg(feature = "http-client")]
pub mod session;
pub mod types;
pub mod urls;
pub mod utils;

// Re-exports
pub use compression::{CompressionLevel, CompressionMethod, Compressor};
pub use config::ClientConfig;
pub use convert::{omf_to_view, omf_to_view_bytes, view_to_omf, view_to_omf_bytes};
pub use error::{ClientError, Result};
pub use files::{Array, ArrayData, Image};
pub use graph::{NodeState, ResourceGraph};
pub use resources::{Pointer, Resource, ResourceKind};
pub use scene::{Feedback, Slide};
#[cfg(feature = "http-client")]
pub use session::{DownloadOptions, Session, SlideOptions, UploadOptions};
pub use types::{ArrayDtype, Color, DataLocation, Vector3};

/// Version of this client
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `Source` header identifying uploads from this client
pub const DEFAULT_SOURCE: &str = concat!("Rust API Client v", env!("CARGO_PKG_VERSION"));

/// Default upload chunk size, 20 MiB; must be a multiple of 256 KiB
pub const CHUNK_SIZE: usize = 80 * 256 * 1024;

/// Magic number opening an OMF v1 file
pub const OMF_MAGIC: &[u8; 4] = b"\x84\x83\x82\x81";
