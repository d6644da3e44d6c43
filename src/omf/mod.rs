//! Open Mining Format v1 container

pub mod io;
pub mod model;

pub use io::{OmfReader, OmfWriter, HEADER_SIZE, OMF_VERSION};
pub use model::{
    DataValues, Geometry, ImageTexture, Legend, LegendValues, OmfData, OmfElement, OmfProject,
    Rgb, ScalarColormap,
};

use crate::error::Result;
use std::path::Path;

/// Read a project from an OMF file
pub fn read_omf<P: AsRef<Path>>(path: P) -> Result<OmfProject> {
    OmfReader::open(path)?.project()
}

/// Validate a project and write it to an OMF file
pub fn write_omf<P: AsRef<Path>>(project: &OmfProject, path: P) -> Result<()> {
    OmfWriter::new().write_file(project, path)
}
