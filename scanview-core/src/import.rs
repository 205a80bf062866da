/// Format dispatch keyed by file extension
use std::fs;
use std::path::Path;

use crate::error::{ImportError, LoadError};
use crate::graph::{GeometryNode, ModelNode};
use crate::{obj, stl};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Stl,
    Obj,
}

impl ModelFormat {
    /// Pick the parser from the (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "stl" => Ok(ModelFormat::Stl),
            "obj" => Ok(ModelFormat::Obj),
            _ => Err(LoadError::UnsupportedFormat {
                extension: format!(".{}", extension),
            }),
        }
    }
}

/// Parse a file into a mutable mesh graph.
pub fn import_model(path: &Path, format: ModelFormat) -> Result<ModelNode, ImportError> {
    match format {
        ModelFormat::Stl => {
            let data = fs::read(path)?;
            let facets = stl::parse_stl(&data).map_err(ImportError::Stl)?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let leaf = GeometryNode::new(name.clone(), stl::facets_to_geometry(&facets));
            Ok(ModelNode::group(name, vec![leaf.into()]))
        }
        ModelFormat::Obj => obj::load_obj(path),
    }
}
