//! # threemf
//!
//! A pure Rust reader and writer for 3MF (3D Manufacturing Format) packages.
//!
//! 3MF files are ZIP-based containers following the Open Packaging
//! Conventions (OPC) standard. Each package holds one or more XML model
//! documents plus the binary payloads (textures, thumbnails) those
//! documents reference.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Read and write the full package structure (ZIP/OPC container)
//! - Mesh data with vertex deduplication on write
//! - Base materials, color groups, textures and texture coordinates
//! - Metadata, build items and component assemblies
//!
//! ## Example
//!
//! ```no_run
//! use threemf::ThreeMfFile;
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("model.3mf")?;
//! let package = ThreeMfFile::load(file)?;
//!
//! println!("Package contains {} models", package.models.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod opc;
#[doc(hidden)]
pub mod parser;
mod writer;

pub use error::{Error, Result};
pub use model::{
    Base, BaseMaterials, BoundingBox, Color, ColorGroup, Component, ImageContentType, Mesh, Model,
    ModelItem, Object, ObjectProperty, ObjectType, ParserConfig, PropertyResource, Resource,
    Tex2Coord, Texture2D, Texture2DGroup, Thumbnail, TileStyle, Transform, Triangle,
    TriangleProperty, Unit, Vertex,
};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use tracing::{debug, info};

use opc::ArchiveReader;

/// A 3MF package: an ordered collection of models
///
/// Most packages hold a single model, but the format allows several model
/// parts in one archive. `load` preserves the order the package
/// relationships list them in, and `save` writes them back in that order.
#[derive(Debug, Default)]
pub struct ThreeMfFile {
    /// The models of the package, in relationship order
    pub models: Vec<Model>,
}

impl ThreeMfFile {
    /// Create an empty package with no models
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Load a 3MF package from a reader
    ///
    /// Uses the default parser configuration, which supports the core and
    /// material namespaces.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use threemf::ThreeMfFile;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("model.3mf")?;
    /// let package = ThreeMfFile::load(file)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::load_with_config(reader, &ParserConfig::new())
    }

    /// Load a 3MF package from a reader with a custom parser configuration
    ///
    /// If a model document requires an extension namespace the configuration
    /// does not support, loading fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use threemf::{ParserConfig, ThreeMfFile};
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("model.3mf")?;
    /// let config = ParserConfig::new()
    ///     .with_supported_namespace("http://example.com/myextension/2024/01");
    /// let package = ThreeMfFile::load_with_config(file, &config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_with_config<R: Read + Seek>(reader: R, config: &ParserConfig) -> Result<Self> {
        let mut package = opc::Package::open(reader)?;
        let paths = package.discover_model_paths()?;
        debug!(parts = paths.len(), "discovered model parts");

        let mut models = Vec::with_capacity(paths.len());
        for path in &paths {
            let data = package.read_payload(path)?;
            let xml = String::from_utf8(data)
                .map_err(|e| Error::parse(format!("Model part is not valid UTF-8: {}", e)))?;
            models.push(parser::parse_model_xml(&xml, config, &mut package)?);
        }

        info!(models = models.len(), "loaded 3MF package");
        Ok(Self { models })
    }

    /// Load a 3MF package from a file path
    ///
    /// Opens the file behind a buffered reader.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::load(BufReader::new(file))
    }

    /// Write the package to a writer as a complete 3MF archive
    ///
    /// Consumes the package and returns the writer for further use.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use threemf::ThreeMfFile;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut package = ThreeMfFile::new();
    /// // ... populate package.models ...
    ///
    /// let file = File::create("output.3mf")?;
    /// package.save(file)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn save<W: Write + Seek>(self, writer: W) -> Result<W> {
        let model_count = self.models.len();
        let mut builder = opc::ArchiveBuilder::new(writer, model_count)?;

        for model in &self.models {
            builder.begin_model_part();
            let mut xml = Vec::new();
            writer::write_model_xml(model, &mut xml, &mut builder)?;
            builder.finish_model_part(&xml)?;
        }

        let writer = builder.finish()?;
        info!(models = model_count, "saved 3MF package");
        Ok(writer)
    }

    /// Write the package to a file path
    ///
    /// Creates the file behind a buffered writer and flushes it before
    /// returning.
    pub fn write_to_file<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = self.save(BufWriter::new(file))?;
        writer.flush()?;
        Ok(())
    }
}
