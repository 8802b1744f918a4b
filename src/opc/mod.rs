//! OPC (Open Packaging Conventions) handling for 3MF files
//!
//! 3MF files are ZIP archives following the OPC standard: a content types
//! part, relationship parts, and the payload parts they describe (model
//! documents, textures, thumbnails).

mod writer;

pub(crate) use writer::ArchiveBuilder;

use std::io::{Read, Seek};

use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use urlencoding::decode;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Error, Result};

/// Main 3D model part path within the archive
pub(crate) const MODEL_PATH: &str = "3D/3dmodel.model";

/// Content types part path
pub(crate) const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Package relationships part path
pub(crate) const RELS_PATH: &str = "_rels/.rels";

/// Model relationships part path
pub(crate) const MODEL_RELS_PATH: &str = "3D/_rels/3dmodel.model.rels";

/// Relationship type marking a part as a 3D model document
pub(crate) const MODEL_REL_TYPE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Relationship type marking a part as texture data
pub(crate) const TEXTURE_REL_TYPE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture";

/// Relationship type marking a part as a thumbnail image
pub(crate) const THUMBNAIL_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

/// XML namespace of relationship parts
pub(crate) const RELATIONSHIP_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

/// XML namespace of the content types part
pub(crate) const CONTENT_TYPES_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/content-types";

/// Content type of model parts
pub(crate) const MODEL_CONTENT_TYPE: &str =
    "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

/// Content type of relationship parts
pub(crate) const RELATIONSHIP_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.relationships+xml";

/// Read access to package entries during model parsing
///
/// The parser pulls texture and thumbnail payloads through this seam as it
/// encounters the elements that reference them. Paths may carry a leading
/// `/`, the OPC part-name form.
pub trait ArchiveReader {
    /// Read the full contents of the entry at `path`
    fn read_payload(&mut self, path: &str) -> Result<Vec<u8>>;
}

/// Write access to package entries during model serialization
///
/// The writer pushes texture and thumbnail payloads through this seam as it
/// serializes the elements that own them. Each payload carries the
/// relationship type to record against the current model part and the
/// content type to register, either as an extension `Default` or as a
/// part-name `Override`.
pub trait ArchiveWriter {
    /// Write `data` as the entry at `path` and record its relationship
    fn write_payload(
        &mut self,
        path: &str,
        data: &[u8],
        relationship_type: &str,
        content_type: &str,
        override_content_type: bool,
    ) -> Result<()>;
}

/// An open 3MF package
pub(crate) struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> Package<R> {
    /// Open a package from a reader positioned at the start of the archive
    pub(crate) fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        Ok(Self { archive })
    }

    /// Find the model parts the package relationships point at
    ///
    /// Targets come back in relationship-document order. A package without
    /// `_rels/.rels`, or whose relationships name no model part, simply has
    /// no models.
    pub(crate) fn discover_model_paths(&mut self) -> Result<Vec<String>> {
        let rels = match self.try_read_entry(RELS_PATH)? {
            Some(data) => data,
            None => return Ok(Vec::new()),
        };
        let xml = String::from_utf8(rels).map_err(|err| Error::package(err.to_string()))?;
        relationship_targets(&xml, MODEL_REL_TYPE)
    }

    /// Read an entry, stripping one leading `/` from OPC part names
    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        let entry = path.trim_start_matches('/');
        // Part names in relationship targets may be percent-encoded while
        // the ZIP entry itself carries the decoded UTF-8 name.
        let name = match decode(entry) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => entry.to_string(),
        };

        let mut file = match self.archive.by_name(&name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(Error::package(format!(
                    "Package entry '{}' cannot be found.",
                    entry
                )));
            }
            Err(err) => return Err(Error::Zip(err)),
        };

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    fn try_read_entry(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.read_entry(path) {
            Ok(data) => Ok(Some(data)),
            Err(Error::Package(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl<R: Read + Seek> ArchiveReader for Package<R> {
    fn read_payload(&mut self, path: &str) -> Result<Vec<u8>> {
        self.read_entry(path)
    }
}

/// Collect `Target` values of relationships matching `relationship_type`
fn relationship_targets(xml: &str, relationship_type: &str) -> Result<Vec<String>> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut targets = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|err| Error::package(err.to_string()))?;
                if local_name(name_str) != "Relationship" {
                    buf.clear();
                    continue;
                }

                let mut target: Option<String> = None;
                let mut matches = false;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Target" => {
                            let value = attr
                                .unescape_value()
                                .map_err(|err| Error::package(err.to_string()))?;
                            target = Some(value.into_owned());
                        }
                        b"Type" => {
                            let value = attr
                                .unescape_value()
                                .map_err(|err| Error::package(err.to_string()))?;
                            matches = value == relationship_type;
                        }
                        _ => {}
                    }
                }

                let target =
                    target.ok_or_else(|| Error::package("Relationship target not specified."))?;
                if matches {
                    targets.push(target);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(Error::Xml(err)),
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

fn local_name(name_str: &str) -> &str {
    match name_str.rfind(':') {
        Some(position) => &name_str[position + 1..],
        None => name_str,
    }
}
