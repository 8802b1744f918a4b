//! Package assembly for saving 3MF files
//!
//! [`ArchiveBuilder`] owns the ZIP writer along with the bookkeeping that
//! spans all models in one save: relationship ids, per-model relationship
//! parts, and content type registration. Payload entries stream into the
//! archive as the model documents serialize; relationship parts and
//! `[Content_Types].xml` are accumulated and written at the end.

use std::io::{Seek, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};

use super::{
    ArchiveWriter, CONTENT_TYPES_NAMESPACE, CONTENT_TYPES_PATH, MODEL_CONTENT_TYPE, MODEL_PATH,
    MODEL_REL_TYPE, MODEL_RELS_PATH, RELATIONSHIP_CONTENT_TYPE, RELATIONSHIP_NAMESPACE, RELS_PATH,
};

/// A single entry in a relationship part
struct Relationship {
    target: String,
    id: String,
    relationship_type: String,
}

/// Incrementally assembles a 3MF package
pub(crate) struct ArchiveBuilder<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    relationship_counter: usize,
    model_relationships: Vec<Vec<Relationship>>,
    default_content_types: Vec<(String, String)>,
    override_content_types: Vec<(String, String)>,
    current_model_entry: Option<String>,
}

impl<W: Write + Seek> ArchiveBuilder<W> {
    /// Start a package for `model_count` model parts
    ///
    /// When at least one model exists, `_rels/.rels` is written up front
    /// with one model relationship per part; relationship ids for payloads
    /// continue from the same counter.
    pub(crate) fn new(writer: W, model_count: usize) -> Result<Self> {
        let mut builder = Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default(),
            relationship_counter: 0,
            model_relationships: Vec::with_capacity(model_count),
            default_content_types: vec![
                ("rels".to_string(), RELATIONSHIP_CONTENT_TYPE.to_string()),
                ("model".to_string(), MODEL_CONTENT_TYPE.to_string()),
            ],
            override_content_types: Vec::new(),
            current_model_entry: None,
        };

        if model_count > 0 {
            let relationships: Vec<Relationship> = (0..model_count)
                .map(|index| Relationship {
                    target: format!("/{}", model_entry(index)),
                    id: builder.next_relationship_id(),
                    relationship_type: MODEL_REL_TYPE.to_string(),
                })
                .collect();
            let xml = relationships_xml(&relationships)?;
            builder.zip.start_file(RELS_PATH, builder.options)?;
            builder.zip.write_all(&xml)?;
        }

        Ok(builder)
    }

    /// Open the next model part; payloads written afterwards belong to it
    pub(crate) fn begin_model_part(&mut self) {
        let index = self.model_relationships.len();
        self.model_relationships.push(Vec::new());
        self.current_model_entry = Some(model_entry(index));
    }

    /// Write the serialized model document as the current model part
    pub(crate) fn finish_model_part(&mut self, xml: &[u8]) -> Result<()> {
        let entry = self
            .current_model_entry
            .take()
            .ok_or_else(|| Error::package("No model part has been started."))?;
        self.zip.start_file(entry.as_str(), self.options)?;
        self.zip.write_all(xml)?;
        Ok(())
    }

    /// Write the deferred relationship parts and content types, then close
    pub(crate) fn finish(mut self) -> Result<W> {
        for (index, relationships) in self.model_relationships.iter().enumerate() {
            if relationships.is_empty() {
                continue;
            }
            let entry = model_rels_entry(index);
            let xml = relationships_xml(relationships)?;
            self.zip.start_file(entry.as_str(), self.options)?;
            self.zip.write_all(&xml)?;
        }

        let xml = content_types_xml(&self.default_content_types, &self.override_content_types)?;
        self.zip.start_file(CONTENT_TYPES_PATH, self.options)?;
        self.zip.write_all(&xml)?;

        Ok(self.zip.finish()?)
    }

    fn next_relationship_id(&mut self) -> String {
        let id = format!("rel{}", self.relationship_counter);
        self.relationship_counter += 1;
        id
    }
}

impl<W: Write + Seek> ArchiveWriter for ArchiveBuilder<W> {
    fn write_payload(
        &mut self,
        path: &str,
        data: &[u8],
        relationship_type: &str,
        content_type: &str,
        override_content_type: bool,
    ) -> Result<()> {
        let entry = path.trim_start_matches('/');
        self.zip.start_file(entry, self.options)?;
        self.zip.write_all(data)?;

        let id = self.next_relationship_id();
        let relationships = self
            .model_relationships
            .last_mut()
            .ok_or_else(|| Error::package("No model part has been started."))?;
        relationships.push(Relationship {
            target: format!("/{}", entry),
            id,
            relationship_type: relationship_type.to_string(),
        });

        let extension = entry
            .rsplit_once('.')
            .map(|(_, extension)| extension)
            .filter(|extension| !extension.contains('/'));
        match (override_content_type, extension) {
            (false, Some(extension)) => {
                if !self
                    .default_content_types
                    .iter()
                    .any(|(known, _)| known == extension)
                {
                    self.default_content_types
                        .push((extension.to_string(), content_type.to_string()));
                }
            }
            _ => {
                self.override_content_types
                    .push((format!("/{}", entry), content_type.to_string()));
            }
        }

        Ok(())
    }
}

/// Entry name of the model part at `index`
fn model_entry(index: usize) -> String {
    if index == 0 {
        MODEL_PATH.to_string()
    } else {
        format!("3D/3dmodel-{}.model", index)
    }
}

/// Entry name of the relationship part for the model at `index`
fn model_rels_entry(index: usize) -> String {
    if index == 0 {
        MODEL_RELS_PATH.to_string()
    } else {
        format!("3D/_rels/3dmodel-{}.model.rels", index)
    }
}

fn relationships_xml(relationships: &[Relationship]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", RELATIONSHIP_NAMESPACE));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| Error::xml_write(format!("Failed to write relationships: {}", e)))?;

    for relationship in relationships {
        let mut element = BytesStart::new("Relationship");
        element.push_attribute(("Target", relationship.target.as_str()));
        element.push_attribute(("Id", relationship.id.as_str()));
        element.push_attribute(("Type", relationship.relationship_type.as_str()));
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write relationship: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("Relationships")))
        .map_err(|e| Error::xml_write(format!("Failed to write relationships: {}", e)))?;

    Ok(writer.into_inner())
}

fn content_types_xml(
    defaults: &[(String, String)],
    overrides: &[(String, String)],
) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    let mut root = BytesStart::new("Types");
    root.push_attribute(("xmlns", CONTENT_TYPES_NAMESPACE));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| Error::xml_write(format!("Failed to write content types: {}", e)))?;

    for (extension, content_type) in defaults {
        let mut element = BytesStart::new("Default");
        element.push_attribute(("Extension", extension.as_str()));
        element.push_attribute(("ContentType", content_type.as_str()));
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write content type: {}", e)))?;
    }

    for (part_name, content_type) in overrides {
        let mut element = BytesStart::new("Override");
        element.push_attribute(("PartName", part_name.as_str()));
        element.push_attribute(("ContentType", content_type.as_str()));
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write content type: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("Types")))
        .map_err(|e| Error::xml_write(format!("Failed to write content types: {}", e)))?;

    Ok(writer.into_inner())
}
