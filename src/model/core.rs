//! Core model document types

use std::collections::HashSet;
use std::rc::Rc;

use crate::error::{Error, Result};

use super::primitives::{ImageContentType, Transform, Unit};
use super::resource::{PropertyResource, Resource};

/// XML namespace of the core model vocabulary
pub const CORE_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";

/// XML namespace of the material vocabulary (the `m` prefix)
pub const MATERIAL_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/material/2015/02";

/// Language written as `xml:lang` on new models
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Configuration for loading 3MF packages
///
/// Carries the set of extension namespaces the consumer supports. A model
/// whose `requiredextensions` resolve to anything outside this set fails to
/// load. The core and material namespaces are always supported.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    supported_namespaces: HashSet<String>,
}

impl ParserConfig {
    /// Create a configuration supporting the built-in namespaces
    pub fn new() -> Self {
        let mut supported = HashSet::new();
        supported.insert(CORE_NAMESPACE.to_string());
        supported.insert(MATERIAL_NAMESPACE.to_string());
        Self {
            supported_namespaces: supported,
        }
    }

    /// Add support for an extension namespace
    ///
    /// # Example
    ///
    /// ```
    /// use threemf::ParserConfig;
    ///
    /// let config = ParserConfig::new()
    ///     .with_supported_namespace("http://example.com/myextension/2024/01");
    /// ```
    pub fn with_supported_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.supported_namespaces.insert(namespace.into());
        self
    }

    /// Whether a namespace URI is in the supported set
    pub fn is_supported(&self, namespace: &str) -> bool {
        self.supported_namespaces.contains(namespace)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A 3D vertex with x, y, z coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A property reference carried by a triangle
#[derive(Debug, Clone)]
pub struct TriangleProperty {
    /// The property resource the indices point into
    pub resource: PropertyResource,
    /// Property index for the first vertex
    pub p1: usize,
    /// Property index for the second vertex
    pub p2: usize,
    /// Property index for the third vertex
    pub p3: usize,
}

impl TriangleProperty {
    /// Create a property reference with all three indices equal
    pub fn new(resource: PropertyResource, index: usize) -> Self {
        Self {
            resource,
            p1: index,
            p2: index,
            p3: index,
        }
    }
}

/// A triangle defined by three corner vertices
///
/// Triangles own their corners by value. The shared vertex list seen in
/// model XML is a wire format detail: it is rebuilt by deduplication on
/// every write and resolved away on every parse.
#[derive(Debug, Clone)]
pub struct Triangle {
    /// First corner
    pub v1: Vertex,
    /// Second corner
    pub v2: Vertex,
    /// Third corner
    pub v3: Vertex,
    /// Optional property reference
    pub property: Option<TriangleProperty>,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v1: Vertex, v2: Vertex, v3: Vertex) -> Self {
        Self {
            v1,
            v2,
            v3,
            property: None,
        }
    }

    /// The three corners in order
    pub fn vertices(&self) -> [&Vertex; 3] {
        [&self.v1, &self.v2, &self.v3]
    }
}

/// Triangle mesh geometry of an object
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Triangles making up the mesh
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }
}

/// A component referencing another object with an optional transform
#[derive(Debug, Clone)]
pub struct Component {
    /// The referenced object
    pub object: Rc<Object>,
    /// Placement of the referenced object
    pub transform: Transform,
}

impl Component {
    /// Create a new component
    pub fn new(object: Rc<Object>, transform: Transform) -> Self {
        Self { object, transform }
    }
}

/// Type of a 3D object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// A physical part (the default)
    Model,
    /// Support structure
    Support,
    /// Other auxiliary geometry
    Other,
}

impl ObjectType {
    /// The `type` attribute form of this object type
    pub fn attribute_value(&self) -> &'static str {
        match self {
            ObjectType::Model => "model",
            ObjectType::Support => "support",
            ObjectType::Other => "other",
        }
    }

    /// Parse a `type` attribute value; an absent attribute means model
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value {
            None => Ok(ObjectType::Model),
            Some("model") => Ok(ObjectType::Model),
            Some("support") => Ok(ObjectType::Support),
            Some("other") => Ok(ObjectType::Other),
            Some(other) => Err(Error::parse(format!("Invalid object type '{}'.", other))),
        }
    }
}

impl Default for ObjectType {
    fn default() -> Self {
        ObjectType::Model
    }
}

/// A property reference carried by an object
#[derive(Debug, Clone)]
pub struct ObjectProperty {
    /// The property resource the index points into
    pub resource: PropertyResource,
    /// Index of the default property for the object
    pub index: usize,
}

/// Thumbnail image attached to an object
#[derive(Debug, Clone)]
pub struct Thumbnail {
    /// Raw image data
    pub data: Vec<u8>,
    /// Image format of the data
    pub content_type: ImageContentType,
}

impl Thumbnail {
    /// Create a thumbnail from image data
    pub fn new(data: Vec<u8>, content_type: ImageContentType) -> Self {
        Self { data, content_type }
    }
}

/// A 3D object holding mesh geometry and component references
#[derive(Debug, Clone, Default)]
pub struct Object {
    /// Type of the object
    pub object_type: ObjectType,
    /// Object name
    pub name: Option<String>,
    /// Part number
    pub part_number: Option<String>,
    /// Mesh geometry
    pub mesh: Mesh,
    /// Components referencing other objects
    pub components: Vec<Component>,
    /// Default property applied to the object
    pub property: Option<ObjectProperty>,
    /// Optional thumbnail image
    pub thumbnail: Option<Thumbnail>,
}

impl Object {
    /// Create a new empty object of type model
    pub fn new() -> Self {
        Self::default()
    }
}

/// A build item placing an object
#[derive(Debug, Clone)]
pub struct ModelItem {
    /// The object to build
    pub object: Rc<Object>,
    /// Placement of the object
    pub transform: Transform,
    /// Part number
    pub part_number: Option<String>,
}

impl ModelItem {
    /// Create an item placing an object with the identity transform
    pub fn new(object: Rc<Object>) -> Self {
        Self {
            object,
            transform: Transform::IDENTITY,
            part_number: None,
        }
    }
}

/// A single model document
#[derive(Debug, Clone)]
pub struct Model {
    /// Unit of measure for all geometry
    pub unit: Unit,
    /// Document language, written as `xml:lang`
    pub language: String,
    /// Title metadata
    pub title: Option<String>,
    /// Designer metadata
    pub designer: Option<String>,
    /// Description metadata; newlines split into repeated elements on write
    pub description: Option<String>,
    /// Copyright metadata
    pub copyright: Option<String>,
    /// License terms metadata
    pub license_terms: Option<String>,
    /// Rating metadata
    pub rating: Option<String>,
    /// Creation date metadata
    pub creation_date: Option<String>,
    /// Modification date metadata
    pub modification_date: Option<String>,
    /// Namespace URIs of extensions a consumer must understand
    pub required_extension_namespaces: Vec<String>,
    /// Declared resources
    pub resources: Vec<Resource>,
    /// Build items
    pub items: Vec<ModelItem>,
}

impl Model {
    /// Create a new empty model in millimeters
    pub fn new() -> Self {
        Self {
            unit: Unit::Millimeter,
            language: DEFAULT_LANGUAGE.to_string(),
            title: None,
            designer: None,
            description: None,
            copyright: None,
            license_terms: None,
            rating: None,
            creation_date: None,
            modification_date: None,
            required_extension_namespaces: Vec::new(),
            resources: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Record a `<metadata>` element value
    ///
    /// Repeated elements of the same name accumulate with newline joins.
    /// Unknown names are ignored.
    pub(crate) fn add_metadata(&mut self, name: &str, value: &str) {
        let slot = match name {
            "Title" => &mut self.title,
            "Designer" => &mut self.designer,
            "Description" => &mut self.description,
            "Copyright" => &mut self.copyright,
            "LicenseTerms" => &mut self.license_terms,
            "Rating" => &mut self.rating,
            "CreationDate" => &mut self.creation_date,
            "ModificationDate" => &mut self.modification_date,
            _ => return,
        };
        match slot {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => *slot = Some(value.to_string()),
        }
    }

    /// The metadata fields in write order
    pub(crate) fn metadata_fields(&self) -> [(&'static str, Option<&String>); 8] {
        [
            ("Title", self.title.as_ref()),
            ("Designer", self.designer.as_ref()),
            ("Description", self.description.as_ref()),
            ("Copyright", self.copyright.as_ref()),
            ("LicenseTerms", self.license_terms.as_ref()),
            ("Rating", self.rating.as_ref()),
            ("CreationDate", self.creation_date.as_ref()),
            ("ModificationDate", self.modification_date.as_ref()),
        ]
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_model_defaults() {
        let model = Model::new();
        assert_eq!(model.unit, Unit::Millimeter);
        assert_eq!(model.language, DEFAULT_LANGUAGE);
        assert!(model.resources.is_empty());
        assert!(model.items.is_empty());
    }

    #[test]
    fn test_object_type_codec() {
        assert_eq!(ObjectType::parse(None).unwrap(), ObjectType::Model);
        assert_eq!(ObjectType::parse(Some("support")).unwrap(), ObjectType::Support);
        assert_eq!(ObjectType::Other.attribute_value(), "other");

        let err = ObjectType::parse(Some("solid")).unwrap_err();
        assert!(err.to_string().contains("Invalid object type 'solid'."));
    }

    #[test]
    fn test_metadata_accumulates_with_newlines() {
        let mut model = Model::new();
        model.add_metadata("Description", "line 1");
        model.add_metadata("Description", "line 2");
        assert_eq!(model.description.as_deref(), Some("line 1\nline 2"));
    }

    #[test]
    fn test_unknown_metadata_ignored() {
        let mut model = Model::new();
        model.add_metadata("X-Custom", "value");
        assert!(model.metadata_fields().iter().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn test_parser_config_supported_namespaces() {
        let config = ParserConfig::new();
        assert!(config.is_supported(CORE_NAMESPACE));
        assert!(config.is_supported(MATERIAL_NAMESPACE));
        assert!(!config.is_supported("http://www.ixmilia.com"));

        let config = config.with_supported_namespace("http://www.ixmilia.com");
        assert!(config.is_supported("http://www.ixmilia.com"));
    }
}
