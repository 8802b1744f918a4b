//! Core element parsing
//!
//! Attribute-level parsing for objects, meshes, components, and build items.
//! Each function handles the opening tag of its element; nesting is driven by
//! the event loop in the parent module.

use std::collections::HashMap;
use std::rc::Rc;

use quick_xml::events::BytesStart;

use crate::error::{Error, Result};
use crate::model::{
    Component, ImageContentType, ModelItem, Object, ObjectProperty, ObjectType, PropertyResource,
    Resource, Thumbnail, Transform, Triangle, TriangleProperty, Vertex,
};
use crate::opc::ArchiveReader;

use super::{parse_attributes, parse_double, required_int_attribute};

/// Parse an `<object>` opening tag
///
/// The returned object starts with an empty mesh and no components; both fill
/// in as their child elements stream past. A `thumbnail` attribute is resolved
/// immediately by reading the payload it names from the archive.
pub(super) fn parse_object_start(
    e: &BytesStart<'_>,
    resources_by_id: &HashMap<i64, Resource>,
    archive: &mut dyn ArchiveReader,
) -> Result<(i64, Object)> {
    let attrs = parse_attributes(e)?;
    let id = required_int_attribute(&attrs, "id")?;

    let mut object = Object::new();
    object.object_type = ObjectType::parse(attrs.get("type").map(String::as_str))?;
    object.part_number = attrs.get("partnumber").cloned();
    object.name = attrs.get("name").cloned();

    if let Some(resource) = resolve_property_resource(&attrs, resources_by_id)? {
        let index = parse_property_index(&attrs, "pindex")?;
        let count = resource.property_count();
        if index < 0 || index as usize >= count {
            return Err(property_index_out_of_range(count));
        }
        object.property = Some(ObjectProperty {
            resource,
            index: index as usize,
        });
    }

    if let Some(path) = attrs.get("thumbnail") {
        let data = archive.read_payload(path)?;
        let content_type = ImageContentType::from_extension(path)?;
        object.thumbnail = Some(Thumbnail::new(data, content_type));
    }

    Ok((id, object))
}

/// Parse a `<vertex>` tag
pub(super) fn parse_vertex(e: &BytesStart<'_>) -> Result<Vertex> {
    let attrs = parse_attributes(e)?;
    let x = vertex_coordinate(&attrs, "x")?;
    let y = vertex_coordinate(&attrs, "y")?;
    let z = vertex_coordinate(&attrs, "z")?;
    Ok(Vertex::new(x, y, z))
}

fn vertex_coordinate(attrs: &HashMap<String, String>, name: &str) -> Result<f64> {
    let value = attrs
        .get(name)
        .ok_or_else(|| Error::missing_attribute(name))?;
    parse_double(value)
}

/// Parse a `<triangle>` tag, resolving its corner indices against the vertex
/// list read so far
///
/// Corners are stored by value; the indices do not survive the parse.
pub(super) fn parse_triangle(
    e: &BytesStart<'_>,
    vertices: &[Vertex],
    resources_by_id: &HashMap<i64, Resource>,
) -> Result<Triangle> {
    let attrs = parse_attributes(e)?;
    let v1 = required_int_attribute(&attrs, "v1")?;
    let v2 = required_int_attribute(&attrs, "v2")?;
    let v3 = required_int_attribute(&attrs, "v3")?;

    if v1 == v2 || v1 == v3 || v2 == v3 {
        return Err(Error::parse("Triangle must specify distinct indices."));
    }

    let vertex_count = vertices.len() as i64;
    let vertex_in_range = |index: i64| index >= 0 && index < vertex_count;
    if !vertex_in_range(v1) || !vertex_in_range(v2) || !vertex_in_range(v3) {
        return Err(Error::parse("Triangle vertex index does not exist."));
    }

    let mut triangle = Triangle::new(
        vertices[v1 as usize],
        vertices[v2 as usize],
        vertices[v3 as usize],
    );

    if let Some(resource) = resolve_property_resource(&attrs, resources_by_id)? {
        let p1 = parse_property_index(&attrs, "p1")?;
        let p2 = parse_property_index(&attrs, "p2")?;
        let p3 = parse_property_index(&attrs, "p3")?;

        let count = resource.property_count();
        let property_in_range = |index: i64| index >= 0 && (index as usize) < count;
        if !property_in_range(p1) || !property_in_range(p2) || !property_in_range(p3) {
            return Err(property_index_out_of_range(count));
        }

        triangle.property = Some(TriangleProperty {
            resource,
            p1: p1 as usize,
            p2: p2 as usize,
            p3: p3 as usize,
        });
    }

    Ok(triangle)
}

/// Parse a `<component>` tag
///
/// The target must already be in the id table; the schema declares referenced
/// objects before their referrers.
pub(super) fn parse_component(
    e: &BytesStart<'_>,
    resources_by_id: &HashMap<i64, Resource>,
) -> Result<Component> {
    let attrs = parse_attributes(e)?;
    let (object, transform) = resolve_object_reference(&attrs, resources_by_id)?;
    Ok(Component::new(object, transform))
}

/// Resolve an `<item>` attribute map collected during the event loop
///
/// Items resolve only after the whole document has been read, so a `<build>`
/// appearing before `<resources>` still sees every declared object.
pub(super) fn resolve_build_item(
    attrs: &HashMap<String, String>,
    resources_by_id: &HashMap<i64, Resource>,
) -> Result<ModelItem> {
    let (object, transform) = resolve_object_reference(attrs, resources_by_id)?;
    let mut item = ModelItem::new(object);
    item.transform = transform;
    item.part_number = attrs.get("partnumber").cloned();
    Ok(item)
}

fn resolve_object_reference(
    attrs: &HashMap<String, String>,
    resources_by_id: &HashMap<i64, Resource>,
) -> Result<(Rc<Object>, Transform)> {
    let value = attrs
        .get("objectid")
        .ok_or_else(|| Error::parse("Expected object id."))?;
    let id = value
        .parse::<i64>()
        .map_err(|_| Error::parse("Unable to parse attribute 'objectid' as an int."))?;

    let object = match resources_by_id.get(&id) {
        Some(Resource::Object(object)) => object.clone(),
        _ => return Err(Error::parse(format!("Invalid object id {}.", id))),
    };

    let transform = match attrs.get("transform") {
        Some(value) => Transform::parse(value)?,
        None => Transform::IDENTITY,
    };

    Ok((object, transform))
}

/// Resolve a `pid` attribute against the id table
///
/// An unparsable value is an error. An id that is unknown, or that names a
/// resource without properties, resolves to `None`: the document may
/// reference resource types this library does not read.
pub(super) fn resolve_property_resource(
    attrs: &HashMap<String, String>,
    resources_by_id: &HashMap<i64, Resource>,
) -> Result<Option<PropertyResource>> {
    let value = match attrs.get("pid") {
        Some(value) => value,
        None => return Ok(None),
    };
    let id = value
        .parse::<i64>()
        .map_err(|_| Error::parse(format!("Property index '{}' is not an int.", value)))?;

    Ok(resources_by_id
        .get(&id)
        .and_then(Resource::as_property_resource))
}

fn parse_property_index(attrs: &HashMap<String, String>, name: &str) -> Result<i64> {
    match attrs.get(name) {
        None => Ok(0),
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| Error::parse(format!("Property index '{}' is not an int.", value))),
    }
}

fn property_index_out_of_range(count: usize) -> Error {
    Error::parse(format!(
        "Property index is out of range. Value must be [0, {}).",
        count
    ))
}
