//! Model document parsing
//!
//! Pull-parser over the model XML. Element and attribute matching uses local
//! names, so any namespace prefix binding is accepted. Resources parse in
//! document order into a transient id table; build items are collected raw
//! and resolved against that table once the document has been fully read.

mod core;
mod material;

use std::collections::HashMap;
use std::rc::Rc;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::model::{
    BaseMaterials, ColorGroup, Model, Object, ParserConfig, Resource, Texture2DGroup, Unit, Vertex,
};
use crate::opc::ArchiveReader;

/// Buffer capacity for XML event reads
const XML_BUFFER_CAPACITY: usize = 4096;

/// Parse a model document into a [`Model`]
///
/// Binary payloads the document references (texture data, object thumbnails)
/// are read through `archive` as their elements are encountered.
///
/// Note: this is public to enable integration testing, but marked
/// #[doc(hidden)] because [`ThreeMfFile`](crate::ThreeMfFile) is the
/// supported entry point.
#[doc(hidden)]
pub fn parse_model_xml(
    xml: &str,
    config: &ParserConfig,
    archive: &mut dyn ArchiveReader,
) -> Result<Model> {
    // DOCTYPE declarations can smuggle external entities; check the first
    // ~2000 characters where they would appear before handing the document
    // to the reader.
    let check_len = xml.len().min(2000);
    if xml[..check_len].to_lowercase().contains("<!doctype") {
        return Err(Error::parse(
            "DTD declarations are not allowed in 3MF files for security reasons",
        ));
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut model = Model::new();
    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);

    // id table grown as <resources> children complete, in document order
    let mut resources_by_id: HashMap<i64, Resource> = HashMap::new();
    // raw <item> attributes, resolved after Eof
    let mut raw_items: Vec<HashMap<String, String>> = Vec::new();

    let mut in_resources = false;
    let mut in_build = false;
    let mut in_mesh = false;
    let mut in_vertices = false;
    let mut in_triangles = false;
    let mut in_components = false;

    let mut current_object: Option<(i64, Object)> = None;
    let mut current_vertices: Vec<Vertex> = Vec::new();
    let mut current_basematerials: Option<(i64, BaseMaterials)> = None;
    let mut current_colorgroup: Option<(i64, ColorGroup)> = None;
    let mut current_texture2dgroup: Option<(i64, Texture2DGroup)> = None;

    // Depth within an unknown element subtree currently being skipped
    let mut skip_depth: usize = 0;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_empty_element = matches!(&event, Ok(Event::Empty(_)));

        match event {
            Ok(Event::Decl(_)) => {}
            Ok(Event::DocType(_)) => {
                return Err(Error::parse(
                    "DTD declarations are not allowed in 3MF files for security reasons",
                ));
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if skip_depth > 0 {
                    if !is_empty_element {
                        skip_depth += 1;
                    }
                    buf.clear();
                    continue;
                }

                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|err| Error::parse(err.to_string()))?;
                let local_name = get_local_name(name_str);

                match local_name {
                    "model" => {
                        let attrs = parse_attributes(e)?;
                        model.unit = Unit::parse(attrs.get("unit").map(String::as_str))?;
                        if let Some(language) = attrs.get("xml:lang") {
                            model.language = language.clone();
                        }

                        // requiredextensions holds prefixes; each must resolve
                        // through an xmlns declaration on this element and the
                        // resulting namespace must be supported.
                        if let Some(extensions) = attrs.get("requiredextensions") {
                            for prefix in extensions.split_whitespace() {
                                let namespace = attrs
                                    .get(&format!("xmlns:{}", prefix))
                                    .ok_or_else(|| {
                                        Error::parse(format!(
                                            "Unable to resolve namespace prefix '{}'.",
                                            prefix
                                        ))
                                    })?;
                                if !config.is_supported(namespace) {
                                    return Err(Error::parse(format!(
                                        "The required namespace '{}' is not supported.",
                                        namespace
                                    )));
                                }
                                model.required_extension_namespaces.push(namespace.clone());
                            }
                        }
                    }
                    "metadata" if !in_resources && !in_build => {
                        let attrs = parse_attributes(e)?;
                        // Entries without a name have nothing to attach to.
                        if let Some(name) = attrs.get("name") {
                            let value = if is_empty_element {
                                String::new()
                            } else {
                                match reader.read_event_into(&mut buf) {
                                    Ok(Event::Text(text)) => text
                                        .xml_content()
                                        .map_err(|err| Error::parse(err.to_string()))?
                                        .into_owned(),
                                    Ok(_) => String::new(),
                                    Err(err) => return Err(Error::Xml(err)),
                                }
                            };
                            model.add_metadata(name, &value);
                        }
                    }
                    "resources" => in_resources = !is_empty_element,
                    "build" => in_build = !is_empty_element,
                    "object" if in_resources => {
                        let (id, object) =
                            core::parse_object_start(e, &resources_by_id, archive)?;
                        if is_empty_element {
                            declare_resource(
                                &mut model,
                                &mut resources_by_id,
                                id,
                                Resource::Object(Rc::new(object)),
                            );
                        } else {
                            current_object = Some((id, object));
                        }
                    }
                    "mesh" if current_object.is_some() => {
                        in_mesh = !is_empty_element;
                        current_vertices.clear();
                    }
                    "vertices" if in_mesh => in_vertices = !is_empty_element,
                    "vertex" if in_vertices => {
                        current_vertices.push(core::parse_vertex(e)?);
                    }
                    "triangles" if in_mesh => in_triangles = !is_empty_element,
                    "triangle" if in_triangles => {
                        let triangle =
                            core::parse_triangle(e, &current_vertices, &resources_by_id)?;
                        if let Some((_, ref mut object)) = current_object {
                            object.mesh.triangles.push(triangle);
                        }
                    }
                    "components" if current_object.is_some() => {
                        in_components = !is_empty_element;
                    }
                    "component" if in_components => {
                        let component = core::parse_component(e, &resources_by_id)?;
                        if let Some((_, ref mut object)) = current_object {
                            object.components.push(component);
                        }
                    }
                    "item" if in_build => raw_items.push(parse_attributes(e)?),
                    "basematerials" if in_resources => {
                        let (id, materials) = material::parse_basematerials_start(e)?;
                        if is_empty_element {
                            declare_resource(
                                &mut model,
                                &mut resources_by_id,
                                id,
                                Resource::BaseMaterials(Rc::new(materials)),
                            );
                        } else {
                            current_basematerials = Some((id, materials));
                        }
                    }
                    "base" if current_basematerials.is_some() => {
                        let base = material::parse_base(e)?;
                        if let Some((_, ref mut materials)) = current_basematerials {
                            materials.bases.push(base);
                        }
                    }
                    "colorgroup" if in_resources => {
                        let (id, group) = material::parse_colorgroup_start(e)?;
                        if is_empty_element {
                            declare_resource(
                                &mut model,
                                &mut resources_by_id,
                                id,
                                Resource::ColorGroup(Rc::new(group)),
                            );
                        } else {
                            current_colorgroup = Some((id, group));
                        }
                    }
                    "color" if current_colorgroup.is_some() => {
                        let color = material::parse_color(e)?;
                        if let Some((_, ref mut group)) = current_colorgroup {
                            group.colors.push(color);
                        }
                    }
                    "texture2d" if in_resources => {
                        let (id, texture) = material::parse_texture2d(e, archive)?;
                        declare_resource(
                            &mut model,
                            &mut resources_by_id,
                            id,
                            Resource::Texture2D(Rc::new(texture)),
                        );
                    }
                    "texture2dgroup" if in_resources => {
                        let (id, group) =
                            material::parse_texture2dgroup_start(e, &resources_by_id)?;
                        if is_empty_element {
                            declare_resource(
                                &mut model,
                                &mut resources_by_id,
                                id,
                                Resource::Texture2DGroup(Rc::new(group)),
                            );
                        } else {
                            current_texture2dgroup = Some((id, group));
                        }
                    }
                    "tex2coord" if current_texture2dgroup.is_some() => {
                        let coord = material::parse_tex2coord(e)?;
                        if let Some((_, ref mut group)) = current_texture2dgroup {
                            group.coords.push(coord);
                        }
                    }
                    _ => {
                        // Unknown element, or a known one out of context.
                        // Skip the whole subtree.
                        if !is_empty_element {
                            skip_depth = 1;
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                    buf.clear();
                    continue;
                }

                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|err| Error::parse(err.to_string()))?;

                match get_local_name(name_str) {
                    "resources" => in_resources = false,
                    "build" => in_build = false,
                    "mesh" => in_mesh = false,
                    "vertices" => in_vertices = false,
                    "triangles" => in_triangles = false,
                    "components" => in_components = false,
                    "object" => {
                        if let Some((id, object)) = current_object.take() {
                            declare_resource(
                                &mut model,
                                &mut resources_by_id,
                                id,
                                Resource::Object(Rc::new(object)),
                            );
                        }
                    }
                    "basematerials" => {
                        if let Some((id, materials)) = current_basematerials.take() {
                            declare_resource(
                                &mut model,
                                &mut resources_by_id,
                                id,
                                Resource::BaseMaterials(Rc::new(materials)),
                            );
                        }
                    }
                    "colorgroup" => {
                        if let Some((id, group)) = current_colorgroup.take() {
                            declare_resource(
                                &mut model,
                                &mut resources_by_id,
                                id,
                                Resource::ColorGroup(Rc::new(group)),
                            );
                        }
                    }
                    "texture2dgroup" => {
                        if let Some((id, group)) = current_texture2dgroup.take() {
                            declare_resource(
                                &mut model,
                                &mut resources_by_id,
                                id,
                                Resource::Texture2DGroup(Rc::new(group)),
                            );
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(Error::Xml(err)),
            _ => {}
        }
        buf.clear();
    }

    for attrs in &raw_items {
        model.items.push(core::resolve_build_item(attrs, &resources_by_id)?);
    }

    Ok(model)
}

/// Record a completed resource under its document id and in declaration order
fn declare_resource(
    model: &mut Model,
    resources_by_id: &mut HashMap<i64, Resource>,
    id: i64,
    resource: Resource,
) {
    resources_by_id.insert(id, resource.clone());
    model.resources.push(resource);
}

/// Extract the local name from a possibly prefixed element name
fn get_local_name(name_str: &str) -> &str {
    match name_str.rfind(':') {
        Some(position) => &name_str[position + 1..],
        None => name_str,
    }
}

/// Collect an element's attributes into an owned map, unescaping values
pub(super) fn parse_attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::with_capacity(8);

    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| Error::parse(err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| Error::parse(err.to_string()))?;

        attrs.insert(key.to_string(), value.into_owned());
    }

    Ok(attrs)
}

/// Look up an attribute that must be present
pub(super) fn required_attribute<'a>(
    attrs: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str> {
    attrs
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| Error::expected_attribute(name))
}

/// Look up an attribute that must be present and hold an integer
pub(super) fn required_int_attribute(attrs: &HashMap<String, String>, name: &str) -> Result<i64> {
    required_attribute(attrs, name)?
        .parse::<i64>()
        .map_err(|_| Error::parse(format!("Unable to parse attribute '{}' as an int.", name)))
}

/// Parse a floating-point attribute value
pub(super) fn parse_double(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| Error::parse(format!("Unable to parse '{}' as a double.", value)))
}
