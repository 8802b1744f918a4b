//! Model document serialization
//!
//! Serializes a [`Model`] into model XML in two passes. The first pass
//! closes the resource list over everything the model references and
//! assigns sequential ids keyed by pointer identity; the second emits the
//! document, streaming binary payloads (texture data, object thumbnails)
//! through the [`ArchiveWriter`] seam as their elements serialize.

mod core;
mod material;

use std::collections::{HashMap, HashSet};
use std::io::Write as IoWrite;
use std::rc::Rc;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Error, Result};
use crate::model::{CORE_NAMESPACE, MATERIAL_NAMESPACE, Model, Resource};
use crate::opc::ArchiveWriter;

/// Serialize `model` as a complete XML document
pub(crate) fn write_model_xml<W: IoWrite>(
    model: &Model,
    writer: W,
    archive: &mut dyn ArchiveWriter,
) -> Result<()> {
    let resources = collect_resources(model);
    let mut ids: HashMap<usize, i64> = HashMap::with_capacity(resources.len());
    for (index, resource) in resources.iter().enumerate() {
        ids.insert(resource.key(), index as i64 + 1);
    }

    let mut xml = Writer::new_with_indent(writer, b' ', 2);

    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    let mut namespaces: Vec<&str> = model
        .required_extension_namespaces
        .iter()
        .map(String::as_str)
        .collect();
    namespaces.sort_unstable();
    namespaces.dedup();
    let prefixes: Vec<String> = (0..namespaces.len()).map(extension_prefix).collect();

    let mut element = BytesStart::new("model");
    element.push_attribute(("unit", model.unit.attribute_value()));
    element.push_attribute(("xml:lang", model.language.as_str()));
    if !namespaces.is_empty() {
        element.push_attribute(("requiredextensions", prefixes.join(" ").as_str()));
        for (prefix, namespace) in prefixes.iter().zip(&namespaces) {
            element.push_attribute((format!("xmlns:{}", prefix).as_str(), *namespace));
        }
    }
    element.push_attribute(("xmlns", CORE_NAMESPACE));
    if resources.iter().any(is_material_resource) {
        element.push_attribute(("xmlns:m", MATERIAL_NAMESPACE));
    }
    xml.write_event(Event::Start(element))
        .map_err(|e| Error::xml_write(format!("Failed to write model element: {}", e)))?;

    write_metadata(&mut xml, model)?;
    write_resources(&mut xml, &resources, &ids, archive)?;
    write_build(&mut xml, model, &ids)?;

    xml.write_event(Event::End(BytesEnd::new("model")))
        .map_err(|e| Error::xml_write(format!("Failed to write model element: {}", e)))?;

    Ok(())
}

/// Close the declared resource list over everything the model references
///
/// Declared resources are visited in list order, then each build item's
/// object. Dependencies (component targets, property resources, a texture
/// group's texture) come before their referrers, and every reachable
/// resource appears exactly once, whether or not the caller listed it.
fn collect_resources(model: &Model) -> Vec<Resource> {
    let mut ordered = Vec::with_capacity(model.resources.len());
    let mut seen = HashSet::with_capacity(model.resources.len());

    for resource in &model.resources {
        visit(resource, &mut ordered, &mut seen);
    }
    for item in &model.items {
        visit(
            &Resource::Object(item.object.clone()),
            &mut ordered,
            &mut seen,
        );
    }

    ordered
}

fn visit(resource: &Resource, ordered: &mut Vec<Resource>, seen: &mut HashSet<usize>) {
    if !seen.insert(resource.key()) {
        return;
    }

    match resource {
        Resource::Object(object) => {
            for component in &object.components {
                visit(
                    &Resource::Object(component.object.clone()),
                    ordered,
                    seen,
                );
            }
            if let Some(property) = &object.property {
                visit(&property.resource.as_resource(), ordered, seen);
            }
            for triangle in &object.mesh.triangles {
                if let Some(property) = &triangle.property {
                    visit(&property.resource.as_resource(), ordered, seen);
                }
            }
        }
        Resource::Texture2DGroup(group) => {
            visit(
                &Resource::Texture2D(group.texture.clone()),
                ordered,
                seen,
            );
        }
        _ => {}
    }

    ordered.push(resource.clone());
}

fn is_material_resource(resource: &Resource) -> bool {
    matches!(
        resource,
        Resource::BaseMaterials(_)
            | Resource::ColorGroup(_)
            | Resource::Texture2D(_)
            | Resource::Texture2DGroup(_)
    )
}

/// Prefixes `a`..`z`, then `aa`, `ab`, ... past that
fn extension_prefix(index: usize) -> String {
    let mut index = index;
    let mut prefix = String::new();
    loop {
        prefix.insert(0, (b'a' + (index % 26) as u8) as char);
        index /= 26;
        if index == 0 {
            break;
        }
        index -= 1;
    }
    prefix
}

fn write_metadata<W: IoWrite>(writer: &mut Writer<W>, model: &Model) -> Result<()> {
    for (name, value) in model.metadata_fields() {
        if let Some(value) = value {
            // Multi-line values become one element per line.
            for line in value.split('\n') {
                let mut element = BytesStart::new("metadata");
                element.push_attribute(("name", name));
                writer
                    .write_event(Event::Start(element))
                    .map_err(|e| Error::xml_write(format!("Failed to write metadata: {}", e)))?;
                writer
                    .write_event(Event::Text(BytesText::new(line)))
                    .map_err(|e| Error::xml_write(format!("Failed to write metadata: {}", e)))?;
                writer
                    .write_event(Event::End(BytesEnd::new("metadata")))
                    .map_err(|e| Error::xml_write(format!("Failed to write metadata: {}", e)))?;
            }
        }
    }
    Ok(())
}

fn write_resources<W: IoWrite>(
    writer: &mut Writer<W>,
    resources: &[Resource],
    ids: &HashMap<usize, i64>,
    archive: &mut dyn ArchiveWriter,
) -> Result<()> {
    if resources.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new("resources")))
            .map_err(|e| Error::xml_write(format!("Failed to write resources: {}", e)))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(BytesStart::new("resources")))
        .map_err(|e| Error::xml_write(format!("Failed to write resources: {}", e)))?;

    for resource in resources {
        match resource {
            Resource::Object(object) => core::write_object(writer, object, ids, archive)?,
            Resource::BaseMaterials(materials) => {
                material::write_basematerials(writer, materials, ids)?
            }
            Resource::ColorGroup(group) => material::write_colorgroup(writer, group, ids)?,
            Resource::Texture2D(texture) => {
                material::write_texture2d(writer, texture, ids, archive)?
            }
            Resource::Texture2DGroup(group) => {
                material::write_texture2dgroup(writer, group, ids)?
            }
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("resources")))
        .map_err(|e| Error::xml_write(format!("Failed to write resources: {}", e)))?;
    Ok(())
}

fn write_build<W: IoWrite>(
    writer: &mut Writer<W>,
    model: &Model,
    ids: &HashMap<usize, i64>,
) -> Result<()> {
    if model.items.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new("build")))
            .map_err(|e| Error::xml_write(format!("Failed to write build: {}", e)))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(BytesStart::new("build")))
        .map_err(|e| Error::xml_write(format!("Failed to write build: {}", e)))?;
    for item in &model.items {
        core::write_build_item(writer, item, ids)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("build")))
        .map_err(|e| Error::xml_write(format!("Failed to write build: {}", e)))?;
    Ok(())
}

/// Id lookup during emission; the closure pass guarantees presence
pub(super) fn resource_id(ids: &HashMap<usize, i64>, key: usize) -> Result<i64> {
    ids.get(&key)
        .copied()
        .ok_or_else(|| Error::xml_write("Referenced resource was not collected.".to_string()))
}

/// Pointer-identity key for an `Rc`, matching `Resource::key`
pub(super) fn pointer_key<T>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Base, BaseMaterials, Color, ColorGroup, Component, ImageContentType, ModelItem,
        Object, ObjectProperty, PropertyResource, Tex2Coord, Texture2D, Texture2DGroup, Thumbnail,
        Transform, Triangle, TriangleProperty, Unit, Vertex,
    };

    /// Archive stub recording payload writes
    #[derive(Default)]
    struct RecordingArchive {
        payloads: Vec<(String, Vec<u8>, String, String, bool)>,
    }

    impl ArchiveWriter for RecordingArchive {
        fn write_payload(
            &mut self,
            path: &str,
            data: &[u8],
            relationship_type: &str,
            content_type: &str,
            override_content_type: bool,
        ) -> Result<()> {
            self.payloads.push((
                path.to_string(),
                data.to_vec(),
                relationship_type.to_string(),
                content_type.to_string(),
                override_content_type,
            ));
            Ok(())
        }
    }

    fn to_xml(model: &Model) -> (String, RecordingArchive) {
        let mut archive = RecordingArchive::default();
        let mut buffer = Vec::new();
        write_model_xml(model, &mut buffer, &mut archive).unwrap();
        (String::from_utf8(buffer).unwrap(), archive)
    }

    fn triangle_object() -> Object {
        let mut object = Object::new();
        object.mesh.triangles.push(Triangle::new(
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(10.0, 0.0, 0.0),
            Vertex::new(5.0, 10.0, 0.0),
        ));
        object
    }

    #[test]
    fn test_write_empty_model() {
        let model = Model::new();
        let (xml, _) = to_xml(&model);

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(
            r#"<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">"#
        ));
        assert!(xml.contains("<resources/>"));
        assert!(xml.contains("<build/>"));
        assert!(!xml.contains("xmlns:m"));
    }

    #[test]
    fn test_write_unit_attribute() {
        let mut model = Model::new();
        model.unit = Unit::Inch;
        let (xml, _) = to_xml(&model);
        assert!(xml.contains(r#"unit="inch""#));
    }

    #[test]
    fn test_write_metadata_order_and_multiline() {
        let mut model = Model::new();
        model.description = Some("line 1\nline 2".to_string());
        model.title = Some("My title".to_string());
        let (xml, _) = to_xml(&model);

        assert!(xml.contains(r#"<metadata name="Title">My title</metadata>"#));
        assert!(xml.contains(r#"<metadata name="Description">line 1</metadata>"#));
        assert!(xml.contains(r#"<metadata name="Description">line 2</metadata>"#));
        let title_at = xml.find(r#"name="Title""#).unwrap();
        let description_at = xml.find(r#"name="Description""#).unwrap();
        let resources_at = xml.find("<resources").unwrap();
        assert!(title_at < description_at);
        assert!(description_at < resources_at);
    }

    #[test]
    fn test_write_mesh_dedups_shared_vertices() {
        let a = Vertex::new(0.0, 0.0, 0.0);
        let b = Vertex::new(10.0, 0.0, 0.0);
        let c = Vertex::new(5.0, 10.0, 0.0);
        let d = Vertex::new(15.0, 10.0, 0.0);

        let mut object = Object::new();
        object.mesh.triangles.push(Triangle::new(a, b, c));
        object.mesh.triangles.push(Triangle::new(b, d, c));
        let object = Rc::new(object);

        let mut model = Model::new();
        model.resources.push(Resource::Object(object.clone()));
        model.items.push(ModelItem::new(object));

        let (xml, _) = to_xml(&model);
        assert_eq!(xml.matches("<vertex ").count(), 4);
        assert!(xml.contains(r#"<triangle v1="0" v2="1" v3="2"/>"#));
        assert!(xml.contains(r#"<triangle v1="1" v2="3" v3="2"/>"#));
    }

    #[test]
    fn test_write_empty_mesh_elements() {
        let mut model = Model::new();
        model
            .resources
            .push(Resource::Object(Rc::new(Object::new())));
        let (xml, _) = to_xml(&model);

        assert!(xml.contains("<mesh>"));
        assert!(xml.contains("<vertices/>"));
        assert!(xml.contains("<triangles/>"));
    }

    #[test]
    fn test_write_closure_inserts_component_target() {
        // The child object is only reachable through the component; it must
        // still be declared, before its referrer.
        let child = Rc::new(triangle_object());
        let mut parent = Object::new();
        parent
            .components
            .push(Component::new(child, Transform::IDENTITY));
        let parent = Rc::new(parent);

        let mut model = Model::new();
        model.resources.push(Resource::Object(parent.clone()));
        model.items.push(ModelItem::new(parent));

        let (xml, _) = to_xml(&model);
        assert_eq!(xml.matches("<object ").count(), 2);
        let child_at = xml.find(r#"<object id="1""#).unwrap();
        let parent_at = xml.find(r#"<object id="2""#).unwrap();
        assert!(child_at < parent_at);
        assert!(xml.contains(r#"<component objectid="1"/>"#));
        assert!(xml.contains(r#"<item objectid="2"/>"#));
    }

    #[test]
    fn test_write_unlisted_item_object_is_declared() {
        let object = Rc::new(triangle_object());
        let mut model = Model::new();
        model.items.push(ModelItem::new(object));

        let (xml, _) = to_xml(&model);
        assert!(xml.contains(r#"<object id="1" type="model">"#));
        assert!(xml.contains(r#"<item objectid="1"/>"#));
    }

    #[test]
    fn test_write_item_attributes() {
        let object = Rc::new(triangle_object());
        let mut model = Model::new();
        let mut item = ModelItem::new(object);
        item.transform = Transform::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 5.0, 6.0, 7.0]);
        item.part_number = Some("pn-12".to_string());
        model.items.push(item);

        let (xml, _) = to_xml(&model);
        assert!(xml.contains(
            r#"<item objectid="1" transform="1 0 0 0 1 0 0 0 1 5 6 7" partnumber="pn-12"/>"#
        ));
    }

    #[test]
    fn test_write_empty_part_number_is_omitted() {
        let object = Rc::new(triangle_object());
        let mut model = Model::new();
        let mut item = ModelItem::new(object);
        item.part_number = Some(String::new());
        model.items.push(item);

        let (xml, _) = to_xml(&model);
        assert!(xml.contains(r#"<item objectid="1"/>"#));
    }

    #[test]
    fn test_write_base_materials_and_object_property() {
        let materials = Rc::new(BaseMaterials {
            bases: vec![
                Base::new("red", Color::new(255, 0, 0)),
                Base::new("green", Color::new(0, 255, 0)),
            ],
        });

        let mut object = triangle_object();
        object.property = Some(ObjectProperty {
            resource: PropertyResource::BaseMaterials(materials.clone()),
            index: 1,
        });
        let object = Rc::new(object);

        let mut model = Model::new();
        model
            .resources
            .push(Resource::BaseMaterials(materials));
        model.resources.push(Resource::Object(object.clone()));
        model.items.push(ModelItem::new(object));

        let (xml, _) = to_xml(&model);
        assert!(xml.contains(r#"xmlns:m="http://schemas.microsoft.com/3dmanufacturing/material/2015/02""#));
        assert!(xml.contains(r#"<m:basematerials id="1">"#));
        assert!(xml.contains(r##"<m:base name="red" displaycolor="#FF0000FF"/>"##));
        assert!(xml.contains(r#"<object id="2" type="model" pid="1" pindex="1">"#));
    }

    #[test]
    fn test_write_triangle_property_attributes() {
        let group = Rc::new(ColorGroup {
            colors: vec![Color::new(255, 0, 0), Color::new(0, 0, 255)],
        });

        let mut object = triangle_object();
        object.mesh.triangles[0].property = Some(TriangleProperty {
            resource: PropertyResource::ColorGroup(group.clone()),
            p1: 0,
            p2: 1,
            p3: 0,
        });
        let object = Rc::new(object);

        let mut model = Model::new();
        model.resources.push(Resource::ColorGroup(group));
        model.resources.push(Resource::Object(object));

        let (xml, _) = to_xml(&model);
        assert!(xml.contains(r#"<m:colorgroup id="1">"#));
        assert!(xml.contains(r##"<m:color color="#FF0000FF"/>"##));
        assert!(xml.contains(r#"<triangle v1="0" v2="1" v3="2" pid="1" p1="0" p2="1" p3="0"/>"#));
    }

    #[test]
    fn test_write_texture_payload_and_attributes() {
        let texture = Rc::new(Texture2D::new(vec![1, 2, 3], ImageContentType::Png));
        let mut group = Texture2DGroup::new(texture.clone());
        group.coords.push(Tex2Coord::new(0.0, 0.0));
        group.coords.push(Tex2Coord::new(0.5, 1.0));

        let mut model = Model::new();
        model
            .resources
            .push(Resource::Texture2DGroup(Rc::new(group)));

        let (xml, archive) = to_xml(&model);

        // The texture is auto-inserted ahead of the group that uses it.
        assert!(xml.contains(r#"<m:texture2d id="1" path="/3D/Textures/"#));
        assert!(xml.contains(r#"contenttype="image/png"/>"#));
        assert!(xml.contains(r#"<m:texture2dgroup id="2" texid="1">"#));
        assert!(xml.contains(r#"<m:tex2coord u="0.5" v="1"/>"#));

        assert_eq!(archive.payloads.len(), 1);
        let (path, data, relationship_type, content_type, is_override) = &archive.payloads[0];
        assert!(path.starts_with("/3D/Textures/"));
        assert!(path.ends_with(".png"));
        assert_eq!(data, &vec![1, 2, 3]);
        assert!(relationship_type.contains("3dtexture"));
        assert_eq!(content_type, "image/png");
        assert!(!*is_override);
    }

    #[test]
    fn test_write_texture_tile_styles_and_box() {
        use crate::model::{BoundingBox, TileStyle};

        let mut texture = Texture2D::new(vec![9], ImageContentType::Jpeg);
        texture.tile_style_u = TileStyle::Mirror;
        texture.bounding_box = BoundingBox::new(0.0, 0.0, 0.5, 0.5);

        let mut model = Model::new();
        model.resources.push(Resource::Texture2D(Rc::new(texture)));

        let (xml, _) = to_xml(&model);
        assert!(xml.contains(r#"box="0 0 0.5 0.5""#));
        assert!(xml.contains(r#"tilestyleu="mirror""#));
        assert!(!xml.contains("tilestylev"));
    }

    #[test]
    fn test_write_object_thumbnail() {
        let mut object = triangle_object();
        object.thumbnail = Some(Thumbnail::new(vec![7, 7], ImageContentType::Jpeg));

        let mut model = Model::new();
        model.resources.push(Resource::Object(Rc::new(object)));

        let (xml, archive) = to_xml(&model);
        assert!(xml.contains(r#"thumbnail="/Thumbnails/"#));

        assert_eq!(archive.payloads.len(), 1);
        let (path, _, relationship_type, content_type, is_override) = &archive.payloads[0];
        assert!(path.starts_with("/Thumbnails/"));
        assert!(path.ends_with(".jpg"));
        assert!(relationship_type.contains("thumbnail"));
        assert_eq!(content_type, "image/jpeg");
        assert!(*is_override);
    }

    #[test]
    fn test_write_required_extensions_sorted() {
        let mut model = Model::new();
        model
            .required_extension_namespaces
            .push("http://example.com/zeta".to_string());
        model
            .required_extension_namespaces
            .push("http://example.com/alpha".to_string());

        let (xml, _) = to_xml(&model);
        assert!(xml.contains(r#"requiredextensions="a b""#));
        assert!(xml.contains(r#"xmlns:a="http://example.com/alpha""#));
        assert!(xml.contains(r#"xmlns:b="http://example.com/zeta""#));
    }

    #[test]
    fn test_extension_prefix_sequence() {
        assert_eq!(extension_prefix(0), "a");
        assert_eq!(extension_prefix(25), "z");
        assert_eq!(extension_prefix(26), "aa");
        assert_eq!(extension_prefix(27), "ab");
    }
}
