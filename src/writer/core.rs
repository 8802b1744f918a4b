//! Core element serialization
//!
//! Objects, meshes, components, and build items.

use std::collections::HashMap;
use std::io::Write as IoWrite;
use std::rc::Rc;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{Mesh, ModelItem, Object, Vertex};
use crate::opc::{ArchiveWriter, THUMBNAIL_REL_TYPE};

use super::{pointer_key, resource_id};

pub(super) fn write_object<W: IoWrite>(
    writer: &mut Writer<W>,
    object: &Rc<Object>,
    ids: &HashMap<usize, i64>,
    archive: &mut dyn ArchiveWriter,
) -> Result<()> {
    let mut element = BytesStart::new("object");
    element.push_attribute(("id", resource_id(ids, pointer_key(object))?.to_string().as_str()));
    element.push_attribute(("type", object.object_type.attribute_value()));
    if let Some(part_number) = &object.part_number {
        element.push_attribute(("partnumber", part_number.as_str()));
    }
    if let Some(name) = &object.name {
        element.push_attribute(("name", name.as_str()));
    }
    if let Some(property) = &object.property {
        element.push_attribute((
            "pid",
            resource_id(ids, property.resource.key())?.to_string().as_str(),
        ));
        element.push_attribute(("pindex", property.index.to_string().as_str()));
    }
    if let Some(thumbnail) = &object.thumbnail {
        let path = format!(
            "/Thumbnails/{}{}",
            Uuid::new_v4().simple(),
            thumbnail.content_type.extension()
        );
        archive.write_payload(
            &path,
            &thumbnail.data,
            THUMBNAIL_REL_TYPE,
            thumbnail.content_type.content_type(),
            true,
        )?;
        element.push_attribute(("thumbnail", path.as_str()));
    }

    writer
        .write_event(Event::Start(element))
        .map_err(|e| Error::xml_write(format!("Failed to write object element: {}", e)))?;

    write_mesh(writer, &object.mesh, ids)?;

    if !object.components.is_empty() {
        writer
            .write_event(Event::Start(BytesStart::new("components")))
            .map_err(|e| Error::xml_write(format!("Failed to write components: {}", e)))?;
        for component in &object.components {
            let mut element = BytesStart::new("component");
            element.push_attribute((
                "objectid",
                resource_id(ids, pointer_key(&component.object))?
                    .to_string()
                    .as_str(),
            ));
            if !component.transform.is_identity() {
                element
                    .push_attribute(("transform", component.transform.attribute_value().as_str()));
            }
            writer
                .write_event(Event::Empty(element))
                .map_err(|e| Error::xml_write(format!("Failed to write component: {}", e)))?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("components")))
            .map_err(|e| Error::xml_write(format!("Failed to write components: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("object")))
        .map_err(|e| Error::xml_write(format!("Failed to write object element: {}", e)))?;
    Ok(())
}

/// Serialize a mesh, rebuilding the shared vertex list
///
/// Triangle corners hold vertex values; the XML form indexes into a
/// `<vertices>` list. Distinct corner values are collected in first
/// occurrence order, compared exactly by bit pattern.
fn write_mesh<W: IoWrite>(
    writer: &mut Writer<W>,
    mesh: &Mesh,
    ids: &HashMap<usize, i64>,
) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("mesh")))
        .map_err(|e| Error::xml_write(format!("Failed to write mesh element: {}", e)))?;

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut index_by_bits: HashMap<(u64, u64, u64), usize> = HashMap::new();
    let mut corner_indices: Vec<[usize; 3]> = Vec::with_capacity(mesh.triangles.len());
    for triangle in &mesh.triangles {
        let mut corners = [0usize; 3];
        for (slot, vertex) in triangle.vertices().into_iter().enumerate() {
            let bits = (vertex.x.to_bits(), vertex.y.to_bits(), vertex.z.to_bits());
            let index = *index_by_bits.entry(bits).or_insert_with(|| {
                vertices.push(*vertex);
                vertices.len() - 1
            });
            corners[slot] = index;
        }
        corner_indices.push(corners);
    }

    if vertices.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new("vertices")))
            .map_err(|e| Error::xml_write(format!("Failed to write vertices: {}", e)))?;
    } else {
        writer
            .write_event(Event::Start(BytesStart::new("vertices")))
            .map_err(|e| Error::xml_write(format!("Failed to write vertices: {}", e)))?;
        for vertex in &vertices {
            let mut element = BytesStart::new("vertex");
            element.push_attribute(("x", vertex.x.to_string().as_str()));
            element.push_attribute(("y", vertex.y.to_string().as_str()));
            element.push_attribute(("z", vertex.z.to_string().as_str()));
            writer
                .write_event(Event::Empty(element))
                .map_err(|e| Error::xml_write(format!("Failed to write vertex: {}", e)))?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("vertices")))
            .map_err(|e| Error::xml_write(format!("Failed to write vertices: {}", e)))?;
    }

    if mesh.triangles.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new("triangles")))
            .map_err(|e| Error::xml_write(format!("Failed to write triangles: {}", e)))?;
    } else {
        writer
            .write_event(Event::Start(BytesStart::new("triangles")))
            .map_err(|e| Error::xml_write(format!("Failed to write triangles: {}", e)))?;
        for (triangle, corners) in mesh.triangles.iter().zip(&corner_indices) {
            let mut element = BytesStart::new("triangle");
            element.push_attribute(("v1", corners[0].to_string().as_str()));
            element.push_attribute(("v2", corners[1].to_string().as_str()));
            element.push_attribute(("v3", corners[2].to_string().as_str()));
            if let Some(property) = &triangle.property {
                element.push_attribute((
                    "pid",
                    resource_id(ids, property.resource.key())?.to_string().as_str(),
                ));
                element.push_attribute(("p1", property.p1.to_string().as_str()));
                element.push_attribute(("p2", property.p2.to_string().as_str()));
                element.push_attribute(("p3", property.p3.to_string().as_str()));
            }
            writer
                .write_event(Event::Empty(element))
                .map_err(|e| Error::xml_write(format!("Failed to write triangle: {}", e)))?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("triangles")))
            .map_err(|e| Error::xml_write(format!("Failed to write triangles: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("mesh")))
        .map_err(|e| Error::xml_write(format!("Failed to write mesh element: {}", e)))?;
    Ok(())
}

pub(super) fn write_build_item<W: IoWrite>(
    writer: &mut Writer<W>,
    item: &ModelItem,
    ids: &HashMap<usize, i64>,
) -> Result<()> {
    let mut element = BytesStart::new("item");
    element.push_attribute((
        "objectid",
        resource_id(ids, pointer_key(&item.object))?.to_string().as_str(),
    ));
    if !item.transform.is_identity() {
        element.push_attribute(("transform", item.transform.attribute_value().as_str()));
    }
    if let Some(part_number) = &item.part_number {
        if !part_number.is_empty() {
            element.push_attribute(("partnumber", part_number.as_str()));
        }
    }
    writer
        .write_event(Event::Empty(element))
        .map_err(|e| Error::xml_write(format!("Failed to write item element: {}", e)))?;
    Ok(())
}
