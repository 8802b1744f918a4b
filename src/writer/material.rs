//! Material element serialization
//!
//! Base material groups, color groups, textures, and texture coordinate
//! groups, all in the material namespace (`m:` prefix).

use std::collections::HashMap;
use std::io::Write as IoWrite;
use std::rc::Rc;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{BaseMaterials, ColorGroup, Texture2D, Texture2DGroup, TileStyle};
use crate::opc::{ArchiveWriter, TEXTURE_REL_TYPE};

use super::{pointer_key, resource_id};

pub(super) fn write_basematerials<W: IoWrite>(
    writer: &mut Writer<W>,
    materials: &Rc<BaseMaterials>,
    ids: &HashMap<usize, i64>,
) -> Result<()> {
    let mut element = BytesStart::new("m:basematerials");
    element.push_attribute((
        "id",
        resource_id(ids, pointer_key(materials))?.to_string().as_str(),
    ));

    if materials.bases.is_empty() {
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write base materials: {}", e)))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(element))
        .map_err(|e| Error::xml_write(format!("Failed to write base materials: {}", e)))?;
    for base in &materials.bases {
        let mut element = BytesStart::new("m:base");
        element.push_attribute(("name", base.name.as_str()));
        element.push_attribute(("displaycolor", base.color.attribute_value().as_str()));
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write base material: {}", e)))?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("m:basematerials")))
        .map_err(|e| Error::xml_write(format!("Failed to write base materials: {}", e)))?;
    Ok(())
}

pub(super) fn write_colorgroup<W: IoWrite>(
    writer: &mut Writer<W>,
    group: &Rc<ColorGroup>,
    ids: &HashMap<usize, i64>,
) -> Result<()> {
    let mut element = BytesStart::new("m:colorgroup");
    element.push_attribute((
        "id",
        resource_id(ids, pointer_key(group))?.to_string().as_str(),
    ));

    if group.colors.is_empty() {
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write color group: {}", e)))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(element))
        .map_err(|e| Error::xml_write(format!("Failed to write color group: {}", e)))?;
    for color in &group.colors {
        let mut element = BytesStart::new("m:color");
        element.push_attribute(("color", color.attribute_value().as_str()));
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write color: {}", e)))?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("m:colorgroup")))
        .map_err(|e| Error::xml_write(format!("Failed to write color group: {}", e)))?;
    Ok(())
}

/// Serialize a texture, writing its image data as a fresh package part
pub(super) fn write_texture2d<W: IoWrite>(
    writer: &mut Writer<W>,
    texture: &Rc<Texture2D>,
    ids: &HashMap<usize, i64>,
    archive: &mut dyn ArchiveWriter,
) -> Result<()> {
    let path = format!(
        "/3D/Textures/{}{}",
        Uuid::new_v4().simple(),
        texture.content_type.extension()
    );
    archive.write_payload(
        &path,
        &texture.data,
        TEXTURE_REL_TYPE,
        texture.content_type.content_type(),
        false,
    )?;

    let mut element = BytesStart::new("m:texture2d");
    element.push_attribute((
        "id",
        resource_id(ids, pointer_key(texture))?.to_string().as_str(),
    ));
    element.push_attribute(("path", path.as_str()));
    element.push_attribute(("contenttype", texture.content_type.content_type()));
    if !texture.bounding_box.is_default() {
        element.push_attribute(("box", texture.bounding_box.attribute_value().as_str()));
    }
    if texture.tile_style_u != TileStyle::Wrap {
        element.push_attribute(("tilestyleu", texture.tile_style_u.attribute_value()));
    }
    if texture.tile_style_v != TileStyle::Wrap {
        element.push_attribute(("tilestylev", texture.tile_style_v.attribute_value()));
    }
    writer
        .write_event(Event::Empty(element))
        .map_err(|e| Error::xml_write(format!("Failed to write texture element: {}", e)))?;
    Ok(())
}

pub(super) fn write_texture2dgroup<W: IoWrite>(
    writer: &mut Writer<W>,
    group: &Rc<Texture2DGroup>,
    ids: &HashMap<usize, i64>,
) -> Result<()> {
    let mut element = BytesStart::new("m:texture2dgroup");
    element.push_attribute((
        "id",
        resource_id(ids, pointer_key(group))?.to_string().as_str(),
    ));
    element.push_attribute((
        "texid",
        resource_id(ids, pointer_key(&group.texture))?.to_string().as_str(),
    ));

    if group.coords.is_empty() {
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write texture group: {}", e)))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(element))
        .map_err(|e| Error::xml_write(format!("Failed to write texture group: {}", e)))?;
    for coord in &group.coords {
        let mut element = BytesStart::new("m:tex2coord");
        element.push_attribute(("u", coord.u.to_string().as_str()));
        element.push_attribute(("v", coord.v.to_string().as_str()));
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write texture coordinate: {}", e)))?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("m:texture2dgroup")))
        .map_err(|e| Error::xml_write(format!("Failed to write texture group: {}", e)))?;
    Ok(())
}
