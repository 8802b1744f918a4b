//! Material element parsing
//!
//! Base material groups, color groups, textures, and texture coordinate
//! groups. All live in the material namespace; matching is by local name so
//! any prefix binding works.

use std::collections::HashMap;

use quick_xml::events::BytesStart;

use crate::error::{Error, Result};
use crate::model::{
    Base, BaseMaterials, BoundingBox, Color, ColorGroup, ImageContentType, Resource, Tex2Coord,
    Texture2D, Texture2DGroup, TileStyle,
};
use crate::opc::ArchiveReader;

use super::{parse_attributes, parse_double, required_attribute, required_int_attribute};

/// Parse a `<basematerials>` opening tag
pub(super) fn parse_basematerials_start(e: &BytesStart<'_>) -> Result<(i64, BaseMaterials)> {
    let attrs = parse_attributes(e)?;
    let id = required_int_attribute(&attrs, "id")?;
    Ok((id, BaseMaterials::new()))
}

/// Parse a `<base>` tag
pub(super) fn parse_base(e: &BytesStart<'_>) -> Result<Base> {
    let attrs = parse_attributes(e)?;
    let name = required_attribute(&attrs, "name")?;
    let color = Color::parse(required_attribute(&attrs, "displaycolor")?)?;
    Ok(Base::new(name, color))
}

/// Parse a `<colorgroup>` opening tag
pub(super) fn parse_colorgroup_start(e: &BytesStart<'_>) -> Result<(i64, ColorGroup)> {
    let attrs = parse_attributes(e)?;
    let id = required_int_attribute(&attrs, "id")?;
    Ok((id, ColorGroup::new()))
}

/// Parse a `<color>` tag
pub(super) fn parse_color(e: &BytesStart<'_>) -> Result<Color> {
    let attrs = parse_attributes(e)?;
    Color::parse(required_attribute(&attrs, "color")?)
}

/// Parse a `<texture2d>` tag
///
/// The `path` attribute is consumed here: the payload it names is read from
/// the archive and owned by the returned texture. The path itself is not kept;
/// a fresh one is generated on write.
pub(super) fn parse_texture2d(
    e: &BytesStart<'_>,
    archive: &mut dyn ArchiveReader,
) -> Result<(i64, Texture2D)> {
    let attrs = parse_attributes(e)?;
    let id = required_int_attribute(&attrs, "id")?;
    let path = required_attribute(&attrs, "path")?;
    let content_type = ImageContentType::parse(required_attribute(&attrs, "contenttype")?)?;

    let data = archive.read_payload(path)?;
    let mut texture = Texture2D::new(data, content_type);
    if let Some(value) = attrs.get("box") {
        texture.bounding_box = BoundingBox::parse(value)?;
    }
    texture.tile_style_u = TileStyle::parse(attrs.get("tilestyleu").map(String::as_str))?;
    texture.tile_style_v = TileStyle::parse(attrs.get("tilestylev").map(String::as_str))?;
    Ok((id, texture))
}

/// Parse a `<texture2dgroup>` opening tag
///
/// `texid` must name a texture already in the id table.
pub(super) fn parse_texture2dgroup_start(
    e: &BytesStart<'_>,
    resources_by_id: &HashMap<i64, Resource>,
) -> Result<(i64, Texture2DGroup)> {
    let attrs = parse_attributes(e)?;
    let id = required_int_attribute(&attrs, "id")?;
    let texid = required_int_attribute(&attrs, "texid")?;

    let texture = match resources_by_id.get(&texid) {
        Some(Resource::Texture2D(texture)) => texture.clone(),
        _ => return Err(Error::parse(format!("Invalid texture id {}.", texid))),
    };

    Ok((id, Texture2DGroup::new(texture)))
}

/// Parse a `<tex2coord>` tag
pub(super) fn parse_tex2coord(e: &BytesStart<'_>) -> Result<Tex2Coord> {
    let attrs = parse_attributes(e)?;
    let u = parse_double(required_attribute(&attrs, "u")?)?;
    let v = parse_double(required_attribute(&attrs, "v")?)?;
    Ok(Tex2Coord::new(u, v))
}
