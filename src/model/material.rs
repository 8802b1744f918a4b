//! Material resource types
//!
//! These resources live in the material namespace and are written with the
//! `m:` prefix. Base material groups, color groups, and texture coordinate
//! groups are property resources: objects and triangles can reference their
//! entries by index.

use std::rc::Rc;

use super::primitives::{BoundingBox, Color, ImageContentType, TileStyle};

/// A group of named base materials
#[derive(Debug, Clone, Default)]
pub struct BaseMaterials {
    /// Materials in this group
    pub bases: Vec<Base>,
}

impl BaseMaterials {
    /// Create an empty base material group
    pub fn new() -> Self {
        Self { bases: Vec::new() }
    }
}

/// A single base material
#[derive(Debug, Clone, PartialEq)]
pub struct Base {
    /// Material name
    pub name: String,
    /// Display color
    pub color: Color,
}

impl Base {
    /// Create a base material
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// A group of colors
#[derive(Debug, Clone, Default)]
pub struct ColorGroup {
    /// Colors in this group
    pub colors: Vec<Color>,
}

impl ColorGroup {
    /// Create an empty color group
    pub fn new() -> Self {
        Self { colors: Vec::new() }
    }
}

/// A 2D texture resource
///
/// The texture owns its image bytes. The package path the bytes live under
/// is an archive concern: it is consumed while loading and regenerated on
/// every save, so it is not part of this type.
#[derive(Debug, Clone)]
pub struct Texture2D {
    /// Raw image data
    pub data: Vec<u8>,
    /// Image format of the data
    pub content_type: ImageContentType,
    /// UV region of the texture to use
    pub bounding_box: BoundingBox,
    /// Tiling along the U axis
    pub tile_style_u: TileStyle,
    /// Tiling along the V axis
    pub tile_style_v: TileStyle,
}

impl Texture2D {
    /// Create a texture from image data
    pub fn new(data: Vec<u8>, content_type: ImageContentType) -> Self {
        Self {
            data,
            content_type,
            bounding_box: BoundingBox::DEFAULT,
            tile_style_u: TileStyle::Wrap,
            tile_style_v: TileStyle::Wrap,
        }
    }
}

/// A texture coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tex2Coord {
    /// U coordinate (horizontal, from left)
    pub u: f64,
    /// V coordinate (vertical, from bottom)
    pub v: f64,
}

impl Tex2Coord {
    /// Create a texture coordinate
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

/// A group of texture coordinates into one texture
#[derive(Debug, Clone)]
pub struct Texture2DGroup {
    /// The texture the coordinates index into
    pub texture: Rc<Texture2D>,
    /// Texture coordinates in this group
    pub coords: Vec<Tex2Coord>,
}

impl Texture2DGroup {
    /// Create an empty coordinate group over a texture
    pub fn new(texture: Rc<Texture2D>) -> Self {
        Self {
            texture,
            coords: Vec::new(),
        }
    }
}
