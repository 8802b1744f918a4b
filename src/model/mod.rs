//! Data structures representing 3MF models

mod core;
mod material;
mod primitives;
mod resource;

pub use core::{
    CORE_NAMESPACE, Component, DEFAULT_LANGUAGE, MATERIAL_NAMESPACE, Mesh, Model, ModelItem,
    Object, ObjectProperty, ObjectType, ParserConfig, Thumbnail, Triangle, TriangleProperty,
    Vertex,
};

pub use material::{Base, BaseMaterials, ColorGroup, Tex2Coord, Texture2D, Texture2DGroup};

pub use primitives::{BoundingBox, Color, ImageContentType, TileStyle, Transform, Unit};

pub use resource::{PropertyResource, Resource};
