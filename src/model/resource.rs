//! The resource union and property references
//!
//! Resources reference each other through shared pointers, never through
//! numeric ids. The `id` attributes seen in model XML exist only inside a
//! single parse or write pass, where a transient table maps them to and
//! from pointer identities.

use std::rc::Rc;

use super::core::Object;
use super::material::{BaseMaterials, ColorGroup, Texture2D, Texture2DGroup};

/// Any resource a model can declare
#[derive(Debug, Clone)]
pub enum Resource {
    /// A 3D object
    Object(Rc<Object>),
    /// A base material group
    BaseMaterials(Rc<BaseMaterials>),
    /// A color group
    ColorGroup(Rc<ColorGroup>),
    /// A 2D texture
    Texture2D(Rc<Texture2D>),
    /// A texture coordinate group
    Texture2DGroup(Rc<Texture2DGroup>),
}

impl Resource {
    /// Pointer identity of the underlying allocation
    ///
    /// Two `Resource` values compare equal under this key exactly when they
    /// share the same allocation.
    pub(crate) fn key(&self) -> usize {
        match self {
            Resource::Object(object) => Rc::as_ptr(object) as usize,
            Resource::BaseMaterials(materials) => Rc::as_ptr(materials) as usize,
            Resource::ColorGroup(group) => Rc::as_ptr(group) as usize,
            Resource::Texture2D(texture) => Rc::as_ptr(texture) as usize,
            Resource::Texture2DGroup(group) => Rc::as_ptr(group) as usize,
        }
    }

    /// View this resource as a property resource, if it is one
    pub fn as_property_resource(&self) -> Option<PropertyResource> {
        match self {
            Resource::BaseMaterials(materials) => {
                Some(PropertyResource::BaseMaterials(materials.clone()))
            }
            Resource::ColorGroup(group) => Some(PropertyResource::ColorGroup(group.clone())),
            Resource::Texture2DGroup(group) => {
                Some(PropertyResource::Texture2DGroup(group.clone()))
            }
            Resource::Object(_) | Resource::Texture2D(_) => None,
        }
    }
}

impl From<Rc<Object>> for Resource {
    fn from(object: Rc<Object>) -> Self {
        Resource::Object(object)
    }
}

impl From<Rc<BaseMaterials>> for Resource {
    fn from(materials: Rc<BaseMaterials>) -> Self {
        Resource::BaseMaterials(materials)
    }
}

impl From<Rc<ColorGroup>> for Resource {
    fn from(group: Rc<ColorGroup>) -> Self {
        Resource::ColorGroup(group)
    }
}

impl From<Rc<Texture2D>> for Resource {
    fn from(texture: Rc<Texture2D>) -> Self {
        Resource::Texture2D(texture)
    }
}

impl From<Rc<Texture2DGroup>> for Resource {
    fn from(group: Rc<Texture2DGroup>) -> Self {
        Resource::Texture2DGroup(group)
    }
}

/// A resource whose entries can be referenced by `(pid, index)` pairs
#[derive(Debug, Clone)]
pub enum PropertyResource {
    /// A base material group
    BaseMaterials(Rc<BaseMaterials>),
    /// A color group
    ColorGroup(Rc<ColorGroup>),
    /// A texture coordinate group
    Texture2DGroup(Rc<Texture2DGroup>),
}

impl PropertyResource {
    /// Number of property entries available for indexing
    pub fn property_count(&self) -> usize {
        match self {
            PropertyResource::BaseMaterials(materials) => materials.bases.len(),
            PropertyResource::ColorGroup(group) => group.colors.len(),
            PropertyResource::Texture2DGroup(group) => group.coords.len(),
        }
    }

    /// Pointer identity of the underlying allocation
    pub(crate) fn key(&self) -> usize {
        self.as_resource().key()
    }

    /// The declarable resource form of this property resource
    pub(crate) fn as_resource(&self) -> Resource {
        match self {
            PropertyResource::BaseMaterials(materials) => {
                Resource::BaseMaterials(materials.clone())
            }
            PropertyResource::ColorGroup(group) => Resource::ColorGroup(group.clone()),
            PropertyResource::Texture2DGroup(group) => Resource::Texture2DGroup(group.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_tracks_pointer_identity() {
        let object = Rc::new(Object::new());
        let first = Resource::Object(object.clone());
        let second = Resource::Object(object);
        assert_eq!(first.key(), second.key());

        let other = Resource::Object(Rc::new(Object::new()));
        assert_ne!(first.key(), other.key());
    }

    #[test]
    fn test_property_resource_counts() {
        let mut group = ColorGroup::new();
        group.colors.push(crate::model::Color::new(255, 0, 0));
        group.colors.push(crate::model::Color::new(0, 255, 0));
        let property = PropertyResource::ColorGroup(Rc::new(group));
        assert_eq!(property.property_count(), 2);
    }

    #[test]
    fn test_only_property_capable_resources_convert() {
        let object = Resource::Object(Rc::new(Object::new()));
        assert!(object.as_property_resource().is_none());

        let materials = Resource::BaseMaterials(Rc::new(BaseMaterials::new()));
        let property = materials.as_property_resource().unwrap();
        assert_eq!(property.key(), materials.key());
    }
}
