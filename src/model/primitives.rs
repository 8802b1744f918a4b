//! Attribute-level value types shared across the model document
//!
//! Each type pairs its in-memory representation with the codec for its XML
//! attribute form.

use crate::error::{Error, Result};

/// Size of a 3MF transformation matrix (4x3 affine transform in row-major order)
pub(crate) const TRANSFORM_MATRIX_SIZE: usize = 12;

/// Unit of measure for a model document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Micrometers
    Micron,
    /// Millimeters (the 3MF default)
    Millimeter,
    /// Centimeters
    Centimeter,
    /// Inches
    Inch,
    /// Feet
    Foot,
    /// Meters
    Meter,
}

impl Unit {
    /// The `unit` attribute form of this unit
    pub fn attribute_value(&self) -> &'static str {
        match self {
            Unit::Micron => "micron",
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Inch => "inch",
            Unit::Foot => "foot",
            Unit::Meter => "meter",
        }
    }

    /// Parse a `unit` attribute value; an absent attribute means millimeters
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value {
            None => Ok(Unit::Millimeter),
            Some("micron") => Ok(Unit::Micron),
            Some("millimeter") => Ok(Unit::Millimeter),
            Some("centimeter") => Ok(Unit::Centimeter),
            Some("inch") => Ok(Unit::Inch),
            Some("foot") => Ok(Unit::Foot),
            Some("meter") => Ok(Unit::Meter),
            Some(other) => Err(Error::parse(format!("Unsupported model unit '{}'", other))),
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::Millimeter
    }
}

/// A 4x3 affine transformation matrix
///
/// Values are stored in the `transform` attribute order:
/// `m00 m01 m02 m10 m11 m12 m20 m21 m22 m30 m31 m32`. The first nine values
/// form a 3x3 rotation/scale matrix, the last three the translation row.
/// Points transform as row vectors, `[x y z 1] * M`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Matrix values in attribute order
    pub matrix: [f64; TRANSFORM_MATRIX_SIZE],
}

impl Transform {
    /// The identity transform
    pub const IDENTITY: Transform = Transform {
        matrix: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
    };

    /// Create a transform from matrix values in attribute order
    pub fn new(matrix: [f64; TRANSFORM_MATRIX_SIZE]) -> Self {
        Self { matrix }
    }

    /// Whether this is the identity transform
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Apply the transform to a point
    pub fn transform_point(&self, point: [f64; 3]) -> [f64; 3] {
        let [x, y, z] = point;
        let m = &self.matrix;
        [
            x * m[0] + y * m[3] + z * m[6] + m[9],
            x * m[1] + y * m[4] + z * m[7] + m[10],
            x * m[2] + y * m[5] + z * m[8] + m[11],
        ]
    }

    /// Parse a `transform` attribute value
    pub fn parse(value: &str) -> Result<Self> {
        let values: Result<Vec<f64>> = value
            .split_whitespace()
            .map(|s| s.parse::<f64>().map_err(Error::from))
            .collect();
        let values = values?;

        if values.len() != TRANSFORM_MATRIX_SIZE {
            return Err(Error::parse(format!(
                "Transform matrix must have exactly {} values (got {})",
                TRANSFORM_MATRIX_SIZE,
                values.len()
            )));
        }

        let mut matrix = [0.0; TRANSFORM_MATRIX_SIZE];
        matrix.copy_from_slice(&values);
        Ok(Self { matrix })
    }

    /// The `transform` attribute form of this matrix
    pub fn attribute_value(&self) -> String {
        self.matrix
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An sRGB color with alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Color {
    /// Create an opaque color
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with an explicit alpha channel
    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a `#RRGGBB` or `#RRGGBBAA` attribute value
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || Error::parse(format!("Invalid color value '{}'.", value));
        let hex = value.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 && hex.len() != 8 {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        let r = channel(0..2)?;
        let g = channel(2..4)?;
        let b = channel(4..6)?;
        let a = if hex.len() == 8 { channel(6..8)? } else { 255 };
        Ok(Self { r, g, b, a })
    }

    /// The attribute form of this color, always eight hex digits
    pub fn attribute_value(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

/// Texture tiling behavior along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileStyle {
    /// Repeat the texture (the default)
    Wrap,
    /// Repeat with every other tile mirrored
    Mirror,
    /// Clamp to the edge texel
    Clamp,
}

impl TileStyle {
    /// The attribute form of this tile style
    pub fn attribute_value(&self) -> &'static str {
        match self {
            TileStyle::Wrap => "wrap",
            TileStyle::Mirror => "mirror",
            TileStyle::Clamp => "clamp",
        }
    }

    /// Parse a tile style attribute value; an absent attribute means wrap
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value {
            None => Ok(TileStyle::Wrap),
            Some("wrap") => Ok(TileStyle::Wrap),
            Some("mirror") => Ok(TileStyle::Mirror),
            Some("clamp") => Ok(TileStyle::Clamp),
            Some(other) => Err(Error::parse(format!("Invalid tile style '{}'.", other))),
        }
    }
}

impl Default for TileStyle {
    fn default() -> Self {
        TileStyle::Wrap
    }
}

/// Content type of a binary image payload (textures and thumbnails)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageContentType {
    /// JPEG image data
    Jpeg,
    /// PNG image data
    Png,
}

impl ImageContentType {
    /// The MIME content type, used both as the `contenttype` attribute and
    /// in package content type entries
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageContentType::Jpeg => "image/jpeg",
            ImageContentType::Png => "image/png",
        }
    }

    /// The file extension used for package entries of this type
    pub fn extension(&self) -> &'static str {
        match self {
            ImageContentType::Jpeg => ".jpg",
            ImageContentType::Png => ".png",
        }
    }

    /// Parse a MIME content type value
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "image/jpeg" => Ok(ImageContentType::Jpeg),
            "image/png" => Ok(ImageContentType::Png),
            other => Err(Error::parse(format!(
                "Invalid image content type '{}'.",
                other
            ))),
        }
    }

    /// Derive the content type from a package entry path
    pub fn from_extension(path: &str) -> Result<Self> {
        let extension = path.rsplit('.').next().unwrap_or("");
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ImageContentType::Jpeg),
            "png" => Ok(ImageContentType::Png),
            _ => Err(Error::parse(format!(
                "Invalid image content type '{}'.",
                extension
            ))),
        }
    }
}

/// A texture bounding box in UV space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Left edge
    pub u: f64,
    /// Bottom edge
    pub v: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// The default box covering the whole texture
    pub const DEFAULT: BoundingBox = BoundingBox {
        u: 0.0,
        v: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Create a bounding box
    pub fn new(u: f64, v: f64, width: f64, height: f64) -> Self {
        Self {
            u,
            v,
            width,
            height,
        }
    }

    /// Whether this is the default box
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// Parse a `box` attribute value of four space-separated floats
    pub fn parse(value: &str) -> Result<Self> {
        let values: Result<Vec<f64>> = value
            .split_whitespace()
            .map(|s| s.parse::<f64>().map_err(Error::from))
            .collect();
        let values = values?;

        if values.len() != 4 {
            return Err(Error::parse(format!(
                "Bounding box must have exactly 4 values (got {})",
                values.len()
            )));
        }

        Ok(Self {
            u: values[0],
            v: values[1],
            width: values[2],
            height: values[3],
        })
    }

    /// The `box` attribute form of this bounding box
    pub fn attribute_value(&self) -> String {
        format!("{} {} {} {}", self.u, self.v, self.width, self.height)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_parse_and_write() {
        assert_eq!(Unit::parse(None).unwrap(), Unit::Millimeter);
        assert_eq!(Unit::parse(Some("inch")).unwrap(), Unit::Inch);
        assert_eq!(Unit::Foot.attribute_value(), "foot");

        let err = Unit::parse(Some("furlong")).unwrap_err();
        assert!(err.to_string().contains("Unsupported model unit 'furlong'"));
    }

    #[test]
    fn test_transform_identity() {
        assert!(Transform::IDENTITY.is_identity());
        assert!(Transform::default().is_identity());
        assert!(!Transform::new([2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0])
            .is_identity());
    }

    #[test]
    fn test_transform_point() {
        // Uniform scale by 2, then translate by 10 on each axis.
        let transform = Transform::new([
            2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 10.0, 10.0, 10.0,
        ]);
        assert_eq!(transform.transform_point([1.0, 1.0, 1.0]), [12.0, 12.0, 12.0]);
    }

    #[test]
    fn test_transform_parse_round_trip() {
        let value = "1 0 0 0 1 0 0 0 1 5 10 15";
        let transform = Transform::parse(value).unwrap();
        assert_eq!(transform.matrix[9], 5.0);
        assert_eq!(transform.attribute_value(), value);
    }

    #[test]
    fn test_transform_parse_wrong_count() {
        let err = Transform::parse("1 2 3").unwrap_err();
        assert!(err.to_string().contains("exactly 12 values (got 3)"));
    }

    #[test]
    fn test_color_parse_six_digits() {
        let color = Color::parse("#0000FF").unwrap();
        assert_eq!(color, Color::with_alpha(0, 0, 255, 255));
    }

    #[test]
    fn test_color_parse_eight_digits() {
        let color = Color::parse("#00FF0080").unwrap();
        assert_eq!(color, Color::with_alpha(0, 255, 0, 128));
    }

    #[test]
    fn test_color_writes_eight_digits() {
        assert_eq!(Color::new(0, 0, 255).attribute_value(), "#0000FFFF");
        assert_eq!(
            Color::with_alpha(0, 255, 0, 0).attribute_value(),
            "#00FF0000"
        );
    }

    #[test]
    fn test_color_parse_invalid() {
        for value in ["0000FF", "#12345", "#GGGGGG", ""] {
            let err = Color::parse(value).unwrap_err();
            assert!(err.to_string().contains("Invalid color value"));
        }
    }

    #[test]
    fn test_tile_style_codec() {
        assert_eq!(TileStyle::parse(None).unwrap(), TileStyle::Wrap);
        assert_eq!(TileStyle::parse(Some("mirror")).unwrap(), TileStyle::Mirror);
        assert_eq!(TileStyle::Clamp.attribute_value(), "clamp");

        let err = TileStyle::parse(Some("repeat")).unwrap_err();
        assert!(err.to_string().contains("Invalid tile style 'repeat'."));
    }

    #[test]
    fn test_image_content_type_codec() {
        assert_eq!(
            ImageContentType::parse("image/jpeg").unwrap(),
            ImageContentType::Jpeg
        );
        assert_eq!(ImageContentType::Png.content_type(), "image/png");
        assert_eq!(ImageContentType::Jpeg.extension(), ".jpg");

        let err = ImageContentType::parse("image/gif").unwrap_err();
        assert!(err.to_string().contains("Invalid image content type"));
    }

    #[test]
    fn test_image_content_type_from_extension() {
        assert_eq!(
            ImageContentType::from_extension("/Thumbnails/abc.jpeg").unwrap(),
            ImageContentType::Jpeg
        );
        assert_eq!(
            ImageContentType::from_extension("/3D/Textures/abc.PNG").unwrap(),
            ImageContentType::Png
        );
        assert!(ImageContentType::from_extension("/Thumbnails/abc.gif").is_err());
    }

    #[test]
    fn test_bounding_box_codec() {
        assert!(BoundingBox::default().is_default());

        let parsed = BoundingBox::parse("0 1 2 3").unwrap();
        assert_eq!(parsed, BoundingBox::new(0.0, 1.0, 2.0, 3.0));
        assert_eq!(parsed.attribute_value(), "0 1 2 3");

        let err = BoundingBox::parse("0 1 2").unwrap_err();
        assert!(err.to_string().contains("exactly 4 values (got 3)"));
    }
}
