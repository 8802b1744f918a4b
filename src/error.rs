//! Error types for 3MF operations
//!
//! Every error carries a stable code in its display string so callers can
//! categorize failures without matching on message text.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML and package structure errors
//!
//! ## Codes
//!
//! - `E1001`: I/O error
//! - `E1002`: ZIP archive error
//! - `E2001`: XML syntax error
//! - `E2002`: XML attribute error
//! - `E2003`: model document parse error
//! - `E2004`: package structure error
//! - `E2005`: XML writing error

use std::io;
use thiserror::Error;

/// Result type for 3MF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when reading or writing 3MF packages
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while reading or writing a package
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted archive
    /// - Unsupported compression method
    /// - Truncated file
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML syntax error
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Model document parse error
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Missing or malformed attributes
    /// - References to undeclared resources
    /// - Out-of-range vertex or property indices
    #[error("[E2003] Parse error: {0}")]
    Parse(String),

    /// Package structure error
    ///
    /// **Error Code**: E2004
    ///
    /// **Common Causes**:
    /// - A relationship without a target
    /// - A relationship pointing at an entry the archive does not contain
    #[error("[E2004] Package error: {0}")]
    Package(String),

    /// XML writing error
    ///
    /// **Error Code**: E2005
    #[error("[E2005] XML writing error: {0}")]
    XmlWrite(String),
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::Parse(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::Parse(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    /// Create a Package error
    pub fn package(message: impl Into<String>) -> Self {
        Error::Package(message.into())
    }

    /// Create a Parse error for a required attribute that is absent
    ///
    /// # Example
    /// ```ignore
    /// Error::missing_attribute("x")
    /// ```
    pub fn missing_attribute(attribute: &str) -> Self {
        Error::Parse(format!("Missing required attribute '{}'.", attribute))
    }

    /// Create a Parse error for an expected attribute that is absent
    ///
    /// Same condition as [`Error::missing_attribute`] with the wording used
    /// by material elements.
    pub fn expected_attribute(attribute: &str) -> Self {
        Error::Parse(format!("Expected attribute '{}'.", attribute))
    }

    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let io_err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "test"));
        assert!(io_err.to_string().contains("[E1001]"));

        let parse_err = Error::parse("test");
        assert!(parse_err.to_string().contains("[E2003]"));

        let package_err = Error::package("test");
        assert!(package_err.to_string().contains("[E2004]"));

        let write_err = Error::xml_write("test".to_string());
        assert!(write_err.to_string().contains("[E2005]"));
    }

    #[test]
    fn test_missing_attribute_helper() {
        let err = Error::missing_attribute("x");
        assert_eq!(
            err.to_string(),
            "[E2003] Parse error: Missing required attribute 'x'."
        );
    }

    #[test]
    fn test_expected_attribute_helper() {
        let err = Error::expected_attribute("displaycolor");
        assert_eq!(
            err.to_string(),
            "[E2003] Parse error: Expected attribute 'displaycolor'."
        );
    }

    #[test]
    fn test_parse_float_error_conversion() {
        let parse_err: std::num::ParseFloatError = "not_a_number".parse::<f64>().unwrap_err();
        let err = Error::from(parse_err);
        assert!(
            err.to_string()
                .contains("Failed to parse floating-point number")
        );
        assert!(err.to_string().contains("[E2003]"));
    }

    #[test]
    fn test_parse_int_error_conversion() {
        let parse_err: std::num::ParseIntError = "not_a_number".parse::<i32>().unwrap_err();
        let err = Error::from(parse_err);
        assert!(err.to_string().contains("Failed to parse integer"));
        assert!(err.to_string().contains("[E2003]"));
    }
}
