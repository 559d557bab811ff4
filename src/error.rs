/// Result type alias for layout construction and codec operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A parameter is missing, malformed, or violates a precondition
    #[error("configuration error for \"{key}\": {message}")]
    Config { key: String, message: String },

    /// No registry entry carries this name
    #[error("unknown layout: {name}")]
    UnknownLayout { name: String },

    /// A combinator was given arguments that would break the tree invariants
    #[error("invalid layout: {message}")]
    InvalidLayout { message: String },

    /// A segment reaches outside an explicit buffer bound
    #[error("segment at offset {offset} with length {len} exceeds capacity {capacity}")]
    OutOfBounds { offset: i64, len: u64, capacity: u64 },

    /// Two segments would write the same destination byte
    #[error("overlapping segments at offset {offset}")]
    Overlap { offset: i64 },

    /// The packed buffer does not hold exactly one packed image
    #[error("packed buffer has {actual} bytes, expected {expected}")]
    PackedLength { expected: u64, actual: u64 },
}

impl Error {
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn missing(key: impl Into<String>) -> Self {
        Self::config(key, "required parameter is not specified")
    }

    /// Precondition failure, e.g. `Error::precondition("B", "block length must not exceed stride")`
    pub fn precondition(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::config(key, message)
    }

    pub fn unknown_layout(name: impl Into<String>) -> Self {
        Self::UnknownLayout { name: name.into() }
    }

    pub fn invalid_layout(message: impl Into<String>) -> Self {
        Self::InvalidLayout {
            message: message.into(),
        }
    }

    pub fn out_of_bounds(offset: i64, len: u64, capacity: u64) -> Self {
        Self::OutOfBounds {
            offset,
            len,
            capacity,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_key() {
        let e = Error::precondition("B", "block length must not exceed stride");
        assert!(e.is_config());
        assert_eq!(
            e.to_string(),
            "configuration error for \"B\": block length must not exceed stride"
        );
    }

    #[test]
    fn unknown_layout_message() {
        assert_eq!(
            Error::unknown_layout("spiral").to_string(),
            "unknown layout: spiral"
        );
    }
}
