//! Identity of a registration: service name plus instance name.

use std::fmt;

use serde::Serialize;

use crate::error::RegistryError;

/// Longest accepted service or instance name, in bytes.
pub const MAX_NAME_LEN: usize = 256;

/// Unique key of a registered daemon, e.g. `laundry/pid4242`.
///
/// Immutable once created. Construct through [`ServiceKey::new`], which
/// validates both halves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ServiceKey {
    service_name: String,
    instance_name: String,
}

impl ServiceKey {
    /// Builds a key after validating both names.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidRequest`] if either name is empty,
    /// longer than [`MAX_NAME_LEN`] bytes, or contains a NUL byte.
    pub fn new(
        service_name: impl Into<String>,
        instance_name: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let service_name = service_name.into();
        let instance_name = instance_name.into();
        validate_name("service_name", &service_name)?;
        validate_name("instance_name", &instance_name)?;
        Ok(Self {
            service_name,
            instance_name,
        })
    }

    /// Service (daemon type) half of the key.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Instance half of the key.
    #[must_use]
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service_name, self.instance_name)
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), RegistryError> {
    if value.is_empty() {
        return Err(RegistryError::InvalidRequest(format!("{field} must not be empty")));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(RegistryError::InvalidRequest(format!(
            "{field} exceeds {MAX_NAME_LEN} bytes"
        )));
    }
    if value.contains('\0') {
        return Err(RegistryError::InvalidRequest(format!(
            "{field} must not contain NUL"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_with_slash() {
        let Ok(key) = ServiceKey::new("laundry", "pid42") else {
            panic!("valid key");
        };
        assert_eq!(key.to_string(), "laundry/pid42");
        assert_eq!(key.service_name(), "laundry");
        assert_eq!(key.instance_name(), "pid42");
    }

    #[test]
    fn rejects_empty_names() {
        assert!(ServiceKey::new("", "pid42").is_err());
        assert!(ServiceKey::new("laundry", "").is_err());
    }

    #[test]
    fn rejects_nul_and_oversized_names() {
        assert!(ServiceKey::new("laun\0dry", "pid42").is_err());
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(ServiceKey::new("laundry", long).is_err());
        let edge = "x".repeat(MAX_NAME_LEN);
        assert!(ServiceKey::new("laundry", edge).is_ok());
    }

    #[test]
    fn same_names_compare_equal() {
        let a = ServiceKey::new("laundry", "pid42");
        let b = ServiceKey::new("laundry", "pid42");
        assert_eq!(a.ok(), b.ok());
    }
}
