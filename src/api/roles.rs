use crate::relay::{BoxFuture, ProviderError, Role, RoleStore};
use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};

/// Role store backed by a fixed principal → role map.
///
/// Loaded from a JSON object such as `{"ops@example.com": "admin"}`.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleStore {
    roles: HashMap<String, Role>,
}

impl StaticRoleStore {
    #[must_use]
    pub fn new(roles: HashMap<String, Role>) -> Self {
        Self { roles }
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object of strings.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read roles file at {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid roles file {}", path.display()))
    }

    /// # Errors
    ///
    /// Returns an error if `raw` is not a JSON object of strings.
    pub fn from_json(raw: &str) -> Result<Self> {
        let roles: HashMap<String, Role> = serde_json::from_str(raw)?;
        Ok(Self::new(roles))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl RoleStore for StaticRoleStore {
    fn role<'a>(
        &'a self,
        principal_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Role>, ProviderError>> {
        let role = self.roles.get(principal_id).cloned();
        Box::pin(async move { Ok(role) })
    }
}
