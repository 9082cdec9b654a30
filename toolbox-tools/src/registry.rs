//! Category-indexed runtime registry for tool handles.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use toolbox_primitives::ToolCategory;
use tracing::{debug, info};

use crate::error::{ToolError, ToolResult};
use crate::tool::{Capability, Tool, ToolHandle, ToolMetadata};

/// A tool registered under a category.
///
/// Registrations are immutable once created; the registry hands out clones
/// that share the underlying handle.
#[derive(Clone, Debug)]
pub struct ToolRegistration {
    category: ToolCategory,
    handle: ToolHandle,
}

impl ToolRegistration {
    /// Returns the registered tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.handle.metadata().name()
    }

    /// Returns the category the tool was registered under.
    #[must_use]
    pub fn category(&self) -> ToolCategory {
        self.category
    }

    /// Returns the tool metadata.
    #[must_use]
    pub fn metadata(&self) -> &ToolMetadata {
        self.handle.metadata()
    }

    /// Returns the invocation handle.
    #[must_use]
    pub fn handle(&self) -> &ToolHandle {
        &self.handle
    }
}

/// Snapshot of registrations returned by [`ToolRegistry::list`].
///
/// The snapshot is detached from the registry, so it can be iterated any
/// number of times without holding a lock.
#[derive(Clone, Debug, Default)]
pub struct ToolListing {
    entries: Vec<ToolRegistration>,
}

impl ToolListing {
    /// Returns a fresh iterator over the snapshot.
    pub fn iter(&self) -> std::slice::Iter<'_, ToolRegistration> {
        self.entries.iter()
    }

    /// Number of registrations in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the snapshot holds no registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the tool names in listing order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.iter().map(|entry| entry.name().to_owned()).collect()
    }
}

impl IntoIterator for ToolListing {
    type Item = ToolRegistration;
    type IntoIter = std::vec::IntoIter<ToolRegistration>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ToolListing {
    type Item = &'a ToolRegistration;
    type IntoIter = std::slice::Iter<'a, ToolRegistration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Default)]
struct Inner {
    tools: HashMap<String, ToolRegistration>,
    by_category: HashMap<ToolCategory, Vec<String>>,
    frozen: bool,
}

impl Inner {
    fn listing_for(&self, category: ToolCategory) -> impl Iterator<Item = &ToolRegistration> {
        self.by_category
            .get(&category)
            .into_iter()
            .flatten()
            .filter_map(|name| self.tools.get(name))
    }
}

/// Registry that stores tool handles keyed by name and indexed by category.
///
/// Reads and writes take the internal lock only for the duration of the call.
/// Invocation happens on cloned handles, outside the lock.
#[derive(Default)]
pub struct ToolRegistry {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("ToolRegistry")
            .field("registered", &inner.tools.len())
            .field("frozen", &inner.frozen)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave `Inner` half-updated, so a
    // poisoned guard is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a tool implementation under `category`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present and
    /// [`ToolError::RegistryFrozen`] once [`freeze`](Self::freeze) was called.
    /// The registry is unchanged in both cases.
    pub fn register_tool<T>(
        &self,
        metadata: ToolMetadata,
        category: ToolCategory,
        tool: T,
    ) -> ToolResult<()>
    where
        T: Tool + 'static,
    {
        self.insert(category, ToolHandle::new(metadata, tool))
    }

    /// Registers a tool that declares its own metadata.
    ///
    /// # Errors
    ///
    /// Same as [`register_tool`](Self::register_tool).
    pub fn register<C>(&self, category: ToolCategory, capability: C) -> ToolResult<()>
    where
        C: Capability + 'static,
    {
        let metadata = capability.metadata();
        self.register_tool(metadata, category, capability)
    }

    fn insert(&self, category: ToolCategory, handle: ToolHandle) -> ToolResult<()> {
        let name = handle.metadata().name().to_owned();
        let mut inner = self.write();

        if inner.frozen {
            return Err(ToolError::RegistryFrozen { name });
        }
        if inner.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }

        inner
            .by_category
            .entry(category)
            .or_default()
            .push(name.clone());
        inner
            .tools
            .insert(name.clone(), ToolRegistration { category, handle });
        drop(inner);

        info!(tool = %name, %category, "registered tool");
        Ok(())
    }

    /// Removes a registration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if the name is absent and
    /// [`ToolError::RegistryFrozen`] if the registry is frozen.
    pub fn unregister(&self, name: &str) -> ToolResult<ToolRegistration> {
        let mut inner = self.write();
        if inner.frozen {
            return Err(ToolError::RegistryFrozen {
                name: name.to_owned(),
            });
        }

        let registration = inner
            .tools
            .remove(name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_owned(),
            })?;

        if let Some(names) = inner.by_category.get_mut(&registration.category) {
            names.retain(|existing| existing != name);
            if names.is_empty() {
                inner.by_category.remove(&registration.category);
            }
        }
        drop(inner);

        info!(tool = %name, category = %registration.category, "unregistered tool");
        Ok(registration)
    }

    /// Stops accepting registrations and removals.
    pub fn freeze(&self) {
        let mut inner = self.write();
        if !inner.frozen {
            inner.frozen = true;
            debug!(tools = inner.tools.len(), "tool registry frozen");
        }
    }

    /// Returns `true` once [`freeze`](Self::freeze) has been called.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.read().frozen
    }

    /// Returns the registration matching `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ToolRegistration> {
        self.read().tools.get(name).cloned()
    }

    /// Returns the registration matching `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when the tool is not registered.
    pub fn lookup(&self, name: &str) -> ToolResult<ToolRegistration> {
        self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_owned(),
        })
    }

    /// Lists registrations, restricted to `category` when supplied.
    ///
    /// Within a category entries keep their registration order. Without a
    /// category, categories are concatenated in [`ToolCategory::ALL`] order.
    #[must_use]
    pub fn list(&self, category: Option<ToolCategory>) -> ToolListing {
        let guard = self.read();
        let inner: &Inner = &guard;
        let entries = match category {
            Some(category) => inner.listing_for(category).cloned().collect(),
            None => ToolCategory::ALL
                .iter()
                .flat_map(|category| inner.listing_for(*category))
                .cloned()
                .collect(),
        };
        ToolListing { entries }
    }

    /// Counts registrations, restricted to `category` when supplied.
    #[must_use]
    pub fn count(&self, category: Option<ToolCategory>) -> usize {
        let inner = self.read();
        match category {
            Some(category) => inner.by_category.get(&category).map_or(0, Vec::len),
            None => inner.tools.len(),
        }
    }

    /// Returns per-category counts, omitting empty categories.
    #[must_use]
    pub fn category_counts(&self) -> BTreeMap<ToolCategory, usize> {
        self.read()
            .by_category
            .iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(category, names)| (*category, names.len()))
            .collect()
    }

    /// Returns tool names grouped by category, omitting empty categories.
    #[must_use]
    pub fn names_by_category(&self) -> BTreeMap<ToolCategory, Vec<String>> {
        self.read()
            .by_category
            .iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(category, names)| (*category, names.clone()))
            .collect()
    }

    /// Returns every registered tool name, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.read().tools.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use toolbox_primitives::Parameters;

    fn metadata(name: &str) -> ToolMetadata {
        ToolMetadata::new(name, format!("{name} tool")).unwrap()
    }

    fn echo(registry: &ToolRegistry, name: &str, category: ToolCategory) -> ToolResult<()> {
        registry.register_tool(metadata(name), category, |params: Parameters| async move {
            Ok(Value::Object(params))
        })
    }

    #[tokio::test]
    async fn register_and_invoke_tool() {
        let registry = ToolRegistry::new();
        echo(&registry, "echo", ToolCategory::Storage).unwrap();

        let registration = registry.lookup("echo").unwrap();
        assert_eq!(registration.category(), ToolCategory::Storage);

        let mut params = Parameters::new();
        params.insert("message".into(), json!("hello"));
        let output = registration.handle().invoke(params.clone()).await.unwrap();
        assert_eq!(output, Value::Object(params));
    }

    #[test]
    fn counts_follow_categories() {
        let registry = ToolRegistry::new();
        echo(&registry, "price", ToolCategory::MarketData).unwrap();
        echo(&registry, "balance", ToolCategory::ChainRead).unwrap();
        echo(&registry, "quote", ToolCategory::MarketData).unwrap();

        assert_eq!(registry.count(None), 3);
        assert_eq!(registry.count(Some(ToolCategory::MarketData)), 2);
        assert_eq!(registry.count(Some(ToolCategory::ChainRead)), 1);
        assert_eq!(registry.count(Some(ToolCategory::Social)), 0);

        let counts = registry.category_counts();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&ToolCategory::MarketData], 2);
    }

    #[test]
    fn duplicate_registration_leaves_registry_unchanged() {
        let registry = ToolRegistry::new();
        echo(&registry, "echo", ToolCategory::Storage).unwrap();

        let err = echo(&registry, "echo", ToolCategory::Memory)
            .expect_err("duplicate registration should fail");
        assert!(matches!(err, ToolError::DuplicateTool { ref name } if name == "echo"));

        assert_eq!(registry.count(None), 1);
        assert_eq!(registry.count(Some(ToolCategory::Memory)), 0);
        assert_eq!(
            registry.lookup("echo").unwrap().category(),
            ToolCategory::Storage
        );
    }

    #[test]
    fn unknown_tool_errors() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("missing").expect_err("unknown tool");
        assert!(matches!(err, ToolError::UnknownTool { name } if name == "missing"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn listing_is_restartable_and_ordered() {
        let registry = ToolRegistry::new();
        echo(&registry, "search_web", ToolCategory::Search).unwrap();
        echo(&registry, "zeta_price", ToolCategory::MarketData).unwrap();
        echo(&registry, "alpha_price", ToolCategory::MarketData).unwrap();

        let market = registry.list(Some(ToolCategory::MarketData));
        assert_eq!(market.names(), vec!["zeta_price", "alpha_price"]);
        assert_eq!(market.iter().count(), 2);
        assert_eq!(market.iter().count(), 2);

        let all = registry.list(None);
        assert_eq!(all.names(), vec!["zeta_price", "alpha_price", "search_web"]);
        assert!(registry.list(Some(ToolCategory::Social)).is_empty());
    }

    #[test]
    fn frozen_registry_rejects_changes() {
        let registry = ToolRegistry::new();
        echo(&registry, "echo", ToolCategory::Storage).unwrap();
        registry.freeze();
        assert!(registry.is_frozen());

        let err = echo(&registry, "late", ToolCategory::Storage).expect_err("frozen");
        assert!(matches!(err, ToolError::RegistryFrozen { .. }));
        let err = registry.unregister("echo").expect_err("frozen");
        assert!(matches!(err, ToolError::RegistryFrozen { .. }));
        assert_eq!(registry.count(None), 1);
    }

    #[test]
    fn unregister_removes_from_index() {
        let registry = ToolRegistry::new();
        echo(&registry, "store", ToolCategory::Storage).unwrap();
        echo(&registry, "recall", ToolCategory::Memory).unwrap();

        let removed = registry.unregister("store").unwrap();
        assert_eq!(removed.name(), "store");
        assert_eq!(registry.count(Some(ToolCategory::Storage)), 0);
        assert!(!registry.category_counts().contains_key(&ToolCategory::Storage));
        assert_eq!(registry.tool_names(), vec!["recall"]);

        let by_category = registry.names_by_category();
        assert_eq!(by_category[&ToolCategory::Memory], vec!["recall"]);
    }
}
