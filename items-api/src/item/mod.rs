//! Items and the stores that hold them.
//!
//! Handlers never own item state. They receive an [`ItemStore`] through the
//! router state, so each store decides how concurrent requests are
//! serialised. [`InMemoryItemStore`] keeps everything behind one async lock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

pub mod api;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// A stored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub is_available: bool,
}

/// Fields accepted when creating an item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Changes to apply to an item. `None` leaves a field unchanged;
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    pub is_available: Option<bool>,
}

/// A field that failed validation, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidField {
    pub field: &'static str,
    pub message: String,
}

impl InvalidField {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn check_name(name: &str, problems: &mut Vec<InvalidField>) {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        problems.push(InvalidField::new(
            "name",
            format!("Name must be between 1 and {} characters", MAX_NAME_LEN),
        ));
    }
}

fn check_description(description: &str, problems: &mut Vec<InvalidField>) {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        problems.push(InvalidField::new(
            "description",
            format!("Description must be at most {} characters", MAX_DESCRIPTION_LEN),
        ));
    }
}

fn check_price(price: f64, problems: &mut Vec<InvalidField>) {
    if !price.is_finite() || price <= 0.0 {
        problems.push(InvalidField::new("price", "Price must be greater than 0"));
    }
}

impl ItemCreate {
    /// Returns every constraint the payload breaks; empty when valid.
    pub fn validate(&self) -> Vec<InvalidField> {
        let mut problems = Vec::new();
        check_name(&self.name, &mut problems);
        if let Some(description) = &self.description {
            check_description(description, &mut problems);
        }
        check_price(self.price, &mut problems);
        problems
    }
}

impl ItemUpdate {
    /// Returns every constraint the supplied fields break; empty when valid.
    pub fn validate(&self) -> Vec<InvalidField> {
        let mut problems = Vec::new();
        if let Some(name) = &self.name {
            check_name(name, &mut problems);
        }
        if let Some(Some(description)) = &self.description {
            check_description(description, &mut problems);
        }
        if let Some(price) = self.price {
            check_price(price, &mut problems);
        }
        problems
    }

    fn apply_to(self, item: &mut Item) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(is_available) = self.is_available {
            item.is_available = is_available;
        }
    }
}

/// Error type for ItemStore operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    #[error("Item store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for items. Implementations assign IDs and must be safe to share
/// between concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Stores a new item and returns it with its assigned ID.
    async fn create(&self, item: ItemCreate) -> Result<Item, StoreError>;

    async fn get(&self, id: u64) -> Result<Option<Item>, StoreError>;

    /// Returns up to `limit` items after skipping `skip`, in ID order.
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Item>, StoreError>;

    /// Applies the supplied fields. `None` when no item has that ID.
    async fn update(&self, id: u64, changes: ItemUpdate) -> Result<Option<Item>, StoreError>;

    /// Removes an item. `false` when no item has that ID.
    async fn delete(&self, id: u64) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
struct Inventory {
    items: BTreeMap<u64, Item>,
    last_id: u64,
}

/// Process-local store. Each instance owns its own map and ID counter.
#[derive(Debug, Default)]
pub struct InMemoryItemStore {
    inventory: RwLock<Inventory>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    #[tracing::instrument(skip(self))]
    async fn create(&self, item: ItemCreate) -> Result<Item, StoreError> {
        let mut inventory = self.inventory.write().await;
        inventory.last_id += 1;
        let stored = Item {
            id: inventory.last_id,
            name: item.name,
            description: item.description,
            price: item.price,
            is_available: item.is_available,
        };
        inventory.items.insert(stored.id, stored.clone());
        Ok(stored)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: u64) -> Result<Option<Item>, StoreError> {
        Ok(self.inventory.read().await.items.get(&id).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Item>, StoreError> {
        let inventory = self.inventory.read().await;
        Ok(inventory
            .items
            .values()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, id: u64, changes: ItemUpdate) -> Result<Option<Item>, StoreError> {
        let mut inventory = self.inventory.write().await;
        Ok(inventory.items.get_mut(&id).map(|item| {
            changes.apply_to(item);
            item.clone()
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.inventory.write().await.items.remove(&id).is_some())
    }
}
