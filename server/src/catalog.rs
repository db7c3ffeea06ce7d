//! Menu and category management.
//!
//! Menu items are keyed by their stable string id (the same id the web
//! client uses), categories by a generated storage id. A category name is
//! a free-form string on menu items, not a foreign key: deleting a
//! category leaves matching items orphaned on purpose, the UI falls back
//! to an "Uncategorized" label.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Category, MenuItem},
    store::{DocumentStore, CATEGORIES, MENU},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

pub struct CatalogRepo {
    store: Arc<dyn DocumentStore>,
}

impl CatalogRepo {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list_menu(&self) -> Result<Vec<MenuItem>, AppError> {
        let mut items = Vec::new();
        for body in self.store.scan(MENU).await? {
            items.push(serde_json::from_slice::<MenuItem>(&body)?);
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    pub async fn get_menu_item(&self, id: &str) -> Result<Option<MenuItem>, AppError> {
        match self.store.get(MENU, id).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }

    pub async fn create_menu_item(&self, item: MenuItem) -> Result<MenuItem, AppError> {
        validate_menu_item(&item)?;

        if self.store.get(MENU, &item.id).await?.is_some() {
            return Err(AppError::validation("Item with this id already exists"));
        }

        self.store
            .put(MENU, &item.id, serde_json::to_vec(&item)?)
            .await?;
        Ok(item)
    }

    /// Edits overwrite in place, there is no versioning. The path id wins
    /// over whatever id the body carries.
    pub async fn update_menu_item(&self, id: &str, mut item: MenuItem) -> Result<MenuItem, AppError> {
        item.id = id.to_string();
        validate_menu_item(&item)?;

        if self.store.get(MENU, id).await?.is_none() {
            return Err(AppError::NotFound("Item"));
        }

        self.store
            .put(MENU, id, serde_json::to_vec(&item)?)
            .await?;
        Ok(item)
    }

    /// Unconditional: orders hold snapshots, so nothing references the
    /// deleted item.
    pub async fn delete_menu_item(&self, id: &str) -> Result<(), AppError> {
        if !self.store.remove(MENU, id).await? {
            return Err(AppError::NotFound("Item"));
        }
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let mut categories = self.all_categories().await?;
        categories.retain(|c| c.is_active);
        Ok(categories)
    }

    async fn all_categories(&self) -> Result<Vec<Category>, AppError> {
        let mut categories = Vec::new();
        for body in self.store.scan(CATEGORIES).await? {
            categories.push(serde_json::from_slice::<Category>(&body)?);
        }
        categories.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(categories)
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Category name is required"));
        }

        let existing = self.all_categories().await?;
        if existing.iter().any(|c| c.name == name) {
            return Err(AppError::validation("Category already exists"));
        }

        // New categories go to the end of the display order.
        let display_order = existing
            .iter()
            .map(|c| c.display_order)
            .max()
            .map_or(0, |max| max + 1);

        let category = Category {
            id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            display_order,
            is_active: true,
            created_at: Utc::now(),
        };

        self.store
            .put(CATEGORIES, &category.id, serde_json::to_vec(&category)?)
            .await?;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: &str,
        update: CategoryUpdate,
    ) -> Result<Category, AppError> {
        let body = self
            .store
            .get(CATEGORIES, id)
            .await?
            .ok_or(AppError::NotFound("Category"))?;
        let mut category: Category = serde_json::from_slice(&body)?;

        if let Some(name) = update.name {
            category.name = name;
        }
        if let Some(display_order) = update.display_order {
            category.display_order = display_order;
        }
        if let Some(is_active) = update.is_active {
            category.is_active = is_active;
        }

        self.store
            .put(CATEGORIES, id, serde_json::to_vec(&category)?)
            .await?;
        Ok(category)
    }

    /// Unconditional delete. Menu items whose category string matches are
    /// not touched.
    pub async fn delete_category(&self, id: &str) -> Result<(), AppError> {
        self.store.remove(CATEGORIES, id).await?;
        Ok(())
    }

    /// Swaps display order with the adjacent category in the current
    /// sorted order. A move past either end is a no-op. When duplicate
    /// order values have crept in (e.g. a concurrent insert collided), a
    /// compaction pass renumbers the whole list.
    pub async fn reorder_category(
        &self,
        id: &str,
        direction: Direction,
    ) -> Result<Vec<Category>, AppError> {
        let mut categories = self.all_categories().await?;

        let position = categories
            .iter()
            .position(|c| c.id == id)
            .ok_or(AppError::NotFound("Category"))?;

        let neighbor = match direction {
            Direction::Up => position.checked_sub(1),
            Direction::Down => {
                if position + 1 < categories.len() {
                    Some(position + 1)
                } else {
                    None
                }
            }
        };

        if let Some(neighbor) = neighbor {
            let tmp = categories[position].display_order;
            categories[position].display_order = categories[neighbor].display_order;
            categories[neighbor].display_order = tmp;

            self.store
                .put(
                    CATEGORIES,
                    &categories[position].id.clone(),
                    serde_json::to_vec(&categories[position])?,
                )
                .await?;
            self.store
                .put(
                    CATEGORIES,
                    &categories[neighbor].id.clone(),
                    serde_json::to_vec(&categories[neighbor])?,
                )
                .await?;
        }

        self.compact_if_colliding().await?;
        self.all_categories().await
    }

    async fn compact_if_colliding(&self) -> Result<(), AppError> {
        let categories = self.all_categories().await?;

        let mut orders: Vec<i64> = categories.iter().map(|c| c.display_order).collect();
        orders.sort_unstable();
        orders.dedup();
        if orders.len() == categories.len() {
            return Ok(());
        }

        for (index, mut category) in categories.into_iter().enumerate() {
            category.display_order = index as i64;
            self.store
                .put(CATEGORIES, &category.id.clone(), serde_json::to_vec(&category)?)
                .await?;
        }
        Ok(())
    }
}

fn validate_menu_item(item: &MenuItem) -> Result<(), AppError> {
    if item.id.trim().is_empty() {
        return Err(AppError::validation("Item id is required"));
    }
    if item.name.trim().is_empty() {
        return Err(AppError::validation("Item name is required"));
    }
    if item.price < 0.0 {
        return Err(AppError::validation("Item price cannot be negative"));
    }

    let defaults = item.price_options.iter().filter(|o| o.is_default).count();
    if defaults > 1 {
        return Err(AppError::validation(
            "At most one price option can be the default",
        ));
    }
    Ok(())
}
