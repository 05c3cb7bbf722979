//! Product business logic - Handles all product-related operations.
//!
//! Products are referenced by id everywhere, so renaming one never affects the
//! orders and stockpiles pointing at it. Names are unique.

use crate::{
    core::{catalog::clean_name, money::Money},
    entities::{Order, Product, Stockpile, order, product, stockpile},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, Set, prelude::*};
use tracing::info;

/// Retrieves all products, sorted by name without regard to case.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    let mut products = Product::find().all(db).await?;
    products.sort_by_key(|p| p.name.to_lowercase());
    Ok(products)
}

/// Finds a product by its exact name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_name<C>(db: &C, name: &str) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .filter(product::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new product.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - A product with that name already exists
/// - The database insert operation fails
pub async fn create_product(
    db: &DatabaseConnection,
    name: &str,
    unit: Option<String>,
    default_price: Option<Money>,
) -> Result<product::Model> {
    let name = clean_name(name)?;
    if get_product_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateName {
            entity: "Product",
            name,
        });
    }

    let product = product::ActiveModel {
        name: Set(name),
        unit: Set(unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())),
        default_price: Set(default_price.map(Money::minor)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(product_id = product.id, name = %product.name, "Created product");
    Ok(product)
}

/// Looks a product up by name and creates it if there is none yet.
///
/// Order entry accepts free-text product names; unknown ones become new products
/// without unit or price.
pub async fn get_or_create_product(db: &DatabaseConnection, name: &str) -> Result<product::Model> {
    let name = clean_name(name)?;
    match get_product_by_name(db, &name).await? {
        Some(existing) => Ok(existing),
        None => create_product(db, &name, None, None).await,
    }
}

/// Updates an existing product's name, unit and default price.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - Another product already has that name
/// - The product does not exist
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    name: &str,
    unit: Option<String>,
    default_price: Option<Money>,
) -> Result<product::Model> {
    let name = clean_name(name)?;
    let existing = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;
    if let Some(other) = get_product_by_name(db, &name).await? {
        if other.id != product_id {
            return Err(Error::DuplicateName {
                entity: "Product",
                name,
            });
        }
    }

    let mut product: product::ActiveModel = existing.into();
    product.name = Set(name);
    product.unit = Set(unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()));
    product.default_price = Set(default_price.map(Money::minor));
    let updated = product.update(db).await?;

    info!(product_id, name = %updated.name, "Updated product");
    Ok(updated)
}

/// Deletes a product nobody refers to.
///
/// # Errors
/// Returns [`Error::Protected`] while orders or stockpiles still use the product.
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let existing = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;

    let orders = Order::find()
        .filter(order::Column::ProductId.eq(product_id))
        .count(db)
        .await?;
    if orders > 0 {
        return Err(Error::Protected {
            entity: "Product",
            id: product_id,
            referenced_by: "orders",
        });
    }
    let stockpiles = Stockpile::find()
        .filter(stockpile::Column::ProductId.eq(product_id))
        .count(db)
        .await?;
    if stockpiles > 0 {
        return Err(Error::Protected {
            entity: "Product",
            id: product_id,
            referenced_by: "stockpiles",
        });
    }

    existing.delete(db).await?;
    info!(product_id, "Deleted product");
    Ok(())
}
