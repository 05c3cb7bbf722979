//! Catalog business logic - Teams, events and vendors.
//!
//! These are plain named records. Names are unique and listed without regard to
//! case; a record still referenced elsewhere can't be deleted.

use crate::{
    config::catalog::CatalogConfig,
    core::{account, product},
    entities::{Event, Order, Purchase, Team, Vendor, event, order, purchase, team, vendor},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Trims a name and rejects it if nothing is left.
pub(crate) fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::MissingField { field: "name" });
    }
    Ok(name.to_string())
}

/// Retrieves all teams, sorted by name without regard to case.
pub async fn get_all_teams(db: &DatabaseConnection) -> Result<Vec<team::Model>> {
    let mut teams = Team::find().all(db).await?;
    teams.sort_by_key(|t| t.name.to_lowercase());
    Ok(teams)
}

/// Retrieves a team by id.
pub async fn get_team_by_id(db: &DatabaseConnection, team_id: i64) -> Result<Option<team::Model>> {
    Team::find_by_id(team_id).one(db).await.map_err(Into::into)
}

/// Finds a team by its exact name.
pub async fn get_team_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<team::Model>> {
    Team::find()
        .filter(team::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a team.
///
/// # Errors
/// Returns an error if the name is empty or already taken.
pub async fn create_team(db: &DatabaseConnection, name: &str) -> Result<team::Model> {
    let name = clean_name(name)?;
    if get_team_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateName {
            entity: "Team",
            name,
        });
    }

    let team = team::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(team_id = team.id, name = %team.name, "Created team");
    Ok(team)
}

/// Renames a team.
pub async fn rename_team(db: &DatabaseConnection, team_id: i64, name: &str) -> Result<team::Model> {
    let name = clean_name(name)?;
    let existing = get_team_by_id(db, team_id)
        .await?
        .ok_or_else(|| Error::not_found("Team", team_id))?;
    if let Some(other) = get_team_by_name(db, &name).await? {
        if other.id != team_id {
            return Err(Error::DuplicateName {
                entity: "Team",
                name,
            });
        }
    }

    let mut team: team::ActiveModel = existing.into();
    team.name = Set(name);
    team.update(db).await.map_err(Into::into)
}

/// Deletes a team without orders.
///
/// # Errors
/// Returns [`Error::Protected`] while the team still has orders.
pub async fn delete_team(db: &DatabaseConnection, team_id: i64) -> Result<()> {
    let existing = get_team_by_id(db, team_id)
        .await?
        .ok_or_else(|| Error::not_found("Team", team_id))?;
    let orders = Order::find()
        .filter(order::Column::TeamId.eq(team_id))
        .count(db)
        .await?;
    if orders > 0 {
        return Err(Error::Protected {
            entity: "Team",
            id: team_id,
            referenced_by: "orders",
        });
    }

    existing.delete(db).await?;
    info!(team_id, "Deleted team");
    Ok(())
}

/// Retrieves all events, sorted by name without regard to case.
pub async fn get_all_events(db: &DatabaseConnection) -> Result<Vec<event::Model>> {
    let mut events = Event::find().all(db).await?;
    events.sort_by_key(|e| e.name.to_lowercase());
    Ok(events)
}

/// Retrieves an event by id.
pub async fn get_event_by_id(
    db: &DatabaseConnection,
    event_id: i64,
) -> Result<Option<event::Model>> {
    Event::find_by_id(event_id).one(db).await.map_err(Into::into)
}

/// Finds an event by its exact name.
pub async fn get_event_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<event::Model>> {
    Event::find()
        .filter(event::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates an event.
///
/// # Errors
/// Returns an error if the name is empty or already taken.
pub async fn create_event(db: &DatabaseConnection, name: &str) -> Result<event::Model> {
    let name = clean_name(name)?;
    if get_event_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateName {
            entity: "Event",
            name,
        });
    }

    let event = event::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(event_id = event.id, name = %event.name, "Created event");
    Ok(event)
}

/// Renames an event.
pub async fn rename_event(
    db: &DatabaseConnection,
    event_id: i64,
    name: &str,
) -> Result<event::Model> {
    let name = clean_name(name)?;
    let existing = get_event_by_id(db, event_id)
        .await?
        .ok_or_else(|| Error::not_found("Event", event_id))?;
    if let Some(other) = get_event_by_name(db, &name).await? {
        if other.id != event_id {
            return Err(Error::DuplicateName {
                entity: "Event",
                name,
            });
        }
    }

    let mut event: event::ActiveModel = existing.into();
    event.name = Set(name);
    event.update(db).await.map_err(Into::into)
}

/// Deletes an event no order is placed for.
///
/// # Errors
/// Returns [`Error::Protected`] while orders still point at the event.
pub async fn delete_event(db: &DatabaseConnection, event_id: i64) -> Result<()> {
    let existing = get_event_by_id(db, event_id)
        .await?
        .ok_or_else(|| Error::not_found("Event", event_id))?;
    let orders = Order::find()
        .filter(order::Column::EventId.eq(event_id))
        .count(db)
        .await?;
    if orders > 0 {
        return Err(Error::Protected {
            entity: "Event",
            id: event_id,
            referenced_by: "orders",
        });
    }

    existing.delete(db).await?;
    info!(event_id, "Deleted event");
    Ok(())
}

/// The event new orders are filed under.
///
/// That is the event named in the configuration if it exists, otherwise the most
/// recently created one. `None` if there are no events at all.
pub async fn default_order_event(
    db: &DatabaseConnection,
    configured: Option<&str>,
) -> Result<Option<event::Model>> {
    if let Some(name) = configured {
        if let Some(event) = get_event_by_name(db, name).await? {
            return Ok(Some(event));
        }
        warn!(name, "Configured default order event does not exist");
    }
    Event::find()
        .order_by_desc(event::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all vendors, sorted by name without regard to case.
pub async fn get_all_vendors(db: &DatabaseConnection) -> Result<Vec<vendor::Model>> {
    let mut vendors = Vendor::find().all(db).await?;
    vendors.sort_by_key(|v| v.name.to_lowercase());
    Ok(vendors)
}

/// Retrieves a vendor by id.
pub async fn get_vendor_by_id(
    db: &DatabaseConnection,
    vendor_id: i64,
) -> Result<Option<vendor::Model>> {
    Vendor::find_by_id(vendor_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a vendor by its exact name.
pub async fn get_vendor_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<vendor::Model>> {
    Vendor::find()
        .filter(vendor::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a vendor.
///
/// # Errors
/// Returns an error if the name is empty or already taken.
pub async fn create_vendor(db: &DatabaseConnection, name: &str) -> Result<vendor::Model> {
    let name = clean_name(name)?;
    if get_vendor_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateName {
            entity: "Vendor",
            name,
        });
    }

    let vendor = vendor::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(vendor_id = vendor.id, name = %vendor.name, "Created vendor");
    Ok(vendor)
}

/// Renames a vendor.
pub async fn rename_vendor(
    db: &DatabaseConnection,
    vendor_id: i64,
    name: &str,
) -> Result<vendor::Model> {
    let name = clean_name(name)?;
    let existing = get_vendor_by_id(db, vendor_id)
        .await?
        .ok_or_else(|| Error::not_found("Vendor", vendor_id))?;
    if let Some(other) = get_vendor_by_name(db, &name).await? {
        if other.id != vendor_id {
            return Err(Error::DuplicateName {
                entity: "Vendor",
                name,
            });
        }
    }

    let mut vendor: vendor::ActiveModel = existing.into();
    vendor.name = Set(name);
    vendor.update(db).await.map_err(Into::into)
}

/// Deletes a vendor nothing was bought from.
///
/// # Errors
/// Returns [`Error::Protected`] while purchases still point at the vendor.
pub async fn delete_vendor(db: &DatabaseConnection, vendor_id: i64) -> Result<()> {
    let existing = get_vendor_by_id(db, vendor_id)
        .await?
        .ok_or_else(|| Error::not_found("Vendor", vendor_id))?;
    let purchases = Purchase::find()
        .filter(purchase::Column::VendorId.eq(vendor_id))
        .count(db)
        .await?;
    if purchases > 0 {
        return Err(Error::Protected {
            entity: "Vendor",
            id: vendor_id,
            referenced_by: "purchases",
        });
    }

    existing.delete(db).await?;
    info!(vendor_id, "Deleted vendor");
    Ok(())
}

/// Creates every catalog entry named in the configuration that doesn't exist yet.
///
/// Existing entries are left alone, so running this repeatedly is harmless.
/// Returns the number of records created.
pub async fn seed_catalog(db: &DatabaseConnection, config: &CatalogConfig) -> Result<usize> {
    let mut created = 0;

    for name in &config.teams {
        if get_team_by_name(db, name).await?.is_none() {
            create_team(db, name).await?;
            created += 1;
        }
    }
    for name in &config.events {
        if get_event_by_name(db, name).await?.is_none() {
            create_event(db, name).await?;
            created += 1;
        }
    }
    for name in &config.vendors {
        if get_vendor_by_name(db, name).await?.is_none() {
            create_vendor(db, name).await?;
            created += 1;
        }
    }
    for name in &config.accounts {
        if account::get_account_by_name(db, name).await?.is_none() {
            account::create_account(db, name).await?;
            created += 1;
        }
    }
    for seed in &config.products {
        if product::get_product_by_name(db, &seed.name).await?.is_none() {
            product::create_product(db, &seed.name, seed.unit.clone(), seed.default_price)
                .await?;
            created += 1;
        }
    }

    info!(created, "Seeded catalog");
    Ok(created)
}
