use diesel::Connection as _;
use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};

use crate::{
    db::Connection,
    error::{Error, Result},
    schema::{cafes, comments},
};

#[derive(Clone, Debug, Queryable, Identifiable)]
pub struct Cafe {
    pub id: i32,
    /// Unique among all cafes
    pub name: String,
    /// The user who last created or edited the record
    pub author: Option<i32>,
    pub map_url: String,
    pub img_url: String,
    /// Free text, matched exactly when filtering
    pub location: String,
    /// A label such as "20-30", not a number
    pub seats: String,
    pub has_toilet: bool,
    pub has_wifi: bool,
    pub has_sockets: bool,
    pub can_take_calls: bool,
    pub coffee_price: Option<String>,
}

impl Cafe {
    pub fn price(&self) -> &str {
        self.coffee_price.as_deref().unwrap_or("")
    }
}

/// Every mutable column of a cafe, used both for creating and overwriting records.
#[derive(Clone, Debug, Insertable, AsChangeset)]
#[table_name = "cafes"]
#[changeset_options(treat_none_as_null = "true")]
pub struct CafeChanges {
    pub name: String,
    pub author: Option<i32>,
    pub map_url: String,
    pub img_url: String,
    pub location: String,
    pub seats: String,
    pub has_toilet: bool,
    pub has_wifi: bool,
    pub has_sockets: bool,
    pub can_take_calls: bool,
    pub coffee_price: Option<String>,
}

fn name_taken(e: DieselError) -> Error {
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            Error::DuplicateCafeName
        }
        e => e.into(),
    }
}

/// Looks up the id of the cafe called `name`, if any.
fn id_by_name(connection: &Connection, name: &str) -> Result<Option<i32>> {
    use crate::schema::cafes::dsl;

    Ok(dsl::cafes
        .select(dsl::id)
        .filter(dsl::name.eq(name))
        .first(connection)
        .optional()?)
}

pub fn list_all(connection: &Connection) -> Result<Vec<Cafe>> {
    use crate::schema::cafes::dsl::*;

    Ok(cafes.order(id).load::<Cafe>(connection)?)
}

/// Cafes whose location is exactly `place`. Case and whitespace are significant.
pub fn list_by_location(connection: &Connection, place: &str) -> Result<Vec<Cafe>> {
    use crate::schema::cafes::dsl::*;

    Ok(cafes
        .filter(location.eq(place))
        .order(id)
        .load::<Cafe>(connection)?)
}

/// The distinct set of locations, sorted.
pub fn locations(connection: &Connection) -> Result<Vec<String>> {
    use crate::schema::cafes::dsl::*;

    Ok(cafes
        .select(location)
        .distinct()
        .order(location)
        .load::<String>(connection)?)
}

pub fn get(connection: &Connection, cafe_id: i32) -> Result<Cafe> {
    use crate::schema::cafes::dsl::*;

    cafes
        .find(cafe_id)
        .first(connection)
        .optional()?
        .ok_or(Error::NotFound)
}

pub fn create(connection: &Connection, changes: &CafeChanges) -> Result<Cafe> {
    connection.transaction(|| {
        if id_by_name(connection, &changes.name)?.is_some() {
            return Err(Error::DuplicateCafeName);
        }
        diesel::insert_into(cafes::table)
            .values(changes)
            .execute(connection)
            .map_err(name_taken)?;

        let new_id = id_by_name(connection, &changes.name)?.ok_or(Error::NotFound)?;
        get(connection, new_id)
    })
}

/// Overwrites every field of the cafe, including its author.
pub fn update(connection: &Connection, cafe_id: i32, changes: &CafeChanges) -> Result<Cafe> {
    use crate::schema::cafes::dsl;

    connection.transaction(|| {
        get(connection, cafe_id)?;
        match id_by_name(connection, &changes.name)? {
            Some(other) if other != cafe_id => return Err(Error::DuplicateCafeName),
            _ => (),
        }
        diesel::update(dsl::cafes.find(cafe_id))
            .set(changes)
            .execute(connection)
            .map_err(name_taken)?;
        get(connection, cafe_id)
    })
}

/// Deletes the cafe together with its comments.
pub fn delete(connection: &Connection, cafe_id: i32) -> Result<()> {
    connection.transaction(|| {
        get(connection, cafe_id)?;
        diesel::delete(comments::table.filter(comments::cafe.eq(cafe_id))).execute(connection)?;
        diesel::delete(cafes::table.find(cafe_id)).execute(connection)?;
        Ok(())
    })
}
