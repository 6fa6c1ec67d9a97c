use diesel::connection::SimpleConnection;
use diesel_migrations::embed_migrations;
use gotham::state::FromState;
use gotham_derive::StateData;

use std::sync::{Arc, Mutex, MutexGuard};

pub use diesel::sqlite::SqliteConnection as Connection;

embed_migrations!();

/// The wrapper for a database connection that can shared via gotham's state data
#[derive(Clone, StateData)]
pub struct DbConnection {
    connection: Arc<Mutex<Connection>>,
}

impl DbConnection {
    pub fn from_url(url: &str) -> Result<Self, failure::Error> {
        Ok(Self {
            connection: Arc::new(Mutex::new(connect(url)?)),
        })
    }

    pub fn from_state(
        state: &gotham::state::State,
    ) -> Result<MutexGuard<Connection>, failure::Error> {
        Self::borrow_from(state).lock()
    }

    pub fn lock(&self) -> Result<MutexGuard<Connection>, failure::Error> {
        match self.connection.lock() {
            Ok(lock) => Ok(lock),
            Err(_) => Err(failure::err_msg("failed to get lock")),
        }
    }
}

/// Opens the database and brings its schema up to date.
pub fn connect(url: &str) -> Result<Connection, failure::Error> {
    let connection: Connection = diesel::Connection::establish(url)?;

    // SQLite leaves foreign keys unchecked unless asked per connection.
    connection.batch_execute("PRAGMA foreign_keys = ON;")?;

    embedded_migrations::run(&connection)?;
    log::debug!("Database at '{}' is ready", url);

    Ok(connection)
}

#[cfg(test)]
mod tests {
    use diesel::prelude::*;

    use super::{connect, DbConnection};
    use crate::schema::{cafes, comments};

    #[test]
    fn schema_is_created() {
        let connection = connect(":memory:").unwrap();
        let count: i64 = cafes::table.count().get_result(&connection).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let connection = connect(":memory:").unwrap();
        let result = diesel::insert_into(comments::table)
            .values((
                comments::author.eq(7),
                comments::cafe.eq(7),
                comments::date.eq("2026-10-18"),
                comments::text.eq("orphan"),
            ))
            .execute(&connection);
        assert!(result.is_err());
    }

    #[test]
    fn shared_connection_locks() {
        let db = DbConnection::from_url(":memory:").unwrap();
        let other = db.clone();
        let guard = db.lock().unwrap();
        drop(guard);
        assert!(other.lock().is_ok());
    }
}
