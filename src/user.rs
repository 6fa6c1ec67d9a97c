use diesel::Connection as _;
use chrono::{Duration, NaiveDateTime, Utc};
use cookie::CookieJar;
use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_derive_enum::DbEnum;
use futures::future;
use gotham::{
    handler::HandlerFuture,
    helpers::http::response::create_response,
    middleware::Middleware,
    state::{FromState, State},
};
use gotham_derive::{NewMiddleware, StateData};
use rand::prelude::*;
use sha2::{Digest, Sha256};

use crate::{
    db::{Connection, DbConnection},
    error::{Error, Result},
    schema::{sessions, users},
};

const SALT_LEN: usize = 16;
const SESSION_LEN: usize = 24;
const SESSION_DAYS: i64 = 30;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

/// What a user may do. Only administrators can change cafe records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, DbEnum)]
pub enum Role {
    Admin,
    Member,
}

#[derive(Clone, Debug, Queryable, Identifiable)]
pub struct User {
    pub id: i32,
    /// The unique login
    pub email: String,
    /// The hashed password
    hash: String,
    /// The salt for the password
    salt: Vec<u8>,
    /// The user's display name
    pub name: String,
    pub role: Role,
}

impl User {
    /// Verify the supplied password matches the users
    pub fn verify(&self, password: &str) -> Result<bool> {
        Ok(verify(password, &self.salt, &self.hash)?)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A to be created user.
///
/// NOTE: This structure contains the user's unencrypted password, handle it with great care!
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Insertable)]
#[table_name = "users"]
struct UserRecord {
    email: String,
    hash: String,
    salt: Vec<u8>,
    name: String,
    role: Role,
}

impl NewUser {
    /// Generates a salt and hashes the password.
    fn into_record(self, role: Role) -> Result<UserRecord> {
        let salt = generate_salt().to_vec();
        Ok(UserRecord {
            hash: hash(&self.password, &salt)?,
            salt,
            email: self.email,
            name: self.name,
            role,
        })
    }
}

#[derive(Clone, Debug, Queryable, Insertable)]
pub struct Session {
    pub id: String,
    pub user_id: i32,
    pub expires: NaiveDateTime,
}

impl Session {
    /// Generates a new session.
    ///
    /// NB: Must be inserted into the database for the session to be valid.
    pub fn new(user_id: i32) -> Session {
        // Fill array with random data
        let mut id = [0u8; SESSION_LEN];
        StdRng::from_entropy().fill(&mut id[..]);
        Session {
            id: base64::encode(&id),
            user_id,
            expires: Utc::now().naive_utc() + Duration::days(SESSION_DAYS),
        }
    }

    /// Creates and stores a session for the user.
    pub fn start(connection: &Connection, user_id: i32) -> Result<Session> {
        let session = Session::new(user_id);
        diesel::insert_into(sessions::table)
            .values(&session)
            .execute(connection)?;
        Ok(session)
    }

    /// Get the unexpired session with the specified id
    pub fn from_id(id: &str, connection: &Connection) -> Result<Option<Session>> {
        use crate::schema::sessions::dsl;

        Ok(dsl::sessions
            .find(id)
            .filter(dsl::expires.gt(Utc::now().naive_utc()))
            .first(connection)
            .optional()?)
    }

    pub fn user(&self, connection: &Connection) -> Result<User> {
        get(connection, self.user_id)
    }
}

/// The authenticated caller of the current request.
#[derive(Clone, Debug, StateData)]
pub struct Identity {
    pub session: Session,
    pub user: User,
}

impl Identity {
    /// Resolves a session id into the session and its owner.
    pub fn resolve(connection: &Connection, session_id: &str) -> Result<Option<Identity>> {
        match Session::from_id(session_id, connection)? {
            Some(session) => {
                let user = session.user(connection)?;
                Ok(Some(Identity { session, user }))
            }
            None => Ok(None),
        }
    }
}

/// Gets the logged in user of the request, if any.
pub fn current_user(state: &State) -> Option<&User> {
    Identity::try_borrow_from(state).map(|identity| &identity.user)
}

/// Allows only administrators through.
pub fn require_admin(identity: Option<&Identity>) -> Result<&User> {
    match identity {
        Some(identity) if identity.user.is_admin() => Ok(&identity.user),
        _ => Err(Error::Forbidden),
    }
}

/// Resolves the `session` cookie into an [`Identity`] in the request state.
#[derive(Clone, NewMiddleware)]
pub struct SessionMiddleware;

impl Middleware for SessionMiddleware {
    fn call<C>(self, mut state: State, chain: C) -> Box<HandlerFuture>
    where
        C: FnOnce(State) -> Box<HandlerFuture>,
    {
        let put_identity = |state: &mut State| -> std::result::Result<(), failure::Error> {
            let connection = DbConnection::from_state(&state)?;
            let cookie = CookieJar::borrow_from(&state)
                .get(crate::document::SESSION_COOKIE)
                .map(|cookie| cookie.value().to_owned());
            if let Some(id) = cookie {
                if let Some(identity) = Identity::resolve(&connection, &id)? {
                    std::mem::drop(connection);
                    state.put(identity);
                }
            }
            Ok(())
        };
        match put_identity(&mut state) {
            Ok(()) => chain(state),
            Err(e) => {
                log::error!("Session lookup failed: {}", e);
                let response = create_response(
                    &state,
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    mime::TEXT_PLAIN,
                    e.to_string(),
                );
                Box::new(future::ok((state, response)))
            }
        }
    }
}

/// Rejects the request with 403 unless an administrator is logged in.
#[derive(Clone, NewMiddleware)]
pub struct AdminGuard;

impl Middleware for AdminGuard {
    fn call<C>(self, state: State, chain: C) -> Box<HandlerFuture>
    where
        C: FnOnce(State) -> Box<HandlerFuture>,
    {
        let refused = require_admin(Identity::try_borrow_from(&state)).err();
        match refused {
            None => chain(state),
            Some(e) => {
                let who = current_user(&state).map(|user| user.email.clone());
                log::warn!(
                    "Refused admin route for {}",
                    who.as_deref().unwrap_or("anonymous")
                );
                let response = crate::handler::error_response(&state, &e.into());
                Box::new(future::ok((state, response)))
            }
        }
    }
}

/// Password hashing function. Inspired by [Dropbox's password storage policy][1].
///
/// First the password and salt are combined, then hashed with SHA256 to prevent DoS attacks. The
/// password is then hashed with bcrypt.
///
/// [1]: https://blogs.dropbox.com/tech/2016/09/how-dropbox-securely-stores-your-passwords/
fn hash(key: &str, salt: &[u8]) -> std::result::Result<String, bcrypt::BcryptError> {
    let digest = Sha256::new().chain(key).chain(salt).finalize();
    // base64 encode to avoid zero-bytes
    bcrypt::hash(base64::encode(&digest), HASH_COST)
}

fn verify(key: &str, salt: &[u8], hash: &str) -> std::result::Result<bool, bcrypt::BcryptError> {
    let digest = Sha256::new().chain(key).chain(salt).finalize();
    bcrypt::verify(&base64::encode(&digest), hash)
}

/// Generates a new salt of length `SALT_LEN`
fn generate_salt() -> [u8; SALT_LEN] {
    let mut bytes = [0u8; SALT_LEN];

    StdRng::from_entropy().fill(&mut bytes[..]);

    bytes
}

/// Creates a user and logs them in.
///
/// The very first account becomes the administrator, every later one a member.
pub fn register(connection: &Connection, new: NewUser) -> Result<(User, Session)> {
    connection.transaction(|| {
        if find_by_email(connection, &new.email)?.is_some() {
            return Err(Error::DuplicateEmail);
        }
        let role = if count(connection)? == 0 {
            Role::Admin
        } else {
            Role::Member
        };
        let email = new.email.clone();
        diesel::insert_into(users::table)
            .values(&new.into_record(role)?)
            .execute(connection)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    Error::DuplicateEmail
                }
                e => e.into(),
            })?;

        let user = find_by_email(connection, &email)?.ok_or(Error::NotFound)?;
        let session = Session::start(connection, user.id)?;
        Ok((user, session))
    })
}

/// Checks the credentials and opens a session.
pub fn login(connection: &Connection, email: &str, password: &str) -> Result<(User, Session)> {
    let user = find_by_email(connection, email)?.ok_or(Error::UnknownEmail)?;
    if !user.verify(password)? {
        return Err(Error::InvalidCredentials);
    }
    let session = Session::start(connection, user.id)?;
    Ok((user, session))
}

pub fn logout(connection: &Connection, session: &str) -> Result<usize> {
    use crate::schema::sessions::dsl;

    Ok(diesel::delete(dsl::sessions.find(session)).execute(connection)?)
}

pub fn get(connection: &Connection, id: i32) -> Result<User> {
    use crate::schema::users::dsl;

    Ok(dsl::users.find(id).first(connection)?)
}

pub fn find_by_email(connection: &Connection, email: &str) -> Result<Option<User>> {
    use crate::schema::users::dsl;

    Ok(dsl::users
        .filter(dsl::email.eq(email))
        .first(connection)
        .optional()?)
}

pub fn count(connection: &Connection) -> Result<i64> {
    use crate::schema::users::dsl::*;

    Ok(users.count().get_result(connection)?)
}
