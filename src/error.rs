use bcrypt::BcryptError;
use diesel::result::Error as DieselError;
use failure::Fail;

/// Everything the repositories can refuse to do.
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "An account with that email already exists.")]
    DuplicateEmail,
    #[fail(display = "A cafe with that name already exists.")]
    DuplicateCafeName,
    #[fail(display = "The email does not exist, please try again.")]
    UnknownEmail,
    #[fail(display = "Invalid password, please try again.")]
    InvalidCredentials,
    #[fail(display = "Permission denied")]
    Forbidden,
    #[fail(display = "Not found")]
    NotFound,
    #[fail(display = "Database error: {}", _0)]
    Database(#[cause] DieselError),
    #[fail(display = "Password hashing failed: {}", _0)]
    Hash(#[cause] BcryptError),
}

impl From<DieselError> for Error {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => Error::NotFound,
            e => Error::Database(e),
        }
    }
}

impl From<BcryptError> for Error {
    fn from(e: BcryptError) -> Self {
        Error::Hash(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
