//! HTML pages and the request handlers that render them.
use cookie::{Cookie, CookieJar, SameSite};
use gotham::helpers::http::response::{create_response, create_temporary_redirect};
use gotham::state::{FromState, State};
use http::StatusCode;
use hyper::{header, Body, Response};

use std::borrow::Cow;

use crate::{config::Settings, user::Identity};

pub mod cafe;
pub mod index;
pub mod user;

pub type DocumentResult = Result<Response<Body>, failure::Error>;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

pub trait TemplateExt {
    fn to_response(&self, state: &State) -> Response<Body> {
        self.to_response_with(state, StatusCode::OK)
    }

    fn to_response_with(&self, state: &State, status: StatusCode) -> Response<Body>;
}

impl<T: askama::Template> TemplateExt for T {
    fn to_response_with(&self, state: &State, status: StatusCode) -> Response<Body> {
        match self.render() {
            Ok(string) => create_response(state, status, mime::TEXT_HTML, string),
            Err(e) => create_response(
                state,
                StatusCode::INTERNAL_SERVER_ERROR,
                mime::TEXT_PLAIN,
                format!("Template error: {}", e),
            ),
        }
    }
}

/// What the navigation bar needs to know about the caller.
#[derive(Clone, Debug, Default)]
pub struct Nav {
    pub logged_in: bool,
    pub is_admin: bool,
    pub name: String,
}

impl Nav {
    pub fn from_state(state: &State) -> Self {
        match Identity::try_borrow_from(state) {
            Some(identity) => Nav {
                logged_in: true,
                is_admin: identity.user.is_admin(),
                name: identity.user.name.clone(),
            },
            None => Nav::default(),
        }
    }
}

/// Redirect that forces the browser to follow up with a GET.
pub fn see_other<L>(state: &State, location: L) -> Response<Body>
where
    L: Into<Cow<'static, str>>,
{
    let mut response = create_temporary_redirect(state, location);
    *response.status_mut() = StatusCode::SEE_OTHER;
    response
}

pub fn set_cookie(response: &mut Response<Body>, cookie: Cookie) -> Result<(), failure::Error> {
    response
        .headers_mut()
        .append(header::SET_COOKIE, cookie.to_string().parse()?);
    Ok(())
}

pub fn session_cookie<'a>(state: &State, id: &str) -> Cookie<'a> {
    let settings = Settings::borrow_from(state);
    let mut cookie = Cookie::build(SESSION_COOKIE, id.to_owned())
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(true)
        .max_age(time::Duration::days(30))
        .finish();
    if settings.cookie.secure {
        cookie.set_secure(true);
    }
    if let Some(ref domain) = settings.cookie.domain {
        cookie.set_domain(domain.to_owned());
    }
    cookie
}

/// Expires the cookie called `name` with Max-Age=0
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name, "")
        .path("/")
        .max_age(time::Duration::zero())
        .finish()
}

/// One-shot notices carried across a redirect in the `flash` cookie.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flash {
    AlreadyRegistered,
    LoginRequired,
}

impl Flash {
    fn code(self) -> &'static str {
        match self {
            Flash::AlreadyRegistered => "already-registered",
            Flash::LoginRequired => "login-required",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "already-registered" => Some(Flash::AlreadyRegistered),
            "login-required" => Some(Flash::LoginRequired),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::AlreadyRegistered => "You've already signed up with that email, log in instead!",
            Flash::LoginRequired => "You need to log in or register.",
        }
    }

    pub fn cookie(self) -> Cookie<'static> {
        Cookie::build(FLASH_COOKIE, self.code()).path("/").finish()
    }

    /// The notice sent along with this request, if any.
    pub fn from_state(state: &State) -> Option<Self> {
        CookieJar::try_borrow_from(state)
            .and_then(|jar| jar.get(FLASH_COOKIE))
            .and_then(|cookie| Flash::from_code(cookie.value()))
    }
}
