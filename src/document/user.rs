//! Module for registration, login and logout

use askama::Template;
use gotham::state::{FromState, State};

use super::{
    removal_cookie, see_other, session_cookie, set_cookie, DocumentResult, Flash, Nav,
    TemplateExt, FLASH_COOKIE, SESSION_COOKIE,
};
use crate::{
    db::DbConnection,
    error::Error,
    form::{self, FieldErrors, LoginForm, RegisterForm},
    user::{self, Identity},
};

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    nav: Nav,
    form: RegisterForm,
    errors: FieldErrors,
}

/// Registration form
pub fn register(state: &State) -> DocumentResult {
    Ok(RegisterTemplate {
        nav: Nav::from_state(state),
        form: RegisterForm::default(),
        errors: FieldErrors::default(),
    }
    .to_response(state))
}

/// Creates the account and logs it in, or sends known emails to the login page.
pub fn register_post(state: &State, post: Vec<u8>) -> DocumentResult {
    let form: RegisterForm = serde_urlencoded::from_bytes(&post)?;
    if let Err(errors) = form::check(&form) {
        return Ok(RegisterTemplate {
            nav: Nav::from_state(state),
            form,
            errors,
        }
        .to_response(state));
    }

    let connection = &DbConnection::from_state(state)?;
    match user::register(connection, form.into_new_user()) {
        Ok((user, session)) => {
            log::info!(
                "Registered user {} <{}> as {:?}",
                user.id,
                user.email,
                user.role
            );
            let mut response = see_other(state, "/");
            set_cookie(&mut response, session_cookie(state, &session.id))?;
            Ok(response)
        }
        Err(Error::DuplicateEmail) => {
            let mut response = see_other(state, "/login");
            set_cookie(&mut response, Flash::AlreadyRegistered.cookie())?;
            Ok(response)
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    nav: Nav,
    notice: String,
    email: String,
    errors: FieldErrors,
}

/// Login form. Shows and clears any pending flash notice.
pub fn login(state: &State) -> DocumentResult {
    let flash = Flash::from_state(state);
    let mut response = LoginTemplate {
        nav: Nav::from_state(state),
        notice: flash.map(Flash::message).unwrap_or("").to_owned(),
        email: String::new(),
        errors: FieldErrors::default(),
    }
    .to_response(state);

    if flash.is_some() {
        set_cookie(&mut response, removal_cookie(FLASH_COOKIE))?;
    }
    Ok(response)
}

/// Login post. Sets session cookie if login was successful.
pub fn login_post(state: &State, post: Vec<u8>) -> DocumentResult {
    let form: LoginForm = serde_urlencoded::from_bytes(&post)?;
    if let Err(errors) = form::check(&form) {
        return Ok(LoginTemplate {
            nav: Nav::from_state(state),
            notice: String::new(),
            email: form.email,
            errors,
        }
        .to_response(state));
    }

    let connection = &DbConnection::from_state(state)?;
    match user::login(connection, &form.email, &form.password) {
        Ok((user, session)) => {
            log::info!("User {} logged in", user.id);
            let mut response = see_other(state, "/");
            set_cookie(&mut response, session_cookie(state, &session.id))?;
            Ok(response)
        }
        Err(e @ Error::UnknownEmail) | Err(e @ Error::InvalidCredentials) => {
            log::info!("Failed login for <{}>: {}", form.email, e);
            Ok(LoginTemplate {
                nav: Nav::from_state(state),
                notice: e.to_string(),
                email: form.email,
                errors: FieldErrors::default(),
            }
            .to_response(state))
        }
        Err(e) => Err(e.into()),
    }
}

/// Ends the session and returns to the landing page.
pub fn logout(state: &State) -> DocumentResult {
    if let Some(identity) = Identity::try_borrow_from(state) {
        let connection = &DbConnection::from_state(state)?;
        user::logout(connection, &identity.session.id)?;
        log::info!("User {} logged out", identity.user.id);
    }

    let mut response = see_other(state, "/");
    set_cookie(&mut response, removal_cookie(SESSION_COOKIE))?;
    Ok(response)
}
