//! Templates and request handlers for viewing, commenting on and managing cafes
use askama::Template;
use gotham::state::{FromState, State};

use super::{see_other, set_cookie, DocumentResult, Flash, Nav, TemplateExt};
use crate::{
    cafe::{self, Cafe},
    comment,
    date_format,
    db::{Connection, DbConnection},
    error::Error,
    form::{self, CafeForm, CommentForm, FieldErrors},
    handler::CafePath,
    user::{self, Identity},
};

/// A comment as shown under a cafe
pub struct CommentItem {
    pub author: String,
    pub date: String,
    pub html: String,
}

#[derive(Template)]
#[template(path = "cafe.html")]
pub struct CafeTemplate {
    nav: Nav,
    cafe: Cafe,
    comments: Vec<CommentItem>,
    form: CommentForm,
    errors: FieldErrors,
}

impl CafeTemplate {
    fn load(
        state: &State,
        connection: &Connection,
        id: i32,
        form: CommentForm,
        errors: FieldErrors,
    ) -> Result<Self, Error> {
        let cafe = cafe::get(connection, id)?;
        let comments = comment::list_by_cafe(connection, id)?
            .into_iter()
            .map(|(comment, author)| CommentItem {
                html: comment.formatted(),
                date: comment.date,
                author,
            })
            .collect();
        Ok(CafeTemplate {
            nav: Nav::from_state(state),
            cafe,
            comments,
            form,
            errors,
        })
    }
}

/// Display a cafe and its comments
pub fn view(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = CafePath::borrow_from(state).id;

    let template = CafeTemplate::load(
        state,
        connection,
        id,
        CommentForm::default(),
        FieldErrors::default(),
    )?;
    Ok(template.to_response(state))
}

/// Comment submission. Anonymous visitors are sent to the login page and their text dropped.
pub fn comment_post(state: &State, post: Vec<u8>) -> DocumentResult {
    let id = CafePath::borrow_from(state).id;
    let author = match user::current_user(state) {
        Some(user) => user,
        None => {
            log::info!("Anonymous comment on cafe {} refused", id);
            let mut response = see_other(state, "/login");
            set_cookie(&mut response, Flash::LoginRequired.cookie())?;
            return Ok(response);
        }
    };

    let form: CommentForm = serde_urlencoded::from_bytes(&post)?;
    let connection = &DbConnection::from_state(state)?;
    if let Err(errors) = form::check(&form) {
        let template = CafeTemplate::load(state, connection, id, form, errors)?;
        return Ok(template.to_response(state));
    }

    comment::add(connection, id, author, &form.comment, &date_format::today())?;
    log::info!("User {} commented on cafe {}", author.id, id);
    Ok(see_other(state, format!("/cafe/{}", id)))
}

#[derive(Template)]
#[template(path = "cafe-form.html")]
struct CafeFormTemplate {
    nav: Nav,
    form: CafeForm,
    errors: FieldErrors,
    action: String,
    is_edit: bool,
}

impl CafeFormTemplate {
    fn new(state: &State, form: CafeForm, errors: FieldErrors, edit: Option<i32>) -> Self {
        let action = match edit {
            Some(id) => format!("/edit_cafe/{}", id),
            None => String::from("/new-cafe"),
        };
        CafeFormTemplate {
            nav: Nav::from_state(state),
            form,
            errors,
            action,
            is_edit: edit.is_some(),
        }
    }
}

/// Blank form for a new cafe
pub fn new(state: &State) -> DocumentResult {
    Ok(CafeFormTemplate::new(state, CafeForm::default(), FieldErrors::default(), None)
        .to_response(state))
}

pub fn new_post(state: &State, post: Vec<u8>) -> DocumentResult {
    let admin = user::require_admin(Identity::try_borrow_from(state))?;
    let form: CafeForm = serde_urlencoded::from_bytes(&post)?;
    if let Err(errors) = form::check(&form) {
        return Ok(CafeFormTemplate::new(state, form, errors, None).to_response(state));
    }

    let connection = &DbConnection::from_state(state)?;
    match cafe::create(connection, &form.to_changes(admin.id)) {
        Ok(cafe) => {
            log::info!("User {} added cafe {} '{}'", admin.id, cafe.id, cafe.name);
            Ok(see_other(state, "/all_cafes"))
        }
        Err(e @ Error::DuplicateCafeName) => {
            let mut errors = FieldErrors::default();
            errors.add("name", e.to_string());
            Ok(CafeFormTemplate::new(state, form, errors, None).to_response(state))
        }
        Err(e) => Err(e.into()),
    }
}

/// Form prefilled with the cafe's current values
pub fn edit(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = CafePath::borrow_from(state).id;

    let cafe = cafe::get(connection, id)?;
    Ok(
        CafeFormTemplate::new(state, CafeForm::from(&cafe), FieldErrors::default(), Some(id))
            .to_response(state),
    )
}

/// Overwrites the cafe. The editor becomes its author.
pub fn edit_post(state: &State, post: Vec<u8>) -> DocumentResult {
    let admin = user::require_admin(Identity::try_borrow_from(state))?;
    let id = CafePath::borrow_from(state).id;
    let connection = &DbConnection::from_state(state)?;
    cafe::get(connection, id)?;

    let form: CafeForm = serde_urlencoded::from_bytes(&post)?;
    if let Err(errors) = form::check(&form) {
        return Ok(CafeFormTemplate::new(state, form, errors, Some(id)).to_response(state));
    }

    match cafe::update(connection, id, &form.to_changes(admin.id)) {
        Ok(cafe) => {
            log::info!("User {} edited cafe {} '{}'", admin.id, cafe.id, cafe.name);
            Ok(see_other(state, format!("/cafe/{}", id)))
        }
        Err(e @ Error::DuplicateCafeName) => {
            let mut errors = FieldErrors::default();
            errors.add("name", e.to_string());
            Ok(CafeFormTemplate::new(state, form, errors, Some(id)).to_response(state))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn delete(state: &State) -> DocumentResult {
    let admin = user::require_admin(Identity::try_borrow_from(state))?;
    let connection = &DbConnection::from_state(state)?;
    let id = CafePath::borrow_from(state).id;

    cafe::delete(connection, id)?;
    log::info!("User {} deleted cafe {}", admin.id, id);
    Ok(see_other(state, "/all_cafes"))
}
