//! Landing page and cafe listings
use askama::Template;
use gotham::state::{FromState, State};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::{DocumentResult, Nav, TemplateExt};
use crate::{
    cafe::{self, Cafe},
    db::DbConnection,
    handler::LocationPath,
};

/// Characters that may stay unescaped inside a path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub struct LocationLink {
    pub name: String,
    pub href: String,
}

impl LocationLink {
    pub fn new(name: String) -> Self {
        let href = format!("/location/{}", utf8_percent_encode(&name, PATH_SEGMENT));
        LocationLink { name, href }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct Index {
    nav: Nav,
    locations: Vec<LocationLink>,
}

pub fn home(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;

    let locations = cafe::locations(connection)?
        .into_iter()
        .map(LocationLink::new)
        .collect();

    let template = Index {
        nav: Nav::from_state(state),
        locations,
    };
    Ok(template.to_response(state))
}

#[derive(Template)]
#[template(path = "cafes.html")]
pub struct CafesTemplate {
    nav: Nav,
    heading: String,
    cafes: Vec<Cafe>,
}

pub fn all_cafes(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let template = CafesTemplate {
        nav: Nav::from_state(state),
        heading: String::from("All cafes"),
        cafes: cafe::list_all(connection)?,
    };
    Ok(template.to_response(state))
}

/// Cafes at exactly the location named in the path
pub fn location(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let place = &LocationPath::borrow_from(state).location;

    let template = CafesTemplate {
        nav: Nav::from_state(state),
        heading: format!("Cafes in {}", place),
        cafes: cafe::list_by_location(connection, place)?,
    };
    Ok(template.to_response(state))
}
