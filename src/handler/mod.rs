use askama::Template;
use futures::{future, Future, Stream};
use gotham::{
    handler::{HandlerFuture, IntoHandlerError},
    state::{request_id, FromState, State},
};
use gotham_derive::{StateData, StaticResponseExtender};
use http::{Response, StatusCode};
use hyper::Body;

use crate::{
    document::{Nav, TemplateExt},
    error::Error,
};

/// Cafe id taken from the path
#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct CafePath {
    pub id: i32,
}

/// Location name taken from the path, already percent-decoded
#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct LocationPath {
    pub location: String,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    nav: Nav,
    status: u16,
    error: String,
}

/// Creates a `HandlerFuture` that runs the given function
pub fn body_handler<F>(mut state: State, op: F) -> Box<HandlerFuture>
where
    F: FnOnce(&State, Vec<u8>) -> Response<Body> + Send + 'static,
{
    let f = Body::take_from(&mut state)
        .concat2()
        .then(|result| match result {
            Ok(body) => {
                let response = op(&state, body.to_vec());
                future::ok((state, response))
            }
            Err(e) => future::err((state, e.into_handler_error())),
        });

    Box::new(f)
}

/// The status an error is reported with
fn status_of(error: &failure::Error) -> StatusCode {
    if let Some(e) = error.downcast_ref::<Error>() {
        match e {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    } else if error.downcast_ref::<serde::de::value::Error>().is_some() {
        // Malformed form bodies
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub fn error_response(state: &State, error: &failure::Error) -> Response<Body> {
    let status = status_of(error);
    if status.is_server_error() {
        log::error!("[{}] {}: {}", request_id(state), status.as_u16(), error);
    } else {
        log::warn!("[{}] {}: {}", request_id(state), status.as_u16(), error);
    }

    let template = ErrorTemplate {
        nav: Nav::from_state(state),
        status: status.as_u16(),
        error: error.to_string(),
    };
    template.to_response_with(state, status)
}

pub fn response(state: &State, result: Result<Response<Body>, failure::Error>) -> Response<Body> {
    match result {
        Ok(response) => response,
        Err(error) => error_response(state, &error),
    }
}

#[macro_export]
macro_rules! handler {
    ($handler_fn:path) => {
        |state| {
            let r = crate::handler::response(&state, $handler_fn(&state));
            (state, r)
        }
    };
}

#[macro_export]
macro_rules! body_handler {
    ($handler_fn:path) => {
        |state| {
            crate::handler::body_handler(state, |state, post| {
                crate::handler::response(&state, $handler_fn(state, post))
            })
        }
    };
}

#[cfg(test)]
mod tests {
    use super::status_of;
    use crate::error::Error;
    use http::StatusCode;

    #[test]
    fn statuses() {
        assert_eq!(status_of(&Error::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(&Error::Forbidden.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(&Error::DuplicateEmail.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(&failure::err_msg("disk on fire")),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let malformed: serde::de::value::Error = serde::de::Error::custom("bad body");
        assert_eq!(status_of(&malformed.into()), StatusCode::BAD_REQUEST);
    }
}
