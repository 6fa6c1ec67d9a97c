//! A directory of cafes with their amenities, and a place to comment on them.
//!
//! It has the following address scheme:
//! * `/` - Landing page listing every known location
//! * `/all_cafes` - Every cafe
//! * `/location/<location>` - Cafes at exactly `location`
//! * `/cafe/<id>` - A cafe and its comments, `POST` to comment when logged in
//! * `/register`, `/login`, `/logout` - Account handling
//! * Administrator only:
//!     * `/new-cafe` - Add a cafe
//!     * `/edit_cafe/<id>` - Overwrite the cafe with `id`
//!     * `/delete/<id>` - Delete the cafe with `id` and its comments

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate serde;

pub mod cafe;
pub mod comment;
pub mod config;
pub mod date_format;
pub mod db;
pub mod document;
pub mod error;
pub mod form;
pub mod handler;
pub mod logging;
pub mod schema;
pub mod user;

#[cfg(test)]
mod tests;

use gotham::{
    middleware::cookie::CookieParser,
    middleware::state::StateMiddleware,
    pipeline::new_pipeline,
    pipeline::set::{finalize_pipeline_set, new_pipeline_set},
    router::builder::{build_router, DefineSingleRoute, DrawRoutes},
    router::response::extender::ResponseExtender,
    router::Router,
    state::State,
};
use http::status::StatusCode;
use hyper::{body::Payload, Body, Response};

use crate::{
    config::Settings,
    db::DbConnection,
    handler::{CafePath, LocationPath},
    user::{AdminGuard, SessionMiddleware},
};

/// Response extender for 404 errors. Leaves pages rendered by handlers alone.
pub struct NotFound;

impl ResponseExtender<Body> for NotFound {
    fn extend(&self, state: &mut State, res: &mut Response<Body>) {
        if res.body().is_end_stream() {
            *res = handler::error_response(state, &error::Error::NotFound.into());
        }
    }
}

/// Builds the request router
fn router(settings: Settings, connection: DbConnection) -> Router {
    let pipelines = new_pipeline_set();
    let (pipelines, default) = pipelines.add(
        new_pipeline()
            .add(StateMiddleware::new(connection))
            .add(StateMiddleware::new(settings))
            .add(CookieParser)
            .add(SessionMiddleware)
            .build(),
    );
    let (pipelines, admin) = pipelines.add(new_pipeline().add(AdminGuard).build());
    let pipelines = finalize_pipeline_set(pipelines);

    let default_chain = (default, ());
    // Runs the default pipeline first so the guard sees the identity
    let admin_chain = (admin, default_chain);

    build_router(default_chain, pipelines, |route| {
        use crate::document::{cafe, index, user};

        route.get("/").to(handler!(index::home));
        route.get("/all_cafes").to(handler!(index::all_cafes));
        route
            .get("/location/:location")
            .with_path_extractor::<LocationPath>()
            .to(handler!(index::location));
        route
            .post("/location/:location")
            .with_path_extractor::<LocationPath>()
            .to(handler!(index::location));

        route
            .get("/cafe/:id")
            .with_path_extractor::<CafePath>()
            .to(handler!(cafe::view));
        route
            .post("/cafe/:id")
            .with_path_extractor::<CafePath>()
            .to(body_handler!(cafe::comment_post));

        route.get("/register").to(handler!(user::register));
        route.post("/register").to(body_handler!(user::register_post));
        route.get("/login").to(handler!(user::login));
        route.post("/login").to(body_handler!(user::login_post));
        route.get("/logout").to(handler!(user::logout));

        route.with_pipeline_chain(admin_chain, |route| {
            route.get("/new-cafe").to(handler!(cafe::new));
            route.post("/new-cafe").to(body_handler!(cafe::new_post));
            route
                .get("/edit_cafe/:id")
                .with_path_extractor::<CafePath>()
                .to(handler!(cafe::edit));
            route
                .post("/edit_cafe/:id")
                .with_path_extractor::<CafePath>()
                .to(body_handler!(cafe::edit_post));
            route
                .get("/delete/:id")
                .with_path_extractor::<CafePath>()
                .to(handler!(cafe::delete));
        });

        // Error responders
        route.add_response_extender(StatusCode::NOT_FOUND, NotFound);
    })
}

fn main() -> Result<(), failure::Error> {
    let settings = Settings::load()?;
    logging::init_logger(settings.level()?)?;

    let connection = DbConnection::from_url(&settings.database_url)?;
    let address = settings.host_address.clone();

    log::info!("Running at {}", address);
    gotham::start(address, router(settings, connection));
    Ok(())
}
