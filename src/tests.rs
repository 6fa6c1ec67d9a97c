//! Drives the whole router over HTTP against a throwaway database.
use diesel::prelude::*;
use gotham::test::{TestResponse, TestServer};
use http::{header, HeaderValue, StatusCode};

use crate::{
    cafe::{self, tests::changes},
    config::Settings,
    date_format,
    db::DbConnection,
    router,
    schema::{cafes, comments},
    user,
};

const FORM: mime::Mime = mime::APPLICATION_WWW_FORM_URLENCODED;

const NEW_CAFE: &str = "name=Bean+There&map_url=https%3A%2F%2Fmaps.example.com%2Fbean\
    &img_url=https%3A%2F%2Fimg.example.com%2Fbean.jpg&location=Oslo&seats=10-20\
    &has_wifi=y&coffee_price=3.00";

fn setup() -> (TestServer, DbConnection) {
    let settings = Settings::from_slice(
        br#"
        database_url = ":memory:"
        host_address = "127.0.0.1:0"

        [cookie]
        secure = false
        "#,
    )
    .unwrap();
    let db = DbConnection::from_url(&settings.database_url).unwrap();
    let server = TestServer::new(router(settings, db.clone())).unwrap();
    (server, db)
}

fn url(path: &str) -> String {
    format!("http://localhost{}", path)
}

/// `name=value` of the cookie called `name` set by the response
fn set_cookie(response: &TestResponse, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| cookie::Cookie::parse(value.to_owned()).ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
}

fn location(response: &TestResponse) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn get(server: &TestServer, path: &str, cookie: Option<&str>) -> TestResponse {
    let client = server.client();
    let mut request = client.get(url(path).as_str());
    if let Some(cookie) = cookie {
        request = request.with_header(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
    }
    request.perform().unwrap()
}

fn post(server: &TestServer, path: &str, body: &str, cookie: Option<&str>) -> TestResponse {
    let client = server.client();
    let mut request = client.post(url(path).as_str(), body.to_owned(), FORM);
    if let Some(cookie) = cookie {
        request = request.with_header(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
    }
    request.perform().unwrap()
}

/// Registers an account and returns its session cookie
fn register(server: &TestServer, name: &str, email: &str) -> String {
    let body = format!("name={}&email={}&password=secret", name, email);
    let response = post(server, "/register", &body, None);
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    set_cookie(&response, "session").unwrap()
}

fn cafe_count(db: &DbConnection) -> i64 {
    cafes::table
        .count()
        .get_result(&*db.lock().unwrap())
        .unwrap()
}

fn comment_count(db: &DbConnection) -> i64 {
    comments::table
        .count()
        .get_result(&*db.lock().unwrap())
        .unwrap()
}

fn add_cafe(db: &DbConnection, name: &str, place: &str) -> i32 {
    cafe::create(&db.lock().unwrap(), &changes(name, place))
        .unwrap()
        .id
}

#[test]
fn registration_logs_in() {
    let (server, _db) = setup();
    let session = register(&server, "Ann", "ann@example.com");

    let body = get(&server, "/", Some(&session)).read_utf8_body().unwrap();
    assert!(body.contains("Logged in as Ann"));
}

#[test]
fn duplicate_registration_goes_to_login() {
    let (server, db) = setup();
    register(&server, "Ann", "ann@example.com");

    let response = post(
        &server,
        "/register",
        "name=Other&email=ann@example.com&password=other",
        None,
    );
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let flash = set_cookie(&response, "flash").unwrap();
    assert_eq!(flash, "flash=already-registered");
    assert_eq!(user::count(&db.lock().unwrap()).unwrap(), 1);

    let response = get(&server, "/login", Some(&flash));
    // Shown once, then cleared
    assert_eq!(set_cookie(&response, "flash").unwrap(), "flash=");
    let body = response.read_utf8_body().unwrap();
    assert!(body.contains("already signed up with that email, log in instead!"));
}

#[test]
fn invalid_registration_is_rerendered() {
    let (server, db) = setup();
    let response = post(&server, "/register", "name=&email=nope&password=x", None);
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.read_utf8_body().unwrap();
    assert!(body.contains("This field is required."));
    assert!(body.contains("Invalid email address."));
    assert_eq!(user::count(&db.lock().unwrap()).unwrap(), 0);
}

#[test]
fn login_reports_bad_credentials() {
    let (server, _db) = setup();
    register(&server, "Ann", "ann@example.com");

    let response = post(
        &server,
        "/login",
        "email=bob@example.com&password=secret",
        None,
    );
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "session").is_none());
    let body = response.read_utf8_body().unwrap();
    assert!(body.contains("The email does not exist, please try again."));

    let response = post(&server, "/login", "email=ann@example.com&password=wrong", None);
    let body = response.read_utf8_body().unwrap();
    assert!(body.contains("Invalid password, please try again."));

    let response = post(&server, "/login", "email=ann@example.com&password=secret", None);
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(set_cookie(&response, "session").is_some());
}

#[test]
fn logout_forgets_session() {
    let (server, _db) = setup();
    let session = register(&server, "Ann", "ann@example.com");

    let response = get(&server, "/logout", Some(&session));
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(set_cookie(&response, "session").unwrap(), "session=");

    let body = get(&server, "/", Some(&session)).read_utf8_body().unwrap();
    assert!(!body.contains("Logged in as"));
}

#[test]
fn members_cannot_change_cafes() {
    let (server, db) = setup();
    register(&server, "Admin", "admin@example.com");
    let member = register(&server, "Member", "member@example.com");
    let id = add_cafe(&db, "Kept", "Oslo");

    for cookie in &[Some(member.as_str()), None] {
        let gets = [
            String::from("/new-cafe"),
            format!("/edit_cafe/{}", id),
            format!("/delete/{}", id),
        ];
        for path in &gets {
            let response = get(&server, path, *cookie);
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "GET {}", path);
        }

        let posts = [String::from("/new-cafe"), format!("/edit_cafe/{}", id)];
        for path in &posts {
            for body in &[NEW_CAFE, "name=&map_url=javascript%3Aalert(1)", ""] {
                let response = post(&server, path, body, *cookie);
                assert_eq!(response.status(), StatusCode::FORBIDDEN, "POST {} {}", path, body);
            }
        }
    }

    assert_eq!(cafe_count(&db), 1);
    assert_eq!(cafe::get(&db.lock().unwrap(), id).unwrap().name, "Kept");
}

#[test]
fn admin_manages_cafes() {
    let (server, db) = setup();
    let admin = register(&server, "Admin", "admin@example.com");

    let body = get(&server, "/new-cafe", Some(&admin))
        .read_utf8_body()
        .unwrap();
    assert!(body.contains("action=\"/new-cafe\""));

    let response = post(&server, "/new-cafe", NEW_CAFE, Some(&admin));
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/all_cafes");

    let body = get(&server, "/all_cafes", None).read_utf8_body().unwrap();
    assert!(body.contains("Bean There"));

    // Same name again
    let response = post(&server, "/new-cafe", NEW_CAFE, Some(&admin));
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.read_utf8_body().unwrap();
    assert!(body.contains("A cafe with that name already exists."));
    assert_eq!(cafe_count(&db), 1);

    let id = cafe::list_all(&db.lock().unwrap()).unwrap()[0].id;
    let edited = NEW_CAFE.replace("Bean+There", "Bean+Here");
    let response = post(&server, &format!("/edit_cafe/{}", id), &edited, Some(&admin));
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/cafe/{}", id));
    assert_eq!(cafe::get(&db.lock().unwrap(), id).unwrap().name, "Bean Here");

    let response = get(&server, &format!("/delete/{}", id), Some(&admin));
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/all_cafes");
    assert_eq!(cafe_count(&db), 0);

    let response = get(&server, &format!("/cafe/{}", id), None);
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn invalid_cafe_is_rerendered() {
    let (server, db) = setup();
    let admin = register(&server, "Admin", "admin@example.com");

    let body = NEW_CAFE.replace("https%3A%2F%2Fmaps.example.com%2Fbean", "not-a-url");
    let response = post(&server, "/new-cafe", &body, Some(&admin));
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.read_utf8_body().unwrap();
    assert!(body.contains("Invalid URL."));
    assert!(body.contains("value=\"Bean There\""));

    let body = NEW_CAFE
        .replace("name=Bean+There", "name=+++")
        .replace("https%3A%2F%2Fimg.example.com%2Fbean.jpg", "javascript%3Aalert(1)");
    let response = post(&server, "/new-cafe", &body, Some(&admin));
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.read_utf8_body().unwrap();
    assert!(body.contains("This field is required."));
    assert!(body.contains("Invalid URL."));
    assert_eq!(cafe_count(&db), 0);
}

#[test]
fn anonymous_comment_goes_to_login() {
    let (server, db) = setup();
    let id = add_cafe(&db, "Bean", "Oslo");

    let response = post(&server, &format!("/cafe/{}", id), "comment=hello", None);
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert_eq!(
        set_cookie(&response, "flash").unwrap(),
        "flash=login-required"
    );
    assert_eq!(comment_count(&db), 0);
}

#[test]
fn comment_end_to_end() {
    let (server, db) = setup();
    register(&server, "Admin", "admin@example.com");
    register(&server, "Alice", "alice@example.com");
    let id = add_cafe(&db, "Bean", "Oslo");

    let response = post(
        &server,
        "/login",
        "email=alice@example.com&password=secret",
        None,
    );
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let session = set_cookie(&response, "session").unwrap();

    let path = format!("/cafe/{}", id);
    let body = get(&server, &path, Some(&session)).read_utf8_body().unwrap();
    assert!(body.contains("Bean"));
    assert!(body.contains("name=\"comment\""));

    let response = post(&server, &path, "comment=Great+coffee", Some(&session));
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), path);

    let body = get(&server, &path, None).read_utf8_body().unwrap();
    assert!(body.contains("Great coffee"));
    assert!(body.contains("Alice"));
    assert!(body.contains(&date_format::today()));
    assert_eq!(comment_count(&db), 1);
}

#[test]
fn empty_comment_is_rejected() {
    let (server, db) = setup();
    let session = register(&server, "Ann", "ann@example.com");
    let id = add_cafe(&db, "Bean", "Oslo");

    for body in &["comment=", "comment=+++", "comment=%0D%0A"] {
        let response = post(&server, &format!("/cafe/{}", id), body, Some(&session));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .read_utf8_body()
            .unwrap()
            .contains("This field is required."));
    }
    assert_eq!(comment_count(&db), 0);
}

#[test]
fn missing_pages_are_404() {
    let (server, db) = setup();
    let admin = register(&server, "Admin", "admin@example.com");

    for path in &["/cafe/42", "/edit_cafe/42", "/delete/42", "/no/such/page"] {
        let response = get(&server, path, Some(&admin));
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
        assert!(response.read_utf8_body().unwrap().contains("Not found"));
    }

    let response = post(&server, "/cafe/42", "comment=hi", Some(&admin));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for body in &[NEW_CAFE, "name=+&seats="] {
        let response = post(&server, "/edit_cafe/42", body, Some(&admin));
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", body);
    }
    assert_eq!(comment_count(&db), 0);
}

#[test]
fn locations_are_exact() {
    let (server, db) = setup();
    add_cafe(&db, "Upper", "NYC");
    add_cafe(&db, "Lower", "nyc");
    add_cafe(&db, "Spaced", "New York");

    let body = get(&server, "/", None).read_utf8_body().unwrap();
    assert!(body.contains("href=\"/location/NYC\""));
    assert!(body.contains("href=\"/location/nyc\""));
    assert!(body.contains("href=\"/location/New%20York\""));

    let body = get(&server, "/location/NYC", None).read_utf8_body().unwrap();
    assert!(body.contains("Upper"));
    assert!(!body.contains("Lower"));

    let body = get(&server, "/location/New%20York", None)
        .read_utf8_body()
        .unwrap();
    assert!(body.contains("Spaced"));
    assert!(!body.contains("Upper"));
}
