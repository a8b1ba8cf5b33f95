//! Minimal sprig bootstrap — a CGI program with JSON and HTML routes.
//!
//! Run with:
//!   REQUEST_METHOD=GET QUERY_STRING='route=/api/v1/user/get/7' \
//!     RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   QUERY_STRING='route=/'                       → home page (HTML)
//!   QUERY_STRING='route=/api/v1/user/getlist'    → JSON envelope
//!   QUERY_STRING='route=/api/v1/admin/stats'     → 401 without HTTP_AUTHORIZATION
//!   QUERY_STRING='route=/nope'                   → 404 error payload

use std::io;

use serde_json::json;
use sprig::{
    App, Container, Controller, Controllers, Env, Error, IntoReply, JsonResponse, Request, Router,
    Status, View, func, middleware,
};

#[derive(Clone)]
struct Users(Vec<(String, String)>);

fn main() -> io::Result<()> {
    // stdout carries the response; logs go to stderr.
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    // Optional .env next to the binary's working directory.
    let env = Env::load("configs/dev.env").unwrap_or_default();
    let app_name = env.key("APP_NAME").unwrap_or("sprig").to_owned();

    let mut container = Container::new();
    container.bind("users", |_| Users(vec![
        ("7".into(), "ada".into()),
        ("8".into(), "grace".into()),
    ]));
    container.bind("app_name", move |_| app_name.clone());

    let mut controllers = Controllers::new();
    controllers.register::<HomeController>("HomeController")
        .action("index", HomeController::index);
    controllers.register::<UserController>("UserController")
        .action("get", UserController::get)
        .action("getlist", UserController::getlist);

    let auth = middleware::from_fn(|req, next| match req.server("HTTP_AUTHORIZATION") {
        Some(_) => next.run(),
        None => Ok(Status::Unauthorized.into_reply()),
    });

    let router = Router::new()
        .get("/", ("HomeController", "index"))
        .group("/api/v1", |api| api
            .get("/user/get/{userId}", ("UserController", "get"))
            .get("/user/getlist", ("UserController", "getlist"))
            .group("/admin", |admin| admin
                .route(sprig::Method::Get, "/stats", func(stats), [middleware::trace(), auth])));

    let app = App::new(router)
        .with_container(container)
        .with_controllers(controllers);

    let req = match Request::from_env() {
        Ok(req) => req,
        Err(e) => {
            // Unknown verb or unreadable body: no route can serve it.
            let res = sprig::Response::builder()
                .code(e.code())
                .json(e.payload().to_json());
            return res.write_to(&mut io::stdout().lock());
        }
    };
    app.dispatch_to(req, &mut io::stdout().lock())
}

// GET /
struct HomeController {
    app_name: String,
}

impl Controller for HomeController {
    fn construct(app: &App) -> Result<Self, Error> {
        Ok(Self { app_name: app.container().using("app_name")? })
    }
}

impl HomeController {
    fn index(&self, _req: &Request) -> Result<View, Error> {
        Ok(View::inline(
            concat!(
                "<!DOCTYPE html><title>{{ name }}</title><h1>Welcome to {{ name }}</h1>",
                "<form method=\"post\"><input type=\"hidden\" name=\"_token\" value=\"{{ csrf }}\"></form>",
            ),
            json!({"name": self.app_name, "csrf": sprig::csrf_token()}),
        ))
    }
}

// GET /api/v1/user/get/{userId}, GET /api/v1/user/getlist
struct UserController {
    users: Users,
}

impl Controller for UserController {
    fn construct(app: &App) -> Result<Self, Error> {
        Ok(Self { users: app.container().using("users")? })
    }
}

impl UserController {
    fn get(&self, req: &Request) -> Result<JsonResponse, Error> {
        let id = req.param("userId").unwrap_or_default();
        let rows: Vec<_> = self.users.0.iter()
            .filter(|(uid, _)| uid == id)
            .map(|(uid, name)| json!({"user_id": uid, "name": name}))
            .collect();
        Ok(JsonResponse::new(json!(rows), "Success", Status::Ok))
    }

    fn getlist(&self, _req: &Request) -> Result<JsonResponse, Error> {
        JsonResponse::from_serialize(&self.users.0, "Success", Status::Ok)
    }
}

// GET /api/v1/admin/stats
fn stats(_req: &Request, app: &App) -> Result<serde_json::Value, Error> {
    Ok(json!({"routes": app.router().routes().len()}))
}
