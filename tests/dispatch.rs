use std::fs;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use sprig::middleware::{self, BoxedMiddleware};
use sprig::{
    App, Container, Controller, Controllers, Error, ErrorFormat, IntoReply, JsonResponse, Method,
    Request, Response, Router, Status, View, Views, func,
};

fn request(method: Method, path: &str) -> Request {
    Request::builder(method, path).build()
}

fn json_body(res: &Response) -> Value {
    serde_json::from_slice(res.body()).expect("JSON body")
}

fn text_body(res: &Response) -> &str {
    std::str::from_utf8(res.body()).expect("UTF-8 body")
}

// ── Controllers ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct UserStore(Arc<Vec<(&'static str, &'static str)>>);

struct UserController {
    store: UserStore,
}

impl Controller for UserController {
    fn construct(app: &App) -> Result<Self, Error> {
        Ok(Self { store: app.container().using::<UserStore>("users")? })
    }
}

impl UserController {
    fn get(&self, req: &Request) -> Result<JsonResponse, Error> {
        let id = req.param("userId").unwrap_or_default();
        let rows: Vec<Value> = self.store.0.iter()
            .filter(|(uid, _)| *uid == id)
            .map(|(uid, name)| json!({"user_id": uid, "name": name}))
            .collect();
        Ok(JsonResponse::new(Value::Array(rows), "Success", Status::Ok))
    }

    fn getlist(&self, _req: &Request) -> Result<JsonResponse, Error> {
        let rows = self.store.0.iter().map(|(uid, _)| *uid).collect::<Vec<_>>();
        JsonResponse::from_serialize(&rows, "Success", Status::Ok)
    }
}

struct BrokenController;

impl Controller for BrokenController {
    fn construct(app: &App) -> Result<Self, Error> {
        app.container().using::<String>("pdo")?;
        Ok(Self)
    }
}

impl BrokenController {
    fn index(&self, _req: &Request) -> Result<(), Error> {
        Ok(())
    }
}

fn user_app(router: Router) -> App {
    let mut container = Container::new();
    container.bind("users", |_| UserStore(Arc::new(vec![("7", "ada"), ("8", "grace")])));

    let mut controllers = Controllers::new();
    controllers.register::<UserController>("UserController")
        .action("get", UserController::get)
        .action("getlist", UserController::getlist);
    controllers.register::<BrokenController>("BrokenController")
        .action("index", BrokenController::index);

    App::new(router)
        .with_container(container)
        .with_controllers(controllers)
}

// ── Routing ──────────────────────────────────────────────────────────────────

#[test]
fn single_param_reaches_the_handler() {
    let app = App::new(Router::new().get("/user/{id}", func(|req, _| {
        Ok(json!({"id": req.param("id"), "count": req.params().len()}))
    })));

    let res = app.dispatch(request(Method::Get, "/user/42"));
    assert_eq!(res.status_code(), 200);
    assert_eq!(json_body(&res), json!({"id": "42", "count": 1}));
}

#[test]
fn grouped_controller_route() {
    let app = user_app(Router::new().group("/api/v1", |api| api
        .get("/user/get/{userId}", ("UserController", "get"))
        .get("/user/getlist", ("UserController", "getlist"))));

    let res = app.dispatch(request(Method::Get, "/api/v1/user/get/7"));
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(
        json_body(&res),
        json!({"data": [{"user_id": "7", "name": "ada"}], "message": "Success", "status": 200}),
    );

    let res = app.dispatch(request(Method::Get, "/api/v1/user/getlist"));
    assert_eq!(json_body(&res)["data"], json!(["7", "8"]));
}

#[test]
fn positional_params_keep_declaration_order() {
    let app = App::new(Router::new().get("/{year}/{month}/{day}", func(|req, _| {
        Ok(req.params().values().collect::<Vec<_>>().join("-"))
    })));
    let res = app.dispatch(request(Method::Get, "/2024/05/17"));
    assert_eq!(text_body(&res), "2024-05-17");
}

#[test]
fn first_registered_route_wins() {
    let app = App::new(Router::new()
        .get("/items/{id}", func(|_, _| Ok("first")))
        .get("/items/{slug}", func(|_, _| Ok("second")))
        .get("/items/special", func(|_, _| Ok("third"))));

    for path in ["/items/1", "/items/special"] {
        let res = app.dispatch(request(Method::Get, path));
        assert_eq!(text_body(&res), "first", "{path}");
    }
}

#[test]
fn unmatched_uri_is_404_json() {
    let app = App::new(Router::new().get("/", func(|_, _| Ok("home"))));

    let res = app.dispatch(request(Method::Get, "/missing"));
    assert_eq!(res.status_code(), 404);
    assert_eq!(res.header("content-type"), Some("application/json"));

    let body = json_body(&res);
    assert_eq!(body["message"], "404 Not Found");
    assert_eq!(body["code"], 404);
    assert!(body["data"].is_null());
    assert!(body["error_line"].as_u64().is_some_and(|l| l > 0));
}

#[test]
fn error_payloads_are_stable_across_dispatches() {
    let app = App::new(Router::new());
    let first = app.dispatch(request(Method::Get, "/missing"));
    let second = app.dispatch(request(Method::Get, "/missing"));
    assert_eq!(json_body(&first), json_body(&second));
}

#[test]
fn wrong_verb_is_405() {
    let app = App::new(Router::new().post("/user", func(|_, _| Ok("created"))));

    let res = app.dispatch(request(Method::Get, "/user"));
    assert_eq!(res.status_code(), 405);
    let body = json_body(&res);
    assert_eq!(body["code"], 405);
    assert_eq!(body["message"], "Invalid HTTP method. Expected POST");

    let res = app.dispatch(request(Method::Post, "/user"));
    assert_eq!(text_body(&res), "created");
}

#[test]
fn same_path_different_verbs() {
    let app = App::new(Router::new()
        .get("/thing", func(|_, _| Ok("read")))
        .put("/thing", func(|_, _| Ok("write")))
        .delete("/thing", func(|_, _| Ok(Status::NoContent))));

    assert_eq!(text_body(&app.dispatch(request(Method::Get, "/thing"))), "read");
    assert_eq!(text_body(&app.dispatch(request(Method::Put, "/thing"))), "write");
    assert_eq!(app.dispatch(request(Method::Delete, "/thing")).status_code(), 204);
}

// ── Handler resolution ───────────────────────────────────────────────────────

#[test]
fn unknown_controller_or_action_is_500() {
    let app = user_app(Router::new()
        .get("/a", ("NopeController", "index"))
        .get("/b", ("UserController", "nope")));

    let res = app.dispatch(request(Method::Get, "/a"));
    assert_eq!(res.status_code(), 500);
    assert_eq!(json_body(&res)["message"], "Controller NopeController not found.");

    let res = app.dispatch(request(Method::Get, "/b"));
    assert_eq!(res.status_code(), 500);
    assert_eq!(json_body(&res)["message"], "Method nope not found in controller UserController.");
}

#[test]
fn missing_container_binding_propagates() {
    let app = user_app(Router::new().get("/", ("BrokenController", "index")));
    let res = app.dispatch(request(Method::Get, "/"));
    assert_eq!(res.status_code(), 500);
    assert_eq!(json_body(&res)["message"], "Container not found: pdo");
}

#[test]
fn closures_reach_the_container() {
    let mut container = Container::new();
    container.bind("greeting", |_| "hello".to_owned());

    let app = App::new(Router::new().get("/greet/{name}", func(|req, app| {
        let greeting = app.container().using::<String>("greeting")?;
        Ok(format!("{greeting} {}", req.param("name").unwrap_or_default()))
    })))
    .with_container(container);

    assert_eq!(text_body(&app.dispatch(request(Method::Get, "/greet/ada"))), "hello ada");
}

trait GreetingService: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct Polite(String);

impl GreetingService for Polite {
    fn greet(&self, name: &str) -> String { format!("{} {name}", self.0) }
}

#[test]
fn services_resolve_through_the_container() {
    let mut container = Container::new();
    container.bind("salutation", |_| "good morning".to_owned());
    container.bind_service::<dyn GreetingService, _>(|c| Ok(Arc::new(Polite(c.using("salutation")?))));

    let app = App::new(Router::new().get("/greet/{name}", func(|req, app| {
        let greeter = app.container().service::<dyn GreetingService>()?;
        Ok(greeter.greet(req.param("name").unwrap_or_default()))
    })))
    .with_container(container);

    assert_eq!(text_body(&app.dispatch(request(Method::Get, "/greet/ada"))), "good morning ada");
}

#[test]
fn handler_chosen_status() {
    let app = App::new(Router::new().get("/teapot", func(|_, _| -> Result<(), Error> {
        Err(Error::http(Status::UnprocessableEntity, "bad input"))
    })));
    let res = app.dispatch(request(Method::Get, "/teapot"));
    assert_eq!(res.status_code(), 422);
    assert_eq!(json_body(&res)["message"], "bad input");
}

// ── Middleware ───────────────────────────────────────────────────────────────

fn recording(name: &'static str, log: &Arc<Mutex<Vec<String>>>, pass: bool) -> BoxedMiddleware {
    let log = Arc::clone(log);
    middleware::from_fn(move |req, next| {
        log.lock().unwrap().push(format!("{name}:{}", req.param("id").unwrap_or("-")));
        if pass {
            next.run()
        } else {
            Ok(Response::builder().status(Status::Forbidden).text("denied").into_reply())
        }
    })
}

#[test]
fn middleware_runs_in_order_and_sees_params() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let handler_log = Arc::clone(&log);

    let app = App::new(Router::new().route(
        Method::Get,
        "/doc/{id}",
        func(move |_, _| {
            handler_log.lock().unwrap().push("handler".to_owned());
            Ok("done")
        }),
        [recording("m1", &log, true), recording("m2", &log, true)],
    ));

    let res = app.dispatch(request(Method::Get, "/doc/9"));
    assert_eq!(text_body(&res), "done");
    assert_eq!(*log.lock().unwrap(), ["m1:9", "m2:9", "handler"]);
}

#[test]
fn middleware_short_circuit() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let handler_log = Arc::clone(&log);

    let app = App::new(Router::new().route(
        Method::Get,
        "/doc/{id}",
        func(move |_, _| {
            handler_log.lock().unwrap().push("handler".to_owned());
            Ok("done")
        }),
        [recording("m1", &log, false), recording("m2", &log, true)],
    ));

    let res = app.dispatch(request(Method::Get, "/doc/9"));
    assert_eq!(res.status_code(), 403);
    assert_eq!(text_body(&res), "denied");
    assert_eq!(*log.lock().unwrap(), ["m1:9"]);
}

#[test]
fn middleware_errors_hit_the_boundary() {
    let deny = middleware::from_fn(|_, _| Err(Error::http(Status::Unauthorized, "missing token")));
    let app = App::new(Router::new().route(Method::Get, "/", func(|_, _| Ok("secret")), [deny]));

    let res = app.dispatch(request(Method::Get, "/"));
    assert_eq!(res.status_code(), 401);
    assert_eq!(json_body(&res)["message"], "missing token");
}

// ── Replies ──────────────────────────────────────────────────────────────────

#[test]
fn printed_output_precedes_scalar_replies() {
    let app = App::new(Router::new()
        .get("/scalar", func(|req, _| {
            req.print("total: ");
            Ok(3_u32)
        }))
        .get("/bare", func(|req, _| {
            req.print("only this");
            Ok(())
        }))
        .get("/json", func(|req, _| {
            req.print("dropped");
            Ok(json!({"k": "v"}))
        })));

    assert_eq!(text_body(&app.dispatch(request(Method::Get, "/scalar"))), "total: 3");
    assert_eq!(text_body(&app.dispatch(request(Method::Get, "/bare"))), "only this");
    assert_eq!(json_body(&app.dispatch(request(Method::Get, "/json"))), json!({"k": "v"}));
}

#[test]
fn view_routes_render_html() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>{{ title }}</h1>").unwrap();

    let app = App::new(Router::new()
        .get("/", func(|_, app| Ok(app.view("index.html", json!({"title": "Home & Away"}))))))
        .with_views(Views::new(dir.path()));

    let res = app.dispatch(request(Method::Get, "/"));
    assert_eq!(res.status_code(), 200);
    assert_eq!(text_body(&res), "<h1>Home &amp; Away</h1>");
    assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
    assert_eq!(res.header("x-frame-options"), Some("DENY"));
    assert_eq!(res.header("x-content-type-options"), Some("nosniff"));
}

#[test]
fn missing_view_is_an_error_response() {
    let dir = tempfile::tempdir().unwrap();
    let app = App::new(Router::new().get("/", func(|_, _| Ok(View::inline("ok", Value::Null)))))
        .with_views(Views::new(dir.path()));
    assert_eq!(text_body(&app.dispatch(request(Method::Get, "/"))), "ok");

    let app = App::new(Router::new().get("/", func(|_, app| Ok(app.view("gone.html", Value::Null)))))
        .with_views(Views::new(dir.path()));
    assert_eq!(app.dispatch(request(Method::Get, "/")).status_code(), 500);
}

// ── Error pages ──────────────────────────────────────────────────────────────

#[test]
fn html_error_pages_by_code() {
    let dir = tempfile::tempdir().unwrap();
    let errors = dir.path().join("_errors");
    fs::create_dir(&errors).unwrap();
    fs::write(errors.join("404.html"), "<h1>{{ code }}</h1><p>{{ message }}</p>").unwrap();
    fs::write(errors.join("500.html"), "<h1>server error {{ code }}</h1>").unwrap();

    let app = App::new(Router::new().post("/only-post", func(|_, _| Ok(()))))
        .with_views(Views::new(dir.path()))
        .with_error_format(ErrorFormat::Html);

    let res = app.dispatch(request(Method::Get, "/nowhere"));
    assert_eq!(res.status_code(), 404);
    assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
    assert_eq!(text_body(&res), "<h1>404</h1><p>404 Not Found</p>");

    let res = app.dispatch(request(Method::Get, "/only-post"));
    assert_eq!(res.status_code(), 405);
    assert_eq!(text_body(&res), "<h1>server error 405</h1>");
}

// ── Output boundary ──────────────────────────────────────────────────────────

#[test]
fn cgi_round_trip() {
    let app = App::new(Router::new().group("/api", |api| api
        .post("/echo", func(|req, _| Ok(format!("hello {}", req.form("name").unwrap_or("?")))))));

    let req = Request::from_cgi(
        [
            ("REQUEST_METHOD", "POST"),
            ("QUERY_STRING", "route=/api/echo"),
            ("CONTENT_TYPE", "application/x-www-form-urlencoded"),
        ],
        b"name=ada",
    ).unwrap();

    let mut out = Vec::new();
    app.dispatch_to(req, &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("Status: 200 OK\r\n"), "{out}");
    assert!(out.ends_with("\r\n\r\nhello ada"), "{out}");
}

#[test]
fn cgi_multipart_upload() {
    let app = App::new(Router::new().post("/avatar", func(|req, _| {
        let file = req.file("avatar").ok_or_else(|| Error::http(Status::UnprocessableEntity, "no file"))?;
        Ok(json!({
            "owner": req.form("name"),
            "file": file.file_name(),
            "size": file.size(),
        }))
    })));

    let body = concat!(
        "--XyZ\r\n",
        "Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n",
        "Content-Type: image/png\r\n",
        "\r\n",
        "0123456789\r\n",
        "--XyZ\r\n",
        "Content-Disposition: form-data; name=\"name\"\r\n",
        "\r\n",
        "ada\r\n",
        "--XyZ--\r\n",
    );
    let req = Request::from_cgi(
        [
            ("REQUEST_METHOD", "POST"),
            ("QUERY_STRING", "route=/avatar"),
            ("CONTENT_TYPE", "multipart/form-data; boundary=XyZ"),
        ],
        body.as_bytes(),
    ).unwrap();

    let res = app.dispatch(req);
    assert_eq!(res.status_code(), 200);
    assert_eq!(json_body(&res), json!({"owner": "ada", "file": "me.png", "size": 10}));
}

#[test]
fn capture_groups_in_literals_are_refused() {
    let mut router = Router::new();
    let err = router
        .add_route("/(v1|v2)/user/{id}", Method::Get, func(|req, _| Ok(req.param("id").map(str::to_owned))), [])
        .unwrap_err();
    assert_eq!(err.code(), 500);

    let app = App::new(Router::new()
        .get("/(?:v1|v2)/user/{id}", func(|req, _| Ok(req.param("id").map(str::to_owned)))));
    assert_eq!(text_body(&app.dispatch(request(Method::Get, "/v2/user/42"))), "42");
}

#[test]
fn into_http_keeps_status_and_headers() {
    let app = App::new(Router::new());
    let res = app.dispatch(request(Method::Get, "/missing")).into_http();
    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["content-type"], "application/json");
}
