//! Declared, validated request params on a small JSON API.
//!
//! Run with:
//!   RESTPARAM_PARAMETER_MAX_PAGE=99 cargo run --example params
//!
//! Try:
//!   curl 'http://localhost:3000/users?page=2&sort=desc'
//!   curl 'http://localhost:3000/users?page=abc'              # lenient: falls back to 1
//!   curl 'http://localhost:3000/users?sort=sideways'         # strict: 400
//!   curl 'http://localhost:3000/users?page=2&cursor=x'       # incompatible: 400
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice","tags":{"a":"admin"}}'
//!   curl -F avatar=@cat.jpeg http://localhost:3000/users/42/avatar

use restparam::{
    Config, ControllerClass, ControllerRegistry, DocAnnotationReader, Error, Json, Kernel, Method,
    ParamBag, ParamDeclaration, ParamReader, ParamValue, Request, Router, Server,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?.with_parameter("locale", "en");

    let mut registry = ControllerRegistry::new();
    registry.register(
        ControllerClass::new("UserController")
            .param(ParamDeclaration::query("locale").requirements("[a-z]{2}").default("%locale%"))
            .method(
                "list",
                [
                    ParamDeclaration::query("page").requirements(r"\d+").default("1").incompatibles(["cursor"]),
                    ParamDeclaration::query("cursor").nullable(true),
                    ParamDeclaration::query("sort").requirements("asc|desc").strict(true).nullable(true),
                ],
            )
            .method(
                "create",
                [
                    ParamDeclaration::request("name").allow_blank(false),
                    ParamDeclaration::request("tags").map(true).requirements("[a-z]+").nullable(true),
                ],
            )
            .method("avatar", std::iter::empty()),
    );

    // Avatar params come from a doc block instead of registered attributes.
    let annotations = DocAnnotationReader::new().method_doc(
        "UserController",
        "avatar",
        r#"/** @FileParam(name="avatar", image=true, maxSize=1048576) */"#,
    )?;

    let router = Router::new()
        .action(Method::GET, "/users", registry.action("UserController", "list")?, list_users)
        .action(Method::POST, "/users", registry.action("UserController", "create")?, create_user)
        .action(Method::POST, "/users/{id}/avatar", registry.action("UserController", "avatar")?, upload_avatar);

    let server = Server::from_config(&config);
    server
        .serve(Kernel::new(router, ParamReader::with_annotation_reader(annotations), config))
        .await
}

// GET /users
async fn list_users(req: Request) -> Result<Json<ParamBag>, Error> {
    Ok(Json(req.param_fetcher()?.all(None)?))
}

// POST /users
async fn create_user(req: Request) -> Result<Json<serde_json::Value>, Error> {
    let fetcher = req.param_fetcher()?;
    let name = fetcher.get("name", None)?;
    let tags = fetcher.get("tags", None)?;
    Ok(Json(json!({"created": name, "tags": tags, "locale": fetcher.get("locale", None)?})))
}

// POST /users/{id}/avatar
async fn upload_avatar(req: Request) -> Result<Json<serde_json::Value>, Error> {
    let avatar = req.param_fetcher()?.get("avatar", None)?;
    let (name, size) = match &avatar {
        ParamValue::File(file) => (file.client_name().to_owned(), file.size()),
        _ => (String::new(), 0),
    };
    Ok(Json(json!({"user": req.param("id"), "avatar": name, "bytes": size})))
}
