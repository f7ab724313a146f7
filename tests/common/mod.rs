#![allow(dead_code)]

use restparam::testing::TestClient;
use restparam::{
    Config, Constraint, ControllerClass, ControllerRegistry, DocAnnotationReader, Error, Json,
    Kernel, ListenerMode, Method, ParamBag, ParamDeclaration, ParamReader, ParamValue, Request,
    Router, UploadedFile,
};
use serde_json::{json, Value};

pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

pub fn valid_raw() -> Value {
    json!({"foo": "raw", "bar": "foo"})
}

pub fn valid_map() -> Value {
    json!({"foo": "map", "foobar": "foo"})
}

pub fn bag(value: Value) -> ParamBag {
    match ParamValue::from(value) {
        ParamValue::Map(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub fn jpeg(name: &str) -> UploadedFile {
    UploadedFile::new(name, Some("image/jpeg"), JPEG.to_vec())
}

pub fn text_file(name: &str, mime: &str) -> UploadedFile {
    UploadedFile::new(name, Some(mime), b"bar\n".to_vec())
}

fn registry() -> ControllerRegistry {
    let mut registry = ControllerRegistry::new();

    registry.register(
        ControllerClass::new("ParamsController")
            .param(ParamDeclaration::request("raw").default("class default"))
            .param(
                ParamDeclaration::request("bar")
                    .nullable(true)
                    .requirements(r"%word%(\s%word%)*"),
            )
            .method(
                "params",
                [
                    ParamDeclaration::request("raw")
                        .requirements(Constraint::identical_to(valid_raw()))
                        .default("invalid")
                        .strict(false),
                    ParamDeclaration::request("map")
                        .map(true)
                        .requirements(Constraint::identical_to(valid_map()))
                        .default("invalid2 %%")
                        .strict(false),
                    ParamDeclaration::query("foz").requirements("[a-z]+").incompatibles(["baz"]),
                    ParamDeclaration::query("baz").requirements("[a-z]+"),
                ],
            )
            .method("strict", [ParamDeclaration::request("id").requirements(r"\d+")]),
    );

    registry.register(
        ControllerClass::new("SubRequestController")
            .param(ParamDeclaration::request("bar").default("foo"))
            .method("test", [ParamDeclaration::query("foo")]),
    );

    // Declared through doc annotations only.
    registry.register(
        ControllerClass::new("FileController")
            .method("single", std::iter::empty())
            .method("collection", std::iter::empty())
            .method("images", std::iter::empty()),
    );

    registry
}

fn annotations() -> DocAnnotationReader {
    DocAnnotationReader::new()
        .method_doc(
            "FileController",
            "single",
            r#"/** @FileParam(name="single_file", strict=false, default="noFile") */"#,
        )
        .and_then(|r| {
            r.method_doc(
                "FileController",
                "collection",
                r#"/** @FileParam(name="array_files", map=true) */"#,
            )
        })
        .and_then(|r| {
            r.method_doc(
                "FileController",
                "images",
                r#"/**
                    * @FileParam(name="array_images", image=true, strict=false, map=true, default="NotAnImage")
                    */"#,
            )
        })
        .expect("valid annotations")
}

async fn fetch_all(req: Request) -> Result<Json<ParamBag>, Error> {
    Ok(Json(req.param_fetcher()?.all(None)?))
}

async fn attributes(req: Request) -> Json<ParamBag> {
    Json(req.attributes().clone())
}

async fn sub_request(req: Request) -> Result<Json<Value>, Error> {
    let before = req.param_fetcher()?.all(None)?;

    let sub = Request::builder(Method::POST, "/params").form_bag(req.form().clone()).build()?;
    let response = req.kernel()?.handle(sub).await;
    let during: Value = serde_json::from_slice(response.body()).unwrap_or_default();

    let after = req.param_fetcher()?.all(None)?;
    Ok(Json(json!({"before": before, "during": during, "after": after})))
}

pub fn kernel(mode: ListenerMode) -> Kernel {
    let registry = registry();
    let action = |class: &str, method: &str| registry.action(class, method).expect("registered");

    let router = Router::new()
        .action(Method::POST, "/params", action("ParamsController", "params"), fetch_all)
        .action(Method::POST, "/params/strict", action("ParamsController", "strict"), fetch_all)
        .action(Method::GET, "/params/attributes", action("ParamsController", "params"), attributes)
        .action(Method::POST, "/params/test", action("SubRequestController", "test"), sub_request)
        .action(Method::POST, "/file/test", action("FileController", "single"), fetch_all)
        .action(Method::POST, "/file/collection/test", action("FileController", "collection"), fetch_all)
        .action(Method::POST, "/image/collection/test", action("FileController", "images"), fetch_all)
        .on(Method::GET, "/health", |_: Request| async { "ok" });

    let config = Config::default().with_listener(mode).with_parameter("word", "[a-z]+");
    Kernel::new(router, ParamReader::with_annotation_reader(annotations()), config)
}

pub fn client() -> TestClient {
    TestClient::new(kernel(ListenerMode::Enabled))
}
