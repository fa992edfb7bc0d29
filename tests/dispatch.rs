//! End-to-end routing behaviour through the public builder API.

mod common;

use common::{calls, constant, counted, get, request, text, BraceRenderer};
use serde_json::{json, Value};
use waypoint::dispatch::Map;
use waypoint::{
    bind, from_fn, BoxError, ConfigurationError, DispatchError, MatchOutcome, Reply, RequestContext,
    RouterBuilder,
};

fn reply_of(outcome: MatchOutcome) -> Reply {
    outcome.into_reply().expect("route should match")
}

#[test]
fn test_item_behind_auth_filter() {
    let mut app = RouterBuilder::default();
    app.register_filter("is:auth", &[], constant(json!("alice"))).unwrap();
    app.get(
        "/items/<id>",
        "is:auth",
        bind(&["id", "filter"], |args| {
            let id = args[0].as_str().unwrap_or_default();
            let filter = args[1].accessor().expect("filter accessor");
            let user = filter.str("auth").unwrap_or_default();
            Ok(Reply::text(format!("{id}:{user}")))
        })
        .unwrap(),
    )
    .unwrap();
    let router = app.build().unwrap();

    let outcome = router.dispatch("/items/7", &get("/items/7")).unwrap();
    assert_eq!(reply_of(outcome), Reply::text("7:alice"));

    // Wrong method never reaches the handler.
    let outcome = router.dispatch("/items/7", &request("POST", "/items/7")).unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch);
}

#[test]
fn test_trailing_segment_does_not_match() {
    let mut app = RouterBuilder::default();
    app.route("/users/<id>/", "", text("user")).unwrap();
    let router = app.build().unwrap();

    assert!(router.dispatch("/users/42", &get("")).unwrap().is_matched());
    assert!(router.dispatch("/USERS/42/", &get("")).unwrap().is_matched());
    assert!(!router.dispatch("/users/42/posts", &get("")).unwrap().is_matched());
}

#[test]
fn test_rejected_filter_tries_next_route() {
    let mut app = RouterBuilder::default();
    app.register_filter("is:logged", &[], constant(Value::Null)).unwrap();
    app.get("/", "is:logged", text("welcome back")).unwrap();
    app.get("/", "!is:logged", text("please log in")).unwrap();
    let router = app.build().unwrap();

    assert_eq!(reply_of(router.dispatch("/", &get("/")).unwrap()), Reply::text("please log in"));
}

#[test]
fn test_rejected_attempt_leaves_no_results() {
    let mut app = RouterBuilder::default();
    app.register_filter("user", &[], constant(json!("yoda"))).unwrap();
    app.register_filter("admin", &[], constant(json!(false))).unwrap();
    app.route("/panel", "user admin", text("admin panel")).unwrap();
    app.route(
        "/panel",
        "",
        from_fn(|ctx| {
            let seen = ctx.filter().all().len();
            Ok(Reply::text(format!("filters seen: {seen}")))
        }),
    )
    .unwrap();
    let router = app.build().unwrap();

    let outcome = router.dispatch("/panel", &get("/panel")).unwrap();
    assert_eq!(reply_of(outcome), Reply::text("filters seen: 0"));
}

#[test]
fn test_mount_no_match_falls_through_to_siblings() {
    let mut api = RouterBuilder::default();
    api.get("/users", "", text("api users")).unwrap();

    let mut app = RouterBuilder::default();
    app.mount("/api", "", api).unwrap();
    app.get("/api/health", "", text("parent health")).unwrap();
    let router = app.build().unwrap();

    assert_eq!(reply_of(router.dispatch("/api/users", &get("")).unwrap()), Reply::text("api users"));
    assert_eq!(
        reply_of(router.dispatch("/api/health", &get("")).unwrap()),
        Reply::text("parent health")
    );
    assert_eq!(router.dispatch("/api/nothing", &get("")).unwrap(), MatchOutcome::NoMatch);
}

#[test]
fn test_mount_guarded_by_filters() {
    let mut api = RouterBuilder::default();
    api.get("/", "", text("api root")).unwrap();

    let mut app = RouterBuilder::default();
    app.mount("/api", "is:ajax", api).unwrap();
    app.get("/api", "", text("plain page")).unwrap();
    let router = app.build().unwrap();

    let ajax = get("/api").with_server("HTTP_X_REQUESTED_WITH", "XMLHttpRequest");
    assert_eq!(reply_of(router.dispatch("/api", &ajax).unwrap()), Reply::text("api root"));
    assert_eq!(reply_of(router.dispatch("/api", &get("/api")).unwrap()), Reply::text("plain page"));
}

#[test]
fn test_filters_and_results_flow_into_mounts() {
    let (logged, logged_calls) = counted(json!("Yoda"));

    let mut admin = RouterBuilder::default();
    admin.register_filter("is:admin", &["is:logged"], constant(json!(true))).unwrap();
    admin
        .get(
            "/users/<id>",
            "is:logged is:admin",
            bind(&["logged", "section", "id"], |args| {
                let user = args[0].as_str().unwrap_or_default();
                let section = args[1].as_str().unwrap_or_default();
                let id = args[2].as_str().unwrap_or_default();
                Ok(Reply::text(format!("{user} views {section}/{id}")))
            })
            .unwrap(),
        )
        .unwrap();

    let mut app = RouterBuilder::default();
    app.register_filter("is:logged", &[], logged).unwrap();
    app.mount("/<section>", "is:logged", admin).unwrap();
    let router = app.build().unwrap();

    let outcome = router.dispatch("/admin/users/3", &get("")).unwrap();
    assert_eq!(reply_of(outcome), Reply::text("Yoda views admin/3"));
    // Memoized across the mount boundary and the dependency.
    assert_eq!(calls(&logged_calls), 1);
}

fn store_info(ctx: &RequestContext<'_>) -> Result<Reply, BoxError> {
    let site = ctx.store().str("site").unwrap_or_default();
    let owner = ctx.store().str("owner").unwrap_or_default();
    Ok(Reply::text(format!("{site}/{owner}")))
}

#[test]
fn test_store_shadowing() {
    let mut child = RouterBuilder::default();
    child.store("site", "child");
    child.get("/info", "", from_fn(store_info)).unwrap();

    let mut app = RouterBuilder::default();
    app.store("site", "parent").store("owner", "vice");
    app.get("/info", "", from_fn(store_info)).unwrap();
    app.mount("/child", "", child).unwrap();
    let router = app.build().unwrap();

    assert_eq!(reply_of(router.dispatch("/child/info", &get("")).unwrap()), Reply::text("child/vice"));
    assert_eq!(reply_of(router.dispatch("/info", &get("")).unwrap()), Reply::text("parent/vice"));
    assert_eq!(router.store().get("site"), Some(&json!("parent")));
}

#[test]
fn test_lookup_prefers_params_over_store() {
    let mut store = Map::new();
    store.insert("id".to_string(), json!("from-store"));
    store.insert("title".to_string(), json!("Vice"));

    let mut app = RouterBuilder::default().with_store(store);
    app.get(
        "/posts/<id>",
        "",
        bind(&["ID", "Title"], |args| {
            Ok(Reply::text(format!(
                "{} {}",
                args[0].as_str().unwrap_or_default(),
                args[1].as_str().unwrap_or_default()
            )))
        })
        .unwrap(),
    )
    .unwrap();
    let router = app.build().unwrap();

    assert_eq!(reply_of(router.dispatch("/posts/12", &get("")).unwrap()), Reply::text("12 Vice"));
}

#[test]
fn test_dispatch_is_idempotent() {
    let (filter, filter_calls) = counted(json!({"name": "Yoda"}));
    let mut app = RouterBuilder::default();
    app.register_filter("user", &[], filter).unwrap();
    app.get(
        "/greet/<name>",
        "user",
        from_fn(|ctx| {
            let name = ctx.param().str("name").unwrap_or_default();
            Ok(Reply::json(json!({ "name": name, "user": ctx.filter().get("user").cloned() })))
        }),
    )
    .unwrap();
    let router = app.build().unwrap();

    let sources = get("/greet/luke");
    let first = router.dispatch("/greet/luke", &sources).unwrap();
    let second = router.dispatch("/greet/luke", &sources).unwrap();
    assert_eq!(first, second);
    assert_eq!(calls(&filter_calls), 2);
}

#[test]
fn test_method_override_shortcuts() {
    let mut app = RouterBuilder::default();
    app.put("/posts/<id>", "", text("updated")).unwrap();
    app.delete("/posts/<id>", "", text("deleted")).unwrap();
    app.post(
        "/posts/<id>",
        "",
        bind(&["post"], |args| {
            let form = args[0].accessor().expect("post accessor");
            Ok(Reply::text(format!("created {} fields", form.all().len())))
        })
        .unwrap(),
    )
    .unwrap();
    let router = app.build().unwrap();

    let put = request("POST", "/posts/1").with_post("_method", "PUT");
    assert_eq!(reply_of(router.dispatch("/posts/1", &put).unwrap()), Reply::text("updated"));

    let delete = request("DELETE", "/posts/1");
    assert_eq!(reply_of(router.dispatch("/posts/1", &delete).unwrap()), Reply::text("deleted"));

    let create = request("POST", "/posts/1").with_post("title", "Vice");
    assert_eq!(reply_of(router.dispatch("/posts/1", &create).unwrap()), Reply::text("created 1 fields"));
}

#[test]
fn test_predicate_error_aborts_dispatch() {
    let mut app = RouterBuilder::default();
    app.register_filter(
        "session",
        &[],
        from_fn(|_ctx| -> Result<Value, BoxError> { Err("session store unreachable".into()) }),
    )
    .unwrap();
    app.get("/", "session", text("guarded")).unwrap();
    app.get("/", "", text("fallback")).unwrap();
    let router = app.build().unwrap();

    let err = router.dispatch("/", &get("/")).unwrap_err();
    assert!(matches!(err, DispatchError::Filter { ref filter, .. } if filter == "session"));
    assert!(err.to_string().contains("session store unreachable"));
}

#[test]
fn test_handler_error_propagates() {
    let mut app = RouterBuilder::default();
    app.get(
        "/boom",
        "",
        from_fn(|_ctx| -> Result<Reply, BoxError> { Err("template missing".into()) }),
    )
    .unwrap();
    let router = app.build().unwrap();

    match router.dispatch("/boom", &get("/boom")) {
        Err(DispatchError::Handler { route, source }) => {
            assert_eq!(route, "/boom");
            assert_eq!(source.to_string(), "template missing");
        }
        other => panic!("expected handler error, got {other:?}"),
    }
}

#[test]
fn test_build_time_errors() {
    let mut app = RouterBuilder::default();
    app.register_filter("a", &[], constant(json!(true))).unwrap();
    let err = app.register_filter("A", &[], constant(json!(true))).unwrap_err();
    assert!(matches!(err, ConfigurationError::DuplicateFilter(_)));

    let mut app = RouterBuilder::default();
    app.register_filter("a", &["b"], constant(json!(true))).unwrap();
    app.register_filter("b", &["!a"], constant(json!(true))).unwrap();
    assert!(matches!(app.build(), Err(ConfigurationError::FilterCycle(_))));

    let mut child = RouterBuilder::default();
    child.get("/", "is:missing", text("never")).unwrap();
    let mut app = RouterBuilder::default();
    app.mount("/child", "", child).unwrap();
    assert!(matches!(app.build(), Err(ConfigurationError::UnknownFilter { .. })));

    assert!(matches!(
        bind(&["id", "Id"], |_args| Ok(Reply::Empty)),
        Err(ConfigurationError::UninvocableTarget { .. })
    ));
}

#[test]
fn test_child_may_shadow_inherited_filter() {
    let mut child = RouterBuilder::default();
    child.register_filter("is:logged", &[], constant(json!("child-user"))).unwrap();
    child.get("/", "is:logged", bind(&["logged"], |args| {
        Ok(Reply::text(args[0].as_str().unwrap_or_default().to_string()))
    }).unwrap()).unwrap();

    let mut app = RouterBuilder::default();
    app.register_filter("is:logged", &[], constant(json!("parent-user"))).unwrap();
    app.mount("/child", "", child).unwrap();
    let router = app.build().unwrap();

    assert_eq!(reply_of(router.dispatch("/child", &get("")).unwrap()), Reply::text("child-user"));
}

fn echo_logged() -> impl waypoint::Handler<Reply> {
    bind(&["logged"], |args| Ok(Reply::text(args[0].as_str().unwrap_or_default().to_string()))).unwrap()
}

#[test]
fn test_shadowing_filter_runs_under_guarded_mount() {
    let (parent_logged, parent_calls) = counted(json!("parent-user"));
    let (child_logged, child_calls) = counted(json!("child-user"));

    let mut child = RouterBuilder::default();
    child.register_filter("is:logged", &[], child_logged).unwrap();
    child.get("/", "is:logged", echo_logged()).unwrap();

    let mut app = RouterBuilder::default();
    app.register_filter("is:logged", &[], parent_logged).unwrap();
    app.mount("/child", "is:logged", child).unwrap();
    app.get("/", "is:logged", echo_logged()).unwrap();
    let router = app.build().unwrap();

    assert_eq!(reply_of(router.dispatch("/child", &get("")).unwrap()), Reply::text("child-user"));
    assert_eq!(calls(&parent_calls), 1);
    assert_eq!(calls(&child_calls), 1);

    // The parent's own routes still see the parent's filter.
    assert_eq!(reply_of(router.dispatch("/", &get("")).unwrap()), Reply::text("parent-user"));
    assert_eq!(calls(&parent_calls), 2);
    assert_eq!(calls(&child_calls), 1);
}

#[test]
fn test_base_path_and_request_path() {
    let mut app = RouterBuilder::new("/vice/example/");
    app.get("/users/<id>", "", from_fn(|ctx| {
        Ok(Reply::text(ctx.param().str("id").unwrap_or_default().to_string()))
    }))
    .unwrap();
    let router = app.build().unwrap();

    let sources = get("/vice/example/users/9?tab=posts");
    let path = sources.request_path().unwrap();
    assert_eq!(reply_of(router.dispatch(&path, &sources).unwrap()), Reply::text("9"));
    assert_eq!(router.dispatch("/users/9", &sources).unwrap(), MatchOutcome::NoMatch);
}

#[test]
fn test_render_helper_inherited_by_mounts() {
    let mut pages = RouterBuilder::default();
    pages
        .get(
            "/<name>",
            "",
            from_fn(|ctx| {
                let name = ctx.param().get_or("name", "nobody");
                Ok(Reply::html(ctx.render("<h1>{name}</h1>", &json!({ "name": name }))?))
            }),
        )
        .unwrap();

    let mut app = RouterBuilder::default();
    app.renderer(BraceRenderer);
    app.mount("/pages", "", pages).unwrap();
    let router = app.build().unwrap();

    let outcome = router.dispatch("/pages/yoda", &get("")).unwrap();
    assert_eq!(reply_of(outcome), Reply::html("<h1>yoda</h1>"));

    let mut bare = RouterBuilder::default();
    bare.get("/", "", from_fn(|ctx| Ok(Reply::html(ctx.render("x", &Value::Null)?))))
        .unwrap();
    let err = bare.build().unwrap().dispatch("/", &get("")).unwrap_err();
    assert!(err.to_string().contains("no renderer configured"));
}

#[test]
fn test_redirect_and_json_helpers() {
    let mut app = RouterBuilder::default();
    app.get(
        "/old",
        "",
        bind(&["redirect"], |args| Ok(args[0].redirect().unwrap_or_default().to("/new"))).unwrap(),
    )
    .unwrap();
    app.get(
        "/data",
        "",
        bind(&["json", "get"], |args| {
            let page = args[1].accessor().map(|q| q.get_or("page", "1")).unwrap_or(Value::Null);
            Ok(args[0].json().unwrap_or_default().respond(&json!({ "page": page }))?)
        })
        .unwrap(),
    )
    .unwrap();
    let router = app.build().unwrap();

    assert_eq!(reply_of(router.dispatch("/old", &get("")).unwrap()), Reply::redirect("/new"));
    let outcome = router.dispatch("/data", &get("").with_query("page", "4")).unwrap();
    assert_eq!(reply_of(outcome), Reply::json(json!({ "page": "4" })));
}
