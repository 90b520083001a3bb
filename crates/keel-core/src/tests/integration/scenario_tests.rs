#![cfg(test)]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use http::StatusCode;
use serde_json::json;
use tempfile::tempdir;

use super::common::*;
use crate::console::{ConsoleInput, ConsoleOutput};
use crate::event::types::NamedEvent;
use crate::event::EventResult;
use crate::http::Route;
use crate::kernel::component::ContainerExt;
use crate::kernel::error::{Error as KernelError, KernelLifecyclePhase};
use crate::kernel::{ConsoleKernel, HttpKernel};
use crate::plugin_system::manifest::ManifestKind;
use crate::ApplicationRegistry;

const TEST_PLUGIN: &str = "test-plugin";

/// The application used across scenarios: one provider, one command, one
/// controller, two middleware, two listeners on `user.created` and one on
/// `user.deleted`.
fn test_plugin(journal: &Journal) -> MockPlugin {
    MockPlugin::new(TEST_PLUGIN)
        .providers(&["test.provider"])
        .commands(&["test.command.foo"])
        .controllers(&["test.controller.bar"])
        .middleware(&["test.mid1", "test.mid2"])
        .event("user.created", &["test.listener1", "test.listener2"])
        .event("user.deleted", &["test.listener3"])
        .bind(
            "test.provider",
            Component::Provider(Arc::new(RecordingProvider::new("test", journal.clone()))),
        )
        .bind(
            "test.command.foo",
            Component::Command(Arc::new(ScriptedCommand::new("foo", Script::Succeed(0), journal.clone()))),
        )
        .bind(
            "test.controller.bar",
            Component::Controller(Arc::new(ScriptedController::new(vec![Route::get("/bar")], Reply::Text("bar")))),
        )
        .bind("test.mid1", Component::Middleware(Arc::new(TagMiddleware::new("mid1", journal.clone()))))
        .bind("test.mid2", Component::Middleware(Arc::new(TagMiddleware::new("mid2", journal.clone()))))
        .bind("test.listener1", Component::Listener(Arc::new(RecordingListener::new("l1", journal.clone()))))
        .bind("test.listener2", Component::Listener(Arc::new(RecordingListener::new("l2", journal.clone()))))
        .bind("test.listener3", Component::Listener(Arc::new(RecordingListener::new("l3", journal.clone()))))
}

#[tokio::test]
async fn test_end_to_end_console_and_http() {
    let dir = tempdir().unwrap();
    let journal = journal();
    let plugins = table(vec![test_plugin(&journal)]);
    let config = config(dir.path(), &[TEST_PLUGIN]);

    let console = ConsoleKernel::new(config.clone(), plugins.clone());
    console.bootstrap().await.unwrap();
    assert!(console.container().has("test.service"), "provider should have registered its service");
    assert_eq!(console.registry().commands().unwrap(), ["test.command.foo"]);
    assert_eq!(console.command_names().await, ["foo"]);

    let mut output = ConsoleOutput::captured();
    let code = console
        .handle(ConsoleInput::new("foo", vec!["--x".to_string()]), &mut output)
        .await
        .unwrap();
    assert_eq!(code, 0);
    assert_eq!(output.lines(), ["foo ran with [\"--x\"]".to_string()]);

    let http = HttpKernel::new(config, plugins);
    http.bootstrap().await.unwrap();
    journal.lock().unwrap().clear();

    let response = http.handle(get("/bar")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "bar");
    assert_eq!(entries(&journal), ["middleware:mid1", "middleware:mid2"]);
    // mid2 wraps the controller, so it tags the response first
    assert_eq!(response.headers()["x-trace"], "mid2,mid1");

    let event = NamedEvent::new("user.created", json!({ "id": 7 }));
    let result = http
        .core()
        .events()
        .dispatch(&event, http.container().as_ref())
        .await
        .unwrap();
    assert_eq!(result, EventResult::Continue);

    let event = NamedEvent::new("user.deleted", json!({ "id": 7 }));
    http.core()
        .events()
        .dispatch(&event, http.container().as_ref())
        .await
        .unwrap();
    assert_eq!(
        entries(&journal)[2..],
        [
            "l1:user.created".to_string(),
            "l2:user.created".to_string(),
            "l3:user.deleted".to_string()
        ]
    );
    assert_eq!(http.registry().events().unwrap().len(), 2);
}

#[tokio::test]
async fn test_providers_register_before_any_boot() {
    let dir = tempdir().unwrap();
    let journal = journal();
    let plugin = MockPlugin::new("two-providers")
        .providers(&["p.first", "p.second"])
        .bind("p.first", Component::Provider(Arc::new(RecordingProvider::new("first", journal.clone()))))
        .bind("p.second", Component::Provider(Arc::new(RecordingProvider::new("second", journal.clone()))));

    let kernel = ConsoleKernel::new(config(dir.path(), &["two-providers"]), table(vec![plugin]));
    kernel.bootstrap().await.unwrap();

    assert_eq!(
        entries(&journal),
        ["register:first", "register:second", "boot:first", "boot:second"]
    );
}

#[tokio::test]
async fn test_cached_and_fresh_boots_are_equivalent() {
    let dir = tempdir().unwrap();
    let journal = journal();

    let fresh_plugin = test_plugin(&journal);
    let fresh_calls = fresh_plugin.declaration_calls();
    let fresh = HttpKernel::new(config(dir.path(), &[TEST_PLUGIN]), table(vec![fresh_plugin]));
    fresh.bootstrap().await.unwrap();
    assert_eq!(fresh_calls.load(Ordering::SeqCst), 1, "declarations are aggregated once per registry");

    for kind in ManifestKind::ALL {
        fresh.registry().cache(kind).unwrap();
    }

    let cached_plugin = test_plugin(&journal);
    let cached_calls = cached_plugin.declaration_calls();
    let cached = HttpKernel::new(config(dir.path(), &[TEST_PLUGIN]), table(vec![cached_plugin]));
    cached.bootstrap().await.unwrap();
    assert_eq!(cached_calls.load(Ordering::SeqCst), 0, "a fully cached boot never aggregates");

    assert_eq!(fresh.routes().await, cached.routes().await);
    assert_eq!(fresh.registry().middleware().unwrap(), cached.registry().middleware().unwrap());
    assert_eq!(fresh.registry().events().unwrap(), cached.registry().events().unwrap());

    let a = fresh.handle(get("/bar")).await.unwrap();
    let b = cached.handle(get("/bar")).await.unwrap();
    assert_eq!(a.status(), b.status());
    assert_eq!(a.body(), b.body());
    assert_eq!(a.headers()["x-trace"], b.headers()["x-trace"]);
}

#[tokio::test]
async fn test_stale_cache_is_trusted_verbatim() {
    let dir = tempdir().unwrap();
    let journal = journal();

    let with_commands = ConsoleKernel::new(config(dir.path(), &[TEST_PLUGIN]), table(vec![test_plugin(&journal)]));
    with_commands.registry().cache(ManifestKind::Commands).unwrap();

    // The plugin no longer binds its command, but the cache still names it.
    let stripped = MockPlugin::new(TEST_PLUGIN);
    let kernel = ConsoleKernel::new(config(dir.path(), &[TEST_PLUGIN]), table(vec![stripped]));
    let err = kernel.bootstrap().await.unwrap_err();
    match err {
        KernelError::KernelLifecycleError { phase, component_name, .. } => {
            assert_eq!(phase, KernelLifecyclePhase::RegisterSurface);
            assert_eq!(component_name.as_deref(), Some("test.command.foo"));
        }
        other => panic!("unexpected error: {}", other),
    }

    // Clearing the artifact restores fresh aggregation.
    kernel.registry().clear(ManifestKind::Commands).unwrap();
    let retry = ConsoleKernel::new(config(dir.path(), &[TEST_PLUGIN]), table(vec![MockPlugin::new(TEST_PLUGIN)]));
    retry.bootstrap().await.unwrap();
}

#[tokio::test]
async fn test_plugin_order_drives_middleware_order() {
    let dir = tempdir().unwrap();
    let journal = journal();
    let outer = MockPlugin::new("outer")
        .middleware(&["outer.mw"])
        .bind("outer.mw", Component::Middleware(Arc::new(TagMiddleware::new("outer", journal.clone()))));
    let inner = MockPlugin::new("inner")
        .middleware(&["inner.mw"])
        .controllers(&["inner.ctrl"])
        .bind("inner.mw", Component::Middleware(Arc::new(TagMiddleware::new("inner", journal.clone()))))
        .bind(
            "inner.ctrl",
            Component::Controller(Arc::new(ScriptedController::new(vec![Route::get("/")], Reply::Text("ok")))),
        );

    let kernel = HttpKernel::new(config(dir.path(), &["outer", "inner"]), table(vec![outer, inner]));
    kernel.bootstrap().await.unwrap();
    kernel.handle(get("/")).await.unwrap();
    assert_eq!(entries(&journal), ["middleware:outer", "middleware:inner"]);
}

#[tokio::test]
async fn test_shared_registry_between_kernels() {
    let dir = tempdir().unwrap();
    let journal = journal();
    let plugins = table(vec![test_plugin(&journal)]);
    let config = config(dir.path(), &[TEST_PLUGIN]);
    let registry = Arc::new(ApplicationRegistry::from_config(&config, plugins.clone()));

    let http = HttpKernel::new(config.clone(), plugins.clone()).with_registry(registry.clone());
    let console = ConsoleKernel::new(config, plugins).with_registry(registry.clone());
    http.bootstrap().await.unwrap();
    console.bootstrap().await.unwrap();

    assert!(Arc::ptr_eq(http.registry(), console.registry()));
    let resolved = console
        .container()
        .resolve::<Arc<ApplicationRegistry>>(crate::kernel::constants::APPLICATION_REGISTRY_ID)
        .unwrap();
    assert!(Arc::ptr_eq(&resolved, &registry));
}
