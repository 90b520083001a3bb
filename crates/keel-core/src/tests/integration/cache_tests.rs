#![cfg(test)]

use std::fs;
use std::sync::Arc;

use tempfile::tempdir;

use super::common::*;
use crate::console::{ConsoleInput, ConsoleOutput};
use crate::kernel::constants::FRAMEWORK_PLUGIN;
use crate::kernel::error::Error as KernelError;
use crate::kernel::ConsoleKernel;
use crate::plugin_system::manifest::{Artifact, ManifestKind};
use crate::storage::StorageSystemError;

fn app_plugin(journal: &Journal) -> MockPlugin {
    MockPlugin::new("app")
        .commands(&["app.command.greet"])
        .middleware(&["app.mw"])
        .bind(
            "app.command.greet",
            Component::Command(Arc::new(ScriptedCommand::new("greet", Script::Succeed(0), journal.clone()))),
        )
        .bind("app.mw", Component::Middleware(Arc::new(TagMiddleware::new("app", journal.clone()))))
}

async fn run(kernel: &ConsoleKernel, command: &str) -> (i32, ConsoleOutput) {
    let mut output = ConsoleOutput::captured();
    let code = kernel
        .handle(ConsoleInput::new(command, Vec::new()), &mut output)
        .await
        .unwrap();
    (code, output)
}

#[tokio::test]
async fn test_optimize_then_clear() {
    let dir = tempdir().unwrap();
    let journal = journal();
    let kernel = ConsoleKernel::new(
        config(dir.path(), &[FRAMEWORK_PLUGIN, "app"]),
        table(vec![app_plugin(&journal)]),
    );
    kernel.bootstrap().await.unwrap();

    let (code, output) = run(&kernel, "cache:optimize").await;
    assert_eq!(code, 0);
    assert_eq!(output.lines().len(), 6, "one line per kind plus the summary: {:?}", output.lines());
    assert_eq!(output.lines()[5], "Application manifest cached successfully.");

    let cache_dir = dir.path().join("cache");
    for kind in ManifestKind::ALL {
        let path = cache_dir.join(format!("{}.json", kind.stem()));
        assert!(path.exists(), "{} should exist", path.display());
    }
    let mut files: Vec<String> = fs::read_dir(&cache_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(
        files,
        ["commands.json", "controllers.json", "events.json", "middleware.json", "providers.json"],
        "no temporary files should be left behind"
    );

    let (code, output) = run(&kernel, "cache:clear").await;
    assert_eq!(code, 0);
    assert_eq!(output.lines(), ["Cleared 5 cached manifest file(s).".to_string()]);
    for kind in ManifestKind::ALL {
        assert!(!kernel.registry().is_cached(kind));
    }

    let (code, output) = run(&kernel, "cache:clear").await;
    assert_eq!(code, 0, "clearing an empty cache is not an error");
    assert_eq!(output.lines(), ["Cleared 0 cached manifest file(s).".to_string()]);
}

#[tokio::test]
async fn test_optimize_is_byte_stable() {
    let dir = tempdir().unwrap();
    let journal = journal();
    let kernel = ConsoleKernel::new(
        config(dir.path(), &[FRAMEWORK_PLUGIN, "app"]),
        table(vec![app_plugin(&journal)]),
    );
    kernel.bootstrap().await.unwrap();

    run(&kernel, "cache:optimize").await;
    let first = fs::read(dir.path().join("cache/commands.json")).unwrap();
    run(&kernel, "cache:optimize").await;
    let second = fs::read(dir.path().join("cache/commands.json")).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_per_kind_cache_and_clear_commands() {
    let dir = tempdir().unwrap();
    let journal = journal();
    let kernel = ConsoleKernel::new(
        config(dir.path(), &[FRAMEWORK_PLUGIN, "app"]),
        table(vec![app_plugin(&journal)]),
    );
    kernel.bootstrap().await.unwrap();

    let (code, output) = run(&kernel, "middleware:cache").await;
    assert_eq!(code, 0);
    assert!(output.lines()[0].starts_with("Cached middleware manifest (1 entries) to "));
    assert!(kernel.registry().is_cached(ManifestKind::Middleware));
    assert!(!kernel.registry().is_cached(ManifestKind::Commands));
    assert_eq!(
        kernel.registry().cache_store().read(ManifestKind::Middleware).unwrap(),
        Some(Artifact::Middleware(vec!["app.mw".to_string()]))
    );

    let (code, output) = run(&kernel, "middleware:clear").await;
    assert_eq!(code, 0);
    assert_eq!(output.lines(), ["Cleared cached middleware manifest".to_string()]);

    let (_, output) = run(&kernel, "middleware:clear").await;
    assert_eq!(output.lines(), ["No cached middleware manifest to clear".to_string()]);
}

#[tokio::test]
async fn test_list_shows_framework_and_plugin_commands() {
    let dir = tempdir().unwrap();
    let journal = journal();
    let kernel = ConsoleKernel::new(
        config(dir.path(), &[FRAMEWORK_PLUGIN, "app"]),
        table(vec![app_plugin(&journal)]),
    );
    kernel.bootstrap().await.unwrap();

    let (code, output) = run(&kernel, "").await;
    assert_eq!(code, 0, "an empty command name runs list");
    assert_eq!(output.lines()[1], "Available commands:");
    let listing = output.lines().join("\n");
    for name in ["list", "cache:optimize", "cache:clear", "events:cache", "providers:clear", "greet"] {
        assert!(listing.contains(name), "'{}' missing from:\n{}", name, listing);
    }
}

#[tokio::test]
async fn test_corrupt_artifact_fails_bootstrap() {
    let dir = tempdir().unwrap();
    let journal = journal();
    let plugins = table(vec![app_plugin(&journal)]);

    let writer = ConsoleKernel::new(config(dir.path(), &[FRAMEWORK_PLUGIN, "app"]), plugins.clone());
    writer.registry().cache(ManifestKind::Commands).unwrap();

    let path = dir.path().join("cache/commands.json");
    let tampered = fs::read_to_string(&path).unwrap().replace("app.command.greet", "app.command.evil");
    fs::write(&path, tampered).unwrap();

    let kernel = ConsoleKernel::new(config(dir.path(), &[FRAMEWORK_PLUGIN, "app"]), plugins);
    let err = kernel.bootstrap().await.unwrap_err();
    assert!(
        matches!(err, KernelError::StorageSystem(StorageSystemError::CacheCorrupt { kind: ManifestKind::Commands, .. })),
        "expected a corrupt-cache error, got {}",
        err
    );

    let mut output = ConsoleOutput::captured();
    let err = kernel
        .handle(ConsoleInput::new("list", Vec::new()), &mut output)
        .await
        .unwrap_err();
    assert!(err.is_not_bootstrapped());
}
