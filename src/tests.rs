use crate::config;
use crate::runner::{FakeRunner, InvocationOutput, OutputMode};
use crate::types::{LogLevel, ToolshedSettings};
use crate::{Envman, Stepman};
use std::path::Path;
use tracing::level_filters::LevelFilter;

#[test]
fn test_normalize_key() {
    assert_eq!(config::normalize_key("tools-dir"), "tools_dir");
    assert_eq!(config::normalize_key("stepmanBin"), "stepman_bin");
    assert_eq!(config::normalize_key("log_level"), "log_level");
}

#[test]
fn test_settings_default() {
    let settings = ToolshedSettings::default();
    assert_eq!(settings.stepman_bin, "stepman");
    assert_eq!(settings.envman_bin, "envman");
    assert!(settings.tools_dir.ends_with("toolshed/tools"));
    assert_eq!(settings.log_level, None);
}

#[test]
fn test_log_level_from_tracing_filter() {
    assert_eq!(LogLevel::from(LevelFilter::OFF), LogLevel::Panic);
    assert_eq!(LogLevel::from(LevelFilter::ERROR), LogLevel::Error);
    assert_eq!(LogLevel::from(LevelFilter::WARN), LogLevel::Warning);
    assert_eq!(LogLevel::from(LevelFilter::INFO), LogLevel::Info);
    assert_eq!(LogLevel::from(LevelFilter::DEBUG), LogLevel::Debug);
    assert_eq!(LogLevel::from(LevelFilter::TRACE), LogLevel::Debug);
}

#[test]
fn test_log_level_parse() {
    assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
    assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warning);
    assert_eq!(" fatal ".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
    assert!("verbose".parse::<LogLevel>().is_err());
}

/// Every command line starts with the verbosity pair, whichever tool and
/// whichever sub-command.
#[test]
fn test_every_invocation_starts_with_loglevel() {
    let runner = FakeRunner::new();
    let store = Path::new("/tmp/envstore.yml");

    let stepman = Stepman::new(&runner, LogLevel::Error);
    stepman.setup("lib").unwrap();
    stepman.update("lib").unwrap();
    stepman.share().unwrap();
    stepman.share_finish().unwrap();

    let envman = Envman::new(&runner, LogLevel::Error);
    envman.init().unwrap();
    envman.clear(store).unwrap();
    runner.push_output(InvocationOutput::exited(0));
    envman.run(store, Path::new("/"), &["true"]).unwrap();

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 7);
    for invocation in invocations {
        assert_eq!(&invocation.args[..2], ["--loglevel", "error"]);
    }
}

#[test]
fn test_shared_runner_across_threads() {
    let runner = std::sync::Arc::new(FakeRunner::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let runner = runner.clone();
            std::thread::spawn(move || {
                let envman = Envman::new(runner, LogLevel::Info);
                envman
                    .print_json(Path::new(&format!("/tmp/store-{}.yml", i)))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 4);
    assert!(invocations.iter().all(|i| i.mode == OutputMode::Split));
}
