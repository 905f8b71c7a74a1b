mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction, EnvAction, InstallSource, ShareAction, StepAction};
use std::io::Read;
use std::process::ExitCode;
use toolshed::config::{
    get_setting, load_settings, normalize_key, save_settings, set_setting, unset_setting,
    SETTING_KEYS,
};
use toolshed::platform::get_system_info;
use toolshed::{
    AddOptions, Envman, InstallRequest, Installer, LogLevel, ProcessRunner, StepSource, Stepman,
    ToolshedSettings,
};
use tracing::level_filters::LevelFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level_filter = setup_logging(&cli);

    // Load configuration
    let mut settings = load_settings()?;
    let log_level = settings
        .log_level
        .unwrap_or_else(|| LogLevel::from(level_filter));
    tracing::debug!("Passing --loglevel {} to managed tools", log_level);

    match cli.command {
        Commands::Version => {
            println!("toolshed v{}", env!("CARGO_PKG_VERSION"));
        }

        Commands::Platform => {
            let info = get_system_info()?;
            println!("{}-{}", info.os, info.arch);
        }

        Commands::Install { source } => {
            let installer = Installer::from_settings(&settings);
            let installed = match source {
                InstallSource::Github {
                    tool,
                    publisher,
                    tag,
                } => {
                    let request = InstallRequest {
                        tool_name: tool,
                        publisher,
                        version: tag,
                    };
                    installer.install(&request).await.with_context(|| {
                        format!("Failed to install {} {}", request.tool_name, request.version)
                    })?
                }
                InstallSource::Url { name, url } => installer
                    .install_from_url(&name, &url)
                    .await
                    .with_context(|| format!("Failed to install {}", name))?,
            };
            println!("{}", installed.display());
        }

        Commands::Step { action } => {
            let stepman =
                Stepman::with_program(ProcessRunner, log_level, settings.stepman_bin.clone());
            run_step_action(&stepman, action)?;
        }

        Commands::Env { action } => {
            let envman =
                Envman::with_program(ProcessRunner, log_level, settings.envman_bin.clone());
            if let Some(code) = run_env_action(&envman, action)? {
                return Ok(exit_code(code));
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Get { key } => {
                if let Some(key) = key {
                    println!("{}", get_setting(&settings, &key)?);
                } else {
                    println!("--- Toolshed Settings ---");
                    for key in SETTING_KEYS {
                        println!("  {}: {}", key, get_setting(&settings, key)?);
                    }
                }
            }
            ConfigAction::Set { args } => {
                let (key, value) = parse_key_value(&args)?;
                set_setting(&mut settings, &key, &value)?;
                save_settings(&settings)?;
                tracing::info!("Setting '{}' updated to '{}'", normalize_key(&key), value);
            }
            ConfigAction::Unset { key } => {
                unset_setting(&mut settings, &key)?;
                save_settings(&settings)?;
                tracing::info!("Setting '{}' unset", normalize_key(&key));
            }
            ConfigAction::Show { format } => {
                println!("{}", render_settings(&settings, &format)?);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

/// Exit codes outside `0..=255` cannot be reported by a process on unix.
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}

fn setup_logging(cli: &Cli) -> LevelFilter {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        LevelFilter::ERROR
    } else if cli.verbose == 0 {
        LevelFilter::WARN
    } else if cli.verbose == 1 {
        LevelFilter::INFO
    } else {
        LevelFilter::DEBUG
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let effective = filter.max_level_hint().unwrap_or(level);

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    effective
}

fn run_step_action(stepman: &Stepman<ProcessRunner>, action: StepAction) -> Result<()> {
    match action {
        StepAction::Setup { collection } => stepman.setup(&collection)?,
        StepAction::Activate {
            collection,
            id,
            version,
            path,
            copyyml,
        } => stepman.activate(&collection, &id, &version, &path, &copyyml)?,
        StepAction::Update { collection } => stepman.update(&collection)?,
        StepAction::Info { source, format } => {
            let step_source = match (&source.step_yml, &source.collection) {
                (Some(step_yml), _) => StepSource::Local { step_yml },
                (None, Some(collection)) => StepSource::Library {
                    collection,
                    id: source.id.as_deref().unwrap_or_default(),
                    version: source.version.as_deref().unwrap_or_default(),
                },
                (None, None) => return Err(anyhow!("Either --collection or --step-yml is required")),
            };
            print!("{}", stepman.step_info(step_source, format.into())?);
        }
        StepAction::List { collection, format } => {
            print!("{}", stepman.step_list(&collection, format.into())?);
        }
        StepAction::Share { action } => match action {
            None => stepman.share()?,
            Some(ShareAction::Audit) => stepman.share_audit()?,
            Some(ShareAction::Start { collection }) => stepman.share_start(&collection)?,
            Some(ShareAction::Create { tag, git, stepid }) => {
                stepman.share_create(&tag, &git, &stepid)?
            }
            Some(ShareAction::Finish) => stepman.share_finish()?,
        },
    }
    Ok(())
}

/// Returns the exit code to leave with for `env run`.
fn run_env_action(envman: &Envman<ProcessRunner>, action: EnvAction) -> Result<Option<i32>> {
    match action {
        EnvAction::Init { path: None } => envman.init()?,
        EnvAction::Init { path: Some(path) } => envman.init_at_path(&path)?,
        EnvAction::Add {
            path,
            key,
            value,
            no_expand,
            skip_if_empty,
        } => {
            let value = match value {
                Some(value) => value,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Could not read value from stdin")?;
                    buf
                }
            };
            let options = AddOptions {
                expand: !no_expand,
                skip_if_empty,
            };
            envman.add(&path, &key, &value, options)?;
        }
        EnvAction::Clear { path } => envman.clear(&path)?,
        EnvAction::Run {
            path,
            workdir,
            command,
        } => {
            let workdir = match workdir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let code = envman.run(&path, &workdir, &command)?;
            tracing::debug!("Command exited with {}", code);
            return Ok(Some(code));
        }
        EnvAction::Print { path } => {
            print!("{}", envman.print_json(&path)?);
        }
    }
    Ok(None)
}

fn parse_key_value(args: &[String]) -> Result<(String, String)> {
    match args {
        [pair] => pair
            .split_once('=')
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .ok_or_else(|| anyhow!("Invalid format. Use 'key=value' or 'key value'.")),
        [key, value] => Ok((key.clone(), value.clone())),
        _ => Err(anyhow!("Invalid format. Use 'key=value' or 'key value'.")),
    }
}

fn render_settings(settings: &ToolshedSettings, format: &str) -> Result<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(settings)?),
        "yaml" => Ok(serde_yaml::to_string(settings)?),
        other => Err(anyhow!("Unsupported format '{}'. Use json or yaml.", other)),
    }
}
