use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use toolshed::StepInfoFormat;

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // If there's a git tag at HEAD, use just the tag (release build)
    if let Some(tag) = option_env!("TOOLSHED_GIT_TAG") {
        return tag;
    }

    // Not on a tag - include commit hash and branch (dev build)
    let commit = option_env!("TOOLSHED_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("TOOLSHED_GIT_BRANCH").unwrap_or("unknown");

    // Leaked once at startup so clap can hold a &'static str
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "toolshed")]
#[command(about = "Installs pipeline helper tools and drives stepman/envman")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a tool binary into the tools directory
    Install {
        #[command(subcommand)]
        source: InstallSource,
    },

    /// Print the OS and architecture names used for release assets
    Platform,

    /// Call the stepman step manager
    Step {
        #[command(subcommand)]
        action: StepAction,
    },

    /// Call the envman environment manager
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },

    /// Manage toolshed's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum InstallSource {
    /// Install `<tool>-<OS>-<ARCH>` from a GitHub release
    #[command(after_help = "Example:\n  toolshed install github envman bitrise-io 1.1.0")]
    Github {
        /// Repository name, also used as the binary name
        tool: String,
        /// GitHub user or organisation
        publisher: String,
        /// Release tag
        tag: String,
    },
    /// Install a binary from an arbitrary URL
    Url {
        /// Name of the installed binary
        name: String,
        url: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    Raw,
    Json,
}

impl From<FormatArg> for StepInfoFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Raw => StepInfoFormat::Raw,
            FormatArg::Json => StepInfoFormat::Json,
        }
    }
}

#[derive(Subcommand)]
pub enum StepAction {
    /// Set up a step collection
    Setup {
        #[arg(long)]
        collection: String,
    },
    /// Copy a step's source and step.yml to local paths
    #[command(disable_version_flag = true)]
    Activate {
        #[arg(long)]
        collection: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        version: String,
        /// Where the step's source is copied
        #[arg(long)]
        path: PathBuf,
        /// Where the step's step.yml is copied
        #[arg(long)]
        copyyml: PathBuf,
    },
    /// Update a step collection
    Update {
        #[arg(long)]
        collection: String,
    },
    /// Show information about a library or local step
    #[command(disable_version_flag = true)]
    Info {
        #[command(flatten)]
        source: StepSourceArgs,
        #[arg(long, value_enum, default_value = "raw")]
        format: FormatArg,
    },
    /// List the steps of a collection
    List {
        #[arg(long)]
        collection: String,
        #[arg(long, value_enum, default_value = "raw")]
        format: FormatArg,
    },
    /// Share a step to a collection
    Share {
        #[command(subcommand)]
        action: Option<ShareAction>,
    },
}

#[derive(Args)]
pub struct StepSourceArgs {
    #[arg(long, required_unless_present = "step_yml", requires_all = ["id", "version"])]
    pub collection: Option<String>,
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub version: Option<String>,
    /// Path of a local step.yml
    #[arg(long, conflicts_with_all = ["collection", "id", "version"])]
    pub step_yml: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ShareAction {
    Audit,
    Start {
        #[arg(long)]
        collection: String,
    },
    Create {
        #[arg(long)]
        tag: String,
        #[arg(long)]
        git: String,
        #[arg(long)]
        stepid: String,
    },
    Finish,
}

#[derive(Subcommand)]
pub enum EnvAction {
    /// Initialize an envstore (at --path, cleared, when given)
    Init {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Append a variable; the value is read from stdin unless --value is given
    Add {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        no_expand: bool,
        #[arg(long)]
        skip_if_empty: bool,
    },
    /// Remove every variable from an envstore
    Clear {
        #[arg(long)]
        path: PathBuf,
    },
    /// Run a command with the envstore applied and exit with its code
    #[command(after_help = "Example:\n  toolshed env run --path .envstore.yml -- bash ./build.sh")]
    Run {
        #[arg(long)]
        path: PathBuf,
        /// Working directory of the command (defaults to the current one)
        #[arg(long)]
        workdir: Option<PathBuf>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// Print the envstore as JSON
    Print {
        #[arg(long)]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'tools-dir=/opt/tools' or 'tools-dir /opt/tools')
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Reset a configuration setting to its default
    Unset {
        /// Key to unset (e.g., 'stepman-bin')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
