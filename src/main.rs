use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terraform_assistant::AssistError;
use terraform_assistant::config::CliOverrides;
use terraform_assistant::workflow::ProvisionPlan;

#[derive(Parser)]
#[command(name = "terraform-assistant")]
#[command(
    version,
    about = "Generate Terraform configuration from natural language with OpenAI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Args)]
struct OverrideArgs {
    #[arg(long, global = true, help = "Model (OpenAI) or deployment (Azure) name")]
    deployment_name: Option<String>,

    #[arg(long = "openai-api-key", global = true, help = "OpenAI or Azure OpenAI API key")]
    api_key: Option<String>,

    #[arg(long = "azure-openai-endpoint", global = true, help = "Azure OpenAI endpoint; switches to the Azure backend")]
    azure_endpoint: Option<String>,

    #[arg(long, global = true, help = "Ask before applying each draft (true/false)")]
    require_confirmation: Option<bool>,

    #[arg(long, global = true, help = "Sampling temperature (0.0-1.0)")]
    temperature: Option<f32>,

    #[arg(long, global = true, allow_negative_numbers = true, help = "Override the model's max tokens (0 = table value)")]
    max_tokens: Option<i64>,

    #[arg(long, global = true, help = "Directory terraform runs in")]
    working_dir: Option<PathBuf>,

    #[arg(long = "exec-dir", global = true, help = "Terraform executable or the directory containing it")]
    exec_path: Option<PathBuf>,
}

impl From<OverrideArgs> for CliOverrides {
    fn from(args: OverrideArgs) -> Self {
        CliOverrides {
            deployment_name: args.deployment_name,
            api_key: args.api_key,
            azure_endpoint: args.azure_endpoint,
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            require_confirmation: args.require_confirmation,
            working_dir: args.working_dir,
            exec_path: args.exec_path,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a template, write it and run terraform init
    Init {
        #[arg(required = true, help = "What to provision, in plain words")]
        prompt: Vec<String>,
    },

    /// Same as init, then run terraform apply
    Apply {
        #[arg(required = true, help = "What to provision, in plain words")]
        prompt: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json, yaml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mterraform-assistant encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AssistError>() {
                Some(err) => eprintln!("\x1b[31mError [{}]:\x1b[0m {}", err.category(), err),
                None => eprintln!("\x1b[31mError:\x1b[0m {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Interactive output goes to stdout; keep logs quiet unless asked
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let overrides = CliOverrides::from(cli.overrides);

    match cli.command {
        Commands::Init { prompt } => generate(prompt, ProvisionPlan::Init, overrides)?,
        Commands::Apply { prompt } => generate(prompt, ProvisionPlan::Apply, overrides)?,
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                terraform_assistant::cli::commands::config::show(&overrides, &format)?;
            }
            ConfigAction::Path => {
                terraform_assistant::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                terraform_assistant::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}

fn generate(prompt: Vec<String>, plan: ProvisionPlan, overrides: CliOverrides) -> anyhow::Result<()> {
    use terraform_assistant::cli::commands::generate::{self, GenerateOptions};

    let rt = Runtime::new()?;
    let outcome = rt.block_on(generate::run(GenerateOptions {
        prompt,
        plan,
        overrides,
    }));
    // A prompt blocked on stdin would otherwise keep the runtime alive
    rt.shutdown_timeout(Duration::from_millis(100));

    // A user abort is a normal exit
    outcome?;
    Ok(())
}
