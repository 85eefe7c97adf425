// ABOUTME: Entry point for the strata CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, OutputFormat};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use strata::config::{self, Config, MonitorStrategy};
use strata::delta::{IndexStore, TagIndexStore};
use strata::deploy::Orchestrator;
use strata::error::{Error, Result};
use strata::gateway::{HttpStackGateway, StackRepository};
use strata::notify::HttpQueueSource;
use strata::output::{Output, OutputMode};
use strata::types::ProjectEnv;
use strata::watch::{NotificationWaiter, PollingWaiter, StatusWaiter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = match cli.output {
        OutputFormat::Normal => OutputMode::Normal,
        OutputFormat::Quiet => OutputMode::Quiet,
        OutputFormat::Json => OutputMode::Json,
    };
    let mut output = Output::new(mode);

    if let Err(e) = run(cli, &mut output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

/// What a deployment-shaped subcommand does once the components are wired.
enum Action {
    Apply,
    Rollback,
    StepBack,
}

/// Everything resolved from config + CLI for one target environment.
struct Target {
    config: Config,
    scope: ProjectEnv,
    build: Option<u32>,
    comment: Option<String>,
    dir: PathBuf,
}

impl Target {
    fn resolve(
        env: &str,
        build: Option<u32>,
        comment: Option<String>,
        dir: Option<PathBuf>,
    ) -> Result<Self> {
        let cwd = env::current_dir()?;
        let config = Config::discover(&cwd)?.for_environment(env);
        let scope = ProjectEnv::new(&config.project, env);
        let comment = comment.or_else(|| config.comment.clone());
        let dir = dir.unwrap_or_else(|| config.template_dir.clone());
        Ok(Self {
            config,
            scope,
            build,
            comment,
            dir,
        })
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    match cli.command {
        Commands::Init { project, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, project.as_deref(), force)
        }
        Commands::Apply {
            env,
            build,
            comment,
            dir,
        } => {
            let target = Target::resolve(&env, build, comment, dir)?;
            run_deployment(&target, Action::Apply, output).await
        }
        Commands::Rollback { env, build, dir } => {
            let target = Target::resolve(&env, build, None, dir)?;
            run_deployment(&target, Action::Rollback, output).await
        }
        Commands::StepBack { env, build, dir } => {
            let target = Target::resolve(&env, build, None, dir)?;
            run_deployment(&target, Action::StepBack, output).await
        }
        Commands::ResetIndex { env } => {
            let target = Target::resolve(&env, None, None, None)?;
            let store = TagIndexStore::new(HttpStackGateway::new(target.config.api.connection()?));
            store.reset(&target.scope).await?;
            output.success(&format!("Watermark for {} reset to 0", target.scope));
            Ok(())
        }
        Commands::Status { env } => {
            let target = Target::resolve(&env, None, None, None)?;
            status(&target, output).await
        }
    }
}

async fn run_deployment(target: &Target, action: Action, output: &mut Output) -> Result<()> {
    let connection = target.config.api.connection()?;
    let repository = StackRepository::new(HttpStackGateway::new(connection.clone()));
    let index_store = TagIndexStore::new(HttpStackGateway::new(connection));

    // The waiter strategy is fixed here, once, for the whole run. The
    // source outlives the waiter borrowing it, hence the declaration order.
    let polling;
    let source;
    let notification;
    let waiter: &dyn StatusWaiter = match target.config.monitor {
        MonitorStrategy::Polling => {
            polling = PollingWaiter::new(repository.gateway(), target.config.poll.into());
            &polling
        }
        MonitorStrategy::Notifications => {
            let settings = target.config.queue.as_ref().ok_or_else(|| {
                Error::InvalidConfig(
                    "monitor 'notifications' requires a queue section".to_string(),
                )
            })?;
            source = HttpQueueSource::new(settings.connection()?);
            source.subscribe().await?;
            notification = NotificationWaiter::new(&source, repository.gateway());
            &notification
        }
    };

    let mut orchestrator =
        Orchestrator::new(&repository, waiter, &index_store, target.scope.clone())
            .with_build(target.build)
            .with_comment(target.comment.clone());

    output.start_timer();
    match action {
        Action::Apply => {
            output.progress(&format!(
                "Applying templates from {} to {}",
                target.dir.display(),
                target.scope
            ));
            let applied = orchestrator.apply_outstanding(&target.dir).await?;
            let names: Vec<String> = applied.iter().map(|i| i.name().to_string()).collect();
            output.stacks("applied", &names);
            output.success(&format!("Applied {} template(s)", applied.len()));
        }
        Action::Rollback => {
            output.progress(&format!("Rolling back {}", target.scope));
            let deleted = orchestrator.rollback(&target.dir).await?;
            let names: Vec<String> = deleted.iter().map(|n| n.to_string()).collect();
            output.stacks("deleted", &names);
            output.success(&format!("Deleted {} stack(s)", deleted.len()));
        }
        Action::StepBack => {
            output.progress(&format!("Stepping back {}", target.scope));
            let deleted = orchestrator.step_back(&target.dir).await?;
            let names: Vec<String> = deleted.iter().map(|n| n.to_string()).collect();
            output.stacks("deleted", &names);
            output.success("Stepped back one template");
        }
    }

    for warning in orchestrator.diagnostics().warnings() {
        output.progress(&format!("warning: {}", warning.message));
    }

    Ok(())
}

async fn status(target: &Target, output: &mut Output) -> Result<()> {
    let connection = target.config.api.connection()?;
    let repository = StackRepository::new(HttpStackGateway::new(connection.clone()));
    let index_store = TagIndexStore::new(HttpStackGateway::new(connection));
    let polling = PollingWaiter::new(repository.gateway(), target.config.poll.into());

    let orchestrator =
        Orchestrator::new(&repository, &polling, &index_store, target.scope.clone());
    let status = orchestrator.status().await?;

    output.success(&format!(
        "{}: watermark {}, {} stack(s)",
        target.scope,
        status.watermark,
        status.stacks.len()
    ));
    let lines: Vec<String> = status
        .stacks
        .iter()
        .map(|d| format!("{} {}", d.identity.name(), d.status))
        .collect();
    output.stacks("stack", &lines);
    Ok(())
}
