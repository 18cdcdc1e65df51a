use anyhow::{Context, bail};
use axum::Router;
use futures::StreamExt;
use scholarsynth::{
    AppState, SynthConfig, api,
    cli::{Cli, Commands, output::Output},
    research::{Stage, Task, progress},
    utils::toml_config::{LogFormat, ServerConfig},
};
use std::process::ExitCode;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let command = cli.command.unwrap_or(Commands::Serve);

    if let Commands::Config { validate } = command {
        return Ok(show_config(&cli.config, validate, &output));
    }

    let config = SynthConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.server, cli.verbose);

    match command {
        Commands::Research { query } => run_research(config, &query, &output).await,
        _ => {
            serve(config, &output).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(server: &ServerConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "scholarsynth={level},scholarsynth_server={level},tower_http={level}",
                level = server.log_level
            ))
        })
    };

    let registry = tracing_subscriber::registry().with(filter);
    match server.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: SynthConfig, output: &Output) -> anyhow::Result<()> {
    output.banner();

    let cors = api::routes::cors_layer(&config.server)?;
    let addr = config.bind_address();
    let state = AppState::from_config(config).context("Failed to initialise research stages")?;

    let app: Router = api::routes::create_router().with_state(state.clone());

    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    let app = app.layer(cors).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.success(&format!("Listening on http://{}", addr));
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let in_flight = state.coordinator.in_flight();
    if in_flight > 0 {
        tracing::info!("Cancelling {} in-flight research tasks", in_flight);
    }
    state.coordinator.cancel_all();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn run_research(config: SynthConfig, query: &str, output: &Output) -> anyhow::Result<ExitCode> {
    let state = AppState::from_config(config).context("Failed to initialise research stages")?;
    let coordinator = state.coordinator;

    let id = coordinator.create(query)?;
    output.info(&format!("Research task {} started", id));

    let mut updates = coordinator.subscribe(&id)?.into_stream();
    let mut last_shown: Option<(u8, String)> = None;
    let mut last: Option<Task> = None;

    while let Some(snapshot) = updates.next().await {
        let view = progress::project(&snapshot);
        let key = (view.progress_percentage, view.current_step.clone());
        if last_shown.as_ref() != Some(&key) {
            output.progress(&view);
            last_shown = Some(key);
        }
        last = Some(snapshot);
    }

    let Some(task) = last else {
        bail!("Research task {} ended without a result", id);
    };

    let completed = task.completed_count();
    let planned = task.sub_questions.len();
    match (task.stage, task.report) {
        (Stage::Done, Some(report)) => {
            output.success(&format!(
                "Report complete from {} of {} sub-questions",
                completed, planned
            ));
            output.report(&report.title, &report.content, report.word_count);
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            output.error(task.error.as_deref().unwrap_or("Research did not complete"));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn show_config(path: &Option<std::path::PathBuf>, validate: bool, output: &Output) -> ExitCode {
    let config = match SynthConfig::load_or_default(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    if validate {
        output.success("Configuration is valid");
        return ExitCode::SUCCESS;
    }

    output.header("Server");
    output.kv("address", &config.bind_address());
    output.kv("log_level", &config.server.log_level);
    output.kv("log_format", &format!("{:?}", config.server.log_format).to_lowercase());
    if config.server.allowed_origins.is_empty() {
        output.kv("allowed_origins", "*");
    } else {
        for origin in &config.server.allowed_origins {
            output.list_item(origin);
        }
    }

    output.header("Research");
    output.kv("max_concurrent_research", &config.research.max_concurrent_research.to_string());
    output.kv("notification_buffer", &config.research.notification_buffer.to_string());
    output.kv("max_sub_questions", &config.research.max_sub_questions.to_string());
    output.kv("sources_per_question", &config.research.sources_per_question.to_string());

    output.header("LLM");
    output.kv("provider", &format!("{:?}", config.llm.provider).to_lowercase());
    output.kv("base_url", &config.llm.base_url);
    output.kv("model", &config.llm.model);
    output.kv("api_key_env", &config.llm.api_key_env);
    output.kv("temperature", &config.llm.temperature.to_string());
    output.kv("max_tokens", &config.llm.max_tokens.to_string());
    output.kv("request_timeout_secs", &config.llm.request_timeout_secs.to_string());
    output.kv("max_retries", &config.llm.max_retries.to_string());

    output.hint("API keys are read from the environment and never printed");
    ExitCode::SUCCESS
}
