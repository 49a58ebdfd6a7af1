use std::{process, sync::Arc};

use apalis::{
    layers::WorkerBuilderExt,
    prelude::{Monitor, WorkerBuilder, WorkerFactoryFn},
};
use apalis_cron::CronStream;
use apalis_sql::{Config as ApalisSqlConfig, postgres::PostgresStorage};
use confero::{
    application::announcements::AnnouncementService,
    application::conferences::ConferenceService,
    application::error::AppError,
    application::jobs::{
        JobWorkerContext, RefreshAnnouncementContext, process_confirmation_email_job,
        process_featured_speaker_job, process_refresh_announcement_job,
        refresh_announcement_schedule,
    },
    application::profile::ProfileService,
    application::registration::RegistrationService,
    application::repos::{
        ConferencesRepo, JobsRepo, ProfilesRepo, RegistrationsRepo, SessionsRepo, SpeakersRepo,
    },
    application::sessions::SessionService,
    application::speakers::SpeakerService,
    config,
    domain::types::JobType,
    infra::{
        cache::MemoryCache,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = require_database_url(&settings)?;

    let pool = PostgresRepositories::connect(database_url, 1)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresStorage::setup(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::job_queue(err.to_string())))?;

    info!(target = "confero::migrate", "migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let (http_repositories, job_repositories) = init_repositories(&settings).await?;
    let app = build_application_context(http_repositories, job_repositories);

    let monitor_handle = spawn_job_monitor(
        app.job_context.repositories.clone(),
        app.job_context.clone(),
        app.announcements.clone(),
        &settings.jobs,
    );

    let result = serve_http(&settings, app.api_state).await;

    monitor_handle.abort();
    let _ = monitor_handle.await;

    result
}

fn require_database_url(settings: &config::Settings) -> Result<&str, AppError> {
    settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| AppError::from(InfraError::configuration("database url is not configured")))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<(Arc<PostgresRepositories>, Arc<PostgresRepositories>), AppError> {
    let database_url = require_database_url(settings)?;

    let http_pool =
        PostgresRepositories::connect(database_url, settings.database.http_max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&http_pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresStorage::setup(&http_pool)
        .await
        .map_err(|err| AppError::from(InfraError::job_queue(err.to_string())))?;

    let jobs_pool =
        PostgresRepositories::connect(database_url, settings.database.jobs_max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok((
        Arc::new(PostgresRepositories::new(http_pool)),
        Arc::new(PostgresRepositories::new(jobs_pool)),
    ))
}

struct ApplicationContext {
    api_state: ApiState,
    job_context: JobWorkerContext,
    announcements: Arc<AnnouncementService>,
}

fn build_application_context(
    http_repositories: Arc<PostgresRepositories>,
    job_repositories: Arc<PostgresRepositories>,
) -> ApplicationContext {
    let profiles_repo: Arc<dyn ProfilesRepo> = http_repositories.clone();
    let conferences_repo: Arc<dyn ConferencesRepo> = http_repositories.clone();
    let sessions_repo: Arc<dyn SessionsRepo> = http_repositories.clone();
    let speakers_repo: Arc<dyn SpeakersRepo> = http_repositories.clone();
    let registrations_repo: Arc<dyn RegistrationsRepo> = http_repositories.clone();
    let jobs_repo: Arc<dyn JobsRepo> = http_repositories.clone();

    let cache = Arc::new(MemoryCache::new());

    // The announcement and featured-speaker refreshers run on the jobs
    // pool; HTTP reads only touch the shared cache.
    let jobs_conferences_repo: Arc<dyn ConferencesRepo> = job_repositories.clone();
    let jobs_sessions_repo: Arc<dyn SessionsRepo> = job_repositories.clone();
    let jobs_speakers_repo: Arc<dyn SpeakersRepo> = job_repositories.clone();
    let announcements = Arc::new(AnnouncementService::new(
        jobs_conferences_repo,
        jobs_sessions_repo,
        jobs_speakers_repo,
        cache,
    ));

    let api_state = ApiState {
        profiles: Arc::new(ProfileService::new(profiles_repo.clone())),
        conferences: Arc::new(ConferenceService::new(
            conferences_repo.clone(),
            profiles_repo,
            jobs_repo.clone(),
        )),
        sessions: Arc::new(SessionService::new(
            sessions_repo.clone(),
            conferences_repo,
            speakers_repo.clone(),
            jobs_repo,
        )),
        speakers: Arc::new(SpeakerService::new(speakers_repo, sessions_repo)),
        registrations: Arc::new(RegistrationService::new(registrations_repo)),
        announcements: announcements.clone(),
        db: http_repositories,
    };

    let job_context = JobWorkerContext {
        repositories: job_repositories,
        announcements: announcements.clone(),
    };

    ApplicationContext {
        api_state,
        job_context,
        announcements,
    }
}

fn spawn_job_monitor(
    repositories: Arc<PostgresRepositories>,
    context: JobWorkerContext,
    announcements: Arc<AnnouncementService>,
    jobs: &config::JobsSettings,
) -> tokio::task::JoinHandle<()> {
    let confirmation_storage = PostgresStorage::new_with_config(
        repositories.pool().clone(),
        ApalisSqlConfig::new(JobType::SendConfirmationEmail.as_str()),
    );
    let featured_storage = PostgresStorage::new_with_config(
        repositories.pool().clone(),
        ApalisSqlConfig::new(JobType::UpdateFeaturedSpeaker.as_str()),
    );

    let confirmation_concurrency = jobs.confirmation_email_concurrency.get() as usize;
    let featured_concurrency = jobs.featured_speaker_concurrency.get() as usize;

    let confirmation_worker = WorkerBuilder::new("confirmation-email-worker")
        .concurrency(confirmation_concurrency)
        .data(context.clone())
        .backend(confirmation_storage)
        .build_fn(process_confirmation_email_job);
    let featured_worker = WorkerBuilder::new("featured-speaker-worker")
        .concurrency(featured_concurrency)
        .data(context.clone())
        .backend(featured_storage)
        .build_fn(process_featured_speaker_job);

    // Cron-based announcement refresh worker
    let announcement_ctx = RefreshAnnouncementContext { announcements };
    let announcement_worker = WorkerBuilder::new("announcement-refresh-worker")
        .data(announcement_ctx)
        .backend(CronStream::new(refresh_announcement_schedule()))
        .build_fn(process_refresh_announcement_job);

    let monitor = Monitor::new()
        .register(confirmation_worker)
        .register(featured_worker)
        .register(announcement_worker);

    tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    })
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_api_router(api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "confero::http",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: std::time::Duration) {
    let _ = tokio::signal::ctrl_c().await;
    info!(target = "confero::http", "shutdown signal received, draining connections");

    // In-flight requests get the configured grace period before the
    // process exits regardless.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        error!(target = "confero::http", "graceful shutdown timed out");
        process::exit(1);
    });
}
