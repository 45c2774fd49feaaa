//src/main.rs

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use battery_billing::{
    config::{AppConfig, AppState},
    db::MIGRATOR,
    handlers,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Configuração inválida impede a aplicação de iniciar
    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config).await?;

    MIGRATOR
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let batch_routes = Router::new()
        .route("/", post(handlers::batches::create_batch).get(handlers::batches::list_batches))
        .route("/{id}", get(handlers::batches::get_batch))
        .route("/{id}/validate", post(handlers::batches::validate_batch));

    let invoice_routes = Router::new()
        .route("/", get(handlers::invoices::list_invoices))
        .route("/{id}", get(handlers::invoices::get_invoice))
        .route("/{id}/pdf", get(handlers::invoices::download_invoice_pdf));

    let billing_routes = Router::new()
        .route(
            "/profile",
            get(handlers::billing::get_profile).put(handlers::billing::update_profile),
        )
        .route(
            "/settings",
            get(handlers::billing::get_settings).put(handlers::billing::update_settings),
        );

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/rates", get(handlers::rates::list_rates))
        .nest("/api/batches", batch_routes)
        .nest("/api/invoices", invoice_routes)
        .nest("/api/billing", billing_routes)
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;

    Ok(())
}
