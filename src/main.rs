use anyhow::Context;
use rewear::auth::TokenIssuer;
use rewear::config::Settings;
use rewear::http::{self, AppState};
use rewear::service::MarketService;
use rewear::store::Store;
use rewear::telemetry;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    telemetry::init(&settings.log_level, settings.log_json)?;

    if settings.uses_dev_secret() {
        warn!("REWEAR_JWT_SECRET is not set; using the development signing key");
    }

    let store = Store::open(&settings.db_path)
        .with_context(|| format!("failed to open database at {}", settings.db_path))?;
    info!(db_path = %settings.db_path, "database opened");

    let service = MarketService::with_store(store.clone());
    if let Some(username) = settings.admin_username.as_deref() {
        match service.promote_admin(username)? {
            Some(account) => info!(account_id = %account.id, %username, "admin account ready"),
            None => warn!(%username, "configured admin account does not exist yet"),
        }
    }

    let tokens = TokenIssuer::new(&settings.jwt_secret, settings.token_ttl_hours)
        .context("REWEAR_TOKEN_TTL_HOURS is out of range")?;
    let state = AppState::new(service, tokens, settings.default_page_size);

    http::serve(state, &settings.bind_addr)
        .await
        .with_context(|| format!("server on {} stopped", settings.bind_addr))?;

    store.flush()?;
    Ok(())
}
