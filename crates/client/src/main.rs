//! Headless dungeon simulator.
//!
//! Boots the runtime with in-memory characters and the bundled catalog,
//! then plays a scripted shared-instance run. Events go to stdout as JSON
//! lines, logs go to stderr and a log file.
//!
//! Configuration comes from the environment (a `.env` file is honored):
//! the `DUNGEON_*` runtime knobs, plus `DUNGEON_CATALOG_DIR` to load
//! `catalog.ron` from a directory instead of the bundled one.
//!
//! ```bash
//! DUNGEON_ROUND_DELAY_MS=0 DUNGEON_STEP_DELAY_MS=0 cargo run -p dungeon-client
//! ```

mod logging;
mod scenario;

use std::sync::Arc;

use anyhow::Result;
use game_content::ContentFactory;
use game_core::CatalogOracle;
use runtime::RuntimeConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = logging::setup_logging(&logging::log_directory())?;

    let config = RuntimeConfig::from_env();
    tracing::info!(
        round_delay_ms = config.round_delay.as_millis() as u64,
        step_delay_ms = config.step_delay.as_millis() as u64,
        history = ?config.history_dir,
        "Starting simulator"
    );

    let catalog = match std::env::var_os("DUNGEON_CATALOG_DIR") {
        Some(dir) => ContentFactory::new(dir).load_catalog()?,
        None => ContentFactory::bundled()?,
    };
    tracing::info!(
        skills = catalog.skill_count(),
        monsters = catalog.monster_count(),
        dungeons = ?catalog.dungeon_ids(),
        "Catalog loaded"
    );
    let catalog: Arc<dyn CatalogOracle> = Arc::new(catalog);

    scenario::run(config, catalog).await?;

    tracing::info!("Simulator finished");
    Ok(())
}
