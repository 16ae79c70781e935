//=============================================
// File: logging.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tracing setup shared by bridge embedders and tests
// Objective: Offer one subscriber configuration with a component label
//=============================================

use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Initialize tracing with a component label. Later calls only log.
pub fn init(component: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_test_writer()
            .compact()
            .try_init();
    });
    tracing::info!(component, "tracing initialised");
}

//=============================================
// End of file
//=============================================
