pub mod config;
pub mod errors;
pub mod gazetteer;
pub mod keywords;
pub mod normalize;
pub mod overrides;
pub mod report;
pub mod resolver;
pub mod scoring;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::ResolverConfig;
pub use errors::{AppError, AppResult};
pub use gazetteer::{Gazetteer, GazetteerEntry, GazetteerRecord};
pub use keywords::KeywordTable;
pub use normalize::normalize;
pub use overrides::OverrideTable;
pub use report::ResolutionReport;
pub use resolver::{Coordinates, LocalityQuery, MatchSource, Resolver};

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,comune_geocoder=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
