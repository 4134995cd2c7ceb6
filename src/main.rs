#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use fronius_rs::model::SensorValue;
use fronius_rs::scheduler::Poller;
use fronius_rs::settings;
use fronius_rs::store::StateStore;
use rocket::serde::json::Json;
use rocket::{Build, Rocket, State};
use std::sync::Arc;

mod metrics;

/// Structure containing state for API handlers.
pub struct StateData {
    poller: Arc<Poller>,
    store: Arc<StateStore>,
}

#[get("/metrics")]
async fn metrics_route(state: &State<StateData>) -> Result<String, fronius_rs::Error> {
    /* Each fetcher is throttled, so a scrape between timer ticks reuses cached data */
    state.poller.run_cycle().await;
    metrics::read()
}

#[get("/sensors")]
fn sensors_route(state: &State<StateData>) -> Json<Vec<SensorValue>> {
    Json(state.store.snapshot())
}

fn rocket(state: StateData) -> Rocket<Build> {
    rocket::build()
        .manage(state)
        .mount("/", routes![metrics_route, sensors_route])
}

#[rocket::main]
async fn main() {
    env_logger::init();

    let settings = match settings::read_settings() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Configuration error: {:?}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(StateStore::new());
    let mut poller = match fronius_rs::poller(&settings) {
        Ok(poller) => poller,
        Err(e) => {
            log::error!("Unable to set up inverter polling: {:?}", e);
            std::process::exit(1);
        }
    };
    poller.add_publisher(store.clone());
    poller.add_publisher(Arc::new(metrics::PrometheusPublisher));

    let poller = Arc::new(poller);
    log::info!(
        "Polling {} every {:?} for {} sensors",
        settings.host,
        settings.interval,
        poller.sensors().count()
    );
    tokio::spawn(poller.clone().run(settings.interval));

    if let Err(e) = rocket(StateData { poller, store }).launch().await {
        log::error!("Server error: {}", e);
    }
}
