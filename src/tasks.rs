use rocket::fairing::{Fairing, Info, Kind};
use rocket::tokio;
use rocket::{Orbit, Rocket};
use std::time::Duration;

use crate::auth::SessionRegistry;
use crate::rate_limit::{RateLimiter, LOGIN_WINDOW};

/// How often the in-memory sweeps run.
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

pub struct BackgroundTasks;

#[rocket::async_trait]
impl Fairing for BackgroundTasks {
    fn info(&self) -> Info {
        Info {
            name: "Background Tasks",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        // Session cleanup task
        if let Some(registry) = rocket.state::<SessionRegistry>().cloned() {
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(SWEEP_INTERVAL).await;
                    let count = registry.cleanup_expired();
                    if count > 0 {
                        log::info!("[task] Cleaned up {} expired sessions", count);
                    }
                }
            });
        } else {
            log::warn!("[task] No session registry managed; session cleanup disabled");
        }

        // Rate limiter cleanup task
        if let Some(limiter) = rocket.state::<RateLimiter>().cloned() {
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(SWEEP_INTERVAL).await;
                    limiter.cleanup(LOGIN_WINDOW);
                }
            });
        }
    }
}
