//! Access log. Each request gets one line on arrival and one on departure,
//! tied together by a sequence number and tagged with the session user.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::Level;
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Method, Status, StatusClass},
    Data, Orbit, Request, Response, Rocket, Route,
};

use crate::config::Config;
use crate::model::auth::{SessionUser, SESSION_COOKIE};

/// What the logger keeps about a request between its two lines.
#[derive(Debug, Clone)]
pub struct RequestTrace {
    pub seq: u64,
    /// Who sent it, when the session cookie is valid.
    pub user: Option<u32>,
    received: Instant,
}

impl RequestTrace {
    fn begin(user: Option<u32>) -> Self {
        static SEQ: AtomicU64 = AtomicU64::new(1);
        Self {
            seq: SEQ.fetch_add(1, Ordering::Relaxed),
            user,
            received: Instant::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.received.elapsed()
    }

    fn who(&self) -> String {
        match self.user {
            Some(id) => format!("user {id}"),
            None => "anonymous".to_string(),
        }
    }

    fn arrival(&self, method: Method, uri: impl std::fmt::Display) -> String {
        format!("#{} {} -> {method} {uri}", self.seq, self.who())
    }

    fn departure(&self, status: Status, route: Option<&Route>, elapsed: Duration) -> String {
        let handler = route
            .and_then(|r| r.name.as_deref())
            .unwrap_or("no route");
        format!(
            "#{} {} <- {status} from {handler} in {}ms",
            self.seq,
            self.who(),
            elapsed.as_millis()
        )
    }
}

/// Failures we caused are errors. Rejected requests are worth a warning,
/// except a missing session, which browsers send routinely.
fn level_for(status: Status) -> Level {
    match status.class() {
        StatusClass::ServerError => Level::Error,
        StatusClass::ClientError if status == Status::Unauthorized => Level::Info,
        StatusClass::ClientError => Level::Warn,
        _ => Level::Info,
    }
}

fn session_user(req: &Request<'_>) -> Option<u32> {
    let cookie = req.cookies().get_private(SESSION_COOKIE)?;
    SessionUser::from_cookie(&cookie).ok().map(|user| user.id)
}

#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Access log",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        let scheme = if config.tls_enabled() { "https" } else { "http" };
        info!("Listening on {scheme}://{}:{}", config.address, config.port);
        if let Some(voting) = rocket.state::<Config>() {
            info!(
                "Relaying votes for program {} through {}",
                voting.program_id(),
                voting.rpc_url()
            );
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let user = session_user(req);
        let trace = req.local_cache(|| RequestTrace::begin(user));
        info!("{}", trace.arrival(req.method(), req.uri()));
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let trace = req.local_cache(|| RequestTrace::begin(None));
        let status = res.status();
        log!(
            level_for(status),
            "{}",
            trace.departure(status, req.route(), trace.elapsed())
        );
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutting down, finishing in-flight requests");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::local::asynchronous::Client;

    #[get("/ping")]
    fn ping() -> &'static str {
        "pong"
    }

    #[test]
    fn sequence_numbers_increase() {
        let first = RequestTrace::begin(None);
        let second = RequestTrace::begin(Some(42));
        assert!(second.seq > first.seq);
    }

    #[test]
    fn lines_name_the_user() {
        let trace = RequestTrace {
            seq: 7,
            user: Some(42),
            received: Instant::now(),
        };
        assert_eq!(
            trace.arrival(Method::Post, "/votes/3"),
            "#7 user 42 -> POST /votes/3"
        );

        let anonymous = RequestTrace { user: None, ..trace };
        assert_eq!(
            anonymous.departure(Status::NotFound, None, Duration::from_millis(12)),
            "#7 anonymous <- 404 Not Found from no route in 12ms"
        );
    }

    #[test]
    fn departure_names_the_handler() {
        let trace = RequestTrace::begin(Some(1));
        let routes = routes![ping];
        let line = trace.departure(Status::Ok, routes.first(), Duration::from_millis(3));
        assert!(line.ends_with("<- 200 OK from ping in 3ms"), "{line}");
    }

    #[test]
    fn levels() {
        assert_eq!(level_for(Status::Ok), Level::Info);
        assert_eq!(level_for(Status::Unauthorized), Level::Info);
        assert_eq!(level_for(Status::Conflict), Level::Warn);
        assert_eq!(level_for(Status::InternalServerError), Level::Error);
    }

    #[rocket::async_test]
    async fn fairing_passes_responses_through() {
        log4rs_test_utils::test_logging::init_logging_once_for(
            ["signedvoting_backend"],
            None,
            None,
        );
        let rocket = rocket::build()
            .attach(LoggerFairing)
            .mount("/", routes![ping]);
        let client = Client::untracked(rocket).await.unwrap();

        let response = client.get("/ping").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.as_deref(), Some("pong"));
        assert_eq!(client.get("/nowhere").dispatch().await.status(), Status::NotFound);
    }
}
