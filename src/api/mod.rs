use rocket::Route;

mod proposal;
mod vote;
mod wallet;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(proposal::routes());
    routes.extend(vote::routes());
    routes.extend(wallet::routes());
    routes
}
