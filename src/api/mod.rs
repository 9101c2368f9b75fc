use rocket::Route;

mod admin;
mod auth;
mod common;
mod report;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(report::routes());
    routes.extend(voter::routes());
    routes
}
