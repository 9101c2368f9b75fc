#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

/// Assemble the server: routes, config, database connection and request logging.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
}

/// Connect to the database named in the test profile's `db_uri`.
#[cfg(test)]
async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` must be set for database tests");
    mongodb::Client::with_uri_str(&db_uri).await.unwrap()
}

/// A fresh database name for one test.
#[cfg(test)]
fn database() -> String {
    config::get_database_name()
}

/// A server using the given client and database rather than the one
/// `DatabaseFairing` would connect to.
#[cfg(test)]
async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db_config: config::DbConfig = rocket::Config::figment().extract().unwrap();
    config::prepare_database(&client, db_name, &db_config)
        .await
        .unwrap();
    let db = client.database(db_name);
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .manage(client)
        .manage(db)
}
