use log::{info, warn};
use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    logging::RequestId,
    model::{
        api::{
            admin::AdminCredentials,
            auth::{AuthToken, User, AUTH_TOKEN_COOKIE},
            voter::{VoterCredentials, VoterRegistration},
        },
        db::{
            admin::Admin,
            voter::{NewVoter, Voter},
        },
        mongodb::{is_duplicate_key_error, Coll},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![authenticate, register, login, logout]
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate(
    req_id: &RequestId,
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<()> {
    let with_username = doc! {
        "username": &credentials.username
    };

    let admin = admins
        .find_one(with_username, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            warn!("{req_id} admin login failed for '{}'", credentials.username);
            Error::Status(Status::Unauthorized, Admin::LOGIN_FAILED.to_string())
        })?;

    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config)?);
    info!("{req_id} {} logged in: {}", Admin::RIGHTS, admin.login_name());

    Ok(())
}

#[post("/auth/voter/register", data = "<registration>", format = "json")]
pub async fn register(
    req_id: &RequestId,
    registration: Json<VoterRegistration>,
    new_voters: Coll<NewVoter>,
    config: &State<Config>,
) -> Result<()> {
    if let Err(problems) = registration.problems() {
        warn!("{req_id} voter registration failed validation");
        return Err(Error::bad_request(problems.join(" ")));
    }

    let email = registration.email.clone();
    let voter = NewVoter::new(registration.0, config);
    // The unique email index settles concurrent registrations.
    match new_voters.insert_one(&voter, None).await {
        Ok(_) => {
            info!("{req_id} new voter registered: {email}");
            Ok(())
        }
        Err(err) if is_duplicate_key_error(&err) => {
            warn!("{req_id} voter registration failed, email in use");
            Err(Error::bad_request(
                "A voter with this email address already exists.",
            ))
        }
        Err(err) => Err(err.into()),
    }
}

#[post("/auth/voter/login", data = "<credentials>", format = "json")]
pub async fn login(
    req_id: &RequestId,
    cookies: &CookieJar<'_>,
    credentials: Json<VoterCredentials>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<()> {
    let with_email = doc! {
        "email": &credentials.email
    };

    let voter = voters
        .find_one(with_email, None)
        .await?
        .filter(|voter| voter.verify_password(&credentials.password))
        .ok_or_else(|| {
            warn!("{req_id} login failed with provided credentials");
            Error::Status(Status::Unauthorized, Voter::LOGIN_FAILED.to_string())
        })?;

    let token = AuthToken::new(&voter);
    cookies.add(token.into_cookie(config)?);
    info!("{req_id} {} logged in: {}", Voter::RIGHTS, voter.login_name());

    Ok(())
}

#[delete("/auth")]
pub fn logout(req_id: &RequestId, cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    info!("{req_id} logged out");
    Status::Ok
}
