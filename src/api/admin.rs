use std::collections::HashSet;

use log::{info, warn};
use mongodb::{bson::doc, options::FindOptions, Client};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    logging::RequestId,
    model::{
        api::{
            admin::AdminCredentials,
            auth::AuthToken,
            candidate::{CandidateDescription, CandidateSpec},
            election::{ElectionDescription, ElectionSpec, ElectionSummary},
            group::{GroupDescription, GroupSpec},
            id::ApiId,
            pagination::{Paginated, PaginationRequest},
            voter::VoterDescription,
        },
        common::election::ElectionId,
        db::{
            admin::{Admin, NewAdmin},
            candidate::{Candidate, NewCandidate},
            election::Election,
            election_candidate::{ElectionCandidate, NewElectionCandidate},
            group::{Group, NewGroup},
            voted_user::VotedUser,
            voter::Voter,
        },
        mongodb::{
            contains_filter, id_array, is_duplicate_key_error, is_write_conflict_error, u32_id_filter,
            Coll, Counter, Id, ELECTION_ID_COUNTER_ID,
        },
    },
};

use super::common::{election_by_id, standing_candidates};

pub fn routes() -> Vec<Route> {
    routes![
        get_admins,
        create_admin,
        delete_admin,
        get_groups,
        create_group,
        get_voters,
        set_voter_groups,
        get_candidates,
        create_candidate,
        get_elections,
        get_election,
        create_election,
        modify_election,
        get_voted,
    ]
}

#[get("/admins")]
async fn get_admins(_token: AuthToken<Admin>, admins: Coll<Admin>) -> Result<Json<Vec<String>>> {
    let options = FindOptions::builder().sort(doc! { "username": 1 }).build();
    let admin_list: Vec<Admin> = admins.find(None, options).await?.try_collect().await?;
    let admin_names = admin_list
        .into_iter()
        .map(|admin| admin.admin.username)
        .collect();
    Ok(Json(admin_names))
}

#[post("/admins", data = "<new_admin>", format = "json")]
async fn create_admin(
    req_id: &RequestId,
    _token: AuthToken<Admin>,
    new_admin: Json<AdminCredentials>,
    admins: Coll<NewAdmin>,
) -> Result<()> {
    let username = new_admin.username.clone();
    let admin: NewAdmin = new_admin
        .0
        .try_into()
        .map_err(|_| Error::bad_request("Illegal admin credentials"))?;

    match admins.insert_one(admin, None).await {
        Ok(_) => {
            info!("{req_id} created admin '{username}'");
            Ok(())
        }
        Err(err) if is_duplicate_key_error(&err) => Err(Error::bad_request(format!(
            "Admin username already in use: {username}"
        ))),
        Err(err) => Err(err.into()),
    }
}

#[delete("/admins/<username>")]
async fn delete_admin(
    req_id: &RequestId,
    _token: AuthToken<Admin>,
    username: &str,
    admins: Coll<Admin>,
) -> Result<()> {
    // Prevent deleting the last admin.
    let count = admins.count_documents(None, None).await?;
    if count == 1 {
        return Err(Error::unprocessable("Cannot delete last admin!"));
    }

    let filter = doc! {
        "username": username,
    };
    let result = admins.delete_one(filter, None).await?;
    if result.deleted_count == 0 {
        Err(Error::not_found(format!("Admin {username}")))
    } else {
        info!("{req_id} deleted admin '{username}'");
        Ok(())
    }
}

#[get("/admin/groups")]
async fn get_groups(
    _token: AuthToken<Admin>,
    groups: Coll<Group>,
) -> Result<Json<Vec<GroupDescription>>> {
    let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let groups = groups
        .find(None, options)
        .await?
        .map_ok(GroupDescription::from)
        .try_collect()
        .await?;
    Ok(Json(groups))
}

#[post("/admin/groups", data = "<spec>", format = "json")]
async fn create_group(
    req_id: &RequestId,
    _token: AuthToken<Admin>,
    spec: Json<GroupSpec>,
    new_groups: Coll<NewGroup>,
) -> Result<Json<GroupDescription>> {
    let group = NewGroup::from(spec.0);
    if group.name.is_empty() {
        return Err(Error::bad_request("Group name must not be empty"));
    }

    let id: Id = match new_groups.insert_one(&group, None).await {
        Ok(result) => inserted_id(result.inserted_id)?,
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::bad_request(format!(
                "Group name already in use: {}",
                group.name
            )))
        }
        Err(err) => return Err(err.into()),
    };
    info!("{req_id} created group '{}'", group.name);

    Ok(Json(GroupDescription::from(Group { id, group })))
}

#[get("/admin/voters?<email>&<pagination..>")]
async fn get_voters(
    _token: AuthToken<Admin>,
    email: Option<&str>,
    pagination: PaginationRequest,
    voters: Coll<Voter>,
) -> Result<Json<Paginated<VoterDescription>>> {
    let filter = email.map(|term| contains_filter("email", term)).unwrap_or_default();

    let options = FindOptions::builder()
        .sort(doc! { "email": 1 })
        .skip(pagination.skip())
        .limit(i64::from(pagination.page_size()))
        .build();
    let page = voters
        .find(filter.clone(), options)
        .await?
        .map_ok(VoterDescription::from)
        .try_collect()
        .await?;
    let total = voters.count_documents(filter, None).await?;

    Ok(Json(pagination.to_paginated(total, page)))
}

/// Replace a voter's group memberships.
#[put("/admin/voters/<voter_id>/groups", data = "<group_ids>", format = "json")]
async fn set_voter_groups(
    req_id: &RequestId,
    _token: AuthToken<Admin>,
    voter_id: Id,
    group_ids: Json<Vec<ApiId>>,
    voters: Coll<Voter>,
    groups: Coll<Group>,
) -> Result<Json<VoterDescription>> {
    let group_ids: HashSet<Id> = group_ids.iter().map(|id| **id).collect();
    ensure_groups_exist(&group_ids, &groups).await?;

    let update = doc! {
        "$set": { "groups": id_array(&group_ids) },
    };
    let result = voters.update_one(voter_id.as_doc(), update, None).await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Voter with ID '{voter_id}'")));
    }
    info!("{req_id} voter {voter_id} now in {} groups", group_ids.len());

    let voter = voters
        .find_one(voter_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter with ID '{voter_id}'")))?;
    Ok(Json(voter.into()))
}

#[get("/admin/candidates?<search>&<pagination..>")]
async fn get_candidates(
    _token: AuthToken<Admin>,
    search: Option<&str>,
    pagination: PaginationRequest,
    candidates: Coll<Candidate>,
) -> Result<Json<Paginated<CandidateDescription>>> {
    let filter = search
        .map(|term| {
            doc! {
                "$or": [contains_filter("name", term), contains_filter("surname", term)],
            }
        })
        .unwrap_or_default();

    let options = FindOptions::builder()
        .sort(doc! { "surname": 1, "name": 1 })
        .skip(pagination.skip())
        .limit(i64::from(pagination.page_size()))
        .build();
    let page = candidates
        .find(filter.clone(), options)
        .await?
        .map_ok(CandidateDescription::from)
        .try_collect()
        .await?;
    let total = candidates.count_documents(filter, None).await?;

    Ok(Json(pagination.to_paginated(total, page)))
}

#[post("/admin/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    req_id: &RequestId,
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    new_candidates: Coll<NewCandidate>,
) -> Result<Json<CandidateDescription>> {
    let candidate = NewCandidate::from(spec.0);
    if candidate.name.trim().is_empty() || candidate.surname.trim().is_empty() {
        return Err(Error::bad_request(
            "Candidate name and surname must not be empty",
        ));
    }

    let result = new_candidates.insert_one(&candidate, None).await?;
    let id = inserted_id(result.inserted_id)?;
    info!("{req_id} created candidate {}", candidate.full_name());

    Ok(Json(Candidate { id, candidate }.into()))
}

#[get("/admin/elections?<label>")]
async fn get_elections(
    _token: AuthToken<Admin>,
    label: Option<&str>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionSummary>>> {
    let filter = label
        .map(|term| contains_filter("label", term))
        .unwrap_or_default();
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let summaries = elections
        .find(filter, options)
        .await?
        .map_ok(ElectionSummary::from)
        .try_collect()
        .await?;
    Ok(Json(summaries))
}

#[get("/admin/elections/<election_id>")]
async fn get_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    elections: Coll<Election>,
    links: Coll<ElectionCandidate>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionDescription>> {
    let election = election_by_id(election_id, &elections).await?;
    describe(election, &links, &candidates).await.map(Json)
}

#[post("/admin/elections", data = "<spec>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn create_election(
    req_id: &RequestId,
    token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    groups: Coll<Group>,
    candidates: Coll<Candidate>,
    links: Coll<ElectionCandidate>,
    new_links: Coll<NewElectionCandidate>,
    counters: Coll<Counter>,
    db_client: &State<Client>,
) -> Result<Json<ElectionDescription>> {
    check_spec(&spec, &groups, &candidates).await?;

    let election = {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        // Allocate an ID and insert the election.
        let id = Counter::next(&counters, ELECTION_ID_COUNTER_ID, &mut session).await?;
        let election = Election {
            id,
            metadata: spec.to_metadata(token.id),
        };
        elections
            .insert_one_with_session(&election, None, &mut session)
            .await?;

        // Link the candidates.
        let new_candidates = candidate_links(id, &spec);
        if !new_candidates.is_empty() {
            new_links
                .insert_many_with_session(&new_candidates, None, &mut session)
                .await?;
        }

        session.commit_transaction().await?;
        election
    };
    info!("{req_id} created election {} '{}'", election.id, election.label);
    if election.allowed_groups.is_empty() {
        warn!("{req_id} election {} permits no groups and is visible to nobody", election.id);
    }

    describe(election, &links, &candidates).await.map(Json)
}

/// Replace an election's configuration. Only allowed until someone votes.
#[put("/admin/elections/<election_id>", data = "<spec>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn modify_election(
    req_id: &RequestId,
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    groups: Coll<Group>,
    candidates: Coll<Candidate>,
    links: Coll<ElectionCandidate>,
    new_links: Coll<NewElectionCandidate>,
    voted_users: Coll<VotedUser>,
    db_client: &State<Client>,
) -> Result<Json<ElectionDescription>> {
    let existing = election_by_id(election_id, &elections).await?;
    check_spec(&spec, &groups, &candidates).await?;

    let election = Election {
        id: election_id,
        metadata: spec.to_metadata(existing.creator),
    };
    let new_candidates = candidate_links(election_id, &spec);
    let replaced = replace_election(
        db_client,
        &election,
        &new_candidates,
        &elections,
        &links,
        &new_links,
        &voted_users,
    )
    .await;
    match replaced {
        Ok(()) => {}
        // A ballot being recorded writes the election document too.
        Err(Error::Db(err)) if is_write_conflict_error(&err) => {
            warn!("{req_id} election {election_id} changed while a ballot was being recorded");
            return Err(Error::conflict(format!(
                "Cannot modify election {election_id} while votes are being cast"
            )));
        }
        Err(err) => return Err(err),
    }
    info!("{req_id} modified election {election_id}");
    if election.allowed_groups.is_empty() {
        warn!("{req_id} election {election_id} permits no groups and is visible to nobody");
    }

    describe(election, &links, &candidates).await.map(Json)
}

/// Swap in the new configuration and candidate links, unless someone has
/// already voted.
async fn replace_election(
    db_client: &Client,
    election: &Election,
    new_candidates: &[NewElectionCandidate],
    elections: &Coll<Election>,
    links: &Coll<ElectionCandidate>,
    new_links: &Coll<NewElectionCandidate>,
    voted_users: &Coll<VotedUser>,
) -> Result<()> {
    let election_id = election.id;
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let votes_cast = voted_users
        .count_documents_with_session(doc! { "election_id": election_id }, None, &mut session)
        .await?;
    if votes_cast > 0 {
        return Err(Error::bad_request(format!(
            "Cannot modify election {election_id} once votes have been cast"
        )));
    }

    elections
        .replace_one_with_session(u32_id_filter(election_id), election, None, &mut session)
        .await?;

    // Replace the candidate links.
    links
        .delete_many_with_session(doc! { "election_id": election_id }, None, &mut session)
        .await?;
    if !new_candidates.is_empty() {
        new_links
            .insert_many_with_session(new_candidates, None, &mut session)
            .await?;
    }

    session.commit_transaction().await?;
    Ok(())
}

/// Emails of the voters who have voted in an election.
#[get("/admin/elections/<election_id>/voted")]
async fn get_voted(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    elections: Coll<Election>,
    voted_users: Coll<VotedUser>,
    voters: Coll<Voter>,
) -> Result<Json<Vec<String>>> {
    election_by_id(election_id, &elections).await?;

    let voter_ids: Vec<Id> = voted_users
        .find(doc! { "election_id": election_id }, None)
        .await?
        .map_ok(|voted| voted.voted.voter_id)
        .try_collect()
        .await?;
    let filter = doc! {
        "_id": { "$in": id_array(&voter_ids) },
    };
    let options = FindOptions::builder().sort(doc! { "email": 1 }).build();
    let emails = voters
        .find(filter, options)
        .await?
        .map_ok(|voter| voter.voter.email)
        .try_collect()
        .await?;
    Ok(Json(emails))
}

/// Validate an election spec, including that everything it refers to exists.
async fn check_spec(
    spec: &ElectionSpec,
    groups: &Coll<Group>,
    candidates: &Coll<Candidate>,
) -> Result<()> {
    spec.validate().map_err(Error::bad_request)?;
    ensure_groups_exist(&spec.group_ids(), groups).await?;

    let candidate_ids = spec.candidate_ids();
    let filter = doc! {
        "_id": { "$in": id_array(&candidate_ids) },
    };
    let found = candidates.count_documents(filter, None).await?;
    if found != candidate_ids.len() as u64 {
        return Err(Error::not_found("One or more candidates".to_string()));
    }
    Ok(())
}

async fn ensure_groups_exist(group_ids: &HashSet<Id>, groups: &Coll<Group>) -> Result<()> {
    let filter = doc! {
        "_id": { "$in": id_array(group_ids) },
    };
    let found = groups.count_documents(filter, None).await?;
    if found != group_ids.len() as u64 {
        return Err(Error::not_found("One or more groups".to_string()));
    }
    Ok(())
}

fn candidate_links(election_id: ElectionId, spec: &ElectionSpec) -> Vec<NewElectionCandidate> {
    spec.candidate_ids()
        .into_iter()
        .map(|candidate_id| NewElectionCandidate {
            election_id,
            candidate_id,
        })
        .collect()
}

async fn describe(
    election: Election,
    links: &Coll<ElectionCandidate>,
    candidates: &Coll<Candidate>,
) -> Result<ElectionDescription> {
    let standing = standing_candidates(election.id, links, candidates).await?;
    Ok(ElectionDescription::new(
        election,
        standing.into_iter().map(Into::into).collect(),
    ))
}

fn inserted_id(id: mongodb::bson::Bson) -> Result<Id> {
    id.as_object_id()
        .map(Id::from)
        .ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                "Inserted ID was not an ObjectId".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json,
    };
    use serde::de::DeserializeOwned;

    use crate::model::{
        api::voter::VoterRegistration,
        db::{
            admin::DEFAULT_ADMIN_USERNAME, voted_user::NewVotedUser, voter::NewVoter,
        },
    };
    use crate::Config;

    use super::*;

    #[backend_test(admin)]
    async fn create_delete_admin(client: Client, db: Database) {
        let response = post_json(&client, uri!(create_admin), &AdminCredentials::example2()).await;
        assert_eq!(Status::Ok, response.status());

        let admins: Vec<String> = get_json(&client, uri!(get_admins)).await;
        assert_eq!(
            admins,
            vec![
                DEFAULT_ADMIN_USERNAME.to_string(),
                AdminCredentials::example1().username,
                AdminCredentials::example2().username,
            ]
        );

        // Duplicate usernames are refused.
        let response = post_json(&client, uri!(create_admin), &AdminCredentials::example2()).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .delete(uri!(delete_admin(AdminCredentials::example2().username)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let count = Coll::<Admin>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[backend_test(admin)]
    async fn cannot_delete_last_admin(client: Client, db: Database) {
        Coll::<Admin>::from_db(&db)
            .delete_one(doc! { "username": DEFAULT_ADMIN_USERNAME }, None)
            .await
            .unwrap();
        let response = client
            .delete(uri!(delete_admin(AdminCredentials::example1().username)))
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
    }

    #[backend_test(admin)]
    async fn bad_admin_credentials(client: Client) {
        let response = post_json(&client, uri!(create_admin), &AdminCredentials::empty()).await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn admin_routes_need_admin(client: Client) {
        let response = client.get(uri!(get_admins)).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn groups(client: Client) {
        let staff = add_group(&client, "Staff").await;
        let students = add_group(&client, "Students").await;

        let response = post_json(
            &client,
            uri!(create_group),
            &GroupSpec {
                name: "Staff".to_string(),
            },
        )
        .await;
        assert_eq!(Status::BadRequest, response.status());

        let groups: Vec<GroupDescription> = get_json(&client, uri!(get_groups)).await;
        assert_eq!(groups, vec![staff, students]);
    }

    #[backend_test(admin)]
    async fn voter_search_and_groups(client: Client, db: Database) {
        let config = Config::example();
        let new_voters = Coll::<NewVoter>::from_db(&db);
        for email in ["alice@uni.pl", "bob@uni.pl", "carol@firm.com"] {
            let registration = VoterRegistration {
                email: email.to_string(),
                ..VoterRegistration::example()
            };
            new_voters
                .insert_one(NewVoter::new(registration, &config), None)
                .await
                .unwrap();
        }

        let page: Paginated<VoterDescription> =
            get_json(&client, "/admin/voters?email=UNI.PL&page_size=1").await;
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].email, "alice@uni.pl");

        let page: Paginated<VoterDescription> =
            get_json(&client, "/admin/voters?email=uni.pl&page_num=2&page_size=1").await;
        assert_eq!(page.items[0].email, "bob@uni.pl");

        // Regex metacharacters are matched literally.
        let page: Paginated<VoterDescription> = get_json(&client, "/admin/voters?email=.*").await;
        assert_eq!(page.pagination.total, 0);

        // Assign groups.
        let group = add_group(&client, "Students").await;
        let voter_id = page_first_id(&client, "alice").await;
        let response = client
            .put(uri!(set_voter_groups(voter_id)))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&vec![group.id]).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let voter = Coll::<Voter>::from_db(&db)
            .find_one(voter_id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voter.groups, HashSet::from([*group.id]));

        // Unknown groups are refused.
        let response = client
            .put(uri!(set_voter_groups(voter_id)))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&vec![ApiId::from(Id::new())]).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn candidates(client: Client) {
        for spec in [
            CandidateSpec::example1(),
            CandidateSpec::example2(),
            CandidateSpec::example3(),
        ] {
            let response = post_json(&client, uri!(create_candidate), &spec).await;
            assert_eq!(Status::Ok, response.status());
        }

        let page: Paginated<CandidateDescription> =
            get_json(&client, "/admin/candidates?search=kowal").await;
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].surname, "Kowalski");

        let page: Paginated<CandidateDescription> = get_json(&client, "/admin/candidates").await;
        let surnames: Vec<_> = page.items.iter().map(|c| c.surname.as_str()).collect();
        assert_eq!(surnames, vec!["Kowalski", "Nowak", "Wisniewska"]);

        let empty = CandidateSpec {
            name: " ".to_string(),
            ..CandidateSpec::example1()
        };
        let response = post_json(&client, uri!(create_candidate), &empty).await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn create_and_get_election(client: Client, db: Database) {
        let (groups, candidates) = insert_groups_and_candidates(&client).await;
        let spec = ElectionSpec::current_example(&groups, &candidates);

        let first = create_election_for_spec(&client, &spec).await;
        let second = create_election_for_spec(&client, &spec).await;
        assert_eq!(first.summary.id, 1);
        assert_eq!(second.summary.id, 2);
        assert_eq!(first.summary.label, spec.label);
        assert_eq!(first.candidates.len(), candidates.len());

        let links = Coll::<ElectionCandidate>::from_db(&db)
            .count_documents(doc! { "election_id": 1 }, None)
            .await
            .unwrap();
        assert_eq!(links, candidates.len() as u64);

        let fetched: ElectionDescription = get_json(&client, uri!(get_election(1_u32))).await;
        assert_eq!(fetched, first);

        let summaries: Vec<ElectionSummary> =
            get_json(&client, "/admin/elections?label=council").await;
        assert_eq!(summaries.len(), 2);
        let summaries: Vec<ElectionSummary> =
            get_json(&client, "/admin/elections?label=referendum").await;
        assert!(summaries.is_empty());
    }

    #[backend_test(admin)]
    async fn bad_election_specs(client: Client, db: Database) {
        let (groups, candidates) = insert_groups_and_candidates(&client).await;

        let mut spec = ElectionSpec::current_example(&groups, &candidates);
        spec.max_votes = 0;
        let response = post_json(&client, uri!(create_election), &spec).await;
        assert_eq!(Status::BadRequest, response.status());

        let mut spec = ElectionSpec::current_example(&groups, &candidates);
        spec.end_date = spec.start_date - chrono::Duration::days(1);
        let response = post_json(&client, uri!(create_election), &spec).await;
        assert_eq!(Status::BadRequest, response.status());

        let spec = ElectionSpec::current_example(&[Id::new()], &candidates);
        let response = post_json(&client, uri!(create_election), &spec).await;
        assert_eq!(Status::NotFound, response.status());

        let spec = ElectionSpec::current_example(&groups, &[Id::new()]);
        let response = post_json(&client, uri!(create_election), &spec).await;
        assert_eq!(Status::NotFound, response.status());

        let count = Coll::<Election>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[backend_test(admin)]
    async fn modify_until_voted(client: Client, db: Database) {
        let (groups, candidates) = insert_groups_and_candidates(&client).await;
        let mut spec = ElectionSpec::current_example(&groups, &candidates);
        let election = create_election_for_spec(&client, &spec).await;
        let id = election.summary.id;

        // Drop a candidate and rename.
        spec.label = "Renamed".to_string();
        spec.candidates.pop();
        let response = put_json(&client, uri!(modify_election(id)), &spec).await;
        assert_eq!(Status::Ok, response.status());
        let modified: ElectionDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(modified.summary.label, "Renamed");
        assert_eq!(modified.candidates.len(), candidates.len() - 1);
        assert_eq!(modified.creator, election.creator);

        // Once someone votes, it is frozen.
        Coll::<NewVotedUser>::from_db(&db)
            .insert_one(
                NewVotedUser {
                    voter_id: Id::new(),
                    election_id: id,
                },
                None,
            )
            .await
            .unwrap();
        spec.label = "Renamed again".to_string();
        let response = put_json(&client, uri!(modify_election(id)), &spec).await;
        assert_eq!(Status::BadRequest, response.status());
        let stored = Coll::<Election>::from_db(&db)
            .find_one(u32_id_filter(id), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.label, "Renamed");

        let response = put_json(&client, uri!(modify_election(99_u32)), &spec).await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn modify_refused_while_ballot_in_flight(client: Client, db: Database) {
        let (groups, candidates) = insert_groups_and_candidates(&client).await;
        let mut spec = ElectionSpec::current_example(&groups, &candidates);
        let election = create_election_for_spec(&client, &spec).await;
        let id = election.summary.id;

        // A ballot that has bumped the election and marked its voter, but not
        // yet committed.
        let db_client = client.rocket().state::<mongodb::Client>().unwrap();
        let mut session = db_client.start_session(None).await.unwrap();
        session.start_transaction(None).await.unwrap();
        Coll::<Election>::from_db(&db)
            .update_one_with_session(
                u32_id_filter(id),
                doc! { "$inc": { "ballots_cast": 1 } },
                None,
                &mut session,
            )
            .await
            .unwrap();
        Coll::<NewVotedUser>::from_db(&db)
            .insert_one_with_session(
                NewVotedUser {
                    voter_id: Id::new(),
                    election_id: id,
                },
                None,
                &mut session,
            )
            .await
            .unwrap();

        spec.label = "Renamed".to_string();
        spec.max_votes = 1;
        let response = put_json(&client, uri!(modify_election(id)), &spec).await;
        assert_eq!(Status::Conflict, response.status());

        // The ballot commits against the configuration it was checked with.
        session.commit_transaction().await.unwrap();
        let stored = Coll::<Election>::from_db(&db)
            .find_one(u32_id_filter(id), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.label, election.summary.label);
        assert_eq!(stored.max_votes, election.summary.max_votes);

        // After that the usual rule applies.
        let response = put_json(&client, uri!(modify_election(id)), &spec).await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn voted_emails(client: Client, db: Database) {
        let (groups, candidates) = insert_groups_and_candidates(&client).await;
        let spec = ElectionSpec::current_example(&groups, &candidates);
        let election = create_election_for_spec(&client, &spec).await;

        let config = Config::example();
        let voter_id: Id = Coll::<NewVoter>::from_db(&db)
            .insert_one(NewVoter::example(&config), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();
        Coll::<NewVoter>::from_db(&db)
            .insert_one(NewVoter::example_in_groups(&config, &groups), None)
            .await
            .unwrap();
        Coll::<NewVotedUser>::from_db(&db)
            .insert_one(
                NewVotedUser {
                    voter_id,
                    election_id: election.summary.id,
                },
                None,
            )
            .await
            .unwrap();

        let emails: Vec<String> =
            get_json(&client, uri!(get_voted(election.summary.id))).await;
        assert_eq!(emails, vec![VoterRegistration::example().email]);

        let response = client.get(uri!(get_voted(99_u32))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    async fn insert_groups_and_candidates(client: &Client) -> (Vec<Id>, Vec<Id>) {
        let groups = vec![*add_group(client, "Students").await.id];
        let mut candidates = Vec::new();
        for spec in [CandidateSpec::example1(), CandidateSpec::example2(), CandidateSpec::example3()] {
            let response = post_json(client, uri!(create_candidate), &spec).await;
            let candidate: CandidateDescription =
                serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
            candidates.push(*candidate.id);
        }
        (groups, candidates)
    }

    async fn add_group(client: &Client, name: &str) -> GroupDescription {
        let spec = GroupSpec {
            name: name.to_string(),
        };
        let response = post_json(client, uri!(create_group), &spec).await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn create_election_for_spec(client: &Client, spec: &ElectionSpec) -> ElectionDescription {
        let response = post_json(client, uri!(create_election), spec).await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn page_first_id(client: &Client, email: &str) -> Id {
        let page: Paginated<VoterDescription> =
            get_json(client, format!("/admin/voters?email={email}")).await;
        *page.items[0].id
    }

    async fn get_json<T, U>(client: &Client, uri: U) -> T
    where
        T: DeserializeOwned,
        U: TryInto<rocket::http::uri::Origin<'static>> + std::fmt::Display,
    {
        let response = client.get(uri).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn post_json<'c, B: serde::Serialize>(
        client: &'c Client,
        uri: rocket::http::uri::Origin<'static>,
        body: &B,
    ) -> LocalResponse<'c> {
        client
            .post(uri)
            .header(ContentType::JSON)
            .body(serde_json::to_string(body).unwrap())
            .dispatch()
            .await
    }

    async fn put_json<'c, B: serde::Serialize>(
        client: &'c Client,
        uri: rocket::http::uri::Origin<'static>,
        body: &B,
    ) -> LocalResponse<'c> {
        client
            .put(uri)
            .header(ContentType::JSON)
            .body(serde_json::to_string(body).unwrap())
            .dispatch()
            .await
    }
}
