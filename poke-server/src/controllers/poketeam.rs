use std::sync::Arc;

use poke_storage::{poketeam::PokeTeam, Repository};

use crate::{
    auth::Authorizer,
    routes::registry::Controller,
    valid::{ValidateOptions, Validator},
};

use super::Resource;

pub fn new_controller(
    auth: Authorizer,
    repo: Arc<dyn Repository<PokeTeam>>,
) -> Controller<Resource<PokeTeam>> {
    Resource::new(auth, repo, Validator::new(ValidateOptions::strict())).routes()
}
