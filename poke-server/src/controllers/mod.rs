pub mod pokemon;
pub mod poketeam;
pub mod users;

use std::{fmt, sync::Arc};

use http::Method;
use serde::Serialize;

use poke_slo::Result;
use poke_storage::{primary_key, Entity, Repository};

use crate::{
    auth::{Action, Authorizer, Decision},
    contract::{Outcome, RequestContext},
    routes::registry::Controller,
    valid::{ListParams, Validator, Violation},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Found<T> {
    One(T),
    Many(Vec<T>),
}

/// CRUD handlers shared by every record type: authorization first, then
/// validation, then the repository.
pub struct Resource<T: Entity> {
    auth: Authorizer,
    repo: Arc<dyn Repository<T>>,
    validator: Validator,
}

impl<T: Entity> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("auth", &self.auth)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

macro_rules! authorize {
    ($auth:expr, $ctx:expr, $action:expr) => {
        if let Decision::Denied(denial) = $auth.authorize(&$ctx, $action).await? {
            return Ok(Outcome::Denied(denial));
        }
    };
}

impl<T: Entity> Resource<T> {
    pub fn new(
        auth: Authorizer,
        repo: Arc<dyn Repository<T>>,
        validator: Validator,
    ) -> Self {
        Self {
            auth,
            repo,
            validator,
        }
    }

    /// `GET /R/{P?}`, `POST /R`, `PUT /R/{P}` and `DELETE /R/{P}`.
    pub fn routes(self) -> Controller<Self> {
        let item = format!("/{{{}}}", T::PRIMARY_KEY);
        Controller::new(format!("/{}", T::NAME), self)
            .route(Method::GET, &format!("/{{{}?}}", T::PRIMARY_KEY), Self::read)
            .route(Method::POST, "", Self::create)
            .route(Method::PUT, &item, Self::update)
            .route(Method::DELETE, &item, Self::delete)
    }

    pub async fn read(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<Outcome<Found<T>>> {
        authorize!(self.auth, ctx, Action::Read);
        if ctx.param.is_some() {
            let Some(id) = ctx.param_id() else {
                return Ok(Outcome::NotFound);
            };
            return Ok(match self.repo.find_by_id(id).await? {
                Some(record) => Outcome::Ok(Found::One(record)),
                None => Outcome::NotFound,
            });
        }
        let params: ListParams = ctx.query()?;
        let records = self.repo.find_many(&params.options::<T>()).await?;
        Ok(Outcome::Ok(Found::Many(records)))
    }

    pub async fn create(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<Outcome<T>> {
        authorize!(self.auth, ctx, Action::Create);
        let record: T = ctx.json()?;
        if let Some(violations) = self.check(&record).await? {
            return Ok(Outcome::Invalid(violations));
        }
        Ok(Outcome::Created(self.repo.save(&record).await?))
    }

    /// Overlays the body on the stored record named by the body's primary
    /// key, which has to agree with the path.
    pub async fn update(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<Outcome<T>> {
        authorize!(self.auth, ctx, Action::Update);
        let fields = ctx.fields()?;
        let Some(id) = ctx.param_id() else {
            return Ok(Outcome::NotFound);
        };
        if primary_key::<T>(&fields) != Some(id) {
            return Ok(Outcome::NotFound);
        }
        let Some(record) = self.repo.preload(&fields).await? else {
            return Ok(Outcome::NotFound);
        };
        if record.id() != Some(id) {
            return Ok(Outcome::NotFound);
        }
        if let Some(violations) = self.check(&record).await? {
            return Ok(Outcome::Invalid(violations));
        }
        Ok(Outcome::Ok(self.repo.save(&record).await?))
    }

    /// Field rules first; unique properties are only looked up for an
    /// otherwise valid record.
    async fn check(&self, record: &T) -> Result<Option<Vec<Violation>>> {
        let violations = self.validator.validate(record);
        if !violations.is_empty() {
            return Ok(Some(violations));
        }
        if T::UNIQUE.is_empty() {
            return Ok(None);
        }
        Ok(self
            .repo
            .taken(record)
            .await?
            .map(|property| vec![self.validator.taken(record, property)]))
    }

    pub async fn delete(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<Outcome<T>> {
        authorize!(self.auth, ctx, Action::Delete);
        let Some(id) = ctx.param_id() else {
            return Ok(Outcome::NotFound);
        };
        let Some(record) = self.repo.find_by_id(id).await? else {
            return Ok(Outcome::NotFound);
        };
        Ok(Outcome::Ok(self.repo.remove(&record).await?))
    }
}
