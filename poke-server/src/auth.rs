use std::{fmt, sync::Arc};

use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::info;

use poke_slo::Result;
use poke_storage::{
    user::{AccessLevel, User},
    CredentialStore,
};

use crate::contract::{Denial, RequestContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

/// The whole access policy. A missing or unrecognized level is never
/// permitted anything.
pub fn permits(level: Option<AccessLevel>, action: Action) -> bool {
    match level {
        Some(AccessLevel::Admin) => true,
        Some(AccessLevel::Write) => action != Action::Delete,
        Some(AccessLevel::Read) => action == Action::Read,
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Authorized(User),
    Denied(Denial),
}

#[derive(Clone)]
pub struct Authorizer {
    credentials: Arc<dyn CredentialStore>,
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer").finish_non_exhaustive()
    }
}

impl Authorizer {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    /// Resolves the bearer token of the request to a user.
    pub async fn identify(&self, ctx: &RequestContext) -> Result<Decision> {
        let Some(Authorization(bearer)) =
            ctx.headers.typed_get::<Authorization<Bearer>>()
        else {
            return Ok(Decision::Denied(Denial::Unauthenticated));
        };
        let token = bearer.token();
        if token.is_empty() {
            return Ok(Decision::Denied(Denial::Unauthenticated));
        }
        match self.credentials.find_by_token(token).await? {
            Some(user) => {
                info!(
                    actor = user.name(),
                    method = %ctx.method,
                    access_level = user.access_level.as_deref().unwrap_or_default(),
                    "identified"
                );
                Ok(Decision::Authorized(user))
            }
            None => Ok(Decision::Denied(Denial::Unauthenticated)),
        }
    }

    pub fn authorize_read(&self, user: User) -> Decision {
        self.check(user, Action::Read)
    }

    pub fn authorize_write(&self, user: User, action: Action) -> Decision {
        self.check(user, action)
    }

    /// Identification followed by the policy check for `action`.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        action: Action,
    ) -> Result<Decision> {
        Ok(match self.identify(ctx).await? {
            Decision::Authorized(user) if action == Action::Read => {
                self.authorize_read(user)
            }
            Decision::Authorized(user) => self.authorize_write(user, action),
            denied => denied,
        })
    }

    fn check(&self, user: User, action: Action) -> Decision {
        if permits(user.level(), action) {
            Decision::Authorized(user)
        } else {
            Decision::Denied(Denial::Forbidden)
        }
    }
}
