use std::sync::Arc;

use poke_storage::{user::User, Repository};

use crate::{
    auth::Authorizer,
    routes::registry::Controller,
    valid::{ValidateOptions, Validator},
};

use super::Resource;

/// Users report every failed rule of a property, with the rejected value.
pub fn new_controller(
    auth: Authorizer,
    repo: Arc<dyn Repository<User>>,
) -> Controller<Resource<User>> {
    Resource::new(auth, repo, Validator::new(ValidateOptions::verbose())).routes()
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use serde_json::json;

    use crate::app::fixtures::{router, send, ADMIN, READER, WRITER};

    #[tokio::test]
    async fn registered_user_can_authenticate() {
        let (_, router) = router().await;
        let (status, _, body) = send(
            &router,
            Method::POST,
            "/users",
            Some(ADMIN),
            Some(json!({"username": "ash", "token": "pallet", "accessLevel": "READ"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 4);

        let (status, _, _) =
            send(&router, Method::GET, "/pokemon/1", Some("pallet"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) =
            send(&router, Method::DELETE, "/pokemon/1", Some("pallet"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_access_level_is_rejected() {
        let (_, router) = router().await;
        let (status, _, violations) = send(
            &router,
            Method::POST,
            "/users",
            Some(WRITER),
            Some(json!({"username": "", "token": "cerulean", "accessLevel": "OWNER"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let properties: Vec<_> = violations
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["property"].as_str().unwrap())
            .collect();
        assert_eq!(properties, vec!["username", "accessLevel"]);
    }

    async fn holders(router: &axum::Router, token: &str) -> usize {
        let (_, _, body) = send(
            router,
            Method::GET,
            &format!("/users?searchwherelike={token}"),
            Some(ADMIN),
            None,
        )
        .await;
        body.as_array()
            .unwrap()
            .iter()
            .filter(|u| u["token"] == token)
            .count()
    }

    #[tokio::test]
    async fn duplicate_token_is_rejected_on_create() {
        let (_, router) = router().await;
        let (status, _, violations) = send(
            &router,
            Method::POST,
            "/users",
            Some(ADMIN),
            Some(json!({"username": "gary", "token": READER, "accessLevel": "ADMIN"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(violations[0]["property"], "token");
        assert_eq!(violations[0]["constraints"]["isUnique"], "token is already in use");
        assert_eq!(violations[0]["value"], READER);
        assert_eq!(holders(&router, READER).await, 1);

        let (status, _, body) =
            send(&router, Method::DELETE, "/pokemon/1", Some(READER), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "1010005");
    }

    #[tokio::test]
    async fn duplicate_token_is_rejected_on_update() {
        let (_, router) = router().await;
        let (status, _, violations) = send(
            &router,
            Method::PUT,
            "/users/2",
            Some(ADMIN),
            Some(json!({"id": 2, "token": ADMIN})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(violations[0]["property"], "token");
        assert_eq!(holders(&router, ADMIN).await, 1);

        let (_, _, misty) =
            send(&router, Method::GET, "/users/2", Some(ADMIN), None).await;
        assert_eq!(misty["token"], WRITER);

        // Keeping one's own token is fine.
        let (status, _, body) = send(
            &router,
            Method::PUT,
            "/users/2",
            Some(ADMIN),
            Some(json!({"id": 2, "token": WRITER, "username": "misty-w"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "misty-w");
    }

    #[tokio::test]
    async fn listing_users() {
        let (_, router) = router().await;
        let (status, _, body) = send(
            &router,
            Method::GET,
            "/users?sortby=username&searchwherelike=O",
            Some(READER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["username"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["brock", "oak"]);
    }

    #[tokio::test]
    async fn promote_a_user() {
        let (_, router) = router().await;
        let (status, _, body) = send(
            &router,
            Method::PUT,
            "/users/3",
            Some(ADMIN),
            Some(json!({"id": 3, "accessLevel": "WRITE"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "brock");
        assert_eq!(body["accessLevel"], "WRITE");

        let (status, _, _) = send(
            &router,
            Method::POST,
            "/poketeam",
            Some(READER),
            Some(json!({"teamName": "Rock Solid", "poke1": 74})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}
