use std::sync::Arc;

use poke_storage::{pokemon::Pokemon, Repository};

use crate::{
    auth::Authorizer,
    routes::registry::Controller,
    valid::{ValidateOptions, Validator},
};

use super::Resource;

pub fn new_controller(
    auth: Authorizer,
    repo: Arc<dyn Repository<Pokemon>>,
) -> Controller<Resource<Pokemon>> {
    Resource::new(auth, repo, Validator::new(ValidateOptions::strict())).routes()
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use serde_json::json;

    use poke_storage::{Entity, Repository};

    use crate::app::fixtures::{router, send, ADMIN, READER, WRITER};

    #[tokio::test]
    async fn no_token_is_unauthorized() {
        let (_, router) = router().await;
        let (status, _, body) = send(&router, Method::GET, "/pokemon", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "token does not exist");

        let (status, _, body) =
            send(&router, Method::GET, "/pokemon", Some("gary"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "token does not exist");
    }

    #[tokio::test]
    async fn reader_cannot_delete() {
        let (state, router) = router().await;
        let (status, _, body) =
            send(&router, Method::DELETE, "/pokemon/5", Some(READER), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "user does not have permission");
        assert!(state.store.pokemon.find_by_id(5).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn writer_cannot_delete_either() {
        let (state, router) = router().await;
        let (status, _, _) =
            send(&router, Method::DELETE, "/pokemon/5", Some(WRITER), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(state.store.pokemon.find_by_id(5).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn admin_deletes() {
        let (state, router) = router().await;
        let (status, _, body) =
            send(&router, Method::DELETE, "/pokemon/5", Some(ADMIN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pokeName"], "squirtle");
        assert!(state.store.pokemon.find_by_id(5).await.unwrap().is_none());

        let (status, _, _) =
            send(&router, Method::DELETE, "/pokemon/5", Some(ADMIN), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn overlong_name_is_rejected() {
        let (state, router) = router().await;
        let body = json!({
            "pokeName": "x".repeat(51),
            "pokeType1": "fire",
            "pokeType2": "normal",
            "gen": 1,
            "hp": 39, "atk": 52, "def": 43, "spatk": 60, "spdef": 50, "spd": 65,
            "sprite": "https://img.pokemondb.net/sprites/4.png"
        });
        let (status, _, violations) =
            send(&router, Method::POST, "/pokemon", Some(WRITER), Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let violations = violations.as_array().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0]["property"], "pokeName");
        assert_eq!(
            violations[0]["constraints"]["length"],
            "Given Name must be from 1 to 50 characters"
        );

        let all = state
            .store
            .pokemon
            .find_many(&poke_storage::FindOptions::all::<poke_storage::pokemon::Pokemon>())
            .await
            .unwrap();
        assert_eq!(all.len(), 6);
    }

    #[tokio::test]
    async fn search_sort_and_reverse() {
        let (_, router) = router().await;
        let (status, _, body) = send(
            &router,
            Method::GET,
            "/pokemon?sortby=atk&reverse=true&searchwherelike=char",
            Some(READER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["pokeName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["charizard", "charmeleon", "charmander"]);
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let (_, router) = router().await;
        let body = json!({
            "pokeName": "eevee",
            "pokeType1": "normal",
            "pokeType2": "normal",
            "gen": 1,
            "hp": 55, "atk": 55, "def": 50, "spatk": 45, "spdef": 65, "spd": 55,
            "sprite": "https://img.pokemondb.net/sprites/133.png"
        });
        let (status, _, created) =
            send(&router, Method::POST, "/pokemon", Some(ADMIN), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created[poke_storage::pokemon::Pokemon::PRIMARY_KEY]
            .as_u64()
            .unwrap();

        let uri = format!("/pokemon/{id}");
        let (status, _, first) = send(&router, Method::GET, &uri, Some(READER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, created);
        let (_, _, second) = send(&router, Method::GET, &uri, Some(READER), None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn zero_id_on_create_takes_the_next_id() {
        let (state, router) = router().await;
        let body = json!({
            "pokeID": 0,
            "pokeName": "mew",
            "pokeType1": "psychic",
            "pokeType2": "normal",
            "gen": 1,
            "hp": 100, "atk": 100, "def": 100, "spatk": 100, "spdef": 100, "spd": 100,
            "sprite": "https://img.pokemondb.net/sprites/151.png"
        });
        let (status, _, created) =
            send(&router, Method::POST, "/pokemon", Some(WRITER), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["pokeID"], 7);
        assert!(state.store.pokemon.find_by_id(0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_or_odd_ids() {
        let (_, router) = router().await;
        for uri in ["/pokemon/99", "/pokemon/pikachu"] {
            let (status, _, body) = send(&router, Method::GET, uri, Some(READER), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["code"], "1010002");
        }
    }

    #[tokio::test]
    async fn mistyped_stat_is_a_bad_request() {
        let (_, router) = router().await;
        let (status, _, _) = send(
            &router,
            Method::POST,
            "/pokemon",
            Some(WRITER),
            Some(json!({"pokeName": "ditto", "hp": "forty-eight"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
