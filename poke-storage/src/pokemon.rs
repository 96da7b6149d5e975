use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::Entity;

pub const POKE_TYPES: [&str; 18] = [
    "normal", "fire", "water", "grass", "electric", "ice", "fighting",
    "poison", "ground", "flying", "psychic", "bug", "rock", "ghost", "dragon",
    "dark", "steel", "fairy",
];

#[derive(
    Debug, Default, Clone, PartialEq, Deserialize, Serialize, Validate, FromRow,
)]
pub struct Pokemon {
    #[serde(rename = "pokeID", default)]
    #[sqlx(rename = "pokeID")]
    pub poke_id: Option<u64>,
    #[serde(rename = "pokeName")]
    #[sqlx(rename = "pokeName")]
    #[validate(
        required(message = "Given Name is required"),
        length(
            min = 1,
            max = 50,
            message = "Given Name must be from 1 to 50 characters"
        )
    )]
    pub poke_name: Option<String>,
    #[serde(rename = "pokeType1")]
    #[sqlx(rename = "pokeType1")]
    #[validate(
        required(message = "Cmon... you need a valid PokeType!"),
        custom(function = "check_poke_type")
    )]
    pub poke_type1: Option<String>,
    #[serde(rename = "pokeType2")]
    #[sqlx(rename = "pokeType2")]
    #[validate(
        required(message = "Cmon... you need a valid PokeType!"),
        custom(function = "check_poke_type")
    )]
    pub poke_type2: Option<String>,
    #[validate(
        required(message = "Gen is required"),
        range(min = 1, max = 10, message = "Gen must be from 1 to 10")
    )]
    pub gen: Option<i32>,
    #[validate(
        required(message = "Gotta have at least 1 HP!"),
        range(min = 1, max = 999, message = "Gotta have at least 1 HP! (1 to 999)")
    )]
    pub hp: Option<i32>,
    #[validate(
        required(message = "You can't be THAT bad at fighting!"),
        range(min = 1, max = 999, message = "You can't be THAT bad at fighting! (1 to 999)")
    )]
    pub atk: Option<i32>,
    #[validate(
        required(message = "You can't be THAT bad at protecting!"),
        range(min = 1, max = 999, message = "You can't be THAT bad at protecting! (1 to 999)")
    )]
    pub def: Option<i32>,
    #[validate(
        required(message = "Not THAT kind of special!"),
        range(min = 1, max = 999, message = "Not THAT kind of special! (1 to 999)")
    )]
    pub spatk: Option<i32>,
    #[validate(
        required(message = "Not THAT kind of special!"),
        range(min = 1, max = 999, message = "Not THAT kind of special! (1 to 999)")
    )]
    pub spdef: Option<i32>,
    #[validate(
        required(message = "You can't be THAT slow!"),
        range(min = 1, max = 999, message = "You can't be THAT slow! (1 to 999)")
    )]
    pub spd: Option<i32>,
    #[validate(
        required(message = "sprite must be a URL address"),
        url(message = "sprite must be a URL address")
    )]
    pub sprite: Option<String>,
}

impl Entity for Pokemon {
    const NAME: &'static str = "pokemon";
    const TABLE: &'static str = "pokemon";
    const PRIMARY_KEY: &'static str = "pokeID";
    const FIELDS: &'static [&'static str] = &[
        "pokeID",
        "pokeName",
        "pokeType1",
        "pokeType2",
        "gen",
        "hp",
        "atk",
        "def",
        "spatk",
        "spdef",
        "spd",
        "sprite",
    ];

    fn id(&self) -> Option<u64> {
        self.poke_id
    }

    fn set_id(&mut self, id: u64) {
        self.poke_id = Some(id);
    }
}

fn failure(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

fn check_poke_type(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(failure("isNotEmpty", "Cmon... you need a valid PokeType!"));
    }
    if POKE_TYPES.contains(&value) {
        Ok(())
    } else {
        Err(failure("isIn", "You gotta choose a valid PokeType!"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charmander() -> Pokemon {
        Pokemon {
            poke_id: Some(4),
            poke_name: Some("charmander".to_owned()),
            poke_type1: Some("fire".to_owned()),
            poke_type2: Some("dragon".to_owned()),
            gen: Some(1),
            hp: Some(39),
            atk: Some(52),
            def: Some(43),
            spatk: Some(60),
            spdef: Some(50),
            spd: Some(65),
            sprite: Some("https://img.pokemondb.net/4.png".to_owned()),
        }
    }

    #[test]
    fn valid_pokemon() {
        assert!(charmander().validate().is_ok());
    }

    #[test]
    fn every_field_but_the_id_is_required() {
        let errs = Pokemon::default().validate().unwrap_err();
        assert_eq!(errs.field_errors().len(), Pokemon::FIELDS.len() - 1);
    }

    #[test]
    fn bounds() {
        let mut p = charmander();
        p.gen = Some(11);
        p.hp = Some(0);
        p.atk = Some(1000);
        p.poke_type1 = Some("sound".to_owned());
        let errs = p.validate().unwrap_err();
        let fields = errs.field_errors();
        assert_eq!(fields.len(), 4);
        assert_eq!(
            fields["gen"][0].message.as_deref(),
            Some("Gen must be from 1 to 10")
        );
        let type1 = fields
            .get("poke_type1")
            .or_else(|| fields.get("pokeType1"))
            .unwrap();
        assert_eq!(
            type1[0].message.as_deref(),
            Some("You gotta choose a valid PokeType!")
        );
    }

    #[test]
    fn name_length() {
        let mut p = charmander();
        p.poke_name = Some("c".repeat(51));
        assert!(p.validate().is_err());
        p.poke_name = Some("c".repeat(50));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn json_names() {
        let value = serde_json::to_value(charmander()).unwrap();
        let object = value.as_object().unwrap();
        for field in Pokemon::FIELDS {
            assert!(object.contains_key(*field), "{field}");
        }
        assert_eq!(object.len(), Pokemon::FIELDS.len());
    }
}
