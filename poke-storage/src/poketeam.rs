use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::Entity;

#[derive(
    Debug, Default, Clone, PartialEq, Deserialize, Serialize, Validate, FromRow,
)]
pub struct PokeTeam {
    #[serde(rename = "teamID", default)]
    #[sqlx(rename = "teamID")]
    pub team_id: Option<u64>,
    #[serde(rename = "teamName")]
    #[sqlx(rename = "teamName")]
    #[validate(
        required(message = "Team Name is required"),
        length(
            min = 1,
            max = 50,
            message = "Team Name must be from 1 to 50 characters"
        )
    )]
    pub team_name: Option<String>,
    #[validate(
        required(message = "Team ID is must be a positive number!"),
        range(min = 1, message = "Team ID is must be a positive number!")
    )]
    pub poke1: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Pokemon ID must be a positive number!"))]
    pub poke2: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Pokemon ID must be a positive number!"))]
    pub poke3: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Pokemon ID must be a positive number!"))]
    pub poke4: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Pokemon ID must be a positive number!"))]
    pub poke5: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Pokemon ID must be a positive number!"))]
    pub poke6: Option<i32>,
}

impl Entity for PokeTeam {
    const NAME: &'static str = "poketeam";
    const TABLE: &'static str = "poke_team";
    const PRIMARY_KEY: &'static str = "teamID";
    const FIELDS: &'static [&'static str] = &[
        "teamID", "teamName", "poke1", "poke2", "poke3", "poke4", "poke5",
        "poke6",
    ];

    fn id(&self) -> Option<u64> {
        self.team_id
    }

    fn set_id(&mut self, id: u64) {
        self.team_id = Some(id);
    }
}
