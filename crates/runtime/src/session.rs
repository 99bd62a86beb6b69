//! The `players` session fragment.
//!
//! Element and attribute names are fixed so existing session files keep
//! loading; do not rename fields without bumping the format.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use hexfield_ai::AlgorithmOptions;
use hexfield_core::FactionId;

use crate::error::{Result, RuntimeError};
use crate::players::{ComputerPlayer, HumanPlayer, Player, PlayerManager};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "players")]
pub struct SessionPlayers {
    #[serde(default)]
    pub humans: HumansElement,
    #[serde(default)]
    pub computers: ComputersElement,
    #[serde(default)]
    pub algorithms: AlgorithmsElement,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HumansElement {
    #[serde(rename = "human", default)]
    pub entries: Vec<HumanElement>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputersElement {
    #[serde(rename = "computer", default)]
    pub entries: Vec<ComputerElement>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmsElement {
    #[serde(rename = "algorithm", default)]
    pub entries: Vec<AlgorithmElement>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HumanElement {
    #[serde(rename = "@name")]
    pub name: String,
    pub factions: FactionsElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputerElement {
    #[serde(rename = "@name")]
    pub name: String,
    pub factions: FactionsElement,
    pub options: OptionsElement,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FactionsElement {
    /// Space-separated faction ids.
    #[serde(rename = "@ids", default)]
    pub ids: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionsElement {
    #[serde(rename = "@algorithm")]
    pub algorithm: String,
    #[serde(rename = "@targetLimit")]
    pub target_limit: u32,
    #[serde(rename = "@useRandomBuild")]
    pub use_random_build: bool,
    #[serde(rename = "@useRandomPlace")]
    pub use_random_place: bool,
    #[serde(rename = "@useScripting")]
    pub use_scripting: bool,
}

impl Default for OptionsElement {
    fn default() -> Self {
        Self::from_options("seeker", &AlgorithmOptions::default())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmElement {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "state", default)]
    pub states: Vec<StateElement>,
}

/// Per-faction algorithm state marker: which turn it was refreshed on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateElement {
    #[serde(rename = "@faction")]
    pub faction: u32,
    #[serde(rename = "@turn")]
    pub turn: i32,
}

impl FactionsElement {
    fn from_set(factions: &BTreeSet<FactionId>) -> Self {
        Self {
            ids: factions
                .iter()
                .map(|f| f.0.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    fn to_set(&self) -> Result<BTreeSet<FactionId>> {
        self.ids
            .split_whitespace()
            .map(|id| {
                id.parse::<u32>()
                    .map(FactionId)
                    .map_err(|e| RuntimeError::Session(format!("bad faction id {id:?}: {e}")))
            })
            .collect()
    }
}

impl OptionsElement {
    pub fn from_options(algorithm: &str, options: &AlgorithmOptions) -> Self {
        Self {
            algorithm: algorithm.to_owned(),
            target_limit: options.target_limit(),
            use_random_build: options.use_random_build,
            use_random_place: options.use_random_place,
            use_scripting: options.use_scripting,
        }
    }

    pub fn to_options(&self) -> AlgorithmOptions {
        let mut options = AlgorithmOptions::default();
        // The setter clamps; out-of-range persisted values are accepted.
        options.set_target_limit(self.target_limit);
        options.use_random_build = self.use_random_build;
        options.use_random_place = self.use_random_place;
        options.use_scripting = self.use_scripting;
        options
    }
}

impl SessionPlayers {
    /// Captures the manager plus per-algorithm faction states.
    pub fn from_manager(manager: &PlayerManager, algorithms: Vec<AlgorithmElement>) -> Self {
        let mut humans = Vec::new();
        let mut computers = Vec::new();
        for player in manager.players() {
            match player {
                Player::Human(human) => humans.push(HumanElement {
                    name: human.name.clone(),
                    factions: FactionsElement::from_set(&human.factions),
                    email: human.email.clone(),
                }),
                Player::Computer(computer) => computers.push(ComputerElement {
                    name: computer.name.clone(),
                    factions: FactionsElement::from_set(&computer.factions),
                    options: OptionsElement::from_options(
                        &computer.algorithm_id,
                        &computer.options,
                    ),
                }),
            }
        }
        Self {
            humans: HumansElement { entries: humans },
            computers: ComputersElement { entries: computers },
            algorithms: AlgorithmsElement {
                entries: algorithms,
            },
        }
    }

    /// Rebuilds the player manager, validating algorithm ids.
    pub fn to_manager(&self) -> Result<PlayerManager> {
        let mut players = Vec::new();
        for human in &self.humans.entries {
            players.push(Player::Human(HumanPlayer {
                name: human.name.clone(),
                factions: human.factions.to_set()?,
                email: human.email.clone(),
            }));
        }
        for computer in &self.computers.entries {
            if hexfield_ai::create_algorithm(&computer.options.algorithm).is_none() {
                return Err(RuntimeError::UnknownAlgorithm(
                    computer.options.algorithm.clone(),
                ));
            }
            players.push(Player::Computer(ComputerPlayer {
                name: computer.name.clone(),
                factions: computer.factions.to_set()?,
                algorithm_id: computer.options.algorithm.clone(),
                options: computer.options.to_options(),
            }));
        }
        PlayerManager::new(players)
    }
}

/// Serializes the fragment to XML.
pub fn write_session(players: &SessionPlayers) -> Result<String> {
    quick_xml::se::to_string(players).map_err(|e| RuntimeError::Session(e.to_string()))
}

/// Parses the fragment back from XML.
pub fn read_session(xml: &str) -> Result<SessionPlayers> {
    quick_xml::de::from_str(xml).map_err(|e| RuntimeError::Session(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionPlayers {
        let manager = PlayerManager::new(vec![
            Player::Human(HumanPlayer {
                name: "Alice".to_owned(),
                factions: [FactionId(0)].into_iter().collect(),
                email: Some("alice@example.org".to_owned()),
            }),
            Player::Computer(ComputerPlayer {
                name: "Seeker One".to_owned(),
                factions: [FactionId(1), FactionId(2)].into_iter().collect(),
                algorithm_id: "seeker".to_owned(),
                options: AlgorithmOptions::default().with_target_limit(12),
            }),
        ])
        .unwrap();
        SessionPlayers::from_manager(
            &manager,
            vec![AlgorithmElement {
                id: "seeker".to_owned(),
                states: vec![StateElement {
                    faction: 1,
                    turn: 4,
                }],
            }],
        )
    }

    #[test]
    fn fragment_round_trips() {
        let players = sample();
        let xml = write_session(&players).unwrap();
        let read = read_session(&xml).unwrap();
        assert_eq!(read, players);
    }

    #[test]
    fn attribute_names_are_stable() {
        let xml = write_session(&sample()).unwrap();
        for needle in [
            "<players>",
            "<humans>",
            "<human name=\"Alice\"",
            "factions ids=\"0\"",
            "<email>alice@example.org</email>",
            "<computers>",
            "<computer name=\"Seeker One\"",
            "factions ids=\"1 2\"",
            "algorithm=\"seeker\"",
            "targetLimit=\"12\"",
            "useRandomBuild=\"false\"",
            "useRandomPlace=\"false\"",
            "useScripting=\"false\"",
            "<algorithms>",
            "<algorithm id=\"seeker\"",
            "state faction=\"1\" turn=\"4\"",
        ] {
            assert!(xml.contains(needle), "missing {needle:?} in {xml}");
        }
    }

    #[test]
    fn manager_round_trips_with_clamped_limits() {
        let mut players = sample();
        players.computers.entries[0].options.target_limit = 99_999;
        let manager = players.to_manager().unwrap();
        let Player::Computer(computer) = &manager.players()[1] else {
            panic!("expected computer player");
        };
        assert_eq!(computer.options.target_limit(), 1000);
    }

    #[test]
    fn unknown_algorithms_are_rejected() {
        let mut players = sample();
        players.computers.entries[0].options.algorithm = "oracle".to_owned();
        assert!(matches!(
            players.to_manager(),
            Err(RuntimeError::UnknownAlgorithm(_))
        ));
    }
}
