//! Per-game lookup tables used while classifying entries.
//!
//! The tables are built once, optionally extended with mod theaters through
//! [`GameCatalog::modify_or_add_theater`], and then shared read-only with the
//! sniffer for the duration of a scan.

use std::fmt;
use std::str::FromStr;

/// The game a map or raw grid belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GameVariant {
    /// Tiberian Dawn
    TiberianDawn,
    /// Red Alert
    RedAlert,
    /// Sole Survivor
    SoleSurvivor,
}

impl GameVariant {
    /// All variants, in catalog order
    pub const ALL: [GameVariant; 3] = [
        GameVariant::TiberianDawn,
        GameVariant::RedAlert,
        GameVariant::SoleSurvivor,
    ];

    /// Full game name
    pub fn name(&self) -> &'static str {
        match self {
            GameVariant::TiberianDawn => "Tiberian Dawn",
            GameVariant::RedAlert => "Red Alert",
            GameVariant::SoleSurvivor => "Sole Survivor",
        }
    }

    /// Short name used in map descriptions
    pub fn short_name(&self) -> &'static str {
        match self {
            GameVariant::TiberianDawn => "TD",
            GameVariant::RedAlert => "RA",
            GameVariant::SoleSurvivor => "Sole",
        }
    }

    fn index(self) -> usize {
        match self {
            GameVariant::TiberianDawn => 0,
            GameVariant::RedAlert => 1,
            GameVariant::SoleSurvivor => 2,
        }
    }
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "td" | "tiberiandawn" | "tiberian dawn" | "cnc" => Ok(GameVariant::TiberianDawn),
            "ra" | "redalert" | "red alert" => Ok(GameVariant::RedAlert),
            "ss" | "sole" | "solesurvivor" | "sole survivor" => Ok(GameVariant::SoleSurvivor),
            _ => Err(format!("unknown game '{s}'")),
        }
    }
}

/// A graphical environment a map can be set in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TheaterType {
    /// Name as written in map files
    pub name: String,
    /// Base name of the tileset archive
    pub tileset: String,
    /// File extension of the theater's templates
    pub extension: String,
    /// Added by a mod rather than shipped with the game
    pub is_mod: bool,
}

impl TheaterType {
    fn new(name: &str, tileset: &str, extension: &str, is_mod: bool) -> Self {
        Self {
            name: name.to_string(),
            tileset: tileset.to_string(),
            extension: extension.to_string(),
            is_mod,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GameTables {
    theaters: Vec<TheaterType>,
    houses: Vec<String>,
    max_template_id: u16,
}

/// Lookup tables for all supported games
#[derive(Debug, Clone)]
pub struct GameCatalog {
    games: [GameTables; 3],
}

impl Default for GameCatalog {
    fn default() -> Self {
        Self::classic()
    }
}

fn td_theaters() -> Vec<TheaterType> {
    vec![
        TheaterType::new("Desert", "DESERT", ".DES", false),
        TheaterType::new("Jungle", "JUNGLE", ".JUN", true),
        TheaterType::new("Temperate", "TEMPERAT", ".TEM", false),
        TheaterType::new("Winter", "WINTER", ".WIN", false),
        TheaterType::new("Snow", "SNOW", ".SNO", true),
        TheaterType::new("Caribbean", "CARIBBEA", ".CAR", true),
    ]
}

fn houses(names: &[&str], multi: usize) -> Vec<String> {
    names
        .iter()
        .map(|s| s.to_string())
        .chain((1..=multi).map(|i| format!("Multi{i}")))
        .collect()
}

impl GameCatalog {
    /// Tables for the original releases
    pub fn classic() -> Self {
        let td = GameTables {
            theaters: td_theaters(),
            houses: houses(&["GoodGuy", "BadGuy", "Neutral", "Special"], 6),
            max_template_id: 215,
        };
        let ra = GameTables {
            theaters: vec![
                TheaterType::new("Temperate", "TEMPERAT", ".TEM", false),
                TheaterType::new("Snow", "SNOW", ".SNO", false),
                TheaterType::new("Interior", "INTERIOR", ".INT", false),
                TheaterType::new("Desert", "DESERT", ".DES", true),
            ],
            houses: houses(
                &[
                    "Spain", "Greece", "USSR", "England", "Ukraine", "Germany", "France",
                    "Turkey", "GoodGuy", "BadGuy", "Neutral", "Special",
                ],
                8,
            ),
            max_template_id: 400,
        };
        let sole = GameTables {
            theaters: td_theaters(),
            houses: houses(&["GoodGuy", "BadGuy", "Neutral", "Special"], 6),
            max_template_id: 215,
        };
        Self {
            games: [td, ra, sole],
        }
    }

    fn tables(&self, variant: GameVariant) -> &GameTables {
        &self.games[variant.index()]
    }

    fn tables_mut(&mut self, variant: GameVariant) -> &mut GameTables {
        &mut self.games[variant.index()]
    }

    /// Theaters known for a game, in catalog order
    pub fn theaters(&self, variant: GameVariant) -> &[TheaterType] {
        &self.tables(variant).theaters
    }

    /// House names known for a game
    pub fn houses(&self, variant: GameVariant) -> &[String] {
        &self.tables(variant).houses
    }

    /// Highest template id a map cell of this game may reference
    pub fn max_template_id(&self, variant: GameVariant) -> u16 {
        self.tables(variant).max_template_id
    }

    /// Finds a theater by name, ignoring case
    pub fn find_theater(&self, variant: GameVariant, name: &str) -> Option<&TheaterType> {
        self.theaters(variant)
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Finds a house by name, ignoring case
    pub fn find_house(&self, variant: GameVariant, name: &str) -> Option<&str> {
        self.houses(variant)
            .iter()
            .find(|h| h.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Replaces the theater with the same name, or appends a new one
    pub fn modify_or_add_theater(
        &mut self,
        variant: GameVariant,
        name: &str,
        tileset: &str,
        extension: &str,
        is_mod: bool,
    ) {
        let theater = TheaterType::new(name, tileset, extension, is_mod);
        let theaters = &mut self.tables_mut(variant).theaters;
        match theaters.iter_mut().find(|t| t.name.eq_ignore_ascii_case(name)) {
            Some(existing) => *existing = theater,
            None => theaters.push(theater),
        }
    }

    /// Overrides the highest template id for a game
    pub fn set_max_template_id(&mut self, variant: GameVariant, id: u16) {
        self.tables_mut(variant).max_template_id = id;
    }
}
