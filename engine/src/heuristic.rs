use clap::ValueEnum;
use lazy_static::lazy_static;
use serde::{Serialize, Deserialize};
use crate::board::{Position, SIZE};

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Plies searched by the engine; Easy never searches.
    pub fn depth(&self) -> u32 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 3,
        }
    }
}

type Weights = [[i32; SIZE]; SIZE];

/// Square weights added to the material count of a position.
#[derive(Deserialize, Debug)]
pub struct HeuristicTable {
    easy: Weights,
    hard: Weights,
}

impl HeuristicTable {
    pub fn weight(&self, difficulty: Difficulty, pos: Position) -> i32 {
        // medium shares the easy weights, only the depth changes
        let weights = match difficulty {
            Difficulty::Hard => &self.hard,
            Difficulty::Easy | Difficulty::Medium => &self.easy,
        };
        weights[pos.row()][pos.col()]
    }
}

lazy_static! {
    pub static ref HEURISTICS: HeuristicTable = serde_json::from_str(include_str!("heuristic.json"))
        .expect("embedded heuristic.json is malformed");
}
