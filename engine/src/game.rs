use std::io::{Error, ErrorKind};
use log::{debug, error, info};
use rand::Rng;
use rand::rngs::StdRng;
use serde::Serialize;
use crate::board::{Board, MoveCheck, Player, Position};
use crate::engine::Engine;
use crate::heuristic::Difficulty;

const TOTAL_TURNS: u8 = 60;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Black,
    White,
    Draw,
}

#[derive(PartialEq, Eq, Clone, Debug, Serialize)]
pub struct PlayedMove {
    pub player: Player,
    pub square: Position,
    pub captured: Vec<Position>,
    /// Sides that had to pass right after this move.
    pub passed: Vec<Player>,
}

/// One human-vs-engine game.
pub struct Game<R: Rng = StdRng> {
    pub started: bool,
    pub human: Player,
    pub difficulty: Difficulty,
    pub board: Board,
    pub turn: Player,
    pub turns_left: u8,
    over: bool,
    engine: Engine<R>,
}

impl Game {
    pub fn new(difficulty: Difficulty) -> Self {
        Self::with_engine(difficulty, Engine::new())
    }
}

impl<R: Rng> Game<R> {
    pub fn with_engine(difficulty: Difficulty, engine: Engine<R>) -> Self {
        Self {
            started: false,
            human: Player::Black,
            difficulty,
            board: Board::new(),
            turn: Player::Black,
            turns_left: TOTAL_TURNS,
            over: false,
            engine,
        }
    }

    pub fn start(&mut self, human: Player, difficulty: Difficulty) {
        self.started = true;
        self.human = human;
        self.difficulty = difficulty;
        self.board = Board::new();
        self.turn = Player::Black;
        self.turns_left = TOTAL_TURNS;
        self.over = false;
        info!("New game: human plays {}, difficulty {:?}", human, difficulty);
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn score(&self) -> (usize, usize) {
        (self.board.count(Player::Black), self.board.count(Player::White))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        if !self.is_over() {
            return None;
        }
        let (black, white) = self.score();
        Some(if black > white {
            Outcome::Black
        } else if white > black {
            Outcome::White
        } else {
            Outcome::Draw
        })
    }

    pub fn legal_moves(&self) -> Vec<Position> {
        if self.is_over() { Vec::new() } else { self.board.legal_moves(self.turn) }
    }

    /// Checks `square` for the side to move without playing it.
    pub fn check(&self, square: Position) -> MoveCheck {
        self.board.validate_move(square, self.turn)
    }

    /// Plays `square` for the human.
    pub fn play(&mut self, square: Position) -> Result<PlayedMove, Error> {
        if !self.started {
            return Err(Error::new(ErrorKind::InvalidInput, "Game has not started yet"));
        }
        if self.over {
            return Err(Error::new(ErrorKind::InvalidInput, "Game is over"));
        }
        if self.turn != self.human {
            return Err(Error::new(ErrorKind::InvalidInput, "Not your turn"));
        }
        self.make_move(square)
    }

    fn make_move(&mut self, square: Position) -> Result<PlayedMove, Error> {
        if self.over {
            return Err(Error::new(ErrorKind::InvalidInput, "Game is over"));
        }
        let check = self.board.validate_move(square, self.turn);
        if !check.is_valid {
            return Err(Error::new(ErrorKind::InvalidInput, "Illegal move"));
        }

        let player = self.turn;
        self.board = self.board.place(square, player, &check.captured);
        self.turn = player.opponent();
        self.turns_left = self.turns_left.saturating_sub(1);
        let passed = self.resolve_passes();
        Ok(PlayedMove { player, square, captured: check.captured, passed })
    }

    /// Hands the turn over while the side to move is stuck, ending the game once neither side can move.
    fn resolve_passes(&mut self) -> Vec<Player> {
        let mut passed = Vec::new();
        let (black, white) = self.score();
        if self.turns_left == 0 || self.board.count_empty() == 0 || black == 0 || white == 0 {
            self.over = true;
            return passed;
        }
        if self.board.legal_moves(self.turn).is_empty() {
            if self.board.legal_moves(self.turn.opponent()).is_empty() {
                self.over = true;
            } else {
                info!("{} has no moves and passes", self.turn);
                passed.push(self.turn);
                self.turn = self.turn.opponent();
            }
        }
        passed
    }

    /// Plays one engine move if it is the engine's turn.
    pub fn engine_turn(&mut self) -> Option<PlayedMove> {
        if !self.started || self.over || self.turn == self.human {
            return None;
        }
        let square = self.engine.best_move(&self.board, self.turn, self.difficulty)?;
        info!("Engine plays {} as {}", square, self.turn);
        let played = match self.make_move(square) {
            Ok(played) => Some(played),
            Err(e) => {
                error!("Engine move {} was rejected: {:?}", square, e);
                None
            }
        };
        debug!("Board after engine move:\n{}", self.board);
        played
    }

    /// Plays engine moves until the human is to move or the game is over.
    pub fn run_engine(&mut self) -> Vec<PlayedMove> {
        let mut moves = Vec::new();
        while let Some(played) = self.engine_turn() {
            moves.push(played);
        }
        moves
    }
}
