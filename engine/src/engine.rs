use log::debug;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use crate::board::{Board, Player, Position};
use crate::heuristic::{Difficulty, HEURISTICS};

/// Material balance from `player`'s side plus the square weight of the move that led here.
pub fn eval(board: &Board, player: Player, difficulty: Difficulty, last_move: Position) -> i32 {
    let material = board.count(player) as i32 - board.count(player.opponent()) as i32;
    material + HEURISTICS.weight(difficulty, last_move)
}

/// Full-width minimax, always scored for `root`.
pub fn minimax(
        board: &Board,
        depth: u32,
        maximizing: bool,
        root: Player,
        difficulty: Difficulty,
        last_move: Position,
) -> i32 {
    let to_move = if maximizing { root } else { root.opponent() };
    let moves = board.legal_moves(to_move);
    if depth == 0 || moves.is_empty() {
        return eval(board, root, difficulty, last_move);
    }

    let scores = moves.into_iter().map(|mv| {
        let branch = board.apply(mv, to_move);
        minimax(&branch, depth - 1, !maximizing, root, difficulty, mv)
    });
    let best = if maximizing { scores.max() } else { scores.min() };
    // moves is non-empty, so a score always exists
    best.unwrap_or_else(|| eval(board, root, difficulty, last_move))
}

pub struct Engine<R: Rng = StdRng> {
    rng: R,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Engine<R> {
    /// Uses `rng` for the Easy pick; deeper difficulties never touch it.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn best_move(&mut self, board: &Board, player: Player, difficulty: Difficulty) -> Option<Position> {
        let moves = board.legal_moves(player);
        if moves.is_empty() {
            return None;
        }

        if difficulty == Difficulty::Easy {
            let idx = self.rng.random_range(0..moves.len());
            debug!("{} picks {} at random from {} moves", player, moves[idx], moves.len());
            return Some(moves[idx]);
        }

        let depth = difficulty.depth();
        let mut best_score = i32::MIN;
        let mut best_move = None;
        for &mv in &moves {
            let branch = board.apply(mv, player);
            let score = minimax(&branch, depth - 1, false, player, difficulty, mv);
            debug!("{} considers {}: {}", player, mv, score);
            if score > best_score {
                best_score = score;
                best_move = Some(mv);
            }
        }

        let chosen = best_move.or_else(|| moves.first().copied());
        debug!("{} chooses {:?} with score {} at depth {}", player, chosen, best_score, depth);
        chosen
    }
}
