mod board;
mod engine;
mod game;
mod heuristic;

use std::io::{Error, ErrorKind};
use std::sync::{Arc, Mutex};
use clap::Parser;
use log::{info, error};
use rand::Rng;
use tokio::net::{TcpListener, TcpStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::protocol::Message;
use crate::board::{Player, Position};
use crate::game::{Game, PlayedMove};
use crate::heuristic::{Difficulty, HEURISTICS};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 999)]
    port: u16,
    /// Engine strength used when a start message does not name one
    #[arg(long, value_enum, default_value_t = Difficulty::Medium)]
    difficulty: Difficulty,
    #[arg(long, default_value = "info")]
    log_level: log::Level,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    simple_logger::init_with_level(args.log_level)
        .map_err(|e| Error::new(ErrorKind::Other, e))?;
    lazy_static::initialize(&HEURISTICS);

    let address = format!("{}:{}", args.host, args.port);

    // Bind the server to a local port
    let listener = TcpListener::bind(address.clone()).await?;
    info!("Listening on: {} (default difficulty {:?})", address, args.difficulty);

    while let Ok((stream, _)) = listener.accept().await {
        let difficulty = args.difficulty;
        tokio::spawn(async move {
            if let Err(e) = accept_connection(stream, difficulty).await {
                error!("Connection closed with error: {:?}", e);
            }
        });
    }

    Ok(())
}

async fn accept_connection(stream: TcpStream, difficulty: Difficulty) -> Result<(), Error> {
    let addr = stream.peer_addr()?;
    info!("Peer address: {}", addr);

    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| Error::new(ErrorKind::ConnectionAborted, e))?;
    info!("New WebSocket connection: {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let game_mutex = Arc::new(Mutex::new(Game::new(difficulty)));

    while let Some(raw_message) = read.next().await {
        match raw_message {
            Ok(text_message) => {
                if !text_message.is_text() && !text_message.is_binary() { continue; }
                match serde_json::from_slice::<Value>(&text_message.into_data()) {
                    Ok(data) => {
                        info!("Received: {}", data);
                        let result: Result<Value, Error> = handle_message(&game_mutex, data).await;
                        let response = match result {
                            Ok(resp) => resp,
                            Err(e) => {
                                error!("Error handling message: {:?}", e);
                                json!({"error": e.to_string()})
                            }
                        };
                        let response_str = response.to_string();
                        write.send(Message::text(response_str.clone())).await
                            .map_err(|e| Error::new(ErrorKind::BrokenPipe, e))?;
                        info!("Sent: {}", response_str);
                    },
                    Err(e) => { error!("Error parsing JSON: {:?}", e); }
                }
            }
            Err(e) => { error!("Error reading websocket message: {:?}", e); }
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

async fn handle_message<R: Rng>(game_mutex: &Arc<Mutex<Game<R>>>, data: Value) -> Result<Value, Error> {
    let mut game = game_mutex.lock()
        .map_err(|_| Error::new(ErrorKind::Other, "Game state is poisoned"))?;

    let map = data.as_object()
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "Expected a dict"))?;

    // client message protocol: "start", "move", "check"
    // server message protocol: "board", "legal_moves", "moves", "passed", "valid", "error", "end"
    if map.contains_key("start") {
        let human_is_black = data["start"].as_bool().ok_or_else(
            || Error::new(ErrorKind::InvalidInput, "Expected boolean field: start")
        )?;
        let difficulty = match map.get("difficulty") {
            Some(value) => serde_json::from_value(value.clone())?,
            None => game.difficulty,
        };
        handle_start(&mut game, human_is_black, difficulty)
    } else if map.contains_key("move") {
        let square: Position = serde_json::from_value(data["move"].clone())?;
        handle_move(&mut game, square)
    } else if map.contains_key("check") {
        if !game.started {
            return Err(Error::new(ErrorKind::InvalidInput, "Game has not started yet"));
        }
        let square: Position = serde_json::from_value(data["check"].clone())?;
        Ok(serde_json::to_value(game.check(square))?)
    } else {
        Err(Error::new(ErrorKind::InvalidInput, format!("Invalid message: {}", data)))
    }
}

fn handle_start<R: Rng>(game: &mut Game<R>, human_is_black: bool, difficulty: Difficulty) -> Result<Value, Error> {
    let human = if human_is_black { Player::Black } else { Player::White };
    game.start(human, difficulty);
    let moves = game.run_engine();
    game_state(game, moves)
}

fn handle_move<R: Rng>(game: &mut Game<R>, square: Position) -> Result<Value, Error> {
    let mut moves = vec![game.play(square)?];
    moves.extend(game.run_engine());
    game_state(game, moves)
}

fn game_state<R: Rng>(game: &Game<R>, moves: Vec<PlayedMove>) -> Result<Value, Error> {
    let (black, white) = game.score();
    let passed: Vec<Player> = moves.iter().flat_map(|played| played.passed.iter().copied()).collect();
    let mut state = json!({
        "board": game.board,
        "turn": game.turn,
        "legal_moves": game.legal_moves(),
        "moves": moves,
        "passed": passed,
        "score": { "black": black, "white": white },
        "turns_left": game.turns_left,
    });
    if let Some(outcome) = game.outcome() {
        info!("Game over: {:?} ({} - {})", outcome, black, white);
        state["end"] = serde_json::to_value(outcome)?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::board::{Board, Cell};
    use crate::engine::Engine;

    fn session(difficulty: Difficulty) -> Arc<Mutex<Game<StdRng>>> {
        Arc::new(Mutex::new(Game::with_engine(difficulty, Engine::with_rng(StdRng::seed_from_u64(5)))))
    }

    #[tokio::test]
    async fn test_start_as_black() {
        let game = session(Difficulty::Medium);
        let state = handle_message(&game, json!({"start": true})).await.unwrap();
        assert_eq!(state["turn"], "black");
        assert_eq!(state["legal_moves"], json!([[2, 3], [3, 2], [4, 5], [5, 4]]));
        assert_eq!(state["moves"], json!([]));
        assert_eq!(state["passed"], json!([]));
        assert_eq!(state["score"], json!({"black": 2, "white": 2}));
        assert_eq!(state["turns_left"], 60);
        assert!(state.get("end").is_none());
    }

    #[tokio::test]
    async fn test_start_as_white_engine_moves_first() {
        let game = session(Difficulty::Medium);
        let state = handle_message(&game, json!({"start": false, "difficulty": "hard"})).await.unwrap();
        assert_eq!(state["turn"], "white");
        assert_eq!(state["moves"][0]["player"], "black");
        assert_eq!(game.lock().unwrap().difficulty, Difficulty::Hard);
    }

    #[tokio::test]
    async fn test_move_gets_engine_reply() {
        let game = session(Difficulty::Medium);
        handle_message(&game, json!({"start": true})).await.unwrap();
        let state = handle_message(&game, json!({"move": [2, 3]})).await.unwrap();
        assert_eq!(state["moves"][0]["square"], json!([2, 3]));
        assert_eq!(state["moves"][0]["captured"], json!([[3, 3]]));
        assert_eq!(state["moves"][1]["player"], "white");
        assert_eq!(state["turn"], "black");
        assert_eq!(state["turns_left"], 58);
    }

    #[tokio::test]
    async fn test_check() {
        let game = session(Difficulty::Easy);
        handle_message(&game, json!({"start": true})).await.unwrap();
        let check = handle_message(&game, json!({"check": [2, 3]})).await.unwrap();
        assert_eq!(check, json!({"valid": true, "captured": [[3, 3]]}));
        let check = handle_message(&game, json!({"check": [0, 0]})).await.unwrap();
        assert_eq!(check, json!({"valid": false, "captured": []}));
    }

    #[tokio::test]
    async fn test_bad_messages() {
        let game = session(Difficulty::Easy);
        assert!(handle_message(&game, json!({"move": [2, 3]})).await.is_err());
        assert!(handle_message(&game, json!([1, 2])).await.is_err());
        assert!(handle_message(&game, json!({"start": "yes"})).await.is_err());
        assert!(handle_message(&game, json!({"start": true, "difficulty": "expert"})).await.is_err());
        handle_message(&game, json!({"start": true})).await.unwrap();
        assert!(handle_message(&game, json!({"move": [9, 9]})).await.is_err());
        assert!(handle_message(&game, json!({"move": [0, 0]})).await.is_err());
        assert!(handle_message(&game, json!({"hello": 1})).await.is_err());
    }

    #[tokio::test]
    async fn test_stuck_engine_passes_back() {
        let game = session(Difficulty::Medium);
        handle_message(&game, json!({"start": true})).await.unwrap();
        {
            // White's only bracketing line runs into the occupied corner
            let mut board = Board::empty();
            board.set(Position::new(0, 0), Cell::Black);
            board.set(Position::new(0, 1), Cell::White);
            board.set(Position::new(1, 1), Cell::Black);
            board.set(Position::new(2, 2), Cell::White);
            game.lock().unwrap().board = board;
        }
        let state = handle_message(&game, json!({"move": [0, 2]})).await.unwrap();
        assert_eq!(state["passed"], json!(["white"]));
        assert_eq!(state["moves"].as_array().unwrap().len(), 1);
        assert_eq!(state["moves"][0]["passed"], json!(["white"]));
        assert_eq!(state["turn"], "black");
        assert_eq!(state["legal_moves"], json!([[3, 3]]));
        assert!(state.get("end").is_none());
    }
}
