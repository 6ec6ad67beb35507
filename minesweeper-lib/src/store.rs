use std::{collections::HashMap, sync::RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    difficulty::DifficultySetting,
    game::{Game, GameStatus, Move},
    persist::{serialize_board, BOARD_PLACEHOLDER, BOARD_QUIT},
    replay::MinesweeperReplay,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Game with id {0} doesn't exist")]
    NotFound(String),
    #[error("Game with id {0} already exists")]
    AlreadyExists(String),
    #[error("Game with id {0} is already finished")]
    Finished(String),
    #[error("Store lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Won,
    Lost,
    /// Abandoned mid-game. Not a board state, only bookkeeping.
    Quit,
}

impl GameOutcome {
    pub fn from_status(status: GameStatus) -> Option<Self> {
        match status {
            GameStatus::Won => Some(Self::Won),
            GameStatus::Lost => Some(Self::Lost),
            GameStatus::Ready | GameStatus::Playing => None,
        }
    }
}

/// A game as kept by the store. Board fields hold either a JSON cell grid or
/// a placeholder string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub difficulty: DifficultySetting,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub outcome: Option<GameOutcome>,
    /// Mine layout only.
    pub true_board: String,
    /// Last saved board, with play state.
    pub board_state: String,
    pub moves: Vec<Move>,
}

impl GameRecord {
    pub fn new(game_id: &str, difficulty: DifficultySetting) -> Self {
        GameRecord {
            game_id: game_id.to_string(),
            difficulty,
            start_time: None,
            end_time: None,
            outcome: None,
            true_board: BOARD_PLACEHOLDER.to_string(),
            board_state: BOARD_PLACEHOLDER.to_string(),
            moves: Vec::new(),
        }
    }

    pub fn from_game(game_id: &str, game: &Game) -> Result<Self, StoreError> {
        let mut record = Self::new(game_id, game.setting());
        record.update_from(game)?;
        Ok(record)
    }

    fn update_from(&mut self, game: &Game) -> Result<(), StoreError> {
        if game.status() != GameStatus::Ready {
            self.true_board = serialize_board(&game.mine_layout())?;
            self.board_state = serialize_board(game.board())?;
        }
        self.start_time = game.start_time();
        self.end_time = game.end_time();
        self.outcome = GameOutcome::from_status(game.status());
        self.moves = game.moves().to_vec();
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn seconds(&self) -> Option<i64> {
        let start = self.start_time?;
        let end = self.end_time?;
        Some((end - start).num_seconds().max(0))
    }

    pub fn review(&self) -> MinesweeperReplay {
        MinesweeperReplay::from_persisted(
            self.difficulty,
            &self.true_board,
            &self.board_state,
            self.moves.clone(),
            self.start_time,
        )
    }
}

/// Persistence for game records, keyed by game id.
pub trait GameStore {
    fn create_game(
        &self,
        game_id: &str,
        difficulty: DifficultySetting,
    ) -> Result<GameRecord, StoreError>;

    fn get_game(&self, game_id: &str) -> Result<GameRecord, StoreError>;

    fn append_move(&self, game_id: &str, m: Move) -> Result<(), StoreError>;

    fn save_board_state(
        &self,
        game_id: &str,
        true_board: Option<String>,
        board_state: String,
    ) -> Result<(), StoreError>;

    fn finish_game(
        &self,
        game_id: &str,
        outcome: GameOutcome,
        end_time: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    fn quit_game(&self, game_id: &str, end_time: DateTime<Utc>) -> Result<(), StoreError> {
        self.save_board_state(game_id, None, BOARD_QUIT.to_string())?;
        self.finish_game(game_id, GameOutcome::Quit, end_time)
    }

    /// Brings the stored record up to date with a running session.
    fn save_game(&self, game_id: &str, game: &Game) -> Result<(), StoreError> {
        let stored = self.get_game(game_id)?;
        if stored.is_completed() {
            return Err(StoreError::Finished(game_id.to_string()));
        }
        if game.status() != GameStatus::Ready {
            self.save_board_state(
                game_id,
                Some(serialize_board(&game.mine_layout())?),
                serialize_board(game.board())?,
            )?;
        }
        for m in game.moves().iter().skip(stored.moves.len()) {
            self.append_move(game_id, *m)?;
        }
        if let (Some(outcome), Some(end_time)) =
            (GameOutcome::from_status(game.status()), game.end_time())
        {
            self.finish_game(game_id, outcome, end_time)?;
        }
        Ok(())
    }
}

/// In-process store, used by the terminal client and tests.
#[derive(Default)]
pub struct MemoryStore {
    games: RwLock<HashMap<String, GameRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_open_game<T>(
        &self,
        game_id: &str,
        f: impl FnOnce(&mut GameRecord) -> T,
    ) -> Result<T, StoreError> {
        let mut games = self.games.write().map_err(|_| StoreError::Poisoned)?;
        let record = games
            .get_mut(game_id)
            .ok_or_else(|| StoreError::NotFound(game_id.to_string()))?;
        if record.is_completed() {
            return Err(StoreError::Finished(game_id.to_string()));
        }
        Ok(f(record))
    }
}

impl GameStore for MemoryStore {
    fn create_game(
        &self,
        game_id: &str,
        difficulty: DifficultySetting,
    ) -> Result<GameRecord, StoreError> {
        let mut games = self.games.write().map_err(|_| StoreError::Poisoned)?;
        if games.contains_key(game_id) {
            return Err(StoreError::AlreadyExists(game_id.to_string()));
        }
        let record = GameRecord::new(game_id, difficulty);
        games.insert(game_id.to_string(), record.clone());
        Ok(record)
    }

    fn get_game(&self, game_id: &str) -> Result<GameRecord, StoreError> {
        let games = self.games.read().map_err(|_| StoreError::Poisoned)?;
        games
            .get(game_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(game_id.to_string()))
    }

    fn append_move(&self, game_id: &str, m: Move) -> Result<(), StoreError> {
        self.with_open_game(game_id, |record| {
            record.start_time.get_or_insert(m.timestamp);
            record.moves.push(m);
        })
    }

    fn save_board_state(
        &self,
        game_id: &str,
        true_board: Option<String>,
        board_state: String,
    ) -> Result<(), StoreError> {
        self.with_open_game(game_id, |record| {
            if let Some(true_board) = true_board {
                record.true_board = true_board;
            }
            record.board_state = board_state;
        })
    }

    fn finish_game(
        &self,
        game_id: &str,
        outcome: GameOutcome,
        end_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_open_game(game_id, |record| {
            record.outcome = Some(outcome);
            record.end_time = Some(end_time);
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{board::BoardPoint, game::Action};
    use chrono::{Duration, TimeZone};
    use rand::{rngs::StdRng, SeedableRng};

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn lost_game() -> Game {
        let mut rng = StdRng::seed_from_u64(5);
        let mut game = Game::new(DifficultySetting::EASY);
        game.play(Action::Reveal, BoardPoint::new(4, 4), t(0), &mut rng)
            .unwrap();
        let _ = game.play(Action::Flag, BoardPoint::new(0, 0), t(2), &mut rng);
        let mine = game
            .board()
            .iter()
            .find(|c| c.is_mine && !c.is_flagged)
            .map(|c| c.point())
            .unwrap();
        game.play(Action::Reveal, mine, t(9), &mut rng).unwrap();
        game
    }

    #[test]
    fn create_and_get() {
        let store = MemoryStore::new();

        let record = store.create_game("abc", DifficultySetting::EASY).unwrap();

        assert_eq!(record.board_state, BOARD_PLACEHOLDER);
        assert_eq!(store.get_game("abc").unwrap(), record);
        assert!(matches!(
            store.create_game("abc", DifficultySetting::EASY),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            store.get_game("nope"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn save_game_syncs_session_and_review_matches() {
        let store = MemoryStore::new();
        store.create_game("g1", DifficultySetting::EASY).unwrap();
        let game = lost_game();

        store.save_game("g1", &game).unwrap();

        let record = store.get_game("g1").unwrap();
        assert_eq!(record.outcome, Some(GameOutcome::Lost));
        assert_eq!(record.moves, game.moves());
        assert_eq!(record.seconds(), Some(9));
        assert_eq!(record, GameRecord::from_game("g1", &game).unwrap());

        let replay = record.review();
        assert!(replay.warning().is_none());
        let last = replay.final_frame();
        assert_eq!(&last.board, game.board());
        assert!(last.hit_mine);
    }

    #[test]
    fn finished_games_reject_updates() {
        let store = MemoryStore::new();
        store.create_game("g2", DifficultySetting::EASY).unwrap();
        store.save_game("g2", &lost_game()).unwrap();

        let m = Move::new(t(20), crate::game::MoveAction::Flag, BoardPoint::new(1, 1));
        assert!(matches!(
            store.append_move("g2", m),
            Err(StoreError::Finished(_))
        ));
        assert!(matches!(
            store.save_game("g2", &lost_game()),
            Err(StoreError::Finished(_))
        ));
    }

    #[test]
    fn quit_game_marks_board_placeholder() {
        let store = MemoryStore::new();
        store.create_game("g3", DifficultySetting::EASY).unwrap();
        let mut game = Game::new(DifficultySetting::EASY);
        game.play(
            Action::Reveal,
            BoardPoint::new(0, 0),
            t(0),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        store.save_game("g3", &game).unwrap();

        store.quit_game("g3", t(30)).unwrap();

        let record = store.get_game("g3").unwrap();
        assert_eq!(record.outcome, Some(GameOutcome::Quit));
        assert_eq!(record.board_state, BOARD_QUIT);
        // moves survive, so the review still replays them
        let replay = record.review();
        assert_eq!(replay.len(), 2);
        assert_eq!(&replay.final_frame().board, game.board());
    }

    #[test]
    fn empty_record_reviews_as_blank_board() {
        let record = GameRecord::new("g4", DifficultySetting::HARD);

        let replay = record.review();

        assert!(replay.warning().is_none());
        assert_eq!(replay.len(), 1);
        assert_eq!(replay.current_board().cols(), 30);
        assert!(replay.current_board().iter().all(|c| c.is_hidden()));
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = GameRecord::from_game("g5", &lost_game()).unwrap();

        let json = serde_json::to_string(&record).unwrap();

        assert_eq!(serde_json::from_str::<GameRecord>(&json).unwrap(), record);
    }
}
