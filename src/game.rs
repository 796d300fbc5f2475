//! Round controller: owns one round and sequences idle → memorize → playing → result.
//!
//! Challenge wins loop back from playing to memorize on the next level instead of
//! ending the round. All inputs are synchronous; stale or out-of-phase inputs are
//! dropped without touching state.

use crate::board::{BlockColor, Board};
use crate::clock::{ClockEvent, RoundClock, TimerHandle};
use crate::level::{self, LevelConfig};
use crate::placement::{self, DragOperation, MoveOutcome, Source, Target};
use crate::scoring;
use crate::{Difficulty, GameMode};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Memorize,
    Playing,
    Result,
}

/// Final report of a round, handed to the caller once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameResult {
    pub correct: usize,
    pub total: usize,
    /// Seconds spent in the play phase of the last level.
    pub time_taken: u32,
    /// Challenge only: the level the run ended on.
    pub level_reached: Option<u32>,
    pub is_win: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Wrong phase, grid not full, or an advance is already pending.
    Ignored,
    /// Challenge level cleared; `level` starts once the pending advance fires.
    Advancing { level: u32 },
    /// Round over.
    Finished(GameResult),
}

pub struct RoundController {
    mode: GameMode,
    difficulty: Option<Difficulty>,
    phase: RoundPhase,
    level: u32,
    config: Option<LevelConfig>,
    board: Option<Board>,
    /// Lives as long as the controller so handles from earlier rounds stay stale.
    clock: RoundClock,
    pending_advance: Option<TimerHandle>,
    rng: StdRng,
}

impl RoundController {
    pub fn new(rng: StdRng) -> Self {
        Self {
            mode: GameMode::Practice,
            difficulty: None,
            phase: RoundPhase::Idle,
            level: 1,
            config: None,
            board: None,
            clock: RoundClock::new(),
            pending_advance: None,
            rng,
        }
    }

    /// Controller seeded from the OS, or from `seed` for reproducible boards.
    pub fn with_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(rng)
    }

    /// Start a new round at level 1, abandoning any round in progress.
    pub fn start(&mut self, mode: GameMode, difficulty: Option<Difficulty>) {
        self.clock.stop();
        self.pending_advance = None;
        self.mode = mode;
        self.difficulty = difficulty;
        self.level = 1;
        info!("round start: mode={mode:?} difficulty={difficulty:?}");
        self.enter_level();
    }

    fn enter_level(&mut self) {
        self.load_level(level::resolve(self.mode, self.difficulty, self.level));
    }

    fn load_level(&mut self, config: LevelConfig) {
        let board = Board::generate(&config, &mut self.rng);
        debug!(
            "level {}: {}x{} grid, {} colours, {}s, distractor={:?}",
            self.level,
            config.grid_size,
            config.grid_size,
            config.color_count,
            config.memorize_secs,
            board.distractor.map(BlockColor::name)
        );
        self.config = Some(config);
        self.board = Some(board);
        self.phase = RoundPhase::Memorize;
        if config.memorize_secs == 0 {
            self.begin_play();
        } else {
            self.clock.start_countdown(config.memorize_secs);
        }
    }

    fn begin_play(&mut self) {
        debug!("level {}: memorize over, playing", self.level);
        self.phase = RoundPhase::Playing;
        self.clock.start_count_up();
    }

    /// Handle for the running tick timer; the driver passes it back with each tick.
    pub fn tick_handle(&self) -> Option<TimerHandle> {
        self.clock.tick_handle()
    }

    /// One second passed for the timer identified by `handle`.
    pub fn tick(&mut self, handle: TimerHandle) {
        if !matches!(self.phase, RoundPhase::Memorize | RoundPhase::Playing) {
            return;
        }
        match self.clock.tick(handle) {
            ClockEvent::MemorizeExpired if self.phase == RoundPhase::Memorize => self.begin_play(),
            ClockEvent::Ignored => debug!("stale tick dropped"),
            _ => {}
        }
    }

    fn accepts_moves(&self) -> bool {
        self.phase == RoundPhase::Playing && self.pending_advance.is_none()
    }

    /// Move a token. Ignored outside the play phase.
    pub fn move_token(&mut self, from: Source, to: Target) -> MoveOutcome {
        if !self.accepts_moves() {
            return MoveOutcome::Ignored;
        }
        match self.board.as_mut() {
            Some(board) => placement::apply_move(board, from, to),
            None => MoveOutcome::Ignored,
        }
    }

    /// Start a drag from `source`, if the play phase is on and the source holds a token.
    pub fn begin_drag(&self, source: Source) -> Option<DragOperation> {
        if !self.accepts_moves() {
            return None;
        }
        self.board.as_ref().and_then(|b| DragOperation::begin(b, source))
    }

    /// Drop a drag started with [`RoundController::begin_drag`]. A drag whose source no
    /// longer holds the lifted colour is ignored.
    pub fn drop_drag(&mut self, drag: DragOperation, to: Target) -> MoveOutcome {
        if !self.board.as_ref().is_some_and(|b| drag.is_current(b)) {
            return MoveOutcome::Ignored;
        }
        self.move_token(drag.source, to)
    }

    /// Submit the grid. Only a full grid in the play phase is scored.
    pub fn submit(&mut self) -> SubmitOutcome {
        if !self.accepts_moves() {
            return SubmitOutcome::Ignored;
        }
        let Some(board) = self.board.as_ref() else {
            return SubmitOutcome::Ignored;
        };
        let Some(score) = scoring::evaluate(&board.grid, &board.solution) else {
            debug!("submit with empty cells ignored");
            return SubmitOutcome::Ignored;
        };
        let time_taken = self.clock.play_time();
        self.clock.stop();

        match (self.mode, score.is_win) {
            (GameMode::Challenge, true) => {
                self.pending_advance = Some(self.clock.arm_deferred());
                info!("level {} cleared in {time_taken}s", self.level);
                SubmitOutcome::Advancing {
                    level: self.level.saturating_add(1),
                }
            }
            (mode, _) => {
                let result = GameResult {
                    correct: score.correct,
                    total: score.total,
                    time_taken,
                    level_reached: (mode == GameMode::Challenge).then_some(self.level),
                    is_win: score.is_win,
                };
                self.phase = RoundPhase::Result;
                info!(
                    "round over: {}/{} correct in {time_taken}s, level={:?}, win={}",
                    result.correct, result.total, result.level_reached, result.is_win
                );
                SubmitOutcome::Finished(result)
            }
        }
    }

    /// Handle of the pending challenge advance, if a level was just cleared.
    pub fn pending_advance(&self) -> Option<TimerHandle> {
        self.pending_advance
    }

    /// Run the pending advance: next level, new board, memorize again.
    /// False for a stale handle.
    pub fn fire_advance(&mut self, handle: TimerHandle) -> bool {
        if self.pending_advance != Some(handle) || !self.clock.fire_deferred(handle) {
            debug!("stale level advance dropped");
            return false;
        }
        self.pending_advance = None;
        self.level = self.level.saturating_add(1);
        self.enter_level();
        true
    }

    /// Abandon the round from any phase. Cancels timers and drops the board; no result.
    pub fn exit(&mut self) {
        if self.phase != RoundPhase::Idle {
            info!("round exited at level {} in {:?}", self.level, self.phase);
        }
        self.clock.stop();
        self.pending_advance = None;
        self.board = None;
        self.config = None;
        self.phase = RoundPhase::Idle;
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn config(&self) -> Option<&LevelConfig> {
        self.config.as_ref()
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn grid_size(&self) -> usize {
        self.board.as_ref().map_or(0, |b| b.grid_size)
    }

    /// The pattern to memorize; hidden outside the memorize phase.
    pub fn solution(&self) -> Option<&[BlockColor]> {
        match (&self.board, self.phase) {
            (Some(board), RoundPhase::Memorize) => Some(&board.solution),
            _ => None,
        }
    }

    pub fn grid(&self) -> &[Option<BlockColor>] {
        self.board.as_ref().map(|b| b.grid.as_slice()).unwrap_or_default()
    }

    pub fn palette(&self) -> &[BlockColor] {
        self.board.as_ref().map(|b| b.palette.as_slice()).unwrap_or_default()
    }

    pub fn is_grid_full(&self) -> bool {
        self.board.as_ref().is_some_and(Board::is_full)
    }

    pub fn time_left(&self) -> u32 {
        self.clock.time_left()
    }

    pub fn play_time(&self) -> u32 {
        self.clock.play_time()
    }

    /// A cleared challenge level is waiting for its advance.
    pub fn is_advancing(&self) -> bool {
        self.pending_advance.is_some()
    }

    #[cfg(test)]
    pub(crate) fn replace_board(&mut self, board: Board) {
        self.board = Some(board);
    }

    /// Start a single round on a hand-made level instead of a resolved one.
    #[cfg(test)]
    fn start_with_config(&mut self, mode: GameMode, config: LevelConfig) {
        self.clock.stop();
        self.pending_advance = None;
        self.mode = mode;
        self.difficulty = None;
        self.level = 1;
        self.load_level(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BlockColor::{Amber, Blue, Red};

    fn controller() -> RoundController {
        RoundController::with_seed(Some(0xC0FFEE))
    }

    /// Tick through the memorize countdown.
    fn finish_memorize(ctrl: &mut RoundController) {
        let secs = ctrl.config().map_or(0, |c| c.memorize_secs);
        let handle = ctrl.tick_handle().expect("countdown running");
        for _ in 0..secs {
            ctrl.tick(handle);
        }
        assert_eq!(ctrl.phase(), RoundPhase::Playing);
    }

    /// Place `pattern` cell by cell, taking each colour from the palette.
    fn fill(ctrl: &mut RoundController, pattern: &[BlockColor]) {
        for (cell, color) in pattern.iter().enumerate() {
            let idx = ctrl
                .palette()
                .iter()
                .position(|c| c == color)
                .expect("colour available in palette");
            let out = ctrl.move_token(Source::Palette(idx), Target::Grid(cell));
            assert!(matches!(out, MoveOutcome::Placed { .. }));
        }
    }

    fn fill_solution(ctrl: &mut RoundController) {
        let solution = ctrl.board().unwrap().solution.clone();
        fill(ctrl, &solution);
    }

    /// Known 2×2 board that can be filled wrongly.
    fn mixed_board() -> Board {
        let solution = vec![Red, Blue, Red, Amber];
        Board {
            grid_size: 2,
            palette: vec![Amber, Red, Blue, Red],
            grid: vec![None; 4],
            solution,
            distractor: None,
        }
    }

    fn fill_wrong(ctrl: &mut RoundController) {
        ctrl.replace_board(mixed_board());
        fill(ctrl, &[Blue, Red, Red, Amber]);
    }

    #[test]
    fn practice_easy_scenario() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Practice, Some(Difficulty::Easy));
        assert_eq!(ctrl.phase(), RoundPhase::Memorize);
        assert_eq!(ctrl.grid_size(), 2);
        assert_eq!(ctrl.time_left(), 5);
        assert_eq!(ctrl.solution().map(<[_]>::len), Some(4));

        finish_memorize(&mut ctrl);
        assert_eq!(ctrl.time_left(), 0);
        assert_eq!(ctrl.solution(), None);

        fill_solution(&mut ctrl);
        let out = ctrl.submit();
        assert_eq!(
            out,
            SubmitOutcome::Finished(GameResult {
                correct: 4,
                total: 4,
                time_taken: 0,
                level_reached: None,
                is_win: true,
            })
        );
        assert_eq!(ctrl.phase(), RoundPhase::Result);
    }

    #[test]
    fn practice_loss_reports_partial_score() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Practice, Some(Difficulty::Easy));
        finish_memorize(&mut ctrl);
        fill_wrong(&mut ctrl);
        let SubmitOutcome::Finished(result) = ctrl.submit() else {
            panic!("practice always finishes");
        };
        assert_eq!((result.correct, result.total, result.is_win), (2, 4, false));
        assert_eq!(result.level_reached, None);
    }

    #[test]
    fn play_time_counts_into_result() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Practice, Some(Difficulty::Medium));
        finish_memorize(&mut ctrl);
        let play = ctrl.tick_handle().unwrap();
        for _ in 0..7 {
            ctrl.tick(play);
        }
        fill_solution(&mut ctrl);
        let SubmitOutcome::Finished(result) = ctrl.submit() else {
            panic!("practice always finishes");
        };
        assert_eq!(result.time_taken, 7);
        // Clock stopped on submit.
        ctrl.tick(play);
        assert_eq!(ctrl.play_time(), 7);
    }

    #[test]
    fn inputs_outside_play_phase_are_ignored() {
        let mut ctrl = controller();
        assert_eq!(ctrl.submit(), SubmitOutcome::Ignored);
        assert_eq!(ctrl.move_token(Source::Palette(0), Target::Grid(0)), MoveOutcome::Ignored);

        ctrl.start(GameMode::Practice, None);
        let before = ctrl.board().cloned();
        assert_eq!(ctrl.move_token(Source::Palette(0), Target::Grid(0)), MoveOutcome::Ignored);
        assert_eq!(ctrl.begin_drag(Source::Palette(0)), None);
        assert_eq!(ctrl.submit(), SubmitOutcome::Ignored);
        assert_eq!(ctrl.board().cloned(), before);
    }

    #[test]
    fn partial_grid_submission_is_ignored() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Practice, Some(Difficulty::Easy));
        finish_memorize(&mut ctrl);
        ctrl.move_token(Source::Palette(0), Target::Grid(0));
        assert_eq!(ctrl.submit(), SubmitOutcome::Ignored);
        assert_eq!(ctrl.phase(), RoundPhase::Playing);
        assert!(ctrl.tick_handle().is_some());
    }

    #[test]
    fn drag_round_trip_through_controller() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Practice, Some(Difficulty::Easy));
        finish_memorize(&mut ctrl);
        let drag = ctrl.begin_drag(Source::Palette(0)).unwrap();
        let out = ctrl.drop_drag(drag, Target::Grid(3));
        assert_eq!(out, MoveOutcome::Placed { displaced: None });
        assert_eq!(ctrl.grid()[3], Some(drag.color));
        assert!(ctrl.board().unwrap().is_conserved());
    }

    #[test]
    fn stale_drag_drop_is_ignored() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Practice, Some(Difficulty::Easy));
        finish_memorize(&mut ctrl);
        ctrl.replace_board(mixed_board());
        let drag = ctrl.begin_drag(Source::Palette(0)).unwrap();
        assert_eq!(drag.color, Amber);
        // The amber token leaves slot 0 before the drag lands.
        ctrl.move_token(Source::Palette(0), Target::Grid(0));
        let before = ctrl.board().cloned();
        assert_eq!(ctrl.drop_drag(drag, Target::Grid(1)), MoveOutcome::Ignored);
        assert_eq!(ctrl.board().cloned(), before);
    }

    #[test]
    fn zero_memorize_time_starts_play_at_once() {
        let mut ctrl = controller();
        let config = LevelConfig {
            grid_size: 2,
            color_count: 3,
            memorize_secs: 0,
            distraction: false,
        };
        ctrl.start_with_config(GameMode::Practice, config);
        assert_eq!(ctrl.phase(), RoundPhase::Playing);
        assert!(ctrl.solution().is_none());
        assert_eq!(ctrl.time_left(), 0);

        let handle = ctrl.tick_handle().expect("count-up running");
        ctrl.tick(handle);
        ctrl.tick(handle);
        assert_eq!(ctrl.play_time(), 2);
        assert_eq!(ctrl.time_left(), 0);
        assert_eq!(ctrl.phase(), RoundPhase::Playing);
    }

    #[test]
    fn challenge_levels_increment_on_each_win() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Challenge, None);
        for level in 1..=14 {
            assert_eq!(ctrl.level(), level);
            assert_eq!(ctrl.phase(), RoundPhase::Memorize);
            finish_memorize(&mut ctrl);
            fill_solution(&mut ctrl);
            assert_eq!(ctrl.submit(), SubmitOutcome::Advancing { level: level + 1 });
            assert_eq!(ctrl.phase(), RoundPhase::Playing);
            assert!(ctrl.is_advancing());

            // Locked while the advance is pending.
            assert_eq!(ctrl.submit(), SubmitOutcome::Ignored);
            assert_eq!(ctrl.move_token(Source::Grid(0), Target::Palette), MoveOutcome::Ignored);

            let handle = ctrl.pending_advance().unwrap();
            assert!(ctrl.fire_advance(handle));
            assert!(!ctrl.fire_advance(handle));
        }
        assert_eq!(ctrl.level(), 15);
        assert_eq!(ctrl.grid_size(), 4);
        assert!(ctrl.board().unwrap().distractor.is_some());
    }

    #[test]
    fn challenge_loss_reports_level_reached() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Challenge, None);
        for _ in 0..2 {
            finish_memorize(&mut ctrl);
            fill_solution(&mut ctrl);
            let handle = match ctrl.submit() {
                SubmitOutcome::Advancing { .. } => ctrl.pending_advance().unwrap(),
                other => panic!("expected advance, got {other:?}"),
            };
            ctrl.fire_advance(handle);
        }
        assert_eq!(ctrl.level(), 3);
        finish_memorize(&mut ctrl);
        fill_wrong(&mut ctrl);
        let SubmitOutcome::Finished(result) = ctrl.submit() else {
            panic!("challenge loss finishes the round");
        };
        assert_eq!(result.level_reached, Some(3));
        assert!(!result.is_win);
        assert_eq!(ctrl.phase(), RoundPhase::Result);
        assert_eq!(ctrl.pending_advance(), None);
    }

    #[test]
    fn board_is_conserved_through_play() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Practice, Some(Difficulty::Hard));
        finish_memorize(&mut ctrl);
        assert!(ctrl.board().unwrap().is_conserved());
        fill_solution(&mut ctrl);
        ctrl.move_token(Source::Grid(0), Target::Grid(5));
        ctrl.move_token(Source::Grid(3), Target::Palette);
        ctrl.move_token(Source::Palette(0), Target::Grid(0));
        assert!(ctrl.board().unwrap().is_conserved());
    }

    #[test]
    fn exit_mid_memorize_drops_ghost_ticks() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Practice, Some(Difficulty::Easy));
        let old = ctrl.tick_handle().unwrap();
        ctrl.exit();
        assert_eq!(ctrl.phase(), RoundPhase::Idle);
        assert!(ctrl.board().is_none());
        assert_eq!(ctrl.tick_handle(), None);

        ctrl.start(GameMode::Practice, Some(Difficulty::Medium));
        for _ in 0..10 {
            ctrl.tick(old);
        }
        assert_eq!(ctrl.phase(), RoundPhase::Memorize);
        assert_eq!(ctrl.time_left(), 5);
    }

    #[test]
    fn exit_mid_play_drops_ghost_ticks() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Practice, Some(Difficulty::Easy));
        finish_memorize(&mut ctrl);
        let old = ctrl.tick_handle().unwrap();
        ctrl.tick(old);
        ctrl.exit();

        ctrl.start(GameMode::Practice, Some(Difficulty::Easy));
        finish_memorize(&mut ctrl);
        ctrl.tick(old);
        assert_eq!(ctrl.play_time(), 0);
    }

    #[test]
    fn exit_during_pending_advance_cancels_it() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Challenge, None);
        finish_memorize(&mut ctrl);
        fill_solution(&mut ctrl);
        assert!(matches!(ctrl.submit(), SubmitOutcome::Advancing { .. }));
        let ghost = ctrl.pending_advance().unwrap();
        ctrl.exit();

        ctrl.start(GameMode::Challenge, None);
        assert!(!ctrl.fire_advance(ghost));
        assert_eq!(ctrl.level(), 1);
        assert_eq!(ctrl.phase(), RoundPhase::Memorize);
    }

    #[test]
    fn restart_resets_level() {
        let mut ctrl = controller();
        ctrl.start(GameMode::Challenge, None);
        finish_memorize(&mut ctrl);
        fill_solution(&mut ctrl);
        ctrl.submit();
        let h = ctrl.pending_advance().unwrap();
        ctrl.fire_advance(h);
        assert_eq!(ctrl.level(), 2);
        ctrl.start(GameMode::Challenge, None);
        assert_eq!(ctrl.level(), 1);
    }
}
