//! App: terminal init, main loop, 1 Hz ticker, keyboard drag session and screen routing.

use crate::clock::TimerHandle;
use crate::collection::{self, Card, Collection};
use crate::game::{GameResult, RoundController, RoundPhase, SubmitOutcome};
use crate::input::{key_to_action, Action};
use crate::placement::{DragOperation, Source, Target};
use crate::theme::Theme;
use crate::ui::PALETTE_COLS;
use crate::{Difficulty, GameMode, GameOptions};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::{debug, warn};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Round clock resolution.
const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    Result,
    Collection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Difficulty,
    Mode,
    Start,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_difficulty: Difficulty,
    pub selected_mode: GameMode,
    pub animation_start: Instant,
}

impl MenuState {
    fn new(mode: GameMode, difficulty: Difficulty) -> Self {
        Self {
            current_tab: MenuTab::Start,
            selected_difficulty: difficulty,
            selected_mode: mode,
            animation_start: Instant::now(),
        }
    }
}

/// Keyboard stand-in for the pointer: which grid cell or palette slot is under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Grid(usize),
    Palette(usize),
}

impl Cursor {
    /// Move one step. The palette is laid out in rows of [`PALETTE_COLS`]. Down from the
    /// last grid row enters the palette, up from the first palette row re-enters the grid's
    /// last row.
    pub fn step(self, action: Action, grid_size: usize, palette_len: usize) -> Self {
        let gs = grid_size.max(1);
        match (self, action) {
            (Self::Grid(i), Action::Left) if i % gs > 0 => Self::Grid(i - 1),
            (Self::Grid(i), Action::Right) if i % gs + 1 < gs => Self::Grid(i + 1),
            (Self::Grid(i), Action::Up) if i >= gs => Self::Grid(i - gs),
            (Self::Grid(i), Action::Down) if i / gs + 1 < gs => Self::Grid(i + gs),
            (Self::Grid(i), Action::Down) => Self::Palette((i % gs).min(palette_len.saturating_sub(1))),
            (Self::Grid(_), Action::SwitchArea) => Self::Palette(0),
            (Self::Palette(p), Action::Left) if p > 0 => Self::Palette(p - 1),
            (Self::Palette(p), Action::Right) if p + 1 < palette_len => Self::Palette(p + 1),
            (Self::Palette(p), Action::Up) if p >= PALETTE_COLS => Self::Palette(p - PALETTE_COLS),
            (Self::Palette(p), Action::Down) if p + PALETTE_COLS < palette_len => {
                Self::Palette(p + PALETTE_COLS)
            }
            (Self::Palette(p), Action::Up) => Self::Grid((gs - 1) * gs + p.min(gs - 1)),
            (Self::Palette(_), Action::SwitchArea) => Self::Grid(0),
            (cursor, _) => cursor,
        }
    }

    /// Keep the cursor on the board after the palette shrinks or the grid is resized.
    pub fn clamp(self, grid_size: usize, palette_len: usize) -> Self {
        match self {
            Self::Grid(i) => Self::Grid(i.min((grid_size * grid_size).saturating_sub(1))),
            Self::Palette(p) => Self::Palette(p.min(palette_len.saturating_sub(1))),
        }
    }

    fn source(self) -> Source {
        match self {
            Self::Grid(i) => Source::Grid(i),
            Self::Palette(p) => Source::Palette(p),
        }
    }

    fn target(self) -> Target {
        match self {
            Self::Grid(i) => Target::Grid(i),
            Self::Palette(_) => Target::Palette,
        }
    }
}

/// 1 Hz tick source. Rearms a full second out whenever the round swaps timers, and only
/// ever delivers the handle it was armed with.
#[derive(Debug)]
struct Ticker {
    armed: Option<TimerHandle>,
    next_at: Instant,
}

impl Ticker {
    fn new(now: Instant) -> Self {
        Self {
            armed: None,
            next_at: now,
        }
    }

    fn poll(&mut self, current: Option<TimerHandle>, now: Instant) -> Option<TimerHandle> {
        if current != self.armed {
            self.armed = current;
            self.next_at = now + TICK;
            return None;
        }
        let handle = self.armed?;
        if now >= self.next_at {
            self.next_at += TICK;
            Some(handle)
        } else {
            None
        }
    }
}

pub struct App {
    options: GameOptions,
    theme: Theme,
    round: RoundController,
    screen: Screen,
    menu_state: MenuState,
    cursor: Cursor,
    drag: Option<DragOperation>,
    ticker: Ticker,
    /// Pending challenge advance and when to fire it.
    advance_at: Option<(TimerHandle, Instant)>,
    last_result: Option<GameResult>,
    new_unlock: Option<&'static Card>,
    collection: Collection,
    collection_path: Option<PathBuf>,
    /// TachyonFX flash over the board while a cleared level waits to advance.
    level_clear_effect: Option<Effect>,
    level_clear_process_time: Option<Instant>,
}

impl App {
    pub fn new(options: GameOptions, theme: Theme) -> Result<Self> {
        let collection_path = match options.collection_file.clone() {
            Some(path) => Some(path),
            None => collection::default_path()
                .inspect_err(|e| warn!("collection will not be saved: {e}"))
                .ok(),
        };
        let collection = collection_path
            .as_deref()
            .map(collection::load)
            .unwrap_or_default();
        let now = Instant::now();
        let mut app = Self {
            round: RoundController::with_seed(options.seed),
            menu_state: MenuState::new(options.mode, options.difficulty),
            screen: Screen::Menu,
            cursor: Cursor::Palette(0),
            drag: None,
            ticker: Ticker::new(now),
            advance_at: None,
            last_result: None,
            new_unlock: None,
            collection,
            collection_path,
            level_clear_effect: None,
            level_clear_process_time: None,
            theme,
            options,
        };
        if app.options.no_menu {
            app.start_round();
        }
        Ok(app)
    }

    fn start_round(&mut self) {
        let difficulty = (self.options.mode == GameMode::Practice).then_some(self.options.difficulty);
        self.round.start(self.options.mode, difficulty);
        self.screen = Screen::Playing;
        self.reset_interaction();
        self.advance_at = None;
        self.last_result = None;
        self.new_unlock = None;
    }

    fn reset_interaction(&mut self) {
        self.cursor = Cursor::Palette(0);
        self.drag = None;
        self.level_clear_effect = None;
        self.level_clear_process_time = None;
    }

    fn exit_round(&mut self) {
        self.round.exit();
        self.advance_at = None;
        self.reset_interaction();
        self.screen = Screen::Menu;
        self.menu_state.animation_start = Instant::now();
    }

    fn finish_round(&mut self, result: GameResult) {
        let fresh = self
            .collection
            .record(&result, self.round.mode(), self.options.difficulty);
        for card in &fresh {
            log::info!("unlocked card {} ({})", card.id, card.name);
        }
        if !fresh.is_empty() {
            if let Some(path) = self.collection_path.as_deref() {
                if let Err(e) = collection::save(path, &self.collection) {
                    warn!("failed to save collection to {}: {e}", path.display());
                }
            }
        }
        self.new_unlock = fresh.first().copied();
        self.last_result = Some(result);
        self.drag = None;
        self.screen = Screen::Result;
    }

    fn submit(&mut self, now: Instant) {
        match self.round.submit() {
            SubmitOutcome::Finished(result) => self.finish_round(result),
            SubmitOutcome::Advancing { level } => {
                debug!("advancing to level {level}");
                self.drag = None;
                self.advance_at = self
                    .round
                    .pending_advance()
                    .map(|h| (h, now + self.options.advance_delay));
            }
            SubmitOutcome::Ignored => {}
        }
    }

    /// Timers: 1 Hz round clock and the deferred challenge advance.
    fn update(&mut self, now: Instant) {
        if self.screen != Screen::Playing {
            return;
        }
        if let Some(handle) = self.ticker.poll(self.round.tick_handle(), now) {
            self.round.tick(handle);
        }
        if let Some((handle, at)) = self.advance_at {
            if now >= at {
                self.advance_at = None;
                if self.round.fire_advance(handle) {
                    self.reset_interaction();
                }
            }
        }
    }

    fn handle_playing(&mut self, action: Action, now: Instant) {
        if action == Action::Quit {
            self.exit_round();
            return;
        }
        if self.round.phase() != RoundPhase::Playing || self.round.is_advancing() {
            return;
        }
        let grid_size = self.round.grid_size();
        let palette_len = self.round.palette().len();
        match action {
            Action::Up | Action::Down | Action::Left | Action::Right | Action::SwitchArea => {
                self.cursor = self.cursor.step(action, grid_size, palette_len);
            }
            Action::Select => match self.drag.take() {
                None => self.drag = self.round.begin_drag(self.cursor.source()),
                Some(drag) => {
                    let outcome = self.round.drop_drag(drag, self.cursor.target());
                    debug!("drop {:?} -> {:?}: {outcome:?}", drag.source, self.cursor);
                }
            },
            Action::Cancel => {
                if let Some(drag) = self.drag.take() {
                    self.round.drop_drag(drag, Target::Palette);
                }
            }
            Action::Submit if self.drag.is_none() => self.submit(now),
            _ => {}
        }
        self.cursor = self
            .cursor
            .clamp(self.round.grid_size(), self.round.palette().len());
    }

    fn handle_menu(&mut self, action: Action) -> bool {
        let m = &mut self.menu_state;
        match action {
            Action::Quit => return false,
            Action::Up => {
                m.current_tab = match m.current_tab {
                    MenuTab::Difficulty => MenuTab::Collection,
                    MenuTab::Mode => MenuTab::Difficulty,
                    MenuTab::Start => MenuTab::Mode,
                    MenuTab::Collection => MenuTab::Start,
                };
            }
            Action::Down | Action::SwitchArea => {
                m.current_tab = match m.current_tab {
                    MenuTab::Difficulty => MenuTab::Mode,
                    MenuTab::Mode => MenuTab::Start,
                    MenuTab::Start => MenuTab::Collection,
                    MenuTab::Collection => MenuTab::Difficulty,
                };
            }
            Action::Left | Action::Right => {
                let forward = action == Action::Right;
                match m.current_tab {
                    MenuTab::Difficulty => {
                        let i = Difficulty::ALL
                            .iter()
                            .position(|d| *d == m.selected_difficulty)
                            .unwrap_or(0);
                        let n = Difficulty::ALL.len();
                        let next = if forward { (i + 1) % n } else { (i + n - 1) % n };
                        m.selected_difficulty = Difficulty::ALL[next];
                    }
                    MenuTab::Mode => {
                        m.selected_mode = match m.selected_mode {
                            GameMode::Practice => GameMode::Challenge,
                            GameMode::Challenge => GameMode::Practice,
                        };
                    }
                    _ => {}
                }
            }
            Action::Select => match m.current_tab {
                MenuTab::Start => {
                    self.options.mode = m.selected_mode;
                    self.options.difficulty = m.selected_difficulty;
                    self.start_round();
                }
                MenuTab::Collection => self.screen = Screen::Collection,
                _ => m.current_tab = MenuTab::Start,
            },
            Action::Collection => self.screen = Screen::Collection,
            _ => {}
        }
        true
    }

    /// Apply one action. False means leave the app.
    fn handle_action(&mut self, action: Action, now: Instant) -> bool {
        match self.screen {
            Screen::Menu => return self.handle_menu(action),
            Screen::Playing => self.handle_playing(action, now),
            Screen::Result => match action {
                Action::Retry => self.start_round(),
                Action::Collection => self.screen = Screen::Collection,
                Action::Quit | Action::Select | Action::Cancel => self.exit_round(),
                _ => {}
            },
            Screen::Collection => {
                if matches!(action, Action::Quit | Action::Select | Action::Cancel) {
                    self.screen = Screen::Menu;
                }
            }
        }
        true
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        // A pending round must not outlive the terminal session.
        self.round.exit();

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.options.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            self.update(now);

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    crate::ui::View {
                        screen: self.screen,
                        round: &self.round,
                        theme: &self.theme,
                        menu_state: &self.menu_state,
                        cursor: self.cursor,
                        drag: self.drag.as_ref(),
                        result: self.last_result.as_ref(),
                        new_unlock: self.new_unlock,
                        collection: &self.collection,
                        no_animation: self.options.no_animation,
                    },
                    &mut self.level_clear_effect,
                    &mut self.level_clear_process_time,
                    now,
                )
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.handle_action(key_to_action(key), Instant::now()) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BlockColor::{self, Amber, Blue, Red};
    use crate::board::Board;

    fn options(mode: GameMode, difficulty: Difficulty) -> GameOptions {
        GameOptions {
            mode,
            difficulty,
            seed: Some(7),
            advance_delay: Duration::from_millis(1000),
            frame_rate: 30.0,
            no_menu: true,
            no_animation: true,
            collection_file: Some(
                std::env::temp_dir()
                    .join(format!("memblocks-app-{}-{mode:?}-{difficulty:?}", std::process::id()))
                    .join("collection"),
            ),
        }
    }

    fn app(mode: GameMode) -> App {
        app_at(mode, Difficulty::Easy)
    }

    fn app_at(mode: GameMode, difficulty: Difficulty) -> App {
        App::new(options(mode, difficulty), Theme::default()).unwrap()
    }

    fn remove_store(app: &App) {
        if let Some(dir) = app.collection_path.as_deref().and_then(|p| p.parent()) {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    /// Drive the ticker until the round is in the play phase.
    fn reach_play(app: &mut App, mut now: Instant) -> Instant {
        app.update(now); // arms the ticker
        while app.round.phase() == RoundPhase::Memorize {
            now += TICK;
            app.update(now);
        }
        now
    }

    /// Place the solution through the keyboard drag path.
    fn solve_with_keys(app: &mut App, now: Instant) {
        let solution = app.round.board().unwrap().solution.clone();
        place_with_keys(app, &solution, now);
    }

    /// Fill the grid cell by cell with `pattern`, picking each colour from the palette.
    fn place_with_keys(app: &mut App, pattern: &[BlockColor], now: Instant) {
        for (cell, color) in pattern.iter().enumerate() {
            let slot = app.round.palette().iter().position(|c| c == color).unwrap();
            app.cursor = Cursor::Palette(slot);
            app.handle_action(Action::Select, now);
            assert!(app.drag.is_some());
            app.cursor = Cursor::Grid(cell);
            app.handle_action(Action::Select, now);
            assert!(app.drag.is_none());
        }
    }

    #[test]
    fn cursor_walks_grid_and_palette() {
        let c = Cursor::Grid(0);
        assert_eq!(c.step(Action::Left, 3, 9), Cursor::Grid(0));
        assert_eq!(c.step(Action::Right, 3, 9), Cursor::Grid(1));
        assert_eq!(Cursor::Grid(2).step(Action::Right, 3, 9), Cursor::Grid(2));
        assert_eq!(Cursor::Grid(4).step(Action::Down, 3, 9), Cursor::Grid(7));
        assert_eq!(Cursor::Grid(7).step(Action::Down, 3, 9), Cursor::Palette(1));
        assert_eq!(Cursor::Palette(2).step(Action::Up, 3, 9), Cursor::Grid(8));
        assert_eq!(Cursor::Palette(8).step(Action::Right, 3, 9), Cursor::Palette(8));
        assert_eq!(Cursor::Palette(3).step(Action::SwitchArea, 3, 9), Cursor::Grid(0));
    }

    #[test]
    fn cursor_moves_between_palette_rows() {
        // 4x4 board with a distractor: 17 tokens in rows of four.
        assert_eq!(Cursor::Palette(1).step(Action::Down, 4, 17), Cursor::Palette(5));
        assert_eq!(Cursor::Palette(12).step(Action::Down, 4, 17), Cursor::Palette(16));
        assert_eq!(Cursor::Palette(13).step(Action::Down, 4, 17), Cursor::Palette(13));
        assert_eq!(Cursor::Palette(16).step(Action::Up, 4, 17), Cursor::Palette(12));
        assert_eq!(Cursor::Palette(5).step(Action::Up, 4, 17), Cursor::Palette(1));
        assert_eq!(Cursor::Palette(1).step(Action::Up, 4, 17), Cursor::Grid(13));
    }

    #[test]
    fn cursor_clamps_to_shrunk_palette() {
        assert_eq!(Cursor::Palette(4).clamp(2, 3), Cursor::Palette(2));
        assert_eq!(Cursor::Palette(4).clamp(2, 0), Cursor::Palette(0));
        assert_eq!(Cursor::Grid(15).clamp(3, 5), Cursor::Grid(8));
    }

    #[test]
    fn ticker_waits_a_full_second_after_rearming() {
        let mut clock = crate::clock::RoundClock::new();
        let h = clock.start_count_up();
        let t0 = Instant::now();
        let mut ticker = Ticker::new(t0);
        assert_eq!(ticker.poll(Some(h), t0), None);
        assert_eq!(ticker.poll(Some(h), t0 + Duration::from_millis(999)), None);
        assert_eq!(ticker.poll(Some(h), t0 + TICK), Some(h));
        assert_eq!(ticker.poll(Some(h), t0 + TICK), None);

        let h2 = clock.start_count_up();
        assert_eq!(ticker.poll(Some(h2), t0 + TICK * 3), None);
        assert_eq!(ticker.poll(None, t0 + TICK * 5), None);
        assert_eq!(ticker.poll(None, t0 + TICK * 9), None);
    }

    #[test]
    fn practice_round_through_keyboard_drags() {
        let mut app = app(GameMode::Practice);
        assert_eq!(app.screen, Screen::Playing);
        let now = reach_play(&mut app, Instant::now());
        solve_with_keys(&mut app, now);
        app.handle_action(Action::Submit, now);
        assert_eq!(app.screen, Screen::Result);
        let result = app.last_result.unwrap();
        assert!(result.is_win);
        assert_eq!(result.correct, result.total);
        assert_eq!(app.new_unlock.map(|c| c.id), Some("easy_win"));
        remove_store(&app);
    }

    #[test]
    fn retry_after_practice_keeps_difficulty() {
        let mut app = app_at(GameMode::Practice, Difficulty::Medium);
        let now = reach_play(&mut app, Instant::now());
        solve_with_keys(&mut app, now);
        app.handle_action(Action::Submit, now);
        assert_eq!(app.screen, Screen::Result);
        assert!(app.last_result.is_some());
        assert_eq!(app.new_unlock.map(|c| c.id), Some("medium_fast"));

        app.handle_action(Action::Retry, now);
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.round.phase(), RoundPhase::Memorize);
        assert_eq!(app.round.mode(), GameMode::Practice);
        assert_eq!(app.round.difficulty(), Some(Difficulty::Medium));
        assert_eq!(app.round.grid_size(), 3);
        assert_eq!(app.last_result, None);
        assert_eq!(app.new_unlock, None);
        remove_store(&app);
    }

    #[test]
    fn retry_after_challenge_loss_restarts_at_level_one() {
        let mut app = app(GameMode::Challenge);
        let now = reach_play(&mut app, Instant::now());
        app.round.replace_board(Board {
            grid_size: 2,
            solution: vec![Red, Blue, Red, Amber],
            palette: vec![Amber, Red, Blue, Red],
            grid: vec![None; 4],
            distractor: None,
        });
        place_with_keys(&mut app, &[Amber, Red, Blue, Red], now);
        app.handle_action(Action::Submit, now);
        assert_eq!(app.screen, Screen::Result);
        let result = app.last_result.unwrap();
        assert!(!result.is_win);
        assert_eq!(result.level_reached, Some(1));

        app.handle_action(Action::Retry, now);
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.round.mode(), GameMode::Challenge);
        assert_eq!(app.round.level(), 1);
        assert_eq!(app.round.phase(), RoundPhase::Memorize);
        assert_eq!(app.last_result, None);
        assert_eq!(app.new_unlock, None);
    }

    #[test]
    fn cancel_returns_dragged_token() {
        let mut app = app(GameMode::Practice);
        let now = reach_play(&mut app, Instant::now());
        app.cursor = Cursor::Palette(0);
        app.handle_action(Action::Select, now);
        app.cursor = Cursor::Grid(1);
        app.handle_action(Action::Select, now);
        assert!(app.round.grid()[1].is_some());

        app.handle_action(Action::Select, now);
        assert!(app.drag.is_some());
        app.handle_action(Action::Cancel, now);
        assert!(app.drag.is_none());
        assert!(app.round.grid()[1].is_none());
        assert_eq!(app.round.palette().len(), 4);
    }

    #[test]
    fn challenge_advance_fires_after_delay() {
        let mut app = app(GameMode::Challenge);
        let now = reach_play(&mut app, Instant::now());
        solve_with_keys(&mut app, now);
        app.handle_action(Action::Submit, now);
        assert!(app.round.is_advancing());
        assert_eq!(app.screen, Screen::Playing);

        app.update(now + Duration::from_millis(500));
        assert_eq!(app.round.level(), 1);
        app.update(now + Duration::from_millis(1000));
        assert_eq!(app.round.level(), 2);
        assert_eq!(app.round.phase(), RoundPhase::Memorize);
    }

    #[test]
    fn quitting_mid_advance_leaves_no_ghost() {
        let mut app = app(GameMode::Challenge);
        let now = reach_play(&mut app, Instant::now());
        solve_with_keys(&mut app, now);
        app.handle_action(Action::Submit, now);
        app.handle_action(Action::Quit, now);
        assert_eq!(app.screen, Screen::Menu);
        assert_eq!(app.advance_at, None);

        app.handle_action(Action::Select, now); // Start tab is preselected
        assert_eq!(app.screen, Screen::Playing);
        app.update(now + Duration::from_secs(2));
        assert_eq!(app.round.level(), 1);
        assert_eq!(app.round.phase(), RoundPhase::Memorize);
    }
}
