//! Memblocks: colour-pattern memory game in the terminal.

mod app;
mod board;
mod clock;
mod collection;
mod game;
mod input;
mod level;
mod logging;
mod placement;
mod scoring;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Options derived from CLI that affect how rounds are started and paced.
#[derive(Debug, Clone)]
pub struct GameOptions {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub seed: Option<u64>,
    pub advance_delay: Duration,
    pub frame_rate: f64,
    pub no_menu: bool,
    pub no_animation: bool,
    pub collection_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        logging::init(path, args.log_level)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme not loaded, using defaults: {e}");
        theme::Theme::default_for_palette(args.palette)
    });
    let options = GameOptions {
        mode: args.mode,
        difficulty: args.difficulty,
        seed: args.seed,
        advance_delay: Duration::from_millis(args.advance_delay_ms),
        frame_rate: args.frame_rate,
        no_menu: args.no_menu,
        no_animation: args.no_animation,
        collection_file: args.collection_file,
    };
    let mut app = App::new(options, theme)?;
    app.run()?;
    Ok(())
}

/// Colour-pattern memory game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "memblocks",
    version,
    about = "Memorize a grid of coloured blocks, then rebuild it from the palette.",
    long_about = "Memblocks is a terminal memory game.\n\n\
        A coloured grid is shown for a few seconds. When it hides, rebuild it by \
        moving colour tokens from the palette onto the grid, then submit.\n\n\
        Practice plays one board at a fixed difficulty. Challenge climbs a ladder of \
        levels until the first mistake. Milestones unlock collectible cards.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor    Tab        Jump grid/palette\n  Enter/Space Pick up / drop  Esc        Cancel drag\n  S           Submit         Q          Exit round\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor"
)]
pub struct Args {
    /// Game mode: practice (one board at a fixed difficulty) or challenge (escalating levels until a mistake).
    #[arg(short, long, default_value = "practice")]
    pub mode: GameMode,

    /// Practice difficulty: easy (2×2), medium (3×3), hard (4×4). Ignored in challenge mode.
    #[arg(short, long, default_value = "easy")]
    pub difficulty: Difficulty,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses built-in colours if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Skip main menu and start a round immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the level-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Seed for board generation (same seed, same boards).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Pause after a cleared challenge level before the next one starts.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub advance_delay_ms: u64,

    /// Where unlocked cards are stored. Defaults to the XDG config dir.
    #[arg(long, value_name = "FILE")]
    pub collection_file: Option<PathBuf>,

    /// Write diagnostics to this file (the terminal is busy drawing the game).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for --log-file.
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: log::LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GameMode {
    #[default]
    Practice,
    Challenge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }
}
