//! Layout and drawing: menu, board (solution / grid / palette), result, collection.

use crate::GameMode;
use crate::app::{Cursor, MenuState, MenuTab, Screen};
use crate::board::BlockColor;
use crate::collection::{Card, Collection};
use crate::game::{GameResult, RoundController, RoundPhase};
use crate::placement::{DragOperation, Source};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// One grid cell or palette token in terminal cells, border included.
const SLOT_W: u16 = 6;
const SLOT_H: u16 = 3;
/// Columns between slots. Rows are packed.
const SLOT_GAP: u16 = 1;
/// Palette tokens per row.
pub const PALETTE_COLS: usize = 4;
const LEVEL_CLEAR_FADE_MS: u32 = 600;

/// Everything the frame shows, borrowed from the app for one draw.
pub struct View<'a> {
    pub screen: Screen,
    pub round: &'a RoundController,
    pub theme: &'a Theme,
    pub menu_state: &'a MenuState,
    pub cursor: Cursor,
    pub drag: Option<&'a DragOperation>,
    pub result: Option<&'a GameResult>,
    pub new_unlock: Option<&'static Card>,
    pub collection: &'a Collection,
    pub no_animation: bool,
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

/// Width and height of `cols` x `rows` slots.
fn slots_size(cols: usize, rows: usize) -> (u16, u16) {
    let (cols, rows) = (cols as u16, rows as u16);
    (
        (cols * SLOT_W + cols.saturating_sub(1) * SLOT_GAP),
        rows * SLOT_H,
    )
}

/// Rect of slot `i` in a `cols`-wide layout anchored at `origin`. None if it falls outside.
fn slot_rect(origin: Rect, i: usize, cols: usize) -> Option<Rect> {
    let (col, row) = ((i % cols) as u16, (i / cols) as u16);
    let rect = Rect {
        x: origin.x + col * (SLOT_W + SLOT_GAP),
        y: origin.y + row * SLOT_H,
        width: SLOT_W,
        height: SLOT_H,
    };
    (rect.right() <= origin.right() && rect.bottom() <= origin.bottom()).then_some(rect)
}

/// One bordered slot: filled with `fill`, or a dot when empty or lifted by the drag.
fn draw_slot(buf: &mut Buffer, rect: Rect, fill: Option<Color>, focused: bool, theme: &Theme) {
    let (border_type, border_fg) = if focused {
        (BorderType::Thick, theme.title)
    } else {
        (BorderType::Plain, theme.div_line)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(Style::default().fg(border_fg).bg(theme.bg));
    let inner = block.inner(rect);
    block.render(rect, buf);
    match fill {
        Some(color) => Block::default()
            .style(Style::default().bg(color))
            .render(inner, buf),
        None => Paragraph::new("·")
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.inactive_fg).bg(theme.bg))
            .render(inner, buf),
    }
}

/// Draw current screen. While a cleared challenge level waits to advance and !no_animation,
/// runs the TachyonFX flash over the grid and updates `level_clear_effect` /
/// `level_clear_process_time`.
pub fn draw(
    frame: &mut Frame,
    view: View<'_>,
    level_clear_effect: &mut Option<Effect>,
    level_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    Block::default()
        .style(Style::default().bg(view.theme.bg))
        .render(area, frame.buffer_mut());
    match view.screen {
        Screen::Menu => draw_menu(frame, &view, area, now),
        Screen::Playing => {
            let grid_rect = draw_game(frame, &view, area);
            if view.round.is_advancing() && !view.no_animation {
                if let Some(grid_rect) = grid_rect {
                    apply_level_clear_effect(
                        frame,
                        view.theme,
                        grid_rect,
                        level_clear_effect,
                        level_clear_process_time,
                        now,
                    );
                }
            }
        }
        Screen::Result => draw_result(frame, &view, area),
        Screen::Collection => draw_collection(frame, &view, area),
    }
}

/// Create or update the level-clear flash (fade the solved grid to the title colour) and process it.
fn apply_level_clear_effect(
    frame: &mut Frame,
    theme: &Theme,
    grid_rect: Rect,
    level_clear_effect: &mut Option<Effect>,
    level_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = level_clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *level_clear_process_time = Some(now);

    let effect = level_clear_effect.get_or_insert_with(|| {
        fx::fade_to(theme.title, theme.bg, (LEVEL_CLEAR_FADE_MS, Interpolation::Linear))
            .with_area(grid_rect)
    });
    frame.render_effect(effect, grid_rect, TfxDuration::from_millis(delta_ms));
}

fn draw_menu(frame: &mut Frame, view: &View<'_>, area: Rect, now: Instant) {
    let theme = view.theme;
    let menu_state = view.menu_state;
    let popup = centered(area, 44, 16);

    let highlight = Style::default()
        .fg(theme.bg)
        .bg(theme.title)
        .add_modifier(Modifier::BOLD);
    let selected = Style::default().fg(theme.title).add_modifier(Modifier::BOLD);
    let normal = Style::default().fg(theme.main_fg);
    let tab_style = |tab: MenuTab, is_selected: bool| {
        if menu_state.current_tab == tab && is_selected {
            highlight
        } else if is_selected {
            selected
        } else {
            normal
        }
    };

    let mut difficulty = vec![Span::styled("Difficulty ", normal)];
    for d in crate::Difficulty::ALL {
        difficulty.push(Span::styled(
            format!(" {} ", d.label()),
            tab_style(MenuTab::Difficulty, menu_state.selected_difficulty == d),
        ));
    }
    let mode = Line::from(vec![
        Span::styled("Mode ", normal),
        Span::styled(
            " PRACTICE ",
            tab_style(MenuTab::Mode, menu_state.selected_mode == GameMode::Practice),
        ),
        Span::styled(
            " CHALLENGE ",
            tab_style(MenuTab::Mode, menu_state.selected_mode == GameMode::Challenge),
        ),
    ]);
    let button = |tab: MenuTab, label: &'static str| {
        let style = if menu_state.current_tab == tab {
            highlight
        } else {
            normal
        };
        Line::from(Span::styled(label, style))
    };

    // Block colours as a title strip.
    let swatches: Vec<Span> = BlockColor::ALL
        .iter()
        .map(|c| Span::styled("██ ", Style::default().fg(theme.block(*c))))
        .collect();

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " MEMORY BLOCKS ",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        Line::from(swatches),
        Line::from(""),
        Line::from(difficulty),
        mode,
        Line::from(""),
        button(MenuTab::Start, " [ START ] "),
        button(MenuTab::Collection, " [ COLLECTION ] "),
        Line::from(""),
        Line::from(Span::styled(
            format!("{}/{} cards collected", view.collection.unlocked_count(), crate::collection::CARDS.len()),
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " ↕ navigate  ↔ change  ENTER select  Q quit ",
            Style::default().fg(theme.inactive_fg),
        )),
    ];

    // Slide in from below, ease-out cubic over 500 ms.
    let elapsed = now.saturating_duration_since(menu_state.animation_start).as_millis() as f32;
    let t = (elapsed / 500.0).min(1.0);
    let eased = 1.0 - (1.0 - t).powi(3);
    let mut anim_popup = popup;
    anim_popup.y += ((1.0 - eased) * 6.0) as u16;
    anim_popup.height = anim_popup.height.min(area.bottom().saturating_sub(anim_popup.y));

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(anim_popup, frame.buffer_mut());
}

/// Header, grid, palette and status line. Returns the grid rect for effects.
fn draw_game(frame: &mut Frame, view: &View<'_>, area: Rect) -> Option<Rect> {
    let round = view.round;
    let theme = view.theme;
    let grid_size = round.grid_size();
    if grid_size == 0 {
        return None;
    }

    let (grid_w, grid_h) = slots_size(grid_size, grid_size);
    let palette_rows = round.palette().len().div_ceil(PALETTE_COLS).max(1);
    let (pal_w, pal_h) = slots_size(PALETTE_COLS, palette_rows.max(grid_size));
    let panel_w = grid_w + pal_w + 6;
    let panel_h = grid_h.max(pal_h) + 5;
    let panel = centered(area, panel_w, panel_h);

    let title = match round.mode() {
        GameMode::Practice => format!(
            " Practice · {} ",
            round.difficulty().map(|d| d.label()).unwrap_or_default()
        ),
        GameMode::Challenge => format!(" Challenge · Level {} ", round.level()),
    };
    let clock = match round.phase() {
        RoundPhase::Memorize => format!(
            " Memorize {}s / {}s ",
            round.time_left(),
            round.config().map_or(0, |c| c.memorize_secs)
        ),
        _ => {
            let t = round.play_time();
            format!(" {:02}:{:02} ", t / 60, t % 60)
        }
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Line::from(Span::styled(
            title,
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )))
        .title(Line::from(Span::styled(clock, Style::default().fg(theme.main_fg))).right_aligned());
    let inner = block.inner(panel);
    block.render(panel, frame.buffer_mut());

    let grid_rect = Rect {
        x: inner.x + 1,
        y: inner.y + 1,
        width: grid_w.min(inner.width.saturating_sub(1)),
        height: grid_h.min(inner.height.saturating_sub(1)),
    };
    let palette_rect = Rect {
        x: grid_rect.right() + 3,
        y: grid_rect.y,
        width: pal_w.min(inner.right().saturating_sub(grid_rect.right() + 3)),
        height: pal_h.min(inner.height.saturating_sub(1)),
    };

    let playing = round.phase() == RoundPhase::Playing && !round.is_advancing();
    let lifted = view.drag.map(|d| d.source);

    // Grid: the solution while memorizing, the player's placement afterwards.
    let buf = frame.buffer_mut();
    let cells: Vec<Option<BlockColor>> = match round.solution() {
        Some(solution) => solution.iter().copied().map(Some).collect(),
        None => round.grid().to_vec(),
    };
    for (i, cell) in cells.iter().enumerate() {
        let Some(rect) = slot_rect(grid_rect, i, grid_size) else {
            continue;
        };
        let fill = cell.filter(|_| lifted != Some(Source::Grid(i)));
        let focused = playing && view.cursor == Cursor::Grid(i);
        draw_slot(buf, rect, fill.map(|c| theme.block(c)), focused, theme);
    }

    if round.phase() == RoundPhase::Memorize {
        Paragraph::new(vec![
            Line::from(Span::styled(
                "Memorize!",
                Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Remember where each colour goes.",
                Style::default().fg(theme.main_fg),
            )),
        ])
        .alignment(Alignment::Center)
        .render(palette_rect, buf);
    } else {
        for (i, color) in round.palette().iter().enumerate() {
            let Some(rect) = slot_rect(palette_rect, i, PALETTE_COLS) else {
                continue;
            };
            let fill = (lifted != Some(Source::Palette(i))).then(|| theme.block(*color));
            let focused = playing && view.cursor == Cursor::Palette(i);
            draw_slot(buf, rect, fill, focused, theme);
        }
        if round.palette().is_empty() && playing && matches!(view.cursor, Cursor::Palette(_)) {
            Paragraph::new("[ palette ]")
                .style(Style::default().fg(theme.title))
                .render(palette_rect, buf);
        }
    }

    let status_rect = Rect {
        x: inner.x + 1,
        y: inner.bottom().saturating_sub(1),
        width: inner.width.saturating_sub(2),
        height: 1,
    };
    status_line(view).render(status_rect, buf);

    Some(grid_rect)
}

fn status_line(view: &View<'_>) -> Line<'static> {
    let round = view.round;
    let theme = view.theme;
    let hint = Style::default().fg(theme.inactive_fg);
    if round.is_advancing() {
        return Line::from(Span::styled(
            format!("Level {} cleared!", round.level()),
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ));
    }
    match round.phase() {
        RoundPhase::Memorize => Line::from(Span::styled("Q menu", hint)),
        RoundPhase::Playing => {
            if let Some(drag) = view.drag {
                return Line::from(vec![
                    Span::styled("Holding ", Style::default().fg(theme.main_fg)),
                    Span::styled("██", Style::default().fg(theme.block(drag.color))),
                    Span::styled(
                        format!(" {}  ENTER drop  ESC return", drag.color.name()),
                        hint,
                    ),
                ]);
            }
            if round.is_grid_full() {
                Line::from(vec![
                    Span::styled(
                        "Done! ",
                        Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled("S submit  Q menu", hint),
                ])
            } else {
                let (filled, cells) = round
                    .board()
                    .map_or((0, 0), |b| (b.filled_count(), b.cell_count()));
                Line::from(Span::styled(
                    format!("Fill all blocks {filled}/{cells}  ENTER pick up  TAB grid/palette  Q menu"),
                    hint,
                ))
            }
        }
        _ => Line::from(""),
    }
}

fn draw_result(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let Some(result) = view.result else {
        return;
    };
    let popup = centered(area, 40, 13);

    let (headline, color) = match (result.is_win, result.level_reached) {
        (true, _) => ("You win!", theme.title),
        (false, Some(_)) => ("Game over", theme.main_fg),
        (false, None) => ("Try again", theme.main_fg),
    };
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            headline,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Correct: {} / {}", result.correct, result.total)),
        Line::from(format!("Time: {}s", result.time_taken)),
    ];
    if let Some(level) = result.level_reached {
        lines.push(Line::from(format!("Level reached: {level}")));
    }
    lines.push(Line::from(""));
    if let Some(card) = view.new_unlock {
        lines.push(Line::from(vec![
            Span::styled("New card: ", Style::default().fg(theme.main_fg)),
            Span::styled(
                card.name,
                Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
            ),
        ]));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R retry   C collection   Q menu ",
        Style::default().fg(theme.inactive_fg),
    )));

    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.main_fg).bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_collection(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let popup = centered(area, 52, 16);
    let mut lines = vec![Line::from("")];
    for card in &crate::collection::CARDS {
        let unlocked = view.collection.is_unlocked(card);
        let (mark, name, style) = if unlocked {
            ("★", card.name, Style::default().fg(theme.title).add_modifier(Modifier::BOLD))
        } else {
            ("?", "???", Style::default().fg(theme.inactive_fg))
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {mark} "), style),
            Span::styled(format!("{name:<16}"), style),
        ]));
        lines.push(Line::from(Span::styled(
            format!("     {}", card.description),
            Style::default().fg(if unlocked { theme.main_fg } else { theme.inactive_fg }),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Q back ",
        Style::default().fg(theme.inactive_fg),
    )));

    Paragraph::new(lines)
        .style(Style::default().fg(theme.main_fg).bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Line::from(Span::styled(
                    format!(
                        " Collection {}/{} ",
                        view.collection.unlocked_count(),
                        crate::collection::CARDS.len()
                    ),
                    Style::default().fg(theme.title),
                ))),
        )
        .render(popup, frame.buffer_mut());
}
