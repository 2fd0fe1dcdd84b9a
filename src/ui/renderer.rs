/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The 800×600 room is projected onto a grid of map cells, each two
/// terminal columns wide, sized to whatever the terminal offers.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::enemy::{Enemy, EnemyKind};
use crate::domain::entity::{PickupKind, MAGIC_MAX};
use crate::domain::geom::{Rect, SCREEN_H, SCREEN_W};
use crate::domain::room::{door_rect, Direction};
use crate::sim::dungeon::{GRID_MAX, GRID_MIN};
use crate::sim::world::{
    PauseMenu, Phase, PlayState, WorldState, MENU_ITEMS, OPTION_ITEMS, PAUSE_ITEMS,
};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell, so the
    /// gaps between rows match the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        if x < self.width && y < self.height {
            Some(&mut self.cells[y * self.width + x])
        } else {
            None
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Palette ──

const FLOOR: Color = Color::Rgb { r: 30, g: 30, b: 42 };
const FLOOR_DOT: Color = Color::Rgb { r: 48, g: 48, b: 64 };
const WALL: Color = Color::Rgb { r: 90, g: 90, b: 110 };
const OBSTACLE: Color = Color::Rgb { r: 110, g: 85, b: 60 };
const DOOR_OPEN: Color = Color::Rgb { r: 60, g: 160, b: 80 };
const DOOR_SHUT: Color = Color::Rgb { r: 140, g: 90, b: 40 };
const DOOR_LOCKED: Color = Color::Rgb { r: 230, g: 190, b: 40 };
const PLAYER: Color = Color::Rgb { r: 80, g: 200, b: 255 };
const SHIELD: Color = Color::Rgb { r: 40, g: 90, b: 160 };
const SWING: Color = Color::Rgb { r: 255, g: 255, b: 180 };
const ARROW: Color = Color::Rgb { r: 230, g: 230, b: 230 };
const SPIKE: Color = Color::Rgb { r: 120, g: 255, b: 200 };
const COMPANION: Color = Color::Rgb { r: 120, g: 255, b: 120 };
const CHEST: Color = Color::Rgb { r: 200, g: 150, b: 60 };
const FLASH: Color = Color::Rgb { r: 255, g: 255, b: 255 };
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const OVERLAY_BG: Color = Color::Rgb { r: 40, g: 40, b: 40 };
const HEADER: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const HIGHLIGHT: Color = Color::Rgb { r: 80, g: 255, b: 80 };

fn enemy_color(e: &Enemy) -> (Color, Color) {
    if e.hurt_timer > 0.0 {
        return (Color::Black, FLASH);
    }
    let fg = match e.kind() {
        EnemyKind::Grunt => Color::Rgb { r: 220, g: 60, b: 60 },
        EnemyKind::Runner => Color::Rgb { r: 255, g: 160, b: 40 },
        EnemyKind::Brute => Color::Rgb { r: 170, g: 80, b: 220 },
    };
    let bg = if e.is_charging() { Color::Rgb { r: 120, g: 20, b: 20 } } else { FLOOR };
    (fg, bg)
}

fn enemy_glyph(kind: EnemyKind) -> &'static str {
    match kind {
        EnemyKind::Grunt => "gg",
        EnemyKind::Runner => "rr",
        EnemyKind::Brute => "BB",
    }
}

fn pickup_look(kind: PickupKind) -> (&'static str, Color) {
    match kind {
        PickupKind::Bomb => ("b ", Color::Rgb { r: 255, g: 90, b: 90 }),
        PickupKind::Key => ("k ", DOOR_LOCKED),
        PickupKind::Magic => ("m ", Color::Rgb { r: 150, g: 120, b: 255 }),
        PickupKind::Arrow => ("a ", ARROW),
    }
}

/// Scale an RGB colour toward black; `keep` is the fraction left.
fn shade(c: Color, keep: f32) -> Color {
    match c {
        Color::Rgb { r, g, b } => Color::Rgb {
            r: (r as f32 * keep) as u8,
            g: (g as f32 * keep) as u8,
            b: (b as f32 * keep) as u8,
        },
        other => other,
    }
}

// ── Viewport: room pixels → map cells ──

/// Each map cell = CELL_W terminal columns.
const CELL_W: usize = 2;
const MAX_MAP_COLS: usize = 50;

const HUD_ROW: usize = 0;
const STATUS_ROW: usize = 1;
const MAP_ROW: usize = 2;
/// Rows below the map: gap, message, gap, help.
const FOOTER_ROWS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Viewport {
    cols: usize,
    rows: usize,
    /// Shake offset in map cells.
    shift: i32,
}

impl Viewport {
    /// Largest 4:3 grid that fits the terminal.
    fn fit(term_w: usize, term_h: usize) -> Self {
        let avail_cols = (term_w / CELL_W).clamp(1, MAX_MAP_COLS);
        let avail_rows = term_h.saturating_sub(MAP_ROW + FOOTER_ROWS).max(1);
        let rows = avail_rows.min((avail_cols * 3 / 4).max(1));
        let cols = avail_cols.min(rows * 4 / 3 + 1).max(1);
        Viewport { cols, rows, shift: 0 }
    }

    fn px_per_col(&self) -> f32 {
        SCREEN_W as f32 / self.cols as f32
    }

    fn px_per_row(&self) -> f32 {
        SCREEN_H as f32 / self.rows as f32
    }

    /// Map cells whose centres fall inside `r`. A rect smaller than a
    /// cell still claims the cell under its centre.
    fn span(&self, r: &Rect) -> (std::ops::Range<i32>, std::ops::Range<i32>) {
        fn axis(lo: i32, hi: i32, centre: i32, step: f32) -> std::ops::Range<i32> {
            let start = (lo as f32 / step - 0.5).ceil() as i32;
            let end = (hi as f32 / step - 0.5).ceil() as i32;
            if start < end {
                start..end
            } else {
                let c = (centre as f32 / step).floor() as i32;
                c..c + 1
            }
        }
        let (cx, cy) = r.center();
        (
            axis(r.left(), r.right(), cx, self.px_per_col()),
            axis(r.top(), r.bottom(), cy, self.px_per_row()),
        )
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    view: Viewport,
    last_phase: Option<Phase>,
    key_release: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            view: Viewport::fit(80, 24),
            last_phase: None,
            key_release: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    /// Ask the terminal to report key releases. Returns whether it will;
    /// without them held keys expire on a timeout instead.
    pub fn enable_key_release(&mut self) -> bool {
        if matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
            self.key_release = execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        }
        self.key_release
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.key_release {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.view = Viewport::fit(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();

        match (world.phase, world.play.as_ref()) {
            (Phase::Menu, _) => self.compose_menu(world),
            (Phase::GameOver, _) => self.compose_game_over(world),
            (Phase::Playing, Some(play)) => {
                self.compose_play(world, play);
                if world.paused() {
                    self.compose_pause_overlay(world);
                }
            }
            (Phase::Playing, None) => {}
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colours; ResetColor would fall back to the
        // terminal's own default and show seams.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Map drawing primitives ──

    fn map_cell(&mut self, col: i32, row: i32, glyph: &str, fg: Color, bg: Color) {
        let col = col + self.view.shift;
        if col < 0 || row < 0 || col as usize >= self.view.cols || row as usize >= self.view.rows {
            return;
        }
        let x = col as usize * CELL_W;
        let y = MAP_ROW + row as usize;
        let mut chars = glyph.chars();
        for dx in 0..CELL_W {
            let ch = chars.next().unwrap_or(' ');
            self.front.set(x + dx, y, Cell::new(ch, fg, bg));
        }
    }

    fn map_rect(&mut self, r: &Rect, glyph: &str, fg: Color, bg: Color) {
        let (cols, rows) = self.view.span(r);
        for row in rows {
            for col in cols.clone() {
                self.map_cell(col, row, glyph, fg, bg);
            }
        }
    }

    /// Single glyph at the cell under a point.
    fn map_point(&mut self, x: i32, y: i32, glyph: &str, fg: Color, bg: Color) {
        let col = (x as f32 / self.view.px_per_col()).floor() as i32;
        let row = (y as f32 / self.view.px_per_row()).floor() as i32;
        self.map_cell(col, row, glyph, fg, bg);
    }

    // ── Compose: play scene ──

    fn compose_play(&mut self, w: &WorldState, play: &PlayState) {
        self.view.shift = if play.shake.time > 0.0 && play.shake.intensity > 0 {
            if w.anim_tick % 2 == 0 { 1 } else { -1 }
        } else {
            0
        };

        self.compose_hud(w, play);

        // Floor
        for row in 0..self.view.rows as i32 {
            for col in 0..self.view.cols as i32 {
                let glyph = if (row + col) % 4 == 0 { "· " } else { "  " };
                self.map_cell(col, row, glyph, FLOOR_DOT, FLOOR);
            }
        }

        // Walls, doors, obstacles
        for wall in &play.geometry.walls {
            self.map_rect(wall, "██", WALL, FLOOR);
        }
        let room = play.dungeon.current_room();
        for dir in Direction::ALL {
            if play.dungeon.room(room.neighbor(dir)).is_none() {
                continue;
            }
            let door = room.door(dir);
            let (glyph, color) = if door.locked {
                ("▓▓", DOOR_LOCKED)
            } else if door.open {
                ("  ", DOOR_OPEN)
            } else {
                ("▒▒", DOOR_SHUT)
            };
            self.map_rect(&door_rect(dir), glyph, color, if door.open { DOOR_OPEN } else { FLOOR });
        }
        for obstacle in &play.geometry.obstacles {
            self.map_rect(obstacle, "▓▓", OBSTACLE, FLOOR);
        }

        // Items
        for chest in &room.chests {
            let glyph = if chest.opened { "□ " } else { "▣ " };
            self.map_rect(&chest.rect, glyph, CHEST, FLOOR);
        }
        for p in &play.pickups {
            let (glyph, color) = pickup_look(p.kind);
            self.map_point(p.x, p.y, glyph, color, FLOOR);
        }

        // Actors
        for e in &room.enemies {
            let (fg, bg) = enemy_color(e);
            self.map_rect(&e.rect, enemy_glyph(e.kind()), fg, bg);
        }
        for flash in &play.kill_flashes {
            self.map_rect(&flash.rect, "✶ ", Color::Black, FLASH);
        }
        let blink_off = (play.player.invuln * 10.0) as i32 % 2 == 1;
        if !blink_off {
            let bg = if play.player.shield { SHIELD } else { FLOOR };
            self.map_rect(&play.player.rect, "@@", PLAYER, bg);
        }
        if let Some(hit) = play.player.melee_hitbox() {
            self.map_rect(&hit, "**", SWING, FLOOR);
        }
        if let Some(c) = play.companion.as_ref().filter(|c| c.active()) {
            self.map_rect(&c.rect, "c ", COMPANION, FLOOR);
        }

        // Projectiles
        for a in &play.arrows {
            let glyph = match a.dir {
                Direction::Up | Direction::Down => "| ",
                Direction::Left | Direction::Right => "--",
            };
            let (cx, cy) = a.rect().center();
            self.map_point(cx, cy, glyph, ARROW, FLOOR);
        }
        for s in &play.spikes {
            let (cx, cy) = s.rect().center();
            self.map_point(cx, cy, "• ", SPIKE, FLOOR);
        }

        self.apply_darkness(play.transition.darkness());
        self.compose_minimap(play);
        self.compose_footer(w);
    }

    /// Fade the whole map toward black.
    fn apply_darkness(&mut self, darkness: f32) {
        if darkness <= 0.0 {
            return;
        }
        let keep = 1.0 - darkness.clamp(0.0, 1.0);
        for y in MAP_ROW..MAP_ROW + self.view.rows {
            for x in 0..self.view.cols * CELL_W {
                if let Some(cell) = self.front.get_mut(x, y) {
                    cell.fg = shade(cell.fg, keep);
                    cell.bg = shade(cell.bg, keep);
                }
            }
        }
    }

    fn compose_hud(&mut self, w: &WorldState, play: &PlayState) {
        let p = &play.player;
        let inv = &play.inventory;
        let hearts: String = (0..p.max_hp).map(|i| if i < p.hp { '♥' } else { '♡' }).collect();
        let magic_bar: String = (0..10)
            .map(|i| if (i as f32) < p.magic / MAGIC_MAX * 10.0 { '█' } else { '░' })
            .collect();
        let (gx, gy) = play.dungeon.current();
        let hud = format!(
            " {}  MP {} {:>3}  Bombs:{}  Keys:{}  Arrows:{}  Room ({:+},{:+})  [{}]",
            hearts,
            magic_bar,
            p.magic as i32,
            inv.bombs,
            inv.keys,
            inv.arrows,
            gx,
            gy,
            w.options.difficulty.name(),
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        let mut status: Vec<String> = Vec::new();
        if p.speed_boots_timer > 0.0 {
            status.push(format!("Boots {:.0}s", p.speed_boots_timer.ceil()));
        }
        if let Some(c) = play.companion.as_ref().filter(|c| c.active()) {
            status.push(format!("Companion {:.0}s", c.time_remaining.ceil()));
        }
        if play.health_doubled {
            status.push("Heart x2".to_string());
        }
        if play.door_feedback > 0.0 {
            status.push("Doors open!".to_string());
        }
        self.front.put_str(1, STATUS_ROW, &status.join("   "), HIGHLIGHT, Color::Reset);
    }

    /// 3×3 overview to the right of the map, when it fits.
    fn compose_minimap(&mut self, play: &PlayState) {
        let x0 = self.view.cols * CELL_W + 2;
        let span = (GRID_MAX - GRID_MIN + 1) as usize;
        if x0 + span * 3 > self.front.width {
            return;
        }
        self.front.put_str(x0, MAP_ROW, "Map", Color::DarkGrey, Color::Reset);
        for gy in GRID_MIN..=GRID_MAX {
            for gx in GRID_MIN..=GRID_MAX {
                let (glyph, color) = match play.dungeon.room((gx, gy)) {
                    _ if (gx, gy) == play.dungeon.current() => ("[@]", PLAYER),
                    Some(r) if r.cleared => ("[·]", HIGHLIGHT),
                    Some(r) if r.spawned => ("[!]", Color::Rgb { r: 220, g: 60, b: 60 }),
                    Some(_) => ("[ ]", Color::DarkGrey),
                    None => ("   ", Color::DarkGrey),
                };
                let x = x0 + (gx - GRID_MIN) as usize * 3;
                let y = MAP_ROW + 1 + (gy - GRID_MIN) as usize;
                self.front.put_str(x, y, glyph, color, Color::Reset);
            }
        }
    }

    fn compose_footer(&mut self, w: &WorldState) {
        let msg_row = MAP_ROW + self.view.rows + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        }
        let help_row = MAP_ROW + self.view.rows + 3;
        if help_row < self.front.height {
            let help = " WASD/←↑↓→ Move  J Melee  L Arrow  K Shield  B Bomb  E Use  P Pause  F5 Save  F9 Load";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    // ── Compose: menus ──

    fn compose_menu(&mut self, w: &WorldState) {
        let title = [
            r"  ___   ___    _     ___ ",
            r" |_ _| / __|  /_\   / __|",
            r"  | |  \__ \ / _ \ | (__ ",
            r" |___| |___//_/ \_\ \___|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(4, 2 + i, line, HEADER, Color::Reset);
        }
        self.front.put_str(6, 7, "━━━ a dungeon of nine rooms ━━━", Color::Rgb { r: 180, g: 140, b: 50 }, Color::Reset);

        let base = 10;
        for (i, item) in MENU_ITEMS.iter().enumerate() {
            let selected = i == w.menu_cursor;
            let available = i != 1 || w.has_save;
            let color = match (selected, available) {
                (true, true) => HIGHLIGHT,
                (_, false) => Color::DarkGrey,
                (false, true) => Color::White,
            };
            let marker = if selected { "▸ " } else { "  " };
            let suffix = if available { "" } else { "  (no save)" };
            self.front.put_str(8, base + i, &format!("{marker}{item}{suffix}"), color, Color::Reset);
        }

        let help = [
            "Controls",
            "  WASD / ←↑↓→   Move           J  Melee      L  Arrow",
            "  K (hold)      Shield         B  Bomb       E  Interact",
            "  P             Pause          F5 Save       F9 Load",
            "  ENTER Select  C Continue     ESC Quit",
        ];
        let help_base = base + MENU_ITEMS.len() + 2;
        for (i, line) in help.iter().enumerate() {
            let color = if i == 0 { HEADER } else { Color::White };
            self.front.put_str(8, help_base + i, line, color, Color::Reset);
        }

        if !w.message.is_empty() {
            let row = self.front.height.saturating_sub(1);
            if row > help_base + help.len() {
                self.front.fill_row(row, MSG_BG);
                self.front.put_str(0, row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
            }
        }
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        let box_art = [
            "╔══════════════════════════╗",
            "║        GAME  OVER        ║",
            "╚══════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(6, 4 + i, l, Color::Rgb { r: 255, g: 60, b: 60 }, Color::Reset);
        }
        if let Some(play) = &w.play {
            let visited = play.dungeon.rooms().filter(|r| r.spawned).count();
            let cleared = play.dungeon.rooms().filter(|r| r.cleared).count();
            let line = format!("◈ Rooms explored: {visited}   cleared: {cleared}");
            self.front.put_str(8, 9, &line, Color::White, Color::Reset);
        }
        self.front.put_str(8, 11, "▸ ENTER: Back to menu", HIGHLIGHT, Color::Reset);
        // Soft blink on the second hint.
        if (w.anim_tick / 30) % 2 == 0 {
            self.front.put_str(8, 12, "▸ R: Restart   ESC: Quit", Color::Rgb { r: 100, g: 200, b: 255 }, Color::Reset);
        }
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let view_cols = self.view.cols * CELL_W;
        let box_w = 36_usize.min(view_cols);
        let box_h = 11_usize.min(self.view.rows);
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + self.view.rows.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::Reset, OVERLAY_BG));
            }
        }

        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };
        let desc_c = Color::Rgb { r: 180, g: 180, b: 180 };
        let y0 = box_y + 3;

        match w.pause {
            PauseMenu::Closed => {}
            PauseMenu::Main { cursor } => {
                let blink = (w.anim_tick / 8) % 2 == 0;
                let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
                self.front.put_str(box_x + 12, box_y + 1, label, HEADER, OVERLAY_BG);
                for (i, item) in PAUSE_ITEMS.iter().enumerate() {
                    let (marker, color) = if i == cursor { ("▸ ", HIGHLIGHT) } else { ("  ", key_c) };
                    self.front.put_str(box_x + 4, y0 + i, &format!("{marker}{item}"), color, OVERLAY_BG);
                }
                self.front.put_str(box_x + 2, y0 + 5, "↑↓ Select  ENTER OK", desc_c, OVERLAY_BG);
                self.front.put_str(box_x + 2, y0 + 6, "O Options  P Resume", desc_c, OVERLAY_BG);
            }
            PauseMenu::Options { cursor } => {
                self.front.put_str(box_x + 12, box_y + 1, "  OPTIONS  ", HEADER, OVERLAY_BG);
                let opts = &w.options;
                let values = [
                    if opts.sound_enabled { "On".to_string() } else { "Off".to_string() },
                    format!("{:>3}%", (opts.volume * 100.0).round() as i32),
                    opts.difficulty.name().to_string(),
                ];
                for (i, (item, value)) in OPTION_ITEMS.iter().zip(values.iter()).enumerate() {
                    let (marker, color) = if i == cursor { ("▸ ", HIGHLIGHT) } else { ("  ", key_c) };
                    let line = format!("{marker}{item:<12}{value}");
                    self.front.put_str(box_x + 4, y0 + i, &line, color, OVERLAY_BG);
                }
                self.front.put_str(box_x + 2, y0 + 5, "←→ Adjust  ENTER Cycle", desc_c, OVERLAY_BG);
                self.front.put_str(box_x + 2, y0 + 6, "ESC/O Back  P Resume", desc_c, OVERLAY_BG);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_keeps_room_aspect() {
        let v = Viewport::fit(120, 40);
        assert_eq!(v.rows, 34);
        assert!(v.cols <= MAX_MAP_COLS);
        assert!(v.cols * CELL_W <= 120);

        let small = Viewport::fit(80, 24);
        assert_eq!(small.rows, 18);
        assert_eq!(small.cols, 25);
    }

    #[test]
    fn tiny_rect_still_claims_a_cell() {
        let v = Viewport { cols: 40, rows: 30, shift: 0 };
        // 20 px per cell both ways.
        let (cols, rows) = v.span(&Rect::centered(105, 105, 4, 4));
        assert_eq!(cols, 5..6);
        assert_eq!(rows, 5..6);
    }

    #[test]
    fn span_covers_cell_centres_inside() {
        let v = Viewport { cols: 40, rows: 30, shift: 0 };
        let (cols, rows) = v.span(&Rect::new(0, 0, 800, 10));
        assert_eq!(cols, 0..40);
        assert_eq!(rows, 0..1);
    }

    #[test]
    fn shade_darkens_rgb_only() {
        assert_eq!(shade(Color::Rgb { r: 200, g: 100, b: 50 }, 0.5), Color::Rgb { r: 100, g: 50, b: 25 });
        assert_eq!(shade(Color::DarkGrey, 0.0), Color::DarkGrey);
    }

    #[test]
    fn reset_background_is_normalised() {
        assert_eq!(Cell::new('x', Color::White, Color::Reset).bg, Cell::BASE_BG);
    }
}
