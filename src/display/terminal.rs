// src/display/terminal.rs
//! Terminal-based status screen
//!
//! Draws the label grid once, then rewrites only the value fields whose
//! text changed since the last frame. A banner wipes the screen and forces
//! a full redraw on the next render.

use super::{status_fields, StatusDisplay, Tone, LABELS, TITLE};
use crate::{error::Result, geo::Proximity, monitor::SensorSnapshot};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    collections::HashMap,
    io::{self, Stdout, Write},
};

/// First row below the status grid
const FOOTER_ROW: u16 = 14;

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Normal => Color::White,
        Tone::Good => Color::Green,
        Tone::Warning => Color::Yellow,
        Tone::Bad => Color::Red,
    }
}

pub struct TerminalDisplay<W: Write = Stdout> {
    out: W,
    enabled: bool,
    frame_drawn: bool,
    drawn: HashMap<&'static str, String>,
}

impl TerminalDisplay<Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// A display that accepts every call and draws nothing
    pub fn headless() -> Self {
        let mut display = Self::new();
        display.enabled = false;
        display
    }
}

impl Default for TerminalDisplay<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TerminalDisplay<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            enabled: true,
            frame_drawn: false,
            drawn: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn draw_frame(&mut self) -> Result<()> {
        queue!(
            self.out,
            Hide,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0),
            SetForegroundColor(Color::Cyan),
            Print(TITLE),
            ResetColor
        )?;
        for &(column, row, label) in LABELS {
            queue!(self.out, MoveTo(column, row), Print(label))?;
        }
        self.frame_drawn = true;
        self.drawn.clear();
        Ok(())
    }
}

impl<W: Write> StatusDisplay for TerminalDisplay<W> {
    fn render(&mut self, snapshot: &SensorSnapshot, proximity: Proximity) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if !self.frame_drawn {
            self.draw_frame()?;
        }

        for field in status_fields(snapshot, proximity) {
            let previous_width = match self.drawn.get(field.key) {
                Some(previous) if *previous == field.text => continue,
                Some(previous) => previous.chars().count(),
                None => 0,
            };

            // Pad with spaces so a shorter value erases the old one.
            let width = previous_width.max(field.text.chars().count());
            queue!(
                self.out,
                MoveTo(field.column, field.row),
                SetForegroundColor(tone_color(field.tone)),
                Print(format!("{:<width$}", field.text, width = width)),
                ResetColor
            )?;
            self.drawn.insert(field.key, field.text);
        }

        self.out.flush()?;
        Ok(())
    }

    fn show_banner(&mut self, lines: &[&str]) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        queue!(self.out, Clear(ClearType::All))?;
        for (row, line) in lines.iter().enumerate() {
            queue!(
                self.out,
                MoveTo(2, 2 + row as u16 * 2),
                SetForegroundColor(if row == 0 { Color::Red } else { Color::White }),
                Print(*line),
                ResetColor
            )?;
        }
        self.out.flush()?;

        self.frame_drawn = false;
        self.drawn.clear();
        Ok(())
    }
}

impl<W: Write> Drop for TerminalDisplay<W> {
    fn drop(&mut self) {
        if self.enabled && self.frame_drawn {
            let _ = execute!(self.out, MoveTo(0, FOOTER_ROW), Show, EnableLineWrap);
        }
    }
}
