//! The shared console.
//!
//! All user-facing output funnels through one mutex so each line lands
//! atomically, prefixed and colorized by the thread that produced it. The
//! compile progress ramp maps completion percentage onto the hue circle so
//! a healthy build visibly walks through the spectrum.

use std::io::Write;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Which thread a line is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// The orchestrating thread.
    Main,
    /// A pool worker, carrying its stable id in `[0, N)`.
    Worker(usize),
}

pub struct Console {
    out: Mutex<StandardStream>,
    verbose: bool,
    workers: usize,
}

impl Console {
    pub fn new(verbose: bool, workers: usize) -> Self {
        Self {
            out: Mutex::new(StandardStream::stdout(ColorChoice::Auto)),
            verbose,
            workers: workers.max(1),
        }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Print one line, atomically, with the speaker prefix.
    pub fn line(&self, who: Speaker, message: &str) {
        self.write_line(who, message, None);
    }

    /// Print one line in the progress ramp color for `position/total`.
    pub fn ramp_line(&self, who: Speaker, position: usize, total: usize, message: &str) {
        let pct = position as f32 / total.max(1) as f32;
        self.write_line(who, message, Some(hsv_to_rgb(300.0 * pct)));
    }

    /// Print only when verbose output was requested.
    pub fn verbose_line(&self, who: Speaker, message: &str) {
        if self.verbose {
            self.write_line(who, message, None);
        }
    }

    fn write_line(&self, who: Speaker, message: &str, body_color: Option<(u8, u8, u8)>) {
        if message.is_empty() {
            return;
        }

        let prefix = match who {
            Speaker::Main => "(hewg)".to_string(),
            Speaker::Worker(id) => format!("(thread {})", id + 1),
        };

        let mut out = self.out.lock();
        let _ = out.set_color(ColorSpec::new().set_fg(Some(self.prefix_color(who))));
        let _ = write!(out, "{prefix:13}");
        let _ = out.reset();
        let _ = write!(out, "| ");

        if let Some((r, g, b)) = body_color {
            let _ = out.set_color(ColorSpec::new().set_fg(Some(Color::Rgb(r, g, b))));
        }
        let _ = write!(out, "{message}");
        let _ = out.reset();

        if !message.ends_with('\n') {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }

    fn prefix_color(&self, who: Speaker) -> Color {
        match who {
            Speaker::Main => Color::White,
            Speaker::Worker(id) => {
                let pct = id as f32 / self.workers as f32;
                let (r, g, b) = hsv_to_rgb(300.0 * pct);
                Color::Rgb(r, g, b)
            }
        }
    }

    /// Buffer a destructive action on the terminal with time. Skipped when
    /// the user passed `--skip`.
    pub fn countdown(&self, seconds: u32, skip: bool) {
        if skip {
            return;
        }

        for remaining in (1..=seconds).rev() {
            self.line(Speaker::Main, &format!("{remaining}..."));
            thread::sleep(Duration::from_secs(1));
        }
    }
}

/// Full-saturation HSV to RGB over `[0, 360)` degrees, floored at a
/// brightness that stays readable on dark terminals.
pub(crate) fn hsv_to_rgb(degrees: f32) -> (u8, u8, u8) {
    let hue = degrees.rem_euclid(360.0) / 60.0;
    let x = 1.0 - (hue % 2.0 - 1.0).abs();

    let (r, g, b) = match hue as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };

    let lift = |v: f32| ((v * 255.0) as u32 + 50).min(255) as u8;
    (lift(r), lift(g), lift(b))
}
