//! Interactive Hourglass Demo
//!
//! Draws the hourglass in the terminal and lets the keyboard stand in for the
//! device motion sensor. The simulation runs on its own thread at a fixed tick
//! and publishes snapshots over a channel; the UI thread only draws and feeds
//! gravity.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package demo-interactive -- --size 30 --on yellow
//! ```
//!
//! # Keys
//!
//! - `←` / `→` - Tilt gravity by the tilt step
//! - `↑` - Stand the hourglass upright (gravity `(1, 1)`)
//! - `↓` - Turn it upside down (gravity `(-1, -1)`)
//! - `space` - Pause or resume ticking
//! - `q` / `Esc` - Quit

use clap::Parser;
use hourglass_core::{
    gravity_feed, ChamberSnapshot, ChannelSink, FixedTicker, GravitySender, HourglassConfig,
    HourglassSimulation, SimulationStats,
};
use nalgebra::{Rotation2, Vector2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Paragraph};
use ratatui::{DefaultTerminal, Frame};
use std::fs::File;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Redraw and input polling period
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
/// Gravity angle when the hourglass stands upright
const UPRIGHT_DEGREES: f64 = 45.0;

/// Terminal hourglass
#[derive(Parser, Debug)]
#[command(name = "hourglass-interactive")]
#[command(about = "Terminal hourglass with keyboard tilting", long_about = None)]
struct Args {
    /// Chamber side length
    #[arg(short = 'n', long, default_value_t = 40)]
    size: usize,

    /// Chance that a single neck crossing is rejected
    #[arg(short = 'p', long, default_value_t = 0.5)]
    neck_probability: f64,

    /// Simulation tick in milliseconds
    #[arg(long, default_value_t = 20)]
    tick_ms: u64,

    /// Grain color
    #[arg(long, default_value = "red", value_parser = parse_color)]
    on: Color,

    /// Empty cell color
    #[arg(long, default_value = "gray", value_parser = parse_color)]
    off: Color,

    /// Background color outside the chambers
    #[arg(long, default_value = "black", value_parser = parse_color)]
    background: Color,

    /// Degrees of tilt per arrow key press
    #[arg(long, default_value_t = 15.0)]
    tilt_step: f64,

    /// RNG seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write tracing output to this file (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<String>,
}

fn parse_color(s: &str) -> Result<Color, String> {
    s.parse::<Color>().map_err(|e| format!("{e}: '{s}'"))
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    on: Color,
    off: Color,
    background: Color,
}

impl Palette {
    fn cell(&self, occupied: Option<bool>) -> Span<'static> {
        match occupied {
            Some(true) => Span::styled("██", Style::default().fg(self.on).bg(self.background)),
            Some(false) => Span::styled("██", Style::default().fg(self.off).bg(self.background)),
            None => Span::styled("  ", Style::default().bg(self.background)),
        }
    }
}

/// Flags shared with the simulation thread
#[derive(Debug, Default)]
struct EngineControl {
    stop: AtomicBool,
    paused: AtomicBool,
}

/// Engine thread outcome, logged at exit
struct EngineReport {
    stats: SimulationStats,
    dropped_ticks: u64,
}

fn spawn_engine(
    mut sim: HourglassSimulation,
    period: Duration,
    control: Arc<EngineControl>,
) -> JoinHandle<EngineReport> {
    thread::spawn(move || {
        let mut ticker = FixedTicker::new(period, Instant::now());
        // The UI owns the gravity sender; once it is gone nothing can steer.
        while !control.stop.load(Ordering::Relaxed) && sim.has_gravity_source() {
            let now = Instant::now();
            if ticker.poll(now) {
                if !control.paused.load(Ordering::Relaxed) {
                    sim.step();
                }
            } else {
                thread::sleep(ticker.time_until_next(now));
            }
        }
        EngineReport {
            stats: *sim.stats(),
            dropped_ticks: ticker.dropped_ticks(),
        }
    })
}

struct HourglassApp {
    palette: Palette,
    snapshot: ChamberSnapshot,
    snapshots: Receiver<ChamberSnapshot>,
    gravity: GravitySender,
    control: Arc<EngineControl>,
    angle_degrees: f64,
    magnitude: f64,
    tilt_step: f64,
}

impl HourglassApp {
    fn new(
        palette: Palette,
        initial: ChamberSnapshot,
        snapshots: Receiver<ChamberSnapshot>,
        gravity: GravitySender,
        control: Arc<EngineControl>,
        tilt_step: f64,
    ) -> Self {
        let app = Self {
            palette,
            snapshot: initial,
            snapshots,
            gravity,
            control,
            angle_degrees: UPRIGHT_DEGREES,
            magnitude: std::f64::consts::SQRT_2,
            tilt_step,
        };
        app.send_gravity();
        app
    }

    fn gravity_vector(&self) -> Vector2<f64> {
        Rotation2::new(self.angle_degrees.to_radians()) * Vector2::new(self.magnitude, 0.0)
    }

    fn send_gravity(&self) {
        self.gravity.send_vector(self.gravity_vector());
    }

    fn tilt(&mut self, degrees: f64) {
        self.angle_degrees = (self.angle_degrees + degrees).rem_euclid(360.0);
        self.send_gravity();
    }

    fn set_angle(&mut self, degrees: f64) {
        self.angle_degrees = degrees;
        self.send_gravity();
    }

    /// Keep only the newest published snapshot.
    fn poll_snapshots(&mut self) {
        if let Some(latest) = self.snapshots.try_iter().last() {
            self.snapshot = latest;
        }
    }

    fn paused(&self) -> bool {
        self.control.paused.load(Ordering::Relaxed)
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match (key.code, key.modifiers) {
            (KeyCode::Esc | KeyCode::Char('q' | 'Q'), _)
            | (KeyCode::Char('c'), KeyModifiers::CONTROL) => return true,
            (KeyCode::Left, _) => self.tilt(-self.tilt_step),
            (KeyCode::Right, _) => self.tilt(self.tilt_step),
            (KeyCode::Up, _) => self.set_angle(UPRIGHT_DEGREES),
            (KeyCode::Down, _) => self.set_angle(UPRIGHT_DEGREES + 180.0),
            (KeyCode::Char(' '), _) => {
                let paused = !self.paused();
                self.control.paused.store(paused, Ordering::Relaxed);
            }
            _ => {}
        }
        false
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let n = self.snapshot.size() as u16;
        let [hourglass, status] = Layout::horizontal([
            Constraint::Length(4 * n + 2),
            Constraint::Min(26),
        ])
        .areas(frame.area());

        self.draw_hourglass(frame, hourglass);
        self.draw_status(frame, status);
    }

    fn draw_hourglass(&self, frame: &mut Frame<'_>, area: Rect) {
        let n = self.snapshot.size() as i32;
        let lines: Vec<Line<'_>> = (-n..n)
            .map(|y| {
                Line::from(
                    (-n..n)
                        .map(|x| self.palette.cell(self.snapshot.get(x, y)))
                        .collect::<Vec<_>>(),
                )
            })
            .collect();

        let block = Block::bordered()
            .title(format!(" Hourglass {n}x{n} "))
            .style(Style::default().bg(self.palette.background));
        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let bottom = self.snapshot.bottom.iter().filter(|&&b| b).count();
        let top = self.snapshot.top.iter().filter(|&&b| b).count();
        let gravity = self.gravity_vector();
        let state = if self.paused() { "paused" } else { "running" };

        let lines = vec![
            Line::raw(format!("Generation: {}", self.snapshot.generation)),
            Line::raw(format!("Bottom:     {bottom}")),
            Line::raw(format!("Top:        {top}")),
            Line::raw(format!("Gravity:    ({:.2}, {:.2})", gravity.x, gravity.y)),
            Line::raw(format!("Tilt:       {:.0}°", self.angle_degrees)),
            Line::raw(format!("State:      {state}")),
            Line::raw(""),
            Line::raw("←/→ tilt  ↑ upright"),
            Line::raw("↓ flip  space pause"),
            Line::raw("q quit"),
        ];

        frame.render_widget(Paragraph::new(lines).block(Block::bordered().title(" Status ")), area);
    }
}

fn run_event_loop(terminal: &mut DefaultTerminal, app: &mut HourglassApp) -> io::Result<()> {
    loop {
        app.poll_snapshots();
        terminal.draw(|frame| app.draw(frame))?;

        if event::poll(FRAME_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }
}

fn init_logging(path: Option<&str>) -> io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let config = HourglassConfig {
        size: args.size,
        neck_probability: args.neck_probability,
        tick_ms: args.tick_ms,
        ..Default::default()
    };
    let rng = args.seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let mut sim = HourglassSimulation::with_config(config.clone(), rng)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let (sink, snapshots) = ChannelSink::channel();
    sim.add_sink(sink);
    let (sender, receiver) = gravity_feed();
    sim.attach_gravity_feed(receiver);

    let palette = Palette {
        on: args.on,
        off: args.off,
        background: args.background,
    };
    let control = Arc::new(EngineControl::default());
    let mut app = HourglassApp::new(
        palette,
        sim.snapshot().clone(),
        snapshots,
        sender,
        Arc::clone(&control),
        args.tilt_step,
    );

    let engine = spawn_engine(sim, config.tick_period(), Arc::clone(&control));

    let mut terminal = ratatui::init();
    let result = run_event_loop(&mut terminal, &mut app);
    ratatui::restore();

    control.stop.store(true, Ordering::Relaxed);
    match engine.join() {
        Ok(report) => info!(
            "Engine stopped after {} steps ({} changed), {} neck crossings, {} dropped ticks",
            report.stats.steps,
            report.stats.changed_steps,
            report.stats.neck_crossings,
            report.dropped_ticks
        ),
        Err(_) => warn!("Engine thread panicked"),
    }

    result
}
