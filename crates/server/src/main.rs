mod config;
mod events;
mod server;
mod tui;

use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use config::ServerConfig;
use server::ArenaServer;
use tui::TuiState;

#[derive(Parser)]
#[command(name = "ashfall-server")]
#[command(about = "Authoritative arena host with simulated observers")]
struct Args {
    #[arg(short, long, default_value_t = ashfall::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 4)]
    drones: usize,

    #[arg(short, long, default_value_t = 6)]
    barrels: usize,

    #[arg(short, long, default_value_t = 2)]
    observers: usize,

    #[arg(long, default_value_t = 40, help = "One-way loopback latency in ms")]
    latency: u32,

    #[arg(long, help = "Stop after this many simulated seconds")]
    duration: Option<f64>,

    #[arg(long, help = "Reject observer requests that break weapon cadence")]
    validate_cadence: bool,

    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServerConfig {
        tick_rate: args.tick_rate,
        drones: args.drones,
        barrels: args.barrels,
        observers: args.observers,
        latency_ms: args.latency,
        duration_secs: args.duration,
        validate_cadence: args.validate_cadence,
    };

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        let mut server = ArenaServer::new(config)?;
        log::info!("arena host running at {} Hz", args.tick_rate);
        server.run();
        log::info!("arena host shutting down");
    } else {
        let mut server = ArenaServer::new(config)?;
        run_with_tui(&mut server)?;
    }

    Ok(())
}

fn run_with_tui(server: &mut ArenaServer) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = server.running();
    let mut tui_state = TuiState::new();
    tui_state.log_info("arena host started");

    while running.load(Ordering::SeqCst) {
        server.tick_once();

        for event in server.drain_events() {
            tui_state.record(&event);
        }

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            running.store(false, Ordering::SeqCst);
                        }
                        KeyCode::Char('r') => tui_state.toggle_routine(),
                        KeyCode::Char('c') => tui_state.clear(),
                        _ => {}
                    }
                }
            }
        }

        let stats = server.stats();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &stats);
        })?;
    }

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
