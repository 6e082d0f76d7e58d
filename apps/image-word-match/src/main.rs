//! Image-Word Match - pair pictures with Japanese words.

mod app;
mod config;
mod db;
mod logging;
mod sample;
mod ui;

use app::App;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let config = Config::load();
    if let Err(e) = logging::init_tracing(&config.logging.level, Config::log_path().as_deref()) {
        eprintln!("Logging disabled: {}", e);
    }
    if Config::config_path().is_some_and(|p| !p.exists()) {
        if let Err(e) = config.save() {
            tracing::warn!(error = %e, "could not write default config");
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(error = %err, "exited with error");
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, config: Config) -> anyhow::Result<()> {
    let mut app = App::new(config)?;

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        // Poll with timeout so the timer and wrong-match highlight update
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('q') && key.modifiers.is_empty() && app.can_quit() {
                    break;
                }
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    break;
                }
                app.handle_key(key);
            }
        }

        app.tick();
    }

    Ok(())
}
