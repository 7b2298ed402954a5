use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;

mod app;
mod editor;
mod input;
mod tree;
mod ui;

pub use app::{App, Focus, LogPane, APP_TITLE, MAX_LOG_LINES};
pub use editor::Editor;
pub use input::LineInput;
pub use tree::{FileTree, TreeEntry};

use crate::config::Config;
use crate::environment::EnvMap;
use crate::layout::PortableLayout;
use crate::process::Launcher;

const POLL_INTERVAL: Duration = Duration::from_millis(30);

pub struct TuiRunner {
    app: App,
}

impl TuiRunner {
    pub fn new(
        layout: PortableLayout,
        config: Config,
        launcher: Arc<dyn Launcher>,
        base_env: EnvMap,
    ) -> Self {
        Self {
            app: App::new(layout, config, launcher, base_env),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut redraw = true;
        loop {
            if redraw {
                terminal.draw(|f| ui::draw(f, &mut self.app))?;
                redraw = false;
            }

            if event::poll(POLL_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) => self.app.handle_key(key),
                    Event::Resize(..) => {}
                    _ => continue,
                }
                redraw = true;
            }
            if self.app.should_quit {
                break;
            }

            redraw |= self.app.drain();
            // let spawned jobs progress between polls
            tokio::task::yield_now().await;
        }

        Ok(())
    }
}
