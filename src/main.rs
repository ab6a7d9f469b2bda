use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use crossterm::cursor::SetCursorStyle;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;

mod app;
mod events;
mod export;
mod gateway;
mod theme;
mod ui;
mod workflow;

use app::{App, OutboundCall};
use gateway::ApiGateway;
use theme::Theme;

const MAX_GATEWAY_EVENTS_PER_LOOP: usize = 16;

#[derive(Debug, Parser)]
#[command(
    name = "researcher-tui",
    about = "Terminal client for the multi-agent research backend"
)]
struct LaunchOptions {
    /// Base URL of the research backend.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server: String,

    /// Directory exported reports are saved into.
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,

    /// Prefill the research topic.
    topic: Option<String>,
}

fn main() -> io::Result<()> {
    let options = LaunchOptions::parse();

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, SetCursorStyle::SteadyBar)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    let theme = Theme::load_or_default("theme.toml");
    let gateway = ApiGateway::new(options.server);

    let mut app = App::default();
    if let Some(topic) = options.topic.as_deref() {
        app.prefill_topic(topic);
    }

    let result = run_app(&mut terminal, app, &gateway, &theme, &options.export_dir);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        SetCursorStyle::DefaultUserShape,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    gateway: &ApiGateway,
    theme: &Theme,
    export_dir: &Path,
) -> io::Result<()> {
    while app.running {
        terminal.draw(|frame| ui::render(frame, &app, theme))?;

        for event in gateway.drain_events_limited(MAX_GATEWAY_EVENTS_PER_LOOP) {
            if let Some(artifact) = app.on_gateway_event(event) {
                match export::save_report_artifact(export_dir, &artifact) {
                    Ok(path) => app.set_notice(format!("Saved {}", path.display())),
                    Err(err) => app.on_export_save_failed(err.to_string()),
                }
            }
        }

        let event = events::next_event()?;
        if let Some(call) = app.handle_event(event) {
            dispatch_call(gateway, call);
        }
    }
    Ok(())
}

fn dispatch_call(gateway: &ApiGateway, call: OutboundCall) {
    match call {
        OutboundCall::Plan(seq, request) => gateway.plan_research(seq, request),
        OutboundCall::Research(seq, request) => gateway.execute_research(seq, request),
        OutboundCall::Summary(seq, request) => gateway.generate_summary(seq, request),
        OutboundCall::Export(seq, request) => gateway.export_report(seq, request),
    }
}

#[cfg(test)]
#[path = "../tests/unit/launch_tests.rs"]
mod tests;
