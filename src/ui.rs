use ratatui::prelude::*;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Padding, Paragraph, Wrap};

use crate::app::{App, InputField, PlanField};
use crate::theme::Theme;
use crate::workflow::{Stage, WorkflowSession};

const HEADER_HEIGHT: u16 = 4;
const STATUS_HEIGHT: u16 = 3;
const ERROR_BANNER_HEIGHT: u16 = 3;
const CURSOR_MARK: &str = "\u{258f}";

pub fn render(frame: &mut Frame, app: &App, theme: &Theme) {
    let [header_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(HEADER_HEIGHT),
        Constraint::Min(0),
        Constraint::Length(STATUS_HEIGHT),
    ])
    .areas(frame.area());

    render_header(frame, app, theme, header_area);

    let body_area = if app.session().error().is_some() {
        let [banner_area, rest] = Layout::vertical([
            Constraint::Length(ERROR_BANNER_HEIGHT),
            Constraint::Min(0),
        ])
        .areas(body_area);
        render_error_banner(frame, app, theme, banner_area);
        rest
    } else {
        body_area
    };

    match app.session().stage() {
        Stage::Input => render_input_form(frame, app, theme, body_area),
        Stage::Planning | Stage::Researching | Stage::Summarizing => {
            render_loading(frame, app.session(), theme, body_area)
        }
        Stage::PlanReview => render_plan_review(frame, app, theme, body_area),
        Stage::FindingsReview => render_findings_review(frame, app, theme, body_area),
        Stage::Report => render_report(frame, app, theme, body_area),
    }

    render_status_bar(frame, app, theme, status_area);
}

pub fn stage_title(stage: Stage) -> &'static str {
    match stage {
        Stage::Input => "New Research Topic",
        Stage::Planning | Stage::PlanReview => "Research Plan",
        Stage::Researching | Stage::FindingsReview => "Research Findings",
        Stage::Summarizing | Stage::Report => "Research Report",
    }
}

pub fn stage_subtitle(stage: Stage) -> &'static str {
    match stage {
        Stage::Input => "Enter a topic to begin deep research with AI agents.",
        Stage::PlanReview => "Review and refine the research plan proposed by the planner agent.",
        Stage::FindingsReview => {
            "Review the gathered information before generating the final report."
        }
        Stage::Report => "Final comprehensive report based on multi-agent research.",
        Stage::Planning | Stage::Researching | Stage::Summarizing => "Working...",
    }
}

pub fn loading_line(session: &WorkflowSession) -> String {
    match session.stage() {
        Stage::Planning => "Analysing topic & generating research plan...".to_string(),
        Stage::Researching => format!("Deploying {} Agents...", session.sub_topics().len()),
        Stage::Summarizing => "Compiling final report...".to_string(),
        _ => String::new(),
    }
}

pub fn status_hints(app: &App) -> &'static str {
    if app.exporting() {
        return "Exporting report...";
    }
    match app.session().stage() {
        Stage::Input => "Tab switch field | Enter start planning | Esc close | Ctrl+C quit",
        Stage::PlanReview => {
            "Up/Down select | Tab title/instructions | Ctrl+N add | Ctrl+D remove | Enter start research"
        }
        Stage::FindingsReview => "Up/Down select | type to edit | Enter generate report",
        Stage::Report => "p export PDF | d export Word | Up/Down scroll | Esc close",
        Stage::Planning | Stage::Researching | Stage::Summarizing => {
            "Waiting for the remote agents... | Esc close | Ctrl+C quit"
        }
    }
}

fn render_header(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let stage = app.session().stage();
    let text = Text::from(vec![
        Line::from(Span::styled(
            stage_title(stage),
            Style::default()
                .fg(theme.accent_fg)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            stage_subtitle(stage),
            Style::default().fg(theme.muted_fg),
        )),
    ]);
    let header = Paragraph::new(text)
        .style(Style::default().bg(theme.header_bg).fg(theme.text_fg))
        .block(Block::default().padding(Padding::new(2, 2, 1, 0)));
    frame.render_widget(header, area);
}

fn render_error_banner(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let message = app.session().error().unwrap_or_default();
    let banner = Paragraph::new(format!("Error: {message}"))
        .style(
            Style::default()
                .bg(theme.body_bg)
                .fg(theme.error_fg)
                .add_modifier(Modifier::BOLD),
        )
        .wrap(Wrap { trim: true })
        .block(Block::default().padding(Padding::new(2, 2, 1, 0)));
    frame.render_widget(banner, area);
}

fn render_input_form(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let background = Paragraph::new("").style(Style::default().bg(theme.body_bg));
    frame.render_widget(background, area);

    let [topic_label, topic_box, _, prompt_label, prompt_box, _] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(pad(area, 2, 1));

    let topic_focused = app.input_focus() == InputField::Topic;
    render_field_label(frame, theme, topic_label, "Research Topic", topic_focused);
    render_field_value(
        frame,
        theme,
        topic_box,
        app.session().topic(),
        "e.g., Future of Quantum Computing",
        topic_focused,
    );

    let prompt_focused = app.input_focus() == InputField::CustomInstructions;
    render_field_label(
        frame,
        theme,
        prompt_label,
        "Custom Instructions (Optional)",
        prompt_focused,
    );
    render_field_value(
        frame,
        theme,
        prompt_box,
        app.session().custom_instructions(),
        "e.g., Focus on economic impact...",
        prompt_focused,
    );
}

fn render_loading(frame: &mut Frame, session: &WorkflowSession, theme: &Theme, area: Rect) {
    let [_, line_area, _] = Layout::vertical([
        Constraint::Percentage(45),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);
    let background = Paragraph::new("").style(Style::default().bg(theme.body_bg));
    frame.render_widget(background, area);
    let loading = Paragraph::new(loading_line(session))
        .style(Style::default().bg(theme.body_bg).fg(theme.muted_fg))
        .alignment(Alignment::Center);
    frame.render_widget(loading, line_area);
}

fn render_plan_review(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let session = app.session();
    let mut lines = Vec::new();
    if session.sub_topics().is_empty() {
        lines.push(Line::from(Span::styled(
            "The plan is empty. Ctrl+N adds a sub-topic.",
            Style::default().fg(theme.muted_fg),
        )));
    }
    for (idx, item) in session.sub_topics().iter().enumerate() {
        let selected = idx == app.plan_selected();
        let title_style = row_style(theme, selected && app.plan_focus() == PlanField::Title);
        let mut title = format!("{}. {}", idx + 1, item.title);
        if selected && app.plan_focus() == PlanField::Title {
            title.push_str(CURSOR_MARK);
        }
        lines.push(Line::from(Span::styled(title, title_style)));

        let instructions_focused = selected && app.plan_focus() == PlanField::Instructions;
        let mut instructions = match item.instructions.as_deref() {
            Some(text) => format!("   instructions: {text}"),
            None if instructions_focused => "   instructions: ".to_string(),
            None => "   (no instructions)".to_string(),
        };
        if instructions_focused {
            instructions.push_str(CURSOR_MARK);
        }
        let instructions_style = if instructions_focused {
            row_style(theme, true)
        } else {
            Style::default().fg(theme.muted_fg)
        };
        lines.push(Line::from(Span::styled(instructions, instructions_style)));
        lines.push(Line::from(""));
    }
    let list = Paragraph::new(Text::from(lines))
        .style(Style::default().bg(theme.body_bg).fg(theme.text_fg))
        .wrap(Wrap { trim: false })
        .block(Block::default().padding(Padding::new(2, 2, 1, 1)));
    frame.render_widget(list, area);
}

fn render_findings_review(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let session = app.session();
    let mut lines = Vec::new();
    for (idx, finding) in session.findings().iter().enumerate() {
        let selected = idx == app.findings_selected();
        let topic_style = if selected {
            Style::default()
                .fg(theme.accent_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_fg)
        };
        lines.push(Line::from(Span::styled(finding.topic.clone(), topic_style)));
        let mut text = finding.text.clone();
        if selected {
            text.push_str(CURSOR_MARK);
        }
        lines.push(Line::from(Span::styled(
            text,
            Style::default().fg(if selected {
                theme.text_fg
            } else {
                theme.muted_fg
            }),
        )));
        lines.push(Line::from(""));
    }
    if !session.sources().is_empty() {
        lines.push(Line::from(Span::styled(
            format!("{} sources collected", session.sources().len()),
            Style::default().fg(theme.muted_fg),
        )));
    }
    let body = Paragraph::new(Text::from(lines))
        .style(Style::default().bg(theme.body_bg).fg(theme.text_fg))
        .wrap(Wrap { trim: false })
        .block(Block::default().padding(Padding::new(2, 2, 1, 1)));
    frame.render_widget(body, area);
}

fn render_report(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let report = tui_markdown::from_str(app.session().report());
    let body = Paragraph::new(report)
        .style(Style::default().bg(theme.body_bg).fg(theme.text_fg))
        .wrap(Wrap { trim: false })
        .scroll((app.report_scroll(), 0))
        .block(Block::default().padding(Padding::new(2, 2, 1, 1)));
    frame.render_widget(body, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let text = match app.notice() {
        Some(notice) => notice.to_string(),
        None => status_hints(app).to_string(),
    };
    let bar = Paragraph::new(text)
        .style(Style::default().bg(theme.status_bg).fg(theme.muted_fg))
        .block(Block::default().padding(Padding::new(2, 2, 1, 0)));
    frame.render_widget(bar, area);
}

fn render_field_label(frame: &mut Frame, theme: &Theme, area: Rect, label: &str, focused: bool) {
    let style = if focused {
        Style::default()
            .bg(theme.body_bg)
            .fg(theme.accent_fg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(theme.body_bg).fg(theme.muted_fg)
    };
    frame.render_widget(Paragraph::new(label.to_string()).style(style), area);
}

fn render_field_value(
    frame: &mut Frame,
    theme: &Theme,
    area: Rect,
    value: &str,
    placeholder: &str,
    focused: bool,
) {
    let (text, fg) = if value.is_empty() && !focused {
        (placeholder.to_string(), theme.muted_fg)
    } else if focused {
        (format!("{value}{CURSOR_MARK}"), theme.text_fg)
    } else {
        (value.to_string(), theme.text_fg)
    };
    let field = Paragraph::new(text)
        .style(Style::default().bg(theme.input_bg).fg(fg))
        .wrap(Wrap { trim: false })
        .block(Block::default().padding(Padding::new(1, 1, 1, 0)));
    frame.render_widget(field, area);
}

fn row_style(theme: &Theme, focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(theme.accent_fg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text_fg)
    }
}

fn pad(area: Rect, horizontal: u16, vertical: u16) -> Rect {
    Rect {
        x: area.x.saturating_add(horizontal),
        y: area.y.saturating_add(vertical),
        width: area.width.saturating_sub(horizontal * 2),
        height: area.height.saturating_sub(vertical * 2),
    }
}

#[cfg(test)]
#[path = "../tests/unit/ui_tests.rs"]
mod tests;
