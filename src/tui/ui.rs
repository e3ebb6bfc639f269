//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::Status;
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60),
            Constraint::Percentage(40),
        ])
        .split(frame.area());

    // Left side: program and state
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_program(frame, left_chunks[0], app);
    draw_machine(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: registers and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(5),
        ])
        .split(chunks[1]);

    draw_registers(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

/// Draw the program listing with the current instruction highlighted.
fn draw_program(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let listing = app.get_listing((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = listing
        .iter()
        .map(|(index, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(format!("{}{:03}: {}", prefix, index, instr)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Program ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw accumulator, program counter, and run state.
fn draw_machine(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let machine = &app.machine;

    let content = vec![
        Line::from(vec![
            Span::raw("ACC: "),
            Span::styled(format!("{:>20}", machine.acc()), Style::default().fg(Color::White)),
            Span::raw("   PC: "),
            Span::styled(format!("{}", machine.pc()), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("Last status: "),
            Span::styled(format!("{}", machine.last_status()), status_style(machine.last_status())),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", machine.cycles()), Style::default().fg(Color::Cyan)),
            Span::raw("   Delay: "),
            Span::styled(format!("{} ms", machine.delay_ms()), Style::default().fg(Color::Cyan)),
            Span::raw("   "),
            if machine.is_running() {
                Span::styled("RUNNING", Style::default().fg(Color::Green))
            } else {
                Span::styled("IDLE", Style::default().fg(Color::DarkGray))
            },
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Machine ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw the register file.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let registers = app.machine.registers().as_slice();
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.reg_scroll.min(registers.len());
    let end = (start + visible_rows).min(registers.len());

    let items: Vec<ListItem> = (start..end)
        .map(|index| {
            let value = registers[index];
            let name = if index == 0 { "ACC".to_string() } else { format!("R{:03}", index) };

            let style = if index == 0 {
                Style::default().fg(Color::Yellow)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(format!("{:>4}: {}", name, value)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  x: Reset"),
        Line::from("+/-: Faster/slower  ↑↓: Scroll  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Color for a status code.
fn status_style(status: Status) -> Style {
    match status {
        Status::Continue => Style::default().fg(Color::Green),
        Status::Halted => Style::default().fg(Color::Gray),
        Status::NoInstruction | Status::InvalidOperand => Style::default().fg(Color::Red),
    }
}
