use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use std::collections::HashSet;
use std::io;

use crate::page_scan::PaperRecord;

/// Checkbox-list state over the current paper collection. The selection is
/// a set of identifiers, always a subset of the listed papers.
pub struct PickerState {
    papers: Vec<PaperRecord>,
    cursor: usize,
    selected: HashSet<String>,
}

impl PickerState {
    pub fn new(papers: &[PaperRecord]) -> Self {
        Self {
            papers: papers.to_vec(),
            cursor: 0,
            selected: HashSet::new(),
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.papers.len() {
            self.cursor += 1;
        }
    }

    pub fn toggle_current(&mut self) {
        if let Some(paper) = self.papers.get(self.cursor) {
            if !self.selected.remove(&paper.arxiv_id) {
                self.selected.insert(paper.arxiv_id.clone());
            }
        }
    }

    /// Select everything, or clear when everything is already selected.
    pub fn toggle_all(&mut self) {
        if self.selected.len() == self.papers.len() {
            self.selected.clear();
        } else {
            self.selected = self
                .papers
                .iter()
                .map(|paper| paper.arxiv_id.clone())
                .collect();
        }
    }

    pub fn selected_ids(&self) -> HashSet<String> {
        self.selected.clone()
    }

    fn line_for(&self, paper: &PaperRecord) -> String {
        let mark = if self.selected.contains(&paper.arxiv_id) {
            "[x]"
        } else {
            "[ ]"
        };
        let title = match &paper.title {
            Some(title) => title.as_str(),
            None if paper.title_fetched => "Title unavailable",
            None => "Fetching title...",
        };
        format!("{} {} — {} • {}", mark, title, paper.arxiv_id, paper.source.label())
    }
}

/// Let the user pick papers interactively. Returns `None` when the picker
/// is dismissed without confirming.
pub fn pick_papers(papers: &[PaperRecord]) -> Result<Option<HashSet<String>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = PickerState::new(papers);
    let outcome = run_loop(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut PickerState,
) -> Result<Option<HashSet<String>>> {
    loop {
        terminal.draw(|f| ui(f, state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => state.move_up(),
                KeyCode::Down | KeyCode::Char('j') => state.move_down(),
                KeyCode::Char(' ') => state.toggle_current(),
                KeyCode::Char('a') => state.toggle_all(),
                KeyCode::Enter => return Ok(Some(state.selected_ids())),
                KeyCode::Char('q') | KeyCode::Esc => return Ok(None),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut ratatui::Frame, state: &PickerState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(f.area());

    let items: Vec<ListItem> = state
        .papers
        .iter()
        .enumerate()
        .map(|(index, paper)| {
            let style = if index == state.cursor {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::styled(state.line_for(paper), style))
        })
        .collect();

    let title = format!(
        "Papers ({} found, {} selected)",
        state.papers.len(),
        state.selected.len()
    );
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(list, chunks[0]);

    let help = Paragraph::new("space toggle • a all/none • enter download • q cancel")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_scan::SourceLabel;
    use ratatui::backend::TestBackend;

    fn sample_papers() -> Vec<PaperRecord> {
        vec![
            PaperRecord::new(
                "1706.03762",
                Some("Attention Is All You Need".to_string()),
                SourceLabel::OpenTab,
            ),
            PaperRecord::new("1512.03385", None, SourceLabel::SearchResults),
        ]
    }

    #[test]
    fn test_toggle_and_select_all() {
        let papers = sample_papers();
        let mut state = PickerState::new(&papers);

        assert!(state.selected_ids().is_empty());

        state.toggle_current();
        assert_eq!(state.selected_ids().len(), 1);
        assert!(state.selected_ids().contains("1706.03762"));

        state.toggle_all();
        assert_eq!(state.selected_ids().len(), 2);

        state.toggle_all();
        assert!(state.selected_ids().is_empty());
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let papers = sample_papers();
        let mut state = PickerState::new(&papers);

        state.move_up();
        assert_eq!(state.cursor, 0);

        state.move_down();
        state.move_down();
        state.move_down();
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_ui_renders_titles_and_checkboxes() {
        let papers = sample_papers();
        let mut state = PickerState::new(&papers);
        state.toggle_current();

        let backend = TestBackend::new(80, 10);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(f, &state)).unwrap();

        let rendered: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();

        assert!(rendered.contains("[x] Attention Is All You Need"));
        assert!(rendered.contains("[ ] Fetching title..."));
        assert!(rendered.contains("2 found, 1 selected"));
    }
}
