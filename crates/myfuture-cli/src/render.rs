use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Duration, Utc};
use myfuture_core::filter::{FilterMode, TaskCounts};
use myfuture_core::{Task, TaskStatus};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Config;
use crate::datetime::Zone;

const DUE_FORMAT: &str = "%Y-%m-%d %H:%M";
const COMMENT_PREVIEW_WIDTH: usize = 32;

pub struct Renderer<W: Write = io::Stdout> {
    out: W,
    color: bool,
    zone: Zone,
    due_soon: Duration,
}

impl Renderer<io::Stdout> {
    pub fn stdout(cfg: &Config, zone: Zone) -> anyhow::Result<Self> {
        let color = color_setting(cfg) && io::stdout().is_terminal();
        Ok(Self::new(io::stdout(), color, zone, cfg.due_soon_window()?))
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool, zone: Zone, due_soon: Duration) -> Self {
        Self {
            out,
            color,
            zone,
            due_soon,
        }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, tasks, now), fields(count = tasks.len()))]
    pub fn print_task_table(&mut self, tasks: &[&Task], now: DateTime<Utc>) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Due".to_string(),
            "Title".to_string(),
            "Comments".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = self.paint(task.id.as_str(), "33");

            let status = match task.status {
                TaskStatus::Completed => self.paint("[x] completed", "2"),
                TaskStatus::InProgress => self.paint("[~] in-progress", "36"),
                TaskStatus::Todo => "[ ] todo".to_string(),
            };

            let due = self.due_cell(task, now);

            let title = if task.is_completed() {
                self.paint(&task.title, "9")
            } else {
                task.title.clone()
            };

            rows.push(vec![id, status, due, title, preview(&task.comments)]);
        }

        write_table(&mut self.out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task, now), fields(id = %task.id))]
    pub fn print_task_info(&mut self, task: &Task, now: DateTime<Utc>) -> anyhow::Result<()> {
        writeln!(self.out, "id        {}", task.id)?;
        writeln!(self.out, "title     {}", task.title)?;
        writeln!(self.out, "status    {}", task.status)?;
        if let Some(millis) = task.id.millis()
            && let Some(created) = myfuture_core::datetime::from_millis(millis)
        {
            writeln!(self.out, "created   {}", self.zone.format(created, DUE_FORMAT))?;
        }
        if task.due_date.is_some() {
            let due = self.due_cell(task, now);
            writeln!(self.out, "due       {due}")?;
        }
        if !task.comments.is_empty() {
            writeln!(self.out, "comments")?;
            for line in task.comments.lines() {
                writeln!(self.out, "  {line}")?;
            }
        }
        Ok(())
    }

    /// Filter bar, e.g. `All 3 | Active 1 | Completed 2`. The selected
    /// mode is highlighted.
    pub fn print_counts(
        &mut self,
        counts: &TaskCounts,
        selected: Option<FilterMode>,
    ) -> anyhow::Result<()> {
        let cells: Vec<String> = FilterMode::ALL
            .iter()
            .map(|mode| {
                let cell = format!("{} {}", mode.label(), counts.count(*mode));
                if Some(*mode) == selected {
                    self.paint(&cell, "1")
                } else {
                    cell
                }
            })
            .collect();
        writeln!(self.out, "{}", cells.join(" | "))?;
        Ok(())
    }

    fn due_cell(&self, task: &Task, now: DateTime<Utc>) -> String {
        let Some(due) = task.due_date else {
            return String::new();
        };
        let text = self.zone.format(due, DUE_FORMAT);
        if task.is_overdue(now) {
            self.paint(&format!("{text} (overdue)"), "31")
        } else if task.is_due_soon(now, self.due_soon) {
            self.paint(&format!("{text} (soon)"), "33")
        } else {
            text
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn color_setting(cfg: &Config) -> bool {
    cfg.get_bool("color").unwrap_or(true)
}

/// First line of the comments, cut to fit a table cell.
fn preview(comments: &str) -> String {
    let first = comments.lines().next().unwrap_or_default().trim();
    let more = comments.lines().nth(1).is_some();

    let mut out = String::new();
    let mut width = 0;
    for ch in first.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w > COMMENT_PREVIEW_WIDTH {
            out.push('…');
            return out;
        }
        width += w;
        out.push(ch);
    }
    if more {
        out.push('…');
    }
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| format!("{header:width$}"))
        .collect();
    writeln!(writer, "{}", header_line.join(" ").trim_end())?;

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    writeln!(writer, "{}", rule.join(" "))?;

    for row in rows {
        let mut line = String::new();
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            line.push_str(cell);
            line.push_str(&" ".repeat(padding));
            line.push(' ');
        }
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use myfuture_core::filter::{FilterMode, TaskCounts};
    use myfuture_core::{Task, TaskId, TaskStatus};

    use super::{Renderer, color_setting, preview, strip_ansi};
    use crate::config::Config;
    use crate::datetime::Zone;

    fn renderer(color: bool) -> Renderer<Vec<u8>> {
        Renderer::new(Vec::new(), color, Zone::Named(chrono_tz::UTC), Duration::hours(24))
    }

    fn output(renderer: Renderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn table_marks_due_state_and_completion() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let overdue = Task::new(TaskId::from("3"), "File taxes", Some(now - Duration::hours(1)));
        let soon = Task::new(TaskId::from("2"), "Call mum", Some(now + Duration::hours(3)));
        let mut done = Task::new(TaskId::from("1"), "Water plants", None);
        done.status = TaskStatus::Completed;
        done.comments = "balcony first\nthen kitchen".to_string();

        let mut r = renderer(false);
        r.print_task_table(&[&overdue, &soon, &done], now).unwrap();
        let text = output(r);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("2026-10-18 08:00 (overdue)"));
        assert!(lines[3].contains("2026-10-18 12:00 (soon)"));
        assert!(lines[4].contains("[x] completed"));
        assert!(lines[4].ends_with("balcony first…"));
    }

    #[test]
    fn colored_cells_keep_columns_aligned() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let a = Task::new(TaskId::from("10"), "a", Some(now - Duration::hours(1)));
        let b = Task::new(TaskId::from("9"), "b", None);

        let mut r = renderer(true);
        r.print_task_table(&[&a, &b], now).unwrap();
        let text = output(r);
        let plain: Vec<String> = text.lines().map(strip_ansi).collect();
        let title_col = plain[0].find("Title").unwrap();
        assert_eq!(plain[2].find('a'), Some(title_col));
        assert_eq!(plain[3].find('b'), Some(title_col));
    }

    #[test]
    fn counts_bar_lists_every_filter() {
        let counts = TaskCounts {
            all: 3,
            active: 1,
            completed: 2,
        };
        let mut r = renderer(false);
        r.print_counts(&counts, Some(FilterMode::Active)).unwrap();
        assert_eq!(output(r), "All 3 | Active 1 | Completed 2\n");
    }

    #[test]
    fn long_comments_are_cut() {
        let long = "x".repeat(40);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), 33);
        assert!(cut.ends_with('…'));
        assert_eq!(preview(""), "");
    }

    #[test]
    fn color_accepts_the_usual_boolean_spellings() {
        let mut cfg = Config::defaults();
        assert!(color_setting(&cfg));

        let cases = [("y", true), ("Yes", true), ("1", true), ("off", false), ("no", false)];
        for (value, expected) in cases {
            cfg.apply_overrides([("rc.color".to_string(), value.to_string())]);
            assert_eq!(color_setting(&cfg), expected, "color={value}");
        }
    }
}
