use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Local;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Config;
use crate::datetime::format_iso_date;
use crate::task::TaskItem;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, items))]
    pub fn print_task_table(&mut self, items: &[TaskItem]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let today = Local::now().date_naive();

        let headers = ["ID", "Done", "Due", "Pri", "Category", "Title"];
        let mut rows = Vec::with_capacity(items.len());

        for item in items {
            let done = if item.completed { "x" } else { "" };

            let due = item.due_date.map(format_iso_date).unwrap_or_default();
            let due = match item.due_date {
                Some(date) if date < today && !item.completed => self.paint(&due, "31"),
                _ => due,
            };

            rows.push([
                self.paint(&item.id, "33"),
                done.to_string(),
                due,
                item.priority.label().to_string(),
                item.category.clone(),
                item.title.clone(),
            ]);
        }

        let mut widths: Vec<usize> = headers
            .iter()
            .map(|header| UnicodeWidthStr::width(*header))
            .collect();
        for row in &rows {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(visible_width(cell));
            }
        }

        for (idx, header) in headers.iter().enumerate() {
            write!(out, "{:width$} ", header, width = widths[idx])?;
        }
        writeln!(out)?;
        for width in widths.iter().copied() {
            write!(out, "{:-<width$} ", "")?;
        }
        writeln!(out)?;

        for row in rows {
            for (idx, cell) in row.iter().enumerate() {
                let padding = widths[idx].saturating_sub(visible_width(cell));
                write!(out, "{}{} ", cell, " ".repeat(padding))?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

// Display width excluding ANSI escape sequences.
fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;

    for ch in text.chars() {
        if in_escape {
            in_escape = ch != 'm';
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += UnicodeWidthChar::width(ch).unwrap_or(0);
        }
    }

    width
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{Renderer, visible_width};
    use crate::config::Config;

    fn config_with_color(value: &str) -> Config {
        let mut rc = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(rc, "color = {value}").expect("write");
        rc.flush().expect("flush");
        Config::load(Some(rc.path())).expect("load")
    }

    #[test]
    fn visible_width_ignores_ansi_escapes() {
        assert_eq!(visible_width("plain"), 5);
        assert_eq!(visible_width("\x1b[31m2024-01-01\x1b[0m"), 10);
    }

    #[test]
    fn color_setting_must_be_a_known_value() {
        assert!(!Renderer::new(&config_with_color("off")).expect("valid").color);
        assert!(Renderer::new(&config_with_color("on")).expect("valid").color);
        assert!(Renderer::new(&config_with_color("blue")).is_err());
    }
}
