//! CLI output helpers: colored status lines, spinners and result tables.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::crew::CrewOutput;
use crate::models::PaperRecord;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => println!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Search => println!("{} {}", icon.yellow(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "─".repeat(80).dimmed());
}

/// Truncate to `max_width` characters, ending with "..." when cut.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width <= 3 {
        return "...".to_string();
    }
    if text.chars().count() <= max_width {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_width - 3).collect();
    format!("{}...", truncated.trim_end())
}

/// Print search results as a table.
pub fn print_papers_table(records: &[PaperRecord]) {
    use comfy_table::{Attribute, Cell, Table};

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["#", "Title", "Authors", "PDF", "Published"]);

    for (i, record) in records.iter().enumerate() {
        let pdf = if record.resource_link.is_empty() {
            "-"
        } else {
            "yes"
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(truncate_with_ellipsis(&record.title, 50)).add_attribute(Attribute::Bold),
            Cell::new(truncate_with_ellipsis(&record.authors, 30)),
            Cell::new(pdf),
            Cell::new(truncate_with_ellipsis(&record.summary, 40)),
        ]);
    }
    println!("{table}");
}

/// Print every task's output, the final one last.
pub fn print_crew_output(output: &CrewOutput) {
    for (i, task) in output.tasks.iter().enumerate() {
        print_section(&format!("Task {} · {}", i + 1, task.agent));
        println!("{}", task.description.dimmed());
        println!();
        println!("{}", task.output);
    }
    print_divider();
}

/// Loading spinner with a message.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    pub fn new(msg: &str) -> Self {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(style("{spinner:.cyan} {msg}", "⠁⠂⠄⡀⢀⠠⠐⠈ "));
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// A spinner that draws nothing (quiet mode, JSON output)
    pub fn hidden() -> Self {
        Self {
            pb: indicatif::ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_with_success(&self, msg: &str) {
        self.pb.set_style(style("{spinner:.green} {msg}", "✓ "));
        self.pb.finish_with_message(msg.to_string());
    }

    pub fn finish_with_error(&self, msg: &str) {
        self.pb.set_style(style("{spinner:.red} {msg}", "✗ "));
        self.pb.finish_with_message(msg.to_string());
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}

fn style(template: &str, tick_chars: &str) -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template(template)
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner())
        .tick_chars(tick_chars)
}
