// Output formatting utilities

use serde::Serialize;
use std::io::IsTerminal;
use crate::engine::BoardView;
use crate::models::{Lead, Pipeline, Stage};

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_RESET: &str = "\x1b[0m";

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    100
}

fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

fn dim_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_DIM, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Format a monetary amount with thousands separators and two decimals
pub fn format_money(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}.{:02}", grouped, cents % 100)
}

/// Truncate to `width` characters, marking the cut with `…`
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

pub fn format_pipeline_list(pipelines: &[Pipeline]) -> String {
    if pipelines.is_empty() {
        return "No pipelines.".to_string();
    }
    let mut out = format!("{:<6} {}\n", "ID", "Name");
    for pipeline in pipelines {
        out.push_str(&format!("{:<6} {}\n", pipeline.id.unwrap_or_default(), pipeline.name));
    }
    out
}

/// Stage table in display order
pub fn format_stage_table(view: &BoardView, is_tty: bool) -> String {
    let stages = view.stages.ordered();
    if stages.is_empty() {
        return "No stages.".to_string();
    }
    let name_width = stages.iter().map(|s| s.name.chars().count()).max().unwrap_or(4).max(4);
    let header = format!(
        "{:<6} {:<5} {:<name_width$} {:>5} {:>14}",
        "ID", "Order", "Name", "Leads", "Value",
        name_width = name_width
    );
    let mut out = bold_if_tty(&header, is_tty);
    out.push('\n');
    for stage in stages {
        out.push_str(&format!(
            "{:<6} {:<5} {:<name_width$} {:>5} {:>14}\n",
            stage.id,
            stage.order,
            stage.name,
            view.leads.count_in_stage(stage.id),
            format_money(view.leads.total_value(stage.id)),
            name_width = name_width
        ));
    }
    out
}

/// Lead table; `stages` resolves stage names
pub fn format_lead_table(leads: &[Lead], stages: &[Stage], is_tty: bool) -> String {
    if leads.is_empty() {
        return "No leads.".to_string();
    }
    let stage_name = |lead: &Lead| {
        stages
            .iter()
            .find(|s| s.id == lead.stage_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("#{}", lead.stage_id))
    };
    let header = format!(
        "{:<6} {:<24} {:<16} {:<8} {:>14}",
        "ID", "Name", "Stage", "Priority", "Value"
    );
    let mut out = bold_if_tty(&header, is_tty);
    out.push('\n');
    for lead in leads {
        out.push_str(&format!(
            "{:<6} {:<24} {:<16} {:<8} {:>14}\n",
            lead.id,
            truncate(&lead.name, 24),
            truncate(&stage_name(lead), 16),
            lead.priority.as_str(),
            format_money(lead.value)
        ));
    }
    out
}

/// Board: every stage in order with its leads and value total
pub fn format_board(view: &BoardView, width: usize, is_tty: bool) -> String {
    let stages = view.stages.ordered();
    if stages.is_empty() {
        return "No stages. Add one with 'salesline stages add <name>'.".to_string();
    }
    let name_width = width.saturating_sub(24).max(12);
    let mut out = String::new();
    for stage in stages {
        let leads = view.leads.leads_in_stage(stage.id);
        let heading = format!(
            "{} ({}) {}",
            stage.name,
            leads.len(),
            format_money(view.leads.total_value(stage.id))
        );
        out.push_str(&bold_if_tty(&heading, is_tty));
        out.push('\n');
        if leads.is_empty() {
            out.push_str(&dim_if_tty("  (empty)", is_tty));
            out.push('\n');
        }
        for lead in leads {
            out.push_str(&format!(
                "  {:<5} {:<name_width$} {:>14}\n",
                lead.id,
                truncate(&lead.name, name_width),
                format_money(lead.value),
                name_width = name_width
            ));
        }
    }
    out
}

/// JSON shape of one board column
#[derive(Debug, Serialize)]
pub struct BoardColumn<'a> {
    pub stage: &'a Stage,
    pub leads: Vec<&'a Lead>,
    pub total_value: f64,
}

pub fn board_columns(view: &BoardView) -> Vec<BoardColumn<'_>> {
    view.stages
        .ordered()
        .iter()
        .map(|stage| BoardColumn {
            stage,
            leads: view.leads.leads_in_stage(stage.id),
            total_value: view.leads.total_value(stage.id),
        })
        .collect()
}
