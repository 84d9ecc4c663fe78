use colored::*;
use gvmkit_common::entities::TaskStatus;
use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::{colors, format};

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

/// Span whose progress bar shows the latest status of a watched task.
/// The bar disappears when the span is dropped.
pub fn watch_span(task: &str) -> Span {
    let span = info_span!("watch", indicatif.pb_show = true);
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        span.pb_set_style(&style.tick_strings(TICKS));
    }
    span.pb_set_message(&format!("Waiting for task {}...", task.color(colors::IDENTIFIER)));
    span
}

pub fn report_status(span: &Span, status: &TaskStatus) {
    span.pb_set_message(&format!(
        "Task {} is {}",
        status.task_id.to_string().color(colors::IDENTIFIER),
        format::state(&status.state)
    ));
}
