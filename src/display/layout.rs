//! Dashboard layout.
//!
//! Builds one frame as a list of lines, exactly one per terminal row, each
//! padded or cut to exactly the terminal width. Pure: no terminal access.
//!
//! ```text
//! row 0              status: listen -> destination ........ timestamp
//! row 1              Ongoing Requests (n)            (inverse)
//! rows 2..2+k        newest open requests first      (k = open_rows)
//! row 2+k            "<n> hidden" or blank
//! row 3+k            Request Statistics (n)          (inverse)
//! rows 4+k..H-1      slowest paths first
//! row H-1            "<n> hidden" or blank
//! ```

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::ledger::{LedgerSnapshot, OpenRequest, PathStatistic};

/// Terminal size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u16,
    pub height: u16,
}

/// How a line is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Plain,
    /// Section header, inverse colors.
    Header,
    /// Attention, red foreground.
    Alert,
}

/// One terminal row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub style: LineStyle,
}

impl Line {
    fn plain(text: String) -> Self {
        Self { text, style: LineStyle::Plain }
    }

    fn blank(width: usize) -> Self {
        Self::plain(" ".repeat(width))
    }
}

/// Fixed inputs of every frame.
#[derive(Debug, Clone)]
pub struct FrameSettings {
    /// Where the proxy listens, as shown in the status row.
    pub listen: String,
    /// Upstream `host:port`.
    pub destination: String,
    /// Rows reserved for ongoing requests.
    pub open_rows: usize,
    /// Ongoing requests older than this are drawn as alerts.
    pub slow_after: Duration,
}

/// Build a frame from a ledger snapshot.
///
/// `now` measures elapsed time of open requests; `timestamp` is printed in
/// the status row as-is.
pub fn build_frame(
    snapshot: &LedgerSnapshot,
    settings: &FrameSettings,
    dims: Dimensions,
    now: Instant,
    timestamp: &str,
) -> Vec<Line> {
    let width = dims.width as usize;
    let height = dims.height as usize;
    let mut lines = Vec::with_capacity(height.max(settings.open_rows + 5));

    let status = format!("Server Running: {} -> {}", settings.listen, settings.destination);
    lines.push(Line::plain(split_line(&status, timestamp, width)));

    // Ongoing requests
    lines.push(header(&format!("Ongoing Requests ({})", snapshot.open.len()), width));

    let mut open: Vec<&OpenRequest> = snapshot.open.iter().collect();
    open.sort_by(|a, b| newest_first(a, b));
    let shown = open.len().min(settings.open_rows);

    for request in &open[..shown] {
        let elapsed = now.saturating_duration_since(request.started_at);
        let text = format!(
            " {:06}  {:>11}  {:<7} {}",
            request.id.as_u64(),
            format_elapsed(elapsed),
            request.method,
            request.path
        );
        let style = if elapsed >= settings.slow_after {
            LineStyle::Alert
        } else {
            LineStyle::Plain
        };
        lines.push(Line { text: fit_width(&text, width), style });
    }
    for _ in shown..settings.open_rows {
        lines.push(Line::blank(width));
    }
    lines.push(hidden_row(open.len() - shown, width));

    // Statistics
    lines.push(header(&format!("Request Statistics ({})", snapshot.stats.len()), width));

    let mut stats: Vec<&PathStatistic> = snapshot.stats.iter().collect();
    stats.sort_by(|a, b| slowest_first(a, b));

    // Everything between the statistics header and the final row.
    let stat_rows = height.saturating_sub(lines.len() + 1);
    let shown = stats.len().min(stat_rows);

    for stat in &stats[..shown] {
        let text = format!(
            " {:>8.0} ms  {:>7} calls  {:>5} failed  {}",
            stat.average_response_millis, stat.call_count, stat.failure_count, stat.path
        );
        lines.push(Line::plain(fit_width(&text, width)));
    }
    for _ in shown..stat_rows {
        lines.push(Line::blank(width));
    }
    lines.push(hidden_row(stats.len() - shown, width));

    lines.truncate(height);
    lines
}

fn newest_first(a: &OpenRequest, b: &OpenRequest) -> Ordering {
    b.started_at.cmp(&a.started_at).then_with(|| b.id.cmp(&a.id))
}

fn slowest_first(a: &PathStatistic, b: &PathStatistic) -> Ordering {
    b.average_response_millis
        .total_cmp(&a.average_response_millis)
        .then_with(|| a.path.cmp(&b.path))
}

fn header(title: &str, width: usize) -> Line {
    Line {
        text: center(title, width),
        style: LineStyle::Header,
    }
}

fn hidden_row(hidden: usize, width: usize) -> Line {
    if hidden == 0 {
        Line::blank(width)
    } else {
        Line::plain(center(&format!("{} hidden", hidden), width))
    }
}

/// Pad with spaces or cut to exactly `width` characters.
pub fn fit_width(text: &str, width: usize) -> String {
    let mut fitted: String = text.chars().take(width).collect();
    let len = fitted.chars().count();
    fitted.extend(std::iter::repeat(' ').take(width - len));
    fitted
}

/// Center `text` in `width` characters.
pub fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return fit_width(text, width);
    }
    let left = (width - len) / 2;
    fit_width(&format!("{}{}", " ".repeat(left), text), width)
}

/// `left` flush left and `right` flush right in `width` characters.
///
/// When both do not fit with a space between them, the combined text is cut.
pub fn split_line(left: &str, right: &str, width: usize) -> String {
    let used = left.chars().count() + right.chars().count();
    if used < width {
        format!("{}{}{}", left, " ".repeat(width - used), right)
    } else {
        fit_width(&format!("{} {}", left, right), width)
    }
}

/// `"1h 2m 3s"`, `"2m 3s"` or `"3s"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
