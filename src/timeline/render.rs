//! Rendering collaborators
//!
//! A renderer receives the flat task list plus display configuration and
//! draws it. Renderers are mounted through [`MountedRenderer`], which owns
//! the renderer and guarantees `teardown` runs when the view goes away.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{DisplayConfig, TimelineTask};
use crate::utils::CANONICAL_DATE_FORMAT;

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_RESET: &str = "\x1b[0m";

// One entry per color bucket
const BUCKET_PALETTE: &[&str] = &[
    "\x1b[34m", // blue
    "\x1b[32m", // green
    "\x1b[36m", // cyan
    "\x1b[35m", // magenta
    "\x1b[33m", // yellow
    "\x1b[94m", // bright blue
    "\x1b[92m", // bright green
    "\x1b[96m", // bright cyan
];

const MILESTONE_MARK: char = '◆';
const DONE_CELL: char = '█';
const OPEN_CELL: char = '░';
const HEADER_CELL: char = '━';
const EXPECTED_MARK: char = '│';

const MAX_LABEL_WIDTH: usize = 32;
const MIN_CHART_WIDTH: usize = 10;
// " 100%  ← ..." is budgeted separately
const SUFFIX_RESERVE: usize = 8;

pub trait TimelineRenderer {
    /// Acquire whatever the renderer needs before the first draw
    fn mount(&mut self, _config: &DisplayConfig) -> Result<()> {
        Ok(())
    }

    fn render(&mut self, tasks: &[TimelineTask], config: &DisplayConfig) -> Result<()>;

    /// Release everything `mount` acquired
    fn teardown(&mut self) {}
}

/// A mounted renderer; teardown runs on drop
pub struct MountedRenderer<R: TimelineRenderer> {
    renderer: R,
    config: DisplayConfig,
}

impl<R: TimelineRenderer> MountedRenderer<R> {
    pub fn mount(mut renderer: R, config: DisplayConfig) -> Result<Self> {
        renderer.mount(&config).context("Failed to mount timeline renderer")?;
        Ok(Self { renderer, config })
    }

    pub fn render(&mut self, tasks: &[TimelineTask]) -> Result<()> {
        self.renderer.render(tasks, &self.config)
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }
}

impl<R: TimelineRenderer> Drop for MountedRenderer<R> {
    fn drop(&mut self) {
        self.renderer.teardown();
    }
}

/// Terminal renderer: one row per task, bars scaled to the available width
pub struct TextRenderer<W: Write> {
    out: W,
    width: usize,
    color: bool,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, width: usize, color: bool) -> Self {
        Self { out, width, color }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("{}{}{}", code, text, ANSI_RESET)
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> TimelineRenderer for TextRenderer<W> {
    fn render(&mut self, tasks: &[TimelineTask], config: &DisplayConfig) -> Result<()> {
        let (Some(first), Some(last)) = (
            tasks.iter().map(|t| t.start).min(),
            tasks.iter().map(|t| t.end).max(),
        ) else {
            writeln!(self.out, "No tasks to display.")?;
            return Ok(());
        };

        let grouped = tasks.iter().any(TimelineTask::is_group_header);
        let indent = if grouped { 2 } else { 0 };
        let label_width = tasks
            .iter()
            .map(|t| t.name.chars().count() + if t.is_group_header() { 0 } else { indent })
            .max()
            .unwrap_or(0)
            .clamp(4, MAX_LABEL_WIDTH);
        let chart_width = self
            .width
            .saturating_sub(label_width + 2 + SUFFIX_RESERVE)
            .max(MIN_CHART_WIDTH);

        let total_days = (last - first).num_days().max(1);
        let natural_columns = (total_days as f64 / config.granularity.column_days()).ceil() as usize;
        let columns = natural_columns.clamp(1, chart_width);
        let scale = Scale {
            first,
            days_per_column: total_days as f64 / columns as f64,
            columns,
        };

        let task_count = tasks.iter().filter(|t| !t.is_group_header()).count();
        let heading = format!(
            "{} .. {}  ({} view, {} task{})",
            first.format(CANONICAL_DATE_FORMAT),
            last.format(CANONICAL_DATE_FORMAT),
            config.granularity.as_str(),
            task_count,
            if task_count == 1 { "" } else { "s" }
        );
        writeln!(self.out, "{}", self.paint(&heading, ANSI_BOLD))?;

        let names: HashMap<&str, &str> = tasks.iter().map(|t| (t.id.as_str(), t.name.as_str())).collect();

        for task in tasks {
            let pad = if task.is_group_header() { 0 } else { indent };
            let label = fit_label(&task.name, label_width - pad);
            let label = format!("{}{}", " ".repeat(pad), label);
            let label = if task.is_group_header() {
                self.paint(&label, ANSI_BOLD)
            } else {
                label
            };

            let bar = draw_bar(task, &scale, config);
            let bar = match task.color_bucket {
                Some(bucket) => self.paint(&bar, BUCKET_PALETTE[bucket % BUCKET_PALETTE.len()]),
                None => bar,
            };

            let mut suffix = String::new();
            if task.is_milestone {
                suffix.push_str(&format!(" {}", task.start.format(CANONICAL_DATE_FORMAT)));
            } else if config.show_progress && !task.is_group_header() {
                suffix.push_str(&format!(" {:>3}%", task.progress));
            }
            if !task.dependencies.is_empty() {
                let deps: Vec<&str> = task
                    .dependencies
                    .iter()
                    .map(|id| names.get(id.as_str()).copied().unwrap_or(id.as_str()))
                    .collect();
                suffix.push_str(&self.paint(&format!("  ← {}", deps.join(", ")), ANSI_DIM));
            }

            writeln!(self.out, "{}  {}{}", label, bar, suffix)?;
        }
        Ok(())
    }

    fn teardown(&mut self) {
        if let Err(e) = self.out.flush() {
            log::warn!("Failed to flush timeline output: {}", e);
        }
    }
}

struct Scale {
    first: chrono::NaiveDate,
    days_per_column: f64,
    columns: usize,
}

impl Scale {
    fn column_of(&self, date: chrono::NaiveDate) -> usize {
        let days = (date - self.first).num_days() as f64;
        ((days / self.days_per_column).floor() as usize).min(self.columns - 1)
    }

    fn span(&self, task: &TimelineTask) -> (usize, usize) {
        let offset = self.column_of(task.start);
        let days = (task.end - task.start).num_days() as f64;
        let len = ((days / self.days_per_column).round() as usize)
            .max(1)
            .min(self.columns - offset);
        (offset, len)
    }
}

fn draw_bar(task: &TimelineTask, scale: &Scale, config: &DisplayConfig) -> String {
    let mut cells = vec![' '; scale.columns];
    let (offset, len) = scale.span(task);

    if task.is_milestone {
        cells[offset] = MILESTONE_MARK;
    } else if task.is_group_header() {
        cells[offset..offset + len].fill(HEADER_CELL);
    } else {
        let done = if config.show_progress {
            (len * task.progress as usize + 50) / 100
        } else {
            len
        };
        cells[offset..offset + done].fill(DONE_CELL);
        cells[offset + done..offset + len].fill(OPEN_CELL);

        if config.show_expected_progress {
            if let Some(expected) = task.expected_progress {
                let at = offset + (len * expected as usize / 100).min(len - 1);
                cells[at] = EXPECTED_MARK;
            }
        }
    }

    cells.into_iter().collect::<String>().trim_end().to_string()
}

fn fit_label(name: &str, width: usize) -> String {
    let count = name.chars().count();
    if count <= width {
        format!("{}{}", name, " ".repeat(width - count))
    } else if width > 1 {
        let kept: String = name.chars().take(width - 1).collect();
        format!("{}…", kept)
    } else {
        name.chars().take(width).collect()
    }
}

/// Machine-readable renderer: the task list and display config as JSON
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

#[derive(Serialize)]
struct JsonTimeline<'a> {
    config: &'a DisplayConfig,
    tasks: &'a [TimelineTask],
}

impl<W: Write> TimelineRenderer for JsonRenderer<W> {
    fn render(&mut self, tasks: &[TimelineTask], config: &DisplayConfig) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, &JsonTimeline { config, tasks })?;
        writeln!(self.out)?;
        Ok(())
    }

    fn teardown(&mut self) {
        if let Err(e) = self.out.flush() {
            log::warn!("Failed to flush timeline output: {}", e);
        }
    }
}
