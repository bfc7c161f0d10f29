//! `plan` command: show how a document splits into windows.

use std::path::PathBuf;

use bookwindow::chapter::{Chapter, IndexProvider, VisibilitySettings};
use bookwindow::window::{WindowCalculator, WindowLayout, WindowRange};
use clap::Args;

use super::common::{apply_window_size, load_config, load_manifest};
use crate::error::CliError;

/// Arguments for `bookwindow plan`.
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Chapter manifest (JSON)
    #[arg(long)]
    pub manifest: PathBuf,

    /// Chapters per window (overrides config)
    #[arg(long)]
    pub chapters_per_window: Option<usize>,

    /// Show non-linear chapters (footnotes, answer keys)
    #[arg(long)]
    pub include_non_linear: bool,
}

/// One window of the plan with its raw chapter span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWindow {
    pub range: WindowRange,
    pub raw_first: usize,
    pub raw_last: usize,
}

/// Window plan for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub raw_chapters: usize,
    pub visible_chapters: usize,
    pub chapters_per_window: usize,
    /// Window count if raw chapters were (wrongly) used.
    pub raw_window_count: usize,
    pub windows: Vec<PlannedWindow>,
}

/// Build the plan from a chapter list.
pub fn build_plan(
    chapters: Vec<Chapter>,
    visibility: VisibilitySettings,
    chapters_per_window: usize,
) -> Result<Plan, CliError> {
    let index = IndexProvider::with_chapters(chapters, visibility);
    let layout = WindowLayout::new(index.visible_chapter_count(), chapters_per_window)
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    let raw_window_count =
        WindowCalculator::window_count(index.raw_chapter_count(), chapters_per_window)
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    let windows = layout
        .ranges()
        .filter_map(|range| {
            Some(PlannedWindow {
                raw_first: index.visible_to_raw(range.first_chapter)?,
                raw_last: index.visible_to_raw(range.last_chapter)?,
                range,
            })
        })
        .collect();

    Ok(Plan {
        raw_chapters: index.raw_chapter_count(),
        visible_chapters: index.visible_chapter_count(),
        chapters_per_window,
        raw_window_count,
        windows,
    })
}

/// Run the plan command.
pub fn run(args: PlanArgs, config_path: Option<&std::path::Path>) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    apply_window_size(&mut config, args.chapters_per_window)?;
    if args.include_non_linear {
        config.visibility.include_non_linear = true;
    }

    let chapters = load_manifest(&args.manifest)?;
    let plan = build_plan(
        chapters,
        config.visibility,
        config.window.chapters_per_window,
    )?;

    println!("Manifest: {}", args.manifest.display());
    println!(
        "Chapters: {} raw, {} visible",
        plan.raw_chapters, plan.visible_chapters
    );
    println!(
        "Windows:  {} ({} chapters each)",
        plan.windows.len(),
        plan.chapters_per_window
    );
    if plan.raw_window_count != plan.windows.len() {
        println!(
            "          counting raw chapters would give {} windows",
            plan.raw_window_count
        );
    }
    println!();

    for window in &plan.windows {
        println!(
            "  {:>4}  visible {:>4}..={:<4}  raw {:>4}..={:<4}",
            window.range.window_index,
            window.range.first_chapter,
            window.range.last_chapter,
            window.raw_first,
            window.raw_last
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookwindow::chapter::ChapterRole;

    /// 109 raw chapters, 7 of them hidden, leaving 102 visible.
    fn hidden_heavy_book() -> Vec<Chapter> {
        let mut chapters = Vec::new();
        chapters.push(Chapter::new(0, ChapterRole::Navigation, true));
        for raw in 1..109 {
            if raw % 18 == 0 {
                chapters.push(Chapter::new(raw, ChapterRole::NonLinear, false));
            } else {
                chapters.push(Chapter::content(raw));
            }
        }
        chapters
    }

    #[test]
    fn test_plan_counts_visible_windows() {
        let plan = build_plan(hidden_heavy_book(), VisibilitySettings::default(), 5).unwrap();
        assert_eq!(plan.raw_chapters, 109);
        assert_eq!(plan.visible_chapters, 102);
        assert_eq!(plan.windows.len(), 21);
        assert_eq!(plan.raw_window_count, 22);
    }

    #[test]
    fn test_plan_maps_raw_spans() {
        let plan = build_plan(hidden_heavy_book(), VisibilitySettings::default(), 5).unwrap();
        let first = &plan.windows[0];
        assert_eq!((first.range.first_chapter, first.range.last_chapter), (0, 4));
        assert_eq!((first.raw_first, first.raw_last), (1, 5));

        let last = plan.windows.last().unwrap();
        assert_eq!((last.range.first_chapter, last.range.last_chapter), (100, 101));
        assert_eq!(last.raw_last, 107);
    }

    #[test]
    fn test_plan_rejects_zero_window_size() {
        assert!(build_plan(hidden_heavy_book(), VisibilitySettings::default(), 0).is_err());
    }

    #[test]
    fn test_plan_empty_document() {
        let plan = build_plan(Vec::new(), VisibilitySettings::default(), 5).unwrap();
        assert!(plan.windows.is_empty());
        assert_eq!(plan.raw_window_count, 0);
    }
}
