//! `simulate` command: page through a document and trace the buffer.
//!
//! Window assembly is simulated: each window becomes a short text block,
//! optionally after a delay so preloads are visibly in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bookwindow::buffer::{AssemblyError, BoxFuture, WindowAssembler, WindowContent};
use bookwindow::window::WindowRange;
use bookwindow::ReadingSession;
use bytes::Bytes;
use clap::Args;
use tokio::runtime::Runtime;
use tracing::info;

use super::common::{apply_window_size, load_config, load_manifest};
use crate::error::CliError;

/// Arguments for `bookwindow simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Chapter manifest (JSON)
    #[arg(long)]
    pub manifest: PathBuf,

    /// Raw chapter to start reading at
    #[arg(long, default_value_t = 0)]
    pub start_chapter: usize,

    /// Pages rendered per window
    #[arg(long, default_value_t = 10)]
    pub pages_per_window: usize,

    /// Chapters per window (overrides config)
    #[arg(long)]
    pub chapters_per_window: Option<usize>,

    /// Simulated assembly time per window, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub assembly_delay_ms: u64,
}

/// Produces a text summary of each window's chapters.
struct SimulatedAssembler {
    delay: Duration,
}

impl WindowAssembler for SimulatedAssembler {
    fn assemble_window(
        &self,
        range: WindowRange,
    ) -> BoxFuture<'_, Result<WindowContent, AssemblyError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let text = format!(
                "window {} (chapters {}..={})",
                range.window_index, range.first_chapter, range.last_chapter
            );
            Ok(WindowContent::new(range.window_index, Bytes::from(text)))
        })
    }
}

/// Visible chapter shown on `page` of a window spanning `range`.
fn chapter_for_page(range: &WindowRange, page: usize, pages: usize) -> usize {
    range.first_chapter + page * range.chapter_count() / pages
}

/// Run the simulate command.
pub fn run(args: SimulateArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    if args.pages_per_window == 0 {
        return Err(CliError::InvalidArgument(
            "--pages-per-window must be at least 1".to_string(),
        ));
    }

    let mut config = load_config(config_path)?;
    apply_window_size(&mut config, args.chapters_per_window)?;
    let chapters = load_manifest(&args.manifest)?;

    let runtime = Runtime::new().map_err(|e| CliError::RuntimeCreation(e.to_string()))?;
    let assembler = Arc::new(SimulatedAssembler {
        delay: Duration::from_millis(args.assembly_delay_ms),
    });
    let session = ReadingSession::open(&chapters, &config, assembler, runtime.handle().clone())?;

    let start_window = session.jump_to_chapter(args.start_chapter).unwrap_or(0);
    println!(
        "{} windows over {} visible chapters, starting at window {}",
        session.window_count(),
        session.index().visible_chapter_count(),
        start_window
    );
    println!();

    let pages = args.pages_per_window;
    for window in start_window..session.window_count() {
        let Some(range) = session.window_range(window)? else {
            break;
        };
        for page in 0..pages {
            let chapter = chapter_for_page(&range, page, pages);
            session.on_page_changed(chapter, page, pages);
        }

        let manager = session.manager();
        let snapshot = manager.snapshot();
        let stats = manager.stats();
        println!(
            "window {:>4} [{}] buffer {:?} cached {} in flight {}",
            window,
            snapshot.phase,
            snapshot.windows,
            stats.cached_windows,
            stats.in_flight
        );
    }

    runtime.block_on(session.manager().wait_for_preloads());
    let stats = session.manager().stats();
    info!(%stats, "Simulation finished");
    println!();
    println!("{}", stats);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_for_page_spreads_chapters() {
        let range = WindowRange {
            window_index: 1,
            first_chapter: 5,
            last_chapter: 9,
        };
        let chapters: Vec<_> = (0..10).map(|p| chapter_for_page(&range, p, 10)).collect();
        assert_eq!(chapters, vec![5, 5, 6, 6, 7, 7, 8, 8, 9, 9]);
    }

    #[test]
    fn test_chapter_for_page_short_window() {
        let range = WindowRange {
            window_index: 4,
            first_chapter: 20,
            last_chapter: 21,
        };
        assert_eq!(chapter_for_page(&range, 0, 3), 20);
        assert_eq!(chapter_for_page(&range, 2, 3), 21);
    }

    #[test]
    fn test_rejects_zero_pages() {
        let args = SimulateArgs {
            manifest: PathBuf::from("unused.json"),
            start_chapter: 0,
            pages_per_window: 0,
            chapters_per_window: None,
            assembly_delay_ms: 0,
        };
        assert!(matches!(
            run(args, None),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_simulated_assembler_describes_window() {
        let runtime = Runtime::new().unwrap();
        let assembler = SimulatedAssembler {
            delay: Duration::ZERO,
        };
        let range = WindowRange {
            window_index: 2,
            first_chapter: 10,
            last_chapter: 14,
        };
        let content = runtime.block_on(assembler.assemble_window(range)).unwrap();
        assert_eq!(content.data().as_ref(), b"window 2 (chapters 10..=14)");
    }
}
