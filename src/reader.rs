//! Reader navigation state for one reading session.
//!
//! Tracks `(chapter order, page number)` over a grimoire, recomputing the
//! page set whenever the chapter changes. Transitions are clamped at
//! boundaries and never fail; `next_page()` at the last page of a chapter
//! stays put rather than advancing the chapter, so crossing chapters is
//! always an explicit `go_to_chapter` call.
//!
//! The session performs no I/O. Every effective transition returns a
//! [`ProgressUpdate`] snapshot for the autosave layer to persist.

use uuid::Uuid;

use crate::library::Grimoire;
use crate::paginator::{Budget, paginate};
use crate::progress::{ProgressUpdate, ReadingProgress};

pub struct ReaderSession {
    session_id: Uuid,
    grimoire: Grimoire,
    budget: Budget,
    chapter_order: u32,
    /// 1-based page within the current chapter.
    page_number: u32,
    pages: Vec<String>,
    reading_time_minutes: u32,
}

impl ReaderSession {
    /// Opens a session at chapter 1, page 1.
    pub fn new(grimoire: Grimoire, budget: Budget) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !grimoire.chapters.is_empty(),
            "grimoire has no chapters: {}",
            grimoire.id
        );
        let pages = paginate(&grimoire.chapters[0].content, budget);
        let session = Self {
            session_id: Uuid::new_v4(),
            grimoire,
            budget,
            chapter_order: 1,
            page_number: 1,
            pages,
            reading_time_minutes: 0,
        };
        tracing::debug!(
            session_id = %session.session_id,
            grimoire_id = %session.grimoire.id,
            pages = session.pages.len(),
            "reader session opened"
        );
        Ok(session)
    }

    /// Opens a session resuming from a saved position. The saved page is
    /// clamped into the freshly computed page set, which may differ from
    /// the one the position was saved against.
    pub fn resume(
        grimoire: Grimoire,
        budget: Budget,
        saved: &ReadingProgress,
    ) -> anyhow::Result<Self> {
        let mut session = Self::new(grimoire, budget)?;
        session.page_number = saved.current_page.clamp(1, session.pages.len() as u32);
        session.reading_time_minutes = saved.reading_time_minutes;
        Ok(session)
    }

    /// Advances one page; no-op at the last page of the chapter.
    pub fn next_page(&mut self) -> Option<ProgressUpdate> {
        if (self.page_number as usize) < self.pages.len() {
            self.page_number += 1;
            return Some(self.snapshot());
        }
        None
    }

    /// Goes back one page; no-op at page 1.
    pub fn prev_page(&mut self) -> Option<ProgressUpdate> {
        if self.page_number > 1 {
            self.page_number -= 1;
            return Some(self.snapshot());
        }
        None
    }

    /// Switches to the chapter with the given order, recomputing the page
    /// set and resetting to page 1. Unknown orders are a no-op.
    pub fn go_to_chapter(&mut self, order: u32) -> Option<ProgressUpdate> {
        let chapter = self.grimoire.chapter(order)?;
        let pages = paginate(&chapter.content, self.budget);
        self.pages = pages;
        self.chapter_order = order;
        self.page_number = 1;
        Some(self.snapshot())
    }

    pub fn add_reading_minutes(&mut self, minutes: u32) {
        self.reading_time_minutes = self.reading_time_minutes.saturating_add(minutes);
    }

    pub fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            grimoire_id: self.grimoire.id.clone(),
            current_page: self.page_number,
            total_pages: self.pages.len() as u32,
            reading_time_minutes: self.reading_time_minutes,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn chapter_order(&self) -> u32 {
        self.chapter_order
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn total_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn at_last_page(&self) -> bool {
        self.page_number as usize >= self.pages.len()
    }

    pub fn current_page_html(&self) -> &str {
        &self.pages[self.page_number as usize - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Chapter;
    use chrono::Utc;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn chapter(order: u32, title: &str, paragraphs: usize) -> Chapter {
        let content: String = (0..paragraphs)
            .map(|_| format!("<p>{}</p>", words(100)))
            .collect();
        Chapter {
            id: format!("ch_{order}"),
            grimoire_id: "gr_test".to_owned(),
            title: title.to_owned(),
            order,
            reading_time_minutes: 1,
            content: format!("<h2>{title}</h2>{content}"),
        }
    }

    fn grimoire() -> Grimoire {
        Grimoire {
            id: "gr_test".to_owned(),
            title: "Test Grimoire".to_owned(),
            chapters: vec![chapter(1, "One", 4), chapter(2, "Two", 2)],
        }
    }

    fn session() -> ReaderSession {
        // 100-word paragraphs against a 150-word budget: one paragraph per
        // page, header pinned to page 1.
        ReaderSession::new(grimoire(), Budget::Words(150)).expect("open session")
    }

    #[test]
    fn opens_at_chapter_one_page_one() {
        let session = session();
        assert_eq!(session.chapter_order(), 1);
        assert_eq!(session.page_number(), 1);
        assert_eq!(session.total_pages(), 4);
        assert!(session.current_page_html().starts_with("<h2>One</h2>"));
    }

    #[test]
    fn prev_page_at_first_page_is_a_no_op() {
        let mut session = session();
        assert!(session.prev_page().is_none());
        assert_eq!(session.page_number(), 1);
    }

    #[test]
    fn next_page_at_last_page_is_a_no_op() {
        let mut session = session();
        while session.next_page().is_some() {}
        assert_eq!(session.page_number(), session.total_pages());
        assert!(session.at_last_page());

        assert!(session.next_page().is_none());
        assert_eq!(session.page_number(), session.total_pages());
        assert_eq!(session.chapter_order(), 1, "must not auto-advance chapter");
    }

    #[test]
    fn transitions_emit_snapshots_of_the_new_state() {
        let mut session = session();
        let update = session.next_page().expect("page turn");
        assert_eq!(update.current_page, 2);
        assert_eq!(update.total_pages, 4);
        assert_eq!(update.grimoire_id, "gr_test");
    }

    #[test]
    fn chapter_switch_resets_page_and_recomputes_pages() {
        let mut session = session();
        session.next_page();
        session.next_page();

        let update = session.go_to_chapter(2).expect("known chapter");
        assert_eq!(session.chapter_order(), 2);
        assert_eq!(session.page_number(), 1);
        assert_eq!(session.total_pages(), 2);
        assert_eq!(update.current_page, 1);
        assert!(session.current_page_html().starts_with("<h2>Two</h2>"));
    }

    #[test]
    fn unknown_chapter_is_a_no_op() {
        let mut session = session();
        session.next_page();

        assert!(session.go_to_chapter(99).is_none());
        assert_eq!(session.chapter_order(), 1);
        assert_eq!(session.page_number(), 2);
    }

    #[test]
    fn resume_clamps_saved_page_into_range() -> anyhow::Result<()> {
        let saved = ReadingProgress {
            user_id: "u1".to_owned(),
            grimoire_id: "gr_test".to_owned(),
            current_page: 99,
            total_pages: 99,
            reading_time_minutes: 17,
            completed: false,
            last_read_at: Utc::now(),
        };
        let session = ReaderSession::resume(grimoire(), Budget::Words(150), &saved)?;

        assert_eq!(session.page_number(), session.total_pages());
        assert_eq!(session.snapshot().reading_time_minutes, 17);
        Ok(())
    }

    #[test]
    fn empty_chapter_still_has_one_page() -> anyhow::Result<()> {
        let mut gr = grimoire();
        gr.chapters[0].content = String::new();
        let session = ReaderSession::new(gr, Budget::Words(150))?;

        assert_eq!(session.total_pages(), 1);
        assert_eq!(session.current_page_html(), "");
        Ok(())
    }

    #[test]
    fn grimoire_without_chapters_is_rejected() {
        let gr = Grimoire {
            id: "gr_empty".to_owned(),
            title: "Empty".to_owned(),
            chapters: Vec::new(),
        };
        assert!(ReaderSession::new(gr, Budget::Words(150)).is_err());
    }
}
