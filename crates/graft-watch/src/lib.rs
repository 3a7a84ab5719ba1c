//! Page-change watcher primitive: a shared live page plus the notification
//! channels that drive reconciliation passes.

use graft_dom::Page;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageChange {
    /// Part of the page was mutated in place.
    Mutated,
    /// Single-page-app navigation replaced the document.
    Navigated,
}

/// The live page and its change feed. Dropping the session closes the feed,
/// which is what stops any reconciler still listening on it.
pub struct PageSession {
    page: RwLock<Page>,
    changes: broadcast::Sender<PageChange>,
    loaded: watch::Sender<bool>,
}

impl PageSession {
    pub fn new(page: Page) -> Arc<Self> {
        let (changes, _) = broadcast::channel(32);
        let (loaded, _) = watch::channel(false);
        Arc::new(Self {
            page: RwLock::new(page),
            changes,
            loaded,
        })
    }

    pub async fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read().await
    }

    /// Raw write access. Callers that mutate through this are responsible
    /// for broadcasting a change themselves, and only if they changed
    /// anything.
    pub async fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write().await
    }

    /// Applies an external mutation and notifies watchers.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut Page) -> R) -> R {
        let out = {
            let mut page = self.page.write().await;
            f(&mut page)
        };
        self.notify(PageChange::Mutated);
        out
    }

    /// Replaces the whole page, as a single-page-app navigation does. Any
    /// node handles into the old document are dead after this.
    pub async fn navigate(&self, page: Page) {
        {
            let mut current = self.page.write().await;
            *current = page;
        }
        debug!("page navigated");
        self.notify(PageChange::Navigated);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageChange> {
        self.changes.subscribe()
    }

    pub fn notify(&self, change: PageChange) {
        let _ = self.changes.send(change);
    }

    /// Latches the one-shot "page fully loaded" signal.
    pub fn mark_loaded(&self) {
        self.loaded.send_replace(true);
    }

    pub fn loaded_signal(&self) -> watch::Receiver<bool> {
        self.loaded.subscribe()
    }

    /// Waits for the loaded signal. Unbounded: if the signal never fires,
    /// this pends until the session is dropped.
    pub async fn wait_loaded(&self) {
        let mut signal = self.loaded.subscribe();
        let _ = signal.wait_for(|ready| *ready).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_dom::Document;

    fn page() -> Page {
        Page::parse("https://codehost.example/org/repo", Document::new("html"))
            .expect("page parses")
    }

    #[tokio::test]
    async fn mutate_notifies_subscribers() {
        let session = PageSession::new(page());
        let mut rx = session.subscribe();
        session
            .mutate(|p| {
                let root = p.document.root();
                let el = p.document.create_element(graft_dom::Element::new("div"));
                p.document.append_child(root, el);
            })
            .await;
        assert_eq!(rx.recv().await.expect("change delivered"), PageChange::Mutated);
    }

    #[tokio::test]
    async fn navigate_replaces_page_and_notifies() {
        let session = PageSession::new(page());
        let mut rx = session.subscribe();
        let next = Page::parse("https://codehost.example/other", Document::new("html"))
            .expect("page parses");
        session.navigate(next).await;
        assert_eq!(
            rx.recv().await.expect("change delivered"),
            PageChange::Navigated
        );
        assert_eq!(session.page().await.path(), "/other");
    }

    #[tokio::test]
    async fn wait_loaded_gates_on_the_latch() {
        let session = PageSession::new(page());
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move {
                session.wait_loaded().await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        session.mark_loaded();
        waiter.await.expect("waiter completes");
        // latched: a late waiter returns immediately
        session.wait_loaded().await;
    }
}
