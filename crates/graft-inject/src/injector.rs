use crate::variant::{ButtonVariant, InjectOutcome};
use crate::NAV_BTN_ID;
use async_trait::async_trait;
use graft_core::{render_target_url, ConfigHandle, GraftResult};
use graft_dom::{Element, Page};
use graft_watch::{PageChange, PageSession};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace};

/// The single definition of "the button is up to date": it exists and its
/// href equals the desired target byte-for-byte. Both the orchestrator-level
/// injection check and the variant-level update decision go through here.
pub fn check_is_btn_up_to_date(button: Option<&Element>, target_url: &str) -> bool {
    button.is_some_and(|btn| btn.attr("href") == Some(target_url))
}

/// Injection state as derived from the live document. Never stored anywhere;
/// re-derived on every pass so state and reality cannot diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionState {
    Absent,
    Current,
    Stale,
}

/// Uniform lifecycle every host orchestrator satisfies. An outer dispatcher
/// picks one injector per page and drives it through this contract.
#[async_trait]
pub trait HostInjector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Side-effect-free: does this orchestrator apply to the page at all?
    fn can_handle_current_page(&self, page: &Page) -> bool;

    /// True iff the singleton button exists and matches the currently
    /// desired target URL.
    fn check_is_injected(&self, page: &Page) -> bool;

    /// Subscribes to page-change notifications and runs an initial
    /// injection pass. Idempotent; safe to call once per page load.
    async fn inject(&self, session: &Arc<PageSession>) -> GraftResult<()>;

    /// Forces one immediate reconciliation pass, for when the desired
    /// target URL changed without any page mutation.
    async fn update(&self, session: &PageSession) -> GraftResult<()>;
}

/// Shared orchestrator internals: the config handle and the ordered variant
/// table, plus the reconciliation pass both lifecycle entry points run.
#[derive(Clone)]
pub struct InjectorCore {
    config: ConfigHandle,
    variants: Vec<ButtonVariant>,
}

impl InjectorCore {
    pub fn new(config: ConfigHandle, variants: Vec<ButtonVariant>) -> Self {
        Self { config, variants }
    }

    /// The target the button must point at for this page, right now.
    pub fn desired_url(&self, page: &Page) -> String {
        render_target_url(&self.config.base_url(), page.href())
    }

    pub fn injection_state(&self, page: &Page) -> InjectionState {
        let desired = self.desired_url(page);
        match page.document.get_element_by_id(NAV_BTN_ID) {
            None => InjectionState::Absent,
            Some(id) if check_is_btn_up_to_date(Some(page.document.element(id)), &desired) => {
                InjectionState::Current
            }
            Some(_) => InjectionState::Stale,
        }
    }

    pub fn check_is_injected(&self, page: &Page) -> bool {
        self.injection_state(page) == InjectionState::Current
    }

    /// Walks the variant table in priority order and dispatches to the
    /// first applicable one. Dispatch is exclusive: later variants are not
    /// consulted once one applies, which is what keeps the page at a
    /// single button even when several variants would match.
    pub fn inject_buttons(&self, page: &mut Page) -> InjectOutcome {
        let url = self.desired_url(page);
        let label = self.config.label();
        match self.variants.iter().find(|v| v.is_applicable(page)) {
            Some(variant) => {
                let outcome = variant.inject(page, &url, &label);
                debug!(variant = %variant.name, outcome = ?outcome, "injection pass");
                outcome
            }
            None => {
                trace!("no applicable button variant");
                InjectOutcome::NoApplicableVariant
            }
        }
    }

    /// One full reconciliation pass under a single write lock. Watchers are
    /// notified only when the pass actually mutated the document, so the
    /// pass this notification re-triggers finds a converged page and stays
    /// silent.
    pub async fn reconcile(&self, session: &PageSession) -> InjectOutcome {
        let outcome = {
            let mut page = session.page_mut().await;
            if self.check_is_injected(&page) {
                InjectOutcome::UpToDate
            } else {
                self.inject_buttons(&mut page)
            }
        };
        if outcome.mutated_dom() {
            session.notify(PageChange::Mutated);
        }
        outcome
    }
}

/// Runs the reconciler until the session goes away: an initial pass, then
/// one pass per change notification. The task holds only a weak session
/// reference; dropping the session closes the change feed and ends the
/// loop. With `wait_for_load` the initial pass is deferred until the
/// page-loaded latch fires, with no timeout.
pub(crate) fn spawn_reconciler(core: InjectorCore, session: &Arc<PageSession>, wait_for_load: bool) {
    let mut changes = session.subscribe();
    let mut loaded = session.loaded_signal();
    let weak = Arc::downgrade(session);
    tokio::spawn(async move {
        if wait_for_load && loaded.wait_for(|ready| *ready).await.is_err() {
            return;
        }
        loop {
            let Some(session) = weak.upgrade() else { break };
            core.reconcile(&session).await;
            drop(session);
            match changes.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });
}
