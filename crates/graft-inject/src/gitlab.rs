use crate::injector::{spawn_reconciler, HostInjector, InjectorCore};
use crate::variant::{Applicability, ButtonVariant, Wrapper};
use async_trait::async_trait;
use graft_core::{ConfigHandle, GraftResult};
use graft_dom::Page;
use graft_watch::PageSession;
use std::sync::Arc;

/// GitLab-layout orchestrator. The tree controls it targets are rendered
/// late, so the first injection pass waits for the page-loaded signal.
pub struct GitLabInjector {
    core: InjectorCore,
}

impl GitLabInjector {
    pub fn new(config: ConfigHandle) -> Self {
        Self {
            core: InjectorCore::new(config, variants()),
        }
    }
}

const REPOSITORY_MARKERS: &[Applicability] = &[
    Applicability::SelectorExists(".tree-controls"),
    Applicability::SelectorExists(".project-clone-holder"),
];

fn variants() -> Vec<ButtonVariant> {
    vec![ButtonVariant {
        float_right: false,
        nest_in_first_child: true,
        wrapper: Wrapper::CloneHolder,
        ..ButtonVariant::new(
            "repository",
            ".tree-controls",
            "",
            Applicability::AllOf(REPOSITORY_MARKERS),
        )
    }]
}

#[async_trait]
impl HostInjector for GitLabInjector {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn can_handle_current_page(&self, page: &Page) -> bool {
        for id in page.document.elements_by_tag("meta") {
            let meta = page.document.element(id);
            if meta
                .attr("content")
                .is_some_and(|c| c.to_lowercase().contains("gitlab"))
            {
                return true;
            }
        }
        false
    }

    fn check_is_injected(&self, page: &Page) -> bool {
        self.core.check_is_injected(page)
    }

    async fn inject(&self, session: &Arc<PageSession>) -> GraftResult<()> {
        // the tree controls only exist once the page reports loaded; the
        // wait has no timeout, so an absent signal defers injection forever
        spawn_reconciler(self.core.clone(), session, true);
        Ok(())
    }

    async fn update(&self, session: &PageSession) -> GraftResult<()> {
        self.core.reconcile(session).await;
        Ok(())
    }
}
