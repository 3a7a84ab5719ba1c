use crate::injector::{spawn_reconciler, HostInjector, InjectorCore};
use crate::variant::{Applicability, ButtonVariant};
use crate::NO_CONTAINER_CLASS;
use async_trait::async_trait;
use graft_core::{ConfigHandle, GraftResult};
use graft_dom::{Element, Page};
use graft_watch::PageSession;
use std::sync::Arc;

/// GitHub-layout orchestrator. Assumes there is only ever one button per
/// page; the variant table is consulted in this order and the first
/// applicable entry wins.
pub struct GitHubInjector {
    core: InjectorCore,
}

impl GitHubInjector {
    pub fn new(config: ConfigHandle) -> Self {
        Self {
            core: InjectorCore::new(config, variants()),
        }
    }
}

fn variants() -> Vec<ButtonVariant> {
    vec![
        ButtonVariant {
            adjust: Some(compact_button),
            ..ButtonVariant::new(
                "pull-request",
                ".gh-header-actions",
                "",
                Applicability::PathContains("/pull/"),
            )
        },
        ButtonVariant::new(
            "issue",
            ".gh-header-actions",
            "",
            Applicability::PathContains("/issues/"),
        ),
        ButtonVariant::new(
            "file",
            ".repository-content > div",
            "graft-file-btn",
            Applicability::PathContains("/blob/"),
        ),
        ButtonVariant::new(
            "navigation",
            ".file-navigation",
            "empty-icon position-relative",
            Applicability::SelectorExists(".file-navigation"),
        ),
        ButtonVariant {
            float_right: false,
            as_first_child: true,
            ..ButtonVariant::new(
                "empty-repository",
                ".repository-content",
                NO_CONTAINER_CLASS,
                Applicability::SelectorExists("git-clone-help-controller"),
            )
        },
    ]
}

/// The action bar on pull requests uses the compact button size.
fn compact_button(anchor: &mut Element) {
    anchor.set_attr("class", "btn btn-sm btn-primary");
}

#[async_trait]
impl HostInjector for GitHubInjector {
    fn name(&self) -> &'static str {
        "github"
    }

    fn can_handle_current_page(&self, page: &Page) -> bool {
        // TODO verify the hostname meta is present on self-hosted enterprise pages
        for id in page.document.elements_by_tag("meta") {
            let meta = page.document.element(id);
            if meta.attr("name") == Some("hostname")
                && meta.attr("content").is_some_and(|c| c.contains("github"))
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
        // partial page reloads arrive as change notifications; each one
        // re-runs the check-then-inject pass
        spawn_reconciler(self.core.clone(), session, false);
        Ok(())
    }

    async fn update(&self, session: &PageSession) -> GraftResult<()> {
        self.core.reconcile(session).await;
        Ok(())
    }
}
