//! The injector core: per-host orchestrators, the button placement strategy
//! table, and the idempotent reconciliation that keeps a single launch button
//! converged against an externally-mutating page.

pub mod github;
pub mod gitlab;
pub mod injector;
pub mod variant;

pub use github::GitHubInjector;
pub use gitlab::GitLabInjector;
pub use injector::{
    check_is_btn_up_to_date, HostInjector, InjectionState, InjectorCore,
};
pub use variant::{Applicability, ButtonVariant, InjectOutcome, Wrapper};

use graft_core::ConfigHandle;
use graft_dom::Page;
use std::sync::Arc;

/// Identifier of the singleton injected button. At most one element carries
/// it per page; every lookup goes through the live document.
pub const NAV_BTN_ID: &str = "graft-btn-nav";
pub const NAV_BTN_CLASS: &str = "graft-nav-btn";
pub const BTN_CONTAINER_ID: &str = "graft-btn-container";
pub const NO_CONTAINER_CLASS: &str = "no-container";

/// The known host orchestrators, in dispatch order.
pub fn default_injectors(config: &ConfigHandle) -> Vec<Arc<dyn HostInjector>> {
    vec![
        Arc::new(GitHubInjector::new(config.clone())),
        Arc::new(GitLabInjector::new(config.clone())),
    ]
}

/// Picks the first injector claiming the page. When several claim it the
/// choice is by registration order only; nothing else disambiguates.
pub fn select_injector(
    injectors: &[Arc<dyn HostInjector>],
    page: &Page,
) -> Option<Arc<dyn HostInjector>> {
    injectors
        .iter()
        .find(|i| i.can_handle_current_page(page))
        .cloned()
}
