/// Renders the absolute destination for the injected button: the workspace
/// base URL with the current page href appended as its context fragment.
/// Callers compare the result byte-for-byte, so rendering is deterministic.
pub fn render_target_url(base_url: &str, page_href: &str) -> String {
    format!("{}#{}", base_url.trim_end_matches('/'), page_href)
}
