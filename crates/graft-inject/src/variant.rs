use crate::injector::check_is_btn_up_to_date;
use crate::{BTN_CONTAINER_ID, NAV_BTN_CLASS, NAV_BTN_ID};
use graft_dom::{Document, Element, NodeId, Page};
use tracing::trace;

/// Result of one reconciliation pass through a variant. Only `Inserted` and
/// `Updated` actually touched the document; everything else is a no-op that
/// will be retried on the next change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    Inserted,
    Updated,
    UpToDate,
    ContainerMissing,
    NoApplicableVariant,
}

impl InjectOutcome {
    pub fn mutated_dom(&self) -> bool {
        matches!(self, InjectOutcome::Inserted | InjectOutcome::Updated)
    }
}

/// Predicate deciding whether a variant applies to the current page.
#[derive(Debug, Clone)]
pub enum Applicability {
    /// The location path contains the given fragment.
    PathContains(&'static str),
    /// The document contains a match for the given selector.
    SelectorExists(&'static str),
    /// Every listed predicate holds.
    AllOf(&'static [Applicability]),
}

impl Applicability {
    pub fn evaluate(&self, page: &Page) -> bool {
        match self {
            Applicability::PathContains(fragment) => page.path().contains(fragment),
            Applicability::SelectorExists(selector) => page.document.select_exists(selector),
            Applicability::AllOf(preds) => preds.iter().all(|p| p.evaluate(page)),
        }
    }
}

/// How the rendered anchor is wrapped before insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    /// Single container div carrying the variant's css classes.
    Container,
    /// Nested clone-holder divs matching the GitLab tree-controls shape.
    CloneHolder,
}

/// One page-type's placement rule, as plain data. All variants share the
/// single reconciliation routine in [`ButtonVariant::inject`]; there is no
/// per-variant behavior beyond these fields and the optional adjust hook.
#[derive(Debug, Clone)]
pub struct ButtonVariant {
    pub name: &'static str,
    pub parent_selector: &'static str,
    pub btn_classes: &'static str,
    pub float_right: bool,
    pub as_first_child: bool,
    /// Insert into the parent's first child instead of the parent itself.
    pub nest_in_first_child: bool,
    pub wrapper: Wrapper,
    pub applicable: Applicability,
    /// Post-processes the rendered anchor before insertion.
    pub adjust: Option<fn(&mut Element)>,
}

impl ButtonVariant {
    pub fn new(
        name: &'static str,
        parent_selector: &'static str,
        btn_classes: &'static str,
        applicable: Applicability,
    ) -> Self {
        Self {
            name,
            parent_selector,
            btn_classes,
            float_right: true,
            as_first_child: false,
            nest_in_first_child: false,
            wrapper: Wrapper::Container,
            applicable,
            adjust: None,
        }
    }

    pub fn is_applicable(&self, page: &Page) -> bool {
        self.applicable.evaluate(page)
    }

    /// The one reconciliation routine. Resolves the variant's container,
    /// then converges the singleton button toward `url`: present and
    /// current is a no-op, present and stale mutates the href in place,
    /// absent renders and inserts per the layout rule.
    pub fn inject(&self, page: &mut Page, url: &str, label: &str) -> InjectOutcome {
        let doc = &mut page.document;
        let Some(parent) = doc.select(self.parent_selector) else {
            trace!(variant = %self.name, selector = %self.parent_selector, "container not found");
            return InjectOutcome::ContainerMissing;
        };
        let insert_parent = if self.nest_in_first_child {
            match doc.first_child(parent) {
                Some(child) => child,
                None => return InjectOutcome::ContainerMissing,
            }
        } else {
            parent
        };

        if let Some(existing) = doc.get_element_by_id(NAV_BTN_ID) {
            if check_is_btn_up_to_date(Some(doc.element(existing)), url) {
                return InjectOutcome::UpToDate;
            }
            doc.element_mut(existing).set_attr("href", url);
            return InjectOutcome::Updated;
        }

        let button = self.render(doc, url, label);
        if self.nest_in_first_child {
            doc.append_child(insert_parent, button);
            return InjectOutcome::Inserted;
        }
        if let Some(group) = right_float_button_group(doc, parent) {
            doc.insert_before(parent, button, group);
        } else if self.as_first_child {
            doc.insert_first(parent, button);
        } else {
            doc.append_child(parent, button);
        }
        InjectOutcome::Inserted
    }

    fn render(&self, doc: &mut Document, url: &str, label: &str) -> NodeId {
        let mut anchor = Element::new("a")
            .with_attr("id", NAV_BTN_ID)
            .with_attr("title", label)
            .with_attr("href", url)
            .with_attr("target", "_blank")
            .with_attr("class", "btn btn-primary")
            .with_text(label);
        if let Some(adjust) = self.adjust {
            adjust(&mut anchor);
        }
        let anchor = doc.create_element(anchor);

        match self.wrapper {
            Wrapper::Container => {
                let mut classes = String::from(self.btn_classes);
                if !classes.is_empty() {
                    classes.push(' ');
                }
                classes.push_str(NAV_BTN_CLASS);
                if self.float_right {
                    classes.push_str(" float-right");
                }
                let container = doc.create_element(
                    Element::new("div")
                        .with_attr("id", BTN_CONTAINER_ID)
                        .with_attr("class", classes),
                );
                doc.append_child(container, anchor);
                container
            }
            Wrapper::CloneHolder => {
                let outer = doc.create_element(
                    Element::new("div")
                        .with_attr("class", "project-clone-holder d-none d-md-inline-block"),
                );
                let inner = doc.create_element(
                    Element::new("div").with_attr("class", "git-clone-holder js-git-clone-holder"),
                );
                doc.append_child(inner, anchor);
                doc.append_child(outer, inner);
                outer
            }
        }
    }
}

/// A direct child of `parent` recognized as a right-floated button group;
/// new buttons go immediately before it.
fn right_float_button_group(doc: &Document, parent: NodeId) -> Option<NodeId> {
    doc.children(parent).iter().copied().find(|&child| {
        let el = doc.element(child);
        el.has_class("BtnGroup") && el.has_class("float-right")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_dom::NodeRepr;

    fn page(json: serde_json::Value, href: &str) -> Page {
        let repr: NodeRepr = serde_json::from_value(json).expect("fixture parses");
        Page::parse(href, repr.into()).expect("page parses")
    }

    fn action_bar_page() -> Page {
        page(
            serde_json::json!({
                "tag": "html",
                "children": [
                    {"tag": "body", "children": [
                        {"tag": "div", "attrs": {"class": "gh-header-actions"}, "children": [
                            {"tag": "span", "attrs": {"class": "state"}},
                            {"tag": "div", "attrs": {"class": "BtnGroup float-right"}}
                        ]}
                    ]}
                ]
            }),
            "https://codehost.example/org/repo/pull/1",
        )
    }

    fn variant() -> ButtonVariant {
        ButtonVariant::new(
            "action-bar",
            ".gh-header-actions",
            "",
            Applicability::PathContains("/pull/"),
        )
    }

    fn button_count(page: &Page) -> usize {
        let doc = &page.document;
        doc.descendants()
            .filter(|&n| doc.element(n).id() == Some(NAV_BTN_ID))
            .count()
    }

    #[test]
    fn missing_container_is_a_noop() {
        let mut page = page(
            serde_json::json!({"tag": "html", "children": [{"tag": "body"}]}),
            "https://codehost.example/org/repo/pull/1",
        );
        let outcome = variant().inject(&mut page, "https://ws#x", "Gitpod");
        assert_eq!(outcome, InjectOutcome::ContainerMissing);
        assert_eq!(button_count(&page), 0);
    }

    #[test]
    fn inserts_before_right_floated_button_group() {
        let mut page = action_bar_page();
        let outcome = variant().inject(&mut page, "https://ws#x", "Gitpod");
        assert_eq!(outcome, InjectOutcome::Inserted);

        let doc = &page.document;
        let bar = doc.select(".gh-header-actions").expect("action bar");
        let children = doc.children(bar);
        assert_eq!(children.len(), 3);
        assert_eq!(doc.element(children[1]).id(), Some(BTN_CONTAINER_ID));
        assert!(doc.element(children[2]).has_class("BtnGroup"));
    }

    #[test]
    fn first_child_flag_prepends_without_button_group() {
        let mut page = page(
            serde_json::json!({
                "tag": "html",
                "children": [{"tag": "body", "children": [
                    {"tag": "div", "attrs": {"class": "repository-content"}, "children": [
                        {"tag": "p"}
                    ]}
                ]}]
            }),
            "https://codehost.example/org/repo",
        );
        let v = ButtonVariant {
            float_right: false,
            as_first_child: true,
            ..ButtonVariant::new(
                "empty",
                ".repository-content",
                "no-container",
                Applicability::SelectorExists(".repository-content"),
            )
        };
        assert_eq!(
            v.inject(&mut page, "https://ws#x", "Gitpod"),
            InjectOutcome::Inserted
        );
        let doc = &page.document;
        let parent = doc.select(".repository-content").expect("container");
        let first = doc.first_child(parent).expect("first child");
        assert_eq!(doc.element(first).id(), Some(BTN_CONTAINER_ID));
        assert!(!doc.element(first).has_class("float-right"));
    }

    #[test]
    fn double_pass_yields_exactly_one_button() {
        let mut page = action_bar_page();
        let v = variant();
        assert_eq!(
            v.inject(&mut page, "https://ws#x", "Gitpod"),
            InjectOutcome::Inserted
        );
        assert_eq!(
            v.inject(&mut page, "https://ws#x", "Gitpod"),
            InjectOutcome::UpToDate
        );
        assert_eq!(button_count(&page), 1);
    }

    #[test]
    fn stale_button_is_updated_in_place() {
        let mut page = action_bar_page();
        let v = variant();
        v.inject(&mut page, "https://ws#old", "Gitpod");
        let before: Vec<_> = {
            let doc = &page.document;
            let bar = doc.select(".gh-header-actions").expect("action bar");
            doc.children(bar).to_vec()
        };

        assert_eq!(
            v.inject(&mut page, "https://ws#new", "Gitpod"),
            InjectOutcome::Updated
        );
        let doc = &page.document;
        let bar = doc.select(".gh-header-actions").expect("action bar");
        assert_eq!(doc.children(bar), before.as_slice());
        let btn = doc.get_element_by_id(NAV_BTN_ID).expect("button present");
        assert_eq!(doc.element(btn).attr("href"), Some("https://ws#new"));
        assert_eq!(button_count(&page), 1);
    }

    #[test]
    fn adjust_hook_rewrites_the_anchor() {
        fn compact(a: &mut Element) {
            a.set_attr("class", "btn btn-sm btn-primary");
        }
        let mut page = action_bar_page();
        let v = ButtonVariant {
            adjust: Some(compact),
            ..variant()
        };
        v.inject(&mut page, "https://ws#x", "Gitpod");
        let doc = &page.document;
        let btn = doc.get_element_by_id(NAV_BTN_ID).expect("button present");
        assert!(doc.element(btn).has_class("btn-sm"));
    }

    #[test]
    fn clone_holder_wrapper_nests_into_first_child() {
        let mut page = page(
            serde_json::json!({
                "tag": "html",
                "children": [{"tag": "body", "children": [
                    {"tag": "div", "attrs": {"class": "tree-controls"}, "children": [
                        {"tag": "div", "attrs": {"class": "tree-controls-inner"}}
                    ]},
                    {"tag": "div", "attrs": {"class": "project-clone-holder"}}
                ]}]
            }),
            "https://codehost.example/org/repo",
        );
        let v = ButtonVariant {
            float_right: false,
            nest_in_first_child: true,
            wrapper: Wrapper::CloneHolder,
            ..ButtonVariant::new(
                "repository",
                ".tree-controls",
                "",
                Applicability::SelectorExists(".tree-controls"),
            )
        };
        assert_eq!(
            v.inject(&mut page, "https://ws#x", "Gitpod"),
            InjectOutcome::Inserted
        );

        let doc = &page.document;
        let btn = doc.get_element_by_id(NAV_BTN_ID).expect("button present");
        let inner = doc.parent(btn).expect("inner holder");
        assert!(doc.element(inner).has_class("git-clone-holder"));
        let outer = doc.parent(inner).expect("outer holder");
        assert!(doc.element(outer).has_class("project-clone-holder"));
        let first = doc.parent(outer).expect("insertion target");
        assert!(doc.element(first).has_class("tree-controls-inner"));
    }

    #[test]
    fn anchor_opens_in_new_context() {
        let mut page = action_bar_page();
        variant().inject(&mut page, "https://ws#x", "Gitpod");
        let doc = &page.document;
        let btn = doc.get_element_by_id(NAV_BTN_ID).expect("button present");
        let el = doc.element(btn);
        assert_eq!(el.attr("target"), Some("_blank"));
        assert_eq!(el.attr("title"), Some("Gitpod"));
        assert_eq!(el.text.as_deref(), Some("Gitpod"));
    }
}
