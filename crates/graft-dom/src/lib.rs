//! In-memory model of a host page: an element tree with the handful of DOM
//! operations the button reconciliation needs, a small selector engine, and
//! the page (location + document) type the injectors inspect.

pub mod document;
pub mod element;
pub mod page;
pub mod selector;

pub use document::{Document, NodeId, NodeRepr};
pub use element::Element;
pub use page::Page;
pub use selector::Selector;
