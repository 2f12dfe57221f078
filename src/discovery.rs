use rustc_hash::FxHashSet;

use crate::traits::{ElementKey, MediaElement, PageNode};
use crate::utils::log_console;

/// Insertion-ordered set of discovered elements.
struct Discovered<E> {
    seen: FxHashSet<ElementKey>,
    ordered: Vec<E>,
}

impl<E: MediaElement> Discovered<E> {
    fn new() -> Self {
        Self {
            seen: FxHashSet::default(),
            ordered: Vec::new(),
        }
    }

    fn insert(&mut self, element: E) {
        if self.seen.insert(element.key()) {
            self.ordered.push(element);
        }
    }
}

/// Every media element under `root`: the root itself if it qualifies, its
/// light subtree, then every shadow root reachable from there, recursively.
///
/// A node whose queries fail is skipped; its siblings are still visited.
pub fn find_media_elements<N: PageNode>(root: &N) -> Vec<N::Element> {
    let mut found = Discovered::new();
    collect(root, &mut found);
    found.ordered
}

fn collect<N: PageNode>(node: &N, found: &mut Discovered<N::Element>) {
    if let Some(element) = node.as_media() {
        found.insert(element);
    }

    match node.media_descendants() {
        Ok(elements) => elements.into_iter().for_each(|e| found.insert(e)),
        Err(err) => log_console(&format!("Skipping subtree during discovery: {}", err)),
    }

    match node.shadow_roots() {
        Ok(roots) => {
            for root in &roots {
                collect(root, found);
            }
        }
        Err(err) => log_console(&format!("Skipping shadow roots during discovery: {}", err)),
    }
}
