use super::routing::Route;
use super::{EdgeId, NodeId};

/// Registered change callbacks for one node or edge.
///
/// Callbacks receive `Some` on every refresh and `None` once on removal.
pub struct Observers<T> {
    callbacks: Vec<Box<dyn FnMut(Option<&T>)>>,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }
}

impl<T> Observers<T> {
    pub fn subscribe(&mut self, callback: impl FnMut(Option<&T>) + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn notify(&mut self, value: Option<&T>) {
        for callback in &mut self.callbacks {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<T> std::fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// What a node subscriber sees on refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvent {
    pub node: NodeId,
    pub x: f32,
    pub y: f32,
    pub position: f32,
    pub location: f32,
}

/// What an edge subscriber sees on refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEvent {
    pub edge: EdgeId,
    pub route: Route,
    pub label: Option<(f32, f32)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn every_subscriber_sees_each_notification() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut observers: Observers<u32> = Observers::default();
        assert!(observers.is_empty());
        for tag in ["a", "b"] {
            let seen = Rc::clone(&seen);
            observers.subscribe(move |value| seen.borrow_mut().push((tag, value.copied())));
        }
        assert_eq!(observers.len(), 2);
        observers.notify(Some(&7));
        observers.notify(None);
        assert_eq!(
            *seen.borrow(),
            vec![("a", Some(7)), ("b", Some(7)), ("a", None), ("b", None)]
        );
    }
}
