pub type Listener<E> = Box<dyn FnMut(&E)>;

/// Synchronous observers of a component's events.
///
/// Listeners run in registration order, in-line with the tick that raised the event.
pub struct EventListeners<E> {
    listeners: Vec<Listener<E>>,
}

impl<E> Default for EventListeners<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<E> EventListeners<E> {
    pub fn register(&mut self, listener: impl FnMut(&E) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn emit(&mut self, event: E) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}
