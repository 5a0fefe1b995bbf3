//! Depth-indexed context arena shared by readers and writers.
//!
//! Each open container owns one context frame. Frames live in a `Vec` indexed by
//! nesting depth; popping a container keeps its frame allocated (up to a pool size) and
//! the next push at that depth resets and reuses it.

/// A context frame that can be returned to its initial state for reuse.
pub(crate) trait Reset {
    fn reset(&mut self);
}

#[derive(Debug)]
pub(crate) struct ContextStack<C> {
    frames: Vec<C>,
    depth: usize,
    max_pooled: usize,
}

impl<C: Default + Reset> ContextStack<C> {
    /// Creates a stack holding only the top-level frame.
    pub(crate) fn new(max_pooled: usize) -> Self {
        ContextStack {
            frames: vec![C::default()],
            depth: 0,
            max_pooled,
        }
    }

    /// Number of open containers (0 at top level).
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn is_top_level(&self) -> bool {
        self.depth == 0
    }

    pub(crate) fn current(&self) -> &C {
        &self.frames[self.depth]
    }

    pub(crate) fn current_mut(&mut self) -> &mut C {
        &mut self.frames[self.depth]
    }

    /// Opens a child frame, reusing a pooled one when available.
    pub(crate) fn push(&mut self) -> &mut C {
        self.depth += 1;
        if self.depth < self.frames.len() {
            self.frames[self.depth].reset();
        } else {
            self.frames.push(C::default());
        }
        &mut self.frames[self.depth]
    }

    /// Closes the current frame. The top-level frame is never popped.
    pub(crate) fn pop(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.frames[self.depth].reset();
        self.depth -= 1;
        let keep = self.depth + 1 + self.max_pooled;
        if self.frames.len() > keep {
            self.frames.truncate(keep);
        }
    }

    /// Drops every frame; the stack is unusable until rebuilt.
    pub(crate) fn release_all(&mut self) {
        self.frames.clear();
        self.frames.push(C::default());
        self.frames.shrink_to_fit();
        self.depth = 0;
    }

    #[cfg(test)]
    pub(crate) fn pooled(&self) -> usize {
        self.frames.len() - self.depth - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct Frame {
        value: u32,
    }

    impl Reset for Frame {
        fn reset(&mut self) {
            self.value = 0;
        }
    }

    #[test]
    fn test_push_pop_reuses_frames() {
        let mut stack: ContextStack<Frame> = ContextStack::new(4);
        stack.current_mut().value = 1;
        stack.push().value = 2;
        stack.push().value = 3;
        assert_eq!(stack.depth(), 2);

        stack.pop();
        assert_eq!(stack.current().value, 2);
        assert_eq!(stack.pooled(), 1);

        assert_eq!(stack.push().value, 0);
        stack.pop();
        stack.pop();
        assert!(stack.is_top_level());
        assert_eq!(stack.current().value, 1);
        stack.pop();
        assert!(stack.is_top_level());
    }

    #[test]
    fn test_pool_is_bounded() {
        let mut stack: ContextStack<Frame> = ContextStack::new(1);
        for _ in 0..5 {
            stack.push();
        }
        for _ in 0..5 {
            stack.pop();
        }
        assert_eq!(stack.pooled(), 1);
        stack.release_all();
        assert_eq!(stack.pooled(), 0);
    }
}
