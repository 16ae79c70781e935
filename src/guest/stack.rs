//==================================================
// File: guest/stack.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Argument stack of the guest runtime
// Objective: Track pushed arguments, call marks, mortal temporaries and
//            nested scope floors
//==================================================

use super::errors::{GuestError, GuestResult};
use super::heap::SvHandle;

/// Where a scope started, restored when it is left.
#[derive(Debug, Clone, Copy)]
struct ScopeFloor {
    stack_height: usize,
    temps_floor: usize,
    marks: usize,
}

/// Stack values do not own shares. Ownership of anything pushed as an
/// argument or result lives in `temps` until the enclosing scope is left.
#[derive(Debug, Default)]
pub struct GuestStack {
    values: Vec<SvHandle>,
    marks: Vec<usize>,
    temps: Vec<SvHandle>,
    scopes: Vec<ScopeFloor>,
}

impl GuestStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: SvHandle) {
        self.values.push(handle);
    }

    pub fn pop(&mut self) -> GuestResult<SvHandle> {
        let floor = self.marks.last().copied().unwrap_or(0);
        if self.values.len() <= floor {
            return Err(GuestError::StackUnderflow);
        }
        self.values.pop().ok_or(GuestError::StackUnderflow)
    }

    pub fn push_mark(&mut self) {
        self.marks.push(self.values.len());
    }

    /// Removes the innermost mark and returns everything pushed above it.
    pub fn take_marked(&mut self) -> GuestResult<Vec<SvHandle>> {
        let mark = self.marks.pop().ok_or(GuestError::StackUnderflow)?;
        if mark > self.values.len() {
            return Err(GuestError::StackUnderflow);
        }
        Ok(self.values.split_off(mark))
    }

    /// Hands one share over to the current scope.
    pub fn mortalize(&mut self, handle: SvHandle) {
        self.temps.push(handle);
    }

    pub fn height(&self) -> usize {
        self.values.len()
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn temps_len(&self) -> usize {
        self.temps.len()
    }

    pub fn values(&self) -> &[SvHandle] {
        &self.values
    }

    /// Opens a scope and returns its depth (1 for the outermost).
    pub fn enter_scope(&mut self) -> usize {
        self.scopes.push(ScopeFloor {
            stack_height: self.values.len(),
            temps_floor: self.temps.len(),
            marks: self.marks.len(),
        });
        self.scopes.len()
    }

    /// Leaves the scope at `depth` along with anything still open inside it.
    /// Returns the temporaries whose shares must now be dropped, newest first.
    pub fn leave_scope(&mut self, depth: usize) -> Vec<SvHandle> {
        let mut released = Vec::new();
        while self.scopes.len() >= depth.max(1) {
            let Some(floor) = self.scopes.pop() else {
                break;
            };
            let mut temps = self.temps.split_off(floor.temps_floor.min(self.temps.len()));
            temps.reverse();
            released.extend(temps);
            self.values.truncate(floor.stack_height);
            self.marks.truncate(floor.marks);
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::heap::{GuestHeap, SvBody};

    #[test]
    fn pop_stops_at_the_innermost_mark() {
        let mut heap = GuestHeap::new();
        let below = heap.allocate(SvBody::Int(1));
        let above = heap.allocate(SvBody::Int(2));
        let mut stack = GuestStack::new();
        stack.push(below);
        stack.push_mark();
        stack.push(above);

        assert_eq!(stack.pop(), Ok(above));
        assert_eq!(stack.pop(), Err(GuestError::StackUnderflow));
    }

    #[test]
    fn leaving_a_scope_restores_height_and_returns_its_temps() {
        let mut heap = GuestHeap::new();
        let outer = heap.allocate(SvBody::Int(1));
        let inner = heap.allocate(SvBody::Int(2));
        let mut stack = GuestStack::new();

        let outer_depth = stack.enter_scope();
        stack.mortalize(outer);
        stack.push(outer);
        let inner_depth = stack.enter_scope();
        stack.mortalize(inner);
        stack.push_mark();
        stack.push(inner);

        assert_eq!(stack.leave_scope(inner_depth), vec![inner]);
        assert_eq!(stack.height(), 1);
        assert_eq!(stack.scope_depth(), 1);
        assert_eq!(stack.leave_scope(outer_depth), vec![outer]);
        assert_eq!(stack.height(), 0);
    }

    #[test]
    fn leaving_an_outer_scope_unwinds_inner_ones() {
        let mut heap = GuestHeap::new();
        let a = heap.allocate(SvBody::Int(1));
        let b = heap.allocate(SvBody::Int(2));
        let mut stack = GuestStack::new();

        let outer = stack.enter_scope();
        stack.mortalize(a);
        stack.enter_scope();
        stack.mortalize(b);

        assert_eq!(stack.leave_scope(outer), vec![b, a]);
        assert_eq!(stack.scope_depth(), 0);
        assert_eq!(stack.temps_len(), 0);
    }
}

//==================================================
// End of file
//==================================================
