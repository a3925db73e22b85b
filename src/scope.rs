//! Per-thread bookkeeping for a running decode.
//!
//! serde hands `Deserialize` impls nothing but a deserializer, so two facts
//! the path-aware deserializer knows have to travel out of band:
//! - the path of the struct currently being visited, needed when serde reports
//!   one of its fields as missing (that report never reaches our deserializer);
//! - the innermost path at which an error started propagating, so an error
//!   that escapes the whole decode can be located.

use std::cell::RefCell;

use crate::path::Path;

#[derive(Default)]
struct State {
    containers: Vec<Path>,
    failed_at: Option<Path>,
}

thread_local! {
    static STATE: RefCell<State> = RefCell::new(State::default());
}

/// Keeps a struct's path on the container stack while it is visited.
pub(crate) struct ContainerGuard(());

pub(crate) fn enter_container(path: &Path) -> ContainerGuard {
    STATE.with(|state| state.borrow_mut().containers.push(path.clone()));
    ContainerGuard(())
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        STATE.with(|state| {
            state.borrow_mut().containers.pop();
        });
    }
}

/// Path of the innermost struct being visited on this thread.
pub(crate) fn current_container() -> Option<Path> {
    STATE.with(|state| state.borrow().containers.last().cloned())
}

/// Record where an error surfaced; the innermost report wins.
pub(crate) fn note_failure(path: &Path) {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        if state.failed_at.is_none() {
            state.failed_at = Some(path.clone());
        }
    });
}

/// A deserializer call succeeded: whatever failed below it was absorbed.
pub(crate) fn clear_failure() {
    STATE.with(|state| state.borrow_mut().failed_at = None);
}

/// One top-level decode call. Nested calls (a `Deserialize` impl that decodes
/// a sub-document itself) get their own failure slot.
pub(crate) struct Session {
    outer: Option<Path>,
}

impl Session {
    pub(crate) fn begin() -> Self {
        let outer = STATE.with(|state| state.borrow_mut().failed_at.take());
        Self { outer }
    }

    /// Where the escaping error surfaced, if a deserializer saw it.
    pub(crate) fn failure_location(&self) -> Option<Path> {
        STATE.with(|state| state.borrow().failed_at.clone())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let outer = self.outer.take();
        STATE.with(|state| state.borrow_mut().failed_at = outer);
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containers_nest_and_unwind() {
        let outer = Path::from_steps(["a"]);
        let inner = outer.join("b");
        {
            let _outer = enter_container(&outer);
            {
                let _inner = enter_container(&inner);
                assert_eq!(current_container(), Some(inner.clone()));
            }
            assert_eq!(current_container(), Some(outer.clone()));
        }
        assert_eq!(current_container(), None);
    }

    #[test]
    fn innermost_failure_wins_until_cleared() {
        let session = Session::begin();
        note_failure(&Path::from_steps(["a", "b"]));
        note_failure(&Path::from_steps(["a"]));
        assert_eq!(session.failure_location(), Some(Path::from_steps(["a", "b"])));
        clear_failure();
        assert_eq!(session.failure_location(), None);
    }

    #[test]
    fn sessions_restore_the_outer_slot() {
        let outer = Session::begin();
        note_failure(&Path::from_steps(["outer"]));
        {
            let inner = Session::begin();
            assert_eq!(inner.failure_location(), None);
            note_failure(&Path::from_steps(["inner"]));
        }
        assert_eq!(outer.failure_location(), Some(Path::from_steps(["outer"])));
    }
}
