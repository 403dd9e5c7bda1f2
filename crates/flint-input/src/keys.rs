//! Held-key set fed by winit keyboard events.
//!
//! [`PressedKeys`] holds the set of physical keys currently down: a key is in
//! the set iff its most recent event was a press with no release since.
//! Physical key codes are used so the set is independent of keyboard layout.
//!
//! The set is mutated only synchronously during event processing on the loop
//! thread; it carries no interior locking and must not be shared across
//! threads without external synchronization.

use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::PhysicalKey;

/// Whether a key event was a press or a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// The key transitioned to down.
    Pressed,
    /// The key transitioned to up.
    Released,
}

impl From<ElementState> for KeyAction {
    fn from(state: ElementState) -> Self {
        match state {
            ElementState::Pressed => Self::Pressed,
            ElementState::Released => Self::Released,
        }
    }
}

/// Set of physical keys currently held down.
#[derive(Debug, Clone, Default)]
pub struct PressedKeys {
    held: HashSet<PhysicalKey>,
}

impl PressedKeys {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a press or release for `key`.
    ///
    /// Pressing an already-held key or releasing an unheld key is a no-op,
    /// which is exactly what OS key-repeat and focus-loss sequences produce.
    pub fn apply(&mut self, key: PhysicalKey, action: KeyAction) {
        match action {
            KeyAction::Pressed => {
                self.held.insert(key);
            }
            KeyAction::Released => {
                self.held.remove(&key);
            }
        }
    }

    /// Applies a winit [`KeyEvent`], ignoring key-repeat events, and returns
    /// the action it mapped to (`None` for repeats).
    pub fn process_event(&mut self, event: &KeyEvent) -> Option<KeyAction> {
        if event.repeat {
            return None;
        }
        let action = KeyAction::from(event.state);
        self.apply(event.physical_key, action);
        Some(action)
    }

    /// Returns `true` while `key` is held down.
    #[must_use]
    pub fn is_held(&self, key: PhysicalKey) -> bool {
        self.held.contains(&key)
    }

    /// A copy of the currently held keys.
    #[must_use]
    pub fn snapshot(&self) -> HashSet<PhysicalKey> {
        self.held.clone()
    }

    /// Iterates over the currently held keys in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = PhysicalKey> + '_ {
        self.held.iter().copied()
    }

    /// Number of keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Returns `true` when no key is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Releases all keys, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    fn key(code: KeyCode) -> PhysicalKey {
        PhysicalKey::Code(code)
    }

    #[test]
    fn test_initially_empty() {
        let keys = PressedKeys::new();
        assert!(keys.is_empty());
        assert!(!keys.is_held(key(KeyCode::KeyA)));
    }

    #[test]
    fn test_press_then_release_net_effect() {
        // press(A), press(B), release(A) -> {B}
        let mut keys = PressedKeys::new();
        keys.apply(key(KeyCode::KeyA), KeyAction::Pressed);
        keys.apply(key(KeyCode::KeyB), KeyAction::Pressed);
        keys.apply(key(KeyCode::KeyA), KeyAction::Released);

        assert!(!keys.is_held(key(KeyCode::KeyA)));
        assert!(keys.is_held(key(KeyCode::KeyB)));
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.snapshot(), HashSet::from([key(KeyCode::KeyB)]));
    }

    #[test]
    fn test_double_press_is_idempotent() {
        let mut keys = PressedKeys::new();
        keys.apply(key(KeyCode::Space), KeyAction::Pressed);
        keys.apply(key(KeyCode::Space), KeyAction::Pressed);
        assert_eq!(keys.len(), 1);
        keys.apply(key(KeyCode::Space), KeyAction::Released);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_release_without_press_is_harmless() {
        let mut keys = PressedKeys::new();
        keys.apply(key(KeyCode::Escape), KeyAction::Released);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut keys = PressedKeys::new();
        keys.apply(key(KeyCode::KeyW), KeyAction::Pressed);
        keys.apply(key(KeyCode::KeyD), KeyAction::Pressed);
        keys.clear();
        assert!(keys.is_empty());
    }

    #[test]
    fn test_action_from_element_state() {
        assert_eq!(KeyAction::from(ElementState::Pressed), KeyAction::Pressed);
        assert_eq!(KeyAction::from(ElementState::Released), KeyAction::Released);
    }

    #[test]
    fn test_iter_matches_snapshot() {
        let mut keys = PressedKeys::new();
        keys.apply(key(KeyCode::KeyA), KeyAction::Pressed);
        keys.apply(key(KeyCode::KeyS), KeyAction::Pressed);
        let collected: HashSet<_> = keys.iter().collect();
        assert_eq!(collected, keys.snapshot());
    }
}
