//! Same-tick event queue.
//!
//! Processors never call each other. Everything one processor needs to tell
//! a later one goes through the [`EventQueue`], in emission order. The queue
//! is cleared at the start of every tick, so no event outlives the tick that
//! produced it.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;

// ============================================================================
// Battle Events
// ============================================================================

/// Typed message emitted by a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BattleEvent {
    /// A unit picked a new target.
    TargetAcquired {
        /// Seeking unit.
        entity: EntityId,
        /// Chosen enemy.
        target: EntityId,
    },
    /// A unit dropped its target (dead, removed or out of range).
    TargetLost {
        /// Unit that lost its target.
        entity: EntityId,
        /// The target that was lost.
        target: EntityId,
    },
    /// A pursuing unit closed to attack range.
    TargetInRange {
        /// Pursuing unit.
        entity: EntityId,
        /// Its target.
        target: EntityId,
    },
    /// A ranged unit launched a projectile.
    AttackFired {
        /// Attacker.
        entity: EntityId,
        /// Unit the projectile was aimed at.
        target: EntityId,
        /// Spawned projectile.
        projectile: EntityId,
    },
    /// Raw damage on its way to a unit, before armor.
    Damage {
        /// Unit that dealt the damage.
        source: EntityId,
        /// Unit receiving the damage.
        target: EntityId,
        /// Damage before mitigation.
        amount: u32,
    },
    /// A unit's health reached zero.
    Death {
        /// The unit that died.
        entity: EntityId,
    },
    /// An attack action (melee hit or projectile launch) was issued.
    AttackCompleted {
        /// Attacker.
        entity: EntityId,
        /// Attacked unit.
        target: EntityId,
    },
    /// A projectile struck a unit and was destroyed.
    ProjectileCollision {
        /// The projectile.
        projectile: EntityId,
        /// Unit that was hit.
        target: EntityId,
        /// Damage carried by the projectile.
        damage: u32,
    },
}

impl BattleEvent {
    /// The entity this event is primarily about.
    #[must_use]
    pub const fn subject(&self) -> EntityId {
        match *self {
            Self::TargetAcquired { entity, .. }
            | Self::TargetLost { entity, .. }
            | Self::TargetInRange { entity, .. }
            | Self::AttackFired { entity, .. }
            | Self::Death { entity }
            | Self::AttackCompleted { entity, .. } => entity,
            Self::Damage { target, .. } => target,
            Self::ProjectileCollision { projectile, .. } => projectile,
        }
    }
}

/// Ordered per-tick event buffer.
///
/// Keeps a read cursor for the State processor, which runs twice per tick
/// and must apply every event exactly once.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<BattleEvent>,
    cursor: usize,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: BattleEvent) {
        tracing::trace!(?event, "event");
        self.events.push(event);
    }

    /// All events emitted so far this tick, in order.
    #[must_use]
    pub fn as_slice(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Iterate over all events emitted so far this tick.
    pub fn iter(&self) -> std::slice::Iter<'_, BattleEvent> {
        self.events.iter()
    }

    /// Events not yet handed out by [`take_unread`](Self::take_unread).
    ///
    /// Advances the cursor, so the next call only returns newer events.
    pub fn take_unread(&mut self) -> Vec<BattleEvent> {
        let unread = self.events[self.cursor..].to_vec();
        self.cursor = self.events.len();
        unread
    }

    /// Number of events queued this tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been emitted this tick.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all events and reset the cursor.
    pub fn clear(&mut self) {
        self.events.clear();
        self.cursor = 0;
    }

    /// Move the tick's events out, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<BattleEvent> {
        self.cursor = 0;
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_unread_advances_cursor() {
        let mut queue = EventQueue::new();
        queue.push(BattleEvent::Death { entity: 1 });
        queue.push(BattleEvent::Death { entity: 2 });

        assert_eq!(queue.take_unread().len(), 2);
        assert!(queue.take_unread().is_empty());

        queue.push(BattleEvent::Death { entity: 3 });
        assert_eq!(queue.take_unread(), vec![BattleEvent::Death { entity: 3 }]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_drain_resets_queue() {
        let mut queue = EventQueue::new();
        queue.push(BattleEvent::Death { entity: 7 });
        let _ = queue.take_unread();

        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert!(queue.is_empty());

        queue.push(BattleEvent::Death { entity: 8 });
        assert_eq!(queue.take_unread().len(), 1);
    }

    #[test]
    fn test_event_subject() {
        let hit = BattleEvent::Damage {
            source: 1,
            target: 2,
            amount: 5,
        };
        assert_eq!(hit.subject(), 2);
        assert_eq!(BattleEvent::Death { entity: 4 }.subject(), 4);
    }
}
