//! Controller port allocation
//!
//! Ports are handed out once, in order, at setup time. The pool is an
//! ordinary value owned by whoever wires up the buses, so two pools never
//! share hidden state.

use crate::config::MAX_PORTS;

/// Index handle of an allocated controller port
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortId(u8);

impl PortId {
    /// Port index (0-based)
    pub const fn index(self) -> u8 {
        self.0
    }
}

/// Fixed pool of controller ports
#[derive(Debug)]
pub struct PortPool<const N: usize = MAX_PORTS> {
    next: usize,
}

impl<const N: usize> Default for PortPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PortPool<N> {
    /// Create a pool with all `N` ports free
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Take the next free port
    ///
    /// Returns `None` once every port has been handed out. Ports are never
    /// returned to the pool.
    pub fn allocate(&mut self) -> Option<PortId> {
        if self.next >= N || self.next > u8::MAX as usize {
            return None;
        }
        let id = PortId(self.next as u8);
        self.next += 1;
        Some(id)
    }

    /// Ports still available
    pub fn remaining(&self) -> usize {
        N.saturating_sub(self.next)
    }

    /// Total ports managed by this pool
    pub const fn capacity(&self) -> usize {
        N
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_in_order_until_exhausted() {
        let mut pool: PortPool = PortPool::new();
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.allocate().map(PortId::index), Some(0));
        assert_eq!(pool.remaining(), 1);
        assert_eq!(pool.allocate().map(PortId::index), Some(1));
        assert_eq!(pool.remaining(), 0);
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.allocate(), None);
    }

    #[test]
    fn test_pools_are_independent() {
        let mut a = PortPool::<1>::new();
        let mut b = PortPool::<1>::new();
        assert!(a.allocate().is_some());
        assert!(b.allocate().is_some());
        assert!(a.allocate().is_none());
    }
}
