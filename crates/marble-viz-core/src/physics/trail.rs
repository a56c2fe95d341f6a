use glam::Vec3;
use std::collections::VecDeque;

/// Bounded FIFO of recent marble positions
#[derive(Clone, Debug)]
pub struct TrailBuffer {
    points: VecDeque<Vec3>,
    capacity: usize,
}

impl TrailBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, point: Vec3) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Vec3> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<Vec3> {
        self.points.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut trail = TrailBuffer::new(3);
        for i in 0..5 {
            trail.push(Vec3::splat(i as f32));
        }
        assert_eq!(trail.len(), 3);
        assert_eq!(
            trail.to_vec(),
            vec![Vec3::splat(2.0), Vec3::splat(3.0), Vec3::splat(4.0)]
        );
    }
}
