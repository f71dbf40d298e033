/// A pair of same-shaped resources with designated "front" (read) and
/// "back" (write) roles.
///
/// The two resources live in a fixed two-slot arena; `flip` toggles an
/// index with XOR instead of moving the values, so swapping roles is a
/// single integer write and the resources themselves never relocate.
#[derive(Debug)]
pub struct BufferPair<T> {
    sides: [T; 2],
    front: usize,
}

impl<T> BufferPair<T> {
    /// Builds a pair with `front` as the initial read side and `back` as
    /// the initial write side. The caller is responsible for the two
    /// resources being shape-compatible.
    pub fn new(front: T, back: T) -> Self {
        Self {
            sides: [front, back],
            front: 0,
        }
    }

    /// Peeks the current front without changing roles.
    pub fn front(&self) -> &T {
        &self.sides[self.front]
    }

    /// Peeks the current back without changing roles.
    pub fn back(&self) -> &T {
        &self.sides[self.front ^ 1]
    }

    /// Swaps the front/back roles and returns the side that was front
    /// before the swap.
    ///
    /// In the single-threaded frame loop no interleaving is possible; the
    /// toggle is one index write, so making it atomic is trivial if a
    /// concurrent port ever needs it.
    pub fn flip(&mut self) -> &T {
        self.front ^= 1;
        &self.sides[self.front ^ 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_assigns_front_and_back() {
        let pair = BufferPair::new("a", "b");
        assert_eq!(*pair.front(), "a");
        assert_eq!(*pair.back(), "b");
    }

    #[test]
    fn flip_is_an_involution() {
        let mut pair = BufferPair::new(1, 2);
        for n in 0..8 {
            if n % 2 == 0 {
                assert_eq!(*pair.front(), 1, "even flip count, n = {n}");
                assert_eq!(*pair.back(), 2);
            } else {
                assert_eq!(*pair.front(), 2, "odd flip count, n = {n}");
                assert_eq!(*pair.back(), 1);
            }
            pair.flip();
        }
    }

    #[test]
    fn flip_returns_the_previous_front() {
        let mut pair = BufferPair::new("front", "back");
        let before = *pair.front();
        assert_eq!(*pair.flip(), before);
        let before = *pair.front();
        assert_eq!(*pair.flip(), before);
    }

    #[test]
    fn sides_stay_distinct() {
        let mut pair = BufferPair::new(vec![0u8; 4], vec![1u8; 4]);
        for _ in 0..3 {
            assert_ne!(pair.front(), pair.back());
            pair.flip();
        }
    }
}
