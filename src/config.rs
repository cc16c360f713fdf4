use crate::error::{Error, Result};

/// Minimum degree used by [`BPlusTreeMap::new`](crate::BPlusTreeMap::new).
pub const DEFAULT_MIN_DEGREE: usize = 8;

/// Smallest accepted minimum degree.
pub const MIN_DEGREE_LOWER_BOUND: usize = 2;

/// Largest accepted minimum degree. Node buffers are sized for `2t` entries on creation.
pub const MAX_MIN_DEGREE: usize = 1 << 16;

/// Shape parameters for a [`BPlusTreeMap`](crate::BPlusTreeMap).
///
/// The minimum degree `t` bounds every non-root node to between `t` and `2t - 1` keys
/// between operations; a node is split the moment it reaches `2t`.
///
/// # Examples
///
/// ```
/// use leafchain::{Config, Error};
///
/// let config = Config::new(4).unwrap();
/// assert_eq!(config.min_degree(), 4);
/// assert_eq!(config.max_key_num(), 8);
///
/// assert!(matches!(Config::new(1), Err(Error::InvalidDegree { min_degree: 1 })));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Config {
    min_degree: usize,
}

impl Config {
    /// Validates `min_degree` and builds a configuration from it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDegree`] if `min_degree` is outside
    /// [`MIN_DEGREE_LOWER_BOUND`]`..=`[`MAX_MIN_DEGREE`].
    pub const fn new(min_degree: usize) -> Result<Self> {
        if min_degree < MIN_DEGREE_LOWER_BOUND || min_degree > MAX_MIN_DEGREE {
            return Err(Error::InvalidDegree { min_degree });
        }
        Ok(Self { min_degree })
    }

    /// The minimum degree `t`.
    #[must_use]
    pub const fn min_degree(&self) -> usize {
        self.min_degree
    }

    /// Fewest keys a non-root node may hold.
    #[must_use]
    pub const fn min_key_num(&self) -> usize {
        self.min_degree
    }

    /// Key count at which a node is split.
    #[must_use]
    pub const fn max_key_num(&self) -> usize {
        self.min_degree * 2
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_degree: DEFAULT_MIN_DEGREE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degrees_below_two() {
        for t in 0..MIN_DEGREE_LOWER_BOUND {
            assert!(matches!(Config::new(t), Err(Error::InvalidDegree { min_degree }) if min_degree == t));
        }
    }

    #[test]
    fn rejects_degrees_too_large_to_allocate() {
        assert!(Config::new(MAX_MIN_DEGREE).is_ok());
        for t in [MAX_MIN_DEGREE + 1, usize::MAX / 4, usize::MAX] {
            assert_eq!(Config::new(t), Err(Error::InvalidDegree { min_degree: t }));
        }
    }

    #[test]
    fn bounds_follow_degree() {
        let config = Config::new(2).unwrap();
        assert_eq!(config.min_key_num(), 2);
        assert_eq!(config.max_key_num(), 4);
        assert_eq!(Config::default().min_degree(), DEFAULT_MIN_DEGREE);
    }
}
