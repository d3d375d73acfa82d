//! Numbered stores for surfaces and cells, and the model tying them
//! together.

mod cells;
mod model;
mod surfaces;

pub use cells::{CellKey, CellRegistry};
pub use model::{BoundModel, Model};
pub use surfaces::{SurfaceKey, SurfaceRegistry};

use crate::config::MAX_NUMBER;
use crate::error::{RegistryError, Result};
use crate::SurfaceId;

/// Rejects numbers that do not fit a signed literal.
pub(crate) fn check_number(number: u32) -> Result<u32> {
    if number > MAX_NUMBER {
        return Err(RegistryError::NumberOutOfRange(number).into());
    }
    Ok(number)
}

/// Signed literal for surface `id`.
///
/// # Errors
///
/// Returns [`RegistryError::NumberOutOfRange`] above [`MAX_NUMBER`].
pub(crate) fn signed(id: SurfaceId, positive: bool) -> Result<i32> {
    let n = i32::try_from(check_number(id)?).map_err(|_| RegistryError::NumberOutOfRange(id))?;
    Ok(if positive { n } else { -n })
}

/// Number following the largest one in use, or the smallest free number
/// once the top of the range is taken.
pub(crate) fn next_free<I>(mut used: I, is_used: impl Fn(u32) -> bool) -> Result<u32>
where
    I: DoubleEndedIterator<Item = u32>,
{
    match used.next_back() {
        None => Ok(1),
        Some(last) if last < MAX_NUMBER => Ok(last + 1),
        Some(_) => (1..=MAX_NUMBER)
            .find(|&n| !is_used(n))
            .ok_or_else(|| RegistryError::NumbersExhausted.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn numbers_stay_in_literal_range() {
        assert_eq!(signed(7, false).unwrap(), -7);
        assert_eq!(signed(MAX_NUMBER, true).unwrap(), i32::MAX);
        assert!(signed(MAX_NUMBER + 1, true).is_err());
        assert!(check_number(3_000_000_000).is_err());
    }

    #[test]
    fn next_free_wraps_to_gaps() {
        assert_eq!(next_free(std::iter::empty(), |_| false).unwrap(), 1);
        assert_eq!(next_free([3, 9].into_iter(), |_| false).unwrap(), 10);
        let used = [1, 2, MAX_NUMBER];
        assert_eq!(next_free(used.into_iter(), |n| used.contains(&n)).unwrap(), 3);
    }
}
