use crate::devices::types::HOURS_PER_DAY;

/// An hour clock that hands out strictly increasing simulation hours.
///
/// A clock can start at any hour, so a federation can be driven for a few
/// days, inspected, and driven further without repeating an hour.
///
/// # Examples
///
/// ```
/// use minigrid_sim::sim::clock::Clock;
///
/// let mut clock = Clock::for_days(24, 1);
/// let mut hours = Vec::new();
///
/// clock.run(|hour| hours.push(hour));
/// assert_eq!(hours.first(), Some(&24));
/// assert_eq!(hours.last(), Some(&47));
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    /// Next hour to hand out.
    current: usize,
    /// First hour past the end of the run.
    end: usize,
}

impl Clock {
    /// Creates a clock covering `[start, start + hours)`.
    pub fn new(start: usize, hours: usize) -> Self {
        Self {
            current: start,
            end: start + hours,
        }
    }

    /// Creates a clock covering `days` whole days starting at `start`.
    pub fn for_days(start: usize, days: usize) -> Self {
        Self::new(start, days * HOURS_PER_DAY)
    }

    /// Advances the clock by one hour.
    ///
    /// # Returns
    ///
    /// * `Some(hour)` - The hour before advancing
    /// * `None` - If the clock has reached its end
    pub fn tick(&mut self) -> Option<usize> {
        if self.current < self.end {
            let hour = self.current;
            self.current += 1;
            Some(hour)
        } else {
            None
        }
    }

    /// Calls `f` for every remaining hour.
    pub fn run(&mut self, mut f: impl FnMut(usize)) {
        while let Some(hour) = self.tick() {
            f(hour);
        }
    }

    /// Hours not yet handed out.
    pub fn remaining(&self) -> usize {
        self.end - self.current
    }
}

/// Zero-based day index of `hour`.
pub fn day_of(hour: usize) -> usize {
    hour / HOURS_PER_DAY
}

/// Returns `true` for the last hour of a day.
pub fn is_end_of_day(hour: usize) -> bool {
    hour % HOURS_PER_DAY == HOURS_PER_DAY - 1
}
