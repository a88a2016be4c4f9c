//! Crop cycle events from detected peaks and valleys.

use std::fmt;

/// A marked sample of the smoothed series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Maximum biomass before a harvest.
    Peak(usize),
    /// Minimum after a peak: regrowth starts or the field was cut.
    GrowthOrCut(usize),
}

impl Event {
    pub fn index(&self) -> usize {
        match self {
            Event::Peak(i) | Event::GrowthOrCut(i) => *i,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Event::Peak(_) => "peak",
            Event::GrowthOrCut(_) => "growth_or_cut",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.label(), self.index())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Expect {
    Growth,
    Peak,
}

/// Walk peaks and valleys (sorted indices) into an alternating
/// peak → growth/cut sequence.
///
/// While growing, a peak is accepted when it comes before the current
/// valley. After a peak, a valley is accepted when it comes after that
/// peak. Anything else is skipped. Once one list is exhausted, at most one
/// more event is taken from the other.
pub fn classify_events(peaks: &[usize], valleys: &[usize]) -> Vec<Event> {
    let mut events: Vec<Event> = Vec::new();
    let mut state = Expect::Growth;
    let (mut i, mut j) = (0, 0);

    while i < peaks.len() && j < valleys.len() {
        let last = events.last().map(Event::index);
        match state {
            Expect::Growth if peaks[i] < valleys[j] => {
                events.push(Event::Peak(peaks[i]));
                state = Expect::Peak;
                i += 1;
            }
            Expect::Peak if last.map_or(true, |l| valleys[j] > l) => {
                events.push(Event::GrowthOrCut(valleys[j]));
                state = Expect::Growth;
                j += 1;
            }
            Expect::Growth => i += 1,
            Expect::Peak => j += 1,
        }
    }

    if i < peaks.len() && state == Expect::Growth {
        events.push(Event::Peak(peaks[i]));
    }
    if j < valleys.len() && state == Expect::Peak {
        events.push(Event::GrowthOrCut(valleys[j]));
    }
    events
}
