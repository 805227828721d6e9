//! Screen-to-screen overlap detection
//!
//! When a terminal produces more output than fits on screen, the tail of the
//! previous screen reappears higher up on the next one and everything below
//! it is unseen. Finding where that tail landed tells us which lines are new.

/// Normalize screen text into comparable lines: trailing whitespace is
/// removed from every line and trailing blank lines are dropped.
pub fn screen_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// How a new screen relates to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// No previous screen to compare with
    Initial,
    /// The previous screen's tail was found; new lines start at this index
    Continues { new_from: usize },
    /// Nothing of the previous screen survives (clear or full rewrite)
    Discontinuous,
}

/// Compare `previous` against `current`.
///
/// Finds the longest suffix of `previous` that appears as a contiguous run
/// in `current`. When that suffix occurs more than once the earliest
/// occurrence wins: the old tail sits at the top of the new screen and
/// any repeat below it is fresh output.
pub fn find_overlap(previous: &[String], current: &[String]) -> Overlap {
    let Some(last) = previous.last() else {
        return Overlap::Initial;
    };

    let mut best: Option<(usize, usize)> = None; // (matched length, end index)
    for end in 0..current.len() {
        if current[end] != *last {
            continue;
        }
        let len = matched_suffix_len(previous, &current[..=end]);
        if best.is_none_or(|(best_len, _)| len > best_len) {
            best = Some((len, end));
        }
    }

    match best {
        Some((_, end)) => Overlap::Continues { new_from: end + 1 },
        None => Overlap::Discontinuous,
    }
}

/// Length of the longest common suffix of `previous` and `window`
fn matched_suffix_len(previous: &[String], window: &[String]) -> usize {
    previous
        .iter()
        .rev()
        .zip(window.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}
