use serde::{Deserialize, Serialize};

/// The range of events to collect from a stream: drop the first `skip_events`, then keep
/// at most `n_events` (all remaining if None).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventWindow {
    pub skip_events: usize,
    pub n_events: Option<usize>,
}

impl EventWindow {
    pub fn new(skip_events: usize, n_events: Option<usize>) -> Self {
        Self {
            skip_events,
            n_events,
        }
    }

    /// Every event in the stream
    pub fn all() -> Self {
        Self::default()
    }

    /// Apply the window to a fallible event stream.
    ///
    /// The window is applied as the stream is consumed, so nothing outside it is kept. Errors
    /// are passed through even when they occur among the skipped events, and an error does not
    /// count as a skipped event. Once `n_events` have been yielded the source is not polled
    /// again.
    pub fn apply<I, T, E>(self, source: I) -> Windowed<I::IntoIter>
    where
        I: IntoIterator<Item = Result<T, E>>,
    {
        Windowed {
            source: source.into_iter(),
            to_skip: self.skip_events,
            remaining: self.n_events,
        }
    }
}

/// Iterator returned by [`EventWindow::apply`]
#[derive(Debug)]
pub struct Windowed<I> {
    source: I,
    to_skip: usize,
    remaining: Option<usize>,
}

impl<I, T, E> Iterator for Windowed<I>
where
    I: Iterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            match self.source.next()? {
                Ok(_) if self.to_skip > 0 => self.to_skip -= 1,
                Ok(item) => {
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(Ok(item));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
