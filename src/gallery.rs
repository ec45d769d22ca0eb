// gallery.rs — Named result collection plus browse navigation.
//
// A gallery is an ordered, non-empty list of `(name, image)` entries indexed
// cyclically: any signed index is reduced modulo the entry count, so
// stepping past either end wraps around.
//
// Browsing is a two-state machine:
//
//   Idle(i) ──Next──► Idle((i+1) mod N)
//   Idle(i) ──Prev──► Idle((i-1+N) mod N)
//   Idle(i) ──Quit──► Terminal
//   Terminal ──any──► error (NavigationTerminated)
//
// Galleries are populated all-or-nothing by the `build_*` functions: the
// first backend failure is returned and the partially built list dropped.

use log::{info, warn};

use crate::backend::StencilBackend;
use crate::convolution::ScaleFactor;
use crate::error::{Result, StencilError};
use crate::filters::Filter;
use crate::image::Image;
use crate::pyramid;

/// Name of the host pyramid-up reference entry in upscale galleries.
pub const PYR_UP_REFERENCE: &str = "pyrUp reference";
/// Name of the unfiltered source entry in filter galleries.
pub const ORIGINAL: &str = "original";

/// One named result.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub name: String,
    pub image: Image<f32>,
}

impl GalleryEntry {
    pub fn new(name: impl Into<String>, image: Image<f32>) -> Self {
        GalleryEntry { name: name.into(), image }
    }
}

/// Ordered, cyclically indexed, never empty.
#[derive(Debug, Clone)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    /// # Errors
    /// `EmptyGallery` if `entries` is empty.
    pub fn new(entries: Vec<GalleryEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(StencilError::EmptyGallery);
        }
        Ok(Gallery { entries })
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Normalize a signed index into `0..count()`.
    pub fn wrap(&self, index: isize) -> usize {
        index.rem_euclid(self.entries.len() as isize) as usize
    }

    /// The entry at `index mod count()`; negative indices count from the end.
    pub fn select(&self, index: isize) -> &GalleryEntry {
        &self.entries[self.wrap(index)]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GalleryEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Gallery {
    type Item = &'a GalleryEntry;
    type IntoIter = std::slice::Iter<'a, GalleryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// User intent while browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    Next,
    Prev,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle(usize),
    Terminal,
}

/// Browse state over a gallery of `count` entries.
#[derive(Debug, Clone)]
pub struct Navigator {
    count: usize,
    state: NavState,
}

impl Navigator {
    /// Starts at `Idle(0)`.
    pub fn new(gallery: &Gallery) -> Self {
        Navigator { count: gallery.count(), state: NavState::Idle(0) }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Index being shown, or `None` once terminated.
    pub fn current(&self) -> Option<usize> {
        match self.state {
            NavState::Idle(i) => Some(i),
            NavState::Terminal => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state == NavState::Terminal
    }

    /// Apply one event and return the new state.
    ///
    /// # Errors
    /// `NavigationTerminated` if the navigator already quit.
    pub fn apply(&mut self, event: NavEvent) -> Result<NavState> {
        match event {
            NavEvent::Next => self.step(1),
            NavEvent::Prev => self.step(-1),
            NavEvent::Quit => {
                if self.is_terminal() {
                    return Err(StencilError::NavigationTerminated);
                }
                self.state = NavState::Terminal;
                Ok(self.state)
            }
        }
    }

    /// Move by a signed number of entries, wrapping in both directions.
    pub fn step(&mut self, delta: isize) -> Result<NavState> {
        let NavState::Idle(i) = self.state else {
            return Err(StencilError::NavigationTerminated);
        };
        // Reduce first: i + delta can overflow for deltas near isize::MAX.
        let n = self.count as isize;
        let d = delta.rem_euclid(n);
        self.state = NavState::Idle((i as isize + d).rem_euclid(n) as usize);
        Ok(self.state)
    }
}

// ---------------------------------------------------------------------------
// Population
// ---------------------------------------------------------------------------

/// Run every filter over `image` on `backend`, in order.
///
/// With `include_original`, the gallery starts with `image` itself.
///
/// # Errors
/// The first backend failure; no partial gallery is returned.
pub fn build_filter_gallery<B: StencilBackend>(
    backend: &B,
    image: &Image<f32>,
    filters: &[Filter],
    include_original: bool,
) -> Result<Gallery> {
    let src = backend.load(image)?;
    let mut entries = Vec::with_capacity(filters.len() + 1);
    if include_original {
        entries.push(GalleryEntry::new(ORIGINAL, image.clone()));
    }
    for f in filters {
        let out = backend.run_filter(&src, f)?;
        info!("[{}] {} done ({}×{})", backend.name(), f.name(), out.width(), out.height());
        entries.push(GalleryEntry::new(f.name(), out));
    }
    Gallery::new(entries)
}

/// Upscale `image` by `scale` with every filter, in order.
///
/// With `include_reference`, the gallery starts with the host pyramid-up
/// expansion of `image`. That reference is a fixed 2× expansion, so it is
/// only added when `scale` is 2.
///
/// # Errors
/// The first backend failure; no partial gallery is returned.
pub fn build_upscale_gallery<B: StencilBackend>(
    backend: &B,
    image: &Image<f32>,
    scale: ScaleFactor,
    filters: &[Filter],
    include_reference: bool,
) -> Result<Gallery> {
    let src = backend.load(image)?;
    let mut entries = Vec::with_capacity(filters.len() + 1);
    if include_reference {
        if scale.get() == 2 {
            entries.push(GalleryEntry::new(PYR_UP_REFERENCE, pyramid::pyr_up(image)));
        } else {
            warn!("pyrUp reference skipped: it is a 2× expansion, scale is {scale}");
        }
    }

    for f in filters {
        let out = backend.run_upscale(&src, scale, f)?;
        info!(
            "[{}] {} {scale} done ({}×{})",
            backend.name(),
            f.name(),
            out.width(),
            out.height()
        );
        entries.push(GalleryEntry::new(format!("{} {scale}", f.name()), out));
    }
    Gallery::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery(n: usize) -> Gallery {
        Gallery::new(
            (0..n)
                .map(|i| GalleryEntry::new(format!("e{i}"), Image::filled(1, 1, i as f32)))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(Gallery::new(vec![]), Err(StencilError::EmptyGallery)));
    }

    #[test]
    fn test_select_wraps() {
        let g = gallery(3);
        assert_eq!(g.select(3).name, "e0");
        assert_eq!(g.select(-1).name, "e2");
        assert_eq!(g.select(-4).name, "e2");
    }

    #[test]
    fn test_full_cycle_returns_home() {
        let g = gallery(8);
        let mut nav = Navigator::new(&g);
        for _ in 0..8 {
            nav.apply(NavEvent::Next).unwrap();
        }
        assert_eq!(nav.state(), NavState::Idle(0));
    }

    #[test]
    fn test_retreat_from_zero() {
        let g = gallery(5);
        let mut nav = Navigator::new(&g);
        assert_eq!(nav.apply(NavEvent::Prev).unwrap(), NavState::Idle(4));
    }

    #[test]
    fn test_terminal_is_final() {
        let g = gallery(2);
        let mut nav = Navigator::new(&g);
        assert_eq!(nav.apply(NavEvent::Quit).unwrap(), NavState::Terminal);
        assert_eq!(nav.current(), None);
        for ev in [NavEvent::Next, NavEvent::Prev, NavEvent::Quit] {
            assert!(matches!(nav.apply(ev), Err(StencilError::NavigationTerminated)));
        }
    }

    #[test]
    fn test_single_entry_gallery() {
        let g = gallery(1);
        let mut nav = Navigator::new(&g);
        assert_eq!(nav.step(7).unwrap(), NavState::Idle(0));
        assert_eq!(nav.step(-3).unwrap(), NavState::Idle(0));
    }

    #[test]
    fn test_extreme_deltas_wrap() {
        let g = gallery(3);
        let mut nav = Navigator::new(&g);
        nav.step(1).unwrap();
        // isize::MAX = 3·k + 1, so one step of it moves by one.
        assert_eq!(nav.step(isize::MAX).unwrap(), NavState::Idle(2));
        // isize::MIN = -(3·k + 2), i.e. +1 mod 3.
        assert_eq!(nav.step(isize::MIN).unwrap(), NavState::Idle(0));
    }
}
