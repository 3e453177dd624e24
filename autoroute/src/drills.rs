//! Drill pages: a lazy 2-D subdivision caching candidate via locations.
//!
//! The board is covered by a grid of pages (about 5 mm on a side by
//! default). For the session net, a page enumerates its candidate drills on
//! demand: the page's free area minus all obstacles is split into convex
//! cells and one drill is placed at each cell center. Mutating any item that
//! intersects a page invalidates it.

use geometry::prelude::*;

use crate::rooms::DrillKey;

/// One page of the drill grid.
#[derive(Debug, Clone, Default)]
pub struct DrillPage {
    /// The page rectangle.
    pub bbox: Rect,
    /// The drills valid on this page for the session net; `None` when not
    /// yet computed (or invalidated).
    pub drills: Option<Vec<DrillKey>>,
}

/// The page grid covering the board.
#[derive(Debug, Clone)]
pub struct DrillPages {
    bounds: Rect,
    page_size: i64,
    cols: usize,
    rows: usize,
    pages: Vec<DrillPage>,
}

impl DrillPages {
    /// Covers `bounds` with pages of edge length `page_size` (clamped to a
    /// sane minimum).
    pub fn new(bounds: Rect, page_size: i64) -> Self {
        let page_size = page_size.max(10_000);
        let cols = ((bounds.width() + page_size - 1) / page_size).max(1) as usize;
        let rows = ((bounds.height() + page_size - 1) / page_size).max(1) as usize;
        let mut pages = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let left = bounds.left() + col as i64 * page_size;
                let bot = bounds.bot() + row as i64 * page_size;
                pages.push(DrillPage {
                    bbox: Rect::from_sides(
                        left,
                        bot,
                        (left + page_size).min(bounds.right()).max(left),
                        (bot + page_size).min(bounds.top()).max(bot),
                    ),
                    drills: None,
                });
            }
        }
        Self {
            bounds,
            page_size,
            cols,
            rows,
            pages,
        }
    }

    /// The page count.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the grid has no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The page at `index`.
    pub fn page(&self, index: usize) -> &DrillPage {
        &self.pages[index]
    }

    /// Mutable access to the page at `index`.
    pub fn page_mut(&mut self, index: usize) -> &mut DrillPage {
        &mut self.pages[index]
    }

    /// The indices of pages intersecting `region`.
    pub fn pages_overlapping(&self, region: Rect) -> Vec<usize> {
        if region.is_empty() || self.pages.is_empty() {
            return Vec::new();
        }
        let clip = region.intersection(self.bounds);
        if clip.is_empty() {
            return Vec::new();
        }
        let col0 = ((clip.left() - self.bounds.left()) / self.page_size).max(0) as usize;
        let col1 =
            (((clip.right() - self.bounds.left()) / self.page_size) as usize).min(self.cols - 1);
        let row0 = ((clip.bot() - self.bounds.bot()) / self.page_size).max(0) as usize;
        let row1 =
            (((clip.top() - self.bounds.bot()) / self.page_size) as usize).min(self.rows - 1);
        let mut out = Vec::new();
        for row in row0..=row1 {
            for col in col0..=col1 {
                out.push(row * self.cols + col);
            }
        }
        out
    }

    /// Invalidates every page intersecting `region`, returning the drill
    /// keys that were cached there so the caller can drop them from the
    /// graph.
    pub fn invalidate_region(&mut self, region: Rect) -> Vec<DrillKey> {
        let mut dropped = Vec::new();
        for idx in self.pages_overlapping(region) {
            if let Some(drills) = self.pages[idx].drills.take() {
                dropped.extend(drills);
            }
        }
        dropped
    }

    /// Invalidates every page (net switch).
    pub fn invalidate_all(&mut self) {
        for page in &mut self.pages {
            page.drills = None;
        }
    }
}

/// Splits `region` minus the obstacle boxes into axis-aligned free cells by
/// recursive guillotine cuts. Cells smaller than `min_size` on either axis
/// are discarded.
pub fn free_cells(region: Rect, obstacles: &[Rect], min_size: i64) -> Vec<Rect> {
    let mut out = Vec::new();
    split_free(region, obstacles, min_size, &mut out, 0);
    out
}

fn split_free(region: Rect, obstacles: &[Rect], min_size: i64, out: &mut Vec<Rect>, depth: usize) {
    if region.width() < min_size || region.height() < min_size {
        return;
    }
    // Recursion is bounded by the obstacle count; the depth cap guards
    // against pathological overlap patterns.
    if depth > 64 {
        return;
    }
    let Some(hit) = obstacles.iter().find(|o| {
        let i = o.intersection(region);
        i.dimension() == 2
    }) else {
        out.push(region);
        return;
    };
    let hole = hit.intersection(region);
    // Guillotine split around the hole: left, right, bottom, top strips.
    let strips = [
        Rect::from_sides(region.left(), region.bot(), hole.left(), region.top()),
        Rect::from_sides(hole.right(), region.bot(), region.right(), region.top()),
        Rect::from_sides(hole.left(), region.bot(), hole.right(), hole.bot()),
        Rect::from_sides(hole.left(), hole.top(), hole.right(), region.top()),
    ];
    for strip in strips {
        if strip.dimension() == 2 {
            split_free(strip, obstacles, min_size, out, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_bounds() {
        let pages = DrillPages::new(Rect::from_sides(0, 0, 120_000, 60_000), 50_000);
        assert_eq!(pages.len(), 3 * 2);
        let hits = pages.pages_overlapping(Rect::from_sides(40_000, 0, 60_000, 10_000));
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn invalidation_drops_cached_drills() {
        let mut pages = DrillPages::new(Rect::from_sides(0, 0, 100_000, 100_000), 50_000);
        let idx = pages.pages_overlapping(Rect::from_point(Point::new(1, 1)))[0];
        pages.page_mut(idx).drills = Some(Vec::new());
        assert!(pages.page(idx).drills.is_some());
        pages.invalidate_region(Rect::from_sides(0, 0, 10, 10));
        assert!(pages.page(idx).drills.is_none());
    }

    #[test]
    fn free_cells_avoid_obstacles() {
        let region = Rect::from_sides(0, 0, 10_000, 10_000);
        let obstacle = Rect::from_sides(4_000, 4_000, 6_000, 6_000);
        let cells = free_cells(region, &[obstacle], 500);
        assert!(!cells.is_empty());
        for cell in &cells {
            assert!(cell.intersection(obstacle).dimension() < 2);
        }
        // The free cells cover the area around the obstacle.
        let covered: i64 = cells.iter().map(|c| c.area()).sum();
        assert_eq!(covered, region.area() - obstacle.area());
    }

    #[test]
    fn unobstructed_region_is_one_cell() {
        let region = Rect::from_sides(0, 0, 5_000, 5_000);
        assert_eq!(free_cells(region, &[], 500), vec![region]);
    }
}
