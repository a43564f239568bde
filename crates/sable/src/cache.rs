//! Pooled storage for flattened paths.

use crate::math::Bounds;
use crate::path::{Path, PointFlags};
use crate::style::Winding;
use glam::Vec2;

/// Per-frame flattened geometry, with a pool so steady-state frames do not
/// allocate.
///
/// The cache is cleared when path recording restarts; while it holds paths,
/// flattening is skipped entirely, which is what lets one recorded path be
/// both filled and stroked without re-tessellating.
#[derive(Debug, Default)]
pub struct PathCache {
    pub(crate) paths: Vec<Path>,
    pool: Vec<Path>,
    pub(crate) bounds: Bounds,
}

impl PathCache {
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            pool: Vec::new(),
            bounds: Bounds::NONE,
        }
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Bounds over every flattened point, valid after flattening.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Recycles all paths into the pool.
    pub(crate) fn clear(&mut self) {
        for mut p in self.paths.drain(..) {
            p.recycle();
            self.pool.push(p);
        }
        self.bounds = Bounds::NONE;
    }

    /// Starts a new sub-path, reusing a pooled allocation when available.
    pub(crate) fn add_path(&mut self) {
        let path = self.pool.pop().unwrap_or_else(Path::new);
        self.paths.push(path);
    }

    /// Appends a point to the current sub-path. Ignored when no sub-path has
    /// been started.
    pub(crate) fn add_point(&mut self, pos: Vec2, flags: PointFlags, dist_tol: f32) {
        if let Some(path) = self.paths.last_mut() {
            path.add_point(pos, flags, dist_tol);
        }
    }

    pub(crate) fn last_point(&self) -> Option<Vec2> {
        self.paths.last()?.points.last().map(|p| p.pos)
    }

    pub(crate) fn close_last(&mut self) {
        if let Some(path) = self.paths.last_mut() {
            path.closed = true;
        }
    }

    pub(crate) fn set_winding(&mut self, winding: Winding) {
        if let Some(path) = self.paths.last_mut() {
            path.winding = winding;
        }
    }

    /// Post-flattening pass: fix up every sub-path and drop those that ended
    /// up with fewer than two points, which the expanders cannot use.
    pub(crate) fn finish(&mut self, dist_tol: f32) {
        self.bounds = Bounds::NONE;
        let mut i = 0;
        while i < self.paths.len() {
            self.paths[i].finish(dist_tol, &mut self.bounds);
            if self.paths[i].points.len() < 2 {
                let mut p = self.paths.remove(i);
                p.recycle();
                self.pool.push(p);
            } else {
                i += 1;
            }
        }
    }
}
