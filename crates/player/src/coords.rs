//! Coordinate translation between map space and render space.
//!
//! The server speaks in authoritative coordinates: pixels of the reference map
//! image at its native resolution ([`Position`]). The presentation layer draws
//! the map scaled to whatever surface it has, and tokens are positioned by
//! their top-left corner in that surface ([`RenderPoint`]).
//!
//! Every translation takes the current [`Viewport`] explicitly. The scale is
//! derived from the viewport on each call, so a resize can never leave a
//! stale factor behind.

use battlemap_shared::Position;

/// Pixel dimensions of an image or surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A point in render space (pixels of the displayed map surface).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RenderPoint {
    pub x: i32,
    pub y: i32,
}

impl RenderPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Measured geometry of the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    native: Size,
    surface: Option<Size>,
    token_size: u32,
}

impl Viewport {
    /// A viewport whose surface has not been laid out yet.
    pub fn unmeasured(native: Size, token_size: u32) -> Self {
        Self {
            native,
            surface: None,
            token_size,
        }
    }

    pub fn measured(native: Size, surface: Size, token_size: u32) -> Self {
        let mut viewport = Self::unmeasured(native, token_size);
        viewport.resize(surface);
        viewport
    }

    /// Record a new surface measurement. A zero-sized surface counts as
    /// unmeasured. Returns whether the geometry changed.
    pub fn resize(&mut self, surface: Size) -> bool {
        let next = (!surface.is_empty()).then_some(surface);
        let changed = next != self.surface;
        self.surface = next;
        changed
    }

    pub fn surface(&self) -> Option<Size> {
        self.surface
    }

    pub fn is_measured(&self) -> bool {
        self.scale().is_some()
    }

    /// Per-axis (render, native) pairs, or `None` when translation is impossible.
    fn scale(&self) -> Option<Scale> {
        let surface = self.surface?;
        if self.native.is_empty() {
            return None;
        }
        Some(Scale {
            render: surface,
            native: self.native,
        })
    }

    /// Scale an authoritative point into render space.
    pub fn to_render(&self, pos: Position) -> RenderPoint {
        match self.scale() {
            Some(scale) => RenderPoint::new(
                scale_axis(pos.x, scale.render.width, scale.native.width),
                scale_axis(pos.y, scale.render.height, scale.native.height),
            ),
            None => {
                tracing::debug!(
                    x = pos.x,
                    y = pos.y,
                    "Map surface not measured yet; passing coordinate through unchanged"
                );
                RenderPoint::new(pos.x, pos.y)
            }
        }
    }

    /// Where a token's top-left corner goes so its center lands on `pos`.
    pub fn token_origin(&self, pos: Position) -> RenderPoint {
        if !self.is_measured() {
            return self.to_render(pos);
        }
        let half = self.half_token();
        let center = self.to_render(pos);
        RenderPoint::new(center.x.saturating_sub(half), center.y.saturating_sub(half))
    }

    /// Scale a render-space point back into authoritative space.
    pub fn to_authoritative(&self, point: RenderPoint) -> Position {
        match self.scale() {
            Some(scale) => Position::new(
                scale_axis(point.x, scale.native.width, scale.render.width),
                scale_axis(point.y, scale.native.height, scale.render.height),
            ),
            None => {
                tracing::debug!(
                    x = point.x,
                    y = point.y,
                    "Map surface not measured yet; passing coordinate through unchanged"
                );
                Position::new(point.x, point.y)
            }
        }
    }

    /// Inverse of [`Viewport::token_origin`].
    pub fn token_center_to_authoritative(&self, origin: RenderPoint) -> Position {
        if !self.is_measured() {
            return self.to_authoritative(origin);
        }
        let half = self.half_token();
        self.to_authoritative(RenderPoint::new(
            origin.x.saturating_add(half),
            origin.y.saturating_add(half),
        ))
    }

    fn half_token(&self) -> i32 {
        i32::try_from(self.token_size / 2).unwrap_or(i32::MAX)
    }
}

#[derive(Debug, Clone, Copy)]
struct Scale {
    render: Size,
    native: Size,
}

/// `floor(value * to / from)` in exact integer arithmetic.
fn scale_axis(value: i32, to: u32, from: u32) -> i32 {
    let scaled = (i64::from(value) * i64::from(to)).div_euclid(i64::from(from));
    i32::try_from(scaled).unwrap_or(if scaled < 0 { i32::MIN } else { i32::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map() -> Size {
        Size::new(1000, 683)
    }

    #[test]
    fn half_size_surface_halves_coordinates() {
        let vp = Viewport::measured(map(), Size::new(500, 341), 48);
        assert_eq!(vp.to_render(Position::new(400, 300)), RenderPoint::new(200, 149));
    }

    #[test]
    fn token_origin_centers_token_on_target() {
        let vp = Viewport::measured(map(), Size::new(1000, 683), 48);
        assert_eq!(
            vp.token_origin(Position::new(100, 100)),
            RenderPoint::new(76, 76)
        );
        assert_eq!(
            vp.token_center_to_authoritative(RenderPoint::new(76, 76)),
            Position::new(100, 100)
        );
    }

    #[test]
    fn unmeasured_surface_fails_open() {
        let vp = Viewport::unmeasured(map(), 48);
        assert!(!vp.is_measured());
        assert_eq!(vp.to_render(Position::new(12, 34)), RenderPoint::new(12, 34));
        assert_eq!(vp.token_origin(Position::new(12, 34)), RenderPoint::new(12, 34));
        assert_eq!(
            vp.to_authoritative(RenderPoint::new(56, 78)),
            Position::new(56, 78)
        );
    }

    #[test]
    fn zero_sized_surface_counts_as_unmeasured() {
        let mut vp = Viewport::measured(map(), Size::new(800, 600), 48);
        assert!(vp.resize(Size::new(0, 600)));
        assert!(!vp.is_measured());
        assert_eq!(vp.to_render(Position::new(5, 6)), RenderPoint::new(5, 6));
    }

    #[test]
    fn token_offsets_saturate_at_the_limits() {
        let vp = Viewport::measured(map(), Size::new(1000, 683), 48);
        assert_eq!(
            vp.token_origin(Position::new(i32::MIN, i32::MAX)),
            RenderPoint::new(i32::MIN, i32::MAX - 24)
        );
        assert_eq!(
            vp.token_center_to_authoritative(RenderPoint::new(i32::MAX, 0)).x,
            i32::MAX
        );
    }

    #[test]
    fn resize_recomputes_scale() {
        let mut vp = Viewport::measured(map(), Size::new(1000, 683), 0);
        assert_eq!(vp.to_render(Position::new(500, 300)), RenderPoint::new(500, 300));

        assert!(vp.resize(Size::new(2000, 1366)));
        assert_eq!(vp.to_render(Position::new(500, 300)), RenderPoint::new(1000, 600));

        assert!(!vp.resize(Size::new(2000, 1366)));
    }

    proptest! {
        #[test]
        fn round_trip_within_rounding_tolerance(
            native_w in 1u32..4000,
            native_h in 1u32..4000,
            render_w in 1u32..4000,
            render_h in 1u32..4000,
            fx in 0.0f64..1.0,
            fy in 0.0f64..1.0,
        ) {
            let vp = Viewport::measured(
                Size::new(native_w, native_h),
                Size::new(render_w, render_h),
                48,
            );
            let pos = Position::new(
                (fx * f64::from(native_w)) as i32,
                (fy * f64::from(native_h)) as i32,
            );
            let tol_x = native_w.div_ceil(render_w) as i32;
            let tol_y = native_h.div_ceil(render_h) as i32;

            let back = vp.to_authoritative(vp.to_render(pos));
            prop_assert!(back.x <= pos.x && pos.x - back.x <= tol_x);
            prop_assert!(back.y <= pos.y && pos.y - back.y <= tol_y);

            let back = vp.token_center_to_authoritative(vp.token_origin(pos));
            prop_assert!(back.x <= pos.x && pos.x - back.x <= tol_x);
            prop_assert!(back.y <= pos.y && pos.y - back.y <= tol_y);
        }

        #[test]
        fn unmeasured_translation_is_identity(x in -5000i32..5000, y in -5000i32..5000) {
            let vp = Viewport::unmeasured(Size::new(1000, 683), 48);
            prop_assert_eq!(vp.to_render(Position::new(x, y)), RenderPoint::new(x, y));
            prop_assert_eq!(vp.to_authoritative(RenderPoint::new(x, y)), Position::new(x, y));
        }
    }
}
