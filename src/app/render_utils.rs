use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};
use genenet::util::parse_hex_color;

pub(super) const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
pub(super) const MATCH_COLOR: Color32 = Color32::from_rgb(103, 196, 255);
pub(super) const HUB_RING_COLOR: Color32 = Color32::from_rgb(241, 146, 94);

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Node and edge colours are stored as hex strings on the graph.
pub(super) fn stored_color(text: &str, fallback: Color32) -> Color32 {
    parse_hex_color(text).unwrap_or(fallback)
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(246, 247, 249));

    let step = (64.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(180, 188, 196, 60));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Cheap bounding-box test; long edges crossing the view diagonally are kept.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    Rect::from_two_pos(start, end)
        .expand(padding)
        .intersects(rect)
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

/// Pan and zoom that fit every point into `rect` with a margin.
pub(super) fn fit_view(rect: Rect, points: impl Iterator<Item = Vec2>) -> Option<(Vec2, f32)> {
    let mut bounds = Rect::NOTHING;
    for point in points {
        bounds.extend_with(point.to_pos2());
    }
    if bounds.width() < 0.0 {
        return None;
    }

    let span = bounds.size().max(Vec2::splat(1.0));
    let zoom = ((rect.width() / span.x).min(rect.height() / span.y) * 0.85).clamp(0.05, 6.0);
    let pan = -bounds.center().to_vec2() * zoom;
    Some((pan, zoom))
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn screen_and_world_round_trip() {
        let rect = Rect::from_min_size(pos2(10.0, 20.0), vec2(800.0, 600.0));
        let pan = vec2(30.0, -15.0);
        let world = vec2(120.0, -40.0);
        let screen = world_to_screen(rect, pan, 1.7, world);
        let back = screen_to_world(rect, pan, 1.7, screen);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn fit_view_centres_the_points() {
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(400.0, 400.0));
        let (pan, zoom) =
            fit_view(rect, [vec2(100.0, 100.0), vec2(300.0, 300.0)].into_iter()).expect("bounds");
        let centre = world_to_screen(rect, pan, zoom, vec2(200.0, 200.0));
        assert!((centre - rect.center()).length() < 1e-3);
        assert!(fit_view(rect, std::iter::empty()).is_none());
    }
}
