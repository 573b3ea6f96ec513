//! Arc projection: maps a tile's horizontal offset onto the circle whose
//! chord spans the viewport with sagitta `bend`.

/// Vertical displacement and rotation for one tile at horizontal offset `x`.
///
/// `bend == 0` is the flat strip: no displacement, no rotation. Otherwise the
/// circle radius follows from the chord/sagitta relation
/// `R = (half_width^2 + bend^2) / (2 * bend)`, and the tile drops (or rises,
/// for negative bend) by the arc height at its clamped offset. Offsets beyond
/// the viewport edge are clamped so off-screen tiles do not overshoot the arc.
pub fn project(x: f32, bend: f32, half_width: f32) -> (f32, f32) {
    if bend == 0.0 {
        return (0.0, 0.0);
    }
    let b = bend.abs();
    let radius = (half_width * half_width + b * b) / (2.0 * b);
    let effective_x = x.abs().min(half_width);
    // Rounding can push either argument a hair out of domain.
    let arc = radius - (radius * radius - effective_x * effective_x).max(0.0).sqrt();
    let angle = (effective_x / radius).clamp(-1.0, 1.0).asin();
    if bend > 0.0 {
        (-arc, -x.signum() * angle)
    } else {
        (arc, x.signum() * angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_bend_is_identity() {
        for x in [-500.0, -1.0, 0.0, 3.25, 9999.0] {
            assert_eq!(project(x, 0.0, 10.0), (0.0, 0.0));
        }
    }

    #[test]
    fn center_tile_is_undisplaced() {
        let (dy, rot) = project(0.0, 3.0, 10.0);
        assert!(dy.abs() < 1e-6);
        assert!(rot.abs() < 1e-6);
    }

    #[test]
    fn dy_is_even_and_rotation_is_odd() {
        for bend in [2.0, -2.0, 0.75] {
            for x in [0.5, 1.0, 4.0, 9.0] {
                let (dy_pos, rot_pos) = project(x, bend, 10.0);
                let (dy_neg, rot_neg) = project(-x, bend, 10.0);
                assert!((dy_pos - dy_neg).abs() < 1e-6, "dy not even at x={x}");
                assert!((rot_pos + rot_neg).abs() < 1e-6, "rotation not odd at x={x}");
            }
        }
    }

    #[test]
    fn positive_bend_dips_down_negative_arcs_up() {
        let (dy_pos, rot_pos) = project(4.0, 3.0, 10.0);
        assert!(dy_pos < 0.0);
        assert!(rot_pos < 0.0);
        let (dy_neg, rot_neg) = project(4.0, -3.0, 10.0);
        assert!((dy_neg + dy_pos).abs() < 1e-6);
        assert!((rot_neg + rot_pos).abs() < 1e-6);
    }

    #[test]
    fn offsets_beyond_the_edge_clamp_to_the_edge() {
        let at_edge = project(10.0, 3.0, 10.0);
        let past_edge = project(250.0, 3.0, 10.0);
        assert!((at_edge.0 - past_edge.0).abs() < 1e-6);
        assert!((at_edge.1 - past_edge.1).abs() < 1e-6);
    }

    #[test]
    fn edge_displacement_equals_the_sagitta() {
        // At the chord endpoint the arc height is exactly the configured bend.
        let (dy, _) = project(10.0, 3.0, 10.0);
        assert!((dy + 3.0).abs() < 1e-4);
    }
}
