use crate::config::{IntersectionConfig, MAX_NEWTON_ITERATIONS};
use crate::geometry::BezierPatch;
use crate::math::{Matrix3, Point3};

use super::segment::PointInfo;

/// Newton-Raphson refinement of one assembled curve point.
///
/// One of the four surface parameters stays pinned so the 3-unknown system
/// `A(au, av) - B(bu, bv) = 0` is square. A failed solve retries with the
/// pinned parameter's partner on the same surface; if that also fails, or
/// the refined point would move against the chain direction in either
/// parameter plane, the point is returned unchanged.
#[must_use]
pub fn refine_point(
    pi: &PointInfo,
    prev: Option<&PointInfo>,
    next: Option<&PointInfo>,
    patch_a: &BezierPatch,
    patch_b: &BezierPatch,
    config: &IntersectionConfig,
) -> PointInfo {
    let params = [pi.au, pi.av, pi.bu, pi.bv];
    let pinned = choose_pinned_parameter(pi, prev, next);

    let solved = newton_solve(params, pinned, patch_a, patch_b, config).or_else(|| {
        newton_solve(params, partner_parameter(pinned), patch_a, patch_b, config)
    });
    let Some(x) = solved else {
        return *pi;
    };

    let (Ok(pa), Ok(pb)) = (
        patch_a.coordinates(x[0], x[1]),
        patch_b.coordinates(x[2], x[3]),
    ) else {
        return *pi;
    };
    let point = Point3::from(pa.coords.lerp(&pb.coords, 0.5));
    let refined = PointInfo::new(point, x[0], x[1], x[2], x[3], patch_a, patch_b, config);

    for neighbor in [prev, next].into_iter().flatten() {
        if !advances_past(&refined, pi, neighbor) {
            return *pi;
        }
    }
    refined
}

/// Picks the parameter index to pin: a parameter sitting on its boundary
/// first, otherwise the one that moved furthest from the previous chain
/// point (the curve's dominant direction locally).
fn choose_pinned_parameter(
    pi: &PointInfo,
    prev: Option<&PointInfo>,
    next: Option<&PointInfo>,
) -> usize {
    let params = [pi.au, pi.av, pi.bu, pi.bv];
    let tols = [pi.tol_au, pi.tol_av, pi.tol_bu, pi.tol_bv];
    for k in 0..4 {
        if params[k] <= tols[k] || params[k] >= 1.0 - tols[k] {
            return k;
        }
    }

    let reference = prev.or(next);
    let Some(reference) = reference else {
        return 0;
    };
    let gaps = [
        (pi.au - reference.au).abs(),
        (pi.av - reference.av).abs(),
        (pi.bu - reference.bu).abs(),
        (pi.bv - reference.bv).abs(),
    ];
    (0..4)
        .max_by(|&i, &j| gaps[i].total_cmp(&gaps[j]))
        .unwrap_or(0)
}

/// The other parameter of the same surface.
fn partner_parameter(pinned: usize) -> usize {
    match pinned {
        0 => 1,
        1 => 0,
        2 => 3,
        _ => 2,
    }
}

fn newton_solve(
    params: [f64; 4],
    pinned: usize,
    patch_a: &BezierPatch,
    patch_b: &BezierPatch,
    config: &IntersectionConfig,
) -> Option<[f64; 4]> {
    let mut free = [0_usize; 3];
    let mut w = 0;
    for k in 0..4 {
        if k != pinned {
            free[w] = k;
            w += 1;
        }
    }

    let mut x = params;
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let pa = patch_a.coordinates(x[0], x[1]).ok()?;
        let pb = patch_b.coordinates(x[2], x[3]).ok()?;
        let residual = pa - pb;
        if residual.norm() <= config.distance_tolerance {
            return Some(x);
        }

        let (a_du, a_dv) = patch_a.tangent_vectors(x[0], x[1]).ok()?;
        let (b_du, b_dv) = patch_b.tangent_vectors(x[2], x[3]).ok()?;
        let columns = [a_du, a_dv, -b_du, -b_dv];
        let jacobian =
            Matrix3::from_columns(&[columns[free[0]], columns[free[1]], columns[free[2]]]);
        let delta = jacobian.lu().solve(&residual)?;
        for (slot, &k) in free.iter().enumerate() {
            x[k] = (x[k] - delta[slot]).clamp(0.0, 1.0);
        }
    }

    let pa = patch_a.coordinates(x[0], x[1]).ok()?;
    let pb = patch_b.coordinates(x[2], x[3]).ok()?;
    ((pa - pb).norm() <= config.distance_tolerance).then_some(x)
}

/// Whether `refined` still lies on the far side of `neighbor` as seen from
/// the unrefined point, in both parameter planes.
fn advances_past(refined: &PointInfo, original: &PointInfo, neighbor: &PointInfo) -> bool {
    let a = (refined.params_a() - neighbor.params_a())
        .dot(&(original.params_a() - neighbor.params_a()));
    let b = (refined.params_b() - neighbor.params_b())
        .dot(&(original.params_b() - neighbor.params_b()));
    a >= 0.0 && b >= 0.0
}
