// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use float_ord::FloatOrd;

/// A `Vec3` with a total order, so positions can be used as map keys. Two
/// positions compare equal only when they are bit-for-bit the same value
/// (with `-0.0 == 0.0`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Vec3Ord([FloatOrd<f32>; 3]);

pub trait ToOrd<T>
where
    T: Eq + PartialEq + Ord + PartialOrd + std::hash::Hash + Copy,
{
    fn to_ord(&self) -> T;
}

impl ToOrd<Vec3Ord> for glam::Vec3 {
    fn to_ord(&self) -> Vec3Ord {
        // FloatOrd distinguishes the two zeroes, positions should not.
        let fix = |x: f32| if x == 0.0 { 0.0 } else { x };
        Vec3Ord([FloatOrd(fix(self.x)), FloatOrd(fix(self.y)), FloatOrd(fix(self.z))])
    }
}

/// Rounds every component of `v` to `decimals` decimal places.
pub fn round_vec3(v: glam::Vec3, decimals: i32) -> glam::Vec3 {
    let factor = 10f32.powi(decimals);
    (v * factor).round() / factor
}

#[cfg(test)]
mod test {
    use super::*;
    use glam::Vec3;

    #[test]
    fn signed_zeroes_hash_equal() {
        assert_eq!(
            Vec3::new(0.0, 1.0, 2.0).to_ord(),
            Vec3::new(-0.0, 1.0, 2.0).to_ord()
        );
        assert_ne!(
            Vec3::new(0.0, 1.0, 2.0).to_ord(),
            Vec3::new(0.0, 1.0, 2.000001).to_ord()
        );
    }

    #[test]
    fn rounding() {
        let v = round_vec3(Vec3::new(1.23456, -0.00004, 2.0), 4);
        assert!((v.x - 1.2346).abs() < 1e-6);
        assert_eq!(v.y, 0.0);
        assert_eq!(v.z, 2.0);
    }
}
