// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use drv_intel_dpll::limits::DividerLimits;
use drv_intel_dpll::{solve, DividerValues};
use drv_intel_gfx_api::{DpllError, Generation, HardwareProfile, LinkKind};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

const CLASSIC: [Generation; 7] = [
    Generation::I85x,
    Generation::I9xx,
    Generation::Pineview,
    Generation::G4x,
    Generation::Ironlake,
    Generation::SandyBridge,
    Generation::IvyBridge,
];

const LINKS: [LinkKind; 5] = [
    LinkKind::LvdsSingle,
    LinkKind::LvdsDual,
    LinkKind::Analog,
    LinkKind::DisplayPort,
    LinkKind::Hdmi,
];

fn classic_case() -> impl Strategy<Value = (Generation, LinkKind, u32)> {
    (
        proptest::sample::select(CLASSIC.to_vec()),
        proptest::sample::select(LINKS.to_vec()),
    )
        .prop_flat_map(|(g, l)| {
            let p = HardwareProfile::for_generation(g);
            (Just(g), Just(l), p.min_synth_khz..=p.max_synth_khz)
        })
}

fn check_classic(
    generation: Generation,
    link: LinkKind,
    khz: u32,
) -> Result<(), TestCaseError> {
    let profile = HardwareProfile::for_generation(generation);
    let limits = DividerLimits::for_link(generation, link).unwrap();
    let set = match solve(khz, &profile, link) {
        Ok(DividerValues::Classic(set)) => set,
        Ok(other) => {
            return Err(TestCaseError::fail(format!(
                "classic generation produced {other:?}"
            )));
        }
        Err(e) => {
            prop_assert!(
                e == DpllError::NoSolution || e == DpllError::SearchExhausted,
                "unexpected error {e:?}"
            );
            return Ok(());
        }
    };

    prop_assert!(limits.n.contains(set.n), "n out of range: {set:?}");
    prop_assert!(limits.m1.contains(set.m1), "m1 out of range: {set:?}");
    prop_assert!(limits.m2.contains(set.m2), "m2 out of range: {set:?}");
    prop_assert!(limits.p1.contains(set.p1), "p1 out of range: {set:?}");
    prop_assert!(limits.m.contains(set.m), "m out of range: {set:?}");
    prop_assert!(limits.p.contains(set.p), "p out of range: {set:?}");
    prop_assert_eq!(set.p, set.p1 * set.p2);
    if generation == Generation::Pineview {
        prop_assert_eq!(set.m, set.m2);
    } else {
        prop_assert_eq!(set.m, 5 * set.m1 + set.m2);
    }
    prop_assert_eq!((set.p2, set.post2_high), limits.post_divider(khz, link));

    let vco = set.vco_khz(profile.reference_khz);
    prop_assert!(limits.vco.contains(vco), "vco {vco} out of range");
    prop_assert!(profile.can_synthesize(set.synth_khz(profile.reference_khz)));
    Ok(())
}

#[test]
fn classic_failures_are_rare() {
    // A 5 MHz sweep over each profile's range only misses at the edges of
    // what a link's dividers can reach.
    for generation in CLASSIC {
        let profile = HardwareProfile::for_generation(generation);
        for link in LINKS {
            let mut tried = 0;
            let mut failed = 0;
            for khz in (profile.min_synth_khz..=profile.max_synth_khz)
                .step_by(5_000)
            {
                tried += 1;
                if solve(khz, &profile, link).is_err() {
                    failed += 1;
                }
            }
            assert!(
                failed <= 3,
                "{generation:?}/{link:?}: {failed} of {tried} targets failed"
            );
        }
    }
}

proptest! {
    #[test]
    fn classic_dividers_respect_limits((g, l, khz) in classic_case()) {
        check_classic(g, l, khz)?;
    }

    #[test]
    // Above 480 MHz even p = 2 pushes the VCO past its limit; only the
    // 540 MHz LCPLL passthrough lives up there.
    fn wrpll_always_finds_dividers(khz in 25_000u32..=480_000) {
        let profile = HardwareProfile::for_generation(Generation::Haswell);
        let v = solve(khz, &profile, LinkKind::Hdmi);
        let Ok(DividerValues::Wrpll(w)) = v else {
            return Err(TestCaseError::fail(format!("{khz} kHz gave {v:?}")));
        };
        prop_assert!(w.p % 2 == 0 && (2..=64).contains(&w.p));
        prop_assert!(w.r2 > 13 && w.r2 <= 112);
        prop_assert!(2400 * w.r2 < 2700 * w.n2);
        prop_assert!(2700 * w.n2 <= 4800 * w.r2);
        // No budget is looser than 5000 ppm.
        let out = u64::from(w.output_khz());
        let khz = u64::from(khz);
        prop_assert!(out.abs_diff(khz) * 1000 <= khz * 6);
    }

    #[test]
    fn wrpll_covers_top_of_range(khz in 480_001u32..=540_000) {
        let profile = HardwareProfile::for_generation(Generation::Haswell);
        let v = solve(khz, &profile, LinkKind::Hdmi);
        prop_assert!(
            matches!(v, Ok(DividerValues::Wrpll(_))),
            "{} kHz gave {:?}",
            khz,
            v
        );
    }

    #[test]
    fn skylake_dco_stays_near_centre(khz in 25_000u32..=594_000) {
        let profile = HardwareProfile::for_generation(Generation::Skylake);
        match solve(khz, &profile, LinkKind::Hdmi) {
            Ok(DividerValues::Skl(s)) => {
                let afe_khz = u64::from(khz) * 5;
                let dco = u64::from(s.dco_khz);
                prop_assert_eq!(dco, afe_khz * u64::from(s.divider()));
                let centre = u64::from(s.central_mhz) * 1000;
                // +1% / -6% of the centre, in units of 0.01%.
                if dco >= centre {
                    let dev = (dco - centre) * 10_000;
                    prop_assert!(dev < 100 * centre + centre);
                } else {
                    let dev = (centre - dco) * 10_000;
                    prop_assert!(dev < 600 * centre + centre);
                }
                prop_assert!([8400, 9000, 9600].contains(&s.central_mhz));
            }
            Ok(other) => {
                return Err(TestCaseError::fail(format!("{other:?}")));
            }
            Err(e) => prop_assert_eq!(e, DpllError::NoSolution),
        }
    }

    #[test]
    fn tigerlake_dco_in_band(khz in 25_000u32..=594_000) {
        let profile = HardwareProfile::for_generation(Generation::TigerLake);
        match solve(khz, &profile, LinkKind::Hdmi) {
            Ok(DividerValues::Tgl(t)) => {
                prop_assert!((7_998_000..=10_000_000).contains(&t.dco_khz));
                prop_assert_eq!(
                    u64::from(t.dco_khz),
                    u64::from(khz) * 5 * u64::from(t.divider())
                );
                prop_assert!([2, 3, 5, 7].contains(&t.pdiv));
                prop_assert!([1, 2, 3].contains(&t.kdiv));
            }
            Ok(other) => {
                return Err(TestCaseError::fail(format!("{other:?}")));
            }
            Err(e) => prop_assert_eq!(e, DpllError::NoSolution),
        }
    }

    #[test]
    fn solving_is_deterministic(
        (g, l, khz) in classic_case(),
    ) {
        let profile = HardwareProfile::for_generation(g);
        prop_assert_eq!(solve(khz, &profile, l), solve(khz, &profile, l));
    }
}
