// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use assert_matches::assert_matches;
use rstest::rstest;

use crate::dimm::{
    BurstLengths, CasLatencies, DimmParams, DqMap, EdcConfig, Error, MIN_CAS_LATENCY,
};

/// Single-rank 4 GiB x8 module on a 64-bit bus without ECC.
fn sample() -> DimmParams {
    DimmParams {
        part: "test module".into(),
        ranks: 1,
        die_density: 0x4,
        rank_density: 0x1_0000_0000,
        capacity: 0x1_0000_0000,
        primary_bus_width: 64,
        ecc_width: 0,
        device_width: 8,
        registered: false,
        package_3ds: false,
        mirrored: false,
        raw_card: 0,
        row_addr_bits: 15,
        col_addr_bits: 10,
        bank_addr_bits: 0,
        bank_group_bits: 2,
        edc_config: EdcConfig::None,
        burst_lengths: BurstLengths::BL8,
        cas_latencies: CasLatencies::from_mask(0x7fc00), // CL 10-18
        mtb_ps: 125,
        ftb_10th_ps: 10,
        taa_ps: 13_750,
        tfaw_ps: 21_000,
        tckmin_ps: 833,
        tckmax_ps: 1_600,
        trcd_ps: 13_750,
        trp_ps: 13_750,
        tras_ps: 32_000,
        trc_ps: 45_750,
        twr_ps: 15_000,
        trfc1_ps: 260_000,
        trfc2_ps: 160_000,
        trfc4_ps: 110_000,
        trfc_slr_ps: 0,
        trrds_ps: 3_300,
        trrdl_ps: 4_900,
        tccdl_ps: 5_000,
        refresh_rate_ps: 7_800_000,
        dq_mapping: vec![DqMap::new(0x01); 16].into_boxed_slice(),
        dq_mapping_ors: false,
    }
}

#[test]
fn test_validate_ok() {
    sample().validate().unwrap();
}

#[test]
fn test_validate_capacity() {
    let mut dimm = sample();
    dimm.capacity = 0x8000_0000;
    assert_matches!(
        dimm.validate(),
        Err(Error::Capacity {
            capacity: 0x8000_0000,
            rank_density: 0x1_0000_0000,
            ranks: 1,
        })
    );

    // Two ranks of the same density double the capacity.
    let mut dimm = sample();
    dimm.ranks = 2;
    dimm.capacity = 2 * dimm.rank_density;
    dimm.validate().unwrap();
}

#[rstest]
#[case::taa(|d: &mut DimmParams| d.taa_ps = 0, "taa_ps")]
#[case::trfc1(|d: &mut DimmParams| d.trfc1_ps = 0, "trfc1_ps")]
#[case::refresh(|d: &mut DimmParams| d.refresh_rate_ps = 0, "refresh_rate_ps")]
#[case::slr(
    |d: &mut DimmParams| d.package_3ds = true,
    "trfc_slr_ps"
)]
fn test_validate_zero_timing(#[case] corrupt: fn(&mut DimmParams), #[case] name: &str) {
    let mut dimm = sample();
    corrupt(&mut dimm);
    assert_matches!(dimm.validate(), Err(Error::ZeroTiming { name: n }) if n == name);
}

#[test]
fn test_validate_cas_latencies() {
    let mut dimm = sample();
    dimm.cas_latencies = CasLatencies::from_mask(0);
    assert_matches!(dimm.validate(), Err(Error::NoCasLatencies));

    let mut dimm = sample();
    dimm.cas_latencies = CasLatencies::from_mask(1 << (MIN_CAS_LATENCY - 1));
    assert_matches!(
        dimm.validate(),
        Err(Error::CasLatencyTooLow { lowest: 8, min: 9 })
    );
}

#[test]
fn test_validate_dq_map_length() {
    let mut dimm = sample();
    dimm.dq_mapping = vec![DqMap::new(0x01); 15].into_boxed_slice();
    assert_matches!(
        dimm.validate(),
        Err(Error::DqMapLength { got: 15, need: 16 })
    );

    // ECC extension widens the map requirement.
    let mut dimm = sample();
    dimm.ecc_width = 8;
    assert_matches!(
        dimm.validate(),
        Err(Error::DqMapLength { got: 16, need: 18 })
    );
}

#[test]
fn test_caslat_decode() {
    // CL 10-22 plus 24, as one contiguous run and one extra bit.
    let cl = CasLatencies::from_mask(0b0000_0001_0111_1111_1111_1100_0000_0000);
    assert_eq!(cl.lowest(), Some(10));
    assert_eq!(cl.highest(), Some(24));
    assert!(cl.supports(22));
    assert!(!cl.supports(23));
    assert!(cl.supports(24));
    let decoded: Vec<u32> = cl.iter().collect();
    assert_eq!(
        decoded,
        [10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 24]
    );
}

#[test]
fn test_caslat_encode() {
    let cls: Vec<u32> = (10..=22).chain([24]).collect();
    let encoded = CasLatencies::from_latencies(&cls).unwrap();
    assert_eq!(encoded.mask(), 0b0000_0001_0111_1111_1111_1100_0000_0000);

    assert_matches!(
        CasLatencies::from_latencies(&[10, 32]),
        Err(Error::CasLatencyRange { cl: 32 })
    );
}

#[test]
fn test_caslat_empty() {
    let none = CasLatencies::from_mask(0);
    assert_eq!(none.lowest(), None);
    assert_eq!(none.highest(), None);
    assert_eq!(none.iter().count(), 0);
}

#[test]
fn test_burst_lengths_encoding() {
    assert_eq!(BurstLengths::BL4.bits(), 0x4);
    assert_eq!(BurstLengths::BL8.bits(), 0x8);
    assert_eq!((BurstLengths::BL4 | BurstLengths::BL8).bits(), 0xc);
}

#[rstest]
#[case(0x01, false, 1, 0)]
#[case(0x21, true, 1, 0)]
#[case(0x0c, false, 12, 0)]
#[case(0x2c, true, 12, 0)]
#[case(0x6c, true, 12, 1)]
fn test_dq_map_decode(
    #[case] raw: u8,
    #[case] upper: bool,
    #[case] order: u8,
    #[case] rank_map: u8,
) {
    let map = DqMap::new(raw);
    assert_eq!(map.raw(), raw);
    assert_eq!(map.upper_nibble(), upper);
    assert_eq!(map.bit_order(), order);
    assert_eq!(map.package_rank_map(), rank_map);
}

#[test]
fn test_geometry_helpers() {
    let dimm = sample();
    assert_eq!(dimm.banks_per_group(), 4);
    assert_eq!(dimm.bank_groups(), 4);
    assert_eq!(dimm.die_density_mbits(), Some(4096));

    let mut dense = sample();
    dense.die_density = 0x5;
    assert_eq!(dense.die_density_mbits(), Some(8192));
    dense.die_density = 0x9;
    assert_eq!(dense.die_density_mbits(), None);
}

#[test]
fn test_edc_config() {
    assert!(EdcConfig::Ecc.ecc_en());
    assert!(!EdcConfig::None.ecc_en());
    assert!(!EdcConfig::Parity.ecc_en());
}
