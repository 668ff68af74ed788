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

//! Orion, an LX2160A board with soldered-down DDR4.

use crate::board::{Board, DimmResolution};
use crate::ddr::{DriverImpedance, MemctlOpts, WarmBoot};
use crate::dimm::{BurstLengths, CasLatencies, DimmParams, DqMap, EdcConfig};

const DDRC_BASE: [u64; 2] = [0x0108_0000, 0x0109_0000];
const DDR_PHY_BASE: [u64; 2] = [0x0140_0000, 0x0160_0000];
const CCN_HNF_BASE: u64 = 0x0420_0000;
const FW_IMAGE_BUF: u64 = 0x1800_0000;
const SPD_ADDRS: [u8; 1] = [0x51];
const DIMM_SLOTS_PER_CTLR: usize = 1;

pub struct Orion {
    povdd: bool,
    resolution: DimmResolution,
}

impl Orion {
    pub fn new(povdd: bool) -> Self {
        // Only the first controller is populated on revision 0.1.
        let populated: Box<[DimmParams]> = Box::new([fixed_dimm()]);
        let unpopulated: Box<[DimmParams]> = Box::new([]);
        Orion {
            povdd,
            resolution: DimmResolution::Static(Box::new([populated, unpopulated])),
        }
    }
}

/// Revision 0.1 memory-down configuration: 9 x Micron MT40A1G8SA-062E:R,
/// single rank, 8 GiB with an 8-bit ECC extension, DDR4-3200 22-22-22.
pub fn fixed_dimm() -> DimmParams {
    DimmParams {
        part: "Fixed DDR Config 1".into(),
        ranks: 1,
        die_density: 0x5, // 8 Gbit
        rank_density: 0x2_0000_0000,
        capacity: 0x2_0000_0000,
        primary_bus_width: 64,
        ecc_width: 8,
        device_width: 8,
        registered: false,
        package_3ds: false,
        mirrored: false,
        raw_card: 0,
        row_addr_bits: 16,
        col_addr_bits: 10,
        bank_addr_bits: 0, // 4 banks
        bank_group_bits: 2, // 4 bank groups
        edc_config: EdcConfig::Ecc,
        burst_lengths: BurstLengths::BL4 | BurstLengths::BL8,
        // TODO: confirm the supported CL set against the 062E speed
        // grade table.
        cas_latencies: CasLatencies::from_mask(
            0b0000_0001_0111_1111_1111_1100_0000_0000, // CL 10-22, 24
        ),
        mtb_ps: 125,
        ftb_10th_ps: 10,
        taa_ps: 13_750,
        tfaw_ps: 21_000, // max(21 ns, 20 CK); 1 KB pages
        tckmin_ps: 625,
        tckmax_ps: 1_250,
        trcd_ps: 13_750,
        trp_ps: 13_750,
        tras_ps: 32_000,
        trc_ps: 45_750, // tRAS + tRP
        twr_ps: 15_000,
        trfc1_ps: 350_000,
        trfc2_ps: 260_000,
        trfc4_ps: 160_000,
        trfc_slr_ps: 0,
        trrds_ps: 2_500, // max(4 CK, 2.5 ns); TODO: check against the datasheet
        trrdl_ps: 4_900, // max(4 CK, 4.9 ns)
        tccdl_ps: 5_000, // max(4 CK, 5 ns)
        // TODO: pick the refresh range from the measured temperature.
        refresh_rate_ps: 7_800_000, // 1x mode, standard temperature range
        // SPD bytes 60 to 77: DQ[0:31] nibbles, the ECC check bits,
        // then DQ[32:63].
        dq_mapping: Box::new([
            DqMap::new(0x01), DqMap::new(0x21), // DQ[0:7]
            DqMap::new(0x01), DqMap::new(0x21), // DQ[8:15]
            DqMap::new(0x01), DqMap::new(0x21), // DQ[16:23]
            DqMap::new(0x01), DqMap::new(0x21), // DQ[24:31]
            DqMap::new(0x01), DqMap::new(0x21), // ECC[0:7]
            DqMap::new(0x01), DqMap::new(0x21), // DQ[32:39]
            DqMap::new(0x01), DqMap::new(0x21), // DQ[40:47]
            DqMap::new(0x01), DqMap::new(0x21), // DQ[48:55]
            DqMap::new(0x01), DqMap::new(0x21), // DQ[56:63]
        ]),
        dq_mapping_ors: false,
    }
}

impl Board for Orion {
    fn num_ctlrs(&self) -> usize {
        DDRC_BASE.len()
    }

    fn ctlr_base(&self, ctlr: usize) -> u64 {
        DDRC_BASE[ctlr]
    }

    fn phy_base(&self, ctlr: usize) -> u64 {
        DDR_PHY_BASE[ctlr]
    }

    fn spd_addrs(&self) -> &[u8] {
        &SPD_ADDRS
    }

    fn dimm_slots_per_ctlr(&self) -> usize {
        DIMM_SLOTS_PER_CTLR
    }

    fn warm_boot(&self) -> WarmBoot {
        WarmBoot::NotSupported
    }

    fn fw_image_buf(&self) -> u64 {
        FW_IMAGE_BUF
    }

    fn ccn_hnf_base(&self) -> Option<u64> {
        Some(CCN_HNF_BASE)
    }

    fn dimm_resolution(&self) -> &DimmResolution {
        &self.resolution
    }

    fn memctl_opts(&self) -> MemctlOpts {
        MemctlOpts {
            caslat_override: None,
            addt_lat_override: None,
            auto_self_refresh_en: true,
            output_driver_impedance: DriverImpedance::Ohm34,
            twot_en: false,
            threet_en: false,
            phy_atx_impedance: 30,
            phy_tx_impedance: 28,
            vref_dimm: 0x19, // range 1, 83.4%
            vref_phy: 0x5d,  // 72%
            odt: 60,
            rtt_override: None,
            rtt_park: 120,
            otf_burst_chop_en: false,
            burst_length: BurstLengths::BL8,
            trwt_override: true,
            trwt: 0x3,
            twrt: 0x3,
            trrt: 0x3,
            twwt: 0x3,
            addr_hash: true,
            bstopre: 0, // auto precharge
            skip2d: false,
        }
    }

    // TODO: sequence the rail once the rail control is wired up; both
    // hooks only report the configuration gate for now.
    fn enable_povdd(&self) -> bool {
        self.povdd
    }

    fn disable_povdd(&self) -> bool {
        self.povdd
    }
}
