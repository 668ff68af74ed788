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

//! DDR4 module parameter model.
//!
//! Field semantics follow the JEDEC SPD encoding for DDR4 modules
//! (JESD21-C Annex L); the timing fields carry absolute picosecond
//! values already resolved from the SPD timebases.

use bitfield::bitfield;
use bitflags::bitflags;
use snafu::{Snafu, ensure};

#[derive(Debug, Snafu)]
#[snafu(module, context(suffix(false)))]
pub enum Error {
    #[snafu(display("Capacity {capacity:#x} does not match {ranks} ranks of {rank_density:#x}"))]
    Capacity {
        capacity: u64,
        rank_density: u64,
        ranks: u32,
    },
    #[snafu(display("{name} must be a positive duration"))]
    ZeroTiming { name: &'static str },
    #[snafu(display("Module supports no CAS latency"))]
    NoCasLatencies,
    #[snafu(display("Lowest supported CAS latency {lowest} is below the controller minimum {min}"))]
    CasLatencyTooLow { lowest: u32, min: u32 },
    #[snafu(display("CAS latency {cl} does not fit a 32-bit mask"))]
    CasLatencyRange { cl: u32 },
    #[snafu(display("{got} DQ mapping bytes cover {need} nibbles of data and ECC width"))]
    DqMapLength { got: usize, need: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Lowest CAS latency the controller can program. JESD79-4 defines no
/// DDR4 speed bin below CL 9.
pub const MIN_CAS_LATENCY: u32 = 9;

/// Supported CAS latencies as a bitmask; bit N set means CL = N cycles
/// is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CasLatencies(u32);

impl CasLatencies {
    pub const fn from_mask(mask: u32) -> Self {
        CasLatencies(mask)
    }

    pub fn from_latencies(cls: &[u32]) -> Result<Self> {
        let mut mask = 0u32;
        for &cl in cls {
            ensure!(cl < u32::BITS, error::CasLatencyRange { cl });
            mask |= 1 << cl;
        }
        Ok(CasLatencies(mask))
    }

    pub const fn mask(self) -> u32 {
        self.0
    }

    pub const fn supports(self, cl: u32) -> bool {
        cl < u32::BITS && self.0 & (1 << cl) != 0
    }

    pub fn lowest(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros())
        }
    }

    pub fn highest(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(u32::BITS - 1 - self.0.leading_zeros())
        }
    }

    /// Supported latencies in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u32> {
        (0..u32::BITS).filter(move |cl| self.supports(*cl))
    }
}

bitflags! {
    /// Burst lengths the module accepts, encoded the way DDR4 mode
    /// register 0 spells them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BurstLengths: u8 {
        /// 4-beat bursts (burst chop).
        const BL4 = 1 << 2;
        /// 8-beat bursts.
        const BL8 = 1 << 3;
    }
}

/// Error detection/correction configuration code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EdcConfig {
    #[default]
    None = 0,
    Parity = 1,
    Ecc = 2,
}

impl EdcConfig {
    pub fn ecc_en(self) -> bool {
        matches!(self, EdcConfig::Ecc)
    }
}

// SPD bytes 60 to 77: one byte per nibble of the data bus, recording
// which package pins the nibble is wired to and in what bit order.
bitfield! {
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct DqMap(u8);
    impl Debug;
    pub package_rank_map, _: 7, 6;
    pub upper_nibble, _: 5;
    pub bit_order, _: 4, 0;
}

impl DqMap {
    pub const fn new(raw: u8) -> Self {
        DqMap(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Parameters of one installed memory module.
///
/// Built once per boot by the board's resolution strategy and immutable
/// afterwards; the training engine consumes it as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimmParams {
    /// Module part name.
    pub part: Box<str>,
    pub ranks: u32,
    /// SPD byte 4 density code; see [`DimmParams::die_density_mbits`].
    pub die_density: u8,
    /// Bytes per rank.
    pub rank_density: u64,
    /// Bytes in total.
    pub capacity: u64,
    /// Primary data bus width in bits.
    pub primary_bus_width: u32,
    /// ECC extension width in bits.
    pub ecc_width: u32,
    /// Width of one SDRAM device in bits.
    pub device_width: u32,
    pub registered: bool,
    pub package_3ds: bool,
    pub mirrored: bool,
    /// Reference raw card revision.
    pub raw_card: u8,
    pub row_addr_bits: u32,
    pub col_addr_bits: u32,
    /// Bank address bits; 0 denotes 4 banks per group.
    pub bank_addr_bits: u8,
    pub bank_group_bits: u8,
    pub edc_config: EdcConfig,
    pub burst_lengths: BurstLengths,
    pub cas_latencies: CasLatencies,

    /// Medium timebase, picoseconds per tick.
    pub mtb_ps: u32,
    /// Fine timebase, tenths of a picosecond per tick. Carried for
    /// completeness; the resolution logic works on absolute values.
    pub ftb_10th_ps: u32,
    /// CAS latency time tAA(min).
    pub taa_ps: u32,
    /// Four-activate window tFAW.
    pub tfaw_ps: u32,
    /// Minimum clock period tCK(avg)min.
    pub tckmin_ps: u32,
    /// Maximum clock period tCK(avg)max.
    pub tckmax_ps: u32,
    /// RAS to CAS delay tRCD.
    pub trcd_ps: u32,
    /// Row precharge time tRP.
    pub trp_ps: u32,
    /// Active to precharge time tRAS.
    pub tras_ps: u32,
    /// Row cycle time tRC.
    pub trc_ps: u32,
    /// Write recovery time tWR.
    pub twr_ps: u32,
    /// Refresh cycle time tRFC1, 1x refresh mode.
    pub trfc1_ps: u32,
    /// Refresh cycle time tRFC2, 2x refresh mode.
    pub trfc2_ps: u32,
    /// Refresh cycle time tRFC4, 4x refresh mode.
    pub trfc4_ps: u32,
    /// Same-logical-rank refresh time for 3DS packages; unused otherwise.
    pub trfc_slr_ps: u32,
    /// Activate-to-activate delay tRRD_S, different bank group.
    pub trrds_ps: u32,
    /// Activate-to-activate delay tRRD_L, same bank group.
    pub trrdl_ps: u32,
    /// CAS-to-CAS delay tCCD_L, same bank group.
    pub tccdl_ps: u32,
    /// Average periodic refresh interval tREFI.
    pub refresh_rate_ps: u32,

    /// Connector-to-SDRAM nibble maps, one [`DqMap`] per nibble of
    /// `primary_bus_width + ecc_width`.
    pub dq_mapping: Box<[DqMap]>,
    /// Any mapping byte uses inverted (OR'd) polarity.
    pub dq_mapping_ors: bool,
}

impl DimmParams {
    /// Banks in one bank group.
    pub fn banks_per_group(&self) -> u32 {
        4u32 << self.bank_addr_bits
    }

    pub fn bank_groups(&self) -> u32 {
        1u32 << self.bank_group_bits
    }

    /// Die capacity in megabits, decoded from the SPD density code.
    pub fn die_density_mbits(&self) -> Option<u64> {
        match self.die_density {
            code @ 0..=7 => Some(256u64 << code),
            _ => None,
        }
    }

    /// Check the descriptor's internal consistency before it reaches the
    /// training engine.
    pub fn validate(&self) -> Result<()> {
        if self.ranks > 0 {
            let expect = self.rank_density * self.ranks as u64;
            ensure!(
                self.capacity == expect,
                error::Capacity {
                    capacity: self.capacity,
                    rank_density: self.rank_density,
                    ranks: self.ranks,
                }
            );
        }
        let timings = [
            ("mtb_ps", self.mtb_ps),
            ("ftb_10th_ps", self.ftb_10th_ps),
            ("taa_ps", self.taa_ps),
            ("tfaw_ps", self.tfaw_ps),
            ("tckmin_ps", self.tckmin_ps),
            ("tckmax_ps", self.tckmax_ps),
            ("trcd_ps", self.trcd_ps),
            ("trp_ps", self.trp_ps),
            ("tras_ps", self.tras_ps),
            ("trc_ps", self.trc_ps),
            ("twr_ps", self.twr_ps),
            ("trfc1_ps", self.trfc1_ps),
            ("trfc2_ps", self.trfc2_ps),
            ("trfc4_ps", self.trfc4_ps),
            ("trrds_ps", self.trrds_ps),
            ("trrdl_ps", self.trrdl_ps),
            ("tccdl_ps", self.tccdl_ps),
            ("refresh_rate_ps", self.refresh_rate_ps),
        ];
        for (name, ps) in timings {
            ensure!(ps > 0, error::ZeroTiming { name });
        }
        if self.package_3ds {
            ensure!(
                self.trfc_slr_ps > 0,
                error::ZeroTiming {
                    name: "trfc_slr_ps",
                }
            );
        }
        let Some(lowest) = self.cas_latencies.lowest() else {
            return error::NoCasLatencies.fail();
        };
        ensure!(
            lowest >= MIN_CAS_LATENCY,
            error::CasLatencyTooLow {
                lowest,
                min: MIN_CAS_LATENCY,
            }
        );
        let need = ((self.primary_bus_width + self.ecc_width) / 4) as usize;
        ensure!(
            self.dq_mapping.len() == need,
            error::DqMapLength {
                got: self.dq_mapping.len(),
                need,
            }
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "dimm_test.rs"]
mod tests;
