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

//! DRAM bring-up orchestration.
//!
//! [`init_ddr`] is the one entry point: it discovers clocks, resolves
//! the installed modules and the board's controller tuning into a
//! [`DdrConfig`], and hands the bundle to the training engine.

use snafu::{ResultExt, Snafu};

use crate::board::Board;
use crate::clock::ClockSource;
use crate::dimm::{BurstLengths, DimmParams};

#[derive(Debug, Snafu)]
#[snafu(module, context(suffix(false)))]
pub enum Error {
    /// Terminal: no safe assumption about DRAM timing can be made
    /// without clock information. The caller must not continue boot.
    #[snafu(display("System clocks are unavailable"))]
    ClocksUnavailable { source: crate::clock::Error },
    #[snafu(display("Module resolution failed"), context(false))]
    Board { source: crate::board::Error },
    #[snafu(display("DDR training failed with code {code}"))]
    Training { code: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Warm boot capability across a DDR retention state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmBoot {
    NotSupported,
    Cold,
    Warm,
}

/// DDR4 mode register 1 output driver impedance code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DriverImpedance {
    /// RZQ/7, 34 ohm.
    #[default]
    Ohm34 = 0,
    /// RZQ/5, 48 ohm.
    Ohm48 = 1,
}

/// Controller-wide tuning, independent of which modules are installed.
///
/// Every numeric value is an electrical contract with the board; none
/// of them may change without retuning against hardware documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemctlOpts {
    /// CAS latency to program instead of the resolved one, in cycles.
    pub caslat_override: Option<u32>,
    /// Additive latency to program instead of the resolved one.
    pub addt_lat_override: Option<u32>,
    pub auto_self_refresh_en: bool,
    pub output_driver_impedance: DriverImpedance,
    /// 2T command timing.
    pub twot_en: bool,
    /// 3T command timing.
    pub threet_en: bool,
    /// PHY address/command drive impedance in ohms.
    pub phy_atx_impedance: u32,
    /// PHY data drive impedance in ohms.
    pub phy_tx_impedance: u32,
    /// DIMM-side reference voltage code.
    pub vref_dimm: u8,
    /// PHY-side reference voltage code.
    pub vref_phy: u8,
    /// On-die termination in ohms.
    pub odt: u32,
    /// Termination to force on every rank, in ohms.
    pub rtt_override: Option<u32>,
    /// RTT_PARK termination in ohms.
    pub rtt_park: u32,
    /// On-the-fly burst chop.
    pub otf_burst_chop_en: bool,
    pub burst_length: BurstLengths,
    /// Use the turnaround codes below instead of computed values.
    pub trwt_override: bool,
    /// Read-to-write turnaround, same rank.
    pub trwt: u8,
    /// Write-to-read turnaround, same rank.
    pub twrt: u8,
    /// Read-to-read turnaround, cross rank.
    pub trrt: u8,
    /// Write-to-write turnaround, cross rank.
    pub twwt: u8,
    pub addr_hash: bool,
    /// Precharge interval; 0 selects auto precharge.
    pub bstopre: u32,
    /// Skip the 2D training stage.
    pub skip2d: bool,
}

/// Loads PHY training firmware into the scratch buffer. The bring-up
/// layer only wires the reference through; the training engine calls
/// it back when it needs an image.
pub trait ImageLoader {
    /// Load `image_id` into the buffer at `addr`, returning the image
    /// size in bytes.
    fn load_img(&self, image_id: u32, addr: u64, max_size: usize) -> std::io::Result<usize>;
}

/// The SDRAM/PHY training engine.
///
/// A call is synchronous and blocking, may take a platform-significant
/// amount of time, and is not cancellable: it runs to a terminal
/// outcome.
pub trait TrainingEngine {
    /// Train and initialize all controllers in `cfg`. Returns the
    /// usable capacity in bytes, or a negative failure code.
    fn dram_init(&mut self, cfg: &DdrConfig, ccn_hnf_base: Option<u64>) -> i64;
}

/// Everything the training engine needs for one bring-up pass.
///
/// Assembled by [`init_ddr`] and exclusively owned by that invocation;
/// never reused across calls.
pub struct DdrConfig<'a> {
    pub num_ctlrs: usize,
    /// Memory controller register block bases, one per controller.
    pub ctlr_base: Box<[u64]>,
    /// PHY register block bases, one per controller.
    pub phy_base: Box<[u64]>,
    /// SPD EEPROM bus addresses, one per DIMM slot. Carried for
    /// runtime-detection strategies; the static path never reads them.
    pub spd_addrs: Box<[u8]>,
    /// DDR clock in Hz. May legitimately be zero; the engine is the
    /// authority on whether that is fatal.
    pub clk: u64,
    pub dimm_slots_per_ctlr: usize,
    pub warm_boot: WarmBoot,
    /// Scratch buffer address for PHY firmware images.
    pub fw_image_buf: u64,
    /// Modules per controller; an empty set is an unpopulated
    /// controller, dropped by the engine.
    pub dimms: Box<[&'a [DimmParams]]>,
    pub opts: MemctlOpts,
    pub loader: &'a dyn ImageLoader,
}

/// Bring up DRAM: discover clocks, assemble the per-controller
/// configuration, run training. Returns the usable capacity in bytes.
///
/// [`Error::ClocksUnavailable`] is terminal; the embedding boot
/// sequence must halt on it. A training failure is reported without
/// retry; halt-or-reset policy belongs to the caller.
pub fn init_ddr<B, C, E>(
    board: &B,
    clocks: &C,
    loader: &dyn ImageLoader,
    engine: &mut E,
) -> Result<u64>
where
    B: Board + ?Sized,
    C: ClockSource + ?Sized,
    E: TrainingEngine + ?Sized,
{
    let sys = clocks.read().context(error::ClocksUnavailable)?;
    log::debug!("platform clock {}", sys.platform);
    log::debug!("DDR PLL1 {}", sys.ddr_pll[0]);
    log::debug!("DDR PLL2 {}", sys.ddr_pll[1]);

    let num_ctlrs = board.num_ctlrs();
    let resolution = board.dimm_resolution();
    let mut dimms = Vec::with_capacity(num_ctlrs);
    for ctlr in 0..num_ctlrs {
        dimms.push(resolution.resolve(ctlr)?);
    }

    let mut clk = sys.ddr_freq(0);
    if clk == 0 {
        clk = sys.ddr_freq(1);
    }

    let cfg = DdrConfig {
        num_ctlrs,
        ctlr_base: (0..num_ctlrs).map(|c| board.ctlr_base(c)).collect(),
        phy_base: (0..num_ctlrs).map(|c| board.phy_base(c)).collect(),
        spd_addrs: board.spd_addrs().into(),
        clk,
        dimm_slots_per_ctlr: board.dimm_slots_per_ctlr(),
        warm_boot: board.warm_boot(),
        fw_image_buf: board.fw_image_buf(),
        dimms: dimms.into_boxed_slice(),
        opts: board.memctl_opts(),
        loader,
    };

    let size = engine.dram_init(&cfg, board.ccn_hnf_base());
    if size < 0 {
        log::error!("DDR init failed: {size}");
        return error::Training { code: size }.fail();
    }
    log::info!("DDR capacity {size:#x} bytes");
    Ok(size as u64)
}

#[cfg(test)]
#[path = "ddr_test.rs"]
mod tests;
