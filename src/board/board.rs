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

use serde::Deserialize;
use snafu::Snafu;

use crate::ddr::{MemctlOpts, WarmBoot};
use crate::dimm::DimmParams;

#[path = "orion.rs"]
pub mod orion;

#[derive(Debug, Snafu)]
#[snafu(module, context(suffix(false)))]
pub enum Error {
    #[snafu(display("No static DIMM configuration for controller {ctlr}"))]
    NoStaticConfig { ctlr: usize },
    #[snafu(display("Invalid DIMM descriptor"), context(false))]
    InvalidDimm { source: crate::dimm::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Startup configuration of the bring-up layer.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// Board variant to bring up. [default: orion]
    #[serde(default)]
    pub variant: BoardVariant,
    /// Drive the POVDD rail hooks. [default: false]
    #[serde(default)]
    pub povdd: bool,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub enum BoardVariant {
    #[default]
    #[serde(alias = "orion")]
    Orion,
}

impl BoardConfig {
    /// Resolve the configured variant into a board instance. Fails if a
    /// compiled-in DIMM descriptor is invalid or the resolution strategy
    /// does not cover every wired controller.
    pub fn build(&self) -> Result<Box<dyn Board>> {
        let board: Box<dyn Board> = match self.variant {
            BoardVariant::Orion => Box::new(orion::Orion::new(self.povdd)),
        };
        let resolution = board.dimm_resolution();
        resolution.validate()?;
        for ctlr in 0..board.num_ctlrs() {
            resolution.resolve(ctlr)?;
        }
        Ok(board)
    }
}

/// How the installed modules are discovered, selected at startup.
///
/// Boards with SPD EEPROMs would add a runtime-detection variant here;
/// a board whose strategy covers fewer controllers than it exposes is a
/// configuration error, surfaced by [`BoardConfig::build`].
#[derive(Debug)]
pub enum DimmResolution {
    /// Compiled-in descriptor sets for boards with soldered-down
    /// modules, indexed by controller. An empty set is a controller
    /// that is wired but unpopulated.
    Static(Box<[Box<[DimmParams]>]>),
}

impl DimmResolution {
    /// Validate every configured descriptor.
    pub fn validate(&self) -> Result<()> {
        match self {
            DimmResolution::Static(ctlrs) => {
                for set in ctlrs.iter() {
                    for dimm in set.iter() {
                        dimm.validate()?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Modules installed on `ctlr`; the slice length is the module count.
    pub fn resolve(&self, ctlr: usize) -> Result<&[DimmParams]> {
        match self {
            DimmResolution::Static(ctlrs) => match ctlrs.get(ctlr) {
                Some(set) => Ok(set),
                None => error::NoStaticConfig { ctlr }.fail(),
            },
        }
    }
}

/// Board identity: fixed addresses, module population, and electrical
/// tuning. Implementations are constructed once by
/// [`BoardConfig::build`] and immutable afterwards.
pub trait Board {
    /// DDR controllers wired on this board.
    fn num_ctlrs(&self) -> usize;

    /// Memory controller register block base; `ctlr < num_ctlrs()`.
    fn ctlr_base(&self, ctlr: usize) -> u64;

    /// PHY register block base; `ctlr < num_ctlrs()`.
    fn phy_base(&self, ctlr: usize) -> u64;

    /// SPD EEPROM bus addresses, one per DIMM slot.
    fn spd_addrs(&self) -> &[u8];

    /// DIMM slots per controller.
    fn dimm_slots_per_ctlr(&self) -> usize;

    fn warm_boot(&self) -> WarmBoot;

    /// Scratch buffer for PHY training firmware images.
    fn fw_image_buf(&self) -> u64;

    /// Coherent interconnect HN-F base, on boards whose fabric needs
    /// DRAM regions configured for cache coherency.
    fn ccn_hnf_base(&self) -> Option<u64> {
        None
    }

    fn dimm_resolution(&self) -> &DimmResolution;

    /// Controller-wide tuning, independent of the installed modules.
    /// Deterministic; cannot fail.
    fn memctl_opts(&self) -> MemctlOpts;

    /// Power up the DIMM reference voltage rail. `false` means no
    /// action was taken.
    fn enable_povdd(&self) -> bool {
        false
    }

    /// Power down the DIMM reference voltage rail. `false` means no
    /// action was taken.
    fn disable_povdd(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
