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

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub), context(suffix(false)))]
pub enum Error {
    #[snafu(display("System clocks are not set"))]
    NotSet,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Clock frequencies discovered from the platform, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SysClocks {
    pub platform: u64,
    pub ddr_pll: [u64; 2],
}

impl SysClocks {
    /// DDR clock for PLL selector `pll`; unknown selectors read as zero.
    pub fn ddr_freq(&self, pll: usize) -> u64 {
        self.ddr_pll.get(pll).copied().unwrap_or(0)
    }
}

/// Source of platform clock information, typically the SoC clocking
/// block read out early in boot.
pub trait ClockSource {
    fn read(&self) -> Result<SysClocks>;
}

#[cfg(test)]
#[path = "clock_test.rs"]
mod tests;
