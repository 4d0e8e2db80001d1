// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use log::Level;
use log::LevelFilter;

use crate::Outlet;
use crate::append::OutletKind;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// An ordered set of outlets, each with the minimum severity it accepts.
///
/// Every record is delivered to each outlet whose minimum level it meets, in insertion order.
/// Delivery errors are reported to the [`Trap`] and never reach the caller.
///
/// This struct implements [`log::Log`], so it can serve as the global logger.
///
/// # Examples
///
/// ```
/// use log::Level;
/// use logforth_outlets::Outlets;
/// use logforth_outlets::append::StdoutOutlet;
///
/// let mut outlets = Outlets::new();
/// outlets.add(StdoutOutlet::default(), Level::Info);
/// assert!(outlets.enabled(Level::Warn));
/// assert!(!outlets.enabled(Level::Debug));
/// ```
#[derive(Debug)]
pub struct Outlets {
    entries: Vec<(Outlet, Level)>,
    trap: Box<dyn Trap>,
}

impl Default for Outlets {
    fn default() -> Self {
        Self::new()
    }
}

impl Outlets {
    /// Create an empty set that reports delivery errors to [`DefaultTrap`].
    pub fn new() -> Self {
        Self {
            entries: vec![],
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Sets the trap that receives delivery errors.
    pub fn with_trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Append an outlet accepting records at `min_level` or more severe.
    pub fn add(&mut self, outlet: impl Into<Outlet>, min_level: Level) {
        self.entries.push((outlet.into(), min_level));
    }

    /// Iterate over the outlets and their minimum levels, in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Outlet, Level)> {
        self.entries.iter().map(|(outlet, level)| (outlet, *level))
    }

    /// The number of outlets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is no outlet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of outlets of the given kind.
    pub fn count(&self, kind: OutletKind) -> usize {
        self.entries
            .iter()
            .filter(|(outlet, _)| outlet.kind() == kind)
            .count()
    }

    /// Whether any outlet accepts records at `level`.
    pub fn enabled(&self, level: Level) -> bool {
        self.entries.iter().any(|(_, min_level)| level <= *min_level)
    }

    /// The most verbose level any outlet accepts.
    pub fn max_level(&self) -> LevelFilter {
        self.entries
            .iter()
            .map(|(_, level)| level.to_level_filter())
            .max()
            .unwrap_or(LevelFilter::Off)
    }

    /// Deliver `record` to every outlet whose minimum level it meets.
    pub fn dispatch(&self, record: &log::Record) {
        for (outlet, min_level) in &self.entries {
            if record.level() > *min_level {
                continue;
            }
            if let Err(err) = outlet.append(record) {
                self.trap.trap(&err);
            }
        }
    }

    /// Flush every outlet.
    pub fn flush(&self) {
        for (outlet, _) in &self.entries {
            if let Err(err) = outlet.flush() {
                self.trap.trap(&err);
            }
        }
    }

    /// Set up the global logger with these outlets.
    ///
    /// The global maximum level is set to [`Outlets::max_level`].
    ///
    /// # Errors
    ///
    /// Return an error if a global logger has already been set.
    pub fn try_apply(self) -> Result<(), log::SetLoggerError> {
        let max_level = self.max_level();
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }

    /// Set up the global logger with these outlets.
    ///
    /// # Panics
    ///
    /// Panic if the global logger has already been set.
    pub fn apply(self) {
        self.try_apply()
            .expect("Outlets::apply must be called before the global logger initialized");
    }
}

impl log::Log for Outlets {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Outlets::enabled(self, metadata.level())
    }

    fn log(&self, record: &log::Record) {
        self.dispatch(record);
    }

    fn flush(&self) {
        Outlets::flush(self);
    }
}
