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

use std::io::Write;

use crate::Layout;
use crate::layout::HumanLayout;

/// An outlet that prints log records to the process standard output.
///
/// # Examples
///
/// ```
/// use logforth_outlets::append::StdoutOutlet;
/// use logforth_outlets::layout::JsonLayout;
///
/// let outlet = StdoutOutlet::default().with_layout(JsonLayout::default());
/// ```
#[derive(Debug)]
pub struct StdoutOutlet {
    layout: Box<dyn Layout>,
}

impl Default for StdoutOutlet {
    fn default() -> Self {
        Self {
            layout: Box::new(HumanLayout::default()),
        }
    }
}

impl StdoutOutlet {
    /// Sets the layout.
    ///
    /// Default to [`HumanLayout`].
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    pub(crate) fn append(&self, record: &log::Record) -> anyhow::Result<()> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        std::io::stdout().lock().write_all(&bytes)?;
        Ok(())
    }

    pub(crate) fn flush(&self) -> anyhow::Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }
}
