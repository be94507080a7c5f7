// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Joe Pearson
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

//! The airspace prelude.
//!
//! Imports the types needed to fill a store and render a viewport:
//!
//! ```
//! use airspace::prelude::*;
//! ```

pub use crate::{
    polygon, AirspaceMeta, AirspaceRecord, AirspaceSource, AltitudeLimit, Bounds, ClipOptions,
    Error, MemoryStore, RenderedAirspace, Store, StoreOptions, ViewportRenderer, ViewportRequest,
};
