// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod columns;
pub mod filter;
pub mod forms;
pub mod ids;
pub mod model;
pub mod pagination;
pub mod state;

pub use columns::*;
pub use filter::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use pagination::*;
pub use state::*;
